//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use api::config::RateLimitConfig;
use api::rate_limit::SlidingWindowLimiter;
use api::routes::AppState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use channels::{ChannelRegistry, InMemoryChannelAdapter, RoomChannelMap, RoomMapping};
use chrono::NaiveDate;
use common::{Channel, FixedClock, HotelId, RoomId};
use domain::{ExternalBookingRef, Hotel, Money, Room};
use engine::{DispatcherConfig, InMemoryNotifier, NotificationDispatcher};
use inventory_store::{InMemoryInventoryStore, InventoryStore};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    store: InMemoryInventoryStore,
    beds24: InMemoryChannelAdapter,
}

/// Hotel 1, room 10 (one unit) mapped on Beds24 as "B-100".
async fn setup_with(rate_limit: RateLimitConfig) -> TestApp {
    let store = InMemoryInventoryStore::new();
    store
        .save_hotel(Hotel {
            id: HotelId::new(1),
            name: "Harbour View".to_string(),
            contact_email: None,
        })
        .await
        .unwrap();
    store
        .save_room(Room {
            id: RoomId::new(10),
            hotel_id: HotelId::new(1),
            name: "Double".to_string(),
            quantity: 1,
            nightly_rate: Money::from_minor(10000),
        })
        .await
        .unwrap();

    let beds24 = InMemoryChannelAdapter::new(Channel::Beds24);
    let channels = ChannelRegistry::new().with(Arc::new(beds24.clone()));
    let mapping = RoomChannelMap::new(vec![RoomMapping::new(
        Channel::Beds24,
        RoomId::new(10),
        "B-100",
    )])
    .unwrap();
    let (notifications, _worker) = NotificationDispatcher::spawn(
        Arc::new(InMemoryNotifier::new()),
        DispatcherConfig::default(),
    );
    let clock = Arc::new(FixedClock(NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()));
    let limiter = Arc::new(SlidingWindowLimiter::new(rate_limit));

    let state = Arc::new(AppState::new(
        store.clone(),
        channels,
        mapping,
        notifications,
        clock,
        limiter,
    ));
    TestApp {
        app: api::create_app(state, get_metrics_handle()),
        store,
        beds24,
    }
}

async fn setup() -> TestApp {
    setup_with(RateLimitConfig {
        max_requests: 100,
        window: Duration::from_secs(600),
    })
    .await
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn booking_body() -> Value {
    json!({
        "hotel_id": 1,
        "room_id": 10,
        "customer_name": "Ada Lovelace",
        "customer_email": "ada@example.com",
        "customer_phone": "+44 20 7946 0000",
        "check_in": "2026-06-01",
        "check_out": "2026-06-03",
        "guests_count": 2
    })
}

async fn create_booking(app: &axum::Router) -> String {
    let (status, json) = send(app, post("/bookings", booking_body())).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["data"][0]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let t = setup().await;
    let (status, json) = send(&t.app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = setup().await;
    let response = t.app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

mod bookings {
    use super::*;

    #[tokio::test]
    async fn test_create_booking() {
        let t = setup().await;
        let (status, json) = send(&t.app, post("/bookings", booking_body())).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["success"], true);
        assert!(json["data"][0]["id"].as_str().is_some());
        assert_eq!(t.store.reservation_count().await, 1);
    }

    #[tokio::test]
    async fn test_validation_failure_reports_first_violation() {
        let t = setup().await;
        let mut body = booking_body();
        body["customer_email"] = json!("not-an-email");
        body["guests_count"] = json!(11);

        let (status, json) = send(&t.app, post("/bookings", body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Email address is not valid");
        assert_eq!(json["violations"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_second_booking_for_last_unit_conflicts() {
        let t = setup().await;
        create_booking(&t.app).await;

        let (status, json) = send(&t.app, post("/bookings", booking_body())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let t = setup().await;
        let request = Request::builder()
            .method("POST")
            .uri("/bookings")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, json) = send(&t.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_error() {
        let t = setup().await;
        t.store.set_fail_on_write(true).await;

        let (status, json) = send(&t.app, post("/bookings", booking_body())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Internal server error");
    }
}

mod webhooks {
    use super::*;

    fn beds24_booking(status: &str) -> Value {
        json!({
            "bookId": "B24-900",
            "roomId": "B-100",
            "status": status,
            "arrival": "2026-07-10",
            "departure": "2026-07-12",
            "guestName": "Grace Hopper",
            "guestEmail": "grace@example.com",
            "price": "320.00"
        })
    }

    #[tokio::test]
    async fn test_beds24_booking_is_created_once() {
        let t = setup().await;

        let (status, json) = send(&t.app, post("/webhooks/beds24", beds24_booking("1"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["created"], 1);

        let (_, json) = send(&t.app, post("/webhooks/beds24", beds24_booking("1"))).await;
        assert_eq!(json["updated"], 1);
        assert_eq!(t.store.reservation_count().await, 1);

        let reservation = t
            .store
            .find_by_external(&ExternalBookingRef::new(Channel::Beds24, "B24-900"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reservation.status.to_string(), "confirmed");
        assert_eq!(reservation.payment_status.to_string(), "paid");
    }

    #[tokio::test]
    async fn test_unknown_cancellation_is_acknowledged() {
        let t = setup().await;
        let (status, json) = send(&t.app, post("/webhooks/beds24", beds24_booking("0"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["ignored"], 1);
        assert_eq!(t.store.reservation_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_channel_is_not_found() {
        let t = setup().await;
        let (status, _) = send(&t.app, post("/webhooks/airbnb", json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unreadable_body_is_bad_request() {
        let t = setup().await;
        let (status, json) = send(&t.app, post("/webhooks/beds24", json!(42))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_store_failure_asks_for_redelivery() {
        let t = setup().await;
        t.store.set_fail_on_write(true).await;

        let (status, _) = send(&t.app, post("/webhooks/beds24", beds24_booking("1"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}

mod guest {
    use super::*;

    async fn token_of(t: &TestApp, id: &str) -> String {
        let id = common::ReservationId::from_uuid(uuid::Uuid::parse_str(id).unwrap());
        t.store
            .get_reservation(id)
            .await
            .unwrap()
            .unwrap()
            .cancellation_token
            .unwrap()
            .as_str()
            .to_string()
    }

    #[tokio::test]
    async fn test_cancel_by_token() {
        let t = setup().await;
        let id = create_booking(&t.app).await;
        let token = token_of(&t, &id).await;

        let (status, json) = send(
            &t.app,
            post("/reservations/cancel", json!({ "token": token })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["success"], true);

        let (status, _) = send(
            &t.app,
            post("/reservations/cancel", json!({ "token": token })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_found() {
        let t = setup().await;
        let (status, json) = send(
            &t.app,
            post("/reservations/cancel", json!({ "token": "x".repeat(43) })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_missing_token_is_bad_request() {
        let t = setup().await;
        let (status, _) = send(&t.app, post("/reservations/cancel", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_by_token_hides_token() {
        let t = setup().await;
        let id = create_booking(&t.app).await;
        let token = token_of(&t, &id).await;

        let (status, json) = send(&t.app, get(&format!("/reservations/by-token/{token}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["id"], id);
        assert_eq!(json["data"]["status"], "pending");
        assert!(json["data"].get("cancellation_token").is_none());
    }

    #[tokio::test]
    async fn test_list_by_email() {
        let t = setup().await;
        let id = create_booking(&t.app).await;

        let (status, json) = send(&t.app, get("/reservations?email=ADA@example.com")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
        assert_eq!(json["data"][0]["id"], id);

        let (status, _) = send(&t.app, get("/reservations")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_lookups_are_rate_limited_per_client() {
        let t = setup_with(RateLimitConfig {
            max_requests: 2,
            window: Duration::from_secs(600),
        })
        .await;

        let lookup = |ip: &str| {
            Request::builder()
                .uri("/reservations?email=ada@example.com")
                .header("x-forwarded-for", ip)
                .body(Body::empty())
                .unwrap()
        };

        assert_eq!(send(&t.app, lookup("198.51.100.1")).await.0, StatusCode::OK);
        assert_eq!(send(&t.app, lookup("198.51.100.1")).await.0, StatusCode::OK);
        let (status, json) = send(&t.app, lookup("198.51.100.1")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json["success"], false);

        assert_eq!(send(&t.app, lookup("198.51.100.2")).await.0, StatusCode::OK);
    }
}

mod admin {
    use super::*;

    #[tokio::test]
    async fn test_full_front_desk_flow() {
        let t = setup().await;
        let id = create_booking(&t.app).await;

        let (status, json) = send(
            &t.app,
            post_empty(&format!("/admin/reservations/{id}/confirm")),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["data"]["status"], "confirmed");

        for (action, expected) in [("check-in", "checked_in"), ("check-out", "checked_out")] {
            let (status, json) = send(
                &t.app,
                post_empty(&format!("/admin/reservations/{id}/{action}")),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(json["data"]["status"], expected);
        }

        let (status, json) = send(
            &t.app,
            post_empty(&format!("/admin/reservations/{id}/cancel")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_confirm_with_channel_push() {
        let t = setup().await;
        let id = create_booking(&t.app).await;

        let (status, json) = send(
            &t.app,
            post(
                &format!("/admin/reservations/{id}/confirm"),
                json!({ "push_to_channel": "beds24" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["channel_sync"]["ok"], true);
        assert_eq!(json["data"]["channel"], "beds24");
        assert_eq!(t.beds24.active_booking_count().await, 1);
    }

    #[tokio::test]
    async fn test_channel_failure_still_confirms() {
        let t = setup().await;
        let id = create_booking(&t.app).await;
        t.beds24.set_fail(true).await;

        let (status, json) = send(
            &t.app,
            post(
                &format!("/admin/reservations/{id}/confirm"),
                json!({ "push_to_channel": "beds24" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "confirmed");
        assert_eq!(json["channel_sync"]["ok"], false);
        assert!(json["channel_sync"]["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_unconfigured_channel_is_server_error() {
        let t = setup().await;
        let id = create_booking(&t.app).await;

        let (status, _) = send(
            &t.app,
            post(
                &format!("/admin/reservations/{id}/confirm"),
                json!({ "push_to_channel": "channex" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unknown_and_invalid_ids() {
        let t = setup().await;
        let (status, _) = send(
            &t.app,
            post_empty(&format!(
                "/admin/reservations/{}/check-in",
                uuid::Uuid::new_v4()
            )),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&t.app, post_empty("/admin/reservations/not-a-uuid/check-in")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_availability_diagnostics() {
        let t = setup().await;
        create_booking(&t.app).await;

        let (status, json) = send(
            &t.app,
            post(
                "/admin/diagnostics/availability",
                json!({ "room_id": 10, "date": "2026-06-01" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true, "{json}");
        assert!(json.get("step_failed").is_none());
        assert_eq!(
            t.beds24.availability_pushes().await,
            vec![(
                "B-100".to_string(),
                NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
                0
            )]
        );
    }

    #[tokio::test]
    async fn test_availability_diagnostics_reports_failed_step() {
        let t = setup().await;
        let (status, json) = send(
            &t.app,
            post("/admin/diagnostics/availability", json!({ "room_id": 99 })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
        assert_eq!(json["step_failed"], "load_room");
    }
}
