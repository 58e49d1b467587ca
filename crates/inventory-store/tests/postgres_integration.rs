//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p inventory-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use common::{Channel, HotelId, ReservationId, RoomId};
use domain::{
    CancellationToken, ChannelSourcedFields, ExternalBookingRef, GuestDetails, Hotel, Money,
    NewReservation, PaymentStatus, ReservationStatus, Room, StayDates,
};
use inventory_store::{InventoryStore, PostgresInventoryStore, StoreError};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresInventoryStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool, cleared tables and one seeded room
async fn get_test_store(quantity: u32) -> PostgresInventoryStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE reservations, rooms, hotels")
        .execute(&pool)
        .await
        .unwrap();

    let store = PostgresInventoryStore::new(pool);
    store
        .save_hotel(Hotel {
            id: HotelId::new(1),
            name: "Harbour House".to_string(),
            contact_email: None,
        })
        .await
        .unwrap();
    store
        .save_room(Room {
            id: RoomId::new(10),
            hotel_id: HotelId::new(1),
            name: "Double".to_string(),
            quantity,
            nightly_rate: Money::from_minor(15000),
        })
        .await
        .unwrap();
    store
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
}

fn direct(arrival: u32, departure: u32) -> NewReservation {
    NewReservation {
        id: ReservationId::new(),
        hotel_id: HotelId::new(1),
        room_id: RoomId::new(10),
        guest: GuestDetails {
            city: Some("London".to_string()),
            address: Some("12 St James's Square".to_string()),
            ..GuestDetails::new("Ada Lovelace", "ada@example.com").with_phone("+44 20 7946 0000")
        },
        stay: StayDates::new(date(arrival), date(departure)).unwrap(),
        adults: 2,
        children: 0,
        total_price: Money::from_minor(30000),
        notes: Some("Late arrival".to_string()),
        check_in_notes: Some("[direct] booking form".to_string()),
        cancellation_token: Some(CancellationToken::issue()),
        payment_status: PaymentStatus::Unpaid,
        status: ReservationStatus::Pending,
        external: None,
    }
}

fn channel_fields(total_minor: i64) -> ChannelSourcedFields {
    ChannelSourcedFields {
        hotel_id: HotelId::new(1),
        room_id: RoomId::new(10),
        guest: GuestDetails::new("Grace Hopper", "grace@example.com"),
        stay: StayDates::new(date(10), date(12)).unwrap(),
        adults: 2,
        children: 1,
        total_price: Money::from_minor(total_minor),
        check_in_notes: Some("[beds24] booking B-77".to_string()),
    }
}

mod direct_bookings {
    use super::*;

    #[tokio::test]
    async fn create_and_read_back() {
        let store = get_test_store(1).await;
        let booking = direct(1, 3);
        let token = booking.cancellation_token.clone().unwrap();

        let created = store.create_direct_booking(booking).await.unwrap();
        assert_eq!(created.status, ReservationStatus::Pending);

        let loaded = store.get_reservation(created.id).await.unwrap().unwrap();
        assert_eq!(loaded.guest.email, "ada@example.com");
        assert_eq!(loaded.total_price, Money::from_minor(30000));
        assert_eq!(loaded.payment_status, PaymentStatus::Unpaid);
        assert_eq!(loaded.notes.as_deref(), Some("Late arrival"));
        assert_eq!(loaded.check_in_notes.as_deref(), Some("[direct] booking form"));
        assert_eq!(loaded.guest, created.guest);
        assert_eq!(loaded.guest.city.as_deref(), Some("London"));
        assert_eq!(loaded.check_in_notes, created.check_in_notes);

        let by_token = store.find_by_token(&token).await.unwrap().unwrap();
        assert_eq!(by_token.id, created.id);
    }

    #[tokio::test]
    async fn concurrent_creations_never_oversell() {
        let store = get_test_store(3).await;

        let attempts = (0..4).map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.create_direct_booking(direct(1, 3)).await })
        });
        let results = futures_util::future::join_all(attempts).await;

        let mut created = 0;
        let mut rejected = 0;
        for result in results {
            match result.unwrap() {
                Ok(_) => created += 1,
                Err(StoreError::CapacityExceeded { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(created, 3);
        assert_eq!(rejected, 1);
        assert_eq!(store.count_occupying(RoomId::new(10), date(2)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn unknown_room_is_reported() {
        let store = get_test_store(1).await;
        let mut booking = direct(1, 3);
        booking.room_id = RoomId::new(99);
        let err = store.create_direct_booking(booking).await.unwrap_err();
        assert!(matches!(err, StoreError::RoomNotFound { .. }));
    }

    #[tokio::test]
    async fn status_update_is_compare_and_set() {
        let store = get_test_store(1).await;
        let created = store.create_direct_booking(direct(1, 3)).await.unwrap();

        let confirmed = store
            .update_status(created.id, ReservationStatus::Pending, ReservationStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(confirmed.status, ReservationStatus::Confirmed);

        let err = store
            .update_status(created.id, ReservationStatus::Pending, ReservationStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::StaleStatus {
                actual: ReservationStatus::Confirmed,
                ..
            }
        ));

        let err = store
            .update_status(
                ReservationId::new(),
                ReservationStatus::Pending,
                ReservationStatus::Confirmed,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ReservationNotFound(_)));
    }

    #[tokio::test]
    async fn list_by_email_filters_and_orders() {
        let store = get_test_store(5).await;
        store.create_direct_booking(direct(20, 22)).await.unwrap();
        store.create_direct_booking(direct(1, 2)).await.unwrap();
        store.create_direct_booking(direct(5, 8)).await.unwrap();

        let found = store
            .list_active_by_email("Ada@Example.com", date(4))
            .await
            .unwrap();
        let arrivals: Vec<_> = found.iter().map(|r| r.stay.arrival()).collect();
        assert_eq!(arrivals, vec![date(5), date(20)]);
    }
}

mod external_bookings {
    use super::*;

    fn external(id: &str) -> NewReservation {
        NewReservation::from_channel(
            ExternalBookingRef::new(Channel::Beds24, id),
            channel_fields(24000),
            ReservationStatus::Confirmed,
        )
    }

    #[tokio::test]
    async fn insert_and_find_by_external_ref() {
        let store = get_test_store(1).await;
        let inserted = store.insert_external(external("B-77")).await.unwrap();
        assert_eq!(inserted.payment_status, PaymentStatus::Paid);
        assert!(inserted.cancellation_token.is_none());

        let found = store
            .find_by_external(&ExternalBookingRef::new(Channel::Beds24, "B-77"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, inserted.id);

        // Same booking id on another channel is a different booking.
        assert!(
            store
                .find_by_external(&ExternalBookingRef::new(Channel::Channex, "B-77"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn duplicate_external_insert_hits_unique_key() {
        let store = get_test_store(1).await;
        store.insert_external(external("B-77")).await.unwrap();
        let err = store.insert_external(external("B-77")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateExternalBooking(_)));
    }

    #[tokio::test]
    async fn external_bookings_skip_the_capacity_check() {
        let store = get_test_store(1).await;
        store.insert_external(external("B-1")).await.unwrap();
        store.insert_external(external("B-2")).await.unwrap();
        assert_eq!(store.count_occupying(RoomId::new(10), date(10)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn overwrite_replaces_channel_fields() {
        let store = get_test_store(1).await;
        let inserted = store.insert_external(external("B-77")).await.unwrap();

        let updated = store
            .overwrite_external(
                inserted.id,
                ReservationStatus::Confirmed,
                channel_fields(26000),
                ReservationStatus::Cancelled,
            )
            .await
            .unwrap();
        assert_eq!(updated.id, inserted.id);
        assert_eq!(updated.total_price, Money::from_minor(26000));
        assert_eq!(updated.status, ReservationStatus::Cancelled);
        assert_eq!(updated.external, inserted.external);
    }

    #[tokio::test]
    async fn attach_external_ref_to_direct_booking() {
        let store = get_test_store(1).await;
        let created = store.create_direct_booking(direct(1, 3)).await.unwrap();
        let reference = ExternalBookingRef::new(Channel::Channex, "CX-5");

        let updated = store
            .attach_external_ref(created.id, reference.clone())
            .await
            .unwrap();
        assert_eq!(updated.external, Some(reference.clone()));
        assert_eq!(
            store.find_by_external(&reference).await.unwrap().unwrap().id,
            created.id
        );
    }
}
