//! Guest self-service through the cancellation token.
//!
//! The token is the only credential a guest holds. A malformed token and an
//! unknown one are indistinguishable to the caller.

use domain::{CancellationToken, Reservation, StatusEvent};
use inventory_store::InventoryStore;

use crate::reservations::{ReservationService, TransitionOutcome};
use crate::{EngineError, Result};

impl<S: InventoryStore> ReservationService<S> {
    /// Looks up the reservation a token was issued for.
    #[tracing::instrument(skip_all)]
    pub async fn resolve_by_token(&self, raw: &str) -> Result<Reservation> {
        let not_found = || EngineError::NotFound {
            entity: "Reservation",
            id: "token".to_string(),
        };
        let token = CancellationToken::parse(raw).ok_or_else(not_found)?;
        self.store()
            .find_by_token(&token)
            .await?
            .ok_or_else(not_found)
    }

    /// Cancels the reservation a token was issued for.
    ///
    /// Cancellability is checked against the current status. If the booking
    /// is also held by a channel the channel is told, best effort: a failure
    /// there is reported in the outcome and the local cancellation stands.
    #[tracing::instrument(skip_all)]
    pub async fn cancel_by_token(&self, raw: &str) -> Result<TransitionOutcome> {
        let reservation = self.resolve_by_token(raw).await?;
        tracing::info!(reservation_id = %reservation.id, "Guest cancellation requested");
        self.apply(reservation, StatusEvent::Cancel).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use channels::{ChannelRegistry, InMemoryChannelAdapter, RoomChannelMap, RoomMapping};
    use chrono::NaiveDate;
    use common::{Channel, FixedClock, HotelId, ReservationId, RoomId};
    use domain::{
        ExternalBookingRef, GuestDetails, Money, NewReservation, PaymentStatus,
        ReservationStatus, StayDates,
    };
    use inventory_store::InMemoryInventoryStore;

    use super::*;
    use crate::notifications::{DispatcherConfig, InMemoryNotifier, NotificationDispatcher};

    struct Fixture {
        service: ReservationService<InMemoryInventoryStore>,
        store: InMemoryInventoryStore,
        channel: InMemoryChannelAdapter,
    }

    fn fixture() -> Fixture {
        let store = InMemoryInventoryStore::new();
        let channel = InMemoryChannelAdapter::new(Channel::Beds24);
        let registry = ChannelRegistry::new().with(Arc::new(channel.clone()));
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
        let service = ReservationService::new(
            store.clone(),
            registry,
            Arc::new(mapping),
            notifications,
            clock,
        );
        Fixture {
            service,
            store,
            channel,
        }
    }

    async fn seed(
        store: &InMemoryInventoryStore,
        external: Option<ExternalBookingRef>,
    ) -> Reservation {
        let stay = StayDates::new(
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 6, 3).unwrap(),
        )
        .unwrap();
        let reservation = NewReservation {
            id: ReservationId::new(),
            hotel_id: HotelId::new(1),
            room_id: RoomId::new(10),
            guest: GuestDetails::new("Ada Lovelace", "ada@example.com"),
            stay,
            adults: 2,
            children: 0,
            total_price: Money::from_minor(20000),
            notes: None,
            check_in_notes: None,
            cancellation_token: Some(CancellationToken::issue()),
            payment_status: PaymentStatus::Unpaid,
            status: ReservationStatus::Confirmed,
            external,
        };
        store.insert_external(reservation).await.unwrap()
    }

    #[tokio::test]
    async fn test_resolves_reservation_by_token() {
        let f = fixture();
        let seeded = seed(&f.store, None).await;
        let token = seeded.cancellation_token.clone().unwrap();

        let found = f.service.resolve_by_token(token.as_str()).await.unwrap();
        assert_eq!(found.id, seeded.id);
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_tokens_are_not_found() {
        let f = fixture();
        let unknown = CancellationToken::issue();

        for raw in [unknown.as_str(), "short", ""] {
            let err = f.service.resolve_by_token(raw).await.unwrap_err();
            assert!(matches!(err, EngineError::NotFound { .. }), "{raw}");
        }
    }

    #[tokio::test]
    async fn test_cancel_by_token_cancels() {
        let f = fixture();
        let seeded = seed(&f.store, None).await;
        let token = seeded.cancellation_token.clone().unwrap();

        let outcome = f.service.cancel_by_token(token.as_str()).await.unwrap();
        assert_eq!(outcome.reservation.status, ReservationStatus::Cancelled);
        assert!(outcome.channel_sync.is_none());
    }

    #[tokio::test]
    async fn test_second_cancel_is_an_invalid_transition() {
        let f = fixture();
        let seeded = seed(&f.store, None).await;
        let token = seeded.cancellation_token.clone().unwrap();

        f.service.cancel_by_token(token.as_str()).await.unwrap();
        let err = f.service.cancel_by_token(token.as_str()).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_channel_failure_is_partial_success() {
        let f = fixture();
        let external = ExternalBookingRef::new(Channel::Beds24, "B24-77");
        let seeded = seed(&f.store, Some(external)).await;
        let token = seeded.cancellation_token.clone().unwrap();
        f.channel.set_fail(true).await;

        let outcome = f.service.cancel_by_token(token.as_str()).await.unwrap();
        assert_eq!(outcome.reservation.status, ReservationStatus::Cancelled);
        let sync = outcome.channel_sync.unwrap();
        assert!(!sync.ok);
        assert_eq!(sync.channel, Channel::Beds24);
    }
}
