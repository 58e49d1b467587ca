//! HTTP route handlers and the state they share.

pub mod admin;
pub mod bookings;
pub mod health;
pub mod metrics;
pub mod reservations;
pub mod webhooks;

use std::sync::Arc;

use channels::{ChannelRegistry, RoomChannelMap};
use common::{Clock, ReservationId};
use engine::{
    AvailabilitySync, BookingService, NotificationDispatcher, Reconciler, ReservationService,
};
use inventory_store::InventoryStore;

use crate::error::ApiError;
use crate::rate_limit::SlidingWindowLimiter;

/// Shared application state accessible from all handlers.
pub struct AppState<S: InventoryStore> {
    pub bookings: BookingService<S>,
    pub reservations: ReservationService<S>,
    pub reconciler: Reconciler<S>,
    pub availability: AvailabilitySync<S>,
    pub rate_limiter: Arc<SlidingWindowLimiter>,
    pub clock: Arc<dyn Clock>,
}

impl<S: InventoryStore + Clone> AppState<S> {
    /// Wires every engine service over one store.
    pub fn new(
        store: S,
        channels: ChannelRegistry,
        mapping: RoomChannelMap,
        notifications: NotificationDispatcher,
        clock: Arc<dyn Clock>,
        rate_limiter: Arc<SlidingWindowLimiter>,
    ) -> Self {
        let mapping = Arc::new(mapping);
        Self {
            bookings: BookingService::new(store.clone(), clock.clone()),
            reservations: ReservationService::new(
                store.clone(),
                channels.clone(),
                mapping.clone(),
                notifications.clone(),
                clock.clone(),
            ),
            reconciler: Reconciler::new(store.clone(), mapping.clone(), notifications),
            availability: AvailabilitySync::new(store, channels, mapping),
            rate_limiter,
            clock,
        }
    }
}

fn parse_reservation_id(id: &str) -> Result<ReservationId, ApiError> {
    uuid::Uuid::parse_str(id)
        .map(ReservationId::from_uuid)
        .map_err(|e| ApiError::BadRequest(format!("Invalid reservation ID: {e}")))
}
