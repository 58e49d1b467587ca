//! Engine error types.

use channels::WebhookError;
use chrono::NaiveDate;
use common::{ReservationId, RoomId};
use domain::{ReservationError, ValidationFailure};
use inventory_store::StoreError;
use thiserror::Error;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request broke one or more booking rules.
    #[error("Validation failed: {0}")]
    ValidationFailed(ValidationFailure),

    /// Catalog or channel configuration is inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The room is fully booked on at least one night of the stay.
    #[error("Room {room_id} is fully booked between {arrival} and {departure}")]
    CapacityExceeded {
        room_id: RoomId,
        arrival: NaiveDate,
        departure: NaiveDate,
    },

    /// The status change is not allowed from the current status.
    #[error(transparent)]
    InvalidTransition(#[from] ReservationError),

    /// Another writer changed the reservation first.
    #[error("Reservation {0} was modified concurrently")]
    Conflict(ReservationId),

    /// The requested record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A webhook body could not be read at all.
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(#[from] WebhookError),

    /// The store failed.
    #[error("Persistence error: {0}")]
    Persistence(StoreError),
}

impl EngineError {
    pub fn reservation_not_found(id: impl ToString) -> Self {
        EngineError::NotFound {
            entity: "Reservation",
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CapacityExceeded {
                room_id,
                arrival,
                departure,
            } => EngineError::CapacityExceeded {
                room_id,
                arrival,
                departure,
            },
            StoreError::RoomNotFound { room_id, hotel_id } => EngineError::Configuration(
                format!("room {room_id} is not part of hotel {hotel_id}"),
            ),
            StoreError::ReservationNotFound(id) => EngineError::reservation_not_found(id),
            StoreError::StaleStatus { id, .. } => EngineError::Conflict(id),
            other => EngineError::Persistence(other),
        }
    }
}

/// Convenience type alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;
