use chrono::NaiveDate;
use common::{HotelId, ReservationId, RoomId};
use domain::{ExternalBookingRef, ReservationStatus};
use thiserror::Error;

/// Errors that can occur when interacting with the inventory store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Every unit of the room is already taken on at least one night of the stay.
    #[error("Room {room_id} has no capacity left between {arrival} and {departure}")]
    CapacityExceeded {
        room_id: RoomId,
        arrival: NaiveDate,
        departure: NaiveDate,
    },

    /// The room does not exist or belongs to another hotel.
    #[error("Room {room_id} not found in hotel {hotel_id}")]
    RoomNotFound { room_id: RoomId, hotel_id: HotelId },

    /// The reservation was not found.
    #[error("Reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    /// Another writer already inserted a reservation for this external booking.
    #[error("External booking {0} already exists")]
    DuplicateExternalBooking(ExternalBookingRef),

    /// The status changed between read and write.
    #[error("Reservation {id} status changed concurrently: expected {expected}, found {actual}")]
    StaleStatus {
        id: ReservationId,
        expected: ReservationStatus,
        actual: ReservationStatus,
    },

    /// A persisted row could not be decoded into the domain model.
    #[error("Corrupt reservation row: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for inventory store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
