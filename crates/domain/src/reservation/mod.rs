//! Reservation entity, status state machine and related types.

mod model;
mod status;
mod token;
mod transition;
mod value_objects;

use chrono::NaiveDate;
use thiserror::Error;

pub use model::{ChannelSourcedFields, NewReservation, Reservation};
pub use status::{PaymentStatus, ReservationStatus};
pub use token::CancellationToken;
pub use transition::{SideEffect, StatusEvent, Transition};
pub use value_objects::{ExternalBookingRef, GuestDetails, Money, StayDates};

/// Errors that can occur during reservation operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReservationError {
    /// The requested change is not allowed from the current status.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidTransition {
        current_state: ReservationStatus,
        action: &'static str,
    },

    /// Departure must be strictly after arrival.
    #[error("Departure {departure} must be after arrival {arrival}")]
    InvalidStay {
        arrival: NaiveDate,
        departure: NaiveDate,
    },

    /// A persisted status string is not recognized.
    #[error("Unknown status: {0}")]
    UnknownStatus(String),
}
