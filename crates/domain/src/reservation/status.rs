//! Reservation status state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ReservationError;

/// The lifecycle state of a reservation (`room_status`).
///
/// State transitions:
/// ```text
/// Pending ──► Confirmed ──► CheckedIn ──┬──► CheckedOut
///    │            │                     └──► Completed
///    └────────────┴──► Cancelled
/// ```
/// External channels may additionally cancel from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Created, awaiting confirmation.
    #[default]
    Pending,

    /// Confirmed by an operator or by the originating channel.
    Confirmed,

    /// Guest is in house.
    CheckedIn,

    /// Guest has left (terminal state).
    CheckedOut,

    /// Stay closed out by the front desk (terminal state).
    Completed,

    /// Reservation was cancelled (terminal state).
    Cancelled,
}

impl ReservationStatus {
    /// Returns true if an operator can confirm in this state.
    pub fn can_confirm(&self) -> bool {
        matches!(self, ReservationStatus::Pending)
    }

    /// Returns true if the guest can be checked in.
    pub fn can_check_in(&self) -> bool {
        matches!(self, ReservationStatus::Confirmed)
    }

    /// Returns true if the guest can be checked out.
    pub fn can_check_out(&self) -> bool {
        matches!(self, ReservationStatus::CheckedIn)
    }

    /// Returns true if the stay can be closed out as completed.
    pub fn can_complete(&self) -> bool {
        matches!(self, ReservationStatus::CheckedIn)
    }

    /// Returns true if a guest or operator may cancel in this state.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Pending | ReservationStatus::Confirmed
        )
    }

    /// Returns true if an external channel may cancel in this state.
    pub fn can_cancel_externally(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::CheckedOut
                | ReservationStatus::Completed
                | ReservationStatus::Cancelled
        )
    }

    /// Returns true if a reservation in this state holds a room unit.
    ///
    /// Only occupying reservations count against `Room::quantity`.
    pub fn is_occupying(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Pending
                | ReservationStatus::Confirmed
                | ReservationStatus::CheckedIn
        )
    }

    /// Returns the persisted status name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::CheckedIn => "checked_in",
            ReservationStatus::CheckedOut => "checked_out",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    /// All statuses that count against room capacity.
    pub fn occupying() -> [ReservationStatus; 3] {
        [
            ReservationStatus::Pending,
            ReservationStatus::Confirmed,
            ReservationStatus::CheckedIn,
        ]
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = ReservationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReservationStatus::Pending),
            "confirmed" => Ok(ReservationStatus::Confirmed),
            "checked_in" => Ok(ReservationStatus::CheckedIn),
            "checked_out" => Ok(ReservationStatus::CheckedOut),
            "completed" => Ok(ReservationStatus::Completed),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            other => Err(ReservationError::UnknownStatus(other.to_string())),
        }
    }
}

/// Whether the guest has paid for the stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ReservationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "paid" => Ok(PaymentStatus::Paid),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(ReservationError::UnknownStatus(other.to_string())),
        }
    }
}
