//! Fixed lookup tables from channel status vocabularies to local statuses.
//!
//! Both tables are total: a code neither table knows maps to `Confirmed`,
//! since a channel only notifies us about bookings it holds.

use domain::ReservationStatus;

/// Beds24 numeric status codes.
pub fn beds24_status(code: &str) -> ReservationStatus {
    match code.trim() {
        "0" => ReservationStatus::Cancelled,
        "1" => ReservationStatus::Confirmed,
        // 2 = new, 3 = request: not yet accepted by the property.
        "2" | "3" => ReservationStatus::Pending,
        _ => ReservationStatus::Confirmed,
    }
}

/// Channex booking revision statuses.
pub fn channex_status(status: &str) -> ReservationStatus {
    if status.trim().eq_ignore_ascii_case("cancelled") {
        ReservationStatus::Cancelled
    } else {
        ReservationStatus::Confirmed
    }
}
