//! Validation of direct booking requests.
//!
//! Applied only to the direct-booking path. Channel webhooks are trusted:
//! rejecting one over a local rule would desynchronize the ledger for good.

use std::sync::LazyLock;

use chrono::NaiveDate;
use common::{HotelId, RoomId};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::catalog::{Hotel, Room};
use crate::reservation::{GuestDetails, Money, StayDates};

/// Hard cap on guests per direct booking.
pub const MAX_GUESTS: u32 = 10;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

/// A booking request as submitted by the booking form.
///
/// Every field is optional so that missing fields are reported alongside
/// every other violation instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    pub hotel_id: Option<i64>,
    pub room_id: Option<i64>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub guests_count: Option<i64>,
    pub total_price: Option<f64>,
    pub notes: Option<String>,
}

/// A validated, typed booking command.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingCommand {
    pub hotel_id: HotelId,
    pub room_id: RoomId,
    pub guest: GuestDetails,
    pub stay: StayDates,
    pub adults: u32,
    pub children: u32,

    /// Price declared by the form; when absent the creator prices the stay.
    pub declared_price: Option<Money>,
    pub notes: Option<String>,
}

/// One broken rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Hotel {0} does not exist")]
    UnknownHotel(i64),

    #[error("Room {0} does not exist")]
    UnknownRoom(i64),

    #[error("Room {room_id} does not belong to hotel {hotel_id}")]
    RoomNotInHotel { room_id: i64, hotel_id: i64 },

    #[error("Email address is not valid")]
    InvalidEmail,

    #[error("Number of guests must be between 1 and {max} (got {count})")]
    GuestCountOutOfRange { count: i64, max: u32 },

    #[error("{field} must be a date in YYYY-MM-DD format")]
    InvalidDate { field: &'static str },

    #[error("Check-in date {arrival} is in the past")]
    ArrivalInPast { arrival: NaiveDate },

    #[error("Check-out date must be after check-in date")]
    DepartureNotAfterArrival,

    #[error("Total price cannot be negative")]
    NegativePrice,
}

/// Every rule a request broke, in field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    violations: Vec<Violation>,
}

impl ValidationFailure {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// The first actionable violation, shown to guests.
    pub fn first(&self) -> Option<&Violation> {
        self.violations.first()
    }

    pub fn contains(&self, violation: &Violation) -> bool {
        self.violations.contains(violation)
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self.violations.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationFailure {}

/// Schema and business-rule validation for direct bookings.
#[derive(Debug, Clone)]
pub struct BookingValidator {
    max_guests: u32,
}

impl Default for BookingValidator {
    fn default() -> Self {
        Self {
            max_guests: MAX_GUESTS,
        }
    }
}

impl BookingValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a request against the resolved catalog entries and `today`.
    ///
    /// `hotel` and `room` are whatever the caller found for the requested
    /// IDs. Collects every violation rather than stopping at the first.
    pub fn validate(
        &self,
        request: &BookingRequest,
        hotel: Option<&Hotel>,
        room: Option<&Room>,
        today: NaiveDate,
    ) -> Result<BookingCommand, ValidationFailure> {
        let mut violations = Vec::new();

        let hotel_id = match (request.hotel_id, hotel) {
            (None, _) => {
                violations.push(Violation::MissingField("hotel_id"));
                None
            }
            (Some(id), Some(h)) if h.id.as_i64() == id => Some(h.id),
            (Some(id), _) => {
                violations.push(Violation::UnknownHotel(id));
                None
            }
        };

        let room_id = match (request.room_id, room) {
            (None, _) => {
                violations.push(Violation::MissingField("room_id"));
                None
            }
            (Some(id), Some(r)) if r.id.as_i64() == id => {
                if let Some(hotel_id) = hotel_id
                    && r.hotel_id != hotel_id
                {
                    violations.push(Violation::RoomNotInHotel {
                        room_id: id,
                        hotel_id: hotel_id.as_i64(),
                    });
                }
                Some(r.id)
            }
            (Some(id), _) => {
                violations.push(Violation::UnknownRoom(id));
                None
            }
        };

        let name = non_blank(request.customer_name.as_deref());
        if name.is_none() {
            violations.push(Violation::MissingField("customer_name"));
        }

        let email = non_blank(request.customer_email.as_deref());
        match email {
            None => violations.push(Violation::MissingField("customer_email")),
            Some(e) if !EMAIL.is_match(e) => violations.push(Violation::InvalidEmail),
            Some(_) => {}
        }

        let adults = match request.guests_count {
            None => {
                violations.push(Violation::MissingField("guests_count"));
                None
            }
            Some(count) if count < 1 || count > i64::from(self.max_guests) => {
                violations.push(Violation::GuestCountOutOfRange {
                    count,
                    max: self.max_guests,
                });
                None
            }
            Some(count) => Some(count as u32),
        };

        let arrival = parse_date(request.check_in.as_deref(), "check_in", &mut violations);
        let departure = parse_date(request.check_out.as_deref(), "check_out", &mut violations);

        if let Some(arrival) = arrival
            && arrival < today
        {
            violations.push(Violation::ArrivalInPast { arrival });
        }
        let stay = match (arrival, departure) {
            (Some(a), Some(d)) => match StayDates::new(a, d) {
                Ok(stay) => Some(stay),
                Err(_) => {
                    violations.push(Violation::DepartureNotAfterArrival);
                    None
                }
            },
            _ => None,
        };

        let declared_price = match request.total_price.map(Money::from_decimal) {
            None => None,
            Some(Some(price)) if !price.is_negative() => Some(price),
            Some(_) => {
                violations.push(Violation::NegativePrice);
                None
            }
        };

        match (hotel_id, room_id, name, email, adults, stay) {
            (Some(hotel_id), Some(room_id), Some(name), Some(email), Some(adults), Some(stay))
                if violations.is_empty() =>
            {
                let mut guest = GuestDetails::new(name, email.to_ascii_lowercase());
                guest.phone = non_blank(request.customer_phone.as_deref()).map(str::to_string);
                Ok(BookingCommand {
                    hotel_id,
                    room_id,
                    guest,
                    stay,
                    adults,
                    children: 0,
                    declared_price,
                    notes: non_blank(request.notes.as_deref()).map(str::to_string),
                })
            }
            _ => Err(ValidationFailure::new(violations)),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(
    value: Option<&str>,
    field: &'static str,
    violations: &mut Vec<Violation>,
) -> Option<NaiveDate> {
    match non_blank(value) {
        None => {
            violations.push(Violation::MissingField(field));
            None
        }
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                violations.push(Violation::InvalidDate { field });
                None
            }
        },
    }
}
