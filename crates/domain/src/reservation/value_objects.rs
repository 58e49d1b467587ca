//! Value objects for the reservation domain.

use chrono::{Days, NaiveDate};
use common::Channel;
use serde::{Deserialize, Serialize};

use super::ReservationError;

/// Money amount in minor units (hundredths) to avoid floating point issues.
///
/// Currency-agnostic: the hotel group prices in a single currency and the
/// channels are configured with the same one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a new amount from minor units (e.g., 1000 = 10.00).
    pub fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Creates an amount from a decimal value, rounding to the nearest minor unit.
    ///
    /// Returns None for NaN or infinite input.
    pub fn from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Some(Self((value * 100.0).round() as i64))
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in minor units.
    pub fn minor(&self) -> i64 {
        self.0
    }

    /// Returns the amount as a decimal value, for wire formats that want one.
    pub fn as_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money(self.0 * i64::from(quantity))
    }

    /// Splits the amount into `parts` shares that sum exactly to the original.
    ///
    /// Leftover minor units go to the earliest shares, one each.
    pub fn split_evenly(&self, parts: u32) -> Vec<Money> {
        if parts == 0 {
            return Vec::new();
        }
        let parts_i = i64::from(parts);
        let base = self.0.div_euclid(parts_i);
        let remainder = self.0.rem_euclid(parts_i);
        (0..parts_i)
            .map(|i| Money(base + i64::from(i < remainder)))
            .collect()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// Contact details of the guest holding the reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GuestDetails {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
}

impl GuestDetails {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

/// Arrival and departure dates of a stay; departure is always after arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StayDates {
    arrival: NaiveDate,
    departure: NaiveDate,
}

impl StayDates {
    pub fn new(arrival: NaiveDate, departure: NaiveDate) -> Result<Self, ReservationError> {
        if departure <= arrival {
            return Err(ReservationError::InvalidStay {
                arrival,
                departure,
            });
        }
        Ok(Self {
            arrival,
            departure,
        })
    }

    pub fn arrival(&self) -> NaiveDate {
        self.arrival
    }

    pub fn departure(&self) -> NaiveDate {
        self.departure
    }

    /// Number of nights between arrival and departure.
    pub fn nights(&self) -> u32 {
        (self.departure - self.arrival).num_days() as u32
    }

    /// Every night of the stay, starting with the arrival date.
    pub fn each_night(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.arrival
            .iter_days()
            .take_while(move |day| *day < self.departure)
    }

    /// Returns true if the two stays share at least one night.
    pub fn overlaps(&self, other: &StayDates) -> bool {
        self.arrival < other.departure && other.arrival < self.departure
    }

    /// Returns true if the guest sleeps there on the night of `date`.
    pub fn covers_night(&self, date: NaiveDate) -> bool {
        self.arrival <= date && date < self.departure
    }

    /// The date after `last_night`, for channels that express stays as
    /// first/last night instead of arrival/departure.
    pub fn departure_after_last_night(last_night: NaiveDate) -> Option<NaiveDate> {
        last_night.checked_add_days(Days::new(1))
    }
}

/// Identifier of a booking on an external channel.
///
/// Unique per channel; the reconciliation idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalBookingRef {
    pub channel: Channel,
    pub booking_id: String,
}

impl ExternalBookingRef {
    pub fn new(channel: Channel, booking_id: impl Into<String>) -> Self {
        Self {
            channel,
            booking_id: booking_id.into(),
        }
    }
}

impl std::fmt::Display for ExternalBookingRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.channel, self.booking_id)
    }
}
