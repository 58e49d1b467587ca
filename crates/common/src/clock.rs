//! Source of "today" for date-sensitive rules.

use chrono::{NaiveDate, Utc};

/// Supplies the current calendar date.
///
/// Booking rules compare against today (arrival not in the past, guest
/// lookups hide expired stays); injecting the clock keeps those rules
/// testable with fixed dates.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// A clock frozen on one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
