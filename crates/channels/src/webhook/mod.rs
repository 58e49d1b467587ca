//! Webhook normalization.
//!
//! Each channel delivers booking notifications in its own shape. A parser per
//! channel turns a body into zero or more [`ExternalBookingEvent`]s; items
//! that cannot be normalized are returned as errors next to the good ones so
//! one bad item never sinks a batch.

mod beds24;
mod channex;

use chrono::NaiveDate;
use common::Channel;
use domain::{ExternalBookingRef, GuestDetails, Money, ReservationStatus, StayDates};
use serde_json::Value;

pub use beds24::Beds24WebhookParser;
pub use channex::ChannexWebhookParser;

use crate::WebhookError;
use crate::json::{DateField, first_date};

/// Guest name used when a channel sends none.
const UNKNOWN_GUEST: &str = "Guest";

/// A booking notification in channel-neutral form.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalBookingEvent {
    pub channel: Channel,
    pub external_room_id: String,
    pub external_booking_id: String,

    /// Status mapped through the channel's lookup table.
    pub status: ReservationStatus,

    /// Status as the channel sent it.
    pub raw_status: String,
    pub stay: StayDates,
    pub guest: GuestDetails,
    pub adults: u32,
    pub children: u32,
    pub total_price: Money,

    /// Source, external ID and comments folded into one audit line.
    pub audit_note: String,
}

impl ExternalBookingEvent {
    pub fn external_ref(&self) -> ExternalBookingRef {
        ExternalBookingRef::new(self.channel, self.external_booking_id.clone())
    }
}

/// Result of normalizing one item of a webhook body.
pub type ParsedItem = Result<ExternalBookingEvent, WebhookError>;

/// Normalizes one channel's webhook bodies.
pub trait WebhookParser: Send + Sync {
    fn channel(&self) -> Channel;

    /// Splits a body into items and normalizes each.
    ///
    /// Fails as a whole only when the body has none of the known shapes.
    fn parse(&self, body: &Value) -> Result<Vec<ParsedItem>, WebhookError>;
}

/// Parses a webhook body with the parser for `channel`.
pub fn parse_webhook(channel: Channel, body: &Value) -> Result<Vec<ParsedItem>, WebhookError> {
    match channel {
        Channel::Beds24 => Beds24WebhookParser.parse(body),
        Channel::Channex => ChannexWebhookParser.parse(body),
    }
}

/// Reads a required date field.
fn require_date(obj: &Value, field: &'static str, keys: &[&str]) -> Result<NaiveDate, WebhookError> {
    match first_date(obj, keys) {
        DateField::Found(date) => Ok(date),
        DateField::Invalid(value) => Err(WebhookError::InvalidField { field, value }),
        DateField::Absent => Err(WebhookError::MissingField(field)),
    }
}

fn stay(arrival: NaiveDate, departure: NaiveDate) -> Result<StayDates, WebhookError> {
    StayDates::new(arrival, departure).map_err(|_| WebhookError::InvalidField {
        field: "departure",
        value: format!("{departure} is not after arrival {arrival}"),
    })
}

fn price(amount: Option<f64>) -> Result<Money, WebhookError> {
    match amount {
        None => Ok(Money::zero()),
        Some(value) => Money::from_decimal(value).ok_or(WebhookError::InvalidField {
            field: "price",
            value: value.to_string(),
        }),
    }
}

/// Builds the audit line stored in `check_in_notes`.
fn audit_note(
    channel: Channel,
    booking_id: &str,
    source: Option<&str>,
    comments: Option<&str>,
) -> String {
    let mut note = format!("[{channel}] booking {booking_id}");
    if let Some(source) = source {
        note.push_str(&format!(" via {source}"));
    }
    if let Some(comments) = comments {
        note.push_str(&format!(": {comments}"));
    }
    note
}

/// Splits a body that may be one object, an array, or an array under `key`.
fn items<'a>(body: &'a Value, key: &str) -> Result<Vec<&'a Value>, WebhookError> {
    match body {
        Value::Array(items) => Ok(items.iter().collect()),
        Value::Object(obj) => match obj.get(key) {
            Some(Value::Array(items)) => Ok(items.iter().collect()),
            Some(single @ Value::Object(_)) => Ok(vec![single]),
            Some(other) => Err(WebhookError::Malformed(format!(
                "`{key}` must be an object or array, got {other}"
            ))),
            None => Ok(vec![body]),
        },
        other => Err(WebhookError::Malformed(format!(
            "expected an object or array, got {other}"
        ))),
    }
}
