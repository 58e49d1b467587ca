//! Channex booking notifications.
//!
//! Bodies are `{"event": ..., "payload": ...}`. Only `booking_*` events carry
//! bookings; anything else is acknowledged and ignored.

use common::Channel;
use domain::GuestDetails;
use serde_json::Value;

use super::{
    ExternalBookingEvent, ParsedItem, UNKNOWN_GUEST, WebhookParser, audit_note, items, price,
    require_date, stay,
};
use crate::WebhookError;
use crate::json::{first_decimal, first_string, first_u32};
use crate::status_map::channex_status;

const BOOKING_EVENT_PREFIX: &str = "booking_";
const CANCELLATION_EVENT: &str = "booking_cancellation";

static NULL: Value = Value::Null;

/// Parser for Channex-style webhooks (adapter B).
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannexWebhookParser;

impl WebhookParser for ChannexWebhookParser {
    fn channel(&self) -> Channel {
        Channel::Channex
    }

    fn parse(&self, body: &Value) -> Result<Vec<ParsedItem>, WebhookError> {
        let event = first_string(body, &["event"])
            .ok_or_else(|| WebhookError::Malformed("missing `event`".to_string()))?;
        if !event.starts_with(BOOKING_EVENT_PREFIX) {
            tracing::debug!(event = %event, "Ignoring non-booking event");
            return Ok(Vec::new());
        }

        let payload = body
            .get("payload")
            .ok_or_else(|| WebhookError::Malformed("missing `payload`".to_string()))?;
        Ok(items(payload, "bookings")?
            .into_iter()
            .map(|item| parse_item(&event, item))
            .collect())
    }
}

fn parse_item(event: &str, item: &Value) -> ParsedItem {
    let booking_id =
        first_string(item, &["booking_id", "id"]).ok_or(WebhookError::MissingField("booking_id"))?;

    let rooms: &[Value] = item
        .get("rooms")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let room_id = rooms
        .first()
        .and_then(|room| first_string(room, &["room_type_id"]))
        .or_else(|| first_string(item, &["room_type_id"]))
        .ok_or(WebhookError::MissingField("room_type_id"))?;

    let arrival = require_date(item, "arrival", &["arrival_date", "arrival"])?;
    let departure = require_date(item, "departure", &["departure_date", "departure"])?;

    let raw_status = first_string(item, &["status"]).unwrap_or_else(|| {
        if event == CANCELLATION_EVENT {
            "cancelled".to_string()
        } else {
            "new".to_string()
        }
    });

    let (adults, children) = occupancy(item, rooms);
    let source = first_string(item, &["source", "ota_name"]);
    let comments = first_string(item, &["notes"]);

    Ok(ExternalBookingEvent {
        channel: Channel::Channex,
        status: channex_status(&raw_status),
        raw_status,
        stay: stay(arrival, departure)?,
        guest: guest(item.get("customer").unwrap_or(&NULL)),
        adults,
        children,
        total_price: price(first_decimal(item, &["amount", "total_price"]))?,
        audit_note: audit_note(
            Channel::Channex,
            &booking_id,
            source.as_deref(),
            comments.as_deref(),
        ),
        external_room_id: room_id,
        external_booking_id: booking_id,
    })
}

/// Sums occupancy over the booked rooms, falling back to top-level counts
/// when no room carries an `occupancy` block.
fn occupancy(item: &Value, rooms: &[Value]) -> (u32, u32) {
    let blocks: Vec<&Value> = rooms
        .iter()
        .filter_map(|room| room.get("occupancy"))
        .collect();
    if blocks.is_empty() {
        return (
            first_u32(item, &["guests", "adults"]).unwrap_or(1),
            first_u32(item, &["children"]).unwrap_or(0),
        );
    }
    blocks.iter().fold((0, 0), |(adults, children), occupancy| {
        (
            adults + first_u32(occupancy, &["adults"]).unwrap_or(0),
            children + first_u32(occupancy, &["children"]).unwrap_or(0),
        )
    })
}

fn guest(customer: &Value) -> GuestDetails {
    let parts: Vec<String> = [
        first_string(customer, &["name"]),
        first_string(customer, &["surname"]),
    ]
    .into_iter()
    .flatten()
    .collect();
    let name = if parts.is_empty() {
        UNKNOWN_GUEST.to_string()
    } else {
        parts.join(" ")
    };

    GuestDetails {
        name,
        email: first_string(customer, &["mail", "email"])
            .unwrap_or_default()
            .to_ascii_lowercase(),
        phone: first_string(customer, &["phone"]),
        city: first_string(customer, &["city"]),
        address: first_string(customer, &["address"]),
    }
}
