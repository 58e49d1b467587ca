//! Beds24 booking notifications.
//!
//! Bodies arrive as a single booking object, as `{"bookings": [...]}` or as a
//! bare array. Field names vary between API versions, so each field is looked
//! up under several names.

use common::Channel;
use domain::{GuestDetails, StayDates};
use serde_json::Value;

use super::{
    ExternalBookingEvent, ParsedItem, UNKNOWN_GUEST, WebhookParser, audit_note, items, price,
    require_date, stay,
};
use crate::WebhookError;
use crate::json::{DateField, first_date, first_decimal, first_string, first_u32};
use crate::status_map::beds24_status;

const BOOKING_ID: &[&str] = &["bookId", "id", "bookingId"];
const ROOM_ID: &[&str] = &["roomId", "room_id"];
const STATUS: &[&str] = &["status"];
const ARRIVAL: &[&str] = &["arrival", "arrivalDate", "firstNight", "check_in"];
const DEPARTURE: &[&str] = &["departure", "departureDate", "check_out"];
const LAST_NIGHT: &[&str] = &["lastNight"];
const NAME: &[&str] = &["guestName", "name", "guest_name"];
const FIRST_NAME: &[&str] = &["guestFirstName", "firstName"];
const LAST_NAME: &[&str] = &["guestLastName", "lastName"];
const EMAIL: &[&str] = &["guestEmail", "email"];
const PHONE: &[&str] = &["guestPhone", "phone", "guestMobile", "mobile"];
const CITY: &[&str] = &["guestCity", "city"];
const ADDRESS: &[&str] = &["guestAddress", "address"];
const ADULTS: &[&str] = &["numAdult", "adults"];
const CHILDREN: &[&str] = &["numChild", "children"];
const PRICE: &[&str] = &["price", "totalPrice"];
const SOURCE: &[&str] = &["referer", "apiSource"];
const COMMENTS: &[&str] = &["comments", "notes", "guestComments"];

/// Parser for Beds24-style webhooks (adapter A).
#[derive(Debug, Clone, Copy, Default)]
pub struct Beds24WebhookParser;

impl WebhookParser for Beds24WebhookParser {
    fn channel(&self) -> Channel {
        Channel::Beds24
    }

    fn parse(&self, body: &Value) -> Result<Vec<ParsedItem>, WebhookError> {
        Ok(items(body, "bookings")?.into_iter().map(parse_item).collect())
    }
}

fn parse_item(item: &Value) -> ParsedItem {
    let booking_id = first_string(item, BOOKING_ID).ok_or(WebhookError::MissingField("bookId"))?;
    let room_id = first_string(item, ROOM_ID).ok_or(WebhookError::MissingField("roomId"))?;

    let arrival = require_date(item, "arrival", ARRIVAL)?;
    let departure = match first_date(item, DEPARTURE) {
        DateField::Found(date) => date,
        DateField::Invalid(value) => {
            return Err(WebhookError::InvalidField {
                field: "departure",
                value,
            });
        }
        DateField::Absent => {
            let last_night = require_date(item, "departure", LAST_NIGHT)?;
            StayDates::departure_after_last_night(last_night).ok_or(
                WebhookError::InvalidField {
                    field: "lastNight",
                    value: last_night.to_string(),
                },
            )?
        }
    };

    let raw_status = first_string(item, STATUS).unwrap_or_default();
    let source = first_string(item, SOURCE);
    let comments = first_string(item, COMMENTS);

    Ok(ExternalBookingEvent {
        channel: Channel::Beds24,
        status: beds24_status(&raw_status),
        raw_status,
        stay: stay(arrival, departure)?,
        guest: guest(item),
        adults: first_u32(item, ADULTS).unwrap_or(1),
        children: first_u32(item, CHILDREN).unwrap_or(0),
        total_price: price(first_decimal(item, PRICE))?,
        audit_note: audit_note(
            Channel::Beds24,
            &booking_id,
            source.as_deref(),
            comments.as_deref(),
        ),
        external_room_id: room_id,
        external_booking_id: booking_id,
    })
}

fn guest(item: &Value) -> GuestDetails {
    let name = first_string(item, NAME).unwrap_or_else(|| {
        let parts: Vec<String> = [first_string(item, FIRST_NAME), first_string(item, LAST_NAME)]
            .into_iter()
            .flatten()
            .collect();
        if parts.is_empty() {
            UNKNOWN_GUEST.to_string()
        } else {
            parts.join(" ")
        }
    });

    GuestDetails {
        name,
        email: first_string(item, EMAIL)
            .unwrap_or_default()
            .to_ascii_lowercase(),
        phone: first_string(item, PHONE),
        city: first_string(item, CITY),
        address: first_string(item, ADDRESS),
    }
}
