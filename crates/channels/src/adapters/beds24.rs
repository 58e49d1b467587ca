//! Beds24-style JSON API adapter.
//!
//! Credentials travel inside every JSON body as an `authentication` object.
//! Errors may arrive as `{"error": ..., "errorCode": ...}` with HTTP 200.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{Channel, ReservationId};
use domain::ExternalBookingRef;
use serde_json::{Value, json};

use super::{
    ChannelAdapter, ChannelBookingRequest, RawResponse, build_client, log_failure, record_outcome,
    redact, send,
};
use crate::json::first_string;
use crate::{ChannelError, RoomMapping};

const CHANNEL: Channel = Channel::Beds24;

/// Status code Beds24 uses for a confirmed booking.
const STATUS_CONFIRMED: &str = "1";

/// Status code Beds24 uses for a cancelled booking.
const STATUS_CANCELLED: &str = "0";

/// Connection settings for the Beds24 API.
#[derive(Clone)]
pub struct Beds24Config {
    pub base_url: String,
    pub api_key: String,
    pub prop_key: String,
    pub timeout: Duration,
}

impl Beds24Config {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        prop_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            prop_key: prop_key.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns true if every credential is present.
    pub fn is_complete(&self) -> bool {
        !self.base_url.trim().is_empty()
            && !self.api_key.trim().is_empty()
            && !self.prop_key.trim().is_empty()
    }
}

impl std::fmt::Debug for Beds24Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Beds24Config")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("prop_key", &redact(&self.prop_key))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Adapter for the Beds24-style channel (adapter A).
#[derive(Debug, Clone)]
pub struct Beds24Adapter {
    config: Beds24Config,
    client: reqwest::Client,
}

impl Beds24Adapter {
    pub fn new(config: Beds24Config) -> Result<Self, ChannelError> {
        let client = build_client(CHANNEL, config.timeout)?;
        Ok(Self { config, client })
    }

    fn authentication(&self) -> Value {
        json!({
            "apiKey": self.config.api_key,
            "propKey": self.config.prop_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn call(
        &self,
        operation: &'static str,
        reservation_id: Option<ReservationId>,
        path: &str,
        body: Value,
    ) -> Result<Value, ChannelError> {
        let request = self.client.post(self.url(path)).json(&body);
        let result = send(CHANNEL, operation, request).await.and_then(interpret);
        match &result {
            Ok(_) => record_outcome(CHANNEL, operation, "ok"),
            Err(e) => {
                if matches!(
                    e,
                    ChannelError::Rejected { .. } | ChannelError::InvalidResponse { .. }
                ) {
                    record_outcome(CHANNEL, operation, e.kind());
                }
                log_failure(CHANNEL, operation, reservation_id, e);
            }
        }
        result
    }
}

/// Interprets a raw response, treating in-band error objects as rejections.
fn interpret(raw: RawResponse) -> Result<Value, ChannelError> {
    if !raw.status.is_success() {
        return Err(ChannelError::Rejected {
            channel: CHANNEL,
            status: raw.status.as_u16(),
            body: raw.body,
        });
    }

    let value: Value = serde_json::from_str(&raw.body).map_err(|_| {
        ChannelError::InvalidResponse {
            channel: CHANNEL,
            message: format!("non-JSON body: {}", raw.body),
        }
    })?;

    if value.get("error").is_some() {
        return Err(ChannelError::Rejected {
            channel: CHANNEL,
            status: raw.status.as_u16(),
            body: raw.body,
        });
    }
    Ok(value)
}

/// Builds the `setBooking` body for a new booking.
///
/// The total is broken down night by night so the channel shows a per-day
/// rate; leftover minor units go to the earliest nights.
fn booking_body(authentication: Value, request: &ChannelBookingRequest) -> Value {
    let nights: Vec<NaiveDate> = request.stay.each_night().collect();
    let shares = request.total_price.split_evenly(request.stay.nights());
    let invoice: Vec<Value> = nights
        .iter()
        .zip(shares)
        .map(|(night, price)| {
            json!({
                "description": format!("Room night {night}"),
                "qty": 1,
                "price": price.as_decimal(),
            })
        })
        .collect();
    let last_night = nights.last().copied().unwrap_or(request.stay.arrival());

    json!({
        "authentication": authentication,
        "roomId": request.mapping.external_room_id,
        "status": STATUS_CONFIRMED,
        "firstNight": request.stay.arrival().format("%Y-%m-%d").to_string(),
        "lastNight": last_night.format("%Y-%m-%d").to_string(),
        "numAdult": request.adults,
        "numChild": request.children,
        "guestName": request.guest.name,
        "guestEmail": request.guest.email,
        "guestPhone": request.guest.phone.clone().unwrap_or_default(),
        "price": request.total_price.as_decimal(),
        "notes": request.notes.clone().unwrap_or_default(),
        "apiReference": request.reservation_id.to_string(),
        "invoice": invoice,
    })
}

#[async_trait]
impl ChannelAdapter for Beds24Adapter {
    fn channel(&self) -> Channel {
        CHANNEL
    }

    #[tracing::instrument(skip_all, fields(reservation_id = %request.reservation_id))]
    async fn create_booking(
        &self,
        request: &ChannelBookingRequest,
    ) -> Result<ExternalBookingRef, ChannelError> {
        let body = booking_body(self.authentication(), request);
        let response = self
            .call(
                "create_booking",
                Some(request.reservation_id),
                "json/setBooking",
                body,
            ).await?;

        let booking_id =
            first_string(&response, &["bookId"]).ok_or_else(|| ChannelError::InvalidResponse {
                channel: CHANNEL,
                message: format!("response has no bookId: {response}"),
            })?;
        tracing::info!(booking_id = %booking_id, "Booking created on channel");
        Ok(ExternalBookingRef::new(CHANNEL, booking_id))
    }

    #[tracing::instrument(skip_all, fields(external = %external))]
    async fn cancel_booking(&self, external: &ExternalBookingRef) -> Result<(), ChannelError> {
        let body = json!({
            "authentication": self.authentication(),
            "bookId": external.booking_id,
            "status": STATUS_CANCELLED,
        });
        self.call("cancel_booking", None, "json/setBooking", body).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, mapping), fields(room = %mapping.external_room_id))]
    async fn push_availability(
        &self,
        mapping: &RoomMapping,
        date: NaiveDate,
        count: u32,
    ) -> Result<(), ChannelError> {
        let mut dates = serde_json::Map::new();
        dates.insert(date.format("%Y%m%d").to_string(), json!({ "i": count }));
        let body = json!({
            "authentication": self.authentication(),
            "roomId": mapping.external_room_id,
            "dates": dates,
        });
        self.call("push_availability", None, "json/setRoomDates", body).await?;
        Ok(())
    }
}
