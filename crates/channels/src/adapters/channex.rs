//! Channex-style REST API adapter.
//!
//! Authenticated with a `user-api-key` header. Responses are wrapped in
//! `{"data": ...}` on success and `{"errors": ...}` on failure; gateways may
//! answer with non-JSON bodies.

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

const CHANNEL: Channel = Channel::Channex;
const API_KEY_HEADER: &str = "user-api-key";

/// Connection settings for the Channex API.
#[derive(Clone)]
pub struct ChannexConfig {
    pub base_url: String,
    pub api_key: String,
    pub property_id: String,
    pub timeout: Duration,
}

impl ChannexConfig {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        property_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            property_id: property_id.into(),
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
            && !self.property_id.trim().is_empty()
    }
}

impl std::fmt::Debug for ChannexConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannexConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("property_id", &self.property_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Adapter for the Channex-style channel (adapter B).
#[derive(Debug, Clone)]
pub struct ChannexAdapter {
    config: ChannexConfig,
    client: reqwest::Client,
}

impl ChannexAdapter {
    pub fn new(config: ChannexConfig) -> Result<Self, ChannelError> {
        let client = build_client(CHANNEL, config.timeout)?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/api/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            path
        )
    }

    fn property_id<'a>(&'a self, mapping: &'a RoomMapping) -> &'a str {
        mapping
            .external_property_id
            .as_deref()
            .unwrap_or(&self.config.property_id)
    }

    async fn call(
        &self,
        operation: &'static str,
        reservation_id: Option<ReservationId>,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, ChannelError> {
        let request = request.header(API_KEY_HEADER, &self.config.api_key);
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

/// Unwraps the `data` envelope.
///
/// An empty success body (e.g. 204) yields `Value::Null`.
fn interpret(raw: RawResponse) -> Result<Value, ChannelError> {
    if !raw.status.is_success() {
        return Err(ChannelError::Rejected {
            channel: CHANNEL,
            status: raw.status.as_u16(),
            body: raw.body,
        });
    }
    if raw.body.trim().is_empty() {
        return Ok(Value::Null);
    }

    let mut value: Value =
        serde_json::from_str(&raw.body).map_err(|_| ChannelError::InvalidResponse {
            channel: CHANNEL,
            message: format!("non-JSON body: {}", raw.body),
        })?;

    if value.get("errors").is_some() {
        return Err(ChannelError::Rejected {
            channel: CHANNEL,
            status: raw.status.as_u16(),
            body: raw.body,
        });
    }
    match value.get_mut("data") {
        Some(data) => Ok(data.take()),
        None => Err(ChannelError::InvalidResponse {
            channel: CHANNEL,
            message: format!("response has no data envelope: {}", raw.body),
        }),
    }
}

/// Builds the booking body: a flat total and one room with its guest list.
fn booking_body(property_id: &str, request: &ChannelBookingRequest) -> Value {
    let amount = request.total_price.to_string();
    json!({
        "booking": {
            "property_id": property_id,
            "ota_reservation_code": request.reservation_id.to_string(),
            "arrival_date": request.stay.arrival().format("%Y-%m-%d").to_string(),
            "departure_date": request.stay.departure().format("%Y-%m-%d").to_string(),
            "amount": amount,
            "notes": request.notes,
            "customer": {
                "name": request.guest.name,
                "mail": request.guest.email,
                "phone": request.guest.phone,
                "city": request.guest.city,
                "address": request.guest.address,
            },
            "rooms": [{
                "room_type_id": request.mapping.external_room_id,
                "amount": amount,
                "occupancy": {
                    "adults": request.adults,
                    "children": request.children,
                },
                "guests": [{ "name": request.guest.name }],
            }],
        }
    })
}

#[async_trait]
impl ChannelAdapter for ChannexAdapter {
    fn channel(&self) -> Channel {
        CHANNEL
    }

    #[tracing::instrument(skip_all, fields(reservation_id = %request.reservation_id))]
    async fn create_booking(
        &self,
        request: &ChannelBookingRequest,
    ) -> Result<ExternalBookingRef, ChannelError> {
        let body = booking_body(self.property_id(&request.mapping), request);
        let data = self
            .call(
                "create_booking",
                Some(request.reservation_id),
                self.client.post(self.url("bookings")).json(&body),
            )
            .await?;

        let booking_id =
            first_string(&data, &["id"]).ok_or_else(|| ChannelError::InvalidResponse {
                channel: CHANNEL,
                message: format!("booking has no id: {data}"),
            })?;
        tracing::info!(booking_id = %booking_id, "Booking created on channel");
        Ok(ExternalBookingRef::new(CHANNEL, booking_id))
    }

    #[tracing::instrument(skip_all, fields(external = %external))]
    async fn cancel_booking(&self, external: &ExternalBookingRef) -> Result<(), ChannelError> {
        let url = self.url(&format!("bookings/{}", external.booking_id));
        self.call("cancel_booking", None, self.client.delete(url)).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, mapping), fields(room = %mapping.external_room_id))]
    async fn push_availability(
        &self,
        mapping: &RoomMapping,
        date: NaiveDate,
        count: u32,
    ) -> Result<(), ChannelError> {
        let date = date.format("%Y-%m-%d").to_string();
        let body = json!({
            "values": [{
                "property_id": self.property_id(mapping),
                "room_type_id": mapping.external_room_id,
                "date_from": date,
                "date_to": date,
                "availability": count,
            }]
        });
        self.call(
            "push_availability",
            None,
            self.client.post(self.url("availability")).json(&body),
        )
        .await?;
        Ok(())
    }
}
