//! Channel adapter interface and implementations.

mod beds24;
mod channex;
mod memory;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{Channel, ReservationId};
use domain::{ExternalBookingRef, GuestDetails, Money, StayDates};

pub use beds24::{Beds24Adapter, Beds24Config};
pub use channex::{ChannexAdapter, ChannexConfig};
pub use memory::InMemoryChannelAdapter;

use crate::{ChannelError, RoomMapping};

/// Connect timeout applied to every channel client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A local reservation to be created on a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelBookingRequest {
    pub reservation_id: ReservationId,
    pub mapping: RoomMapping,
    pub guest: GuestDetails,
    pub stay: StayDates,
    pub adults: u32,
    pub children: u32,
    pub total_price: Money,
    pub notes: Option<String>,
}

/// Outbound operations against one external channel.
///
/// Each implementation owns its credential shape, payload translation and
/// response parsing. Every call is bounded by a timeout and is never retried
/// synchronously.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// The channel this adapter talks to.
    fn channel(&self) -> Channel;

    /// Creates the booking on the channel and returns its identifier there.
    async fn create_booking(
        &self,
        request: &ChannelBookingRequest,
    ) -> Result<ExternalBookingRef, ChannelError>;

    /// Cancels a booking previously created on, or received from, the channel.
    async fn cancel_booking(&self, external: &ExternalBookingRef) -> Result<(), ChannelError>;

    /// Sets the number of sellable units of a room for one night.
    async fn push_availability(
        &self,
        mapping: &RoomMapping,
        date: NaiveDate,
        count: u32,
    ) -> Result<(), ChannelError>;
}

/// Builds the HTTP client shared by the reqwest-based adapters.
fn build_client(channel: Channel, timeout: Duration) -> Result<reqwest::Client, ChannelError> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .build()
        .map_err(|e| ChannelError::Transport {
            channel,
            message: e.to_string(),
        })
}

/// A raw channel response.
struct RawResponse {
    status: reqwest::StatusCode,
    body: String,
}

/// Sends a request and reads the whole body, recording metrics.
async fn send(
    channel: Channel,
    operation: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<RawResponse, ChannelError> {
    let start = Instant::now();
    let result = async {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok::<_, reqwest::Error>(RawResponse { status, body })
    }
    .await
    .map_err(|e| {
        if e.is_timeout() {
            ChannelError::Timeout { channel }
        } else {
            ChannelError::Transport {
                channel,
                message: e.to_string(),
            }
        }
    });

    metrics::histogram!(
        "channel_request_duration_seconds",
        "channel" => channel.as_str(),
        "operation" => operation
    )
    .record(start.elapsed().as_secs_f64());
    if let Err(e) = &result {
        record_outcome(channel, operation, e.kind());
    }
    result
}

fn record_outcome(channel: Channel, operation: &'static str, result: &'static str) {
    metrics::counter!(
        "channel_requests_total",
        "channel" => channel.as_str(),
        "operation" => operation,
        "result" => result
    )
    .increment(1);
}

/// Logs a failed call with the raw response for diagnosis.
///
/// Includes the local reservation id when the call was made for one.
fn log_failure(
    channel: Channel,
    operation: &str,
    reservation_id: Option<ReservationId>,
    err: &ChannelError,
) {
    tracing::warn!(
        channel = %channel,
        operation,
        reservation_id = reservation_id.map(tracing::field::display),
        error = %err,
        "Channel call failed"
    );
}

/// Redacts a secret for `Debug` output.
fn redact(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        "***".to_string()
    }
}
