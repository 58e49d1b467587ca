use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::Channel;
use domain::ExternalBookingRef;
use tokio::sync::RwLock;

use super::{ChannelAdapter, ChannelBookingRequest};
use crate::{ChannelError, RoomMapping};

#[derive(Debug, Default)]
struct InMemoryChannelState {
    bookings: HashMap<String, ChannelBookingRequest>,
    cancelled: Vec<String>,
    availability: Vec<(String, NaiveDate, u32)>,
    next_id: u32,
    fail_with: Option<ChannelError>,
}

/// In-memory channel adapter for testing.
///
/// Records every call and can be told to fail all of them.
#[derive(Debug, Clone)]
pub struct InMemoryChannelAdapter {
    channel: Channel,
    state: Arc<RwLock<InMemoryChannelState>>,
}

impl InMemoryChannelAdapter {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            state: Arc::default(),
        }
    }

    /// Configures the adapter to fail every call with a timeout.
    pub async fn set_fail(&self, fail: bool) {
        let error = fail.then_some(ChannelError::Timeout {
            channel: self.channel,
        });
        self.state.write().await.fail_with = error;
    }

    /// Configures the adapter to fail every call with the given error.
    pub async fn fail_with(&self, error: ChannelError) {
        self.state.write().await.fail_with = Some(error);
    }

    /// Returns the number of bookings created and not cancelled.
    pub async fn active_booking_count(&self) -> usize {
        let state = self.state.read().await;
        state
            .bookings
            .keys()
            .filter(|id| !state.cancelled.contains(id))
            .count()
    }

    /// Returns the request behind a booking created here.
    pub async fn booking(&self, booking_id: &str) -> Option<ChannelBookingRequest> {
        self.state.read().await.bookings.get(booking_id).cloned()
    }

    /// Returns the IDs of cancelled bookings in call order.
    pub async fn cancelled(&self) -> Vec<String> {
        self.state.read().await.cancelled.clone()
    }

    /// Returns every availability push as (external room, date, count).
    pub async fn availability_pushes(&self) -> Vec<(String, NaiveDate, u32)> {
        self.state.read().await.availability.clone()
    }

    fn check(&self, state: &InMemoryChannelState) -> Result<(), ChannelError> {
        match &state.fail_with {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ChannelAdapter for InMemoryChannelAdapter {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn create_booking(
        &self,
        request: &ChannelBookingRequest,
    ) -> Result<ExternalBookingRef, ChannelError> {
        let mut state = self.state.write().await;
        self.check(&state)?;

        state.next_id += 1;
        let booking_id = format!("{}-{:04}", self.channel.as_str().to_uppercase(), state.next_id);
        state.bookings.insert(booking_id.clone(), request.clone());
        Ok(ExternalBookingRef::new(self.channel, booking_id))
    }

    async fn cancel_booking(&self, external: &ExternalBookingRef) -> Result<(), ChannelError> {
        let mut state = self.state.write().await;
        self.check(&state)?;
        state.cancelled.push(external.booking_id.clone());
        Ok(())
    }

    async fn push_availability(
        &self,
        mapping: &RoomMapping,
        date: NaiveDate,
        count: u32,
    ) -> Result<(), ChannelError> {
        let mut state = self.state.write().await;
        self.check(&state)?;
        state
            .availability
            .push((mapping.external_room_id.clone(), date, count));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::{ReservationId, RoomId};
    use domain::{GuestDetails, Money, StayDates};

    use super::*;

    fn request() -> ChannelBookingRequest {
        ChannelBookingRequest {
            reservation_id: ReservationId::new(),
            mapping: RoomMapping::new(Channel::Beds24, RoomId::new(10), "55001"),
            guest: GuestDetails::new("Ada Lovelace", "ada@example.com"),
            stay: StayDates::new(
                NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 6, 3).unwrap(),
            )
            .unwrap(),
            adults: 2,
            children: 0,
            total_price: Money::from_minor(30000),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_cancel() {
        let adapter = InMemoryChannelAdapter::new(Channel::Beds24);
        let external = adapter.create_booking(&request()).await.unwrap();
        assert_eq!(external.booking_id, "BEDS24-0001");
        assert_eq!(adapter.active_booking_count().await, 1);

        adapter.cancel_booking(&external).await.unwrap();
        assert_eq!(adapter.active_booking_count().await, 0);
        assert_eq!(adapter.cancelled().await, vec!["BEDS24-0001".to_string()]);
    }

    #[tokio::test]
    async fn test_fail_mode() {
        let adapter = InMemoryChannelAdapter::new(Channel::Channex);
        adapter.set_fail(true).await;
        let err = adapter.create_booking(&request()).await.unwrap_err();
        assert_eq!(
            err,
            ChannelError::Timeout {
                channel: Channel::Channex
            }
        );
        assert_eq!(adapter.active_booking_count().await, 0);
    }
}
