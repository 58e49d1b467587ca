//! Administrator and guest driven status changes.

use std::sync::Arc;

use channels::{ChannelBookingRequest, ChannelRegistry, RoomChannelMap};
use common::{Channel, Clock, ReservationId};
use domain::{Reservation, SideEffect, StatusEvent};
use inventory_store::InventoryStore;
use serde::Serialize;

use crate::notifications::{Notification, NotificationDispatcher, NotificationKind};
use crate::{EngineError, Result};

/// Outcome of the channel call made after a committed local change.
///
/// A failed call never undoes the local change; it is reported here so the
/// operator can act on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSync {
    pub channel: Channel,
    pub operation: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_booking_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChannelSync {
    fn succeeded(channel: Channel, operation: &'static str, external_booking_id: String) -> Self {
        Self {
            channel,
            operation,
            ok: true,
            external_booking_id: Some(external_booking_id),
            error: None,
        }
    }

    fn failed(channel: Channel, operation: &'static str, error: impl ToString) -> Self {
        Self {
            channel,
            operation,
            ok: false,
            external_booking_id: None,
            error: Some(error.to_string()),
        }
    }
}

/// The reservation after a status change, plus any channel follow-up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionOutcome {
    pub reservation: Reservation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_sync: Option<ChannelSync>,
}

/// Applies status changes through the state machine.
///
/// Every change is persisted with a compare-and-set on the status read
/// beforehand, so of two writers racing from the same state one gets
/// `Conflict`. Side effects run only after the write committed.
pub struct ReservationService<S: InventoryStore> {
    store: S,
    channels: ChannelRegistry,
    mapping: Arc<RoomChannelMap>,
    notifications: NotificationDispatcher,
    clock: Arc<dyn Clock>,
}

impl<S: InventoryStore> ReservationService<S> {
    pub fn new(
        store: S,
        channels: ChannelRegistry,
        mapping: Arc<RoomChannelMap>,
        notifications: NotificationDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            channels,
            mapping,
            notifications,
            clock,
        }
    }

    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    pub async fn get(&self, id: ReservationId) -> Result<Reservation> {
        self.store
            .get_reservation(id)
            .await?
            .ok_or_else(|| EngineError::reservation_not_found(id))
    }

    /// The guest's reservations that have not yet ended, by arrival date.
    #[tracing::instrument(skip_all)]
    pub async fn list_by_email(&self, email: &str) -> Result<Vec<Reservation>> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .store
            .list_active_by_email(&email, self.clock.today())
            .await?)
    }

    /// Confirms a pending reservation and notifies the guest.
    ///
    /// With `push_to_channel` the booking is then created on that channel.
    /// The channel and the room's mapping on it are checked before anything
    /// is written.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(
        &self,
        id: ReservationId,
        push_to_channel: Option<Channel>,
    ) -> Result<TransitionOutcome> {
        let current = self.get(id).await?;

        let push = match push_to_channel {
            Some(channel) if current.external.is_none() => {
                let adapter = self
                    .channels
                    .get(channel)
                    .map_err(|e| configuration_error(e.to_string()))?;
                let mapping = self
                    .mapping
                    .for_channel(current.room_id, channel)
                    .cloned()
                    .ok_or_else(|| {
                        configuration_error(format!(
                            "room {} has no mapping on {channel}",
                            current.room_id
                        ))
                    })?;
                Some((adapter, mapping))
            }
            Some(channel) => {
                tracing::info!(
                    reservation_id = %id,
                    %channel,
                    "Reservation already held by a channel, not pushing"
                );
                None
            }
            None => None,
        };

        let mut outcome = self.apply(current, StatusEvent::Confirm).await?;

        if let Some((adapter, mapping)) = push {
            let reservation = &outcome.reservation;
            let channel = adapter.channel();
            let request = ChannelBookingRequest {
                reservation_id: reservation.id,
                mapping,
                guest: reservation.guest.clone(),
                stay: reservation.stay,
                adults: reservation.adults,
                children: reservation.children,
                total_price: reservation.total_price,
                notes: reservation.notes.clone(),
            };

            let sync = match adapter.create_booking(&request).await {
                Ok(external) => {
                    let booking_id = external.booking_id.clone();
                    match self.store.attach_external_ref(id, external).await {
                        Ok(updated) => {
                            outcome.reservation = updated;
                            ChannelSync::succeeded(channel, "create_booking", booking_id)
                        }
                        Err(e) => {
                            tracing::error!(
                                reservation_id = %id,
                                %channel,
                                external_booking_id = %booking_id,
                                error = %e,
                                "Channel booking created but not recorded locally"
                            );
                            ChannelSync {
                                external_booking_id: Some(booking_id),
                                ..ChannelSync::failed(channel, "create_booking", e)
                            }
                        }
                    }
                }
                Err(e) => ChannelSync::failed(channel, "create_booking", e),
            };
            outcome.channel_sync = Some(sync);
        }

        Ok(outcome)
    }

    #[tracing::instrument(skip(self))]
    pub async fn check_in(&self, id: ReservationId) -> Result<TransitionOutcome> {
        let current = self.get(id).await?;
        self.apply(current, StatusEvent::CheckIn).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn check_out(&self, id: ReservationId) -> Result<TransitionOutcome> {
        let current = self.get(id).await?;
        self.apply(current, StatusEvent::CheckOut).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn complete(&self, id: ReservationId) -> Result<TransitionOutcome> {
        let current = self.get(id).await?;
        self.apply(current, StatusEvent::Complete).await
    }

    /// Cancels on behalf of an administrator.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, id: ReservationId) -> Result<TransitionOutcome> {
        let current = self.get(id).await?;
        self.apply(current, StatusEvent::Cancel).await
    }

    /// Plans, persists and then carries out the side effects of one event.
    pub(crate) async fn apply(
        &self,
        current: Reservation,
        event: StatusEvent,
    ) -> Result<TransitionOutcome> {
        let transition = current.plan(event)?;
        let reservation = self
            .store
            .update_status(current.id, transition.from, transition.to)
            .await?;

        tracing::info!(
            reservation_id = %reservation.id,
            from = %transition.from,
            to = %transition.to,
            "Reservation status changed"
        );

        let mut channel_sync = None;
        for effect in &transition.effects {
            match effect {
                SideEffect::NotifyConfirmation => {
                    self.notify(NotificationKind::BookingConfirmed, &reservation)
                }
                SideEffect::NotifyCancellation => {
                    self.notify(NotificationKind::BookingCancelled, &reservation)
                }
                SideEffect::ReleaseChannelInventory => {
                    channel_sync = self.release_on_channel(&reservation).await;
                }
            }
        }

        Ok(TransitionOutcome {
            reservation,
            channel_sync,
        })
    }

    fn notify(&self, kind: NotificationKind, reservation: &Reservation) {
        self.notifications
            .dispatch(Notification::for_reservation(kind, reservation));
    }

    /// Best-effort cancellation on the channel that holds the booking.
    async fn release_on_channel(&self, reservation: &Reservation) -> Option<ChannelSync> {
        let external = reservation.external.as_ref()?;
        let channel = external.channel;

        let result = match self.channels.get(channel) {
            Ok(adapter) => adapter.cancel_booking(external).await,
            Err(e) => Err(e),
        };

        Some(match result {
            Ok(()) => {
                ChannelSync::succeeded(channel, "cancel_booking", external.booking_id.clone())
            }
            Err(e) => {
                tracing::warn!(
                    reservation_id = %reservation.id,
                    %channel,
                    external_booking_id = %external.booking_id,
                    error = %e,
                    "Channel cancellation failed; local cancellation stands"
                );
                ChannelSync::failed(channel, "cancel_booking", e)
            }
        })
    }
}

fn configuration_error(message: String) -> EngineError {
    tracing::error!(%message, "Channel configuration error");
    EngineError::Configuration(message)
}
