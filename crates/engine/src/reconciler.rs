//! Webhook ingestion and reconciliation of channel bookings.
//!
//! Channels deliver at least once, possibly concurrently and out of order.
//! Reconciliation is keyed on the external booking identifier so a replay
//! updates the row it created instead of adding another. Channel data is
//! trusted: no local validation or capacity rule is applied to it.

use std::sync::Arc;

use channels::{ExternalBookingEvent, RoomChannelMap, parse_webhook};
use common::{Channel, ReservationId};
use domain::{
    ChannelSourcedFields, NewReservation, Reservation, ReservationError, ReservationStatus,
    SideEffect, StatusEvent,
};
use inventory_store::{InventoryStore, StoreError};
use serde::Serialize;
use serde_json::Value;

use crate::notifications::{Notification, NotificationDispatcher, NotificationKind};
use crate::{EngineError, Result};

/// Attempts per event before a write race is reported as a conflict.
const MAX_ATTEMPTS: usize = 3;

/// What reconciliation did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Created(ReservationId),
    Updated(ReservationId),
    Cancelled(ReservationId),

    /// A cancellation for a booking never seen locally.
    IgnoredUnknownCancellation,

    /// The channel room is not managed by this system.
    SkippedUnmappedRoom,
}

impl ReconcileOutcome {
    fn label(&self) -> &'static str {
        match self {
            ReconcileOutcome::Created(_) => "created",
            ReconcileOutcome::Updated(_) => "updated",
            ReconcileOutcome::Cancelled(_) => "cancelled",
            ReconcileOutcome::IgnoredUnknownCancellation => "ignored",
            ReconcileOutcome::SkippedUnmappedRoom => "skipped",
        }
    }
}

/// Per-outcome counts for one webhook delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WebhookSummary {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub cancelled: usize,
    pub ignored: usize,
    pub skipped: usize,
    pub rejected: usize,
}

impl WebhookSummary {
    fn record(&mut self, outcome: ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Created(_) => self.created += 1,
            ReconcileOutcome::Updated(_) => self.updated += 1,
            ReconcileOutcome::Cancelled(_) => self.cancelled += 1,
            ReconcileOutcome::IgnoredUnknownCancellation => self.ignored += 1,
            ReconcileOutcome::SkippedUnmappedRoom => self.skipped += 1,
        }
    }
}

/// Applies channel booking events to the local ledger.
pub struct Reconciler<S: InventoryStore> {
    store: S,
    mapping: Arc<RoomChannelMap>,
    notifications: NotificationDispatcher,
}

impl<S: InventoryStore> Reconciler<S> {
    pub fn new(
        store: S,
        mapping: Arc<RoomChannelMap>,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            store,
            mapping,
            notifications,
        }
    }

    /// Normalizes and reconciles every item of a webhook body.
    ///
    /// Items that cannot be normalized are counted as rejected. A store
    /// failure aborts the rest of the batch and is returned, so the channel
    /// redelivers; items already applied reconcile to no-ops on replay.
    #[tracing::instrument(skip(self, body))]
    pub async fn ingest(&self, channel: Channel, body: &Value) -> Result<WebhookSummary> {
        let items = parse_webhook(channel, body)?;
        let mut summary = WebhookSummary::default();

        for item in items {
            summary.processed += 1;
            match item {
                Ok(event) => {
                    let outcome = self.reconcile(event).await?;
                    metrics::counter!(
                        "webhook_events_total",
                        "channel" => channel.as_str(),
                        "outcome" => outcome.label()
                    )
                    .increment(1);
                    summary.record(outcome);
                }
                Err(e) => {
                    metrics::counter!(
                        "webhook_events_total",
                        "channel" => channel.as_str(),
                        "outcome" => "rejected"
                    )
                    .increment(1);
                    tracing::warn!(error = %e, "Webhook item rejected");
                    summary.rejected += 1;
                }
            }
        }

        tracing::info!(
            processed = summary.processed,
            created = summary.created,
            updated = summary.updated,
            cancelled = summary.cancelled,
            rejected = summary.rejected,
            "Webhook processed"
        );
        Ok(summary)
    }

    /// Reconciles one normalized event.
    #[tracing::instrument(
        skip_all,
        fields(
            channel = %event.channel,
            external_booking_id = %event.external_booking_id,
            status = %event.status
        )
    )]
    pub async fn reconcile(&self, event: ExternalBookingEvent) -> Result<ReconcileOutcome> {
        let Some(room_id) = self
            .mapping
            .resolve(event.channel, &event.external_room_id)
        else {
            tracing::info!(
                external_room_id = %event.external_room_id,
                "Room not managed locally, skipping"
            );
            return Ok(ReconcileOutcome::SkippedUnmappedRoom);
        };

        let Some(room) = self.store.get_room(room_id).await? else {
            tracing::error!(
                %room_id,
                external_room_id = %event.external_room_id,
                "Mapped room does not exist, skipping"
            );
            return Ok(ReconcileOutcome::SkippedUnmappedRoom);
        };

        let external = event.external_ref();
        let reported = event.status;
        let fields = ChannelSourcedFields {
            hotel_id: room.hotel_id,
            room_id,
            guest: event.guest,
            stay: event.stay,
            adults: event.adults,
            children: event.children,
            total_price: event.total_price,
            check_in_notes: Some(event.audit_note),
        };

        let mut contended = None;
        for _ in 0..MAX_ATTEMPTS {
            if let Some(existing) = self.store.find_by_external(&external).await? {
                match self.update(existing, fields.clone(), reported).await {
                    Err(EngineError::Conflict(id)) => {
                        tracing::debug!(reservation_id = %id, "Status moved underneath, retrying");
                        contended = Some(id);
                        continue;
                    }
                    other => return other,
                }
            }

            if reported == ReservationStatus::Cancelled {
                tracing::info!("Cancellation for unknown booking, nothing to do");
                return Ok(ReconcileOutcome::IgnoredUnknownCancellation);
            }

            let new = NewReservation::from_channel(external.clone(), fields.clone(), reported);
            match self.store.insert_external(new).await {
                Ok(created) => {
                    tracing::info!(reservation_id = %created.id, "Channel booking created");
                    if created.status == ReservationStatus::Confirmed {
                        self.notify(NotificationKind::BookingConfirmed, &created);
                    }
                    return Ok(ReconcileOutcome::Created(created.id));
                }
                Err(StoreError::DuplicateExternalBooking(_)) => {
                    tracing::debug!("Lost insert race to a concurrent delivery, updating instead");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(match contended {
            Some(id) => EngineError::Conflict(id),
            None => EngineError::Persistence(StoreError::DuplicateExternalBooking(external)),
        })
    }

    /// Overwrites an existing channel booking and moves its status by the
    /// external rules. A status the state machine refuses is kept as is.
    async fn update(
        &self,
        existing: Reservation,
        fields: ChannelSourcedFields,
        reported: ReservationStatus,
    ) -> Result<ReconcileOutcome> {
        let (target, effects) = match existing.plan(StatusEvent::ExternalUpdate { reported }) {
            Ok(transition) => (transition.to, transition.effects),
            Err(ReservationError::InvalidTransition { current_state, .. }) => {
                tracing::warn!(
                    reservation_id = %existing.id,
                    current = %current_state,
                    %reported,
                    "Channel status not applicable, keeping local status"
                );
                (existing.status, Vec::new())
            }
            Err(e) => return Err(e.into()),
        };

        let updated = self
            .store
            .overwrite_external(existing.id, existing.status, fields, target)
            .await?;

        for effect in effects {
            match effect {
                SideEffect::NotifyConfirmation => {
                    self.notify(NotificationKind::BookingConfirmed, &updated)
                }
                SideEffect::NotifyCancellation => {
                    self.notify(NotificationKind::BookingCancelled, &updated)
                }
                SideEffect::ReleaseChannelInventory => {}
            }
        }

        if target == ReservationStatus::Cancelled && existing.status != target {
            tracing::info!(reservation_id = %updated.id, "Channel booking cancelled");
            Ok(ReconcileOutcome::Cancelled(updated.id))
        } else {
            Ok(ReconcileOutcome::Updated(updated.id))
        }
    }

    fn notify(&self, kind: NotificationKind, reservation: &Reservation) {
        self.notifications
            .dispatch(Notification::for_reservation(kind, reservation));
    }
}
