//! Pushing free-unit counts to the channels that sell a room.

use std::sync::Arc;

use channels::{ChannelRegistry, RoomChannelMap};
use chrono::NaiveDate;
use common::RoomId;
use inventory_store::InventoryStore;
use serde::Serialize;

/// One step of a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStep {
    pub name: String,
    pub ok: bool,
    pub detail: String,
}

/// Step log of a sync run; `step_failed` names the first failing step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AvailabilityReport {
    pub steps: Vec<SyncStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_failed: Option<String>,
}

impl AvailabilityReport {
    pub fn is_success(&self) -> bool {
        self.step_failed.is_none()
    }

    fn ok(&mut self, name: impl Into<String>, detail: impl Into<String>) {
        self.steps.push(SyncStep {
            name: name.into(),
            ok: true,
            detail: detail.into(),
        });
    }

    fn fail(&mut self, name: impl Into<String>, detail: impl Into<String>) {
        let name = name.into();
        if self.step_failed.is_none() {
            self.step_failed = Some(name.clone());
        }
        self.steps.push(SyncStep {
            name,
            ok: false,
            detail: detail.into(),
        });
    }
}

/// Computes and pushes availability for a room on one night.
pub struct AvailabilitySync<S: InventoryStore> {
    store: S,
    channels: ChannelRegistry,
    mapping: Arc<RoomChannelMap>,
}

impl<S: InventoryStore> AvailabilitySync<S> {
    pub fn new(store: S, channels: ChannelRegistry, mapping: Arc<RoomChannelMap>) -> Self {
        Self {
            store,
            channels,
            mapping,
        }
    }

    /// Pushes `quantity - occupying` (never below zero) for the night of
    /// `date` to every channel that maps the room.
    ///
    /// Nothing here is fatal: failures are recorded as steps and the run
    /// carries on with the remaining channels.
    #[tracing::instrument(skip(self))]
    pub async fn push_room(&self, room_id: RoomId, date: NaiveDate) -> AvailabilityReport {
        let mut report = AvailabilityReport::default();

        let room = match self.store.get_room(room_id).await {
            Ok(Some(room)) => {
                report.ok("load_room", format!("{} (quantity {})", room.name, room.quantity));
                room
            }
            Ok(None) => {
                report.fail("load_room", format!("room {room_id} does not exist"));
                return report;
            }
            Err(e) => {
                report.fail("load_room", e.to_string());
                return report;
            }
        };

        let free = match self.store.count_occupying(room_id, date).await {
            Ok(occupied) => {
                let free = room.quantity.saturating_sub(occupied);
                report.ok(
                    "count_occupancy",
                    format!("{occupied} occupied, {free} free on {date}"),
                );
                free
            }
            Err(e) => {
                report.fail("count_occupancy", e.to_string());
                return report;
            }
        };

        let mappings: Vec<_> = self.mapping.for_room(room_id).collect();
        if mappings.is_empty() {
            report.fail("resolve_mappings", "room has no channel mappings");
            return report;
        }

        for mapping in mappings {
            let step = format!("push_{}", mapping.channel);
            let result = match self.channels.get(mapping.channel) {
                Ok(adapter) => adapter.push_availability(mapping, date, free).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => report.ok(
                    step,
                    format!("{free} units for room {}", mapping.external_room_id),
                ),
                Err(e) => {
                    tracing::warn!(
                        channel = %mapping.channel,
                        error = %e,
                        "Availability push failed"
                    );
                    report.fail(step, e.to_string());
                }
            }
        }

        report
    }
}
