//! Reservation engine services.
//!
//! This crate composes the inventory store, the domain model and the channel
//! adapters into the operations the API exposes:
//! - Atomic creation of direct bookings
//! - Status transitions with their side effects
//! - Guest cancellation by token
//! - Webhook reconciliation
//! - Background guest notifications
//! - Availability pushes to channels

pub mod availability;
pub mod booking;
mod cancellation;
pub mod error;
pub mod notifications;
pub mod reconciler;
pub mod reservations;

pub use availability::{AvailabilityReport, AvailabilitySync, SyncStep};
pub use booking::BookingService;
pub use error::{EngineError, Result};
pub use notifications::{
    DispatcherConfig, InMemoryNotifier, LogNotifier, Notification, NotificationDispatcher,
    NotificationKind, Notifier, NotifyError,
};
pub use reconciler::{ReconcileOutcome, Reconciler, WebhookSummary};
pub use reservations::{ChannelSync, ReservationService, TransitionOutcome};
