//! Guest notifications (email/SMS) as fire-and-forget messages.
//!
//! Callers hand a [`Notification`] to the [`NotificationDispatcher`] after the
//! state change has been committed. A background worker delivers it through a
//! [`Notifier`], retrying with linear backoff. Delivery failures are logged
//! and never reach the caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::ReservationId;
use domain::{Reservation, StayDates};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;

/// What the guest is being told.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingConfirmed,
    BookingCancelled,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BookingConfirmed => "booking_confirmed",
            NotificationKind::BookingCancelled => "booking_cancelled",
        }
    }
}

/// A message for one guest about one reservation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub reservation_id: ReservationId,
    pub recipient: String,
    pub guest_name: String,
    pub phone: Option<String>,
    pub stay: StayDates,
}

impl Notification {
    pub fn for_reservation(kind: NotificationKind, reservation: &Reservation) -> Self {
        Self {
            kind,
            reservation_id: reservation.id,
            recipient: reservation.guest.email.clone(),
            guest_name: reservation.guest.name.clone(),
            phone: reservation.guest.phone.clone(),
            stay: reservation.stay,
        }
    }
}

/// Delivery failure reported by a [`Notifier`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Delivers notifications to guests.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Notifier that only logs. Used when no mail/SMS gateway is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            kind = notification.kind.as_str(),
            reservation_id = %notification.reservation_id,
            "Guest notification"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    sent: Vec<Notification>,
    attempts: usize,
    failures_remaining: usize,
}

/// In-memory notifier for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` delivery attempts fail.
    pub async fn fail_next(&self, count: usize) {
        self.state.write().await.failures_remaining = count;
    }

    /// Returns the notifications delivered so far.
    pub async fn sent(&self) -> Vec<Notification> {
        self.state.read().await.sent.clone()
    }

    /// Returns the number of delivery attempts, failed ones included.
    pub async fn attempts(&self) -> usize {
        self.state.read().await.attempts
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut state = self.state.write().await;
        state.attempts += 1;
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(NotifyError("gateway unavailable".to_string()));
        }
        state.sent.push(notification.clone());
        Ok(())
    }
}

/// Queue and retry settings for the dispatcher.
#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    pub queue_capacity: usize,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Hands notifications to the background delivery worker.
///
/// Cloning is cheap; every clone feeds the same worker.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<Notification>,
}

impl NotificationDispatcher {
    /// Starts the delivery worker and returns the dispatcher feeding it.
    ///
    /// The worker exits once every dispatcher clone has been dropped and the
    /// queue is drained.
    pub fn spawn(notifier: Arc<dyn Notifier>, config: DispatcherConfig) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let worker = tokio::spawn(run_worker(receiver, notifier, config));
        (Self { sender }, worker)
    }

    /// Queues a notification without waiting.
    ///
    /// A full queue drops the notification with a warning; the state change
    /// it describes stands regardless.
    pub fn dispatch(&self, notification: Notification) {
        match self.sender.try_send(notification) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                metrics::counter!("notifications_total", "result" => "dropped").increment(1);
                tracing::warn!(
                    reservation_id = %dropped.reservation_id,
                    kind = dropped.kind.as_str(),
                    "Notification queue full, dropping notification"
                );
            }
            Err(mpsc::error::TrySendError::Closed(dropped)) => {
                metrics::counter!("notifications_total", "result" => "dropped").increment(1);
                tracing::warn!(
                    reservation_id = %dropped.reservation_id,
                    "Notification worker stopped, dropping notification"
                );
            }
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<Notification>,
    notifier: Arc<dyn Notifier>,
    config: DispatcherConfig,
) {
    while let Some(notification) = receiver.recv().await {
        deliver(notifier.as_ref(), &notification, &config).await;
    }
    tracing::debug!("Notification worker stopped");
}

async fn deliver(notifier: &dyn Notifier, notification: &Notification, config: &DispatcherConfig) {
    let max_attempts = config.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        match notifier.send(notification).await {
            Ok(()) => {
                metrics::counter!("notifications_total", "result" => "sent").increment(1);
                return;
            }
            Err(e) if attempt < max_attempts => {
                tracing::warn!(
                    reservation_id = %notification.reservation_id,
                    attempt,
                    error = %e,
                    "Notification attempt failed, retrying"
                );
                tokio::time::sleep(config.retry_delay * attempt).await;
            }
            Err(e) => {
                metrics::counter!("notifications_total", "result" => "failed").increment(1);
                tracing::error!(
                    reservation_id = %notification.reservation_id,
                    kind = notification.kind.as_str(),
                    attempts = max_attempts,
                    error = %e,
                    "Notification delivery failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn notification() -> Notification {
        Notification {
            kind: NotificationKind::BookingConfirmed,
            reservation_id: ReservationId::new(),
            recipient: "ada@example.com".to_string(),
            guest_name: "Ada Lovelace".to_string(),
            phone: None,
            stay: StayDates::new(
                NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 6, 3).unwrap(),
            )
            .unwrap(),
        }
    }

    fn config(max_attempts: u32) -> DispatcherConfig {
        DispatcherConfig {
            queue_capacity: 8,
            max_attempts,
            retry_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_delivers_in_background() {
        let notifier = InMemoryNotifier::new();
        let (dispatcher, worker) =
            NotificationDispatcher::spawn(Arc::new(notifier.clone()), config(3));

        dispatcher.dispatch(notification());
        drop(dispatcher);
        worker.await.unwrap();

        assert_eq!(notifier.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let notifier = InMemoryNotifier::new();
        notifier.fail_next(2).await;
        let (dispatcher, worker) =
            NotificationDispatcher::spawn(Arc::new(notifier.clone()), config(3));

        dispatcher.dispatch(notification());
        drop(dispatcher);
        worker.await.unwrap();

        assert_eq!(notifier.attempts().await, 3);
        assert_eq!(notifier.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let notifier = InMemoryNotifier::new();
        notifier.fail_next(5).await;
        let (dispatcher, worker) =
            NotificationDispatcher::spawn(Arc::new(notifier.clone()), config(2));

        dispatcher.dispatch(notification());
        drop(dispatcher);
        worker.await.unwrap();

        assert_eq!(notifier.attempts().await, 2);
        assert!(notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_never_blocks_when_full() {
        let (sender, _receiver) = mpsc::channel(1);
        let dispatcher = NotificationDispatcher { sender };
        dispatcher.dispatch(notification());
        // Queue is full and nobody is reading; this must return immediately.
        dispatcher.dispatch(notification());
    }
}
