//! Transition rules shared by every writer (guest, operator, channel).

use super::{ReservationError, ReservationStatus};

/// Something that asks a reservation to change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// Operator confirms a pending reservation.
    Confirm,

    /// Guest (via token) or operator cancels.
    Cancel,

    /// Front desk checks the guest in.
    CheckIn,

    /// Front desk checks the guest out.
    CheckOut,

    /// Front desk closes out the stay.
    Complete,

    /// The originating channel reports the booking as cancelled.
    ExternalCancel,

    /// The originating channel reports a new or modified booking with the
    /// given (already mapped) status.
    ExternalUpdate { reported: ReservationStatus },
}

impl StatusEvent {
    fn action(&self) -> &'static str {
        match self {
            StatusEvent::Confirm => "confirm",
            StatusEvent::Cancel => "cancel",
            StatusEvent::CheckIn => "check in",
            StatusEvent::CheckOut => "check out",
            StatusEvent::Complete => "complete",
            StatusEvent::ExternalCancel => "apply external cancellation",
            StatusEvent::ExternalUpdate { .. } => "apply external update",
        }
    }
}

/// Work that must happen after a transition has been committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    /// Send the guest a booking confirmation.
    NotifyConfirmation,

    /// Send the guest a cancellation notice.
    NotifyCancellation,

    /// Free the inventory on the channel the booking came from.
    ReleaseChannelInventory,
}

/// Outcome of applying a [`StatusEvent`] to a status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: ReservationStatus,
    pub to: ReservationStatus,
    pub effects: Vec<SideEffect>,
}

impl Transition {
    fn to(from: ReservationStatus, to: ReservationStatus, effects: Vec<SideEffect>) -> Self {
        Self { from, to, effects }
    }

    fn unchanged(status: ReservationStatus) -> Self {
        Self {
            from: status,
            to: status,
            effects: Vec::new(),
        }
    }

    /// Returns true if the status actually changes.
    pub fn changes_status(&self) -> bool {
        self.from != self.to
    }
}

impl ReservationStatus {
    /// Applies an event, returning the target state and the side effects the
    /// caller owes once the new state is persisted.
    ///
    /// Channel-originated events are idempotent: replaying a cancellation for
    /// an already-cancelled reservation, or an update that does not move the
    /// state forward, yields an unchanged transition rather than an error.
    pub fn transition(self, event: StatusEvent) -> Result<Transition, ReservationError> {
        use ReservationStatus::*;

        let invalid = || ReservationError::InvalidTransition {
            current_state: self,
            action: event.action(),
        };

        match event {
            StatusEvent::Confirm if self.can_confirm() => Ok(Transition::to(
                self,
                Confirmed,
                vec![SideEffect::NotifyConfirmation],
            )),
            StatusEvent::Cancel if self.can_cancel() => Ok(Transition::to(
                self,
                Cancelled,
                vec![
                    SideEffect::NotifyCancellation,
                    SideEffect::ReleaseChannelInventory,
                ],
            )),
            StatusEvent::CheckIn if self.can_check_in() => {
                Ok(Transition::to(self, CheckedIn, Vec::new()))
            }
            StatusEvent::CheckOut if self.can_check_out() => {
                Ok(Transition::to(self, CheckedOut, Vec::new()))
            }
            StatusEvent::Complete if self.can_complete() => {
                Ok(Transition::to(self, Completed, Vec::new()))
            }
            StatusEvent::ExternalCancel => match self {
                Cancelled => Ok(Transition::unchanged(self)),
                _ if self.can_cancel_externally() => Ok(Transition::to(
                    self,
                    Cancelled,
                    vec![SideEffect::NotifyCancellation],
                )),
                _ => Err(invalid()),
            },
            StatusEvent::ExternalUpdate { reported: Cancelled } => {
                self.transition(StatusEvent::ExternalCancel)
            }
            StatusEvent::ExternalUpdate { reported } => match (self, reported) {
                (Pending, Confirmed) => Ok(Transition::to(
                    self,
                    Confirmed,
                    vec![SideEffect::NotifyConfirmation],
                )),
                // Front-desk progress and terminal states are never regressed
                // by a channel re-sending an earlier status.
                _ => Ok(Transition::unchanged(self)),
            },
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReservationStatus::*;

    fn apply_all(start: ReservationStatus, events: &[StatusEvent]) -> ReservationStatus {
        events.iter().fold(start, |status, event| {
            status.transition(*event).unwrap().to
        })
    }

    #[test]
    fn test_front_desk_happy_path() {
        let end = apply_all(
            Pending,
            &[
                StatusEvent::Confirm,
                StatusEvent::CheckIn,
                StatusEvent::CheckOut,
            ],
        );
        assert_eq!(end, CheckedOut);
    }

    #[test]
    fn test_checked_in_can_complete() {
        let t = CheckedIn.transition(StatusEvent::Complete).unwrap();
        assert_eq!(t.to, Completed);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn test_cannot_cancel_after_checkout() {
        let result = CheckedOut.transition(StatusEvent::Cancel);
        assert!(matches!(
            result,
            Err(ReservationError::InvalidTransition {
                current_state: CheckedOut,
                ..
            })
        ));
    }

    #[test]
    fn test_cannot_cancel_twice() {
        assert!(Cancelled.transition(StatusEvent::Cancel).is_err());
    }

    #[test]
    fn test_confirm_notifies_guest() {
        let t = Pending.transition(StatusEvent::Confirm).unwrap();
        assert_eq!(t.to, Confirmed);
        assert_eq!(t.effects, vec![SideEffect::NotifyConfirmation]);
    }

    #[test]
    fn test_local_cancel_notifies_and_releases_channel_inventory() {
        let t = Confirmed.transition(StatusEvent::Cancel).unwrap();
        assert_eq!(t.to, Cancelled);
        assert!(t.effects.contains(&SideEffect::NotifyCancellation));
        assert!(t.effects.contains(&SideEffect::ReleaseChannelInventory));
    }

    #[test]
    fn test_check_in_requires_confirmation() {
        assert!(Pending.transition(StatusEvent::CheckIn).is_err());
        assert!(Confirmed.transition(StatusEvent::CheckOut).is_err());
    }

    #[test]
    fn test_external_cancel_from_checked_in() {
        let t = CheckedIn.transition(StatusEvent::ExternalCancel).unwrap();
        assert_eq!(t.to, Cancelled);
        assert_eq!(t.effects, vec![SideEffect::NotifyCancellation]);
    }

    #[test]
    fn test_external_cancel_replay_is_a_no_op() {
        let t = Cancelled.transition(StatusEvent::ExternalCancel).unwrap();
        assert!(!t.changes_status());
        assert!(t.effects.is_empty());
    }

    #[test]
    fn test_external_cancel_after_checkout_is_rejected() {
        assert!(Completed.transition(StatusEvent::ExternalCancel).is_err());
    }

    #[test]
    fn test_external_confirmation_notifies_only_once() {
        let first = Pending
            .transition(StatusEvent::ExternalUpdate {
                reported: Confirmed,
            })
            .unwrap();
        assert_eq!(first.to, Confirmed);
        assert_eq!(first.effects, vec![SideEffect::NotifyConfirmation]);

        let replay = Confirmed
            .transition(StatusEvent::ExternalUpdate {
                reported: Confirmed,
            })
            .unwrap();
        assert!(!replay.changes_status());
        assert!(replay.effects.is_empty());
    }

    #[test]
    fn test_external_update_does_not_regress_front_desk_progress() {
        let t = CheckedIn
            .transition(StatusEvent::ExternalUpdate { reported: Pending })
            .unwrap();
        assert_eq!(t.to, CheckedIn);
    }

    #[test]
    fn test_external_update_reporting_cancelled_cancels() {
        let t = Pending
            .transition(StatusEvent::ExternalUpdate {
                reported: Cancelled,
            })
            .unwrap();
        assert_eq!(t.to, Cancelled);
    }
}
