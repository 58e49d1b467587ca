//! The reservation record and its insert/update forms.

use chrono::{DateTime, NaiveDate, Utc};
use common::{HotelId, ReservationId, RoomId};
use serde::{Deserialize, Serialize};

use super::{
    CancellationToken, ExternalBookingRef, GuestDetails, Money, PaymentStatus, ReservationError,
    ReservationStatus, SideEffect, StatusEvent, StayDates, Transition,
};

/// A reservation as held in the ledger.
///
/// Never physically deleted; cancellation is a status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub hotel_id: HotelId,
    pub room_id: RoomId,
    pub guest: GuestDetails,
    pub stay: StayDates,
    pub adults: u32,
    pub children: u32,
    pub total_price: Money,

    /// Free-text notes supplied by the guest.
    pub notes: Option<String>,

    /// Internal audit trail: source, external ID and channel comments.
    pub check_in_notes: Option<String>,

    /// Present for every direct booking; never reissued.
    pub cancellation_token: Option<CancellationToken>,
    pub payment_status: PaymentStatus,
    pub status: ReservationStatus,

    /// Set when the booking originated on, or was pushed to, a channel.
    pub external: Option<ExternalBookingRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Plans a status change for this reservation.
    ///
    /// Channel inventory release is only owed when a channel actually holds
    /// the booking.
    pub fn plan(&self, event: StatusEvent) -> Result<Transition, ReservationError> {
        let mut transition = self.status.transition(event)?;
        if self.external.is_none() {
            transition
                .effects
                .retain(|effect| *effect != SideEffect::ReleaseChannelInventory);
        }
        Ok(transition)
    }

    /// Returns true once the guest's departure date has passed.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.stay.departure() < today
    }
}

/// Everything needed to insert a reservation; timestamps come from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReservation {
    pub id: ReservationId,
    pub hotel_id: HotelId,
    pub room_id: RoomId,
    pub guest: GuestDetails,
    pub stay: StayDates,
    pub adults: u32,
    pub children: u32,
    pub total_price: Money,
    pub notes: Option<String>,
    pub check_in_notes: Option<String>,
    pub cancellation_token: Option<CancellationToken>,
    pub payment_status: PaymentStatus,
    pub status: ReservationStatus,
    pub external: Option<ExternalBookingRef>,
}

impl NewReservation {
    /// Builds the insert form for a booking reported by a channel.
    ///
    /// Channel bookings are pre-paid and carry no cancellation token: the
    /// guest cancels through the channel.
    pub fn from_channel(
        external: ExternalBookingRef,
        fields: ChannelSourcedFields,
        status: ReservationStatus,
    ) -> Self {
        Self {
            id: ReservationId::new(),
            hotel_id: fields.hotel_id,
            room_id: fields.room_id,
            guest: fields.guest,
            stay: fields.stay,
            adults: fields.adults,
            children: fields.children,
            total_price: fields.total_price,
            notes: None,
            check_in_notes: fields.check_in_notes,
            cancellation_token: None,
            payment_status: PaymentStatus::Paid,
            status,
            external: Some(external),
        }
    }

    /// Materializes the record with the given timestamp.
    pub fn into_reservation(self, now: DateTime<Utc>) -> Reservation {
        Reservation {
            id: self.id,
            hotel_id: self.hotel_id,
            room_id: self.room_id,
            guest: self.guest,
            stay: self.stay,
            adults: self.adults,
            children: self.children,
            total_price: self.total_price,
            notes: self.notes,
            check_in_notes: self.check_in_notes,
            cancellation_token: self.cancellation_token,
            payment_status: self.payment_status,
            status: self.status,
            external: self.external,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields a channel is authoritative for.
///
/// Reconciliation overwrites all of them at once, never merges.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSourcedFields {
    pub hotel_id: HotelId,
    pub room_id: RoomId,
    pub guest: GuestDetails,
    pub stay: StayDates,
    pub adults: u32,
    pub children: u32,
    pub total_price: Money,
    pub check_in_notes: Option<String>,
}

impl ChannelSourcedFields {
    /// Applies the fields to an existing record.
    pub fn apply_to(self, reservation: &mut Reservation) {
        reservation.hotel_id = self.hotel_id;
        reservation.room_id = self.room_id;
        reservation.guest = self.guest;
        reservation.stay = self.stay;
        reservation.adults = self.adults;
        reservation.children = self.children;
        reservation.total_price = self.total_price;
        reservation.check_in_notes = self.check_in_notes;
    }
}

#[cfg(test)]
mod tests {
    use common::Channel;

    use super::*;

    fn sample(external: Option<ExternalBookingRef>) -> Reservation {
        let arrival = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let departure = NaiveDate::from_ymd_opt(2026, 6, 3).unwrap();
        NewReservation {
            id: ReservationId::new(),
            hotel_id: HotelId::new(1),
            room_id: RoomId::new(10),
            guest: GuestDetails::new("Ada Lovelace", "ada@example.com"),
            stay: StayDates::new(arrival, departure).unwrap(),
            adults: 2,
            children: 0,
            total_price: Money::from_minor(30000),
            notes: None,
            check_in_notes: None,
            cancellation_token: Some(CancellationToken::issue()),
            payment_status: PaymentStatus::Unpaid,
            status: ReservationStatus::Confirmed,
            external,
        }
        .into_reservation(Utc::now())
    }

    #[test]
    fn test_direct_cancel_owes_no_channel_release() {
        let reservation = sample(None);
        let transition = reservation.plan(StatusEvent::Cancel).unwrap();
        assert_eq!(transition.effects, vec![SideEffect::NotifyCancellation]);
    }

    #[test]
    fn test_channel_booking_cancel_releases_inventory() {
        let reservation = sample(Some(ExternalBookingRef::new(Channel::Beds24, "X1")));
        let transition = reservation.plan(StatusEvent::Cancel).unwrap();
        assert!(
            transition
                .effects
                .contains(&SideEffect::ReleaseChannelInventory)
        );
    }

    #[test]
    fn test_expiry_is_based_on_departure() {
        let reservation = sample(None);
        assert!(!reservation.is_expired(NaiveDate::from_ymd_opt(2026, 6, 3).unwrap()));
        assert!(reservation.is_expired(NaiveDate::from_ymd_opt(2026, 6, 4).unwrap()));
    }

    #[test]
    fn test_channel_bookings_are_prepaid_without_token() {
        let external = ExternalBookingRef::new(Channel::Channex, "CX-9");
        let fields = ChannelSourcedFields {
            hotel_id: HotelId::new(1),
            room_id: RoomId::new(10),
            guest: GuestDetails::new("Grace Hopper", "grace@example.com"),
            stay: sample(None).stay,
            adults: 1,
            children: 1,
            total_price: Money::from_minor(12000),
            check_in_notes: Some("[channex] booking CX-9".to_string()),
        };
        let new = NewReservation::from_channel(external.clone(), fields, ReservationStatus::Confirmed);
        assert_eq!(new.payment_status, PaymentStatus::Paid);
        assert!(new.cancellation_token.is_none());
        assert_eq!(new.external, Some(external));
    }
}
