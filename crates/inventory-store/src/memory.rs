use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use common::{HotelId, ReservationId, RoomId};
use domain::{
    CancellationToken, ChannelSourcedFields, ExternalBookingRef, Hotel, NewReservation,
    Reservation, ReservationStatus, Room,
};
use tokio::sync::RwLock;

use crate::{InventoryStore, Result, StoreError};

#[derive(Default)]
struct State {
    hotels: HashMap<HotelId, Hotel>,
    rooms: HashMap<RoomId, Room>,
    reservations: HashMap<ReservationId, Reservation>,
    fail_writes: bool,
}

impl State {
    fn check_writable(&self) -> Result<()> {
        if self.fail_writes {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn occupying_on(&self, room_id: RoomId, night: NaiveDate) -> u32 {
        self.reservations
            .values()
            .filter(|r| {
                r.room_id == room_id && r.status.is_occupying() && r.stay.covers_night(night)
            })
            .count() as u32
    }

    fn external_taken(&self, external: &ExternalBookingRef) -> bool {
        self.reservations
            .values()
            .any(|r| r.external.as_ref() == Some(external))
    }

    fn reservation_mut(&mut self, id: ReservationId) -> Result<&mut Reservation> {
        self.reservations
            .get_mut(&id)
            .ok_or(StoreError::ReservationNotFound(id))
    }
}

/// In-memory inventory store for tests and local runs.
///
/// A single write lock serializes the capacity check and the insert, giving
/// the same atomicity as the PostgreSQL procedure.
#[derive(Clone, Default)]
pub struct InMemoryInventoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryInventoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with a database error.
    pub async fn set_fail_on_write(&self, fail: bool) {
        self.state.write().await.fail_writes = fail;
    }

    /// Returns the total number of reservations stored.
    pub async fn reservation_count(&self) -> usize {
        self.state.read().await.reservations.len()
    }

    /// Returns every reservation, oldest first.
    pub async fn all_reservations(&self) -> Vec<Reservation> {
        let state = self.state.read().await;
        let mut all: Vec<_> = state.reservations.values().cloned().collect();
        all.sort_by_key(|r| r.created_at);
        all
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn get_hotel(&self, id: HotelId) -> Result<Option<Hotel>> {
        Ok(self.state.read().await.hotels.get(&id).cloned())
    }

    async fn get_room(&self, id: RoomId) -> Result<Option<Room>> {
        Ok(self.state.read().await.rooms.get(&id).cloned())
    }

    async fn save_hotel(&self, hotel: Hotel) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_writable()?;
        state.hotels.insert(hotel.id, hotel);
        Ok(())
    }

    async fn save_room(&self, room: Room) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_writable()?;
        state.rooms.insert(room.id, room);
        Ok(())
    }

    async fn create_direct_booking(&self, reservation: NewReservation) -> Result<Reservation> {
        let mut state = self.state.write().await;
        state.check_writable()?;

        let quantity = match state.rooms.get(&reservation.room_id) {
            Some(room) if room.hotel_id == reservation.hotel_id => room.quantity,
            _ => {
                return Err(StoreError::RoomNotFound {
                    room_id: reservation.room_id,
                    hotel_id: reservation.hotel_id,
                });
            }
        };

        let full = reservation
            .stay
            .each_night()
            .any(|night| state.occupying_on(reservation.room_id, night) >= quantity);
        if full {
            return Err(StoreError::CapacityExceeded {
                room_id: reservation.room_id,
                arrival: reservation.stay.arrival(),
                departure: reservation.stay.departure(),
            });
        }

        let reservation = reservation.into_reservation(Utc::now());
        state
            .reservations
            .insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn insert_external(&self, reservation: NewReservation) -> Result<Reservation> {
        let mut state = self.state.write().await;
        state.check_writable()?;

        if let Some(external) = &reservation.external
            && state.external_taken(external)
        {
            return Err(StoreError::DuplicateExternalBooking(external.clone()));
        }

        let reservation = reservation.into_reservation(Utc::now());
        state
            .reservations
            .insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn find_by_external(
        &self,
        external: &ExternalBookingRef,
    ) -> Result<Option<Reservation>> {
        let state = self.state.read().await;
        Ok(state
            .reservations
            .values()
            .find(|r| r.external.as_ref() == Some(external))
            .cloned())
    }

    async fn overwrite_external(
        &self,
        id: ReservationId,
        expected: ReservationStatus,
        fields: ChannelSourcedFields,
        status: ReservationStatus,
    ) -> Result<Reservation> {
        let mut state = self.state.write().await;
        state.check_writable()?;

        let reservation = state.reservation_mut(id)?;
        if reservation.status != expected {
            return Err(StoreError::StaleStatus {
                id,
                expected,
                actual: reservation.status,
            });
        }
        fields.apply_to(reservation);
        reservation.status = status;
        reservation.updated_at = Utc::now();
        Ok(reservation.clone())
    }

    async fn get_reservation(&self, id: ReservationId) -> Result<Option<Reservation>> {
        Ok(self.state.read().await.reservations.get(&id).cloned())
    }

    async fn find_by_token(&self, token: &CancellationToken) -> Result<Option<Reservation>> {
        let state = self.state.read().await;
        Ok(state
            .reservations
            .values()
            .find(|r| r.cancellation_token.as_ref() == Some(token))
            .cloned())
    }

    async fn list_active_by_email(
        &self,
        email: &str,
        today: NaiveDate,
    ) -> Result<Vec<Reservation>> {
        let state = self.state.read().await;
        let mut found: Vec<_> = state
            .reservations
            .values()
            .filter(|r| r.guest.email.eq_ignore_ascii_case(email) && !r.is_expired(today))
            .cloned()
            .collect();
        found.sort_by_key(|r| (r.stay.arrival(), r.created_at));
        Ok(found)
    }

    async fn update_status(
        &self,
        id: ReservationId,
        expected: ReservationStatus,
        to: ReservationStatus,
    ) -> Result<Reservation> {
        let mut state = self.state.write().await;
        state.check_writable()?;

        let reservation = state.reservation_mut(id)?;
        if reservation.status != expected {
            return Err(StoreError::StaleStatus {
                id,
                expected,
                actual: reservation.status,
            });
        }
        reservation.status = to;
        reservation.updated_at = Utc::now();
        Ok(reservation.clone())
    }

    async fn attach_external_ref(
        &self,
        id: ReservationId,
        external: ExternalBookingRef,
    ) -> Result<Reservation> {
        let mut state = self.state.write().await;
        state.check_writable()?;

        if state.external_taken(&external) {
            return Err(StoreError::DuplicateExternalBooking(external));
        }
        let reservation = state.reservation_mut(id)?;
        reservation.external = Some(external);
        reservation.updated_at = Utc::now();
        Ok(reservation.clone())
    }

    async fn count_occupying(&self, room_id: RoomId, night: NaiveDate) -> Result<u32> {
        Ok(self.state.read().await.occupying_on(room_id, night))
    }
}
