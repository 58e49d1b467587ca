use async_trait::async_trait;
use chrono::NaiveDate;
use common::{HotelId, ReservationId, RoomId};
use domain::{
    CancellationToken, ChannelSourcedFields, ExternalBookingRef, Hotel, NewReservation,
    Reservation, ReservationStatus, Room,
};

use crate::Result;

/// Core trait for inventory store implementations.
///
/// All implementations must be thread-safe (Send + Sync) and must make
/// [`create_direct_booking`](InventoryStore::create_direct_booking) atomic
/// with respect to every other writer.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn get_hotel(&self, id: HotelId) -> Result<Option<Hotel>>;

    async fn get_room(&self, id: RoomId) -> Result<Option<Room>>;

    /// Inserts or replaces a hotel.
    async fn save_hotel(&self, hotel: Hotel) -> Result<()>;

    /// Inserts or replaces a room.
    async fn save_room(&self, room: Room) -> Result<()>;

    /// Checks capacity and inserts a direct booking in one atomic step.
    ///
    /// Fails with `CapacityExceeded` if any night of the stay already has
    /// `room.quantity` occupying reservations, and with `RoomNotFound` if the
    /// room does not belong to the hotel.
    async fn create_direct_booking(&self, reservation: NewReservation) -> Result<Reservation>;

    /// Inserts a channel-sourced booking without a capacity check.
    ///
    /// Fails with `DuplicateExternalBooking` if the external identifier is
    /// already present.
    async fn insert_external(&self, reservation: NewReservation) -> Result<Reservation>;

    async fn find_by_external(&self, external: &ExternalBookingRef)
    -> Result<Option<Reservation>>;

    /// Overwrites every channel-sourced field and sets the status, provided
    /// the status is still `expected`.
    async fn overwrite_external(
        &self,
        id: ReservationId,
        expected: ReservationStatus,
        fields: ChannelSourcedFields,
        status: ReservationStatus,
    ) -> Result<Reservation>;

    async fn get_reservation(&self, id: ReservationId) -> Result<Option<Reservation>>;

    async fn find_by_token(&self, token: &CancellationToken) -> Result<Option<Reservation>>;

    /// Reservations for `email` whose departure is on or after `today`,
    /// ordered by arrival date.
    async fn list_active_by_email(&self, email: &str, today: NaiveDate)
    -> Result<Vec<Reservation>>;

    /// Compare-and-set on the status.
    ///
    /// Fails with `StaleStatus` if another writer moved the reservation
    /// away from `expected` first.
    async fn update_status(
        &self,
        id: ReservationId,
        expected: ReservationStatus,
        to: ReservationStatus,
    ) -> Result<Reservation>;

    /// Records the channel booking created for a direct reservation.
    async fn attach_external_ref(
        &self,
        id: ReservationId,
        external: ExternalBookingRef,
    ) -> Result<Reservation>;

    /// Number of occupying reservations for the room on the night of `night`.
    async fn count_occupying(&self, room_id: RoomId, night: NaiveDate) -> Result<u32>;
}
