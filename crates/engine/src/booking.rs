//! Atomic creation of direct bookings.

use std::sync::Arc;

use common::{Clock, HotelId, ReservationId, RoomId};
use domain::{
    BookingRequest, BookingValidator, CancellationToken, NewReservation, PaymentStatus,
    Reservation, ReservationStatus,
};
use inventory_store::InventoryStore;

use crate::{EngineError, Result};

/// Creates reservations submitted through the booking form.
///
/// Validation runs first; the capacity check and insert then happen as one
/// atomic store operation. No notification or channel call is made here:
/// a new direct booking waits as `pending` for an administrator.
pub struct BookingService<S: InventoryStore> {
    store: S,
    validator: BookingValidator,
    clock: Arc<dyn Clock>,
}

impl<S: InventoryStore> BookingService<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            validator: BookingValidator::default(),
            clock,
        }
    }

    /// Replaces the default validator.
    pub fn with_validator(mut self, validator: BookingValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Validates the request and creates the reservation.
    ///
    /// The new reservation is `pending` and `unpaid` and carries a fresh
    /// cancellation token. When the form declares no price the stay is
    /// priced at the room's nightly rate.
    #[tracing::instrument(
        skip_all,
        fields(hotel_id = ?request.hotel_id, room_id = ?request.room_id)
    )]
    pub async fn create(&self, request: &BookingRequest) -> Result<Reservation> {
        let result = self.try_create(request).await;
        match &result {
            Ok(reservation) => {
                metrics::counter!("bookings_created_total").increment(1);
                tracing::info!(
                    reservation_id = %reservation.id,
                    arrival = %reservation.stay.arrival(),
                    nights = reservation.stay.nights(),
                    "Direct booking created"
                );
            }
            Err(e) => {
                metrics::counter!("bookings_rejected_total", "reason" => rejection_reason(e))
                    .increment(1);
                tracing::info!(error = %e, "Direct booking rejected");
            }
        }
        result
    }

    async fn try_create(&self, request: &BookingRequest) -> Result<Reservation> {
        let hotel = match request.hotel_id {
            Some(id) => self.store.get_hotel(HotelId::new(id)).await?,
            None => None,
        };
        let room = match request.room_id {
            Some(id) => self.store.get_room(RoomId::new(id)).await?,
            None => None,
        };

        let command = self
            .validator
            .validate(request, hotel.as_ref(), room.as_ref(), self.clock.today())
            .map_err(EngineError::ValidationFailed)?;

        let total_price = match (command.declared_price, room) {
            (Some(price), _) => price,
            (None, Some(room)) => room.nightly_rate.multiply(command.stay.nights()),
            (None, None) => {
                return Err(EngineError::Configuration(format!(
                    "room {} disappeared during booking",
                    command.room_id
                )));
            }
        };

        let reservation = NewReservation {
            id: ReservationId::new(),
            hotel_id: command.hotel_id,
            room_id: command.room_id,
            guest: command.guest,
            stay: command.stay,
            adults: command.adults,
            children: command.children,
            total_price,
            notes: command.notes,
            check_in_notes: Some("[direct] booking form".to_string()),
            cancellation_token: Some(CancellationToken::issue()),
            payment_status: PaymentStatus::Unpaid,
            status: ReservationStatus::Pending,
            external: None,
        };

        Ok(self.store.create_direct_booking(reservation).await?)
    }
}

fn rejection_reason(err: &EngineError) -> &'static str {
    match err {
        EngineError::ValidationFailed(_) => "validation",
        EngineError::CapacityExceeded { .. } => "capacity",
        EngineError::Configuration(_) => "configuration",
        _ => "persistence",
    }
}
