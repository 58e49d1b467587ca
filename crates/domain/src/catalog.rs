//! Hotels and rooms as seen by the booking flow.
//!
//! The catalog is maintained by administrators; booking never mutates it.

use common::{HotelId, RoomId};
use serde::{Deserialize, Serialize};

use crate::reservation::Money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotel {
    pub id: HotelId,
    pub name: String,
    pub contact_email: Option<String>,
}

/// A sellable room type.
///
/// `quantity` is the number of identical units. Occupancy is derived by
/// counting overlapping reservations, never by decrementing this field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub hotel_id: HotelId,
    pub name: String,
    pub quantity: u32,
    pub nightly_rate: Money,
}
