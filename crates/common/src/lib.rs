//! Shared identifiers and primitives used across the reservation engine.

pub mod channel;
pub mod clock;
pub mod types;

pub use channel::{Channel, UnknownChannel};
pub use clock::{Clock, FixedClock, SystemClock};
pub use types::{HotelId, ReservationId, RoomId};
