//! Domain layer for the reservation engine.
//!
//! This crate provides the core domain types:
//! - Hotel and room catalog entries
//! - The reservation record and its status state machine
//! - Cancellation tokens
//! - Validation of direct booking requests

pub mod catalog;
pub mod reservation;
pub mod validation;

pub use catalog::{Hotel, Room};
pub use reservation::{
    CancellationToken, ChannelSourcedFields, ExternalBookingRef, GuestDetails, Money,
    NewReservation, PaymentStatus, Reservation, ReservationError, ReservationStatus, SideEffect,
    StatusEvent, StayDates, Transition,
};
pub use validation::{
    BookingCommand, BookingRequest, BookingValidator, MAX_GUESTS, ValidationFailure, Violation,
};
