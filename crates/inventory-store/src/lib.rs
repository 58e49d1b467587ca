//! Persistence for the reservation ledger and the room catalog.
//!
//! The store is the only shared mutable resource in the system. Room
//! occupancy is always derived by counting overlapping reservations, and
//! direct bookings are checked and inserted in a single atomic step.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;
pub use store::InventoryStore;
