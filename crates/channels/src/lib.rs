//! Channel integration for the reservation engine.
//!
//! This crate provides:
//! - The `ChannelAdapter` interface and one implementation per channel
//! - The room/channel mapping table
//! - Webhook parsers that normalize channel payloads into `ExternalBookingEvent`
//! - The fixed channel status lookup tables

pub mod adapters;
mod json;
pub mod error;
pub mod mapping;
pub mod registry;
pub mod status_map;
pub mod webhook;

pub use adapters::{
    Beds24Adapter, Beds24Config, ChannelAdapter, ChannelBookingRequest, ChannexAdapter,
    ChannexConfig, InMemoryChannelAdapter,
};
pub use error::{ChannelError, MappingError, WebhookError};
pub use mapping::{RoomChannelMap, RoomMapping};
pub use registry::ChannelRegistry;
pub use webhook::{ExternalBookingEvent, WebhookParser, parse_webhook};
