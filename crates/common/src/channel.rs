//! External sales channels the engine synchronizes with.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An external distribution channel (OTA aggregator / channel manager).
///
/// The name is persisted next to external booking IDs, so the string forms
/// returned by [`Channel::as_str`] are part of the storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Beds24-style JSON API (adapter A).
    Beds24,

    /// Channex-style REST API (adapter B).
    Channex,
}

impl Channel {
    /// Every channel the engine knows how to talk to.
    pub const ALL: [Channel; 2] = [Channel::Beds24, Channel::Channex];

    /// Returns the channel name as stored and routed.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Beds24 => "beds24",
            Channel::Channex => "channex",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returned when a string does not name a known channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown channel: {0}")]
pub struct UnknownChannel(pub String);

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beds24" => Ok(Channel::Beds24),
            "channex" => Ok(Channel::Channex),
            other => Err(UnknownChannel(other.to_string())),
        }
    }
}
