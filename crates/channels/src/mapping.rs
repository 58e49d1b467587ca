//! Room/Channel mapping table.
//!
//! Maps local rooms to the room identifiers each channel uses. A webhook for
//! an external room with no mapping is not managed locally and is skipped.

use std::collections::HashSet;
use std::path::Path;

use common::{Channel, RoomId};
use serde::{Deserialize, Serialize};

use crate::MappingError;

/// One local room as known to one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMapping {
    pub channel: Channel,
    pub room_id: RoomId,
    pub external_room_id: String,

    /// Property identifier on the channel, when it differs per room.
    #[serde(default)]
    pub external_property_id: Option<String>,
}

impl RoomMapping {
    pub fn new(channel: Channel, room_id: RoomId, external_room_id: impl Into<String>) -> Self {
        Self {
            channel,
            room_id,
            external_room_id: external_room_id.into(),
            external_property_id: None,
        }
    }
}

/// The full mapping table, loaded once at start-up.
#[derive(Debug, Clone, Default)]
pub struct RoomChannelMap {
    mappings: Vec<RoomMapping>,
}

impl RoomChannelMap {
    /// Builds a table, rejecting duplicate external rooms per channel.
    pub fn new(mappings: Vec<RoomMapping>) -> Result<Self, MappingError> {
        let mut seen = HashSet::new();
        for mapping in &mappings {
            if !seen.insert((mapping.channel, mapping.external_room_id.as_str())) {
                return Err(MappingError::DuplicateExternalRoom {
                    channel: mapping.channel,
                    external_room_id: mapping.external_room_id.clone(),
                });
            }
        }
        Ok(Self { mappings })
    }

    /// Parses a JSON array of mappings.
    pub fn from_json_str(json: &str) -> Result<Self, MappingError> {
        let mappings: Vec<RoomMapping> = serde_json::from_str(json)?;
        Self::new(mappings)
    }

    /// Loads a JSON array of mappings from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, MappingError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| MappingError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Resolves an external room to the local room.
    pub fn resolve(&self, channel: Channel, external_room_id: &str) -> Option<RoomId> {
        self.mappings
            .iter()
            .find(|m| m.channel == channel && m.external_room_id == external_room_id)
            .map(|m| m.room_id)
    }

    /// The mapping of a local room on one channel.
    pub fn for_channel(&self, room_id: RoomId, channel: Channel) -> Option<&RoomMapping> {
        self.mappings
            .iter()
            .find(|m| m.room_id == room_id && m.channel == channel)
    }

    /// Every channel mapping of a local room.
    pub fn for_room(&self, room_id: RoomId) -> impl Iterator<Item = &RoomMapping> {
        self.mappings.iter().filter(move |m| m.room_id == room_id)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
