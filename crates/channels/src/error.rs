use common::{Channel, RoomId};
use thiserror::Error;

/// Errors returned by channel adapters.
///
/// None of these ever roll back a local write; callers log them and report
/// partial success.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The channel did not answer within the configured timeout.
    #[error("{channel} request timed out")]
    Timeout { channel: Channel },

    /// The request could not be sent or the connection failed.
    #[error("{channel} transport error: {message}")]
    Transport { channel: Channel, message: String },

    /// The channel answered with an error status or error envelope.
    #[error("{channel} rejected the request (HTTP {status}): {body}")]
    Rejected {
        channel: Channel,
        status: u16,
        body: String,
    },

    /// The channel answered with a body that could not be understood.
    #[error("{channel} returned an invalid response: {message}")]
    InvalidResponse { channel: Channel, message: String },

    /// No adapter is registered for the channel, usually because its
    /// credentials are incomplete.
    #[error("Channel {0} is not configured")]
    NotConfigured(Channel),

    /// The local room has no mapping on the channel.
    #[error("Room {room_id} is not mapped on {channel}")]
    UnmappedRoom { channel: Channel, room_id: RoomId },
}

impl ChannelError {
    /// Short label used in metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelError::Timeout { .. } => "timeout",
            ChannelError::Transport { .. } => "transport",
            ChannelError::Rejected { .. } => "rejected",
            ChannelError::InvalidResponse { .. } => "invalid_response",
            ChannelError::NotConfigured(_) => "not_configured",
            ChannelError::UnmappedRoom { .. } => "unmapped_room",
        }
    }
}

/// Errors raised while normalizing a webhook payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// The body does not have any of the shapes the channel sends.
    #[error("Malformed webhook body: {0}")]
    Malformed(String),

    /// A required field is absent under every known name.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A field is present but cannot be interpreted.
    #[error("Invalid {field}: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Errors raised while loading the room/channel mapping table.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Failed to read mapping file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid mapping table: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two local rooms claim the same external room on one channel.
    #[error("External room {external_room_id} on {channel} is mapped more than once")]
    DuplicateExternalRoom {
        channel: Channel,
        external_room_id: String,
    },
}
