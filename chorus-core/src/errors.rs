use thiserror::Error;

use crate::ConnectionId;

pub type ChorusResult<T> = Result<T, ChorusError>;

/// Everything that can go wrong while coordinating a session.
///
/// None of these are fatal. They are reported to the connection that caused
/// them, turned into a silent drop, or trigger cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChorusError {
    /// A room or member does not exist
    #[error("{resource} not found")]
    NotFound { resource: &'static str },
    /// A non-host connection attempted a host-only action
    #[error("Only the host can {action}")]
    Unauthorized { action: &'static str },
    /// Joining a room with the wrong secret
    #[error("Invalid secret")]
    InvalidSecret,
    /// A track reference could not be resolved
    #[error("Invalid track reference: {0}")]
    InvalidReference(String),
    /// A single transport session failed to negotiate
    #[error("Transport negotiation with {peer} failed: {reason}")]
    TransportNegotiationFailed { peer: ConnectionId, reason: String },
    /// The control channel of a connection dropped
    #[error("Connection lost")]
    ConnectionLost,
    /// Every generated room id was already taken
    #[error("Could not generate a unique room id after {0} attempts")]
    IdExhausted(usize),
}

impl ChorusError {
    pub fn room_not_found() -> Self {
        Self::NotFound { resource: "Room" }
    }

    pub fn member_not_found() -> Self {
        Self::NotFound { resource: "Member" }
    }
}
