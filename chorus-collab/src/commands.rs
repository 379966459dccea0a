use chorus_core::{ConnectionId, RoomId, TransportUpdate};
use serde_json::Value;

/// Everything a connection can ask of the control plane.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateRoom {
        secret: Option<String>,
    },
    JoinRoom {
        room_id: RoomId,
        secret: Option<String>,
    },
    AddTrack {
        room_id: RoomId,
        track_ref: String,
        title: Option<String>,
        artist: Option<String>,
    },
    Advance {
        room_id: RoomId,
    },
    SetTransport {
        room_id: RoomId,
        update: TransportUpdate,
    },
    Heartbeat {
        room_id: RoomId,
        playing: bool,
        position_seconds: f64,
        track_ref: Option<String>,
    },
    /// Forwards a payload to another member of the room, unexamined.
    Signal {
        room_id: RoomId,
        target_id: ConnectionId,
        payload: Value,
    },
    LeaveRoom {
        room_id: RoomId,
    },
    CloseRoom {
        room_id: RoomId,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "create-room",
            Self::JoinRoom { .. } => "join-room",
            Self::AddTrack { .. } => "add-track",
            Self::Advance { .. } => "advance",
            Self::SetTransport { .. } => "set-transport",
            Self::Heartbeat { .. } => "heartbeat",
            Self::Signal { .. } => "signal",
            Self::LeaveRoom { .. } => "leave-room",
            Self::CloseRoom { .. } => "close-room",
        }
    }
}
