use chorus_core::{ConnectionId, Role, RoomId, RoomSnapshot, SyncMode, Timestamp};
use serde_json::Value;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub type EventSender = UnboundedSender<CollabEvent>;
pub type EventReceiver = UnboundedReceiver<CollabEvent>;

/// Events delivered to a single connection.
#[derive(Debug, Clone, PartialEq)]
pub enum CollabEvent {
    /// The connection created a room and is its host.
    RoomCreated {
        room_id: RoomId,
        role: Role,
        state: RoomSnapshot,
        sync_mode: SyncMode,
        server_time: Timestamp,
    },
    /// The connection entered a room.
    RoomJoined {
        room_id: RoomId,
        role: Role,
        state: RoomSnapshot,
        sync_mode: SyncMode,
        server_time: Timestamp,
    },
    /// A command of this connection failed.
    RoomError { message: String },
    /// The transport state of a room changed.
    StateUpdated(RoomSnapshot),
    /// A track was queued.
    QueueUpdated(RoomSnapshot),
    /// The host reported its transport state, stamped when it was forwarded.
    StateHeartbeat {
        state: RoomSnapshot,
        server_time: Timestamp,
    },
    /// Host only.
    ListenerJoined {
        room_id: RoomId,
        listener_id: ConnectionId,
    },
    /// Host only.
    ListenerLeft {
        room_id: RoomId,
        listener_id: ConnectionId,
    },
    /// An opaque payload relayed from another member.
    Signal {
        room_id: RoomId,
        from: ConnectionId,
        payload: Value,
    },
    RoomClosed { room_id: RoomId },
}

impl CollabEvent {
    /// The room this event is about, if any.
    pub fn room_id(&self) -> Option<&str> {
        match self {
            Self::RoomCreated { room_id, .. }
            | Self::RoomJoined { room_id, .. }
            | Self::ListenerJoined { room_id, .. }
            | Self::ListenerLeft { room_id, .. }
            | Self::Signal { room_id, .. }
            | Self::RoomClosed { room_id } => Some(room_id),
            Self::StateUpdated(state) | Self::QueueUpdated(state) => Some(&state.id),
            Self::StateHeartbeat { state, .. } => Some(&state.id),
            Self::RoomError { .. } => None,
        }
    }
}
