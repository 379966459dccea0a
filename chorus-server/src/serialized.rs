//! All schemas that are sent to clients are defined here
//! along with the From<T> impls

use chorus_collab::CollabEvent;
use chorus_core::{PlaybackStatus, Role, RoomSnapshot, SyncMode, Track as CoreTrack};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    track_ref: String,
    title: Option<String>,
    artist: Option<String>,
    added_at: i64,
}

/// What every member of a room can see about it.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
    room_id: String,
    secret_required: bool,
    host_id: Option<u64>,
    listener_ids: Vec<u64>,
    queue: Vec<Track>,
    current: Option<Track>,
    playing: bool,
    position_seconds: f64,
    /// When the room was last mutated, in milliseconds since the Unix epoch.
    updated_at: i64,
    status: RoomStatus,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RoomStatus {
    Empty,
    LoadedPaused,
    LoadedPlaying,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RoomRole {
    Host,
    Listener,
}

/// How clients of this server keep in sync.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SyncStrategy {
    Drift,
    Relay,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    ok: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum ServerMessage {
    /// The sender created a room and is its host.
    #[serde(rename_all = "camelCase")]
    RoomCreated {
        room_id: String,
        role: RoomRole,
        state: RoomState,
        sync_mode: SyncStrategy,
        server_time: i64,
    },
    /// The sender is now a member of a room.
    #[serde(rename_all = "camelCase")]
    RoomJoined {
        room_id: String,
        role: RoomRole,
        state: RoomState,
        sync_mode: SyncStrategy,
        server_time: i64,
    },
    /// Something the sender asked for could not be done.
    RoomError { message: String },
    /// The transport state or current track changed.
    StateUpdated { state: RoomState },
    /// A track was added to the queue.
    QueueUpdated { state: RoomState },
    /// The host reported its transport state.
    #[serde(rename_all = "camelCase")]
    StateHeartbeat {
        state: RoomState,
        /// When the server forwarded the heartbeat.
        server_time: i64,
    },
    /// Sent to the host only.
    #[serde(rename_all = "camelCase")]
    ListenerJoined { room_id: String, listener_id: u64 },
    /// Sent to the host only.
    #[serde(rename_all = "camelCase")]
    ListenerLeft { room_id: String, listener_id: u64 },
    /// A signal relayed from another member.
    #[serde(rename_all = "camelCase")]
    Signal {
        room_id: String,
        from: u64,
        #[schema(value_type = Object)]
        payload: Value,
    },
    #[serde(rename_all = "camelCase")]
    RoomClosed { room_id: String },
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl<I, O> ToSerialized<Option<O>> for Option<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Option<O> {
        self.as_ref().map(|x| x.to_serialized())
    }
}

impl ToSerialized<Track> for CoreTrack {
    fn to_serialized(&self) -> Track {
        Track {
            track_ref: self.track_ref.clone(),
            title: self.title.clone(),
            artist: self.artist.clone(),
            added_at: self.added_at,
        }
    }
}

impl ToSerialized<RoomState> for RoomSnapshot {
    fn to_serialized(&self) -> RoomState {
        RoomState {
            room_id: self.id.clone(),
            secret_required: self.secret_required,
            host_id: self.host.map(|h| h.value()),
            listener_ids: self.listeners.iter().map(|l| l.value()).collect(),
            queue: self.queue.to_serialized(),
            current: self.current.to_serialized(),
            playing: self.playing,
            position_seconds: self.position_seconds,
            updated_at: self.updated_at,
            status: self.status.into(),
        }
    }
}

impl From<PlaybackStatus> for RoomStatus {
    fn from(value: PlaybackStatus) -> Self {
        match value {
            PlaybackStatus::Empty => Self::Empty,
            PlaybackStatus::LoadedPaused => Self::LoadedPaused,
            PlaybackStatus::LoadedPlaying => Self::LoadedPlaying,
        }
    }
}

impl From<Role> for RoomRole {
    fn from(value: Role) -> Self {
        match value {
            Role::Host => Self::Host,
            Role::Listener => Self::Listener,
        }
    }
}

impl From<SyncMode> for SyncStrategy {
    fn from(value: SyncMode) -> Self {
        match value {
            SyncMode::Drift => Self::Drift,
            SyncMode::Relay => Self::Relay,
        }
    }
}

impl Health {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

impl From<CollabEvent> for ServerMessage {
    fn from(value: CollabEvent) -> Self {
        match value {
            CollabEvent::RoomCreated {
                room_id,
                role,
                state,
                sync_mode,
                server_time,
            } => Self::RoomCreated {
                room_id,
                role: role.into(),
                state: state.to_serialized(),
                sync_mode: sync_mode.into(),
                server_time,
            },
            CollabEvent::RoomJoined {
                room_id,
                role,
                state,
                sync_mode,
                server_time,
            } => Self::RoomJoined {
                room_id,
                role: role.into(),
                state: state.to_serialized(),
                sync_mode: sync_mode.into(),
                server_time,
            },
            CollabEvent::RoomError { message } => Self::RoomError { message },
            CollabEvent::StateUpdated(state) => Self::StateUpdated {
                state: state.to_serialized(),
            },
            CollabEvent::QueueUpdated(state) => Self::QueueUpdated {
                state: state.to_serialized(),
            },
            CollabEvent::StateHeartbeat { state, server_time } => Self::StateHeartbeat {
                state: state.to_serialized(),
                server_time,
            },
            CollabEvent::ListenerJoined {
                room_id,
                listener_id,
            } => Self::ListenerJoined {
                room_id,
                listener_id: listener_id.value(),
            },
            CollabEvent::ListenerLeft {
                room_id,
                listener_id,
            } => Self::ListenerLeft {
                room_id,
                listener_id: listener_id.value(),
            },
            CollabEvent::Signal {
                room_id,
                from,
                payload,
            } => Self::Signal {
                room_id,
                from: from.value(),
                payload,
            },
            CollabEvent::RoomClosed { room_id } => Self::RoomClosed { room_id },
        }
    }
}
