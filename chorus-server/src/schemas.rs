//! Everything a client may send over the gateway, along with how it is
//! validated and turned into a [Command].

use chorus_collab::Command;
use chorus_core::{ConnectionId, TransportUpdate};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::errors::ServerResult;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    CreateRoom(CreateRoomSchema),
    JoinRoom(JoinRoomSchema),
    AddTrack(AddTrackSchema),
    #[serde(alias = "skip")]
    Advance(RoomSchema),
    SetTransport(SetTransportSchema),
    Heartbeat(HeartbeatSchema),
    Signal(SignalSchema),
    LeaveRoom(RoomSchema),
    CloseRoom(RoomSchema),
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomSchema {
    #[validate(length(min = 1, max = 64))]
    pub secret: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomSchema {
    #[validate(length(min = 1, max = 32))]
    pub room_id: String,
    #[validate(length(max = 64))]
    pub secret: Option<String>,
}

/// A message that only names a room.
#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSchema {
    #[validate(length(min = 1, max = 32))]
    pub room_id: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTrackSchema {
    #[validate(length(min = 1, max = 32))]
    pub room_id: String,
    /// A video id, a video link or a direct https link.
    #[validate(length(min = 1, max = 2048))]
    pub track_ref: String,
    #[validate(length(max = 256))]
    pub title: Option<String>,
    #[validate(length(max = 256))]
    pub artist: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTransportSchema {
    #[validate(length(min = 1, max = 32))]
    pub room_id: String,
    pub playing: Option<bool>,
    #[validate(range(min = 0.0))]
    pub position_seconds: Option<f64>,
    #[validate(length(min = 1, max = 2048))]
    pub track_ref: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatSchema {
    #[validate(length(min = 1, max = 32))]
    pub room_id: String,
    pub playing: bool,
    #[validate(range(min = 0.0))]
    pub position_seconds: f64,
    #[validate(length(min = 1, max = 2048))]
    pub track_ref: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalSchema {
    #[validate(length(min = 1, max = 32))]
    pub room_id: String,
    pub target_id: u64,
    /// An offer, answer or candidate. Never looked into.
    #[schema(value_type = Object)]
    pub payload: Value,
}

impl ClientMessage {
    /// Parses and validates a text frame.
    pub fn parse(text: &str) -> ServerResult<Command> {
        let message: Self = serde_json::from_str(text)?;
        message.validate()?;

        Ok(message.into())
    }
}

impl Validate for ClientMessage {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            Self::CreateRoom(schema) => schema.validate(),
            Self::JoinRoom(schema) => schema.validate(),
            Self::AddTrack(schema) => schema.validate(),
            Self::Advance(schema) | Self::LeaveRoom(schema) | Self::CloseRoom(schema) => {
                schema.validate()
            }
            Self::SetTransport(schema) => schema.validate(),
            Self::Heartbeat(schema) => schema.validate(),
            Self::Signal(schema) => schema.validate(),
        }
    }
}

impl From<ClientMessage> for Command {
    fn from(value: ClientMessage) -> Self {
        match value {
            ClientMessage::CreateRoom(s) => Command::CreateRoom { secret: s.secret },
            ClientMessage::JoinRoom(s) => Command::JoinRoom {
                room_id: s.room_id,
                secret: s.secret,
            },
            ClientMessage::AddTrack(s) => Command::AddTrack {
                room_id: s.room_id,
                track_ref: s.track_ref,
                title: s.title,
                artist: s.artist,
            },
            ClientMessage::Advance(s) => Command::Advance { room_id: s.room_id },
            ClientMessage::SetTransport(s) => Command::SetTransport {
                room_id: s.room_id,
                update: TransportUpdate {
                    playing: s.playing,
                    position_seconds: s.position_seconds,
                    track_ref: s.track_ref,
                },
            },
            ClientMessage::Heartbeat(s) => Command::Heartbeat {
                room_id: s.room_id,
                playing: s.playing,
                position_seconds: s.position_seconds,
                track_ref: s.track_ref,
            },
            ClientMessage::Signal(s) => Command::Signal {
                room_id: s.room_id,
                target_id: ConnectionId::from_value(s.target_id),
                payload: s.payload,
            },
            ClientMessage::LeaveRoom(s) => Command::LeaveRoom { room_id: s.room_id },
            ClientMessage::CloseRoom(s) => Command::CloseRoom { room_id: s.room_id },
        }
    }
}
