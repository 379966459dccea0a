use log::debug;

use crate::{
    ChorusError, ChorusResult, ConnectionId, PlaybackStatus, Room, RoomPatch, Timestamp, Track,
};

/// Transport facts reported by the host. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportUpdate {
    pub playing: Option<bool>,
    pub position_seconds: Option<f64>,
    pub track_ref: Option<String>,
}

/// A host-only command on a room's queue or transport.
#[derive(Debug, Clone)]
pub enum PlaybackCommand {
    /// Appends a track to the tail of the queue.
    Add(Track),
    /// Pops the head of the queue into the current slot.
    Advance,
    /// Applies reported transport facts.
    SetTransport(TransportUpdate),
}

/// What a successful [PlaybackCommand] did.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Queued {
        /// True if the room was empty with nothing queued before this track.
        /// Auto-advance policies key off this.
        first_in_empty_room: bool,
    },
    Advanced {
        current: Option<Track>,
    },
    TransportSet,
}

impl PlaybackCommand {
    /// The action name used in authorization errors.
    fn action(&self) -> &'static str {
        match self {
            Self::Add(_) => "add tracks",
            Self::Advance => "skip tracks",
            Self::SetTransport(_) => "control playback",
        }
    }
}

impl TransportUpdate {
    /// A heartbeat always carries the transport flag and a position.
    pub fn heartbeat(playing: bool, position_seconds: f64, track_ref: Option<String>) -> Self {
        Self {
            playing: Some(playing),
            position_seconds: Some(position_seconds),
            track_ref,
        }
    }
}

/// Applies a command on behalf of `sender`. Only the host may do this;
/// anybody else is rejected and the room is left untouched.
pub fn apply_command(
    room: &mut Room,
    sender: ConnectionId,
    command: PlaybackCommand,
    now: Timestamp,
) -> ChorusResult<Transition> {
    if !room.is_host(sender) {
        debug!("Rejected {:?} from {} in room {}", command, sender, room.id());

        return Err(ChorusError::Unauthorized {
            action: command.action(),
        });
    }

    match command {
        PlaybackCommand::Add(track) => Ok(add(room, track, now)),
        PlaybackCommand::Advance => Ok(advance(room, now)),
        PlaybackCommand::SetTransport(update) => set_transport(room, update, now),
    }
}

fn add(room: &mut Room, track: Track, now: Timestamp) -> Transition {
    let first_in_empty_room = room.status() == PlaybackStatus::Empty && room.queue().is_empty();

    let mut queue = room.queue().clone();
    queue.push_back(track);

    room.apply(RoomPatch::new().queue(queue), now);

    Transition::Queued {
        first_in_empty_room,
    }
}

fn advance(room: &mut Room, now: Timestamp) -> Transition {
    let mut queue = room.queue().clone();
    let next = queue.pop_front();

    room.apply(
        RoomPatch::new()
            .queue(queue)
            .playing(next.is_some())
            .current(next.clone())
            .position_seconds(0.),
        now,
    );

    Transition::Advanced { current: next }
}

fn set_transport(
    room: &mut Room,
    update: TransportUpdate,
    now: Timestamp,
) -> ChorusResult<Transition> {
    let mut patch = RoomPatch {
        playing: update.playing,
        position_seconds: update.position_seconds,
        ..Default::default()
    };

    if let Some(track_ref) = update.track_ref {
        let is_current = room.current().map(|t| t.track_ref.as_str()) == Some(track_ref.as_str());

        if !is_current {
            // Metadata only ever comes from an add, so unknown references are refused
            let track = room
                .known_track(&track_ref)
                .cloned()
                .ok_or(ChorusError::InvalidReference(track_ref))?;

            patch.current = Some(Some(track));
        }
    }

    room.apply(patch, now);
    Ok(Transition::TransportSet)
}
