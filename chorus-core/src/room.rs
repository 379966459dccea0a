use std::collections::{HashMap, HashSet, VecDeque};

use crate::{Id, Timestamp, Track};

pub type RoomId = String;

/// A control-channel connection, as seen by the core.
pub struct Connection;
pub type ConnectionId = Id<Connection>;

/// The part a connection plays in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Listener,
}

/// The transport state of a room, derived from `current` and `playing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// Nothing is selected for playback.
    Empty,
    LoadedPaused,
    LoadedPlaying,
}

/// A listening session.
#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,
    secret: Option<String>,
    host: Option<ConnectionId>,
    listeners: HashSet<ConnectionId>,
    queue: VecDeque<Track>,
    current: Option<Track>,
    playing: bool,
    position_seconds: f64,
    updated_at: Timestamp,
    /// The latest metadata for every reference ever added to this room
    catalog: HashMap<String, Track>,
}

/// A partial update of a room. Absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct RoomPatch {
    pub queue: Option<VecDeque<Track>>,
    /// `Some(None)` clears the current track.
    pub current: Option<Option<Track>>,
    pub playing: Option<bool>,
    pub position_seconds: Option<f64>,
}

/// Everything about a room that may be shown to its members.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub secret_required: bool,
    pub host: Option<ConnectionId>,
    pub listeners: Vec<ConnectionId>,
    pub queue: Vec<Track>,
    pub current: Option<Track>,
    pub playing: bool,
    pub position_seconds: f64,
    pub updated_at: Timestamp,
    pub status: PlaybackStatus,
}

impl Room {
    pub fn new(id: RoomId, secret: Option<String>, now: Timestamp) -> Self {
        Self {
            id,
            // An empty secret is the same as no secret
            secret: secret.filter(|s| !s.is_empty()),
            host: None,
            listeners: Default::default(),
            queue: Default::default(),
            current: None,
            playing: false,
            position_seconds: 0.,
            updated_at: now,
            catalog: Default::default(),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn host(&self) -> Option<ConnectionId> {
        self.host
    }

    pub fn listeners(&self) -> &HashSet<ConnectionId> {
        &self.listeners
    }

    pub fn queue(&self) -> &VecDeque<Track> {
        &self.queue
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn playing(&self) -> bool {
        self.playing
    }

    /// The last reported position, along with the instant it was reported at.
    pub fn position(&self) -> (f64, Timestamp) {
        (self.position_seconds, self.updated_at)
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn secret_required(&self) -> bool {
        self.secret.is_some()
    }

    /// Returns true if the candidate may enter this room.
    pub fn secret_matches(&self, candidate: Option<&str>) -> bool {
        match &self.secret {
            None => true,
            Some(secret) => candidate == Some(secret.as_str()),
        }
    }

    pub fn is_host(&self, connection_id: ConnectionId) -> bool {
        self.host == Some(connection_id)
    }

    pub fn role_of(&self, connection_id: ConnectionId) -> Option<Role> {
        if self.is_host(connection_id) {
            Some(Role::Host)
        } else if self.listeners.contains(&connection_id) {
            Some(Role::Listener)
        } else {
            None
        }
    }

    pub fn is_member(&self, connection_id: ConnectionId) -> bool {
        self.role_of(connection_id).is_some()
    }

    /// Every member of the room, host first.
    pub fn members(&self) -> Vec<ConnectionId> {
        self.host
            .into_iter()
            .chain(self.listeners.iter().copied())
            .collect()
    }

    pub fn status(&self) -> PlaybackStatus {
        match (&self.current, self.playing) {
            (None, _) => PlaybackStatus::Empty,
            (Some(_), false) => PlaybackStatus::LoadedPaused,
            (Some(_), true) => PlaybackStatus::LoadedPlaying,
        }
    }

    /// Returns the latest metadata known for a reference.
    pub fn known_track(&self, track_ref: &str) -> Option<&Track> {
        self.catalog.get(track_ref)
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        let mut listeners: Vec<_> = self.listeners.iter().copied().collect();
        listeners.sort_by_key(|l| l.value());

        RoomSnapshot {
            id: self.id.clone(),
            secret_required: self.secret_required(),
            host: self.host,
            listeners,
            queue: self.queue.iter().cloned().collect(),
            current: self.current.clone(),
            playing: self.playing,
            position_seconds: self.position_seconds,
            updated_at: self.updated_at,
            status: self.status(),
        }
    }

    /// Applies a partial update and bumps `updated_at`.
    pub fn apply(&mut self, patch: RoomPatch, now: Timestamp) {
        if let Some(queue) = patch.queue {
            for track in &queue {
                self.remember(track);
            }

            self.queue = queue;
        }

        if let Some(current) = patch.current {
            self.current = current;
        }

        if let Some(playing) = patch.playing {
            self.playing = playing;
        }

        if let Some(position) = patch.position_seconds.filter(|p| p.is_finite()) {
            self.position_seconds = position.max(0.);
        }

        // Nothing can play without a track
        if self.current.is_none() {
            self.playing = false;
        }

        self.touch(now);
    }

    pub fn set_host(&mut self, connection_id: ConnectionId, now: Timestamp) {
        self.listeners.remove(&connection_id);
        self.host = Some(connection_id);
        self.touch(now);
    }

    /// Returns false if the connection was already a member.
    pub fn add_listener(&mut self, connection_id: ConnectionId) -> bool {
        if self.is_host(connection_id) {
            return false;
        }

        self.listeners.insert(connection_id)
    }

    pub fn remove_listener(&mut self, connection_id: ConnectionId) -> bool {
        self.listeners.remove(&connection_id)
    }

    fn remember(&mut self, track: &Track) {
        self.catalog
            .insert(track.track_ref.clone(), track.clone());
    }

    /// `updated_at` never goes backwards, even if the clock does.
    fn touch(&mut self, now: Timestamp) {
        self.updated_at = now.max(self.updated_at + 1);
    }
}

impl RoomPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(mut self, queue: VecDeque<Track>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn current(mut self, current: Option<Track>) -> Self {
        self.current = Some(current);
        self
    }

    pub fn playing(mut self, playing: bool) -> Self {
        self.playing = Some(playing);
        self
    }

    pub fn position_seconds(mut self, position_seconds: f64) -> Self {
        self.position_seconds = Some(position_seconds);
        self
    }
}
