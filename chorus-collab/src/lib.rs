mod client;
mod commands;
mod connections;
mod events;
mod rooms;

use std::sync::Arc;

use chorus_core::{
    implementors::MemoryRoomStore, BoxedResolver, ChorusError, ChorusResult, Config,
    ConnectionId, Registry, RoomSnapshot, RoomStore, TrackResolver,
};
use chorus_impls::ResolverChain;
use log::{debug, warn};

pub use client::*;
pub use commands::*;
pub use connections::*;
pub use events::*;
pub use rooms::*;

/// The chorus control plane, facilitating rooms, membership, playback and signaling.
pub struct Collab<S = MemoryRoomStore> {
    context: CollabContext<S>,

    pub rooms: RoomManager<S>,
}

/// A type passed to various components of the control plane, to access state and reach connections.
pub struct CollabContext<S = MemoryRoomStore> {
    pub config: Config,

    pub registry: Arc<Registry<S>>,
    pub connections: Arc<ConnectionRegistry>,
    pub resolver: BoxedResolver,
}

impl Collab<MemoryRoomStore> {
    /// Creates a control plane with in-memory rooms and the default resolvers.
    pub fn new(config: &Config) -> Self {
        Self::with_store(config, MemoryRoomStore::default(), ResolverChain::default())
    }
}

impl<S> Collab<S>
where
    S: RoomStore,
{
    pub fn with_store<R>(config: &Config, store: S, resolver: R) -> Self
    where
        R: TrackResolver,
    {
        let context = CollabContext {
            config: config.clone(),
            registry: Arc::new(Registry::new(config, store)),
            connections: Default::default(),
            resolver: Arc::new(resolver),
        };

        let rooms = RoomManager::new(&context);

        Self { context, rooms }
    }

    /// Opens a control channel, returning its id and the events sent to it.
    pub fn connect(&self) -> (ConnectionId, EventReceiver) {
        self.context.connections.register()
    }

    /// Closes a control channel and cleans up after it.
    pub fn disconnect(&self, connection_id: ConnectionId) {
        self.rooms.disconnect(connection_id)
    }

    /// Handles a command sent by a connection.
    ///
    /// Failures are reported to the sender as a room error, except for
    /// misrouted signals which are dropped silently.
    pub async fn handle(&self, sender: ConnectionId, command: Command) -> ChorusResult<()> {
        let name = command.name();

        let result = match command {
            Command::CreateRoom { secret } => self.rooms.create_room(sender, secret),
            Command::JoinRoom { room_id, secret } => {
                self.rooms.join_room(sender, &room_id, secret.as_deref())
            }
            Command::AddTrack {
                room_id,
                track_ref,
                title,
                artist,
            } => {
                self.rooms
                    .add_track(sender, &room_id, track_ref, title, artist)
                    .await
            }
            Command::Advance { room_id } => self.rooms.advance(sender, &room_id),
            Command::SetTransport { room_id, update } => {
                self.rooms.set_transport(sender, &room_id, update)
            }
            Command::Heartbeat {
                room_id,
                playing,
                position_seconds,
                track_ref,
            } => self
                .rooms
                .heartbeat(sender, &room_id, playing, position_seconds, track_ref),
            Command::Signal {
                room_id,
                target_id,
                payload,
            } => {
                self.rooms.relay(&room_id, sender, target_id, payload);
                Ok(())
            }
            Command::LeaveRoom { room_id } => self.rooms.leave_room(sender, &room_id),
            Command::CloseRoom { room_id } => self.rooms.close_room(sender, &room_id),
        };

        if let Err(error) = &result {
            match error {
                ChorusError::Unauthorized { .. } => {
                    warn!("Rejected {} from {}: {}", name, sender, error)
                }
                _ => debug!("{} from {} failed: {}", name, sender, error),
            }

            self.context.connections.send(
                sender,
                CollabEvent::RoomError {
                    message: error.to_string(),
                },
            );
        }

        result
    }

    /// Returns what a member of a room would see, if it exists.
    pub fn room_snapshot(&self, room_id: &str) -> Option<RoomSnapshot> {
        self.context.registry.get_room(room_id).map(|r| r.snapshot())
    }

    pub fn config(&self) -> &Config {
        &self.context.config
    }

    pub fn context(&self) -> &CollabContext<S> {
        &self.context
    }
}

impl<S> Clone for CollabContext<S>
where
    S: RoomStore,
{
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            registry: self.registry.clone(),
            connections: self.connections.clone(),
            resolver: self.resolver.clone(),
        }
    }
}
