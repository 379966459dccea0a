mod membership;
mod playback;
mod relay;

use chorus_core::{ConnectionId, Room, RoomStore};

use crate::{CollabContext, CollabEvent};

/// Handles every command that concerns a room.
///
/// Events caused by a command are sent while the room's lock is still held,
/// so every member observes them in the order the room was mutated.
pub struct RoomManager<S> {
    context: CollabContext<S>,
}

impl<S> RoomManager<S>
where
    S: RoomStore,
{
    pub fn new(context: &CollabContext<S>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Sends an event to every member of a room, except `except`.
    fn broadcast(&self, room: &Room, event: CollabEvent, except: Option<ConnectionId>) {
        self.context
            .connections
            .broadcast(room.members(), &event, except);
    }
}
