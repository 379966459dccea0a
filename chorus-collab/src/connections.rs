use std::collections::HashSet;

use chorus_core::{ConnectionId, RoomId};
use dashmap::DashMap;
use log::{debug, info};
use tokio::sync::mpsc::unbounded_channel;

use crate::{CollabEvent, EventReceiver, EventSender};

/// The open control channels, and the rooms each of them is in.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionEntry>,
}

struct ConnectionEntry {
    sender: EventSender,
    rooms: HashSet<RoomId>,
}

impl ConnectionRegistry {
    /// Opens a connection, returning its id and the receiving end of its events.
    pub fn register(&self) -> (ConnectionId, EventReceiver) {
        let (sender, receiver) = unbounded_channel();
        let id = ConnectionId::new();

        self.connections.insert(
            id,
            ConnectionEntry {
                sender,
                rooms: Default::default(),
            },
        );

        info!("Connection {} opened", id);
        (id, receiver)
    }

    /// Forgets a connection, returning the rooms it was in.
    pub fn unregister(&self, id: ConnectionId) -> Vec<RoomId> {
        match self.connections.remove(&id) {
            Some((_, entry)) => {
                info!("Connection {} closed", id);
                entry.rooms.into_iter().collect()
            }
            None => vec![],
        }
    }

    /// Sends an event to one connection. Never blocks.
    ///
    /// Returns false if the connection is gone.
    pub fn send(&self, id: ConnectionId, event: CollabEvent) -> bool {
        let Some(entry) = self.connections.get(&id) else {
            debug!("Dropped event for unknown connection {}", id);
            return false;
        };

        entry.sender.send(event).is_ok()
    }

    /// Sends an event to every recipient except `except`.
    pub fn broadcast<I>(&self, recipients: I, event: &CollabEvent, except: Option<ConnectionId>)
    where
        I: IntoIterator<Item = ConnectionId>,
    {
        for id in recipients.into_iter().filter(|id| Some(*id) != except) {
            self.send(id, event.clone());
        }
    }

    pub fn join(&self, id: ConnectionId, room_id: &str) {
        if let Some(mut entry) = self.connections.get_mut(&id) {
            entry.rooms.insert(room_id.to_string());
        }
    }

    pub fn leave(&self, id: ConnectionId, room_id: &str) {
        if let Some(mut entry) = self.connections.get_mut(&id) {
            entry.rooms.remove(room_id);
        }
    }
}
