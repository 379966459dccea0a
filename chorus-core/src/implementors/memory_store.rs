use dashmap::{mapref::entry::Entry, DashMap};

use crate::{RoomId, RoomStore, SharedRoom};

/// Keeps rooms in process memory. Rooms do not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryRoomStore {
    rooms: DashMap<RoomId, SharedRoom>,
}

impl RoomStore for MemoryRoomStore {
    fn insert(&self, id: RoomId, room: SharedRoom) -> bool {
        match self.rooms.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(room);
                true
            }
        }
    }

    fn get(&self, id: &str) -> Option<SharedRoom> {
        self.rooms.get(id).map(|r| r.value().clone())
    }

    fn remove(&self, id: &str) -> Option<SharedRoom> {
        self.rooms.remove(id).map(|(_, room)| room)
    }

    fn ids(&self) -> Vec<RoomId> {
        self.rooms.iter().map(|r| r.key().clone()).collect()
    }
}
