use std::sync::Arc;

use log::info;
use parking_lot::Mutex;

use crate::{
    implementors::MemoryRoomStore, now_millis, random_string, ChorusError, ChorusResult, Config,
    ConnectionId, Room, RoomId, RoomPatch,
};

/// A room as held by a [RoomStore].
///
/// The lock is the single writer of the room: every read-modify-write holds it.
/// Teardown leaves `None` behind, so work queued on the lock before the room
/// was removed can never observe or recreate it.
#[derive(Debug)]
pub struct RoomCell {
    room: Mutex<Option<Room>>,
}

pub type SharedRoom = Arc<RoomCell>;

/// Represents a type that can hold rooms.
pub trait RoomStore
where
    Self: Send + Sync + 'static,
{
    /// Inserts a room, returning false if the id is already taken.
    fn insert(&self, id: RoomId, room: SharedRoom) -> bool;

    fn get(&self, id: &str) -> Option<SharedRoom>;

    fn remove(&self, id: &str) -> Option<SharedRoom>;

    fn ids(&self) -> Vec<RoomId>;
}

/// The table of all live rooms.
pub struct Registry<S = MemoryRoomStore> {
    config: Config,
    store: S,
}

impl RoomCell {
    fn new(room: Room) -> Self {
        Self {
            room: Mutex::new(Some(room)),
        }
    }
}

impl<S> Registry<S>
where
    S: RoomStore,
{
    pub fn new(config: &Config, store: S) -> Self {
        Self {
            config: config.clone(),
            store,
        }
    }

    /// Creates a room with a fresh id.
    pub fn create_room(&self, secret: Option<String>) -> ChorusResult<Room> {
        self.insert_fresh(secret, None)
    }

    /// Creates a room that already has its host, so it is never visible without one.
    pub fn create_hosted_room(
        &self,
        secret: Option<String>,
        host: ConnectionId,
    ) -> ChorusResult<Room> {
        self.insert_fresh(secret, Some(host))
    }

    fn insert_fresh(&self, secret: Option<String>, host: Option<ConnectionId>) -> ChorusResult<Room> {
        for _ in 0..self.config.room_id_attempts {
            let id = random_string(self.config.room_id_length);
            let now = now_millis();
            let mut room = Room::new(id.clone(), secret.clone(), now);

            if let Some(host) = host {
                room.set_host(host, now);
            }

            if self.store.insert(id.clone(), RoomCell::new(room.clone()).into()) {
                info!("Created room {}", id);
                return Ok(room);
            }
        }

        Err(ChorusError::IdExhausted(self.config.room_id_attempts))
    }

    /// Returns a copy of the room, if it exists.
    pub fn get_room(&self, id: &str) -> Option<Room> {
        self.transact(id, |room| Ok(room.clone())).ok()
    }

    /// Runs `f` while holding the room's lock.
    pub fn transact<T, F>(&self, id: &str, f: F) -> ChorusResult<T>
    where
        F: FnOnce(&mut Room) -> ChorusResult<T>,
    {
        let cell = self.store.get(id).ok_or_else(ChorusError::room_not_found)?;
        let mut guard = cell.room.lock();

        match guard.as_mut() {
            Some(room) => f(room),
            None => Err(ChorusError::room_not_found()),
        }
    }

    pub fn set_host(&self, id: &str, connection_id: ConnectionId) -> Option<Room> {
        self.transact(id, |room| {
            room.set_host(connection_id, now_millis());
            Ok(room.clone())
        })
        .ok()
    }

    /// Applies a partial update, returning the updated room.
    pub fn mutate(&self, id: &str, patch: RoomPatch) -> Option<Room> {
        self.transact(id, |room| {
            room.apply(patch, now_millis());
            Ok(room.clone())
        })
        .ok()
    }

    /// Adds a listener, returning false if it was already a member.
    pub fn add_listener(&self, id: &str, connection_id: ConnectionId) -> ChorusResult<bool> {
        self.transact(id, |room| Ok(room.add_listener(connection_id)))
    }

    /// Removes a listener, returning false if it was not one.
    pub fn remove_listener(&self, id: &str, connection_id: ConnectionId) -> ChorusResult<bool> {
        self.transact(id, |room| Ok(room.remove_listener(connection_id)))
    }

    /// Tears a room down, returning its final state.
    ///
    /// Returns `None` if the room does not exist or was already removed.
    pub fn remove_room(&self, id: &str) -> Option<Room> {
        self.remove_room_if(id, |_| Ok(())).ok()
    }

    /// Tears a room down if `check` passes while holding the room's lock.
    ///
    /// Of any number of concurrent removals, exactly one succeeds.
    pub fn remove_room_if<F>(&self, id: &str, check: F) -> ChorusResult<Room>
    where
        F: FnOnce(&Room) -> ChorusResult<()>,
    {
        let cell = self.store.get(id).ok_or_else(ChorusError::room_not_found)?;
        let mut guard = cell.room.lock();

        check(guard.as_ref().ok_or_else(ChorusError::room_not_found)?)?;

        let room = guard.take().ok_or_else(ChorusError::room_not_found)?;
        drop(guard);

        self.store.remove(id);
        info!("Removed room {}", id);

        Ok(room)
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.store.ids()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Default for Registry<MemoryRoomStore> {
    fn default() -> Self {
        Self::new(&Config::default(), MemoryRoomStore::default())
    }
}
