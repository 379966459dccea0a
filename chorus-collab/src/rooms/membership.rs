use chorus_core::{now_millis, ChorusError, ChorusResult, ConnectionId, Role, Room, RoomStore};
use log::info;

use crate::CollabEvent;

use super::RoomManager;

impl<S> RoomManager<S>
where
    S: RoomStore,
{
    /// Creates a room with `sender` as its host.
    pub fn create_room(&self, sender: ConnectionId, secret: Option<String>) -> ChorusResult<()> {
        let room = self.context.registry.create_hosted_room(secret, sender)?;

        self.context.connections.join(sender, room.id());
        self.context.connections.send(
            sender,
            CollabEvent::RoomCreated {
                room_id: room.id().clone(),
                role: Role::Host,
                state: room.snapshot(),
                sync_mode: self.context.config.sync_mode,
                server_time: now_millis(),
            },
        );

        Ok(())
    }

    /// Adds `sender` to a room as a listener, or re-syncs it if it is already a member.
    pub fn join_room(
        &self,
        sender: ConnectionId,
        room_id: &str,
        secret: Option<&str>,
    ) -> ChorusResult<()> {
        let connections = &self.context.connections;

        self.context.registry.transact(room_id, |room| {
            let existing_role = room.role_of(sender);

            if existing_role.is_none() {
                if !room.secret_matches(secret) {
                    return Err(ChorusError::InvalidSecret);
                }

                room.add_listener(sender);
                connections.join(sender, room_id);
            }

            connections.send(
                sender,
                CollabEvent::RoomJoined {
                    room_id: room.id().clone(),
                    role: existing_role.unwrap_or(Role::Listener),
                    state: room.snapshot(),
                    sync_mode: self.context.config.sync_mode,
                    server_time: now_millis(),
                },
            );

            if existing_role.is_none() {
                info!("Connection {} joined room {}", sender, room_id);
                self.notify_host(room, |room_id| CollabEvent::ListenerJoined {
                    room_id,
                    listener_id: sender,
                });
            }

            Ok(())
        })
    }

    /// Removes a listener from a room. A host leaving closes the room.
    pub fn leave_room(&self, sender: ConnectionId, room_id: &str) -> ChorusResult<()> {
        let role = self.context.registry.transact(room_id, |room| {
            let role = room.role_of(sender).ok_or_else(ChorusError::member_not_found)?;

            if role == Role::Listener {
                self.remove_listener(room, sender);
            }

            Ok(role)
        })?;

        match role {
            Role::Host => self.close_room(sender, room_id),
            Role::Listener => Ok(()),
        }
    }

    /// Tears a room down on behalf of its host.
    pub fn close_room(&self, sender: ConnectionId, room_id: &str) -> ChorusResult<()> {
        self.teardown(room_id, |room| {
            if room.is_host(sender) {
                Ok(())
            } else {
                Err(ChorusError::Unauthorized {
                    action: "close the room",
                })
            }
        })
    }

    /// Cleans up after a connection whose control channel dropped.
    pub fn disconnect(&self, connection_id: ConnectionId) {
        for room_id in self.context.connections.unregister(connection_id) {
            let role = self.context.registry.transact(&room_id, |room| {
                let role = room.role_of(connection_id);

                if role == Some(Role::Listener) {
                    self.remove_listener(room, connection_id);
                }

                Ok(role)
            });

            if let Ok(Some(Role::Host)) = role {
                // Somebody else may have closed it in the meantime, which is fine
                let _ = self.close_room(connection_id, &room_id);
            }
        }
    }

    fn remove_listener(&self, room: &mut Room, listener_id: ConnectionId) {
        room.remove_listener(listener_id);
        self.context.connections.leave(listener_id, room.id());

        info!("Connection {} left room {}", listener_id, room.id());

        self.notify_host(room, |room_id| CollabEvent::ListenerLeft {
            room_id,
            listener_id,
        });
    }

    /// Removes a room if `check` passes, then tells every member it is gone.
    fn teardown<F>(&self, room_id: &str, check: F) -> ChorusResult<()>
    where
        F: FnOnce(&Room) -> ChorusResult<()>,
    {
        let room = self.context.registry.remove_room_if(room_id, check)?;
        let members = room.members();

        for member in &members {
            self.context.connections.leave(*member, room_id);
        }

        self.context.connections.broadcast(
            members,
            &CollabEvent::RoomClosed {
                room_id: room_id.to_string(),
            },
            None,
        );

        Ok(())
    }

    fn notify_host<F>(&self, room: &Room, event: F)
    where
        F: FnOnce(String) -> CollabEvent,
    {
        if let Some(host) = room.host() {
            self.context.connections.send(host, event(room.id().clone()));
        }
    }
}
