use chorus_core::{ConnectionId, RoomStore};
use log::debug;
use serde_json::Value;

use crate::CollabEvent;

use super::RoomManager;

impl<S> RoomManager<S>
where
    S: RoomStore,
{
    /// Forwards `payload` to `to`, if both ends are members of the room.
    ///
    /// Anything else is dropped without telling anyone. Returns whether the
    /// payload was handed to the receiving connection.
    pub fn relay(&self, room_id: &str, from: ConnectionId, to: ConnectionId, payload: Value) -> bool {
        let delivered = self
            .context
            .registry
            .transact(room_id, |room| {
                if from == to || !room.is_member(from) || !room.is_member(to) {
                    return Ok(false);
                }

                Ok(self.context.connections.send(
                    to,
                    CollabEvent::Signal {
                        room_id: room.id().clone(),
                        from,
                        payload,
                    },
                ))
            })
            .unwrap_or(false);

        if !delivered {
            debug!("Dropped signal from {} to {} in room {}", from, to, room_id);
        }

        delivered
    }
}
