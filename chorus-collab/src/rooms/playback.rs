use chorus_core::{
    apply_command, now_millis, ChorusError, ChorusResult, ConnectionId, PlaybackCommand,
    RoomStore, Track, Transition, TransportUpdate,
};

use crate::CollabEvent;

use super::RoomManager;

impl<S> RoomManager<S>
where
    S: RoomStore,
{
    /// Resolves a reference and appends it to the queue.
    pub async fn add_track(
        &self,
        sender: ConnectionId,
        room_id: &str,
        track_ref: String,
        title: Option<String>,
        artist: Option<String>,
    ) -> ChorusResult<()> {
        // Non-hosts are turned away before their reference is looked at
        self.context.registry.transact(room_id, |room| {
            if room.is_host(sender) {
                Ok(())
            } else {
                Err(ChorusError::Unauthorized {
                    action: "add tracks",
                })
            }
        })?;

        let resolved = self
            .context
            .resolver
            .resolve(&track_ref)
            .await?
            .ok_or_else(|| ChorusError::InvalidReference(track_ref.trim().to_string()))?;

        let track = Track::new(resolved.track_ref, title, artist);
        let auto_advance = self.context.config.auto_advance;

        self.context.registry.transact(room_id, |room| {
            let now = now_millis();
            let transition = apply_command(room, sender, PlaybackCommand::Add(track), now)?;

            self.broadcast(room, CollabEvent::QueueUpdated(room.snapshot()), None);

            let first_in_empty_room = transition
                == Transition::Queued {
                    first_in_empty_room: true,
                };

            if auto_advance && first_in_empty_room {
                apply_command(room, sender, PlaybackCommand::Advance, now)?;
                self.broadcast(room, CollabEvent::StateUpdated(room.snapshot()), None);
            }

            Ok(())
        })
    }

    /// Moves the head of the queue into the current slot.
    pub fn advance(&self, sender: ConnectionId, room_id: &str) -> ChorusResult<()> {
        self.context.registry.transact(room_id, |room| {
            apply_command(room, sender, PlaybackCommand::Advance, now_millis())?;
            self.broadcast(room, CollabEvent::StateUpdated(room.snapshot()), None);

            Ok(())
        })
    }

    /// Applies reported transport facts. The sender already knows them.
    pub fn set_transport(
        &self,
        sender: ConnectionId,
        room_id: &str,
        update: TransportUpdate,
    ) -> ChorusResult<()> {
        self.context.registry.transact(room_id, |room| {
            apply_command(
                room,
                sender,
                PlaybackCommand::SetTransport(update),
                now_millis(),
            )?;
            self.broadcast(
                room,
                CollabEvent::StateUpdated(room.snapshot()),
                Some(sender),
            );

            Ok(())
        })
    }

    /// Like [Self::set_transport], but forwarded with the time of forwarding.
    pub fn heartbeat(
        &self,
        sender: ConnectionId,
        room_id: &str,
        playing: bool,
        position_seconds: f64,
        track_ref: Option<String>,
    ) -> ChorusResult<()> {
        let update = TransportUpdate::heartbeat(playing, position_seconds, track_ref);

        self.context.registry.transact(room_id, |room| {
            let now = now_millis();

            apply_command(room, sender, PlaybackCommand::SetTransport(update), now)?;

            // Never stamp the forward before the mutation it carries
            let server_time = now_millis().max(room.updated_at());

            self.broadcast(
                room,
                CollabEvent::StateHeartbeat {
                    state: room.snapshot(),
                    server_time,
                },
                Some(sender),
            );

            Ok(())
        })
    }
}
