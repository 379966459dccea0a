use std::sync::Arc;

use chorus_core::{
    Config, Correction, DriftCorrector, Heartbeat, LocalPlayback, Resync, Role, Timestamp,
};

use super::LocalPlayer;
use crate::CollabEvent;

/// Keeps a listener's local player aligned with the host.
pub struct ListenerSync<P: ?Sized> {
    corrector: DriftCorrector,
    player: Arc<P>,
}

impl<P> ListenerSync<P>
where
    P: LocalPlayer + ?Sized,
{
    pub fn new(config: &Config, player: Arc<P>) -> Self {
        Self {
            corrector: DriftCorrector::new(config),
            player,
        }
    }

    /// Corrects local playback for any event that carries room state.
    ///
    /// * `now` - The local clock, in milliseconds since the Unix epoch.
    pub fn handle_event(&self, event: &CollabEvent, now: Timestamp) -> Option<Correction> {
        let heartbeat = match event {
            CollabEvent::RoomJoined {
                role: Role::Listener,
                state,
                server_time,
                ..
            } => {
                // Nothing to line up with yet
                state.current.as_ref()?;

                Heartbeat {
                    server_timestamp: *server_time,
                    ..Heartbeat::from_snapshot(state)
                }
            }
            CollabEvent::StateUpdated(state) => Heartbeat::from_snapshot(state),
            CollabEvent::StateHeartbeat { state, server_time } => Heartbeat {
                server_timestamp: *server_time,
                ..Heartbeat::from_snapshot(state)
            },
            _ => return None,
        };

        Some(self.apply(&heartbeat, now))
    }

    /// Applies one heartbeat to the local player.
    pub fn apply(&self, heartbeat: &Heartbeat, now: Timestamp) -> Correction {
        let local = LocalPlayback {
            track_ref: self.player.track_ref(),
            position_seconds: self.player.position_seconds(),
        };

        let correction = self.corrector.correct(heartbeat, &local, now);

        match &correction.resync {
            Resync::Keep => {}
            Resync::Seek { position_seconds } => self.player.seek(*position_seconds),
            Resync::Load {
                track_ref,
                position_seconds,
            } => self.player.load(track_ref, *position_seconds),
        }

        self.player.set_playing(correction.playing);
        correction
    }
}
