use std::{sync::Arc, time::Duration};

use chorus_core::RoomId;
use log::debug;
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

use super::LocalPlayer;
use crate::Command;

/// Periodically reports the host's transport state. Stops when dropped.
pub struct HeartbeatEmitter {
    task: JoinHandle<()>,
}

impl HeartbeatEmitter {
    /// Starts emitting a heartbeat every `period`, the first one after a full period.
    pub fn start<P, E>(room_id: &str, period: Duration, player: Arc<P>, mut emit: E) -> Self
    where
        P: LocalPlayer + ?Sized,
        E: FnMut(Command) + Send + 'static,
    {
        let room_id: RoomId = room_id.to_string();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);

            // A stalled runtime should not cause a burst of heartbeats
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                emit(Command::Heartbeat {
                    room_id: room_id.clone(),
                    playing: player.is_playing(),
                    position_seconds: player.position_seconds(),
                    track_ref: player.track_ref(),
                });
            }
        });

        Self { task }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for HeartbeatEmitter {
    fn drop(&mut self) {
        debug!("Stopping heartbeat");
        self.task.abort();
    }
}
