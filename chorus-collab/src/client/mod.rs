//! The parts of a client that take part in a session: the host's heartbeat
//! and transport fan-out, and a listener's inbound session and drift sync.

mod heartbeat;
mod host;
mod listener;
mod session;
mod sync;
mod transport;

#[cfg(test)]
mod testing;

pub use heartbeat::*;
pub use host::*;
pub use listener::*;
pub(crate) use session::*;
pub use sync::*;
pub use transport::*;

use thiserror::Error;

/// A player on the client, e.g. an embedded video player.
pub trait LocalPlayer
where
    Self: 'static + Send + Sync,
{
    /// The reference of the loaded track, if any.
    fn track_ref(&self) -> Option<String>;

    /// The current offset within the loaded track.
    fn position_seconds(&self) -> f64;

    fn is_playing(&self) -> bool;

    /// Loads a track and seeks into it.
    fn load(&self, track_ref: &str, position_seconds: f64);

    fn seek(&self, position_seconds: f64);

    fn set_playing(&self, playing: bool);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Playback was blocked until the user interacts")]
pub struct PlaybackBlocked;

/// Where inbound media ends up on a listener.
pub trait MediaOutput
where
    Self: 'static + Send + Sync,
{
    /// Starts playing inbound media.
    fn start(&self) -> Result<(), PlaybackBlocked>;
}
