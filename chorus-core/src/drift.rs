use crate::{Config, RoomSnapshot, Timestamp};

/// The host's transport state, stamped by the server when it was forwarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Heartbeat {
    pub track_ref: Option<String>,
    pub playing: bool,
    pub position_seconds: f64,
    pub server_timestamp: Timestamp,
}

/// What a listener is playing right now.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalPlayback {
    pub track_ref: Option<String>,
    pub position_seconds: f64,
}

/// How a listener has to move its local playback.
#[derive(Debug, Clone, PartialEq)]
pub enum Resync {
    /// Close enough, leave it alone.
    Keep,
    Seek { position_seconds: f64 },
    Load {
        track_ref: String,
        position_seconds: f64,
    },
}

/// The result of comparing a heartbeat against local playback.
#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    /// Where the host should be right now
    pub target_seconds: f64,
    pub resync: Resync,
    /// Applied as an absolute transport command, regardless of drift
    pub playing: bool,
}

/// Computes corrections for a listener. Every heartbeat is handled on its own,
/// so a missed one is healed by the next.
#[derive(Debug, Clone)]
pub struct DriftCorrector {
    threshold_in_seconds: f64,
}

impl Heartbeat {
    /// Treats a state snapshot as a heartbeat taken when it was last mutated.
    pub fn from_snapshot(snapshot: &RoomSnapshot) -> Self {
        Self {
            track_ref: snapshot.current.as_ref().map(|t| t.track_ref.clone()),
            playing: snapshot.playing,
            position_seconds: snapshot.position_seconds,
            server_timestamp: snapshot.updated_at,
        }
    }
}

impl DriftCorrector {
    pub fn new(config: &Config) -> Self {
        Self::with_threshold(config.drift_threshold_in_seconds)
    }

    pub fn with_threshold(threshold_in_seconds: f64) -> Self {
        Self {
            threshold_in_seconds,
        }
    }

    /// The position the host should be at when the local clock reads `now`.
    pub fn target(&self, heartbeat: &Heartbeat, now: Timestamp) -> f64 {
        if !heartbeat.playing {
            return heartbeat.position_seconds;
        }

        // A heartbeat from the future is treated as one from right now
        let elapsed = (now - heartbeat.server_timestamp).max(0) as f64 / 1000.;
        heartbeat.position_seconds + elapsed
    }

    pub fn correct(&self, heartbeat: &Heartbeat, local: &LocalPlayback, now: Timestamp) -> Correction {
        let target_seconds = self.target(heartbeat, now);

        let resync = match &heartbeat.track_ref {
            Some(track_ref) if local.track_ref.as_ref() != Some(track_ref) => Resync::Load {
                track_ref: track_ref.clone(),
                position_seconds: target_seconds,
            },
            Some(_) if self.is_drifting(local.position_seconds, target_seconds) => Resync::Seek {
                position_seconds: target_seconds,
            },
            _ => Resync::Keep,
        };

        Correction {
            target_seconds,
            resync,
            playing: heartbeat.playing,
        }
    }

    fn is_drifting(&self, local: f64, target: f64) -> bool {
        (local - target).abs() > self.threshold_in_seconds
    }
}

impl Default for DriftCorrector {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Timestamp = 1_700_000_000_000;

    fn heartbeat(playing: bool) -> Heartbeat {
        Heartbeat {
            track_ref: Some("dQw4w9WgXcQ".into()),
            playing,
            position_seconds: 10.,
            server_timestamp: T,
        }
    }

    fn local(position_seconds: f64) -> LocalPlayback {
        LocalPlayback {
            track_ref: Some("dQw4w9WgXcQ".into()),
            position_seconds,
        }
    }

    #[test]
    fn test_small_drift_is_left_alone() {
        let corrector = DriftCorrector::default();
        let correction = corrector.correct(&heartbeat(true), &local(11.5), T + 2000);

        assert_eq!(correction.target_seconds, 12.);
        assert_eq!(correction.resync, Resync::Keep);
        assert!(correction.playing);
    }

    #[test]
    fn test_large_drift_seeks_to_target() {
        let corrector = DriftCorrector::default();
        let correction = corrector.correct(&heartbeat(true), &local(9.), T + 2000);

        assert_eq!(
            correction.resync,
            Resync::Seek {
                position_seconds: 12.
            }
        );
    }

    #[test]
    fn test_paused_heartbeat_does_not_extrapolate() {
        let corrector = DriftCorrector::default();
        let correction = corrector.correct(&heartbeat(false), &local(10.5), T + 60_000);

        assert_eq!(correction.target_seconds, 10.);
        assert_eq!(correction.resync, Resync::Keep);
        assert!(!correction.playing);
    }

    #[test]
    fn test_different_track_is_loaded_at_target() {
        let corrector = DriftCorrector::default();
        let other = LocalPlayback {
            track_ref: Some("something-else".into()),
            position_seconds: 10.,
        };

        let correction = corrector.correct(&heartbeat(true), &other, T + 500);

        assert_eq!(
            correction.resync,
            Resync::Load {
                track_ref: "dQw4w9WgXcQ".into(),
                position_seconds: 10.5
            }
        );
    }

    #[test]
    fn test_future_heartbeat_is_clamped() {
        let corrector = DriftCorrector::default();
        assert_eq!(corrector.target(&heartbeat(true), T - 3000), 10.);
    }
}
