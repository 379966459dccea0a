use std::{str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

/// A single audio sample
pub type Sample = f32;

/// Which synchronization strategy clients of a deployment should use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Every client loads the track itself and re-aligns on heartbeats.
    #[default]
    Drift,
    /// Listeners receive the host's mixed audio over a transport session.
    Relay,
}

/// The configuration of the session coordination core
#[derive(Debug, Clone)]
pub struct Config {
    /// How often the host reports its transport state
    pub heartbeat_interval_in_seconds: f32,
    /// How far a listener may drift from the host before it seeks
    pub drift_threshold_in_seconds: f64,
    /// How many characters a generated room id has
    pub room_id_length: usize,
    /// How many times room creation retries on an id collision
    pub room_id_attempts: usize,
    /// Whether adding the first track to an empty room starts it immediately
    pub auto_advance: bool,
    /// The initial program bus volume, from 0 to 100
    pub music_volume: u8,
    /// The voice bus volume while talking, from 0 to 100
    pub voice_volume: u8,
    /// The synchronization strategy advertised to clients
    pub sync_mode: SyncMode,
}

impl Config {
    /// How often the host emits a heartbeat
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs_f32(self.heartbeat_interval_in_seconds)
    }

    /// The linear gain of the program bus
    pub fn music_gain(&self) -> f32 {
        volume_to_gain(self.music_volume)
    }

    /// The linear gain of the voice bus while talking
    pub fn voice_gain(&self) -> f32 {
        volume_to_gain(self.voice_volume)
    }
}

/// Converts a 0-100 volume to a linear gain, clamping anything above 100.
pub fn volume_to_gain(volume: u8) -> f32 {
    f32::from(volume.min(100)) / 100.
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drift" => Ok(Self::Drift),
            "relay" => Ok(Self::Relay),
            other => Err(format!("Unknown sync mode \"{}\"", other)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            heartbeat_interval_in_seconds: 5.,
            // Anything tighter causes audible micro-seeks on every heartbeat
            drift_threshold_in_seconds: 0.8,
            room_id_length: 6,
            room_id_attempts: 8,
            auto_advance: true,
            music_volume: 80,
            voice_volume: 70,
            sync_mode: SyncMode::Drift,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_to_gain() {
        assert_eq!(volume_to_gain(0), 0.);
        assert_eq!(volume_to_gain(100), 1.);
        assert_eq!(volume_to_gain(250), 1.);
        assert!((Config::default().music_gain() - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_sync_mode_from_str() {
        assert_eq!("Relay".parse::<SyncMode>(), Ok(SyncMode::Relay));
        assert_eq!(" drift ".parse::<SyncMode>(), Ok(SyncMode::Drift));
        assert!("both".parse::<SyncMode>().is_err());
    }
}
