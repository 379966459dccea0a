use crate::{now_millis, Timestamp};

/// A single track in a room's queue.
///
/// The reference is opaque: it is resolved into playable audio by clients,
/// never by the coordination core.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub track_ref: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub added_at: Timestamp,
}

impl Track {
    pub fn new(track_ref: impl Into<String>, title: Option<String>, artist: Option<String>) -> Self {
        Self {
            track_ref: track_ref.into(),
            title,
            artist,
            added_at: now_millis(),
        }
    }

    #[cfg(test)]
    pub fn mock(track_ref: &str) -> Self {
        Self::new(track_ref, Some(track_ref.to_uppercase()), None)
    }
}
