use async_trait::async_trait;
use chorus_core::{ResolveError, ResolvedTrack, TrackResolver};
use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use super::with_https_scheme;

lazy_static! {
    static ref VIDEO_ID_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9_-]{6,}$").unwrap();
    static ref URL_PATTERNS: [Regex; 4] = [
        Regex::new(r"^(?:https?://)?(?:www\.)?youtu\.be/([a-zA-Z0-9_-]{6,})").unwrap(),
        Regex::new(r"^(?:https?://)?(?:www\.)?youtube\.com/watch\?v=([a-zA-Z0-9_-]{6,})").unwrap(),
        Regex::new(r"^(?:https?://)?(?:www\.)?youtube\.com/shorts/([a-zA-Z0-9_-]{6,})").unwrap(),
        Regex::new(r"^(?:https?://)?(?:www\.)?youtube\.com/embed/([a-zA-Z0-9_-]{6,})").unwrap(),
    ];
}

/// Accepts YouTube video ids and links, canonicalizing them to the bare id.
#[derive(Debug, Default)]
pub struct YouTubeResolver;

#[async_trait]
impl TrackResolver for YouTubeResolver {
    fn name(&self) -> &'static str {
        "youtube"
    }

    async fn resolve(&self, reference: &str) -> Result<Option<ResolvedTrack>, ResolveError> {
        Ok(extract_video_id(reference).map(|id| ResolvedTrack {
            track_ref: id,
            source: self.name(),
        }))
    }
}

/// Extracts a video id from a bare id or any of the common link shapes.
pub fn extract_video_id(reference: &str) -> Option<String> {
    let reference = reference.trim();

    if reference.is_empty() {
        return None;
    }

    if VIDEO_ID_REGEX.is_match(reference) {
        return Some(reference.to_string());
    }

    for pattern in URL_PATTERNS.iter() {
        if let Some(id) = pattern.captures(reference).and_then(|c| c.get(1)) {
            return Some(id.as_str().to_string());
        }
    }

    // Anything else on a youtube.com host with a v parameter, e.g. music.youtube.com
    let url = Url::parse(&with_https_scheme(reference)).ok()?;
    url.host_str()
        .filter(|h| *h == "youtube.com" || h.ends_with(".youtube.com"))?;

    url.query_pairs()
        .find(|(k, _)| k == "v")
        .map(|(_, v)| v.into_owned())
        .filter(|v| VIDEO_ID_REGEX.is_match(v))
}
