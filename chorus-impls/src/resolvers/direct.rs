use async_trait::async_trait;
use chorus_core::{ResolveError, ResolvedTrack, TrackResolver};
use url::Url;

/// Accepts direct links to audio files served over https.
#[derive(Debug, Default)]
pub struct DirectLinkResolver;

#[async_trait]
impl TrackResolver for DirectLinkResolver {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn resolve(&self, reference: &str) -> Result<Option<ResolvedTrack>, ResolveError> {
        let reference = reference.trim();

        if !reference.starts_with("https://") {
            return Ok(None);
        }

        let url = Url::parse(reference).map_err(|e| ResolveError::Malformed {
            reference: reference.to_string(),
            reason: e.to_string(),
        })?;

        if url.host_str().is_none() {
            return Err(ResolveError::Malformed {
                reference: reference.to_string(),
                reason: "Missing host".to_string(),
            });
        }

        Ok(Some(ResolvedTrack {
            track_ref: url.to_string(),
            source: self.name(),
        }))
    }
}
