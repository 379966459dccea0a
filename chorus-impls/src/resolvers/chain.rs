use std::sync::Arc;

use async_trait::async_trait;
use chorus_core::{BoxedResolver, ResolveError, ResolvedTrack, TrackResolver};
use log::debug;

use super::{DirectLinkResolver, YouTubeResolver};

/// Tries a list of resolvers in order, the first one to accept wins.
pub struct ResolverChain {
    resolvers: Vec<BoxedResolver>,
}

impl ResolverChain {
    pub fn new(resolvers: Vec<BoxedResolver>) -> Self {
        Self { resolvers }
    }

    pub fn with<R>(mut self, resolver: R) -> Self
    where
        R: TrackResolver,
    {
        self.resolvers.push(Arc::new(resolver));
        self
    }
}

impl Default for ResolverChain {
    fn default() -> Self {
        Self::new(vec![])
            .with(YouTubeResolver)
            .with(DirectLinkResolver)
    }
}

#[async_trait]
impl TrackResolver for ResolverChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    async fn resolve(&self, reference: &str) -> Result<Option<ResolvedTrack>, ResolveError> {
        if reference.trim().is_empty() {
            return Err(ResolveError::Empty);
        }

        for resolver in &self.resolvers {
            if let Some(resolved) = resolver.resolve(reference).await? {
                debug!("Resolved {} with {}", reference, resolved.source);
                return Ok(Some(resolved));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_default_chain() {
        let chain = ResolverChain::default();

        let youtube = chain.resolve("https://youtu.be/dQw4w9WgXcQ").await.unwrap().unwrap();
        assert_eq!(youtube.track_ref, "dQw4w9WgXcQ");
        assert_eq!(youtube.source, "youtube");

        let direct = chain.resolve("https://example.com/song.ogg").await.unwrap().unwrap();
        assert_eq!(direct.source, "direct");

        assert_eq!(chain.resolve("   ").await, Err(ResolveError::Empty));
        assert_eq!(chain.resolve("not a track").await, Ok(None));
    }
}
