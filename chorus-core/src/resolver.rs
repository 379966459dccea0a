use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::ChorusError;

/// A track reference in the form clients load it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTrack {
    /// The canonical reference, which is what gets queued.
    pub track_ref: String,
    /// The name of the resolver that accepted it.
    pub source: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Reference is empty")]
    Empty,
    #[error("Malformed track reference \"{reference}\": {reason}")]
    Malformed { reference: String, reason: String },
}

/// Represents a type that can turn a submitted reference into a canonical one.
///
/// The coordination core never dereferences a track. Resolvers only check that
/// a reference is something clients will be able to load.
#[async_trait]
pub trait TrackResolver
where
    Self: 'static + Send + Sync,
{
    fn name(&self) -> &'static str;

    /// Returns `Ok(None)` if this resolver does not handle the reference,
    /// so the next one may be tried.
    async fn resolve(&self, reference: &str) -> Result<Option<ResolvedTrack>, ResolveError>;
}

/// [TrackResolver] trait object.
pub type BoxedResolver = Arc<dyn TrackResolver>;

impl From<ResolveError> for ChorusError {
    fn from(error: ResolveError) -> Self {
        match error {
            ResolveError::Empty => Self::InvalidReference(String::new()),
            ResolveError::Malformed { reference, .. } => Self::InvalidReference(reference),
        }
    }
}
