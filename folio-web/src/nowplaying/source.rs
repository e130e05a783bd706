//! Recent-tracks data source abstraction

use async_trait::async_trait;
use thiserror::Error;

use super::display::TrackPlay;

/// Why the source could not produce a track
///
/// All variants are absorbed by the notifier and rendered as the
/// "nothing playing" placeholder.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network failure, timeout or non-success status
    #[error("recent tracks source unavailable: {0}")]
    Unavailable(String),

    /// Response did not have the expected shape
    #[error("malformed recent tracks response: {0}")]
    Malformed(String),

    /// No credentials configured
    #[error("recent tracks source not configured")]
    NotConfigured,
}

/// Anything that can report the most recent scrobble
#[async_trait]
pub trait RecentTracksSource: Send + Sync {
    /// Short identifier for logging (e.g., "last.fm")
    fn source_id(&self) -> &'static str;

    /// Whether polling can ever produce a track
    fn is_live(&self) -> bool {
        true
    }

    /// Fetch the most recent track
    async fn latest_track(&self) -> Result<TrackPlay, SourceError>;
}

/// Source used when no credentials are configured
///
/// Never touches the network.
pub struct UnconfiguredSource;

#[async_trait]
impl RecentTracksSource for UnconfiguredSource {
    fn source_id(&self) -> &'static str {
        "unconfigured"
    }

    fn is_live(&self) -> bool {
        false
    }

    async fn latest_track(&self) -> Result<TrackPlay, SourceError> {
        Err(SourceError::NotConfigured)
    }
}
