//! Client for the bot-owned Spotify status API
//!
//! The bot watches Discord presence and exposes two lookups per Discord user:
//! the track they are currently listening to and their self-declared
//! "obsession". Both answer 404 when there is nothing to report.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("Spotify status API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Spotify status API returned {0}")]
    Status(reqwest::StatusCode),
}

/// Track reported by the status API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpotifyTrack {
    pub title: String,
    pub artist: String,
    pub track_id: String,
}

/// Which lookup to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// `/obsession/{id}`: the user's pinned favourite
    Obsession,
    /// `/spotify/{id}`: what the user is playing right now
    Listening,
}

impl StatusKind {
    fn path_segment(self) -> &'static str {
        match self {
            StatusKind::Obsession => "obsession",
            StatusKind::Listening => "spotify",
        }
    }
}

#[derive(Clone)]
pub struct SpotifyStatusClient {
    http: reqwest::Client,
    base_url: String,
}

impl SpotifyStatusClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SpotifyError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Look up a user's track; `Ok(None)` when the API has nothing for them
    pub async fn lookup(
        &self,
        kind: StatusKind,
        user_id: u64,
    ) -> Result<Option<SpotifyTrack>, SpotifyError> {
        let url = format!("{}/{}/{}", self.base_url, kind.path_segment(), user_id);
        debug!("Spotify status lookup: {}", url);

        let response = self.http.get(&url).send().await?;
        match response.status() {
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(SpotifyError::Status(status)),
        }
    }
}
