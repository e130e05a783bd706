//! Last.fm `user.getrecenttracks` client

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::display::TrackPlay;
use super::source::{RecentTracksSource, SourceError};

#[derive(Debug, Deserialize)]
struct RecentTracksResponse {
    recenttracks: RecentTracks,
}

#[derive(Debug, Deserialize)]
struct RecentTracks {
    track: Vec<RawTrack>,
}

#[derive(Debug, Deserialize)]
struct RawTrack {
    name: String,
    url: String,
    artist: RawArtist,
    #[serde(rename = "@attr", default)]
    attr: Option<TrackAttr>,
}

#[derive(Debug, Deserialize)]
struct RawArtist {
    #[serde(rename = "#text")]
    text: String,
}

#[derive(Debug, Deserialize)]
struct TrackAttr {
    // Kept as raw JSON: only the literal string "true" means now playing
    #[serde(default)]
    nowplaying: Option<serde_json::Value>,
}

/// Extract the newest track from a recent-tracks JSON body
pub fn parse_recent_tracks(body: &[u8]) -> Result<TrackPlay, SourceError> {
    let response: RecentTracksResponse =
        serde_json::from_slice(body).map_err(|e| SourceError::Malformed(e.to_string()))?;

    let track = response
        .recenttracks
        .track
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::Malformed("empty track list".to_string()))?;

    let now_playing = track
        .attr
        .and_then(|attr| attr.nowplaying)
        .is_some_and(|flag| flag.as_str() == Some("true"));

    Ok(TrackPlay {
        track: track.name,
        artist: track.artist.text,
        url: track.url,
        now_playing,
    })
}

pub struct LastFmClient {
    http: reqwest::Client,
    api_url: String,
    username: String,
    api_key: String,
}

impl LastFmClient {
    pub fn new(
        api_url: impl Into<String>,
        username: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.into(),
            username: username.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl RecentTracksSource for LastFmClient {
    fn source_id(&self) -> &'static str {
        "last.fm"
    }

    async fn latest_track(&self) -> Result<TrackPlay, SourceError> {
        let response = self
            .http
            .get(&self.api_url)
            .query(&[
                ("method", "user.getrecenttracks"),
                ("user", self.username.as_str()),
                ("api_key", self.api_key.as_str()),
                ("format", "json"),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        let play = parse_recent_tracks(&body)?;
        debug!(
            "Last.fm: '{}' by '{}' (now playing: {})",
            play.track, play.artist, play.now_playing
        );
        Ok(play)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_now_playing_track() {
        let body = br##"{"recenttracks":{"track":[{"name":"Song A","url":"http://x","artist":{"#text":"Artist A"},"@attr":{"nowplaying":"true"}}]}}"##;
        let play = parse_recent_tracks(body).unwrap();
        assert_eq!(play.track, "Song A");
        assert_eq!(play.artist, "Artist A");
        assert_eq!(play.url, "http://x");
        assert!(play.now_playing);
    }

    #[test]
    fn test_parse_previously_played_track() {
        let body = br##"{"recenttracks":{"track":[{"name":"Song A","url":"http://x","artist":{"#text":"Artist A"}}]}}"##;
        assert!(!parse_recent_tracks(body).unwrap().now_playing);
    }

    #[test]
    fn test_nowplaying_requires_literal_true_string() {
        for flag in [r#""false""#, r#"true"#, r#""TRUE""#, r#"1"#] {
            let body = format!(
                r##"{{"recenttracks":{{"track":[{{"name":"S","url":"u","artist":{{"#text":"A"}},"@attr":{{"nowplaying":{}}}}}]}}}}"##,
                flag
            );
            let play = parse_recent_tracks(body.as_bytes()).unwrap();
            assert!(!play.now_playing, "flag {} must not count as now playing", flag);
        }
    }

    #[test]
    fn test_parse_uses_first_track_only() {
        let body = br##"{"recenttracks":{"track":[
            {"name":"Newest","url":"u1","artist":{"#text":"A"}},
            {"name":"Older","url":"u2","artist":{"#text":"B"}}
        ]}}"##;
        assert_eq!(parse_recent_tracks(body).unwrap().track, "Newest");
    }

    #[test]
    fn test_malformed_shapes() {
        let cases: [&[u8]; 5] = [
            b"not json",
            br#"{}"#,
            br#"{"recenttracks":{"track":[]}}"#,
            br#"{"recenttracks":{"track":{"name":"single object"}}}"#,
            br#"{"recenttracks":{"track":[{"name":"S","url":"u"}]}}"#,
        ];
        for body in cases {
            assert!(
                matches!(parse_recent_tracks(body), Err(SourceError::Malformed(_))),
                "expected malformed for {}",
                String::from_utf8_lossy(body)
            );
        }
    }
}
