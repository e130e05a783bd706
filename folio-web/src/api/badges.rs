//! Spotify status badges
//!
//! Image routes redirect to a shields.io badge describing the user's
//! obsession or current track; redirect routes send the visitor to the
//! track on open.spotify.com. Meant for embedding in profile READMEs.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};

use super::error::ApiError;
use super::site::found;
use crate::spotify::{SpotifyTrack, StatusKind};
use crate::AppState;

const OPEN_TRACK_URL: &str = "https://open.spotify.com/track/";

const NO_OBSESSION_TEXT: &str = "Obsession not set. Please join our discord server and use the \"/obsession set\" command. https://discord.gg/TdRfGKg8Wh";
const NOT_VISIBLE_TEXT: &str = "Please join our discord server so our bot can see your Discord Spotify activity. https://discord.gg/TdRfGKg8Wh";

/// Percent-encode badge text, then escape shields.io's `-` and `_` separators
///
/// Letters, digits, `_ . - ~` and `/` pass through unencoded; shields.io
/// then needs literal dashes and underscores doubled.
pub fn badge_quote(text: &str) -> String {
    urlencoding::encode(text)
        .replace("%2F", "/")
        .replace('-', "--")
        .replace('_', "__")
}

/// shields.io badge URL for an already-quoted label
pub fn badge_url(label: &str) -> String {
    format!(
        "https://img.shields.io/badge/{}-252525?style=flat&logo=spotify",
        label.replace(' ', "%20")
    )
}

fn track_label(prefix: &str, track: &SpotifyTrack) -> String {
    format!(
        "{} {} by {}",
        prefix,
        badge_quote(&track.title),
        badge_quote(&track.artist)
    )
}

async fn badge(state: &AppState, kind: StatusKind, user_id: u64) -> Result<Response, ApiError> {
    let track = state.spotify.lookup(kind, user_id).await?;

    let label = match (kind, track) {
        (StatusKind::Obsession, Some(t)) => track_label("Current_Favourite:", &t),
        (StatusKind::Obsession, None) => "No obsession set.".to_string(),
        (StatusKind::Listening, Some(t)) => track_label("Listening to", &t),
        (StatusKind::Listening, None) => "Not listening to anything".to_string(),
    };
    Ok(found(&badge_url(&label)))
}

async fn track_redirect(
    state: &AppState,
    kind: StatusKind,
    user_id: u64,
) -> Result<Response, ApiError> {
    match state.spotify.lookup(kind, user_id).await? {
        Some(track) => Ok(found(&format!("{}{}", OPEN_TRACK_URL, track.track_id))),
        None => {
            let text = match kind {
                StatusKind::Obsession => NO_OBSESSION_TEXT,
                StatusKind::Listening => NOT_VISIBLE_TEXT,
            };
            Ok(text.into_response())
        }
    }
}

/// GET /obsession/:user_id/image
pub async fn obsession_badge(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Result<Response, ApiError> {
    badge(&state, StatusKind::Obsession, user_id).await
}

/// GET /obsession/:user_id/redirect
pub async fn obsession_redirect(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Result<Response, ApiError> {
    track_redirect(&state, StatusKind::Obsession, user_id).await
}

/// GET /listening/:user_id/image
pub async fn listening_badge(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Result<Response, ApiError> {
    badge(&state, StatusKind::Listening, user_id).await
}

/// GET /listening/:user_id/redirect
pub async fn listening_redirect(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Result<Response, ApiError> {
    track_redirect(&state, StatusKind::Listening, user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_quote_doubles_separators() {
        assert_eq!(badge_quote("Lo-Fi_Beats"), "Lo--Fi__Beats");
    }

    #[test]
    fn test_badge_quote_percent_encodes() {
        assert_eq!(badge_quote("Rock & Roll"), "Rock%20%26%20Roll");
        assert_eq!(badge_quote("AC/DC"), "AC/DC");
        assert_eq!(badge_quote("Beyoncé"), "Beyonc%C3%A9");
    }

    #[test]
    fn test_badge_quote_encodes_before_doubling() {
        // "%2D" never appears: dashes stay literal and get doubled
        assert_eq!(badge_quote("a - b"), "a%20--%20b");
    }

    #[test]
    fn test_badge_url_encodes_label_spaces() {
        assert_eq!(
            badge_url("Not listening to anything"),
            "https://img.shields.io/badge/Not%20listening%20to%20anything-252525?style=flat&logo=spotify"
        );
    }

    #[test]
    fn test_track_label() {
        let track = SpotifyTrack {
            title: "Song A".to_string(),
            artist: "Artist-A".to_string(),
            track_id: "abc".to_string(),
        };
        assert_eq!(
            track_label("Listening to", &track),
            "Listening to Song%20A by Artist--A"
        );
    }
}
