//! The now-playing display value and its text/HTML renderings

use serde::Serialize;

use crate::html::escape;

/// Inline Last.fm logo shown in front of every fragment
pub const LASTFM_LOGO: &str = "<img src='/static/graphics/lastfm.svg' style='height:1em; vertical-align:middle; padding-bottom: 0.1em'/>";

/// One scrobbled track as reported by the recent-tracks source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackPlay {
    pub track: String,
    pub artist: String,
    pub url: String,
    /// True only while the track is currently playing
    pub now_playing: bool,
}

/// What the homepage shows about the owner's music
///
/// `Nothing` covers "no data" as well as every failure mode of the source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NowPlaying {
    #[default]
    Nothing,
    Track(TrackPlay),
}

impl NowPlaying {
    /// Plain-text rendering
    pub fn text(&self) -> String {
        match self {
            NowPlaying::Nothing => "Listening to nothing rn...".to_string(),
            NowPlaying::Track(play) => format!(
                "{} {} by {}",
                lead_in(play.now_playing),
                play.track,
                play.artist
            ),
        }
    }

    /// HTML fragment pushed to the homepage
    pub fn to_html(&self) -> String {
        match self {
            NowPlaying::Nothing => {
                format!("<p>{} Listening to <i>nothing rn...</i></p>", LASTFM_LOGO)
            }
            NowPlaying::Track(play) => format!(
                "<p>{} {} <a href='{}' target='_blank'><b>{}</b></a> by {}</p>",
                LASTFM_LOGO,
                lead_in(play.now_playing),
                escape(&play.url),
                escape(&play.track),
                escape(&play.artist)
            ),
        }
    }

    pub fn track(&self) -> Option<&TrackPlay> {
        match self {
            NowPlaying::Nothing => None,
            NowPlaying::Track(play) => Some(play),
        }
    }
}

fn lead_in(now_playing: bool) -> &'static str {
    if now_playing {
        "Listening to"
    } else {
        "Last listened to"
    }
}
