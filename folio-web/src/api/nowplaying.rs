//! Now-playing endpoints
//!
//! The homepage opens `GET /api/lastfm-html` and swaps in each
//! `lastfm-html` event's HTML fragment. Clients without streaming support
//! read `GET /api/now-playing` instead.

use axum::{
    extract::State,
    response::{sse::Event, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, info};

use crate::nowplaying::{NowPlaying, TrackPlay};
use crate::AppState;

/// SSE event name the homepage listens for
pub const LASTFM_EVENT: &str = "lastfm-html";

/// GET /api/lastfm-html - SSE stream of now-playing HTML fragments
///
/// The first event is the current value. If nobody was subscribed a moment
/// ago the poller has been idle, so an immediate refresh is kicked off to
/// replace a possibly stale value without waiting for the next poll cycle.
pub async fn lastfm_events(State(state): State<AppState>) -> Response {
    let notifier = Arc::clone(&state.now_playing);

    if !notifier.is_live() {
        debug!("Last.fm not configured, serving placeholder");
        return folio_common::sse::single_event(LASTFM_EVENT, NowPlaying::Nothing.to_html())
            .into_response();
    }

    let was_idle = notifier.subscriber_count() == 0;
    let mut subscription = notifier.subscribe();
    info!(
        "New now-playing viewer {:?} ({} active)",
        subscription.id(),
        notifier.subscriber_count()
    );

    if was_idle {
        let notifier = Arc::clone(&notifier);
        tokio::spawn(async move {
            notifier.refresh().await;
        });
    }

    // Dropping the stream (client gone) drops the subscription with it
    let stream = async_stream::stream! {
        while let Some(value) = subscription.next().await {
            yield Ok::<Event, Infallible>(
                Event::default().event(LASTFM_EVENT).data(value.to_html())
            );
        }
        debug!("Now-playing stream for {:?} ended", subscription.id());
    };

    folio_common::sse::with_heartbeat(stream).into_response()
}

/// Now-playing snapshot response
#[derive(Debug, Serialize)]
pub struct NowPlayingResponse {
    pub text: String,
    pub html: String,
    pub now_playing: bool,
    pub track: Option<TrackPlay>,
}

impl From<NowPlaying> for NowPlayingResponse {
    fn from(value: NowPlaying) -> Self {
        Self {
            text: value.text(),
            html: value.to_html(),
            now_playing: value.track().is_some_and(|t| t.now_playing),
            track: value.track().cloned(),
        }
    }
}

/// GET /api/now-playing - current value without streaming
pub async fn now_playing_snapshot(State(state): State<AppState>) -> Json<NowPlayingResponse> {
    Json(state.now_playing.snapshot().into())
}
