//! folio-web library - personal site backend
//!
//! Routes: live Last.fm now-playing (SSE + snapshot), Spotify status badges,
//! code viewer, gallery and weblog listings, GitHub redeploy webhook,
//! static assets.

use axum::Router;
use folio_common::config::{DeployConfig, FilesConfig};
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod html;
pub mod logging;
pub mod markdown;
pub mod nowplaying;
pub mod spotify;

use nowplaying::NowPlayingNotifier;
use spotify::SpotifyStatusClient;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Process-wide now-playing notifier
    pub now_playing: Arc<NowPlayingNotifier>,
    /// Spotify status API client for the badge routes
    pub spotify: SpotifyStatusClient,
    pub files: Arc<FilesConfig>,
    pub deploy: Arc<DeployConfig>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        now_playing: Arc<NowPlayingNotifier>,
        spotify: SpotifyStatusClient,
        files: FilesConfig,
        deploy: DeployConfig,
    ) -> Self {
        Self {
            now_playing,
            spotify,
            files: Arc::new(files),
            deploy: Arc::new(deploy),
        }
    }
}

/// Build application router
///
/// The redeploy webhook only exists when a webhook secret is configured.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let static_dir = state.files.static_dir.clone();

    let mut router = Router::new()
        // Now playing
        .route("/api/lastfm-html", get(api::lastfm_events))
        .route("/api/now-playing", get(api::now_playing_snapshot))
        .route("/api/buildinfo", get(api::get_build_info))
        // Spotify badges
        .route("/obsession/:user_id/image", get(api::obsession_badge))
        .route("/obsession/:user_id/redirect", get(api::obsession_redirect))
        .route("/listening/:user_id/image", get(api::listening_badge))
        .route("/listening/:user_id/redirect", get(api::listening_redirect))
        // Code viewer
        .route("/code/:filename", get(api::view_code))
        // Gallery and weblog
        .route("/gallery", get(api::gallery_index))
        .route("/gallery/:folder", get(api::gallery_folder))
        .route("/weblog", get(api::weblog_index))
        .route("/weblog/:year", get(api::weblog_year))
        .route("/weblog/:year/:post", get(api::weblog_post))
        // Site
        .route("/favicon.ico", get(api::favicon))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir))
        .merge(api::health_routes());

    if state.deploy.secret().is_some() {
        router = router.route("/private/reboot", post(api::github_webhook));
    }

    router
        .fallback(api::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
