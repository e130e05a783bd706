//! HTTP API handlers for folio-web

pub mod badges;
pub mod buildinfo;
pub mod code;
pub mod error;
pub mod gallery;
pub mod health;
pub mod nowplaying;
pub mod site;
pub mod webhook;
pub mod weblog;

pub use badges::{listening_badge, listening_redirect, obsession_badge, obsession_redirect};
pub use buildinfo::get_build_info;
pub use code::view_code;
pub use error::ApiError;
pub use gallery::{gallery_folder, gallery_index};
pub use health::health_routes;
pub use nowplaying::{lastfm_events, now_playing_snapshot};
pub use site::{favicon, not_found};
pub use webhook::github_webhook;
pub use weblog::{weblog_index, weblog_post, weblog_year};

/// Run filesystem work off the async runtime
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("Blocking task failed: {}", e)))?
}
