//! folio-web - personal site backend
//!
//! Serves the live Last.fm now-playing feed, Spotify status badges, the code
//! viewer, the GitHub redeploy webhook and static assets.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use folio_common::config::TomlConfig;
use folio_web::nowplaying::{LastFmClient, NowPlayingNotifier, RecentTracksSource, UnconfiguredSource};
use folio_web::spotify::SpotifyStatusClient;
use folio_web::{build_router, logging, AppState};
use tokio::signal;
use tracing::info;

/// Command-line arguments for folio-web
#[derive(Parser, Debug)]
#[command(name = "folio-web")]
#[command(about = "Personal site backend")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config and FOLIO_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (overrides config)
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = logging::init();

    // Build identification first, before anything that can stall
    info!(
        "Starting folio-web v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let (mut config, source) =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    config
        .apply_env_overrides()
        .context("Invalid environment override")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }

    let rust_log = std::env::var("RUST_LOG").ok();
    if let Some(filter) = logging::configured_filter(rust_log.as_deref(), &config.logging.level) {
        log_filter
            .reload(filter)
            .context("Failed to apply configured log level")?;
    }
    config.log_summary(&source);

    let recent_tracks: Arc<dyn RecentTracksSource> = match config.lastfm.credentials() {
        Some((username, api_key)) => Arc::new(
            LastFmClient::new(
                config.lastfm.api_url.as_str(),
                username,
                api_key,
                Duration::from_millis(config.lastfm.request_timeout_ms),
            )
            .context("Failed to build Last.fm HTTP client")?,
        ),
        None => Arc::new(UnconfiguredSource),
    };
    let notifier = Arc::new(NowPlayingNotifier::new(recent_tracks));
    let poller = notifier
        .is_live()
        .then(|| notifier.spawn_poller(Duration::from_millis(config.lastfm.poll_interval_ms)));

    let spotify = SpotifyStatusClient::new(
        config.spotify.base_url.as_str(),
        Duration::from_millis(config.spotify.request_timeout_ms),
    )
    .context("Failed to build Spotify status HTTP client")?;

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind_address, config.port))?;

    let state = AppState::new(
        Arc::clone(&notifier),
        spotify,
        config.files,
        config.deploy,
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("folio-web listening on http://{}", addr);

    // SSE streams never end on their own: close them as soon as the signal
    // arrives or graceful shutdown would wait forever.
    let shutdown_notifier = Arc::clone(&notifier);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_notifier.shutdown();
        })
        .await
        .context("Server error")?;

    if let Some(poller) = poller {
        poller.abort();
    }
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
