//! Tracing setup
//!
//! The subscriber is installed before anything else runs so config loading
//! can log. Its filter starts as `RUST_LOG` (or `info`) and is swapped for
//! `[logging] level` once the configuration is known, unless `RUST_LOG`
//! was given.

use tracing_subscriber::{prelude::*, reload, EnvFilter, Registry};

/// Handle for replacing the provisional filter
pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

const BOOTSTRAP_LEVEL: &str = "info";

/// Install the global subscriber with the provisional filter
pub fn init() -> FilterHandle {
    let initial =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(BOOTSTRAP_LEVEL));
    let (filter, handle) = reload::Layer::new(initial);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
    handle
}

/// Filter for the configured level, or `None` to keep the current one
///
/// A non-blank `RUST_LOG` always wins over the config file.
pub fn configured_filter(rust_log: Option<&str>, level: &str) -> Option<EnvFilter> {
    if rust_log.is_some_and(|v| !v.trim().is_empty()) {
        return None;
    }
    let level = level.trim();
    if level.is_empty() {
        return None;
    }
    match EnvFilter::try_new(level) {
        Ok(filter) => Some(filter),
        Err(e) => {
            tracing::warn!("Ignoring invalid logging level '{}': {}", level, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_level_applies_without_rust_log() {
        let filter = configured_filter(None, "warn").expect("filter");
        assert_eq!(filter.to_string(), "warn");

        let filter = configured_filter(Some("  "), "debug").expect("filter");
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn test_rust_log_wins_over_config() {
        assert!(configured_filter(Some("trace"), "warn").is_none());
    }

    #[test]
    fn test_blank_level_keeps_current_filter() {
        assert!(configured_filter(None, "   ").is_none());
    }
}
