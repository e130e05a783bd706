//! Configuration loading
//!
//! Bootstrap configuration comes from a TOML file, then environment
//! variables, then command-line flags (applied by the binary). Resolution
//! order for the file itself:
//! 1. Explicit path (command-line `--config`)
//! 2. `FOLIO_CONFIG` environment variable
//! 3. User config file, then system config file
//! 4. Built-in defaults (no file at all)
//!
//! A missing file at an explicitly requested path is an error; a missing
//! file at a default location is not.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "FOLIO_CONFIG";

/// Last.fm API endpoint used when none is configured
pub const DEFAULT_LASTFM_API_URL: &str = "http://ws.audioscrobbler.com/2.0/";

/// Bootstrap configuration loaded from TOML
///
/// Every field has a built-in default so an empty file (or no file) is a
/// valid configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Interface the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub lastfm: LastFmConfig,

    #[serde(default)]
    pub spotify: SpotifyConfig,

    #[serde(default)]
    pub files: FilesConfig,

    #[serde(default)]
    pub deploy: DeployConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Last.fm "now playing" source
#[derive(Debug, Clone, Deserialize)]
pub struct LastFmConfig {
    /// Account whose recent tracks are shown
    #[serde(default)]
    pub username: Option<String>,

    /// API key; without it the now-playing feature serves a placeholder
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_lastfm_api_url")]
    pub api_url: String,

    /// Poll cadence while at least one viewer is connected
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Bot-owned Spotify status API used by the badge routes
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default = "default_spotify_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Filesystem locations served by the site
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Directory whose direct children the code viewer may show
    #[serde(default = "default_code_root")]
    pub code_root: PathBuf,

    /// Static assets, served under `/static`
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// One sub-directory per gallery, each holding images and a README.md
    #[serde(default = "default_gallery_dir")]
    pub gallery_dir: PathBuf,

    /// Weblog posts laid out as `{YYYY}/{MM}-{DD}-{title}.md`
    #[serde(default = "default_weblog_dir")]
    pub weblog_dir: PathBuf,
}

/// GitHub push webhook and redeploy command
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeployConfig {
    /// Webhook secret; the webhook route only exists when this is set
    #[serde(default)]
    pub github_secret: Option<String>,

    /// Shell command run after a verified push
    #[serde(default)]
    pub command: Option<String>,

    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// What a verified webhook delivery does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookMode {
    /// No secret: the route is not mounted
    Disabled,
    /// Secret but no command: deliveries are verified and acknowledged only
    VerifyOnly,
    /// Secret and command: verified deliveries start the command
    Redeploy,
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine(PathBuf),
    Environment(PathBuf),
    File(PathBuf),
    Defaults,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_lastfm_api_url() -> String {
    DEFAULT_LASTFM_API_URL.to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_spotify_base_url() -> String {
    "http://localhost:8716".to_string()
}

fn default_code_root() -> PathBuf {
    PathBuf::from("/www/files")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_gallery_dir() -> PathBuf {
    PathBuf::from("/www/files/gallery")
}

fn default_weblog_dir() -> PathBuf {
    PathBuf::from("weblog")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            lastfm: LastFmConfig::default(),
            spotify: SpotifyConfig::default(),
            files: FilesConfig::default(),
            deploy: DeployConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LastFmConfig {
    fn default() -> Self {
        Self {
            username: None,
            api_key: None,
            api_url: default_lastfm_api_url(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            base_url: default_spotify_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            code_root: default_code_root(),
            static_dir: default_static_dir(),
            gallery_dir: default_gallery_dir(),
            weblog_dir: default_weblog_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LastFmConfig {
    /// Username and API key, if both are present and non-blank
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((non_blank(&self.username)?, non_blank(&self.api_key)?))
    }
}

impl DeployConfig {
    /// Webhook secret, if present and non-blank
    pub fn secret(&self) -> Option<&str> {
        non_blank(&self.github_secret)
    }

    /// Redeploy command, if present and non-blank
    pub fn redeploy_command(&self) -> Option<&str> {
        non_blank(&self.command)
    }

    pub fn webhook_mode(&self) -> WebhookMode {
        match (self.secret(), self.redeploy_command()) {
            (None, _) => WebhookMode::Disabled,
            (Some(_), None) => WebhookMode::VerifyOnly,
            (Some(_), Some(_)) => WebhookMode::Redeploy,
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Read and parse a configuration file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve and load the configuration file
    ///
    /// Environment overrides are NOT applied here; call
    /// [`TomlConfig::apply_env_overrides`] afterwards.
    pub fn load(cli_path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_path {
            let config = Self::load_from(path)?;
            return Ok((config, ConfigSource::CommandLine(path.to_path_buf())));
        }

        // Priority 2: Environment variable
        if let Some(path) = env_non_blank(CONFIG_ENV_VAR) {
            let path = PathBuf::from(path);
            let config = Self::load_from(&path)?;
            return Ok((config, ConfigSource::Environment(path)));
        }

        // Priority 3: Platform config locations
        for path in default_config_locations() {
            if path.is_file() {
                debug!("Using config file {}", path.display());
                let config = Self::load_from(&path)?;
                return Ok((config, ConfigSource::File(path)));
            }
        }

        // Priority 4: Built-in defaults
        warn!("No config file found, using built-in defaults");
        Ok((Self::default(), ConfigSource::Defaults))
    }

    /// Apply environment variable overrides
    ///
    /// `LASTFM_USERNAME`, `LASTFM_API_KEY`, `GITHUB_SECRET` and `FOLIO_PORT`
    /// replace the file values when set to a non-blank value.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(username) = env_non_blank("LASTFM_USERNAME") {
            self.lastfm.username = Some(username);
        }
        if let Some(api_key) = env_non_blank("LASTFM_API_KEY") {
            self.lastfm.api_key = Some(api_key);
        }
        if let Some(secret) = env_non_blank("GITHUB_SECRET") {
            self.deploy.github_secret = Some(secret);
        }
        if let Some(port) = env_non_blank("FOLIO_PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("FOLIO_PORT is not a valid port: {}", port)))?;
        }
        Ok(())
    }

    /// Log the effective configuration without secrets
    pub fn log_summary(&self, source: &ConfigSource) {
        match source {
            ConfigSource::CommandLine(p) | ConfigSource::Environment(p) | ConfigSource::File(p) => {
                info!("Configuration loaded from {}", p.display())
            }
            ConfigSource::Defaults => info!("Configuration: built-in defaults"),
        }
        match self.lastfm.credentials() {
            Some((user, _)) => info!(
                "Last.fm now-playing enabled for '{}' (poll every {} ms)",
                user, self.lastfm.poll_interval_ms
            ),
            None => info!("Last.fm now-playing disabled (no username/API key)"),
        }
        match self.deploy.webhook_mode() {
            WebhookMode::Disabled => debug!("GitHub webhook disabled (no secret)"),
            WebhookMode::VerifyOnly => warn!(
                "GitHub webhook mounted without a [deploy] command: verified pushes will not redeploy"
            ),
            WebhookMode::Redeploy => info!("GitHub redeploy webhook enabled"),
        }
        info!("Code viewer root: {}", self.files.code_root.display());
        info!("Static assets: {}", self.files.static_dir.display());
        info!("Galleries: {}", self.files.gallery_dir.display());
        info!("Weblog: {}", self.files.weblog_dir.display());
    }
}

/// Candidate config file paths in priority order
fn default_config_locations() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("folio").join("config.toml"));
    }
    if cfg!(unix) {
        paths.push(PathBuf::from("/etc/folio/config.toml"));
    }
    paths
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn env_non_blank(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.port, 8000);
        assert_eq!(config.lastfm.poll_interval_ms, 2000);
        assert_eq!(config.lastfm.api_url, DEFAULT_LASTFM_API_URL);
        assert_eq!(config.spotify.base_url, "http://localhost:8716");
        assert_eq!(config.files.code_root, PathBuf::from("/www/files"));
        assert_eq!(config.files.gallery_dir, PathBuf::from("/www/files/gallery"));
        assert_eq!(config.files.weblog_dir, PathBuf::from("weblog"));
        assert_eq!(config.logging.level, "info");
        assert!(config.lastfm.credentials().is_none());
        assert!(config.deploy.secret().is_none());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
            [lastfm]
            username = "someone"
            api_key = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.lastfm.credentials(), Some(("someone", "abc")));
        assert_eq!(config.lastfm.request_timeout_ms, 10_000);
    }

    #[test]
    fn test_blank_credentials_count_as_unset() {
        let config = TomlConfig::from_toml_str(
            r#"
            [lastfm]
            username = "someone"
            api_key = "   "

            [deploy]
            github_secret = ""
            command = ""
            "#,
        )
        .unwrap();

        assert!(config.lastfm.credentials().is_none());
        assert!(config.deploy.secret().is_none());
        assert!(config.deploy.redeploy_command().is_none());
    }

    #[test]
    fn test_webhook_mode() {
        let mut deploy = DeployConfig::default();
        assert_eq!(deploy.webhook_mode(), WebhookMode::Disabled);

        deploy.command = Some("systemctl restart folio".to_string());
        assert_eq!(deploy.webhook_mode(), WebhookMode::Disabled);

        deploy.github_secret = Some("s3cret".to_string());
        assert_eq!(deploy.webhook_mode(), WebhookMode::Redeploy);

        deploy.command = Some("  ".to_string());
        assert_eq!(deploy.webhook_mode(), WebhookMode::VerifyOnly);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("port = \"not a number\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
