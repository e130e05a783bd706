//! # folio common library
//!
//! Shared code for the folio web service:
//! - Error type and result alias
//! - Configuration loading (TOML file, environment overrides, defaults)
//! - Server-Sent Events response helper

pub mod config;
pub mod error;
pub mod sse;

pub use config::TomlConfig;
pub use error::{Error, Result};
