//! Common error types for folio

use thiserror::Error;

/// Common result type for folio operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while assembling the bootstrap configuration
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = Error::Config("FOLIO_PORT is not a valid port: abc".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: FOLIO_PORT is not a valid port: abc"
        );
    }
}
