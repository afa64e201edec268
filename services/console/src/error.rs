//! Service-specific error types

use thiserror::Error;

/// Console startup and configuration errors.
///
/// Runtime errors from gateway calls carry their own types
/// (`gateway_client::Error`, `account_pool::Error`); this enum only covers
/// what can go wrong before the session is up.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    /// A config value is out of bounds. Raised locally, before any network
    /// call is made.
    #[error("invalid value for {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;
