//! Error types shared across crates.

use thiserror::Error;

/// Configuration errors. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config source could not be read or deserialized
    #[error("Failed to load configuration: {0}")]
    Load(String),

    /// Configuration loaded but holds an unusable value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<::config::ConfigError> for ConfigError {
    fn from(err: ::config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}
