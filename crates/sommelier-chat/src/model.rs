//! Language model interface.

use async_trait::async_trait;
use thiserror::Error;

/// Error type for language model calls.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    Api(String),

    #[error("Failed to parse API response: {0}")]
    Parse(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Timeout waiting for response")]
    Timeout,
}

/// Pluggable text generator.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Produce an answer for a fully assembled prompt.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}
