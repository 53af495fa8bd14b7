//! Chat error types.

use thiserror::Error;

use sommelier_vector::VectorError;

use crate::model::LlmError;
use crate::prompt::TemplateError;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Search failed: {0}")]
    Search(#[from] VectorError),

    #[error("Model error: {0}")]
    Model(#[from] LlmError),

    /// The call did not finish within its configured budget
    #[error("{operation} timed out after {after_ms} ms")]
    Timeout {
        operation: &'static str,
        after_ms: u64,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
