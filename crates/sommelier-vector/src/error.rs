//! Vector store error types.

use thiserror::Error;

/// Errors that can occur during vector operations.
#[derive(Debug, Error)]
pub enum VectorError {
    /// Search, upsert, build or stats against a collection that was never created
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Creation refused under `RebuildPolicy::FailIfExists`
    #[error("Collection already exists: {0}")]
    CollectionExists(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// No document survived filtering
    #[error("Build of collection '{0}' produced no points")]
    EmptyBuild(String),

    /// usearch index error
    #[error("Index error: {0}")]
    Index(String),

    /// Embedding error
    #[error("Embedding error: {0}")]
    Embedding(#[from] sommelier_embeddings::EmbeddingError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
