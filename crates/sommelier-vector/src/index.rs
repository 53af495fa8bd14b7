//! Vector index trait and types.
//!
//! An index only generates candidates. Final scores and ordering are decided
//! by [`crate::Collection`], which re-scores every candidate exactly.

use sommelier_embeddings::Embedding;

use crate::error::VectorError;

/// Result of a vector search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Record ID
    pub vector_id: u64,
    /// Cosine similarity, higher is more similar
    pub score: f32,
}

impl SearchResult {
    pub fn new(vector_id: u64, score: f32) -> Self {
        Self { vector_id, score }
    }
}

/// Trait for vector index backends.
///
/// Implementations must be thread-safe for concurrent read access.
pub trait VectorIndex: Send + Sync {
    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the number of vectors in the index
    fn len(&self) -> usize;

    /// Check if the index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a vector, replacing any vector already stored under `id`.
    fn upsert(&mut self, id: u64, embedding: &Embedding) -> Result<(), VectorError>;

    /// True when `search` returns the exact top `k`, ties by ascending id.
    fn is_exact(&self) -> bool {
        false
    }

    /// How many candidates to request so that the best `k` are among them.
    fn candidate_pool(&self, k: usize) -> usize {
        k
    }

    /// Search for up to `k` nearest neighbors, best first.
    fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchResult>, VectorError>;

    /// Check if a vector ID exists
    fn contains(&self, id: u64) -> bool;

    /// Persist a snapshot if the backend has a location on disk.
    fn save(&self) -> Result<(), VectorError> {
        Ok(())
    }
}

pub(crate) fn check_dimension(expected: usize, embedding: &Embedding) -> Result<(), VectorError> {
    if embedding.dimension() != expected {
        return Err(VectorError::DimensionMismatch {
            expected,
            actual: embedding.dimension(),
        });
    }
    Ok(())
}
