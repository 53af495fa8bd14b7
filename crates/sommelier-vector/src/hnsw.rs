//! HNSW index implementation using usearch.
//!
//! Parameters tuned for quality over speed:
//! - M = 16 (connections per layer)
//! - ef_construction = 200 (build-time quality)
//! - ef_search = 100 (search-time quality)

use std::path::PathBuf;

use sommelier_embeddings::Embedding;
use tracing::{debug, info};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::error::VectorError;
use crate::index::{check_dimension, SearchResult, VectorIndex};

/// Minimum number of candidates fetched per query.
pub const MIN_CANDIDATES: usize = 32;

/// HNSW index configuration
#[derive(Debug, Clone)]
pub struct HnswConfig {
    /// Embedding dimension (must match model)
    pub dimension: usize,
    /// Number of connections per layer (M parameter)
    pub connectivity: usize,
    /// Build-time search depth (ef_construction)
    pub expansion_add: usize,
    /// Query-time search depth (ef_search)
    pub expansion_search: usize,
    /// Snapshot file written by `save`
    pub index_file: PathBuf,
    /// Initial reservation, grown on demand
    pub capacity: usize,
}

impl HnswConfig {
    /// Config for collection `name` with snapshots under `dir`.
    pub fn new(dimension: usize, dir: impl Into<PathBuf>, name: &str) -> Self {
        Self {
            dimension,
            connectivity: 16,
            expansion_add: 200,
            expansion_search: 100,
            index_file: dir.into().join(format!("{}.usearch", name)),
            capacity: 1024,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    fn options(&self) -> IndexOptions {
        IndexOptions {
            dimensions: self.dimension,
            metric: MetricKind::Cos,
            quantization: ScalarKind::F32,
            connectivity: self.connectivity,
            expansion_add: self.expansion_add,
            expansion_search: self.expansion_search,
            multi: false,
        }
    }
}

/// HNSW index wrapper around usearch.
///
/// Always starts empty; snapshots are written but never reloaded.
pub struct HnswIndex {
    index: Index,
    config: HnswConfig,
}

impl HnswIndex {
    pub fn create(config: HnswConfig) -> Result<Self, VectorError> {
        info!(path = ?config.index_file, dim = config.dimension, "Creating vector index");
        let index = Index::new(&config.options()).map_err(|e| VectorError::Index(e.to_string()))?;
        index
            .reserve(config.capacity)
            .map_err(|e| VectorError::Index(e.to_string()))?;
        Ok(Self { index, config })
    }

    /// Get the index file path
    pub fn index_file(&self) -> &PathBuf {
        &self.config.index_file
    }

    fn ensure_capacity(&self) -> Result<(), VectorError> {
        let capacity = self.index.capacity();
        if self.index.size() >= capacity {
            self.index
                .reserve((capacity * 2).max(self.config.capacity))
                .map_err(|e| VectorError::Index(e.to_string()))?;
        }
        Ok(())
    }
}

impl VectorIndex for HnswIndex {
    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn len(&self) -> usize {
        self.index.size()
    }

    fn upsert(&mut self, id: u64, embedding: &Embedding) -> Result<(), VectorError> {
        check_dimension(self.config.dimension, embedding)?;

        if self.index.contains(id) {
            self.index
                .remove(id)
                .map_err(|e| VectorError::Index(e.to_string()))?;
        }
        self.ensure_capacity()?;
        self.index
            .add(id, &embedding.values)
            .map_err(|e| VectorError::Index(e.to_string()))?;

        debug!(id, "Added vector");
        Ok(())
    }

    fn candidate_pool(&self, k: usize) -> usize {
        k.saturating_mul(4).max(MIN_CANDIDATES)
    }

    fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchResult>, VectorError> {
        check_dimension(self.config.dimension, query)?;
        if self.index.size() == 0 || k == 0 {
            return Ok(Vec::new());
        }

        let matches = self
            .index
            .search(&query.values, k)
            .map_err(|e| VectorError::Index(e.to_string()))?;

        let results: Vec<SearchResult> = matches
            .keys
            .iter()
            .zip(matches.distances.iter())
            .map(|(&id, &dist)| SearchResult::new(id, 1.0 - dist))
            .collect();

        debug!(k, found = results.len(), "Search complete");
        Ok(results)
    }

    fn contains(&self, id: u64) -> bool {
        self.index.contains(id)
    }

    fn save(&self) -> Result<(), VectorError> {
        if let Some(parent) = self.config.index_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let path_str = self
            .config
            .index_file
            .to_str()
            .ok_or_else(|| VectorError::Index("Invalid path encoding".to_string()))?;
        self.index
            .save(path_str)
            .map_err(|e| VectorError::Index(format!("Failed to save: {}", e)))?;

        info!(path = ?self.config.index_file, vectors = self.index.size(), "Saved vector index");
        Ok(())
    }
}
