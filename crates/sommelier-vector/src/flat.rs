//! Exact brute-force index used for `:memory:` stores.

use std::collections::BTreeMap;

use sommelier_embeddings::{cosine_similarity, Embedding};

use crate::error::VectorError;
use crate::index::{check_dimension, SearchResult, VectorIndex};

/// Scans every stored vector on each query.
pub struct FlatIndex {
    dimension: usize,
    vectors: BTreeMap<u64, Vec<f32>>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: BTreeMap::new(),
        }
    }
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn upsert(&mut self, id: u64, embedding: &Embedding) -> Result<(), VectorError> {
        check_dimension(self.dimension, embedding)?;
        self.vectors.insert(id, embedding.values.clone());
        Ok(())
    }

    fn is_exact(&self) -> bool {
        true
    }

    fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchResult>, VectorError> {
        check_dimension(self.dimension, query)?;

        let mut results: Vec<SearchResult> = self
            .vectors
            .iter()
            .map(|(&id, values)| SearchResult::new(id, cosine_similarity(&query.values, values)))
            .collect();
        // BTreeMap iteration is id-ascending and the sort is stable
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(k);
        Ok(results)
    }

    fn contains(&self, id: u64) -> bool {
        self.vectors.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_order_with_ties() {
        let mut index = FlatIndex::new(2);
        index.upsert(3, &Embedding::new(vec![1.0, 0.0])).unwrap();
        index.upsert(1, &Embedding::new(vec![0.0, 1.0])).unwrap();
        index.upsert(2, &Embedding::new(vec![1.0, 0.0])).unwrap();

        let results = index.search(&Embedding::new(vec![1.0, 0.0]), 3).unwrap();
        let ids: Vec<u64> = results.iter().map(|r| r.vector_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_upsert_overwrites() {
        let mut index = FlatIndex::new(2);
        index.upsert(0, &Embedding::new(vec![1.0, 0.0])).unwrap();
        index.upsert(0, &Embedding::new(vec![0.0, 1.0])).unwrap();
        assert_eq!(index.len(), 1);
        let results = index.search(&Embedding::new(vec![0.0, 1.0]), 1).unwrap();
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = FlatIndex::new(3);
        let result = index.upsert(0, &Embedding::new(vec![1.0, 0.0]));
        assert!(matches!(
            result,
            Err(VectorError::DimensionMismatch { expected: 3, actual: 2 })
        ));
    }
}
