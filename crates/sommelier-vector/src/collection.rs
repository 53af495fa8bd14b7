//! A named collection: records plus the index that finds them.

use std::collections::BTreeMap;

use sommelier_embeddings::{cosine_similarity, Embedding};
use sommelier_types::Document;
use tracing::debug;

use crate::error::VectorError;
use crate::index::{check_dimension, VectorIndex};

/// One stored point.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRecord {
    pub id: u64,
    pub vector: Embedding,
    pub payload: Document,
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: u64,
    /// Cosine similarity to the query, higher is more relevant
    pub score: f32,
    pub payload: Document,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStats {
    pub name: String,
    pub points_count: usize,
    pub dimension: usize,
}

/// Collections up to this size are always ranked by a full exact scan.
pub const DEFAULT_EXACT_SCAN_LIMIT: usize = 10_000;

/// Records keyed by id, with a backend index for candidate generation.
pub struct Collection {
    name: String,
    dimension: usize,
    records: BTreeMap<u64, IndexedRecord>,
    index: Box<dyn VectorIndex>,
    exact_scan_limit: usize,
}

impl Collection {
    pub fn new(name: impl Into<String>, index: Box<dyn VectorIndex>) -> Self {
        Self {
            name: name.into(),
            dimension: index.dimension(),
            records: BTreeMap::new(),
            index,
            exact_scan_limit: DEFAULT_EXACT_SCAN_LIMIT,
        }
    }

    /// Largest collection ranked by a full scan instead of index candidates.
    pub fn with_exact_scan_limit(mut self, limit: usize) -> Self {
        self.exact_scan_limit = limit;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&IndexedRecord> {
        self.records.get(&id)
    }

    pub fn upsert(&mut self, record: IndexedRecord) -> Result<(), VectorError> {
        check_dimension(self.dimension, &record.vector)?;
        self.index.upsert(record.id, &record.vector)?;
        self.records.insert(record.id, record);
        Ok(())
    }

    /// Top `k` records by exact cosine similarity.
    ///
    /// Ordered by descending score, equal scores by ascending id. An exact
    /// backend answers directly. Otherwise small collections are scanned in
    /// full, and approximate candidates are only trusted when the k-th hit
    /// scores strictly above the weakest candidate, so a tie that may run
    /// past the pool falls back to a full scan.
    pub fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchHit>, VectorError> {
        check_dimension(self.dimension, query)?;
        if k == 0 || self.records.is_empty() {
            return Ok(Vec::new());
        }

        if self.index.is_exact() {
            let candidates = self.index.search(query, k)?;
            let ranked = self.rank(
                query,
                candidates.iter().filter_map(|c| self.records.get(&c.vector_id)),
                k,
            );
            return Ok(self.hits(ranked));
        }

        let pool = self.index.candidate_pool(k);
        if self.records.len() <= self.exact_scan_limit.max(pool) {
            return Ok(self.full_scan(query, k));
        }

        let candidates = self.index.search(query, pool)?;
        let mut ranked = self.rank(
            query,
            candidates.iter().filter_map(|c| self.records.get(&c.vector_id)),
            usize::MAX,
        );
        let trusted = match (ranked.get(k - 1), ranked.last()) {
            (Some(kth), Some(weakest)) => kth.0 > weakest.0,
            _ => false,
        };
        if !trusted {
            debug!(
                collection = %self.name,
                k,
                candidates = ranked.len(),
                "Candidate pool inconclusive, scanning all records"
            );
            return Ok(self.full_scan(query, k));
        }

        ranked.truncate(k);
        Ok(self.hits(ranked))
    }

    fn full_scan(&self, query: &Embedding, k: usize) -> Vec<SearchHit> {
        let ranked = self.rank(query, self.records.values(), k);
        self.hits(ranked)
    }

    /// `(score, id)` pairs, best first, at most `k`.
    fn rank<'a>(
        &self,
        query: &Embedding,
        records: impl Iterator<Item = &'a IndexedRecord>,
        k: usize,
    ) -> Vec<(f32, u64)> {
        let mut ranked: Vec<(f32, u64)> = records
            .map(|record| {
                (
                    cosine_similarity(&query.values, &record.vector.values),
                    record.id,
                )
            })
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        ranked.dedup_by_key(|r| r.1);
        ranked.truncate(k);
        ranked
    }

    fn hits(&self, ranked: Vec<(f32, u64)>) -> Vec<SearchHit> {
        ranked
            .into_iter()
            .filter_map(|(score, id)| {
                self.records.get(&id).map(|record| SearchHit {
                    id,
                    score,
                    payload: record.payload.clone(),
                })
            })
            .collect()
    }

    pub fn save(&self) -> Result<(), VectorError> {
        self.index.save()
    }

    pub fn stats(&self) -> CollectionStats {
        CollectionStats {
            name: self.name.clone(),
            points_count: self.records.len(),
            dimension: self.dimension,
        }
    }
}
