//! The vector store: named collections over one shared encoder.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use sommelier_embeddings::{load_encoder, Embedding, EmbeddingModel};
use sommelier_types::{Document, RebuildPolicy, VectorDbSettings};

use crate::collection::{Collection, CollectionStats, IndexedRecord, SearchHit};
use crate::error::VectorError;
use crate::flat::FlatIndex;
use crate::hnsw::{HnswConfig, HnswIndex};
use crate::index::{check_dimension, VectorIndex};

/// Where collection indexes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    /// Exact flat scan, nothing written to disk
    InMemory,
    /// HNSW with snapshots saved under this directory
    Directory(PathBuf),
}

impl StorageMode {
    /// `:memory:` selects [`StorageMode::InMemory`]; anything else is a directory.
    pub fn from_instance_mode(mode: &str) -> Self {
        if mode == ":memory:" {
            StorageMode::InMemory
        } else {
            StorageMode::Directory(sommelier_types::expand_home(mode))
        }
    }
}

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub storage: StorageMode,
    /// Document field that gets embedded
    pub text_source: String,
    pub batch_size: usize,
    pub rebuild_policy: RebuildPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage: StorageMode::InMemory,
            text_source: "notes".to_string(),
            batch_size: 32,
            rebuild_policy: RebuildPolicy::Recreate,
        }
    }
}

impl StoreConfig {
    pub fn from_settings(settings: &VectorDbSettings) -> Self {
        Self {
            storage: if settings.is_in_memory() {
                StorageMode::InMemory
            } else {
                StorageMode::from_instance_mode(&settings.instance_mode)
            },
            text_source: settings.text_source.clone(),
            batch_size: settings.batch_size.max(1),
            rebuild_policy: settings.rebuild_policy,
        }
    }

    pub fn with_text_source(mut self, field: impl Into<String>) -> Self {
        self.text_source = field.into();
        self
    }

    pub fn with_rebuild_policy(mut self, policy: RebuildPolicy) -> Self {
        self.rebuild_policy = policy;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// Owns every collection and is their only mutator.
pub struct VectorStore {
    encoder: Arc<dyn EmbeddingModel>,
    config: StoreConfig,
    collections: HashMap<String, Collection>,
}

impl VectorStore {
    pub fn new(encoder: Arc<dyn EmbeddingModel>, config: StoreConfig) -> Self {
        Self {
            encoder,
            config,
            collections: HashMap::new(),
        }
    }

    /// Load the configured encoder and build an empty store around it.
    pub fn from_settings(
        settings: &VectorDbSettings,
        cache_dir: Option<PathBuf>,
    ) -> Result<Self, VectorError> {
        let encoder = load_encoder(&settings.encoder_model, cache_dir)?;
        Ok(Self::new(encoder, StoreConfig::from_settings(settings)))
    }

    pub fn encoder(&self) -> &Arc<dyn EmbeddingModel> {
        &self.encoder
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    fn new_index(&self, name: &str, dimension: usize) -> Result<Box<dyn VectorIndex>, VectorError> {
        Ok(match &self.config.storage {
            StorageMode::InMemory => Box::new(FlatIndex::new(dimension)),
            StorageMode::Directory(dir) => {
                Box::new(HnswIndex::create(HnswConfig::new(dimension, dir, name))?)
            }
        })
    }

    /// Create `name` with cosine metric, applying the rebuild policy if it exists.
    pub fn create_collection(&mut self, name: &str, dimension: usize) -> Result<(), VectorError> {
        if self.collections.contains_key(name) {
            match self.config.rebuild_policy {
                RebuildPolicy::FailIfExists => {
                    return Err(VectorError::CollectionExists(name.to_string()));
                }
                RebuildPolicy::Recreate => {
                    info!(collection = name, "Recreating existing collection");
                }
            }
        }

        let index = self.new_index(name, dimension)?;
        self.collections
            .insert(name.to_string(), Collection::new(name, index));
        info!(collection = name, dimension, "Created collection");
        Ok(())
    }

    /// Insert or overwrite one record.
    pub fn upsert(
        &mut self,
        collection: &str,
        id: u64,
        vector: Embedding,
        payload: Document,
    ) -> Result<(), VectorError> {
        let col = self.collection_mut(collection)?;
        col.upsert(IndexedRecord {
            id,
            vector,
            payload,
        })
    }

    /// Embed and index `docs`, replacing the collection's contents.
    ///
    /// Documents without a value in the text source field are skipped. Ids are
    /// positions in the filtered sequence. Every embedding is computed and
    /// checked before the collection is touched, so a failed build leaves it as
    /// it was. Returns the number of points written.
    pub fn build_from_documents(
        &mut self,
        collection: &str,
        docs: &[Document],
    ) -> Result<usize, VectorError> {
        let dimension = self.collection(collection)?.dimension();
        let text_source = self.config.text_source.as_str();

        let kept: Vec<&Document> = docs.iter().filter(|d| d.has_value(text_source)).collect();
        if kept.len() < docs.len() {
            debug!(
                skipped = docs.len() - kept.len(),
                field = text_source,
                "Skipping documents without text"
            );
        }

        // staging
        let texts: Vec<String> = kept
            .iter()
            .filter_map(|d| d.text(text_source))
            .collect();
        let mut vectors: Vec<Embedding> = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_size) {
            let refs: Vec<&str> = chunk.iter().map(String::as_str).collect();
            let batch = self.encoder.embed_batch(&refs)?;
            for embedding in &batch {
                check_dimension(dimension, embedding)?;
            }
            vectors.extend(batch);
            debug!(encoded = vectors.len(), total = texts.len(), "Encoded batch");
        }

        let mut staged = Collection::new(collection, self.new_index(collection, dimension)?);
        for (position, (doc, vector)) in kept.into_iter().zip(vectors).enumerate() {
            staged.upsert(IndexedRecord {
                id: position as u64,
                vector,
                payload: doc.clone(),
            })?;
        }
        if let Err(e) = staged.save() {
            warn!(collection, error = %e, "Failed to save index snapshot");
        }

        // commit
        let count = staged.len();
        self.collections.insert(collection.to_string(), staged);
        info!(collection, points = count, "Build complete");
        Ok(count)
    }

    /// Create (per policy) and build in one go; zero resulting points is an error.
    pub fn build_collection(
        &mut self,
        collection: &str,
        docs: &[Document],
    ) -> Result<usize, VectorError> {
        self.create_collection(collection, self.encoder.dimension())?;
        let count = self.build_from_documents(collection, docs)?;
        if count == 0 {
            return Err(VectorError::EmptyBuild(collection.to_string()));
        }
        Ok(count)
    }

    /// Encode `query_text` and return the `k` most similar records.
    pub fn search(
        &self,
        collection: &str,
        query_text: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>, VectorError> {
        let col = self.collection(collection)?;
        let query = self.encoder.embed(query_text)?;
        let hits = col.search(&query, k)?;
        debug!(collection, k, found = hits.len(), "Search");
        Ok(hits)
    }

    pub fn stats(&self, collection: &str) -> Result<CollectionStats, VectorError> {
        Ok(self.collection(collection)?.stats())
    }

    /// Swap in a different encoder.
    ///
    /// The new encoder is loaded first; on failure nothing changes. On success
    /// every collection is dropped because its vectors came from the old model.
    pub fn rebuild_encoder(
        &mut self,
        model: &str,
        cache_dir: Option<PathBuf>,
    ) -> Result<(), VectorError> {
        let encoder = load_encoder(model, cache_dir)?;
        self.replace_encoder(encoder);
        Ok(())
    }

    /// Install an already-loaded encoder, dropping every collection.
    pub fn replace_encoder(&mut self, encoder: Arc<dyn EmbeddingModel>) {
        let dropped = self.collections.len();
        self.collections.clear();
        info!(model = %encoder.info().name, dropped, "Encoder replaced");
        self.encoder = encoder;
    }

    fn collection(&self, name: &str) -> Result<&Collection, VectorError> {
        self.collections
            .get(name)
            .ok_or_else(|| VectorError::CollectionNotFound(name.to_string()))
    }

    fn collection_mut(&mut self, name: &str) -> Result<&mut Collection, VectorError> {
        self.collections
            .get_mut(name)
            .ok_or_else(|| VectorError::CollectionNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sommelier_embeddings::HashEmbedder;

    fn store() -> VectorStore {
        VectorStore::new(Arc::new(HashEmbedder::new(64).unwrap()), StoreConfig::default())
    }

    #[test]
    fn test_missing_collection() {
        let mut s = store();
        assert!(matches!(
            s.search("nope", "x", 1),
            Err(VectorError::CollectionNotFound(_))
        ));
        assert!(matches!(s.stats("nope"), Err(VectorError::CollectionNotFound(_))));
        assert!(matches!(
            s.upsert("nope", 0, Embedding::new(vec![1.0; 64]), Document::new()),
            Err(VectorError::CollectionNotFound(_))
        ));
        assert!(matches!(
            s.build_from_documents("nope", &[]),
            Err(VectorError::CollectionNotFound(_))
        ));
    }

    #[test]
    fn test_upsert_dimension_mismatch() {
        let mut s = store();
        s.create_collection("c", 64).unwrap();
        let result = s.upsert("c", 0, Embedding::new(vec![1.0; 8]), Document::new());
        assert!(matches!(
            result,
            Err(VectorError::DimensionMismatch { expected: 64, actual: 8 })
        ));
    }

    #[test]
    fn test_build_skips_missing_text() {
        let mut s = store();
        s.create_collection("c", 64).unwrap();
        let docs = vec![
            Document::new().with("name", "a").with("notes", "dark fruit"),
            Document::new().with("name", "b"),
            Document::new().with("name", "c").with("notes", "   "),
            Document::new().with("name", "d").with("notes", "oak"),
        ];
        assert_eq!(s.build_from_documents("c", &docs).unwrap(), 2);
        // ids follow the filtered order
        let hits = s.search("c", "oak", 1).unwrap();
        assert_eq!(hits[0].id, 1);
        assert_eq!(hits[0].payload.text("name").as_deref(), Some("d"));
    }

    #[test]
    fn test_fail_if_exists_policy() {
        let mut s = VectorStore::new(
            Arc::new(HashEmbedder::new(16).unwrap()),
            StoreConfig::default().with_rebuild_policy(RebuildPolicy::FailIfExists),
        );
        s.create_collection("c", 16).unwrap();
        assert!(matches!(
            s.create_collection("c", 16),
            Err(VectorError::CollectionExists(name)) if name == "c"
        ));
    }

    #[test]
    fn test_recreate_clears_records() {
        let mut s = store();
        s.create_collection("c", 64).unwrap();
        s.build_from_documents("c", &[Document::new().with("notes", "oak")])
            .unwrap();
        s.create_collection("c", 64).unwrap();
        assert_eq!(s.stats("c").unwrap().points_count, 0);
    }

    #[test]
    fn test_build_collection_rejects_empty() {
        let mut s = store();
        let docs = vec![Document::new().with("name", "no notes")];
        assert!(matches!(
            s.build_collection("c", &docs),
            Err(VectorError::EmptyBuild(_))
        ));
    }

    #[test]
    fn test_rebuild_encoder_drops_collections() {
        let mut s = store();
        s.build_collection("c", &[Document::new().with("notes", "oak")])
            .unwrap();
        s.rebuild_encoder("hash:32", None).unwrap();
        assert_eq!(s.encoder().dimension(), 32);
        assert!(!s.has_collection("c"));
    }

    #[test]
    fn test_rebuild_encoder_failure_keeps_store() {
        let mut s = store();
        s.build_collection("c", &[Document::new().with("notes", "oak")])
            .unwrap();
        assert!(s.rebuild_encoder("hash:0", None).is_err());
        assert_eq!(s.encoder().dimension(), 64);
        assert_eq!(s.stats("c").unwrap().points_count, 1);
    }
}
