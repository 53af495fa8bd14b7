//! End-to-end test infrastructure for sommelier.
//!
//! Provides a shared TestHarness that writes a dataset to a temp dir, builds
//! a store with the offline hashing encoder and wires chat sessions to a
//! scripted model.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sommelier_chat::{
    ChatSession, MockModel, PromptTemplate, Retriever, SessionConfig, StoreRetriever,
};
use sommelier_embeddings::HashEmbedder;
use sommelier_ingest::CsvLoader;
use sommelier_types::Document;
use sommelier_vector::{SearchHit, StoreConfig, VectorError, VectorStore};

/// Collection name used throughout the suite.
pub const COLLECTION: &str = "top_wines";

/// Two-wine dataset for the Saint Emilion scenario.
pub const CHATEAU_CSV: &str = "\
name,region,variety,rating,notes
Chateau A,Saint Emilion,Red Wine,97,\"bold tannins, dark fruit\"
Chateau B,Napa,Red Wine,93,\"bright cherry, light oak\"
";

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    pub data_path: PathBuf,
}

impl TestHarness {
    /// Create a harness whose dataset file holds `csv`.
    pub fn with_csv(csv: &str) -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let data_path = temp_dir.path().join("wines.csv");
        std::fs::write(&data_path, csv).expect("Failed to write dataset");
        Self {
            _temp_dir: temp_dir,
            data_path,
        }
    }

    pub fn documents(&self) -> Vec<Document> {
        CsvLoader::new()
            .load_path(&self.data_path)
            .expect("Failed to load dataset")
    }

    /// In-memory store over the dataset, hashing encoder of dimension 384.
    pub fn store(&self) -> VectorStore {
        let mut store = VectorStore::new(
            Arc::new(HashEmbedder::new(384).expect("hash encoder")),
            StoreConfig::default(),
        );
        store
            .build_collection(COLLECTION, &self.documents())
            .expect("Failed to build collection");
        store
    }

    /// Session over the built store, counting retrievals.
    pub fn session(&self, model: Arc<MockModel>) -> (ChatSession, Arc<CountingRetriever>) {
        let inner = StoreRetriever::new(Arc::new(self.store()), COLLECTION);
        let retriever = Arc::new(CountingRetriever::new(inner));
        let session = session_with(retriever.clone(), model, SessionConfig::default());
        (session, retriever)
    }
}

pub fn session_with(
    retriever: Arc<dyn Retriever>,
    model: Arc<MockModel>,
    config: SessionConfig,
) -> ChatSession {
    let template =
        PromptTemplate::for_theme("You are a {theme} expert.", &config.theme).expect("template");
    ChatSession::new(retriever, model, template, config)
}

/// Wraps a retriever and counts calls.
pub struct CountingRetriever {
    inner: Box<dyn Retriever>,
    calls: AtomicUsize,
}

impl CountingRetriever {
    pub fn new(inner: impl Retriever + 'static) -> Self {
        Self {
            inner: Box::new(inner),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Retriever for CountingRetriever {
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, VectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.retrieve(query, k)
    }
}

/// Always fails with `CollectionNotFound`.
pub struct FailingRetriever;

impl Retriever for FailingRetriever {
    fn retrieve(&self, _query: &str, _k: usize) -> Result<Vec<SearchHit>, VectorError> {
        Err(VectorError::CollectionNotFound("gone".to_string()))
    }
}

/// Sleeps before answering with no hits.
pub struct SlowRetriever(pub Duration);

impl Retriever for SlowRetriever {
    fn retrieve(&self, _query: &str, _k: usize) -> Result<Vec<SearchHit>, VectorError> {
        std::thread::sleep(self.0);
        Ok(Vec::new())
    }
}

/// Dataset of `rows` wines where every row whose 1-based index is a multiple
/// of `empty_every` has no variety.
pub fn wine_csv(rows: usize, empty_every: usize) -> String {
    let mut csv = String::from("name,region,variety,notes\n");
    for i in 0..rows {
        let variety = if (i + 1) % empty_every == 0 { "" } else { "Red Wine" };
        csv.push_str(&format!(
            "Wine {i},Region {i},{variety},\"note {i}, cedar and plum\"\n"
        ));
    }
    csv
}
