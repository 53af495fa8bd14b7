use std::sync::Arc;

use tempfile::TempDir;

use sommelier_embeddings::{Embedding, EmbeddingError, EmbeddingModel, HashEmbedder, ModelInfo};
use sommelier_types::Document;
use sommelier_vector::{StorageMode, StoreConfig, VectorError, VectorStore};

fn wine(name: &str, region: &str, notes: &str) -> Document {
    Document::new()
        .with("name", name)
        .with("region", region)
        .with("notes", notes)
}

fn cellar() -> Vec<Document> {
    vec![
        wine("Deep One", "Rioja", "deep red, blackberry, oak"),
        wine("Chateau B", "Napa", "bright cherry, light oak"),
        wine("Chateau A", "Saint Emilion", "bold tannins, dark fruit"),
        wine("Citrus", "Mosel", "crisp citrus, green apple"),
    ]
}

fn hash_store(dim: usize) -> VectorStore {
    VectorStore::new(Arc::new(HashEmbedder::new(dim).unwrap()), StoreConfig::default())
}

#[test]
fn exact_text_is_top_hit() {
    let mut store = hash_store(384);
    store.build_collection("wines", &cellar()).unwrap();

    let hits = store.search("wines", "deep red, blackberry, oak", 1).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].payload.text("name").as_deref(), Some("Deep One"));
    assert!((hits[0].score - 1.0).abs() < 1e-5);

    let all = store.search("wines", "deep red, blackberry, oak", 4).unwrap();
    assert!(all.iter().all(|h| h.score <= hits[0].score));
}

#[test]
fn rebuilding_twice_keeps_point_count() {
    let mut store = hash_store(64);
    store.build_collection("wines", &cellar()).unwrap();
    let first = store.stats("wines").unwrap().points_count;

    store.build_collection("wines", &cellar()).unwrap();
    let second = store.stats("wines").unwrap().points_count;

    assert_eq!(first, 4);
    assert_eq!(first, second);
}

#[test]
fn ranking_is_non_increasing_with_id_tie_break() {
    let mut store = hash_store(64);
    // ids 0 and 2 share text, so they tie on every query
    let docs = vec![
        wine("x", "r", "smoky peat"),
        wine("y", "r", "honey and apricot"),
        wine("z", "r", "smoky peat"),
    ];
    store.build_collection("wines", &docs).unwrap();

    let hits = store.search("wines", "smoky peat", 3).unwrap();
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
        if pair[0].score == pair[1].score {
            assert!(pair[0].id < pair[1].id);
        }
    }
    assert_eq!(hits[0].id, 0);
    assert_eq!(hits[1].id, 2);
}

#[test]
fn scenario_saint_emilion_query() {
    let mut store = hash_store(384);
    let docs = vec![
        wine("Chateau A", "Saint Emilion", "bold tannins, dark fruit"),
        wine("Chateau B", "Napa", "bright cherry, light oak"),
    ];
    store.build_collection("wines", &docs).unwrap();

    let hits = store
        .search("wines", "Saint Emilion wine with bold tannins", 1)
        .unwrap();
    assert_eq!(hits[0].payload.text("name").as_deref(), Some("Chateau A"));
}

/// Fails on any text containing "corked".
struct FlakyEncoder {
    inner: HashEmbedder,
}

impl EmbeddingModel for FlakyEncoder {
    fn info(&self) -> &ModelInfo {
        self.inner.info()
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if text.contains("corked") {
            return Err(EmbeddingError::InvalidInput("corked".to_string()));
        }
        self.inner.embed(text)
    }
}

#[test]
fn failed_build_leaves_collection_untouched() {
    let encoder = Arc::new(FlakyEncoder {
        inner: HashEmbedder::new(32).unwrap(),
    });
    let mut store = VectorStore::new(encoder, StoreConfig::default().with_batch_size(2));
    store.build_collection("wines", &cellar()).unwrap();

    let mut bad = cellar();
    bad.push(wine("Oops", "Nowhere", "corked, wet cardboard"));
    let result = store.build_from_documents("wines", &bad);

    assert!(matches!(result, Err(VectorError::Embedding(_))));
    assert_eq!(store.stats("wines").unwrap().points_count, 4);
    let hits = store.search("wines", "crisp citrus, green apple", 1).unwrap();
    assert_eq!(hits[0].payload.text("name").as_deref(), Some("Citrus"));
}

#[test]
fn directory_mode_uses_hnsw_and_writes_snapshot() {
    let temp = TempDir::new().unwrap();
    let config = StoreConfig {
        storage: StorageMode::Directory(temp.path().to_path_buf()),
        ..StoreConfig::default()
    };
    let mut store = VectorStore::new(Arc::new(HashEmbedder::new(384).unwrap()), config);
    store.build_collection("top_wines", &cellar()).unwrap();

    assert!(temp.path().join("top_wines.usearch").exists());
    let hits = store.search("top_wines", "bold tannins, dark fruit", 2).unwrap();
    assert_eq!(hits[0].payload.text("name").as_deref(), Some("Chateau A"));
    assert!(hits[0].score >= hits[1].score);
}

#[test]
fn directory_mode_ties_match_in_memory_order() {
    let docs: Vec<Document> = (0..200)
        .map(|i| wine(&format!("Wine {i}"), "Region", "cedar and plum"))
        .collect();

    let temp = TempDir::new().unwrap();
    let config = StoreConfig {
        storage: StorageMode::Directory(temp.path().to_path_buf()),
        ..StoreConfig::default()
    };
    let mut on_disk = VectorStore::new(Arc::new(HashEmbedder::new(384).unwrap()), config);
    on_disk.build_collection("top_wines", &docs).unwrap();

    let mut in_memory = hash_store(384);
    in_memory.build_collection("top_wines", &docs).unwrap();

    let ids = |store: &VectorStore| -> Vec<u64> {
        store
            .search("top_wines", "cedar and plum", 3)
            .unwrap()
            .iter()
            .map(|h| h.id)
            .collect()
    };
    assert_eq!(ids(&on_disk), vec![0, 1, 2]);
    assert_eq!(ids(&on_disk), ids(&in_memory));
}

#[test]
fn storage_mode_from_instance_mode() {
    assert_eq!(StorageMode::from_instance_mode(":memory:"), StorageMode::InMemory);
    assert_eq!(
        StorageMode::from_instance_mode("/tmp/idx"),
        StorageMode::Directory("/tmp/idx".into())
    );
}
