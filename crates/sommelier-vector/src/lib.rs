//! # sommelier-vector
//!
//! Named collections of embedded documents with cosine-similarity search.
//!
//! ## Features
//! - Exact flat scan for `:memory:` stores
//! - usearch-powered HNSW candidate search with on-disk snapshots
//! - Deterministic ranking: descending score, ties by ascending id
//! - All-or-nothing builds with an explicit rebuild policy

pub mod collection;
pub mod error;
pub mod flat;
pub mod hnsw;
pub mod index;
pub mod store;

pub use collection::{Collection, CollectionStats, IndexedRecord, SearchHit};
pub use error::VectorError;
pub use flat::FlatIndex;
pub use hnsw::{HnswConfig, HnswIndex};
pub use index::{SearchResult, VectorIndex};
pub use store::{StorageMode, StoreConfig, VectorStore};
