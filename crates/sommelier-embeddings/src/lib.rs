//! # sommelier-embeddings
//!
//! Text encoders that turn wine notes and user questions into fixed-length
//! vectors.
//!
//! ## Features
//! - Local inference via Candle (all-MiniLM-L6-v2, 384 dimensions)
//! - Automatic model file caching
//! - Offline feature-hashing encoder (`hash`, `hash:<dim>`)

pub mod cache;
pub mod candle;
pub mod error;
pub mod hash;
pub mod loader;
pub mod model;

pub use crate::candle::CandleEmbedder;
pub use cache::{get_or_download_model, ModelCache, ModelPaths, DEFAULT_MODEL_REPO, MODEL_FILES};
pub use error::EmbeddingError;
pub use hash::{HashEmbedder, DEFAULT_HASH_DIM};
pub use loader::load_encoder;
pub use model::{cosine_similarity, Embedding, EmbeddingModel, ModelInfo};
