//! Offline feature-hashing encoder.
//!
//! Lowercases the input, splits on anything that is not alphanumeric and
//! counts each token into bucket `xxh64(token) % dimension`. The count vector
//! is normalized to unit length, so cosine similarity reduces to weighted
//! token overlap. Needs no model files, which makes it the encoder of choice
//! for tests and air-gapped runs.

use std::hash::Hasher;

use twox_hash::XxHash64;

use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

/// Identifier prefix selecting this encoder, as in `hash` or `hash:512`.
pub const HASH_MODEL_PREFIX: &str = "hash";

/// Dimension used when the identifier carries none.
pub const DEFAULT_HASH_DIM: usize = 384;

pub struct HashEmbedder {
    info: ModelInfo,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::InvalidInput(
                "hash encoder dimension must be positive".to_string(),
            ));
        }
        Ok(Self {
            info: ModelInfo {
                name: format!("{}:{}", HASH_MODEL_PREFIX, dimension),
                dimension,
                max_sequence_length: usize::MAX,
            },
        })
    }

    /// Parse `hash` or `hash:<dim>`. Returns `None` for other identifiers.
    pub fn parse_identifier(model: &str) -> Option<Result<Self, EmbeddingError>> {
        let rest = model.strip_prefix(HASH_MODEL_PREFIX)?;
        if rest.is_empty() {
            return Some(Self::new(DEFAULT_HASH_DIM));
        }
        let dim = rest.strip_prefix(':')?;
        Some(
            dim.parse::<usize>()
                .map_err(|e| {
                    EmbeddingError::InvalidInput(format!("bad hash dimension '{dim}': {e}"))
                })
                .and_then(Self::new),
        )
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(token.as_bytes());
        (hasher.finish() % self.info.dimension as u64) as usize
    }
}

/// Lowercased alphanumeric runs of `text`.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

impl EmbeddingModel for HashEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let mut values = vec![0.0f32; self.info.dimension];
        for token in tokenize(text) {
            values[self.bucket(&token)] += 1.0;
        }
        Ok(Embedding::new(values))
    }
}
