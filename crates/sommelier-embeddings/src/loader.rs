//! Encoder selection by model identifier.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::cache::{default_cache_dir, ModelCache};
use crate::candle::CandleEmbedder;
use crate::error::EmbeddingError;
use crate::hash::HashEmbedder;
use crate::model::EmbeddingModel;

/// Resolve `model` to a ready encoder.
///
/// `hash` and `hash:<dim>` select the offline [`HashEmbedder`]. Anything else
/// names a sentence-transformer, fetched into `cache_dir` when not yet cached.
/// Every failure surfaces as [`EmbeddingError::ModelLoad`].
pub fn load_encoder(
    model: &str,
    cache_dir: Option<PathBuf>,
) -> Result<Arc<dyn EmbeddingModel>, EmbeddingError> {
    let model = model.trim();
    if model.is_empty() {
        return Err(EmbeddingError::model_load(model, "empty model identifier"));
    }

    if let Some(hash) = HashEmbedder::parse_identifier(model) {
        let encoder = hash.map_err(|e| EmbeddingError::model_load(model, e))?;
        info!(model, dim = encoder.dimension(), "Using hashing encoder");
        return Ok(Arc::new(encoder));
    }

    let cache = ModelCache::new(cache_dir.unwrap_or_else(default_cache_dir), model);
    let encoder = CandleEmbedder::load(&cache).map_err(|e| match e {
        e @ EmbeddingError::ModelLoad { .. } => e,
        other => EmbeddingError::model_load(model, other),
    })?;
    Ok(Arc::new(encoder))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_hash_encoder() {
        let enc = load_encoder("hash:48", None).unwrap();
        assert_eq!(enc.dimension(), 48);
        assert_eq!(enc.info().name, "hash:48");
    }

    #[test]
    fn test_empty_identifier_is_model_load() {
        assert!(matches!(
            load_encoder("  ", None),
            Err(EmbeddingError::ModelLoad { .. })
        ));
    }

    #[test]
    fn test_bad_hash_dimension_is_model_load() {
        let err = load_encoder("hash:zero", None).err().unwrap();
        assert!(matches!(err, EmbeddingError::ModelLoad { ref model, .. } if model == "hash:zero"));
    }
}
