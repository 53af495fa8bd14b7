//! Candle-based sentence embeddings.
//!
//! Runs a BERT sentence-transformer (all-MiniLM-L6-v2 by default) on the CPU
//! and mean-pools token embeddings into one unit-length vector per text.

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::cache::{get_or_download_model, ModelCache};
use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

/// Embedding dimension for all-MiniLM-L6-v2
pub const EMBEDDING_DIM: usize = 384;

/// Maximum sequence length
pub const MAX_SEQ_LENGTH: usize = 256;

/// Candle-based BERT embedder.
pub struct CandleEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    info: ModelInfo,
}

impl CandleEmbedder {
    /// Load the embedding model from cache (downloading if needed).
    pub fn load(cache: &ModelCache) -> Result<Self, EmbeddingError> {
        let paths = get_or_download_model(cache)?;
        Self::load_from_paths(
            &cache.repo_id,
            &paths.config,
            &paths.tokenizer,
            &paths.weights,
        )
    }

    /// Load with default cache settings
    pub fn load_default() -> Result<Self, EmbeddingError> {
        Self::load(&ModelCache::default())
    }

    /// Load from explicit file paths
    pub fn load_from_paths(
        name: &str,
        config_path: &Path,
        tokenizer_path: &Path,
        weights_path: &Path,
    ) -> Result<Self, EmbeddingError> {
        info!(model = name, "Loading embedding model...");

        let device = Device::Cpu;

        let config_str = std::fs::read_to_string(config_path)?;
        let config: BertConfig = serde_json::from_str(&config_str)
            .map_err(|e| EmbeddingError::ModelNotFound(format!("Invalid config: {}", e)))?;
        let dimension = hidden_size(&config_str).unwrap_or(EMBEDDING_DIM);

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        // SAFETY: the weights file is owned by the model cache and not modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path.to_path_buf()], DType::F32, &device)?
        };

        let model = BertModel::load(vb, &config)?;

        info!(dim = dimension, max_seq = MAX_SEQ_LENGTH, "Model loaded");

        Ok(Self {
            model,
            tokenizer,
            device,
            info: ModelInfo {
                name: name.to_string(),
                dimension,
                max_sequence_length: MAX_SEQ_LENGTH,
            },
        })
    }

    /// Mean pooling over token embeddings (excluding padding)
    fn mean_pooling(
        &self,
        embeddings: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor, EmbeddingError> {
        let mask = attention_mask
            .unsqueeze(2)?
            .broadcast_as(embeddings.shape())?;
        let mask_f32 = mask.to_dtype(DType::F32)?;

        let sum = embeddings.broadcast_mul(&mask_f32)?.sum(1)?;
        let mask_sum = mask_f32.sum(1)?.clamp(1e-9, f64::MAX)?;

        Ok(sum.broadcast_div(&mask_sum)?)
    }
}

fn hidden_size(config_json: &str) -> Option<usize> {
    let value: serde_json::Value = serde_json::from_str(config_json).ok()?;
    value
        .get("hidden_size")
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
}

impl EmbeddingModel for CandleEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidInput("empty batch output".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!(count = texts.len(), "Embedding batch");

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(MAX_SEQ_LENGTH);

        let mut input_ids: Vec<u32> = Vec::with_capacity(texts.len() * max_len);
        let mut attention_mask: Vec<u32> = Vec::with_capacity(texts.len() * max_len);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let len = ids.len().min(max_len);

            input_ids.extend_from_slice(&ids[..len]);
            input_ids.extend(std::iter::repeat(0).take(max_len - len));
            attention_mask.extend_from_slice(&mask[..len]);
            attention_mask.extend(std::iter::repeat(0).take(max_len - len));
        }

        let batch_size = texts.len();
        let input_ids = Tensor::from_vec(input_ids, (batch_size, max_len), &self.device)?;
        let attention_mask = Tensor::from_vec(attention_mask, (batch_size, max_len), &self.device)?;
        let token_type_ids = Tensor::zeros_like(&input_ids)?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = self.mean_pooling(&output, &attention_mask)?;
        let pooled_vec: Vec<Vec<f32>> = pooled.to_vec2()?;

        let embeddings: Vec<Embedding> = pooled_vec.into_iter().map(Embedding::new).collect();

        debug!(count = embeddings.len(), dim = self.info.dimension, "Batch complete");

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_size_from_config() {
        assert_eq!(hidden_size(r#"{"hidden_size": 768}"#), Some(768));
        assert_eq!(hidden_size(r#"{"vocab_size": 10}"#), None);
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_load_model() {
        let embedder = CandleEmbedder::load_default().unwrap();
        assert_eq!(embedder.info().dimension, EMBEDDING_DIM);
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_embed_is_deterministic() {
        let embedder = CandleEmbedder::load_default().unwrap();
        let a = embedder.embed("bold tannins, dark fruit").unwrap();
        let b = embedder.embed("bold tannins, dark fruit").unwrap();
        assert_eq!(a.dimension(), EMBEDDING_DIM);
        assert_eq!(a, b);
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_similar_texts_high_similarity() {
        let embedder = CandleEmbedder::load_default().unwrap();
        let emb1 = embedder.embed("A full-bodied red with firm tannins").unwrap();
        let emb2 = embedder.embed("Bold red wine, strong tannic structure").unwrap();
        let emb3 = embedder.embed("Python programming language").unwrap();

        assert!(emb1.cosine_similarity(&emb2) > emb1.cosine_similarity(&emb3));
    }
}
