//! Model file caching.
//!
//! Resolves model identifiers to Hugging Face repositories and downloads the
//! files a sentence-transformer needs into a local cache directory.

use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::EmbeddingError;

/// Default model repository on HuggingFace
pub const DEFAULT_MODEL_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Owner assumed for bare model names such as "all-MiniLM-L6-v2"
pub const DEFAULT_MODEL_OWNER: &str = "sentence-transformers";

/// Required model files
pub const MODEL_FILES: &[&str] = &["config.json", "tokenizer.json", "model.safetensors"];

/// Expand a configured model name to a full `owner/name` repo id.
pub fn resolve_repo_id(model: &str) -> String {
    if model.contains('/') {
        model.to_string()
    } else {
        format!("{}/{}", DEFAULT_MODEL_OWNER, model)
    }
}

/// Default cache location: `<user cache dir>/sommelier/models`.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("sommelier")
        .join("models")
}

/// Model cache configuration
#[derive(Debug, Clone)]
pub struct ModelCache {
    /// Cache directory path
    pub cache_dir: PathBuf,
    /// Model repository ID
    pub repo_id: String,
}

impl Default for ModelCache {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            repo_id: DEFAULT_MODEL_REPO.to_string(),
        }
    }
}

impl ModelCache {
    /// Create a new model cache with custom settings.
    /// Bare model names are resolved under `sentence-transformers/`.
    pub fn new(cache_dir: impl Into<PathBuf>, model: &str) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            repo_id: resolve_repo_id(model),
        }
    }

    /// Get the model directory path
    pub fn model_dir(&self) -> PathBuf {
        self.cache_dir.join(self.repo_id.replace('/', "_"))
    }

    /// Check if all model files are cached
    pub fn is_cached(&self) -> bool {
        let model_dir = self.model_dir();
        MODEL_FILES.iter().all(|f| model_dir.join(f).exists())
    }

    /// Get path to a specific model file
    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.model_dir().join(filename)
    }
}

/// Paths to model files
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

/// Get or download model files.
///
/// Returns paths to config.json, tokenizer.json, and model.safetensors.
pub fn get_or_download_model(cache: &ModelCache) -> Result<ModelPaths, EmbeddingError> {
    let model_dir = cache.model_dir();

    if cache.is_cached() {
        debug!(path = ?model_dir, "Using cached model");
    } else {
        info!(repo = %cache.repo_id, "Downloading model files...");
        download_model_files(cache)?;
    }

    Ok(ModelPaths {
        config: cache.file_path("config.json"),
        tokenizer: cache.file_path("tokenizer.json"),
        weights: cache.file_path("model.safetensors"),
    })
}

/// Download model files from HuggingFace Hub
fn download_model_files(cache: &ModelCache) -> Result<(), EmbeddingError> {
    use hf_hub::api::sync::Api;

    let api = Api::new().map_err(|e| EmbeddingError::Download(e.to_string()))?;
    let repo = api.model(cache.repo_id.clone());

    std::fs::create_dir_all(cache.model_dir())?;

    for filename in MODEL_FILES {
        info!(file = filename, "Downloading...");
        let source_path = repo
            .get(filename)
            .map_err(|e| EmbeddingError::Download(format!("{}: {}", filename, e)))?;

        let dest_path = cache.file_path(filename);
        std::fs::copy(&source_path, &dest_path)?;
        debug!(file = filename, "Downloaded to {:?}", dest_path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_default() {
        let cache = ModelCache::default();
        assert!(cache.cache_dir.to_string_lossy().contains("sommelier"));
        assert_eq!(cache.repo_id, DEFAULT_MODEL_REPO);
    }

    #[test]
    fn test_resolve_repo_id() {
        assert_eq!(resolve_repo_id("all-MiniLM-L6-v2"), DEFAULT_MODEL_REPO);
        assert_eq!(resolve_repo_id("BAAI/bge-small-en-v1.5"), "BAAI/bge-small-en-v1.5");
    }

    #[test]
    fn test_is_cached_empty() {
        let temp = TempDir::new().unwrap();
        let cache = ModelCache::new(temp.path(), "test/model");
        assert!(!cache.is_cached());
        assert!(cache.model_dir().ends_with("test_model"));
    }

    #[test]
    fn test_is_cached_with_files() {
        let temp = TempDir::new().unwrap();
        let cache = ModelCache::new(temp.path(), "test/model");
        std::fs::create_dir_all(cache.model_dir()).unwrap();
        for f in MODEL_FILES {
            std::fs::write(cache.file_path(f), b"stub").unwrap();
        }
        assert!(cache.is_cached());
    }
}
