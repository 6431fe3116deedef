//! Model file caching.
//!
//! Downloads and caches model files from HuggingFace Hub.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::EmbeddingError;

/// Required model files
pub const MODEL_FILES: &[&str] = &["config.json", "tokenizer.json", "model.safetensors"];

/// Model cache configuration
#[derive(Debug, Clone)]
pub struct ModelCache {
    /// Cache directory path
    pub cache_dir: PathBuf,
}

impl Default for ModelCache {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("embedkit")
            .join("models");

        Self { cache_dir }
    }
}

impl ModelCache {
    /// Create a model cache rooted at `cache_dir`.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Directory holding the files of one repository.
    pub fn model_dir(&self, repo_id: &str) -> PathBuf {
        self.cache_dir.join(repo_id.replace('/', "_"))
    }

    /// Check if all model files for `repo_id` are cached
    pub fn is_cached(&self, repo_id: &str) -> bool {
        has_model_files(&self.model_dir(repo_id))
    }

    /// Get path to a specific model file
    pub fn file_path(&self, repo_id: &str, filename: &str) -> PathBuf {
        self.model_dir(repo_id).join(filename)
    }
}

/// Paths to model files
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl ModelPaths {
    /// Paths inside a directory laid out like a HuggingFace snapshot.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            config: dir.join("config.json"),
            tokenizer: dir.join("tokenizer.json"),
            weights: dir.join("model.safetensors"),
        }
    }
}

/// True when `dir` holds every file in [`MODEL_FILES`].
pub fn has_model_files(dir: &Path) -> bool {
    MODEL_FILES.iter().all(|f| dir.join(f).exists())
}

/// Get or download model files.
///
/// Returns paths to config.json, tokenizer.json, and model.safetensors.
/// Blocking; call from `spawn_blocking` in async contexts.
pub fn get_or_download_model(
    cache: &ModelCache,
    repo_id: &str,
) -> Result<ModelPaths, EmbeddingError> {
    let model_dir = cache.model_dir(repo_id);

    if cache.is_cached(repo_id) {
        debug!(path = ?model_dir, "Using cached model");
    } else {
        info!(repo = %repo_id, "Downloading model files...");
        download_model_files(cache, repo_id)?;
    }

    Ok(ModelPaths::in_dir(&model_dir))
}

/// Download model files from HuggingFace Hub
fn download_model_files(cache: &ModelCache, repo_id: &str) -> Result<(), EmbeddingError> {
    use hf_hub::api::sync::Api;

    let api = Api::new().map_err(|e| EmbeddingError::Download(e.to_string()))?;
    let repo = api.model(repo_id.to_string());

    std::fs::create_dir_all(cache.model_dir(repo_id))?;

    for filename in MODEL_FILES {
        info!(file = filename, "Downloading...");
        let source_path = repo
            .get(filename)
            .map_err(|e| EmbeddingError::Download(format!("{}: {}", filename, e)))?;

        let dest_path = cache.file_path(repo_id, filename);
        std::fs::copy(&source_path, &dest_path)?;
        debug!(file = filename, "Downloaded to {:?}", dest_path);
    }

    Ok(())
}
