//! Native accelerated loader (Loader A).
//!
//! Loads a BERT-family model from a local directory. When allowed, it tries
//! a CUDA or Metal device first and falls back to CPU on its own; the
//! manager never sees that inner fallback.

use std::path::PathBuf;

use async_trait::async_trait;
use candle_core::Device;
use embedkit_types::ModelDescriptor;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{has_model_files, ModelPaths};
use crate::encoder::{device_label, BertEncoder, LoadedEncoder};
use crate::error::EmbeddingError;
use crate::loader::{ensure_embedding_model, validate_text, LoaderKind, ModelLoader};
use crate::model::Embedding;

/// Candle loader reading weights from a local model directory.
pub struct NativeLoader {
    enabled: bool,
    prefer_accelerator: bool,
    loaded: RwLock<Option<LoadedEncoder>>,
}

impl NativeLoader {
    pub fn new(enabled: bool, prefer_accelerator: bool) -> Self {
        Self {
            enabled,
            prefer_accelerator,
            loaded: RwLock::new(None),
        }
    }

    /// Label of the device the current model runs on, if loaded.
    pub async fn device(&self) -> Option<&'static str> {
        self.loaded
            .read()
            .await
            .as_ref()
            .map(|l| device_label(l.encoder.device()))
    }
}

#[async_trait]
impl ModelLoader for NativeLoader {
    fn kind(&self) -> LoaderKind {
        LoaderKind::Native
    }

    fn is_available(&self) -> bool {
        self.enabled
    }

    async fn initialize(&self, descriptor: &ModelDescriptor) -> Result<(), EmbeddingError> {
        if !self.is_available() {
            return Err(EmbeddingError::EngineUnavailable(LoaderKind::Native));
        }
        ensure_embedding_model(LoaderKind::Native, descriptor)?;

        let dir: PathBuf = descriptor.local_path.clone().ok_or_else(|| {
            EmbeddingError::engine(
                LoaderKind::Native,
                format!("{} has no local model path", descriptor.id),
            )
        })?;
        if !has_model_files(&dir) {
            return Err(EmbeddingError::ModelNotFound(format!(
                "{} is missing model files",
                dir.display()
            )));
        }

        let paths = ModelPaths::in_dir(&dir);
        let prefer_accelerator = self.prefer_accelerator;
        let encoder = tokio::task::spawn_blocking(move || load_with_fallback(&paths, prefer_accelerator))
            .await
            .map_err(|e| EmbeddingError::Task(e.to_string()))??;

        let loaded = LoadedEncoder::new(encoder, descriptor.dimension, LoaderKind::Native)?;
        info!(
            model = %descriptor.id,
            device = device_label(loaded.encoder.device()),
            "Native engine ready"
        );
        *self.loaded.write().await = Some(loaded);
        Ok(())
    }

    async fn generate_embedding(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        validate_text(text)?;
        let loaded = self
            .loaded
            .read()
            .await
            .clone()
            .ok_or(EmbeddingError::NotInitialized)?;
        loaded
            .embed(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::engine(LoaderKind::Native, "encoder returned no output"))
    }

    async fn generate_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        for text in texts {
            validate_text(text)?;
        }
        let loaded = self
            .loaded
            .read()
            .await
            .clone()
            .ok_or(EmbeddingError::NotInitialized)?;
        loaded.embed(texts.to_vec()).await
    }

    async fn dispose(&self) {
        if self.loaded.write().await.take().is_some() {
            debug!("Native engine disposed");
        }
    }
}

/// Try the accelerated device, then CPU.
fn load_with_fallback(
    paths: &ModelPaths,
    prefer_accelerator: bool,
) -> Result<BertEncoder, EmbeddingError> {
    if prefer_accelerator {
        if let Some(device) = accelerated_device() {
            match BertEncoder::load(paths, device) {
                Ok(encoder) => return Ok(encoder),
                Err(e) => warn!(error = %e, "Accelerated load failed, falling back to CPU"),
            }
        }
    }
    BertEncoder::load(paths, Device::Cpu)
}

fn accelerated_device() -> Option<Device> {
    if candle_core::utils::cuda_is_available() {
        match Device::new_cuda(0) {
            Ok(device) => return Some(device),
            Err(e) => warn!(error = %e, "CUDA device unavailable"),
        }
    }
    if candle_core::utils::metal_is_available() {
        match Device::new_metal(0) {
            Ok(device) => return Some(device),
            Err(e) => warn!(error = %e, "Metal device unavailable"),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn descriptor() -> ModelDescriptor {
        ModelDescriptor::embedding("m", "M", "org/m", 4)
    }

    #[tokio::test]
    async fn test_disabled_loader_is_unavailable() {
        let loader = NativeLoader::new(false, true);
        assert!(!loader.is_available());
        let err = loader.initialize(&descriptor()).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::EngineUnavailable(LoaderKind::Native)));
    }

    #[tokio::test]
    async fn test_requires_local_path() {
        let loader = NativeLoader::new(true, false);
        let err = loader.initialize(&descriptor()).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Engine { engine: LoaderKind::Native, .. }));
    }

    #[tokio::test]
    async fn test_missing_files() {
        let temp = TempDir::new().unwrap();
        let loader = NativeLoader::new(true, false);
        let err = loader
            .initialize(&descriptor().with_local_path(temp.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::ModelNotFound(_)));
    }

    #[tokio::test]
    async fn test_embed_before_initialize() {
        let loader = NativeLoader::new(true, false);
        let err = loader.generate_embedding("hello").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::NotInitialized));

        // validation runs first
        let err = loader.generate_embedding(" ").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent() {
        let loader = NativeLoader::new(true, false);
        loader.dispose().await;
        loader.dispose().await;
        assert!(loader.device().await.is_none());
    }
}
