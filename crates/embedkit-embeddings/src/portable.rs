//! Portable loader (Loader B).
//!
//! Acquires model files from the HuggingFace Hub into the local cache, then
//! runs the encoder on CPU. The first initialize for a model may download
//! hundreds of MB. It cannot be cancelled.

use async_trait::async_trait;
use candle_core::Device;
use embedkit_types::ModelDescriptor;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::{get_or_download_model, ModelCache};
use crate::encoder::{BertEncoder, LoadedEncoder};
use crate::error::EmbeddingError;
use crate::loader::{ensure_embedding_model, validate_text, LoaderKind, ModelLoader};
use crate::model::Embedding;

/// CPU loader with download-then-cache model acquisition.
pub struct PortableLoader {
    cache: ModelCache,
    enabled: bool,
    loaded: RwLock<Option<LoadedEncoder>>,
}

impl PortableLoader {
    pub fn new(cache: ModelCache, enabled: bool) -> Self {
        Self {
            cache,
            enabled,
            loaded: RwLock::new(None),
        }
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }
}

#[async_trait]
impl ModelLoader for PortableLoader {
    fn kind(&self) -> LoaderKind {
        LoaderKind::Portable
    }

    fn is_available(&self) -> bool {
        self.enabled
    }

    async fn initialize(&self, descriptor: &ModelDescriptor) -> Result<(), EmbeddingError> {
        if !self.is_available() {
            return Err(EmbeddingError::EngineUnavailable(LoaderKind::Portable));
        }
        ensure_embedding_model(LoaderKind::Portable, descriptor)?;

        if !self.cache.is_cached(&descriptor.source) {
            info!(
                model = %descriptor.id,
                source = %descriptor.source,
                "Model not cached; first load downloads it and may be slow"
            );
        }

        let cache = self.cache.clone();
        let source = descriptor.source.clone();
        let encoder = tokio::task::spawn_blocking(move || {
            let paths = get_or_download_model(&cache, &source)?;
            BertEncoder::load(&paths, Device::Cpu)
        })
        .await
        .map_err(|e| EmbeddingError::Task(e.to_string()))??;

        let loaded = LoadedEncoder::new(encoder, descriptor.dimension, LoaderKind::Portable)?;
        info!(model = %descriptor.id, "Portable engine ready");
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
            .ok_or_else(|| {
                EmbeddingError::engine(LoaderKind::Portable, "encoder returned no output")
            })
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
            debug!("Portable engine disposed");
        }
    }
}
