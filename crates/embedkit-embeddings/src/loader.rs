//! Engine loader trait and factory.
//!
//! A loader turns text into vectors with one specific runtime. The manager
//! holds exactly one loader at a time behind `Arc<dyn ModelLoader>`.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use embedkit_types::{ModelCategory, ModelDescriptor, Settings};
use serde::{Deserialize, Serialize};

use crate::cache::ModelCache;
use crate::error::EmbeddingError;
use crate::model::Embedding;
use crate::native::NativeLoader;
use crate::portable::PortableLoader;

/// Which loader implementation a session runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoaderKind {
    /// Native runtime with accelerated execution (Loader A)
    Native,
    /// Portable CPU runtime with model acquisition (Loader B)
    Portable,
}

impl fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderKind::Native => write!(f, "native"),
            LoaderKind::Portable => write!(f, "portable"),
        }
    }
}

/// Load a model, then map text to vectors.
///
/// Implementations must be thread-safe (Send + Sync); `generate_embedding`
/// may be called concurrently once initialized.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Implementation kind
    fn kind(&self) -> LoaderKind;

    /// Fast, side-effect-free check used for engine selection.
    fn is_available(&self) -> bool;

    /// Load the model described by `descriptor`. May be slow.
    async fn initialize(&self, descriptor: &ModelDescriptor) -> Result<(), EmbeddingError>;

    /// Embed one text.
    async fn generate_embedding(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Embed many texts.
    /// Default implementation calls generate_embedding() for each text.
    async fn generate_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.generate_embedding(text).await?);
        }
        Ok(out)
    }

    /// Release runtime resources. Idempotent.
    async fn dispose(&self);
}

/// Builds loaders for the manager.
pub trait LoaderFactory: Send + Sync {
    fn create(&self, kind: LoaderKind) -> Box<dyn ModelLoader>;
}

/// Options for the real candle-backed loaders.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub cache: ModelCache,
    pub prefer_accelerator: bool,
    pub native_enabled: bool,
    pub portable_enabled: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            cache: ModelCache::default(),
            prefer_accelerator: true,
            native_enabled: true,
            portable_enabled: true,
        }
    }
}

impl LoaderOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            cache: ModelCache::new(settings.expanded_cache_dir()),
            prefer_accelerator: settings.engine.prefer_accelerator,
            native_enabled: settings.engine.native_enabled,
            portable_enabled: settings.engine.portable_enabled,
        }
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache = ModelCache::new(dir);
        self
    }
}

/// Creates [`NativeLoader`] and [`PortableLoader`] instances.
#[derive(Debug, Clone, Default)]
pub struct DefaultLoaderFactory {
    options: LoaderOptions,
}

impl DefaultLoaderFactory {
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }
}

impl LoaderFactory for DefaultLoaderFactory {
    fn create(&self, kind: LoaderKind) -> Box<dyn ModelLoader> {
        match kind {
            LoaderKind::Native => Box::new(NativeLoader::new(
                self.options.native_enabled,
                self.options.prefer_accelerator,
            )),
            LoaderKind::Portable => Box::new(PortableLoader::new(
                self.options.cache.clone(),
                self.options.portable_enabled,
            )),
        }
    }
}

/// Reject empty, whitespace-only, or NUL-containing text.
pub fn validate_text(text: &str) -> Result<(), EmbeddingError> {
    if text.trim().is_empty() {
        return Err(EmbeddingError::InvalidInput(
            "text must not be empty".to_string(),
        ));
    }
    if text.contains('\0') {
        return Err(EmbeddingError::InvalidInput(
            "text must not contain NUL characters".to_string(),
        ));
    }
    Ok(())
}

/// Loaders only serve embedding models.
pub fn ensure_embedding_model(
    kind: LoaderKind,
    descriptor: &ModelDescriptor,
) -> Result<(), EmbeddingError> {
    descriptor
        .validate()
        .map_err(|e| EmbeddingError::InvalidInput(e.to_string()))?;
    if descriptor.category != ModelCategory::Embedding {
        return Err(EmbeddingError::engine(
            kind,
            format!("{} is a {} model", descriptor.id, descriptor.category),
        ));
    }
    Ok(())
}

/// Every output component must be finite.
pub fn check_finite(kind: LoaderKind, embedding: &Embedding) -> Result<(), EmbeddingError> {
    if !embedding.is_finite() {
        return Err(EmbeddingError::engine(
            kind,
            "engine produced a non-finite embedding",
        ));
    }
    Ok(())
}

/// Output length must match the declared dimension.
pub fn check_dimension(expected: usize, embedding: &Embedding) -> Result<(), EmbeddingError> {
    if embedding.dimension() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: embedding.dimension(),
        });
    }
    Ok(())
}
