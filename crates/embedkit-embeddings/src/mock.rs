//! Mock loaders for testing.
//!
//! Produce deterministic bag-of-words vectors without any model files, and
//! can be told to be unavailable or to fail initialization.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use embedkit_types::ModelDescriptor;
use tokio::sync::RwLock;

use crate::error::EmbeddingError;
use crate::loader::{
    check_dimension, check_finite, ensure_embedding_model, validate_text, LoaderFactory,
    LoaderKind, ModelLoader,
};
use crate::model::Embedding;

/// How a mock loader behaves.
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    /// `is_available()` returns false
    pub unavailable: bool,
    /// Every `initialize` fails
    pub fail_initialize: bool,
    /// `initialize` fails for these model ids only
    pub fail_models: Vec<String>,
    /// Sleep this long inside `initialize`
    pub init_delay: Option<Duration>,
    /// Emit vectors of this length instead of the descriptor's
    pub output_dimension: Option<usize>,
    /// Emit NaN in every component
    pub non_finite_output: bool,
}

impl MockBehavior {
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_initialize: true,
            ..Default::default()
        }
    }

    pub fn failing_for(model_id: impl Into<String>) -> Self {
        Self {
            fail_models: vec![model_id.into()],
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            init_delay: Some(delay),
            ..Default::default()
        }
    }
}

/// Counters shared by every loader a [`MockLoaderFactory`] creates.
#[derive(Debug, Default)]
pub struct MockStats {
    pub native_created: AtomicUsize,
    pub portable_created: AtomicUsize,
    pub initialized: AtomicUsize,
    pub disposed: AtomicUsize,
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
}

impl MockStats {
    pub fn created(&self, kind: LoaderKind) -> usize {
        match kind {
            LoaderKind::Native => self.native_created.load(Ordering::SeqCst),
            LoaderKind::Portable => self.portable_created.load(Ordering::SeqCst),
        }
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }
}

/// Deterministic in-process loader.
pub struct MockLoader {
    kind: LoaderKind,
    behavior: MockBehavior,
    stats: Arc<MockStats>,
    dimension: RwLock<Option<usize>>,
}

impl MockLoader {
    pub fn new(kind: LoaderKind, behavior: MockBehavior) -> Self {
        Self::with_stats(kind, behavior, Arc::new(MockStats::default()))
    }

    fn with_stats(kind: LoaderKind, behavior: MockBehavior, stats: Arc<MockStats>) -> Self {
        Self {
            kind,
            behavior,
            stats,
            dimension: RwLock::new(None),
        }
    }
}

#[async_trait]
impl ModelLoader for MockLoader {
    fn kind(&self) -> LoaderKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        !self.behavior.unavailable
    }

    async fn initialize(&self, descriptor: &ModelDescriptor) -> Result<(), EmbeddingError> {
        if !self.is_available() {
            return Err(EmbeddingError::EngineUnavailable(self.kind));
        }
        ensure_embedding_model(self.kind, descriptor)?;
        if let Some(delay) = self.behavior.init_delay {
            tokio::time::sleep(delay).await;
        }
        if self.behavior.fail_initialize || self.behavior.fail_models.contains(&descriptor.id) {
            return Err(EmbeddingError::engine(
                self.kind,
                format!("mock failure loading {}", descriptor.id),
            ));
        }

        let mut dimension = self.dimension.write().await;
        if dimension.is_none() {
            let live = self.stats.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.stats.max_live.fetch_max(live, Ordering::SeqCst);
        }
        *dimension = Some(descriptor.dimension);
        self.stats.initialized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn generate_embedding(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        validate_text(text)?;
        let expected = self
            .dimension
            .read()
            .await
            .ok_or(EmbeddingError::NotInitialized)?;
        let width = self.behavior.output_dimension.unwrap_or(expected);
        let embedding = if self.behavior.non_finite_output {
            Embedding::from_normalized(vec![f32::NAN; width])
        } else {
            hash_embedding(text, width)
        };
        check_dimension(expected, &embedding)?;
        check_finite(self.kind, &embedding)?;
        Ok(embedding)
    }

    async fn dispose(&self) {
        if self.dimension.write().await.take().is_some() {
            self.stats.live.fetch_sub(1, Ordering::SeqCst);
            self.stats.disposed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Factory producing [`MockLoader`]s with per-kind behavior.
#[derive(Debug, Clone, Default)]
pub struct MockLoaderFactory {
    native: MockBehavior,
    portable: MockBehavior,
    stats: Arc<MockStats>,
}

impl MockLoaderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_native(mut self, behavior: MockBehavior) -> Self {
        self.native = behavior;
        self
    }

    pub fn with_portable(mut self, behavior: MockBehavior) -> Self {
        self.portable = behavior;
        self
    }

    pub fn stats(&self) -> Arc<MockStats> {
        self.stats.clone()
    }
}

impl LoaderFactory for MockLoaderFactory {
    fn create(&self, kind: LoaderKind) -> Box<dyn ModelLoader> {
        let behavior = match kind {
            LoaderKind::Native => {
                self.stats.native_created.fetch_add(1, Ordering::SeqCst);
                self.native.clone()
            }
            LoaderKind::Portable => {
                self.stats.portable_created.fetch_add(1, Ordering::SeqCst);
                self.portable.clone()
            }
        };
        Box::new(MockLoader::with_stats(kind, behavior, self.stats.clone()))
    }
}

/// Bag-of-words vector: each lowercase word bumps two hashed buckets.
///
/// Increments are positive, so any non-empty text gives a non-zero vector.
pub fn hash_embedding(text: &str, dimension: usize) -> Embedding {
    let mut values = vec![0.0f32; dimension];
    if dimension == 0 {
        return Embedding::from_normalized(values);
    }
    for word in text.split_whitespace() {
        let h = fnv1a(word.to_lowercase().as_bytes());
        values[(h % dimension as u64) as usize] += 1.0;
        values[((h >> 32) % dimension as u64) as usize] += 0.5;
    }
    Embedding::new(values)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}
