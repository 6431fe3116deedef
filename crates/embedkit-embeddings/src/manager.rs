//! Embedding engine manager.
//!
//! Owns at most one live [`EngineSession`]. Session transitions
//! (initialize, switch, dispose) are serialized; a transition requested while
//! another is running is rejected, never queued.
//!
//! State machine:
//! `Uninitialized -> Initializing -> Ready -> Disposing -> Uninitialized`,
//! and `Initializing -> Uninitialized` on failure.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use embedkit_types::{
    DeviceCapabilities, EngineSettings, LoaderStrategy, ModelCategory, ModelDescriptor, Settings,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, error, info, warn};

use crate::cache::has_model_files;
use crate::catalog::{default_descriptor, ModelCatalog, DEFAULT_MODEL_ID};
use crate::device;
use crate::error::EmbeddingError;
use crate::loader::{
    check_finite, validate_text, DefaultLoaderFactory, LoaderFactory, LoaderKind, LoaderOptions,
    ModelLoader,
};
use crate::model::{Embedding, GeneratedEmbedding};
use crate::recommender::ModelRecommender;

/// Lifecycle state of the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready,
    Disposing,
}

/// How to pick a model and engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Catalog id; wins over everything else
    #[serde(default)]
    pub model_id: Option<String>,
    /// Descriptor for a model outside the catalog
    #[serde(default)]
    pub custom_descriptor: Option<ModelDescriptor>,
    #[serde(default)]
    pub strategy: LoaderStrategy,
    /// Use the recommended model when no id or descriptor is given
    #[serde(default)]
    pub auto_select: bool,
}

impl EngineConfig {
    pub fn for_model(model_id: impl Into<String>) -> Self {
        Self {
            model_id: Some(model_id.into()),
            ..Default::default()
        }
    }

    pub fn for_descriptor(descriptor: ModelDescriptor) -> Self {
        Self {
            custom_descriptor: Some(descriptor),
            ..Default::default()
        }
    }

    pub fn with_strategy(mut self, strategy: LoaderStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            model_id: settings.model_id.clone(),
            custom_descriptor: None,
            strategy: settings.strategy,
            auto_select: settings.auto_select,
        }
    }
}

/// The live loader/model pair.
pub struct EngineSession {
    kind: LoaderKind,
    descriptor: ModelDescriptor,
    loader: Arc<dyn ModelLoader>,
}

impl EngineSession {
    pub fn kind(&self) -> LoaderKind {
        self.kind
    }

    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }
}

impl fmt::Debug for EngineSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSession")
            .field("kind", &self.kind)
            .field("model", &self.descriptor.id)
            .finish()
    }
}

/// Snapshot for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub state: EngineState,
    pub engine: Option<LoaderKind>,
    pub model: Option<ModelDescriptor>,
}

struct Inner {
    state: EngineState,
    session: Option<Arc<EngineSession>>,
    strategy: LoaderStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Transition {
    Idle = 0,
    Initialize = 1,
    Switch = 2,
    Dispose = 3,
}

impl Transition {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Transition::Initialize,
            2 => Transition::Switch,
            3 => Transition::Dispose,
            _ => Transition::Idle,
        }
    }

    /// Error for a `requested` transition that found `active` running.
    ///
    /// `active` reads Idle while the holder is between taking the lock and
    /// publishing its kind, or releasing; the caller's own kind decides then.
    fn contention_error(requested: Transition, active: Transition) -> EmbeddingError {
        match (active, requested) {
            (Transition::Initialize | Transition::Switch, _) => EmbeddingError::AlreadyInitializing,
            (Transition::Dispose, _) => EmbeddingError::Busy("dispose in progress".to_string()),
            (Transition::Idle, Transition::Initialize | Transition::Switch) => {
                EmbeddingError::AlreadyInitializing
            }
            (Transition::Idle, _) => EmbeddingError::Busy("transition in progress".to_string()),
        }
    }
}

struct TransitionGuard<'a> {
    _lock: MutexGuard<'a, ()>,
    active: &'a AtomicU8,
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        self.active.store(Transition::Idle as u8, Ordering::SeqCst);
    }
}

/// Selects, initializes, and fronts the active embedding engine.
pub struct EngineManager {
    catalog: Arc<ModelCatalog>,
    recommender: ModelRecommender,
    capabilities: DeviceCapabilities,
    factory: Arc<dyn LoaderFactory>,
    local_models_dir: Option<PathBuf>,
    default_config: EngineConfig,
    transition: Mutex<()>,
    active: AtomicU8,
    inner: RwLock<Inner>,
}

impl EngineManager {
    /// Manager over the built-in catalog and the detected device.
    pub fn new(factory: Arc<dyn LoaderFactory>) -> Self {
        let catalog = ModelCatalog::builtin();
        Self {
            recommender: ModelRecommender::new(catalog.clone()),
            catalog,
            capabilities: device::detect().clone(),
            factory,
            local_models_dir: None,
            default_config: EngineConfig {
                auto_select: true,
                ..Default::default()
            },
            transition: Mutex::new(()),
            active: AtomicU8::new(Transition::Idle as u8),
            inner: RwLock::new(Inner {
                state: EngineState::Uninitialized,
                session: None,
                strategy: LoaderStrategy::default(),
            }),
        }
    }

    /// Manager with real loaders configured from settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let factory = DefaultLoaderFactory::new(LoaderOptions::from_settings(settings));
        let mut manager = Self::new(Arc::new(factory))
            .with_default_config(EngineConfig::from_settings(&settings.engine));
        manager.local_models_dir = settings.expanded_local_models_dir();
        manager
    }

    pub fn with_catalog(mut self, catalog: Arc<ModelCatalog>) -> Self {
        self.recommender = ModelRecommender::new(catalog.clone());
        self.catalog = catalog;
        self
    }

    pub fn with_recommender(mut self, recommender: ModelRecommender) -> Self {
        self.recommender = recommender;
        self
    }

    pub fn with_capabilities(mut self, capabilities: DeviceCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_local_models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_models_dir = Some(dir.into());
        self
    }

    /// Config used for lazy bootstrap.
    pub fn with_default_config(mut self, config: EngineConfig) -> Self {
        self.default_config = config;
        self
    }

    /// Process-wide manager, built from default settings on first use unless
    /// [`EngineManager::install_global`] ran earlier.
    pub fn global() -> Arc<EngineManager> {
        global_slot()
            .get_or_init(|| Arc::new(EngineManager::from_settings(&Settings::default())))
            .clone()
    }

    /// Install the process-wide manager. Returns false if one already exists.
    pub fn install_global(manager: EngineManager) -> bool {
        global_slot().set(Arc::new(manager)).is_ok()
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn recommender(&self) -> &ModelRecommender {
        &self.recommender
    }

    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    pub fn list_models(&self, category: Option<ModelCategory>) -> Vec<ModelDescriptor> {
        match category {
            Some(c) => self.catalog.list_by_category(c),
            None => self.catalog.list_all(),
        }
        .into_iter()
        .cloned()
        .collect()
    }

    pub fn recommend_model(&self, category: Option<ModelCategory>) -> Option<ModelDescriptor> {
        self.recommender.recommend(category, &self.capabilities)
    }

    pub async fn state(&self) -> EngineState {
        self.inner.read().await.state
    }

    pub async fn current_model(&self) -> Option<ModelDescriptor> {
        self.inner
            .read()
            .await
            .session
            .as_ref()
            .map(|s| s.descriptor.clone())
    }

    pub async fn status(&self) -> EngineStatus {
        let inner = self.inner.read().await;
        EngineStatus {
            state: inner.state,
            engine: inner.session.as_ref().map(|s| s.kind),
            model: inner.session.as_ref().map(|s| s.descriptor.clone()),
        }
    }

    /// Resolve a model and start a session for it, replacing any live one.
    pub async fn initialize(&self, config: EngineConfig) -> Result<ModelDescriptor, EmbeddingError> {
        let _guard = self.begin_transition(Transition::Initialize)?;
        let descriptor = self.resolve_descriptor(&config)?;
        self.dispose_locked().await;
        self.start_locked(descriptor, config.strategy).await
    }

    /// Dispose the current session, then initialize `model_id` with the
    /// previous strategy. On failure the manager is left uninitialized.
    pub async fn switch_model(&self, model_id: &str) -> Result<ModelDescriptor, EmbeddingError> {
        let _guard = self.begin_transition(Transition::Switch)?;
        let strategy = self.inner.read().await.strategy;
        self.dispose_locked().await;

        let config = EngineConfig::for_model(model_id).with_strategy(strategy);
        let descriptor = self.resolve_descriptor(&config)?;
        self.start_locked(descriptor, strategy).await
    }

    /// Release the live session, if any.
    pub async fn dispose(&self) -> Result<(), EmbeddingError> {
        let _guard = self.begin_transition(Transition::Dispose)?;
        self.dispose_locked().await;
        Ok(())
    }

    /// Embed one text, bootstrapping the default engine when uninitialized.
    pub async fn generate_embedding(&self, text: &str) -> Result<GeneratedEmbedding, EmbeddingError> {
        validate_text(text)?;
        let session = self.ready_session().await?;
        let embedding = session.loader.generate_embedding(text).await?;
        check_finite(session.kind, &embedding)?;
        Ok(embedding.into())
    }

    /// Embed many texts with the active engine.
    pub async fn generate_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        for text in texts {
            validate_text(text)?;
        }
        let session = self.ready_session().await?;
        let embeddings = session.loader.generate_batch(texts).await?;
        for embedding in &embeddings {
            check_finite(session.kind, embedding)?;
        }
        Ok(embeddings)
    }

    async fn ready_session(&self) -> Result<Arc<EngineSession>, EmbeddingError> {
        {
            let inner = self.inner.read().await;
            match inner.state {
                EngineState::Ready => {
                    return inner.session.clone().ok_or(EmbeddingError::NotInitialized)
                }
                EngineState::Initializing => return Err(EmbeddingError::AlreadyInitializing),
                EngineState::Disposing => {
                    return Err(EmbeddingError::Busy("engine is disposing".to_string()))
                }
                EngineState::Uninitialized => {}
            }
        }

        info!("Embedding engine not initialized; bootstrapping with defaults");
        self.initialize(self.default_config.clone()).await?;

        self.inner
            .read()
            .await
            .session
            .clone()
            .ok_or(EmbeddingError::NotInitialized)
    }

    fn begin_transition(&self, kind: Transition) -> Result<TransitionGuard<'_>, EmbeddingError> {
        let lock = self.transition.try_lock().map_err(|_| {
            let active = Transition::from_u8(self.active.load(Ordering::SeqCst));
            Transition::contention_error(kind, active)
        })?;
        self.active.store(kind as u8, Ordering::SeqCst);
        Ok(TransitionGuard {
            _lock: lock,
            active: &self.active,
        })
    }

    /// Caller holds the transition lock.
    async fn dispose_locked(&self) {
        let session = {
            let mut inner = self.inner.write().await;
            match inner.session.take() {
                Some(session) => {
                    inner.state = EngineState::Disposing;
                    session
                }
                None => {
                    inner.state = EngineState::Uninitialized;
                    return;
                }
            }
        };

        session.loader.dispose().await;
        self.inner.write().await.state = EngineState::Uninitialized;
        info!(model = %session.descriptor.id, engine = %session.kind, "Engine session disposed");
    }

    /// Caller holds the transition lock and has disposed any live session.
    async fn start_locked(
        &self,
        descriptor: ModelDescriptor,
        strategy: LoaderStrategy,
    ) -> Result<ModelDescriptor, EmbeddingError> {
        {
            let mut inner = self.inner.write().await;
            inner.state = EngineState::Initializing;
            inner.strategy = strategy;
        }

        match self.open_session(&descriptor, strategy).await {
            Ok(session) => {
                info!(
                    model = %descriptor.id,
                    engine = %session.kind,
                    dim = descriptor.dimension,
                    "Embedding engine ready"
                );
                let mut inner = self.inner.write().await;
                inner.session = Some(Arc::new(session));
                inner.state = EngineState::Ready;
                Ok(descriptor)
            }
            Err(e) => {
                error!(model = %descriptor.id, error = %e, "Embedding engine initialization failed");
                self.inner.write().await.state = EngineState::Uninitialized;
                Err(e)
            }
        }
    }

    async fn open_session(
        &self,
        descriptor: &ModelDescriptor,
        strategy: LoaderStrategy,
    ) -> Result<EngineSession, EmbeddingError> {
        match strategy {
            LoaderStrategy::PrimaryOnly => self.try_loader(LoaderKind::Native, descriptor).await,
            LoaderStrategy::FallbackOnly => self.try_loader(LoaderKind::Portable, descriptor).await,
            LoaderStrategy::Auto => {
                let mut failures = Vec::new();

                if descriptor.local_path.is_some() {
                    match self.try_loader(LoaderKind::Native, descriptor).await {
                        Ok(session) => return Ok(session),
                        Err(e) => {
                            warn!(
                                engine = %LoaderKind::Native,
                                model = %descriptor.id,
                                error = %e,
                                "Primary engine failed; falling back"
                            );
                            failures.push(format!("{}: {}", LoaderKind::Native, e));
                        }
                    }
                } else {
                    debug!(model = %descriptor.id, "No local model path; skipping native engine");
                }

                match self.try_loader(LoaderKind::Portable, descriptor).await {
                    Ok(session) => Ok(session),
                    Err(e) => {
                        warn!(
                            engine = %LoaderKind::Portable,
                            model = %descriptor.id,
                            error = %e,
                            "Fallback engine failed"
                        );
                        failures.push(format!("{}: {}", LoaderKind::Portable, e));
                        Err(EmbeddingError::NoUsableEngine { failures })
                    }
                }
            }
        }
    }

    async fn try_loader(
        &self,
        kind: LoaderKind,
        descriptor: &ModelDescriptor,
    ) -> Result<EngineSession, EmbeddingError> {
        let loader = self.factory.create(kind);
        if !loader.is_available() {
            return Err(EmbeddingError::EngineUnavailable(kind));
        }
        if let Err(e) = loader.initialize(descriptor).await {
            loader.dispose().await;
            return Err(e);
        }
        Ok(EngineSession {
            kind,
            descriptor: descriptor.clone(),
            loader: Arc::from(loader),
        })
    }

    fn resolve_descriptor(&self, config: &EngineConfig) -> Result<ModelDescriptor, EmbeddingError> {
        let mut descriptor = if let Some(id) = &config.model_id {
            self.catalog
                .get(id)
                .cloned()
                .ok_or_else(|| EmbeddingError::UnknownModel(id.clone()))?
        } else if let Some(custom) = &config.custom_descriptor {
            custom
                .validate()
                .map_err(|e| EmbeddingError::InvalidInput(e.to_string()))?;
            custom.clone()
        } else if config.auto_select {
            match self.recommend_model(Some(ModelCategory::Embedding)) {
                Some(recommended) => recommended,
                None => {
                    warn!("No compatible embedding model for this device; using default");
                    self.default_descriptor()
                }
            }
        } else {
            self.default_descriptor()
        };

        if descriptor.category != ModelCategory::Embedding {
            return Err(EmbeddingError::InvalidInput(format!(
                "{} is a {} model, not an embedding model",
                descriptor.id, descriptor.category
            )));
        }

        if descriptor.local_path.is_none() {
            if let Some(dir) = &self.local_models_dir {
                let candidate = dir.join(&descriptor.id);
                if has_model_files(&candidate) {
                    debug!(path = ?candidate, "Using pre-installed model files");
                    descriptor.local_path = Some(candidate);
                }
            }
        }

        Ok(descriptor)
    }

    fn default_descriptor(&self) -> ModelDescriptor {
        self.catalog
            .get(DEFAULT_MODEL_ID)
            .cloned()
            .unwrap_or_else(default_descriptor)
    }
}

fn global_slot() -> &'static OnceLock<Arc<EngineManager>> {
    static GLOBAL: OnceLock<Arc<EngineManager>> = OnceLock::new();
    &GLOBAL
}
