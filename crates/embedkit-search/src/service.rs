//! Library facade over the engine manager and a store.

use std::sync::Arc;

use embedkit_embeddings::{
    EmbeddingError, EngineConfig, EngineManager, EngineStatus, GeneratedEmbedding,
};
use embedkit_types::{DeviceCapabilities, ModelCategory, ModelDescriptor, SearchSettings, Settings};
use tracing::info;

use crate::error::SearchError;
use crate::search::{self, RecordMatch, SimilarityMatch};
use crate::store::EmbeddingStore;

/// Embedding generation and retrieval over one store.
pub struct EmbeddingService<S> {
    manager: Arc<EngineManager>,
    store: Arc<S>,
    defaults: SearchSettings,
}

impl<S: EmbeddingStore> EmbeddingService<S> {
    pub fn new(manager: Arc<EngineManager>, store: Arc<S>) -> Self {
        Self {
            manager,
            store,
            defaults: SearchSettings::default(),
        }
    }

    /// Service with real engines configured from `settings`.
    pub fn from_settings(settings: &Settings, store: Arc<S>) -> Self {
        Self::new(Arc::new(EngineManager::from_settings(settings)), store)
            .with_search_settings(settings.search.clone())
    }

    pub fn with_search_settings(mut self, defaults: SearchSettings) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn manager(&self) -> &Arc<EngineManager> {
        &self.manager
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn initialize_engine(
        &self,
        config: EngineConfig,
    ) -> Result<ModelDescriptor, EmbeddingError> {
        let descriptor = self.manager.initialize(config).await?;
        info!(model = %descriptor.id, "Embedding service ready");
        Ok(descriptor)
    }

    pub async fn generate_embedding(&self, text: &str) -> Result<GeneratedEmbedding, EmbeddingError> {
        self.manager.generate_embedding(text).await
    }

    pub async fn switch_model(&self, model_id: &str) -> Result<ModelDescriptor, EmbeddingError> {
        self.manager.switch_model(model_id).await
    }

    pub async fn current_model(&self) -> Option<ModelDescriptor> {
        self.manager.current_model().await
    }

    pub async fn status(&self) -> EngineStatus {
        self.manager.status().await
    }

    pub fn list_models(&self, category: Option<ModelCategory>) -> Vec<ModelDescriptor> {
        self.manager.list_models(category)
    }

    pub fn detect_device_capabilities(&self) -> DeviceCapabilities {
        self.manager.capabilities().clone()
    }

    pub fn recommend_model(&self, category: Option<ModelCategory>) -> Option<ModelDescriptor> {
        self.manager.recommend_model(category)
    }

    pub async fn search_similar(
        &self,
        query: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<SimilarityMatch>, SearchError> {
        search::search_similar(self.store.as_ref(), query, limit, min_similarity).await
    }

    pub async fn semantic_search(
        &self,
        text: &str,
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<RecordMatch<S::Record>>, SearchError> {
        search::semantic_search(&self.manager, self.store.as_ref(), text, limit, min_similarity)
            .await
    }

    /// Semantic search with the configured limit and threshold.
    pub async fn semantic_search_default(
        &self,
        text: &str,
    ) -> Result<Vec<RecordMatch<S::Record>>, SearchError> {
        self.semantic_search(text, self.defaults.default_limit, self.defaults.min_similarity)
            .await
    }

    pub async fn dispose(&self) -> Result<(), EmbeddingError> {
        self.manager.dispose().await
    }
}
