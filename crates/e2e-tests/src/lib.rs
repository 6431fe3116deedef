//! End-to-end test infrastructure for embedkit.
//!
//! Provides a shared TestHarness wiring an engine manager backed by mock
//! loaders to an in-memory store, plus helpers for ingesting notes and
//! building synthetic device profiles.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use embedkit_embeddings::{
    compute_tier, EngineConfig, EngineManager, MockLoaderFactory, DEFAULT_MODEL_ID, MODEL_FILES,
};
use embedkit_search::{EmbeddingService, InMemoryStore, StoredEmbedding};
use embedkit_types::{DeviceCapabilities, GraphicsLevel, PlatformClass, SignalSource};

/// A record with a title and a multi-sentence body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub body: String,
}

impl Note {
    pub fn new(id: &str, title: &str, body: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        }
    }

    /// Body split into sentences; each becomes one stored vector.
    pub fn chunks(&self) -> Vec<String> {
        self.body
            .split('.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Factory whose stats record loader activity
    pub factory: MockLoaderFactory,
    pub service: EmbeddingService<InMemoryStore<Note>>,
}

impl TestHarness {
    /// Harness with default mock loaders on a mid-range desktop profile.
    pub fn new() -> Self {
        Self::with_factory(MockLoaderFactory::new())
    }

    pub fn with_factory(factory: MockLoaderFactory) -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let manager = EngineManager::new(Arc::new(factory.clone()))
            .with_capabilities(profile(8.0, 4, GraphicsLevel::None, PlatformClass::Desktop))
            .with_local_models_dir(temp_dir.path().join("models"));
        let service = EmbeddingService::new(Arc::new(manager), Arc::new(InMemoryStore::new()));

        Self {
            _temp_dir: temp_dir,
            factory,
            service,
        }
    }

    pub fn manager(&self) -> &EngineManager {
        self.service.manager()
    }

    pub fn store(&self) -> &InMemoryStore<Note> {
        self.service.store()
    }

    /// Initialize the default catalog model.
    pub async fn start_default(&self) {
        self.service
            .initialize_engine(EngineConfig::for_model(DEFAULT_MODEL_ID))
            .await
            .expect("Failed to initialize engine");
    }

    /// Create `<models>/<id>/` with placeholder model files so the native
    /// loader is attempted for `model_id`.
    pub fn install_local_model(&self, model_id: &str) {
        let dir = self._temp_dir.path().join("models").join(model_id);
        std::fs::create_dir_all(&dir).expect("Failed to create model dir");
        for file in MODEL_FILES {
            std::fs::write(dir.join(file), b"{}").expect("Failed to write model file");
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Embed every note chunk with the active engine and store it.
pub async fn ingest_notes(harness: &TestHarness, notes: &[Note]) {
    for note in notes {
        let chunks = note.chunks();
        let embeddings = harness
            .manager()
            .generate_batch(&chunks)
            .await
            .expect("Failed to embed note");
        for (i, embedding) in embeddings.into_iter().enumerate() {
            let stored = StoredEmbedding::new(
                format!("{}#{}", note.id, i),
                note.id.as_str(),
                embedding.into_values(),
            )
            .with_metadata(serde_json::json!({ "chunk": i }));
            harness.store().add_embedding(stored).await;
        }
        harness
            .store()
            .insert_record(note.id.as_str(), note.clone())
            .await;
    }
}

/// Measured device profile with the tier derived from its signals.
pub fn profile(
    memory_gb: f64,
    cpu_cores: usize,
    graphics: GraphicsLevel,
    platform: PlatformClass,
) -> DeviceCapabilities {
    DeviceCapabilities {
        memory_gb,
        memory_source: SignalSource::Measured,
        cpu_cores,
        cpu_source: SignalSource::Measured,
        graphics,
        platform,
        portable_runtime: true,
        tier: compute_tier(platform, memory_gb, cpu_cores, graphics),
    }
}

/// Notes in three groups on unrelated topics.
pub fn topic_notes() -> Vec<Note> {
    vec![
        Note::new(
            "rust-1",
            "Ownership",
            "Rust ownership ensures memory safety. The borrow checker enforces ownership rules.",
        ),
        Note::new(
            "rust-2",
            "Lifetimes",
            "Lifetimes track how long references are valid. Borrowing rules prevent data races.",
        ),
        Note::new(
            "pasta-1",
            "Carbonara",
            "Classic carbonara uses eggs and pecorino. Cook the pasta al dente.",
        ),
        Note::new(
            "pasta-2",
            "Dough",
            "Fresh pasta dough needs flour and eggs. Knead the dough until smooth.",
        ),
        Note::new(
            "ml-1",
            "Networks",
            "Neural networks learn patterns through layers. Gradient descent tunes the weights.",
        ),
    ]
}
