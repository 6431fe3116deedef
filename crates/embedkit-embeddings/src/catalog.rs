//! Read-only model catalog.
//!
//! Built once and never mutated, so it can be shared across engines without
//! locking.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use embedkit_types::{
    GraphicsLevel, ModelCategory, ModelDescriptor, ResourceRequirement, Tier,
};

/// Id of the model used when nothing else is configured.
pub const DEFAULT_MODEL_ID: &str = "all-minilm-l6-v2";

/// One catalog row.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub descriptor: ModelDescriptor,
    pub requirements: Option<ResourceRequirement>,
}

impl CatalogEntry {
    pub fn new(descriptor: ModelDescriptor, requirements: ResourceRequirement) -> Self {
        Self {
            descriptor,
            requirements: Some(requirements),
        }
    }

    /// Entry with no declared requirements.
    pub fn unconstrained(descriptor: ModelDescriptor) -> Self {
        Self {
            descriptor,
            requirements: None,
        }
    }
}

/// Mapping of model id to descriptor, iterated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    entries: Vec<CatalogEntry>,
    by_id: HashMap<String, usize>,
}

impl ModelCatalog {
    /// Build a catalog. A repeated id keeps its first position and the last
    /// definition.
    pub fn new(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let mut catalog = Self::default();
        for entry in entries {
            match catalog.by_id.get(&entry.descriptor.id) {
                Some(&idx) => catalog.entries[idx] = entry,
                None => {
                    catalog
                        .by_id
                        .insert(entry.descriptor.id.clone(), catalog.entries.len());
                    catalog.entries.push(entry);
                }
            }
        }
        catalog
    }

    /// Process-wide built-in catalog.
    pub fn builtin() -> Arc<ModelCatalog> {
        static BUILTIN: OnceLock<Arc<ModelCatalog>> = OnceLock::new();
        BUILTIN
            .get_or_init(|| Arc::new(ModelCatalog::new(builtin_entries())))
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<&ModelDescriptor> {
        self.entry(id).map(|e| &e.descriptor)
    }

    pub fn requirements(&self, id: &str) -> Option<&ResourceRequirement> {
        self.entry(id).and_then(|e| e.requirements.as_ref())
    }

    pub fn entry(&self, id: &str) -> Option<&CatalogEntry> {
        self.by_id.get(id).map(|&idx| &self.entries[idx])
    }

    pub fn list_all(&self) -> Vec<&ModelDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    pub fn list_by_category(&self, category: ModelCategory) -> Vec<&ModelDescriptor> {
        self.entries
            .iter()
            .map(|e| &e.descriptor)
            .filter(|d| d.category == category)
            .collect()
    }

    /// Entries in catalog order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fallback descriptor when neither an id nor a recommendation applies.
pub fn default_descriptor() -> ModelDescriptor {
    ModelCatalog::builtin()
        .get(DEFAULT_MODEL_ID)
        .cloned()
        .unwrap_or_else(|| {
            ModelDescriptor::embedding(
                DEFAULT_MODEL_ID,
                "all-MiniLM-L6-v2",
                "sentence-transformers/all-MiniLM-L6-v2",
                384,
            )
        })
}

fn requirement(
    min_memory_gb: f64,
    recommended_memory_gb: f64,
    min_cpu_cores: usize,
    estimated_size_mb: u64,
    tier: Tier,
) -> ResourceRequirement {
    ResourceRequirement {
        min_memory_gb,
        recommended_memory_gb,
        min_cpu_cores,
        requires_gpu: false,
        min_graphics: None,
        estimated_size_mb,
        tier,
    }
}

fn builtin_entries() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry::new(
            ModelDescriptor::embedding(
                "all-minilm-l6-v2",
                "all-MiniLM-L6-v2",
                "sentence-transformers/all-MiniLM-L6-v2",
                384,
            ),
            requirement(1.0, 2.0, 1, 90, Tier::Low),
        ),
        CatalogEntry::new(
            ModelDescriptor::embedding(
                "bge-small-en-v1.5",
                "BGE Small EN v1.5",
                "BAAI/bge-small-en-v1.5",
                384,
            ),
            requirement(1.0, 2.0, 2, 133, Tier::Low),
        ),
        CatalogEntry::new(
            ModelDescriptor::embedding(
                "bge-base-en-v1.5",
                "BGE Base EN v1.5",
                "BAAI/bge-base-en-v1.5",
                768,
            ),
            requirement(2.0, 4.0, 4, 438, Tier::Medium),
        ),
        CatalogEntry::new(
            ModelDescriptor::embedding(
                "bge-large-en-v1.5",
                "BGE Large EN v1.5",
                "BAAI/bge-large-en-v1.5",
                1024,
            ),
            requirement(4.0, 8.0, 4, 1340, Tier::High),
        ),
        CatalogEntry::new(
            ModelDescriptor::embedding(
                "tinyllama-1.1b-chat",
                "TinyLlama 1.1B Chat",
                "TinyLlama/TinyLlama-1.1B-Chat-v1.0",
                2048,
            )
            .with_category(ModelCategory::Generative),
            requirement(4.0, 8.0, 4, 2200, Tier::High),
        ),
        CatalogEntry::new(
            ModelDescriptor::embedding(
                "mistral-7b-q4",
                "Mistral 7B Instruct (Q4)",
                "TheBloke/Mistral-7B-Instruct-v0.2-GGUF",
                4096,
            )
            .with_category(ModelCategory::Generative)
            .quantized(),
            ResourceRequirement {
                requires_gpu: true,
                min_graphics: Some(GraphicsLevel::Accelerated),
                ..requirement(8.0, 16.0, 8, 4370, Tier::High)
            },
        ),
    ]
}
