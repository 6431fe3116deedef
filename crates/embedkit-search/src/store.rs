//! Storage boundary for stored vectors and the records they belong to.
//!
//! The search component only reads from the store. Persistence is the
//! collaborator's concern; [`InMemoryStore`] covers tests and the CLI.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::SearchError;

/// A vector owned by some record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEmbedding {
    /// Unique vector id
    pub id: String,
    /// Id of the owning record
    pub record_id: String,
    pub vector: Vec<f32>,
    /// Free-form metadata, not interpreted by search
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl StoredEmbedding {
    pub fn new(id: impl Into<String>, record_id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            record_id: record_id.into(),
            vector,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Read access to stored vectors and records.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Record type returned by semantic search
    type Record: Clone + Send + Sync;

    /// Every stored vector.
    async fn embeddings(&self) -> Result<Vec<StoredEmbedding>, SearchError>;

    /// Record by id, `None` if it no longer exists.
    async fn record(&self, id: &str) -> Result<Option<Self::Record>, SearchError>;
}

/// Vectors and records held in memory.
pub struct InMemoryStore<R> {
    embeddings: RwLock<Vec<StoredEmbedding>>,
    records: RwLock<HashMap<String, R>>,
}

impl<R> Default for InMemoryStore<R> {
    fn default() -> Self {
        Self {
            embeddings: RwLock::new(Vec::new()),
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<R: Clone + Send + Sync> InMemoryStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub async fn insert_record(&self, id: impl Into<String>, record: R) {
        self.records.write().await.insert(id.into(), record);
    }

    /// Remove a record. Its vectors stay behind as orphans.
    pub async fn remove_record(&self, id: &str) -> Option<R> {
        self.records.write().await.remove(id)
    }

    /// Append a vector. Insertion order is scan order.
    pub async fn add_embedding(&self, embedding: StoredEmbedding) {
        self.embeddings.write().await.push(embedding);
    }

    pub async fn len(&self) -> usize {
        self.embeddings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.embeddings.read().await.is_empty()
    }

    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl<R: Clone + Send + Sync> EmbeddingStore for InMemoryStore<R> {
    type Record = R;

    async fn embeddings(&self) -> Result<Vec<StoredEmbedding>, SearchError> {
        Ok(self.embeddings.read().await.clone())
    }

    async fn record(&self, id: &str) -> Result<Option<R>, SearchError> {
        Ok(self.records.read().await.get(id).cloned())
    }
}
