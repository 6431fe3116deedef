//! Embedding vector value type.

use serde::{Deserialize, Serialize};

/// Vector embedding: an ordered, fixed-length float array.
///
/// Value object. The only link back to the model that produced it is the
/// dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// The embedding vector
    pub values: Vec<f32>,
}

impl Embedding {
    /// Create a new embedding from a vector.
    /// Normalizes the vector to unit length.
    pub fn new(values: Vec<f32>) -> Self {
        let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
        let normalized = if norm > 0.0 {
            values.iter().map(|x| x / norm).collect()
        } else {
            values
        };
        Self { values: normalized }
    }

    /// Create embedding without normalization (for pre-normalized vectors)
    pub fn from_normalized(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Get the embedding dimension
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// True when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }
}

/// Result of `generate_embedding` at the public boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedEmbedding {
    pub vector: Vec<f32>,
    pub dimension: usize,
}

impl From<Embedding> for GeneratedEmbedding {
    fn from(embedding: Embedding) -> Self {
        let dimension = embedding.dimension();
        Self {
            vector: embedding.values,
            dimension,
        }
    }
}
