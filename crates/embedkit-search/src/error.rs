//! Similarity search error types.

use embedkit_embeddings::{EmbeddingError, ErrorKind};
use thiserror::Error;

/// Errors that can occur during similarity search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Vector has no components
    #[error("Vector is empty")]
    EmptyVector,

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// NaN or infinity at `index`
    #[error("Non-finite value at index {index}")]
    NonFiniteValue { index: usize },

    /// All components are zero
    #[error("Vector has zero norm")]
    ZeroNorm,

    /// Query longer than the accepted maximum
    #[error("Query dimension {actual} exceeds maximum {max}")]
    DimensionTooLarge { actual: usize, max: usize },

    /// Limit or threshold out of range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Storage collaborator failed
    #[error("Store error: {0}")]
    Store(String),

    /// Embedding error
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
}

impl SearchError {
    /// Coarse classification; embedding errors keep their own kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::Embedding(e) => e.kind(),
            SearchError::Store(_) => ErrorKind::Engine,
            _ => ErrorKind::Validation,
        }
    }
}
