//! Embedding error types.

use thiserror::Error;

use crate::loader::LoaderKind;

/// Coarse error class, so callers can tell bad input from engine failure
/// from out-of-order calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-fixable input problem
    Validation,
    /// The system could not produce an embedding
    Engine,
    /// Operation called out of order or during a transition
    State,
}

/// Errors that can occur during embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Candle model error
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    /// Tokenizer error
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Model file not found
    #[error("Model file not found: {0}")]
    ModelNotFound(String),

    /// Unknown catalog id
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Download error
    #[error("Failed to download model: {0}")]
    Download(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Output length differs from the descriptor's dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Loader cannot run on this host
    #[error("{0} engine is not available")]
    EngineUnavailable(LoaderKind),

    /// Loader failed to construct or run
    #[error("{engine} engine failed: {message}")]
    Engine { engine: LoaderKind, message: String },

    /// Every engine allowed by the strategy failed
    #[error("No usable embedding engine: {}", .failures.join("; "))]
    NoUsableEngine { failures: Vec<String> },

    /// Operation requires an initialized session
    #[error("Embedding engine is not initialized")]
    NotInitialized,

    /// Initialization already in progress
    #[error("Embedding engine is already initializing")]
    AlreadyInitializing,

    /// Another session transition is in progress
    #[error("Embedding engine is busy: {0}")]
    Busy(String),

    /// Blocking task failed to complete
    #[error("Task error: {0}")]
    Task(String),
}

impl EmbeddingError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EmbeddingError::InvalidInput(_) | EmbeddingError::UnknownModel(_) => {
                ErrorKind::Validation
            }
            EmbeddingError::NotInitialized
            | EmbeddingError::AlreadyInitializing
            | EmbeddingError::Busy(_) => ErrorKind::State,
            _ => ErrorKind::Engine,
        }
    }

    pub(crate) fn engine(engine: LoaderKind, message: impl Into<String>) -> Self {
        EmbeddingError::Engine {
            engine,
            message: message.into(),
        }
    }
}
