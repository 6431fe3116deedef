//! # embedkit-search
//!
//! Vector similarity search for embedkit.
//!
//! Stored vectors are scanned exhaustively and ranked by cosine similarity.
//! Semantic search embeds the query text through the
//! [`EngineManager`](embedkit_embeddings::EngineManager) and ranks records by
//! the mean similarity of their vectors.
//!
//! ## Features
//! - Cosine similarity with typed errors for empty, mismatched, non-finite,
//!   and zero-norm vectors
//! - [`EmbeddingStore`] storage boundary with an in-memory implementation
//! - [`EmbeddingService`] facade over engine management and search

pub mod error;
pub mod search;
pub mod service;
pub mod similarity;
pub mod store;

pub use error::SearchError;
pub use search::{
    scan, search_similar, semantic_search, validate_params, validate_query, RecordMatch,
    SimilarityMatch, MAX_QUERY_DIMENSION,
};
pub use service::EmbeddingService;
pub use similarity::{cosine_similarity, validate_vector};
pub use store::{EmbeddingStore, InMemoryStore, StoredEmbedding};
