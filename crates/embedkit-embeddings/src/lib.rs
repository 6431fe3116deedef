//! # embedkit-embeddings
//!
//! Local embedding generation with automatic model and engine selection.
//!
//! ## Features
//! - Built-in catalog of sentence-embedding and generative models
//! - Device capability detection with a coarse performance tier
//! - Hardware-aware model recommendation
//! - Two candle-backed engines: native (local files, CUDA/Metal when
//!   present) and portable (HuggingFace Hub download, CPU)
//! - [`EngineManager`] with fallback strategies, model switching, and
//!   lazy bootstrap
//!
//! ## Example
//! ```no_run
//! # async fn run() -> Result<(), embedkit_embeddings::EmbeddingError> {
//! use embedkit_embeddings::{EngineConfig, EngineManager};
//! use embedkit_types::Settings;
//!
//! let manager = EngineManager::from_settings(&Settings::default());
//! manager.initialize(EngineConfig::for_model("all-minilm-l6-v2")).await?;
//! let out = manager.generate_embedding("Hello, world!").await?;
//! assert_eq!(out.dimension, 384);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod catalog;
pub mod device;
pub mod encoder;
pub mod error;
pub mod loader;
pub mod manager;
pub mod mock;
pub mod model;
pub mod native;
pub mod portable;
pub mod recommender;

pub use cache::{get_or_download_model, ModelCache, ModelPaths, MODEL_FILES};
pub use catalog::{default_descriptor, CatalogEntry, ModelCatalog, DEFAULT_MODEL_ID};
pub use device::{compute_tier, detect};
pub use encoder::BertEncoder;
pub use error::{EmbeddingError, ErrorKind};
pub use loader::{
    DefaultLoaderFactory, LoaderFactory, LoaderKind, LoaderOptions, ModelLoader,
};
pub use manager::{EngineConfig, EngineManager, EngineSession, EngineState, EngineStatus};
pub use mock::{MockBehavior, MockLoader, MockLoaderFactory};
pub use model::{Embedding, GeneratedEmbedding};
pub use native::NativeLoader;
pub use portable::PortableLoader;
pub use recommender::{ModelRecommender, ScoringWeights};
