//! Model descriptors and resource requirements.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::device::GraphicsLevel;
use crate::error::TypesError;

/// What a model produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelCategory {
    /// Sentence/document embedding model
    Embedding,
    /// Text generation model
    Generative,
}

impl fmt::Display for ModelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelCategory::Embedding => write!(f, "embedding"),
            ModelCategory::Generative => write!(f, "generative"),
        }
    }
}

impl std::str::FromStr for ModelCategory {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "embedding" => Ok(ModelCategory::Embedding),
            "generative" => Ok(ModelCategory::Generative),
            other => Err(TypesError::InvalidInput(format!(
                "unknown model category: {other}"
            ))),
        }
    }
}

/// Coarse performance class shared by devices and models.
///
/// Ordered so that `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Low,
    Medium,
    High,
}

impl Tier {
    /// Numeric rank used for tier distance calculations.
    pub fn rank(self) -> u8 {
        match self {
            Tier::Low => 0,
            Tier::Medium => 1,
            Tier::High => 2,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Low => write!(f, "low"),
            Tier::Medium => write!(f, "medium"),
            Tier::High => write!(f, "high"),
        }
    }
}

/// Immutable metadata identifying a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Unique identifier (e.g., "all-minilm-l6-v2")
    pub id: String,
    /// Human readable name
    pub display_name: String,
    /// Where the weights come from (Hugging Face repository id)
    pub source: String,
    /// Output vector dimension
    pub dimension: usize,
    /// Model category
    pub category: ModelCategory,
    /// Whether the weights are quantized
    #[serde(default)]
    pub quantized: bool,
    /// Directory holding the model files on local disk, if any
    #[serde(default)]
    pub local_path: Option<PathBuf>,
}

impl ModelDescriptor {
    /// Create an embedding model descriptor without a local path.
    pub fn embedding(
        id: impl Into<String>,
        display_name: impl Into<String>,
        source: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            source: source.into(),
            dimension,
            category: ModelCategory::Embedding,
            quantized: false,
            local_path: None,
        }
    }

    /// Builder: attach a local model directory.
    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    /// Builder: set the category.
    pub fn with_category(mut self, category: ModelCategory) -> Self {
        self.category = category;
        self
    }

    /// Builder: mark as quantized.
    pub fn quantized(mut self) -> Self {
        self.quantized = true;
        self
    }

    /// Check descriptor invariants.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.id.trim().is_empty() {
            return Err(TypesError::InvalidInput("model id must not be empty".into()));
        }
        if self.dimension == 0 {
            return Err(TypesError::InvalidInput(format!(
                "model {} must have a positive dimension",
                self.id
            )));
        }
        Ok(())
    }
}

/// Hardware needed to run a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequirement {
    /// Minimum system memory in GB
    pub min_memory_gb: f64,
    /// Recommended system memory in GB
    pub recommended_memory_gb: f64,
    /// Minimum CPU core count
    pub min_cpu_cores: usize,
    /// Whether an accelerated graphics device is mandatory
    pub requires_gpu: bool,
    /// Minimum graphics capability level, if any
    #[serde(default)]
    pub min_graphics: Option<GraphicsLevel>,
    /// Estimated size on disk / in memory, MB
    pub estimated_size_mb: u64,
    /// Tier the model targets
    pub tier: Tier,
}
