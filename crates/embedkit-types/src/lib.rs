//! # embedkit-types
//!
//! Shared domain types for embedkit.
//!
//! - Model descriptors, categories, tiers, and resource requirements
//! - Device capability snapshots
//! - Layered settings
//!
//! ## Usage
//!
//! ```rust
//! use embedkit_types::{ModelDescriptor, Tier};
//!
//! let desc = ModelDescriptor::embedding("m", "Model M", "org/m", 4);
//! assert!(desc.validate().is_ok());
//! assert!(Tier::Low < Tier::High);
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod model;

pub use config::{EngineSettings, LoaderStrategy, SearchSettings, Settings};
pub use device::{DeviceCapabilities, GraphicsLevel, PlatformClass, SignalSource};
pub use error::TypesError;
pub use model::{ModelCategory, ModelDescriptor, ResourceRequirement, Tier};
