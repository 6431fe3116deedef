//! Device capability snapshot types.

use serde::{Deserialize, Serialize};

use crate::model::Tier;

/// Broad class of the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformClass {
    Desktop,
    Mobile,
    Tablet,
    Unknown,
}

/// Graphics capability level. Ordered `None < Basic < Accelerated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphicsLevel {
    /// No usable graphics device
    None,
    /// A graphics device exists but no compute backend is usable
    Basic,
    /// CUDA or Metal compute is usable
    Accelerated,
}

/// Whether a signal was read from the host or inferred from other signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    Measured,
    Estimated,
}

/// Detected (or estimated) resources of the running device.
///
/// Computed once per process and shared as an immutable snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    /// System memory in GB
    pub memory_gb: f64,
    /// How `memory_gb` was obtained
    pub memory_source: SignalSource,
    /// Logical CPU cores
    pub cpu_cores: usize,
    /// How `cpu_cores` was obtained
    pub cpu_source: SignalSource,
    /// Graphics capability level
    pub graphics: GraphicsLevel,
    /// Platform class
    pub platform: PlatformClass,
    /// Whether the portable (CPU) runtime can run here
    pub portable_runtime: bool,
    /// Derived performance tier
    pub tier: Tier,
}

impl DeviceCapabilities {
    /// True when a CUDA or Metal compute backend is usable.
    pub fn has_accelerated_graphics(&self) -> bool {
        self.graphics == GraphicsLevel::Accelerated
    }

    /// True when any signal had to be estimated.
    pub fn is_estimated(&self) -> bool {
        self.memory_source == SignalSource::Estimated
            || self.cpu_source == SignalSource::Estimated
    }
}
