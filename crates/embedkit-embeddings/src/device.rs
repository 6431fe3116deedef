//! Device capability detection.
//!
//! Every hardware signal is optional. A signal that cannot be read is
//! estimated from the others and marked [`SignalSource::Estimated`].

use std::path::Path;
use std::sync::OnceLock;

use embedkit_types::{DeviceCapabilities, GraphicsLevel, PlatformClass, SignalSource, Tier};
use tracing::{debug, info};

/// Core count assumed when the host does not report one.
pub const ESTIMATED_CPU_CORES: usize = 2;

/// Raw host readings before estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct HostSignals {
    pub memory_gb: Option<f64>,
    pub cpu_cores: Option<usize>,
    pub graphics: Option<GraphicsLevel>,
    pub platform: PlatformClass,
}

/// Detect capabilities once per process. Later calls return the cached snapshot.
pub fn detect() -> &'static DeviceCapabilities {
    static CAPABILITIES: OnceLock<DeviceCapabilities> = OnceLock::new();
    CAPABILITIES.get_or_init(|| {
        let signals = read_host_signals();
        debug!(?signals, "Read host signals");
        let caps = capabilities_from_signals(&signals);
        info!(
            memory_gb = caps.memory_gb,
            cores = caps.cpu_cores,
            graphics = ?caps.graphics,
            platform = ?caps.platform,
            tier = %caps.tier,
            estimated = caps.is_estimated(),
            "Detected device capabilities"
        );
        caps
    })
}

/// Build a capability snapshot from raw signals, estimating gaps.
pub fn capabilities_from_signals(signals: &HostSignals) -> DeviceCapabilities {
    let (cpu_cores, cpu_source) = match signals.cpu_cores {
        Some(cores) if cores > 0 => (cores, SignalSource::Measured),
        _ => (ESTIMATED_CPU_CORES, SignalSource::Estimated),
    };

    let (memory_gb, memory_source) = match signals.memory_gb {
        Some(gb) if gb.is_finite() && gb > 0.0 => (gb, SignalSource::Measured),
        _ => (estimate_memory_gb(cpu_cores), SignalSource::Estimated),
    };

    let graphics = signals.graphics.unwrap_or(GraphicsLevel::None);

    DeviceCapabilities {
        memory_gb,
        memory_source,
        cpu_cores,
        cpu_source,
        graphics,
        platform: signals.platform,
        portable_runtime: true,
        tier: compute_tier(signals.platform, memory_gb, cpu_cores, graphics),
    }
}

/// Conservative memory guess from the core count.
pub fn estimate_memory_gb(cpu_cores: usize) -> f64 {
    if cpu_cores >= 8 {
        8.0
    } else if cpu_cores >= 4 {
        4.0
    } else {
        2.0
    }
}

/// Derive a tier from capability signals. Pure.
///
/// Memory, cores, and graphics each add points; the platform then caps the
/// result.
pub fn compute_tier(
    platform: PlatformClass,
    memory_gb: f64,
    cpu_cores: usize,
    graphics: GraphicsLevel,
) -> Tier {
    let memory_points = if memory_gb >= 16.0 {
        3
    } else if memory_gb >= 8.0 {
        2
    } else if memory_gb >= 4.0 {
        1
    } else {
        0
    };
    let cpu_points = if cpu_cores >= 8 {
        2
    } else if cpu_cores >= 4 {
        1
    } else {
        0
    };
    let graphics_points = match graphics {
        GraphicsLevel::Accelerated => 2,
        GraphicsLevel::Basic => 1,
        GraphicsLevel::None => 0,
    };

    let score = memory_points + cpu_points + graphics_points;
    let tier = if score >= 5 {
        Tier::High
    } else if score >= 3 {
        Tier::Medium
    } else {
        Tier::Low
    };

    tier.min(platform_ceiling(platform, memory_gb))
}

fn platform_ceiling(platform: PlatformClass, memory_gb: f64) -> Tier {
    match platform {
        PlatformClass::Desktop => Tier::High,
        PlatformClass::Mobile if memory_gb < 4.0 => Tier::Low,
        PlatformClass::Mobile | PlatformClass::Tablet | PlatformClass::Unknown => Tier::Medium,
    }
}

fn read_host_signals() -> HostSignals {
    HostSignals {
        memory_gb: read_memory_gb(),
        cpu_cores: std::thread::available_parallelism().ok().map(|n| n.get()),
        graphics: Some(read_graphics_level()),
        platform: platform_for_os(std::env::consts::OS),
    }
}

/// Map a target OS name to a platform class.
pub fn platform_for_os(os: &str) -> PlatformClass {
    match os {
        "linux" | "macos" | "windows" | "freebsd" | "netbsd" | "openbsd" | "dragonfly" => {
            PlatformClass::Desktop
        }
        "android" | "ios" => PlatformClass::Mobile,
        _ => PlatformClass::Unknown,
    }
}

fn read_graphics_level() -> GraphicsLevel {
    if candle_core::utils::cuda_is_available() || candle_core::utils::metal_is_available() {
        GraphicsLevel::Accelerated
    } else if Path::new("/dev/dri").exists() {
        GraphicsLevel::Basic
    } else {
        GraphicsLevel::None
    }
}

fn read_memory_gb() -> Option<f64> {
    let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
    parse_meminfo_total_gb(&meminfo)
}

/// Parse `MemTotal` from `/proc/meminfo` contents.
pub fn parse_meminfo_total_gb(meminfo: &str) -> Option<f64> {
    let line = meminfo.lines().find(|l| l.starts_with("MemTotal:"))?;
    let kb: f64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(memory_gb: Option<f64>, cpu_cores: Option<usize>) -> HostSignals {
        HostSignals {
            memory_gb,
            cpu_cores,
            graphics: None,
            platform: PlatformClass::Desktop,
        }
    }

    #[test]
    fn test_tier_thresholds_desktop() {
        let d = PlatformClass::Desktop;
        assert_eq!(compute_tier(d, 2.0, 2, GraphicsLevel::None), Tier::Low);
        assert_eq!(compute_tier(d, 8.0, 4, GraphicsLevel::None), Tier::Medium);
        assert_eq!(compute_tier(d, 16.0, 8, GraphicsLevel::None), Tier::High);
        assert_eq!(compute_tier(d, 8.0, 4, GraphicsLevel::Accelerated), Tier::High);
    }

    #[test]
    fn test_mobile_and_tablet_capped() {
        let strong = (32.0, 16, GraphicsLevel::Accelerated);
        assert_eq!(
            compute_tier(PlatformClass::Mobile, strong.0, strong.1, strong.2),
            Tier::Medium
        );
        assert_eq!(
            compute_tier(PlatformClass::Tablet, strong.0, strong.1, strong.2),
            Tier::Medium
        );
        assert_eq!(
            compute_tier(PlatformClass::Mobile, 3.0, 8, GraphicsLevel::Accelerated),
            Tier::Low
        );
        assert_eq!(
            compute_tier(PlatformClass::Desktop, strong.0, strong.1, strong.2),
            Tier::High
        );
    }

    #[test]
    fn test_missing_memory_is_estimated_from_cores() {
        let caps = capabilities_from_signals(&signals(None, Some(8)));
        assert_eq!(caps.memory_gb, 8.0);
        assert_eq!(caps.memory_source, SignalSource::Estimated);
        assert_eq!(caps.cpu_source, SignalSource::Measured);

        let caps = capabilities_from_signals(&signals(None, Some(4)));
        assert_eq!(caps.memory_gb, 4.0);
    }

    #[test]
    fn test_missing_everything_is_conservative() {
        let caps = capabilities_from_signals(&signals(None, None));
        assert_eq!(caps.cpu_cores, ESTIMATED_CPU_CORES);
        assert_eq!(caps.memory_gb, 2.0);
        assert_eq!(caps.graphics, GraphicsLevel::None);
        assert_eq!(caps.tier, Tier::Low);
        assert!(caps.is_estimated());
    }

    #[test]
    fn test_measured_signals_kept() {
        let caps = capabilities_from_signals(&signals(Some(15.5), Some(12)));
        assert_eq!(caps.memory_gb, 15.5);
        assert_eq!(caps.cpu_cores, 12);
        assert!(!caps.is_estimated());
        assert_eq!(caps.tier, Tier::Medium);
    }

    #[test]
    fn test_parse_meminfo() {
        let sample = "MemTotal:       16777216 kB\nMemFree:         1234 kB\n";
        assert_eq!(parse_meminfo_total_gb(sample), Some(16.0));
        assert_eq!(parse_meminfo_total_gb("MemFree: 1 kB"), None);
    }

    #[test]
    fn test_platform_for_os() {
        assert_eq!(platform_for_os("linux"), PlatformClass::Desktop);
        assert_eq!(platform_for_os("android"), PlatformClass::Mobile);
        assert_eq!(platform_for_os("wasi"), PlatformClass::Unknown);
    }

    #[test]
    fn test_detect_is_cached() {
        let first = detect();
        let second = detect();
        assert!(std::ptr::eq(first, second));
        assert!(first.cpu_cores > 0);
    }
}
