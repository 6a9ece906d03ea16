//! Device Capability Tiers
//!
//! Maps coarse hardware facts (logical core count, installed memory) to a
//! [`DeviceTier`]. The tier bounds how far the auto-tuner may raise the
//! target frame rate and suggests a capture resolution ceiling.
//!
//! # Default Policy
//!
//! | Tier | Cores | Memory | Recommended FPS | Resolution |
//! |------|-------|--------|-----------------|------------|
//! | High | >= 6 | >= 4 GB | 60 | 1920x1080 |
//! | Medium | >= 4 | >= 3 GB | 30 | 1280x720 |
//! | Low | otherwise | | 15 | 640x480 |
//! | Unknown | probe failed | | 30 | 1280x720 |
//!
//! Thresholds live in [`TierThresholds`] so they can be recalibrated per
//! platform from the `[device]` config section.

use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::{debug, info};

/// Coarse device capability classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceTier {
    /// Plenty of cores and memory, can sustain 60 FPS inference
    High,
    /// Mid-range device
    Medium,
    /// Constrained device
    Low,
    /// Hardware facts were unavailable
    Unknown,
}

impl DeviceTier {
    /// Recommended target frame rate for this tier
    pub fn recommended_fps(&self) -> u32 {
        match self {
            Self::High => 60,
            Self::Medium => 30,
            Self::Low => 15,
            Self::Unknown => 30,
        }
    }

    /// Capture resolution ceiling for this tier
    pub fn max_resolution(&self) -> ResolutionClass {
        match self {
            Self::High => ResolutionClass::High,
            Self::Medium | Self::Unknown => ResolutionClass::Medium,
            Self::Low => ResolutionClass::Low,
        }
    }
}

impl std::fmt::Display for DeviceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for DeviceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" | "mid" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("Unknown device tier: {}", s)),
        }
    }
}

/// Capture resolution ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionClass {
    /// 1080p
    High,
    /// 720p
    Medium,
    /// VGA
    Low,
}

impl ResolutionClass {
    /// Nominal capture dimensions (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::High => (1920, 1080),
            Self::Medium => (1280, 720),
            Self::Low => (640, 480),
        }
    }
}

/// Classification thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierThresholds {
    /// Minimum logical cores for the high tier
    #[serde(default = "default_high_min_cores")]
    pub high_min_cores: usize,

    /// Minimum memory (bytes) for the high tier
    #[serde(default = "default_high_min_memory")]
    pub high_min_memory_bytes: u64,

    /// Minimum logical cores for the medium tier
    #[serde(default = "default_medium_min_cores")]
    pub medium_min_cores: usize,

    /// Minimum memory (bytes) for the medium tier
    #[serde(default = "default_medium_min_memory")]
    pub medium_min_memory_bytes: u64,
}

fn default_high_min_cores() -> usize {
    6
}
fn default_high_min_memory() -> u64 {
    4_000_000_000
}
fn default_medium_min_cores() -> usize {
    4
}
fn default_medium_min_memory() -> u64 {
    3_000_000_000
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            high_min_cores: default_high_min_cores(),
            high_min_memory_bytes: default_high_min_memory(),
            medium_min_cores: default_medium_min_cores(),
            medium_min_memory_bytes: default_medium_min_memory(),
        }
    }
}

/// Classify a device from its core count and memory size
///
/// Pure and deterministic. A zero core count or zero memory means the probe
/// could not read that fact, which yields [`DeviceTier::Unknown`].
pub fn classify(core_count: usize, memory_bytes: u64, thresholds: &TierThresholds) -> DeviceTier {
    if core_count == 0 || memory_bytes == 0 {
        return DeviceTier::Unknown;
    }

    if core_count >= thresholds.high_min_cores && memory_bytes >= thresholds.high_min_memory_bytes
    {
        DeviceTier::High
    } else if core_count >= thresholds.medium_min_cores
        && memory_bytes >= thresholds.medium_min_memory_bytes
    {
        DeviceTier::Medium
    } else {
        DeviceTier::Low
    }
}

/// Hardware facts fed to the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareProfile {
    /// Logical CPU cores (0 = unknown)
    pub core_count: usize,
    /// Installed memory in bytes (0 = unknown)
    pub memory_bytes: u64,
}

impl HardwareProfile {
    /// Build a profile from known values
    pub fn new(core_count: usize, memory_bytes: u64) -> Self {
        Self {
            core_count,
            memory_bytes,
        }
    }

    /// Probe the running machine
    ///
    /// Refreshes only CPU and memory; processes, disks and networks are
    /// never scanned.
    pub fn detect() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();

        let profile = Self {
            core_count: sys.cpus().len(),
            memory_bytes: sys.total_memory(),
        };

        debug!(
            "Hardware probe: {} cores, {:.1} GB",
            profile.core_count,
            profile.memory_gb()
        );

        profile
    }

    /// Memory in (decimal) gigabytes
    pub fn memory_gb(&self) -> f64 {
        self.memory_bytes as f64 / 1_000_000_000.0
    }

    /// Classify this profile
    pub fn classify(&self, thresholds: &TierThresholds) -> DeviceTier {
        let tier = classify(self.core_count, self.memory_bytes, thresholds);
        info!(
            "Device tier: {} ({} cores, {:.1} GB, recommended {} FPS)",
            tier,
            self.core_count,
            self.memory_gb(),
            tier.recommended_fps()
        );
        tier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GB: u64 = 1_000_000_000;

    #[test]
    fn test_classify_default_policy() {
        let t = TierThresholds::default();
        assert_eq!(classify(8, 8 * GB, &t), DeviceTier::High);
        assert_eq!(classify(6, 4 * GB, &t), DeviceTier::High);
        assert_eq!(classify(6, 3 * GB, &t), DeviceTier::Medium);
        assert_eq!(classify(4, 3 * GB, &t), DeviceTier::Medium);
        assert_eq!(classify(4, 2 * GB, &t), DeviceTier::Low);
        assert_eq!(classify(2, 16 * GB, &t), DeviceTier::Low);
    }

    #[test]
    fn test_classify_missing_information() {
        let t = TierThresholds::default();
        assert_eq!(classify(0, 8 * GB, &t), DeviceTier::Unknown);
        assert_eq!(classify(8, 0, &t), DeviceTier::Unknown);
    }

    #[test]
    fn test_recommended_fps() {
        assert_eq!(DeviceTier::High.recommended_fps(), 60);
        assert_eq!(DeviceTier::Medium.recommended_fps(), 30);
        assert_eq!(DeviceTier::Low.recommended_fps(), 15);
        assert_eq!(DeviceTier::Unknown.recommended_fps(), 30);
    }

    #[test]
    fn test_custom_thresholds() {
        let t = TierThresholds {
            high_min_cores: 12,
            high_min_memory_bytes: 16 * GB,
            medium_min_cores: 8,
            medium_min_memory_bytes: 8 * GB,
        };
        assert_eq!(classify(8, 8 * GB, &t), DeviceTier::Medium);
        assert_eq!(classify(6, 8 * GB, &t), DeviceTier::Low);
    }

    #[test]
    fn test_tier_from_str() {
        assert_eq!("HIGH".parse::<DeviceTier>().unwrap(), DeviceTier::High);
        assert_eq!("mid".parse::<DeviceTier>().unwrap(), DeviceTier::Medium);
        assert!("ultra".parse::<DeviceTier>().is_err());
    }

    #[test]
    fn test_resolution_ceiling() {
        assert_eq!(DeviceTier::Low.max_resolution().dimensions(), (640, 480));
        assert_eq!(
            DeviceTier::Unknown.max_resolution(),
            ResolutionClass::Medium
        );
    }

    #[test]
    fn test_detect_reports_hardware() {
        let profile = HardwareProfile::detect();
        assert!(profile.core_count > 0);
        assert!(profile.memory_bytes > 0);
    }
}
