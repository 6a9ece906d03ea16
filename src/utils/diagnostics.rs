//! Startup Diagnostics
//!
//! Logs the host environment next to the device classification, so a
//! report of "the pipeline runs at 15 FPS" comes with the tier that chose it.
//!
//! The machine is scanned once, by [`HardwareProfile::detect`]; this module
//! only adds the OS strings sysinfo exposes without a refresh.

use sysinfo::System;
use tracing::info;

use crate::device::{DeviceTier, HardwareProfile};

/// Host environment as seen at startup
#[derive(Debug, Clone)]
pub struct SystemInfo {
    /// Operating system name (e.g., "Ubuntu")
    pub os_name: String,
    /// Operating system version
    pub os_version: String,
    /// Kernel version
    pub kernel_version: String,
    /// Hostname
    pub hostname: String,
    /// Classifier input detected at startup
    pub hardware: HardwareProfile,
}

impl SystemInfo {
    /// Describe the host around an already detected profile
    pub fn from_hardware(hardware: HardwareProfile) -> Self {
        let unknown = || "Unknown".to_string();
        Self {
            os_name: System::name().unwrap_or_else(unknown),
            os_version: System::os_version().unwrap_or_else(unknown),
            kernel_version: System::kernel_version().unwrap_or_else(unknown),
            hostname: System::host_name().unwrap_or_else(unknown),
            hardware,
        }
    }

    /// Detect the hardware and describe the host
    pub fn gather() -> Self {
        Self::from_hardware(HardwareProfile::detect())
    }

    /// Log the host description
    pub fn log(&self) {
        info!("=== Host ===");
        info!("  OS: {} {}", self.os_name, self.os_version);
        info!("  Kernel: {}", self.kernel_version);
        info!("  Hostname: {}", self.hostname);
        info!("  Cores: {}", self.hardware.core_count);
        info!("  Memory: {:.1} GB", self.hardware.memory_gb());
    }
}

/// Log host and device-tier diagnostics on startup
///
/// `tier` is the classification the controller will use; pass `None` when
/// it has not been decided yet.
pub fn log_startup_diagnostics(hardware: &HardwareProfile, tier: Option<DeviceTier>) {
    info!("╔════════════════════════════════════════════════════════════╗");
    info!("║          Startup Diagnostics                              ║");
    info!("╚════════════════════════════════════════════════════════════╝");

    SystemInfo::from_hardware(*hardware).log();

    info!("=== Device Capability ===");
    match tier {
        Some(tier) => {
            let (width, height) = tier.max_resolution().dimensions();
            info!("  Tier: {}", tier);
            info!("  Recommended FPS: {}", tier.recommended_fps());
            info!("  Resolution ceiling: {}x{}", width, height);
        }
        None => info!("  Tier: not classified"),
    }

    info!(
        "  Build: v{} ({})",
        env!("CARGO_PKG_VERSION"),
        if cfg!(debug_assertions) { "debug" } else { "release" }
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hardware_keeps_profile() {
        let hardware = HardwareProfile::new(4, 8_000_000_000);
        let info = SystemInfo::from_hardware(hardware);
        assert_eq!(info.hardware, hardware);
        assert!(!info.os_name.is_empty());
        assert!(!info.hostname.is_empty());
    }

    #[test]
    fn test_gather_reads_real_machine() {
        let info = SystemInfo::gather();
        assert!(info.hardware.core_count > 0);
        assert!(info.hardware.memory_bytes > 0);
    }

    #[test]
    fn test_log_startup_diagnostics_without_subscriber() {
        let hardware = HardwareProfile::new(4, 8_000_000_000);
        log_startup_diagnostics(&hardware, Some(DeviceTier::Medium));
        log_startup_diagnostics(&hardware, None);
    }
}
