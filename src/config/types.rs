//! Configuration section types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::device::{DeviceTier, TierThresholds};
use crate::inference::SimulatedGatewayConfig;

/// Device classification configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Skip hardware classification and use this tier
    #[serde(default)]
    pub forced_tier: Option<DeviceTier>,

    /// Classification thresholds
    #[serde(default)]
    pub thresholds: TierThresholds,
}

/// Inference boundary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Drop in-flight records older than this (ms, floor 100)
    #[serde(default = "default_max_in_flight_age_ms")]
    pub max_in_flight_age_ms: u64,

    /// Simulated detector parameters
    #[serde(default)]
    pub simulated: SimulatedGatewayConfig,
}

fn default_max_in_flight_age_ms() -> u64 {
    2000
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_in_flight_age_ms: default_max_in_flight_age_ms(),
            simulated: SimulatedGatewayConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("pretty", "compact", "json")
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Also write logs to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

/// Command-line overrides applied on top of the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Admission target
    pub target_fps: Option<u32>,
    /// Disable auto-adjustment
    pub no_auto_adjust: bool,
    /// Enable pose-result streaming
    pub stream_results: bool,
    /// Enable detailed per-frame logging
    pub detailed_logging: bool,
    /// Synthetic camera frame rate
    pub camera_fps: Option<u32>,
    /// Force a device tier
    pub forced_tier: Option<DeviceTier>,
    /// Log format
    pub log_format: Option<String>,
    /// Log file
    pub log_file: Option<PathBuf>,
}
