//! Controller Settings
//!
//! Every knob here is a continuous tuning input: out-of-range values are
//! clamped by the component that owns them, never rejected.

use serde::{Deserialize, Serialize};

use crate::device::{DeviceTier, TierThresholds};
use crate::inference::MIN_IN_FLIGHT_AGE_MS;
use crate::performance::AutoTuneConfig;

/// Runtime-mutable controller settings
///
/// Read from the `[controller]` TOML section in snake_case. Serialized for
/// the host in the same camelCase shape [`SettingsUpdate`] accepts, and
/// that shape is also accepted on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct ControllerSettings {
    /// Admission target; `None` uses the tier recommendation
    #[serde(default, rename(serialize = "targetFPS"), alias = "targetFPS")]
    pub target_fps: Option<u32>,

    /// Let the auto-tuner move the target
    #[serde(
        default = "default_true",
        rename(serialize = "autoAdjustFPS"),
        alias = "autoAdjustFPS"
    )]
    pub auto_adjust_fps: bool,

    /// Admit frames for pose inference at all
    #[serde(default = "default_true", alias = "enablePoseDetection")]
    pub enable_pose_detection: bool,

    /// Deliver pose results to the host
    #[serde(default, alias = "enableResultStreaming")]
    pub enable_result_streaming: bool,

    /// Pose-result minimum interval (ms, floor 16)
    #[serde(default = "default_result_throttle_ms", alias = "resultThrottleMs")]
    pub result_throttle_ms: u64,

    /// Promote per-frame diagnostics to info level
    #[serde(default, alias = "enableDetailedLogging")]
    pub enable_detailed_logging: bool,

    /// FPS-report change gate (FPS, floor 0.5)
    #[serde(default = "default_fps_change_threshold", alias = "fpsChangeThreshold")]
    pub fps_change_threshold: f32,

    /// FPS-report minimum interval (ms, floor 100)
    #[serde(default = "default_fps_report_throttle_ms", alias = "fpsReportThrottleMs")]
    pub fps_report_throttle_ms: u64,
}

fn default_true() -> bool {
    true
}
fn default_result_throttle_ms() -> u64 {
    100
}
fn default_fps_change_threshold() -> f32 {
    2.0
}
fn default_fps_report_throttle_ms() -> u64 {
    500
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            target_fps: None,
            auto_adjust_fps: true,
            enable_pose_detection: true,
            enable_result_streaming: false,
            result_throttle_ms: default_result_throttle_ms(),
            enable_detailed_logging: false,
            fps_change_threshold: default_fps_change_threshold(),
            fps_report_throttle_ms: default_fps_report_throttle_ms(),
        }
    }
}

/// Partial settings change; `None` fields are left as they are
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    /// New admission target
    #[serde(default, rename = "targetFPS")]
    pub target_fps: Option<i64>,
    /// Toggle auto-adjustment
    #[serde(default, rename = "autoAdjustFPS")]
    pub auto_adjust_fps: Option<bool>,
    /// Toggle pose detection
    #[serde(default)]
    pub enable_pose_detection: Option<bool>,
    /// Toggle result streaming
    #[serde(default)]
    pub enable_result_streaming: Option<bool>,
    /// Pose-result interval
    #[serde(default)]
    pub result_throttle_ms: Option<u64>,
    /// Toggle detailed logging
    #[serde(default)]
    pub enable_detailed_logging: Option<bool>,
    /// FPS-report change gate
    #[serde(default)]
    pub fps_change_threshold: Option<f32>,
    /// FPS-report interval
    #[serde(default)]
    pub fps_report_throttle_ms: Option<u64>,
}

impl SettingsUpdate {
    /// Whether the update changes nothing
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Everything needed to build a controller besides its collaborators
#[derive(Debug, Clone, Default)]
pub struct ControllerOptions {
    /// Initial settings
    pub settings: ControllerSettings,
    /// Auto-tuner parameters
    pub auto_tune: AutoTuneConfig,
    /// Tier classification thresholds
    pub thresholds: TierThresholds,
    /// Skip classification and use this tier
    pub forced_tier: Option<DeviceTier>,
    /// In-flight eviction age (ms); `None` uses the default
    pub max_in_flight_age_ms: Option<u64>,
}

impl ControllerOptions {
    /// Default in-flight eviction age
    pub const DEFAULT_MAX_IN_FLIGHT_AGE_MS: u64 = 2000;

    /// Eviction age after defaulting and clamping
    pub fn in_flight_age_ms(&self) -> u64 {
        self.max_in_flight_age_ms
            .unwrap_or(Self::DEFAULT_MAX_IN_FLIGHT_AGE_MS)
            .max(MIN_IN_FLIGHT_AGE_MS)
    }
}
