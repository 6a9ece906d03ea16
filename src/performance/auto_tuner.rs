//! Auto-Tuning Controller
//!
//! Periodically compares the measured FPS history against the current
//! target and nudges the target down when the pipeline is struggling or up
//! when there is headroom, within the bounds set by the device tier.
//!
//! # Algorithm (defaults)
//!
//! ```text
//! every 5s, with >= 5 samples:
//!   efficiency = mean(history) / target
//!   efficiency < 0.80 && target > 15           -> target = max(target - 5, 15)
//!   efficiency > 0.95 && target < recommended  -> target = min(target + 5, recommended)
//! ```
//!
//! The thresholds are asymmetric: the tuner backs off as soon as throughput
//! sags but only climbs when comfortably above the target, which keeps it
//! from hunting between two rates.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::fps_governor::FpsHistory;

/// Configuration for the auto-tuner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoTuneConfig {
    /// Minimum spacing between evaluations (ms)
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,

    /// Capacity of the measured-FPS history
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Samples required before any decision is made
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// FPS change per adjustment
    #[serde(default = "default_step_fps")]
    pub step_fps: u32,

    /// Lowest target the tuner will lower to
    #[serde(default = "default_floor_fps")]
    pub floor_fps: u32,

    /// Efficiency below which the target is lowered
    #[serde(default = "default_lower_threshold")]
    pub lower_threshold: f32,

    /// Efficiency above which the target is raised
    #[serde(default = "default_raise_threshold")]
    pub raise_threshold: f32,
}

fn default_check_interval_ms() -> u64 {
    5000
}
fn default_history_size() -> usize {
    10
}
fn default_min_samples() -> usize {
    5
}
fn default_step_fps() -> u32 {
    5
}
fn default_floor_fps() -> u32 {
    15
}
fn default_lower_threshold() -> f32 {
    0.80
}
fn default_raise_threshold() -> f32 {
    0.95
}

impl Default for AutoTuneConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: default_check_interval_ms(),
            history_size: default_history_size(),
            min_samples: default_min_samples(),
            step_fps: default_step_fps(),
            floor_fps: default_floor_fps(),
            lower_threshold: default_lower_threshold(),
            raise_threshold: default_raise_threshold(),
        }
    }
}

/// Why the target was changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    /// Measured throughput fell short of the target
    PerformanceOptimization,
    /// Measured throughput comfortably met the target
    HeadroomAvailable,
}

impl AdjustmentReason {
    /// Text carried in the host-facing FPS report
    pub fn description(&self) -> &'static str {
        match self {
            Self::PerformanceOptimization => "Performance optimization",
            Self::HeadroomAvailable => "Performance headroom available",
        }
    }
}

impl std::fmt::Display for AdjustmentReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// A target change decided by the tuner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FpsAdjustment {
    /// Target before the change
    pub previous_fps: u32,
    /// Target after the change
    pub new_fps: u32,
    /// Mean of the history that drove the decision
    pub average_fps: f32,
    /// average / previous target
    pub efficiency: f32,
    /// Direction of the change
    pub reason: AdjustmentReason,
}

/// Auto-tuning controller
pub struct AutoTuner {
    config: AutoTuneConfig,

    /// Upper bound for raising the target (tier recommendation)
    ceiling_fps: u32,

    enabled: bool,

    /// Last evaluation that actually inspected the history
    last_check: Option<Instant>,

    adjustments: u64,
}

impl AutoTuner {
    /// Create a tuner bounded above by `ceiling_fps`
    pub fn new(config: AutoTuneConfig, ceiling_fps: u32, enabled: bool) -> Self {
        Self {
            config,
            ceiling_fps,
            enabled,
            last_check: None,
            adjustments: 0,
        }
    }

    /// Evaluate the history and decide whether to change the target
    ///
    /// Self-throttled to one evaluation per `check_interval_ms`. Returns the
    /// adjustment to apply, if any; the caller owns the target.
    pub fn maybe_adjust(
        &mut self,
        now: Instant,
        history: &FpsHistory,
        target_fps: u32,
    ) -> Option<FpsAdjustment> {
        if !self.enabled || history.len() < self.config.min_samples {
            return None;
        }

        let interval = Duration::from_millis(self.config.check_interval_ms);
        if let Some(last) = self.last_check {
            if now.saturating_duration_since(last) < interval {
                return None;
            }
        }
        self.last_check = Some(now);

        let average_fps = history.mean()?;
        let efficiency = average_fps / target_fps.max(1) as f32;
        let floor = self.config.floor_fps;
        let step = self.config.step_fps;

        let (new_fps, reason) = if efficiency < self.config.lower_threshold && target_fps > floor {
            (
                target_fps.saturating_sub(step).max(floor),
                AdjustmentReason::PerformanceOptimization,
            )
        } else if efficiency > self.config.raise_threshold && target_fps < self.ceiling_fps {
            (
                (target_fps + step).min(self.ceiling_fps),
                AdjustmentReason::HeadroomAvailable,
            )
        } else {
            debug!(
                "Auto-tune: no change (avg={:.1}, target={}, efficiency={:.2})",
                average_fps, target_fps, efficiency
            );
            return None;
        };

        self.adjustments += 1;
        info!(
            "Auto-tune: target {} -> {} FPS ({}, avg={:.1}, efficiency={:.2})",
            target_fps, new_fps, reason, average_fps, efficiency
        );

        Some(FpsAdjustment {
            previous_fps: target_fps,
            new_fps,
            average_fps,
            efficiency,
            reason,
        })
    }

    /// Whether automatic adjustment is active
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable/disable automatic adjustment at runtime
    ///
    /// Re-enabling resets the evaluation clock.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled != self.enabled {
            debug!("Auto-tune {}", if enabled { "enabled" } else { "disabled" });
        }
        if enabled && !self.enabled {
            self.last_check = None;
        }
        self.enabled = enabled;
    }

    /// Upper bound for raising the target
    pub fn ceiling_fps(&self) -> u32 {
        self.ceiling_fps
    }

    /// Number of adjustments made so far
    pub fn adjustments(&self) -> u64 {
        self.adjustments
    }

    /// Get configuration
    pub fn config(&self) -> &AutoTuneConfig {
        &self.config
    }
}
