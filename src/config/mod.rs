//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - Environment variables (through the CLI)
//! - CLI arguments
//!
//! Every section and field has a default, so a partial file (or none at
//! all) yields a working configuration. Tuning knobs are clamped where they
//! are used; only structurally inconsistent values fail [`Config::validate`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod types;

pub use types::{ConfigOverrides, DeviceConfig, InferenceConfig, LoggingConfig};

use crate::capture::SyntheticCameraConfig;
use crate::performance::{AutoTuneConfig, MAX_TARGET_FPS, MIN_TARGET_FPS};
use crate::pipeline::{ControllerOptions, ControllerSettings};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Controller settings
    #[serde(default)]
    pub controller: ControllerSettings,
    /// Auto-tuner parameters
    #[serde(default)]
    pub auto_tune: AutoTuneConfig,
    /// Device classification
    #[serde(default)]
    pub device: DeviceConfig,
    /// Inference boundary
    #[serde(default)]
    pub inference: InferenceConfig,
    /// Synthetic camera
    #[serde(default)]
    pub capture: SyntheticCameraConfig,
    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let thresholds = &self.device.thresholds;
        if thresholds.medium_min_cores > thresholds.high_min_cores {
            anyhow::bail!(
                "medium_min_cores ({}) cannot be greater than high_min_cores ({})",
                thresholds.medium_min_cores,
                thresholds.high_min_cores
            );
        }
        if thresholds.medium_min_memory_bytes > thresholds.high_min_memory_bytes {
            anyhow::bail!(
                "medium_min_memory_bytes ({}) cannot be greater than high_min_memory_bytes ({})",
                thresholds.medium_min_memory_bytes,
                thresholds.high_min_memory_bytes
            );
        }

        let tune = &self.auto_tune;
        if !(tune.lower_threshold > 0.0 && tune.lower_threshold < tune.raise_threshold) {
            anyhow::bail!(
                "auto_tune thresholds must satisfy 0 < lower ({}) < raise ({})",
                tune.lower_threshold,
                tune.raise_threshold
            );
        }
        if tune.step_fps == 0 {
            anyhow::bail!("auto_tune.step_fps must be positive");
        }
        if !(MIN_TARGET_FPS..=MAX_TARGET_FPS).contains(&tune.floor_fps) {
            anyhow::bail!(
                "auto_tune.floor_fps ({}) must be within [{}, {}]",
                tune.floor_fps,
                MIN_TARGET_FPS,
                MAX_TARGET_FPS
            );
        }
        if tune.history_size == 0 || tune.min_samples > tune.history_size {
            anyhow::bail!(
                "auto_tune.min_samples ({}) must be at most history_size ({}), which must be positive",
                tune.min_samples,
                tune.history_size
            );
        }

        let sim = &self.inference.simulated;
        for (name, rate) in [
            ("failure_rate", sim.failure_rate),
            ("drop_rate", sim.drop_rate),
            ("no_person_rate", sim.no_person_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                anyhow::bail!("inference.simulated.{} must be within [0, 1], got {}", name, rate);
            }
        }

        if self.capture.fps == 0 || self.capture.width == 0 || self.capture.height == 0 {
            anyhow::bail!(
                "Invalid capture settings: {}x{} @ {} FPS",
                self.capture.width,
                self.capture.height,
                self.capture.fps
            );
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" | "json" => {}
            _ => anyhow::bail!("Invalid log format: {}", self.logging.format),
        }

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(fps) = overrides.target_fps {
            self.controller.target_fps = Some(fps);
        }
        if overrides.no_auto_adjust {
            self.controller.auto_adjust_fps = false;
        }
        if overrides.stream_results {
            self.controller.enable_result_streaming = true;
        }
        if overrides.detailed_logging {
            self.controller.enable_detailed_logging = true;
        }
        if let Some(fps) = overrides.camera_fps {
            self.capture.fps = fps;
        }
        if overrides.forced_tier.is_some() {
            self.device.forced_tier = overrides.forced_tier;
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
        if overrides.log_file.is_some() {
            self.logging.file = overrides.log_file;
        }

        self
    }

    /// Options for building a controller from this configuration
    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            settings: self.controller.clone(),
            auto_tune: self.auto_tune.clone(),
            thresholds: self.device.thresholds.clone(),
            forced_tier: self.device.forced_tier,
            max_in_flight_age_ms: Some(self.inference.max_in_flight_age_ms),
        }
    }
}
