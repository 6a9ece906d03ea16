//! Synthetic Camera
//!
//! Paced frame generator. Frames share one preallocated BGRA buffer, so
//! producing a frame costs a refcount bump, not a copy.

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::error::{CaptureError, Result};
use super::{CaptureSource, Frame};

/// Synthetic camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticCameraConfig {
    /// Nominal frame rate
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Frame width
    #[serde(default = "default_width")]
    pub width: u32,

    /// Frame height
    #[serde(default = "default_height")]
    pub height: u32,

    /// Uniform jitter applied to each frame interval (ms)
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: f32,

    /// Drop to `degraded_fps` after this many seconds (thermal emulation)
    #[serde(default)]
    pub degrade_after_secs: Option<u64>,

    /// Frame rate once degraded
    #[serde(default = "default_degraded_fps")]
    pub degraded_fps: u32,

    /// End the stream after this many frames
    #[serde(default)]
    pub max_frames: Option<u64>,

    /// RNG seed for reproducible jitter
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_fps() -> u32 {
    30
}
fn default_width() -> u32 {
    640
}
fn default_height() -> u32 {
    480
}
fn default_jitter_ms() -> f32 {
    1.0
}
fn default_degraded_fps() -> u32 {
    12
}

impl Default for SyntheticCameraConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            width: default_width(),
            height: default_height(),
            jitter_ms: default_jitter_ms(),
            degrade_after_secs: None,
            degraded_fps: default_degraded_fps(),
            max_frames: None,
            seed: None,
        }
    }
}

/// Paced synthetic frame source
pub struct SyntheticCamera {
    config: SyntheticCameraConfig,
    buffer: Bytes,
    rng: StdRng,
    started: Option<Instant>,
    next_deadline: Option<Instant>,
    sequence: u64,
    degraded: bool,
}

impl SyntheticCamera {
    /// Create a camera; fails on a zero frame rate or size
    pub fn new(config: SyntheticCameraConfig) -> Result<Self> {
        if config.fps == 0 || config.degraded_fps == 0 {
            return Err(CaptureError::InvalidConfig(
                "frame rate must be positive".to_string(),
            ));
        }
        if config.width == 0 || config.height == 0 {
            return Err(CaptureError::InvalidConfig(format!(
                "invalid frame size {}x{}",
                config.width, config.height
            )));
        }

        let len = config.width as usize * config.height as usize * 4;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            "Synthetic camera: {}x{} @ {} FPS",
            config.width, config.height, config.fps
        );

        Ok(Self {
            buffer: Bytes::from(vec![0x80u8; len]),
            rng,
            started: None,
            next_deadline: None,
            sequence: 0,
            degraded: false,
            config,
        })
    }

    /// Frame rate currently being produced
    pub fn current_fps(&self) -> u32 {
        if self.degraded {
            self.config.degraded_fps
        } else {
            self.config.fps
        }
    }

    fn frame_interval(&mut self) -> Duration {
        let base = 1.0 / self.current_fps() as f64;
        let jitter = self.config.jitter_ms.max(0.0) as f64 / 1000.0;
        let offset = if jitter > 0.0 {
            self.rng.gen_range(-jitter..=jitter)
        } else {
            0.0
        };
        Duration::from_secs_f64((base + offset).max(0.001))
    }
}

impl CaptureSource for SyntheticCamera {
    fn next_frame(&mut self) -> Result<Frame> {
        if let Some(max) = self.config.max_frames {
            if self.sequence >= max {
                return Err(CaptureError::StreamEnded);
            }
        }

        let now = Instant::now();
        let started = *self.started.get_or_insert(now);

        if let Some(after) = self.config.degrade_after_secs {
            if !self.degraded && now.duration_since(started) >= Duration::from_secs(after) {
                self.degraded = true;
                info!(
                    "Synthetic camera degraded: {} -> {} FPS",
                    self.config.fps, self.config.degraded_fps
                );
            }
        }

        if let Some(deadline) = self.next_deadline {
            if let Some(wait) = deadline.checked_duration_since(now) {
                std::thread::sleep(wait);
            }
        }
        let now = Instant::now();

        let interval = self.frame_interval();
        // Anchor to the deadline to avoid drift; resync if we fell behind
        let resync = now.checked_sub(interval).unwrap_or(now);
        let base = self.next_deadline.unwrap_or(now).max(resync);
        self.next_deadline = Some(base + interval);

        let frame = Frame::new(
            self.sequence,
            self.config.width,
            self.config.height,
            self.buffer.clone(),
        );
        self.sequence += 1;

        if self.sequence % 300 == 0 {
            debug!("Synthetic camera produced {} frames", self.sequence);
        }

        Ok(frame)
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
