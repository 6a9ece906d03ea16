//! Frame-Rate Governor
//!
//! Decides per captured frame whether it is admitted for pose inference,
//! and keeps a rolling measured-FPS statistic that is independent of that
//! decision.
//!
//! # Measurement vs Admission
//!
//! Every call counts toward the current one-second measurement window, so
//! `measured_fps` reflects what the camera delivers. Admission is a separate
//! gate that only lets a frame through once `1 / target_fps` has elapsed
//! since the last admitted frame.
//!
//! ```text
//! frame ──> count in window ──(window >= 1s)──> measured_fps ──> FpsHistory
//!   │
//!   └─────> now - last_admitted >= 1/target ? admit : skip
//! ```
//!
//! All timing is driven by the caller-supplied `Instant`, which keeps the
//! governor deterministic under synthetic timelines.

use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Lowest permitted target frame rate
pub const MIN_TARGET_FPS: u32 = 1;

/// Highest permitted target frame rate
pub const MAX_TARGET_FPS: u32 = 60;

/// Length of one measurement window
pub const MEASUREMENT_WINDOW: Duration = Duration::from_secs(1);

/// Default capacity of the measured-FPS history
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Clamp a requested target into `[MIN_TARGET_FPS, MAX_TARGET_FPS]`
pub fn clamp_target_fps(requested: i64) -> u32 {
    requested.clamp(MIN_TARGET_FPS as i64, MAX_TARGET_FPS as i64) as u32
}

/// Bounded history of measured FPS samples, oldest first
#[derive(Debug, Clone)]
pub struct FpsHistory {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl FpsHistory {
    /// Create an empty history holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest when full
    pub fn push(&mut self, fps: f32) {
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(fps);
    }

    /// Mean of the stored samples, `None` when empty
    pub fn mean(&self) -> Option<f32> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f32 = self.samples.iter().sum();
        Some(sum / self.samples.len() as f32)
    }

    /// Number of stored samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples are stored
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples retained
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all samples
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Samples in arrival order
    pub fn iter(&self) -> impl Iterator<Item = &f32> + '_ {
        self.samples.iter()
    }

    /// Copy of the samples in arrival order
    pub fn to_vec(&self) -> Vec<f32> {
        self.samples.iter().copied().collect()
    }
}

/// Result of feeding one frame to the governor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDecision {
    /// Frame passed the admission gate
    pub admit: bool,
    /// A measurement window closed on this frame, carrying the new FPS
    pub measurement: Option<f32>,
}

/// Counters for monitoring
#[derive(Debug, Clone, Default, Serialize)]
pub struct GovernorStats {
    /// Frames seen by the governor
    pub frames_received: u64,
    /// Frames that passed the admission gate
    pub frames_admitted: u64,
    /// Frames rejected by the admission gate
    pub frames_skipped: u64,
    /// Measurement windows closed
    pub windows_completed: u64,
}

/// Frame-rate governor
pub struct FrameRateGovernor {
    /// Admission target, always within [MIN_TARGET_FPS, MAX_TARGET_FPS]
    target_fps: u32,

    /// Minimum spacing between admitted frames
    target_interval: Duration,

    /// Last admitted frame
    last_admitted: Option<Instant>,

    /// Start of the current measurement window
    window_start: Instant,

    /// Frames counted in the current window
    frames_in_window: u32,

    /// FPS computed at the last window close
    measured_fps: f32,

    /// Rolling measurements, consumed by the auto-tuner
    history: FpsHistory,

    /// When false, closed windows are not recorded into history
    history_enabled: bool,

    stats: GovernorStats,
}

impl FrameRateGovernor {
    /// Create a governor whose first measurement window opens at `now`
    pub fn new(target_fps: u32, history_capacity: usize, now: Instant) -> Self {
        let target_fps = clamp_target_fps(target_fps as i64);
        Self {
            target_fps,
            target_interval: interval_for(target_fps),
            last_admitted: None,
            window_start: now,
            frames_in_window: 0,
            measured_fps: 0.0,
            history: FpsHistory::new(history_capacity),
            history_enabled: true,
            stats: GovernorStats::default(),
        }
    }

    /// Feed one frame arrival
    pub fn on_frame_arrived(&mut self, now: Instant) -> FrameDecision {
        self.stats.frames_received += 1;
        self.frames_in_window += 1;

        let measurement = self.close_window_if_due(now);

        let admit = match self.last_admitted {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.target_interval,
        };

        if admit {
            self.last_admitted = Some(now);
            self.stats.frames_admitted += 1;
        } else {
            self.stats.frames_skipped += 1;
        }

        FrameDecision { admit, measurement }
    }

    /// Count a frame toward measurement without evaluating admission
    ///
    /// Used while pose detection is disabled: the camera rate is still
    /// tracked, but the admission clock is left untouched.
    pub fn on_frame_measured_only(&mut self, now: Instant) -> Option<f32> {
        self.stats.frames_received += 1;
        self.frames_in_window += 1;
        self.close_window_if_due(now)
    }

    fn close_window_if_due(&mut self, now: Instant) -> Option<f32> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < MEASUREMENT_WINDOW {
            return None;
        }

        self.measured_fps = self.frames_in_window as f32 / elapsed.as_secs_f32();
        self.frames_in_window = 0;
        self.window_start = now;
        self.stats.windows_completed += 1;

        if self.history_enabled {
            self.history.push(self.measured_fps);
        }

        trace!(
            "Measurement window closed: {:.1} FPS (history {}/{})",
            self.measured_fps,
            self.history.len(),
            self.history.capacity()
        );

        Some(self.measured_fps)
    }

    /// Current admission target
    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    /// Set the admission target, clamped to [1, 60]
    ///
    /// Returns the value actually applied.
    pub fn set_target_fps(&mut self, requested: i64) -> u32 {
        let fps = clamp_target_fps(requested);
        if fps as i64 != requested {
            debug!("Target FPS {} clamped to {}", requested, fps);
        }
        if fps != self.target_fps {
            debug!("Target FPS changed: {} -> {}", self.target_fps, fps);
        }
        self.target_fps = fps;
        self.target_interval = interval_for(fps);
        fps
    }

    /// FPS computed at the last closed window
    pub fn measured_fps(&self) -> f32 {
        self.measured_fps
    }

    /// Measurement history
    pub fn history(&self) -> &FpsHistory {
        &self.history
    }

    /// Enable or disable recording into history
    ///
    /// Disabling clears the history so that re-enabling starts from a clean
    /// sample window.
    pub fn set_history_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.history.clear();
        }
        self.history_enabled = enabled;
    }

    /// Whether closed windows are recorded into history
    pub fn is_history_enabled(&self) -> bool {
        self.history_enabled
    }

    /// Get statistics
    pub fn stats(&self) -> &GovernorStats {
        &self.stats
    }
}

fn interval_for(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(MIN_TARGET_FPS) as f64)
}
