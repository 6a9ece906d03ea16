//! Frame admission and adaptive performance control
//!
//! This module contains the three feedback components that sit between the
//! camera and the pose detector:
//! - **Frame-Rate Governor**: measures camera FPS and gates frame admission
//! - **Auto-Tuner**: re-targets the governor from its measured history
//! - **Output Throttle**: rate-limits events leaving the pipeline
//!
//! # Architecture
//!
//! ```text
//! Camera frame
//!   └─> FrameRateGovernor (measure always, admit at target rate)
//!       ├─> admitted frames -> inference gateway
//!       └─> new measurement
//!           ├─> AutoTuner (may change governor target, always reported)
//!           └─> OutputThrottle[FpsReports]
//! Inference result
//!   └─> OutputThrottle[PoseResults]
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use lamco_pose_governor::performance::{AutoTuneConfig, AutoTuner, FrameRateGovernor};
//! use std::time::Instant;
//!
//! let mut governor = FrameRateGovernor::new(30, 10, Instant::now());
//! let mut tuner = AutoTuner::new(AutoTuneConfig::default(), 60, true);
//!
//! // In the capture callback:
//! let now = Instant::now();
//! let decision = governor.on_frame_arrived(now);
//! if decision.measurement.is_some() {
//!     if let Some(adj) = tuner.maybe_adjust(now, governor.history(), governor.target_fps()) {
//!         governor.set_target_fps(adj.new_fps as i64);
//!     }
//! }
//! if decision.admit {
//!     // Dispatch frame for inference
//! }
//! ```

mod auto_tuner;
mod fps_governor;
mod throttle;

pub use auto_tuner::{AdjustmentReason, AutoTuneConfig, AutoTuner, FpsAdjustment};
pub use fps_governor::{
    clamp_target_fps, FpsHistory, FrameDecision, FrameRateGovernor, GovernorStats,
    DEFAULT_HISTORY_CAPACITY, MAX_TARGET_FPS, MEASUREMENT_WINDOW, MIN_TARGET_FPS,
};
pub use throttle::{OutputThrottle, ThrottleClass, ThrottleStats};
