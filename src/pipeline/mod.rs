//! Pose Pipeline Controller
//!
//! Wires the performance components to the capture and inference
//! boundaries and to the host.
//!
//! - [`PipelineController`]: owned state and the per-event operations
//!   (frame arrival, inference completion, runtime settings, snapshot)
//! - [`ControllerQueue`] / [`ControllerHandle`]: the serial context the
//!   controller runs in when frames and completions come from different
//!   threads
//! - [`HostEvent`] / [`EventSink`]: what leaves the pipeline and where it goes
//!
//! # Event Flow
//!
//! ```text
//! Frame ─> on_frame ─┬─ measurement ─> evict stale in-flight
//!                    │                 ├─> auto-tune ─> FrameProcessed{autoAdjusted} (never throttled)
//!                    │                 └─> FPS throttle ─> FrameProcessed{fps}
//!                    └─ admitted ─> gateway.submit(frame, id)
//!
//! Completion ─> on_inference_completed ─┬─ Failure ─> ServiceError (never throttled)
//!                                       └─ Success ─> streaming? ─> result throttle ─> PoseDetected
//! ```

mod actor;
mod controller;
mod error;
mod events;
mod settings;
mod stats;

pub use actor::{ControllerCommand, ControllerHandle, ControllerQueue, FrameSubmitter};
pub use controller::{ControllerSnapshot, FrameOutcome, PipelineController};
pub use error::{PipelineError, Result};
pub use events::{BufferedSink, ChannelSink, EventSink, FpsReport, HostEvent};
pub use settings::{ControllerOptions, ControllerSettings, SettingsUpdate};
pub use stats::{PipelineStats, ProcessingTimeStats};
