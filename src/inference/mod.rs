//! Pose Inference Gateway Boundary
//!
//! The pose detector is a black box. The controller hands admitted frames to
//! a [`PoseInferenceGateway`] together with a [`CorrelationId`]; the gateway
//! answers later, from any thread, by sending an [`InferenceCompletion`]
//! through the [`CompletionSender`] it was built with.
//!
//! ```text
//! controller ──submit(frame, id)──> gateway ──> detector worker
//!     ^                                              │
//!     └──── CompletionSender (crossbeam) <── Success/Failure(id)
//! ```
//!
//! Outstanding requests are tracked by [`InFlightTracker`], which computes
//! round-trip processing time and evicts records that never get an answer.

mod error;
pub mod in_flight;
pub mod simulated;

pub use error::{InferenceError, Result};
pub use in_flight::{InFlightStats, InFlightTracker, MIN_IN_FLIGHT_AGE_MS};
pub use simulated::{SimulatedGateway, SimulatedGatewayConfig};

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::trace;

use crate::capture::Frame;

/// Key matching an asynchronous result to the frame that produced it
///
/// Microseconds between the controller's session start and the frame's
/// admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CorrelationId(pub u64);

impl CorrelationId {
    /// Derive an id from time elapsed since session start
    pub fn from_offset(offset: Duration) -> Self {
        Self(offset.as_micros() as u64)
    }

    /// Offset from session start in milliseconds
    pub fn as_millis_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One pose landmark in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    /// 0-1 horizontal
    pub x: f32,
    /// 0-1 vertical
    pub y: f32,
    /// Relative depth
    pub z: f32,
    /// Detector visibility score (0-1)
    pub visibility: f32,
}

/// Mean visibility of a landmark set, 0 when empty
pub fn pose_confidence(landmarks: &[Landmark]) -> f32 {
    if landmarks.is_empty() {
        return 0.0;
    }
    landmarks.iter().map(|l| l.visibility).sum::<f32>() / landmarks.len() as f32
}

/// What the detector produced for one request
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceOutcome {
    /// Detection ran; `landmarks` is empty when no person was found
    Success {
        /// Detected landmarks
        landmarks: Vec<Landmark>,
        /// Detector-reported latency
        latency: Duration,
    },
    /// Detection failed
    Failure {
        /// Failure description
        error: String,
        /// Detector-reported latency
        latency: Duration,
    },
}

impl InferenceOutcome {
    /// Detector-reported latency
    pub fn latency(&self) -> Duration {
        match self {
            Self::Success { latency, .. } | Self::Failure { latency, .. } => *latency,
        }
    }

    /// Whether this is a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }
}

/// A completed request, stamped on arrival
#[derive(Debug, Clone)]
pub struct InferenceCompletion {
    /// Id passed to `submit`
    pub correlation: CorrelationId,
    /// Detector result
    pub outcome: InferenceOutcome,
    /// When the completion was posted
    pub completed_at: Instant,
}

/// Channel end handed to gateways for posting completions
#[derive(Debug, Clone)]
pub struct CompletionSender {
    tx: Sender<InferenceCompletion>,
}

impl CompletionSender {
    /// Wrap a channel sender
    pub fn new(tx: Sender<InferenceCompletion>) -> Self {
        Self { tx }
    }

    /// Post a completion, stamping the current time
    ///
    /// Returns false when the controller has gone away.
    pub fn complete(&self, correlation: CorrelationId, outcome: InferenceOutcome) -> bool {
        let completion = InferenceCompletion {
            correlation,
            outcome,
            completed_at: Instant::now(),
        };
        if self.tx.send(completion).is_err() {
            trace!("Completion for {} dropped: controller stopped", correlation);
            return false;
        }
        true
    }
}

/// Asynchronous pose detector
///
/// `submit` must not block on inference; it only hands the frame off.
pub trait PoseInferenceGateway: Send {
    /// Hand a frame to the detector
    ///
    /// An `Err` means the request was never accepted and no completion will
    /// follow.
    fn submit(&mut self, frame: Frame, correlation: CorrelationId) -> Result<()>;

    /// Gateway name for logs
    fn name(&self) -> &str;
}
