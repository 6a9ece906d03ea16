//! Simulated Pose Detector
//!
//! Stand-in for a real pose-landmark engine. Requests are queued to a
//! dedicated worker thread that "infers" for a randomized latency and posts
//! a completion carrying 33 landmarks (MediaPipe pose topology).
//!
//! The worker processes one request at a time, so a latency above the
//! frame interval backs the queue up the way a real detector would. When
//! the queue is full, `submit` fails with [`InferenceError::QueueFull`].
//!
//! Failure, silent-drop and no-person probabilities are configurable to
//! exercise the error, eviction and empty-result paths.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

use super::error::{InferenceError, Result};
use super::{CompletionSender, CorrelationId, InferenceOutcome, Landmark, PoseInferenceGateway};
use crate::capture::Frame;

/// Landmarks per pose
pub const POSE_LANDMARK_COUNT: usize = 33;

/// Simulated detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedGatewayConfig {
    /// Mean inference latency (ms)
    #[serde(default = "default_latency_ms")]
    pub latency_ms: f32,

    /// Uniform jitter around the mean (ms)
    #[serde(default = "default_latency_jitter_ms")]
    pub latency_jitter_ms: f32,

    /// Probability a request fails (0-1)
    #[serde(default)]
    pub failure_rate: f64,

    /// Probability a request never completes (0-1)
    #[serde(default)]
    pub drop_rate: f64,

    /// Probability no person is found (0-1)
    #[serde(default = "default_no_person_rate")]
    pub no_person_rate: f64,

    /// Pending requests accepted before `submit` fails
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// RNG seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_latency_ms() -> f32 {
    25.0
}
fn default_latency_jitter_ms() -> f32 {
    10.0
}
fn default_no_person_rate() -> f64 {
    0.05
}
fn default_queue_depth() -> usize {
    4
}

impl Default for SimulatedGatewayConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_ms(),
            latency_jitter_ms: default_latency_jitter_ms(),
            failure_rate: 0.0,
            drop_rate: 0.0,
            no_person_rate: default_no_person_rate(),
            queue_depth: default_queue_depth(),
            seed: None,
        }
    }
}

struct InferenceJob {
    correlation: CorrelationId,
    sequence: u64,
}

/// Worker-thread pose detector simulation
pub struct SimulatedGateway {
    job_tx: Option<Sender<InferenceJob>>,
    worker: Option<JoinHandle<()>>,
    queue_depth: usize,
}

impl SimulatedGateway {
    /// Start the detector worker
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::Rejected`] if the worker thread cannot be
    /// spawned.
    pub fn new(config: SimulatedGatewayConfig, completions: CompletionSender) -> Result<Self> {
        let queue_depth = config.queue_depth.max(1);
        let (job_tx, job_rx) = bounded::<InferenceJob>(queue_depth);

        let worker = thread::Builder::new()
            .name("pose-detector".to_string())
            .spawn(move || run_detector_loop(config, job_rx, completions))
            .map_err(|e| InferenceError::Rejected(format!("Thread spawn failed: {}", e)))?;

        info!("Simulated pose detector started (queue depth {})", queue_depth);

        Ok(Self {
            job_tx: Some(job_tx),
            worker: Some(worker),
            queue_depth,
        })
    }
}

impl PoseInferenceGateway for SimulatedGateway {
    fn submit(&mut self, frame: Frame, correlation: CorrelationId) -> Result<()> {
        if !frame.is_well_formed() {
            return Err(InferenceError::MalformedFrame {
                sequence: frame.sequence,
                reason: format!(
                    "{}x{} with {} bytes",
                    frame.width,
                    frame.height,
                    frame.data.len()
                ),
            });
        }

        let tx = self.job_tx.as_ref().ok_or(InferenceError::GatewayClosed)?;
        let job = InferenceJob {
            correlation,
            sequence: frame.sequence,
        };

        match tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(InferenceError::QueueFull {
                capacity: self.queue_depth,
            }),
            Err(TrySendError::Disconnected(_)) => Err(InferenceError::GatewayClosed),
        }
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

impl Drop for SimulatedGateway {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop
        self.job_tx.take();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("Pose detector thread panicked during shutdown");
            }
        }
        debug!("Simulated pose detector stopped");
    }
}

fn run_detector_loop(
    config: SimulatedGatewayConfig,
    job_rx: Receiver<InferenceJob>,
    completions: CompletionSender,
) {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    for job in job_rx.iter() {
        let started = Instant::now();
        let jitter = config.latency_jitter_ms.max(0.0);
        let latency_ms = if jitter > 0.0 {
            config.latency_ms + rng.gen_range(-jitter..=jitter)
        } else {
            config.latency_ms
        };
        thread::sleep(Duration::from_secs_f32(latency_ms.max(0.0) / 1000.0));

        if rng.gen_bool(config.drop_rate.clamp(0.0, 1.0)) {
            trace!("Detector dropped frame {} ({})", job.sequence, job.correlation);
            continue;
        }

        let latency = started.elapsed();
        let outcome = if rng.gen_bool(config.failure_rate.clamp(0.0, 1.0)) {
            InferenceOutcome::Failure {
                error: format!("Pose detection failed for frame {}", job.sequence),
                latency,
            }
        } else if rng.gen_bool(config.no_person_rate.clamp(0.0, 1.0)) {
            InferenceOutcome::Success {
                landmarks: Vec::new(),
                latency,
            }
        } else {
            InferenceOutcome::Success {
                landmarks: synthesize_pose(&mut rng),
                latency,
            }
        };

        if !completions.complete(job.correlation, outcome) {
            break;
        }
    }

    debug!("Pose detector loop exiting");
}

fn synthesize_pose(rng: &mut StdRng) -> Vec<Landmark> {
    let cx: f32 = rng.gen_range(0.4..0.6);
    (0..POSE_LANDMARK_COUNT)
        .map(|i| {
            let row = i as f32 / POSE_LANDMARK_COUNT as f32;
            Landmark {
                x: (cx + rng.gen_range(-0.15..0.15)).clamp(0.0, 1.0),
                y: (0.1 + row * 0.8).clamp(0.0, 1.0),
                z: rng.gen_range(-0.3..0.3),
                visibility: rng.gen_range(0.6..1.0),
            }
        })
        .collect()
}
