//! Controller Serial Queue
//!
//! Camera frames arrive on the capture thread, inference completions on the
//! detector's thread, and setting changes from the host. All three are
//! funneled to one dedicated thread that owns the [`PipelineController`], so
//! its state is never touched from two threads at once and no lock guards
//! it.
//!
//! # Architecture
//!
//! ```text
//! capture thread ──FrameArrived{frame, at}──┐
//! host ──────────UpdateSettings / Snapshot──┼─> commands ─┐
//!                                           │             ├─ select! ─> PipelineController
//! detector worker ──InferenceCompletion─────┴─> completions┘                 │
//!                                                                            └─> latest snapshot
//!                                                                                (RwLock, read anywhere)
//! ```
//!
//! Frames are stamped with their arrival `Instant` on the posting thread,
//! so time spent in the queue does not skew FPS measurement.
//!
//! # Example
//!
//! ```no_run
//! use lamco_pose_governor::device::HardwareProfile;
//! use lamco_pose_governor::inference::{SimulatedGateway, SimulatedGatewayConfig};
//! use lamco_pose_governor::pipeline::{
//!     BufferedSink, ControllerOptions, ControllerQueue, PipelineController,
//! };
//! use std::time::Instant;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = ControllerQueue::new();
//! let gateway = SimulatedGateway::new(SimulatedGatewayConfig::default(), queue.completion_sender())?;
//! let controller = PipelineController::new(
//!     ControllerOptions::default(),
//!     HardwareProfile::detect(),
//!     Box::new(gateway),
//!     Box::new(BufferedSink::new()),
//!     Instant::now(),
//! );
//! let mut handle = queue.spawn(controller)?;
//! let final_state = handle.shutdown()?;
//! println!("{}", final_state.stats.summary());
//! # Ok(())
//! # }
//! ```

use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::controller::{ControllerSnapshot, PipelineController};
use super::error::{PipelineError, Result};
use super::settings::SettingsUpdate;
use crate::capture::{CaptureSource, Frame};
use crate::inference::{CompletionSender, InferenceCompletion};

/// Commands processed by the controller thread
#[derive(Debug)]
pub enum ControllerCommand {
    /// A frame arrived at `at`
    FrameArrived {
        /// Captured frame
        frame: Frame,
        /// Arrival time on the capture thread
        at: Instant,
    },

    /// Apply a partial settings change
    UpdateSettings(SettingsUpdate),

    /// Reply with a fresh snapshot
    Snapshot {
        /// Reply channel
        reply: Sender<ControllerSnapshot>,
    },

    /// Stop the thread
    Shutdown,
}

/// Channels feeding a controller thread, before it is started
///
/// Create the queue first so gateways can be built with
/// [`Self::completion_sender`], then hand the controller to [`Self::spawn`].
pub struct ControllerQueue {
    command_tx: Sender<ControllerCommand>,
    command_rx: Receiver<ControllerCommand>,
    completion_tx: Sender<InferenceCompletion>,
    completion_rx: Receiver<InferenceCompletion>,
}

impl ControllerQueue {
    /// Create the command and completion channels
    pub fn new() -> Self {
        let (command_tx, command_rx) = unbounded();
        let (completion_tx, completion_rx) = unbounded();
        Self {
            command_tx,
            command_rx,
            completion_tx,
            completion_rx,
        }
    }

    /// Sender for gateways to post completions on
    pub fn completion_sender(&self) -> CompletionSender {
        CompletionSender::new(self.completion_tx.clone())
    }

    /// Move `controller` onto a dedicated thread
    pub fn spawn(self, controller: PipelineController) -> Result<ControllerHandle> {
        let latest = Arc::new(RwLock::new(controller.snapshot()));
        let published = Arc::clone(&latest);
        let Self {
            command_tx,
            command_rx,
            completion_tx,
            completion_rx,
        } = self;

        let thread = thread::Builder::new()
            .name("pose-controller".to_string())
            .spawn(move || {
                // Holding a sender keeps the completion channel connected
                // after every gateway has gone away.
                let _completion_tx = completion_tx;
                run_controller_loop(controller, command_rx, completion_rx, published)
            })
            .map_err(PipelineError::ThreadSpawn)?;

        info!("Controller thread started");

        Ok(ControllerHandle {
            submitter: FrameSubmitter { command_tx },
            latest,
            thread: Some(thread),
        })
    }
}

impl Default for ControllerQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable sender for frames and setting changes
#[derive(Debug, Clone)]
pub struct FrameSubmitter {
    command_tx: Sender<ControllerCommand>,
}

impl FrameSubmitter {
    /// Post a frame stamped with the current time
    pub fn frame_arrived(&self, frame: Frame) -> Result<()> {
        self.frame_arrived_at(frame, Instant::now())
    }

    /// Post a frame with an explicit arrival time
    pub fn frame_arrived_at(&self, frame: Frame, at: Instant) -> Result<()> {
        self.send(ControllerCommand::FrameArrived { frame, at })
    }

    /// Post a partial settings change
    pub fn update_settings(&self, update: SettingsUpdate) -> Result<()> {
        self.send(ControllerCommand::UpdateSettings(update))
    }

    fn send(&self, command: ControllerCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| PipelineError::ControllerStopped)
    }

    /// Pump frames from `source` until it ends, fails, or `stop` is set
    ///
    /// Returns the number of frames posted. A normal end of stream is not
    /// an error; any other capture failure is fatal and returned.
    pub fn run_capture(&self, source: &mut dyn CaptureSource, stop: &AtomicBool) -> Result<u64> {
        info!("Capture loop started on '{}'", source.name());
        let mut frames = 0u64;

        while !stop.load(Ordering::Relaxed) {
            match source.next_frame() {
                Ok(frame) => {
                    self.frame_arrived(frame)?;
                    frames += 1;
                }
                Err(e) if !e.is_fatal() => {
                    info!("Capture source '{}': {}", source.name(), e);
                    break;
                }
                Err(e) => {
                    error!("Capture source '{}' failed: {}", source.name(), e);
                    return Err(e.into());
                }
            }
        }

        info!("Capture loop finished after {} frames", frames);
        Ok(frames)
    }
}

/// Owner of a running controller thread
///
/// Dropping the handle shuts the thread down and joins it.
pub struct ControllerHandle {
    submitter: FrameSubmitter,
    latest: Arc<RwLock<ControllerSnapshot>>,
    thread: Option<JoinHandle<ControllerSnapshot>>,
}

impl ControllerHandle {
    /// Sender usable from other threads
    pub fn submitter(&self) -> FrameSubmitter {
        self.submitter.clone()
    }

    /// Post a frame stamped with the current time
    pub fn frame_arrived(&self, frame: Frame) -> Result<()> {
        self.submitter.frame_arrived(frame)
    }

    /// Post a frame with an explicit arrival time
    pub fn frame_arrived_at(&self, frame: Frame, at: Instant) -> Result<()> {
        self.submitter.frame_arrived_at(frame, at)
    }

    /// Post a partial settings change
    pub fn update_settings(&self, update: SettingsUpdate) -> Result<()> {
        self.submitter.update_settings(update)
    }

    /// Fetch a snapshot after everything queued so far is processed
    pub fn snapshot(&self) -> Result<ControllerSnapshot> {
        let (reply, response) = bounded(1);
        self.submitter.send(ControllerCommand::Snapshot { reply })?;
        response.recv().map_err(|_| PipelineError::ControllerStopped)
    }

    /// Last snapshot published by the controller thread
    ///
    /// Refreshed on every measurement window and settings change; never
    /// blocks on the queue.
    pub fn latest_snapshot(&self) -> ControllerSnapshot {
        self.latest.read().clone()
    }

    /// Stop the thread and return the final snapshot
    ///
    /// Queued commands ahead of the shutdown are processed first. Calling
    /// this again returns the last published snapshot.
    pub fn shutdown(&mut self) -> Result<ControllerSnapshot> {
        let Some(thread) = self.thread.take() else {
            return Ok(self.latest_snapshot());
        };

        debug!("Shutting down controller thread");
        if self.submitter.send(ControllerCommand::Shutdown).is_err() {
            warn!("Controller thread already stopped");
        }

        match thread.join() {
            Ok(snapshot) => {
                info!("Controller thread shut down: {}", snapshot.stats.summary());
                Ok(snapshot)
            }
            Err(_) => {
                error!("Controller thread panicked during shutdown");
                Err(PipelineError::ThreadPanic)
            }
        }
    }
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

fn run_controller_loop(
    mut controller: PipelineController,
    command_rx: Receiver<ControllerCommand>,
    completion_rx: Receiver<InferenceCompletion>,
    latest: Arc<RwLock<ControllerSnapshot>>,
) -> ControllerSnapshot {
    debug!("Controller loop running (session {})", controller.session_id());

    loop {
        select! {
            recv(command_rx) -> command => match command {
                Ok(ControllerCommand::FrameArrived { frame, at }) => {
                    let outcome = controller.on_frame(frame, at);
                    if outcome.measured_fps.is_some() {
                        *latest.write() = controller.snapshot();
                    }
                }
                Ok(ControllerCommand::UpdateSettings(update)) => {
                    debug!("Applying settings update: {:?}", update);
                    controller.apply(update);
                    *latest.write() = controller.snapshot();
                }
                Ok(ControllerCommand::Snapshot { reply }) => {
                    let _ = reply.send(controller.snapshot());
                }
                Ok(ControllerCommand::Shutdown) | Err(_) => break,
            },
            recv(completion_rx) -> completion => {
                if let Ok(completion) = completion {
                    controller.on_inference_completed(completion);
                }
            }
        }
    }

    let snapshot = controller.snapshot();
    *latest.write() = snapshot.clone();
    debug!("Controller loop exiting");
    snapshot
}
