//! Pipeline Error Types

use thiserror::Error;

use crate::capture::CaptureError;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Controller thread could not be started
    #[error("Failed to spawn controller thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    /// Controller thread is no longer accepting commands
    #[error("Controller stopped")]
    ControllerStopped,

    /// Controller thread panicked
    #[error("Controller thread panicked")]
    ThreadPanic,

    /// Capture source failed terminally
    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),
}
