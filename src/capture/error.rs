//! Capture Error Types

use thiserror::Error;

/// Result type for capture operations
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Capture source errors
///
/// Everything except [`CaptureError::StreamEnded`] is fatal to the session;
/// retry policy belongs to whoever owns the capture device.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// No camera device could be opened
    #[error("Camera device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Camera access was denied
    #[error("Camera permission denied")]
    PermissionDenied,

    /// The source stopped delivering frames
    #[error("Camera stalled: no frame for {0}ms")]
    Stalled(u64),

    /// Invalid source configuration
    #[error("Invalid capture configuration: {0}")]
    InvalidConfig(String),

    /// The stream finished normally
    #[error("Capture stream ended")]
    StreamEnded,
}

impl CaptureError {
    /// Whether this error should terminate the session
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CaptureError::StreamEnded)
    }
}
