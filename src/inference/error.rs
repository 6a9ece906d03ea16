//! Inference Error Types

use thiserror::Error;

/// Result type for inference dispatch
pub type Result<T> = std::result::Result<T, InferenceError>;

/// Errors raised when handing a frame to the detector
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// Frame had zero size or a truncated payload
    #[error("Malformed frame {sequence}: {reason}")]
    MalformedFrame {
        /// Frame sequence number
        sequence: u64,
        /// What was wrong
        reason: String,
    },

    /// Detector refused the request
    #[error("Request rejected by detector: {0}")]
    Rejected(String),

    /// Detector queue is full
    #[error("Detector queue full (capacity {capacity})")]
    QueueFull {
        /// Queue capacity
        capacity: usize,
    },

    /// Detector worker has shut down
    #[error("Detector gateway closed")]
    GatewayClosed,
}
