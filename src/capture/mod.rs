//! Camera Capture Boundary
//!
//! The controller does not manage camera sessions. It receives [`Frame`]s
//! from anything implementing [`CaptureSource`], one at a time, on the
//! capture thread.
//!
//! [`SyntheticCamera`] is a paced frame generator used by the binary and by
//! tests. It can emulate a camera that degrades mid-session (thermal
//! throttling) so the auto-tuner has something to react to.

mod error;
mod synthetic;

pub use error::{CaptureError, Result};
pub use synthetic::{SyntheticCamera, SyntheticCameraConfig};

use bytes::Bytes;

/// A captured video frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Monotonic sequence number assigned by the source
    pub sequence: u64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel data (BGRA)
    pub data: Bytes,
}

impl Frame {
    /// Create a frame
    pub fn new(sequence: u64, width: u32, height: u32, data: Bytes) -> Self {
        Self {
            sequence,
            width,
            height,
            data,
        }
    }

    /// Expected payload size for BGRA
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    /// Whether the frame has non-zero dimensions and a complete payload
    pub fn is_well_formed(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() >= self.expected_len()
    }
}

/// A producer of camera frames
///
/// `next_frame` blocks until the next frame is due.
pub trait CaptureSource: Send {
    /// Block until the next frame is available
    fn next_frame(&mut self) -> Result<Frame>;

    /// Human-readable source name for logs
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_well_formed() {
        let frame = Frame::new(0, 2, 2, Bytes::from(vec![0u8; 16]));
        assert!(frame.is_well_formed());

        let short = Frame::new(0, 2, 2, Bytes::from(vec![0u8; 8]));
        assert!(!short.is_well_formed());

        let empty = Frame::new(0, 0, 0, Bytes::new());
        assert!(!empty.is_well_formed());
    }

    #[test]
    fn test_stream_end_not_fatal() {
        assert!(!CaptureError::StreamEnded.is_fatal());
        assert!(CaptureError::PermissionDenied.is_fatal());
    }
}
