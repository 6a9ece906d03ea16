//! Host Events
//!
//! One-way notifications leaving the pipeline. Each variant serializes to
//! the JSON payload the host boundary expects, tagged by `type`:
//!
//! ```json
//! {"type":"frameProcessed","fps":29.8}
//! {"type":"frameProcessed","fps":20.1,"autoAdjusted":true,"newTargetFPS":25,"reason":"Performance optimization"}
//! {"type":"poseDetected","landmarks":[...],"processingTime":31.2,"frameTimestamp":4033.4,"timestamp":1718000000123.0,"confidence":0.87}
//! {"type":"deviceCapability","tier":"high","recommendedFPS":60,"coreCount":8,"memoryGB":16.0}
//! {"type":"serviceError","error":"...","processingTime":12.0}
//! ```
//!
//! Delivery goes through an [`EventSink`], called from the controller's
//! serial context. Measurements and pose results may be dropped under
//! backpressure; device capability, auto-adjustment reports and service
//! errors may not (see [`HostEvent::must_deliver`]).

use crossbeam_channel::{Sender, TrySendError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::device::DeviceTier;
use crate::inference::Landmark;

/// Frame-processed report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FpsReport {
    /// Measured camera FPS
    pub fps: f32,

    /// Present when this report carries an auto-tune adjustment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_adjusted: Option<bool>,

    /// Target after the adjustment
    #[serde(
        default,
        rename = "newTargetFPS",
        skip_serializing_if = "Option::is_none"
    )]
    pub new_target_fps: Option<u32>,

    /// Human-readable adjustment reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl FpsReport {
    /// Plain measurement report
    pub fn measurement(fps: f32) -> Self {
        Self {
            fps,
            auto_adjusted: None,
            new_target_fps: None,
            reason: None,
        }
    }
}

/// Event delivered to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostEvent {
    /// FPS report, throttled unless it carries an adjustment
    FrameProcessed(FpsReport),

    /// Pose landmarks for one frame
    #[serde(rename_all = "camelCase")]
    PoseDetected {
        /// Landmarks in normalized coordinates
        landmarks: Vec<Landmark>,
        /// Round-trip time from dispatch to result (ms)
        processing_time: f64,
        /// Admission time of the source frame (ms since session start)
        frame_timestamp: f64,
        /// Wall-clock time of delivery (ms since Unix epoch)
        timestamp: f64,
        /// Mean landmark visibility
        confidence: f32,
    },

    /// Device classification, emitted once at startup
    DeviceCapability {
        /// Classified tier
        tier: DeviceTier,
        /// Tier-recommended FPS
        #[serde(rename = "recommendedFPS")]
        recommended_fps: u32,
        /// Logical cores
        #[serde(rename = "coreCount")]
        core_count: usize,
        /// Installed memory (decimal GB)
        #[serde(rename = "memoryGB")]
        memory_gb: f64,
    },

    /// Detector failure, never throttled
    #[serde(rename_all = "camelCase")]
    ServiceError {
        /// Failure description
        error: String,
        /// Time spent before the failure (ms)
        processing_time: f64,
    },
}

impl HostEvent {
    /// Short event name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FrameProcessed(_) => "frameProcessed",
            Self::PoseDetected { .. } => "poseDetected",
            Self::DeviceCapability { .. } => "deviceCapability",
            Self::ServiceError { .. } => "serviceError",
        }
    }

    /// Whether a sink must deliver this event even if it has to wait
    ///
    /// Plain FPS measurements and pose results are superseded by the next
    /// one; everything else is not.
    pub fn must_deliver(&self) -> bool {
        match self {
            Self::FrameProcessed(report) => report.auto_adjusted == Some(true),
            Self::PoseDetected { .. } => false,
            Self::DeviceCapability { .. } | Self::ServiceError { .. } => true,
        }
    }
}

/// Destination for host events
pub trait EventSink: Send {
    /// Deliver one event
    ///
    /// May only block for events where [`HostEvent::must_deliver`] holds.
    fn emit(&mut self, event: HostEvent);
}

/// Sink forwarding events into a crossbeam channel
///
/// With a bounded channel, droppable events are discarded when it is full
/// and counted; must-deliver events wait for the consumer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<HostEvent>,
    dropped: u64,
}

impl ChannelSink {
    /// Wrap a channel sender
    pub fn new(tx: Sender<HostEvent>) -> Self {
        Self { tx, dropped: 0 }
    }

    /// Droppable events discarded because the channel was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: HostEvent) {
        if event.must_deliver() {
            let kind = event.kind();
            if self.tx.send(event).is_err() {
                warn!("Host event {} lost: receiver disconnected", kind);
            }
            return;
        }

        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                self.dropped += 1;
                debug!(
                    "Host channel full, dropped {} event ({} total)",
                    event.kind(),
                    self.dropped
                );
            }
            Err(TrySendError::Disconnected(event)) => {
                trace!("Host event {} dropped: receiver disconnected", event.kind());
            }
        }
    }
}

/// Sink collecting events in memory
///
/// Clones share the same buffer, so a test can keep one clone and hand the
/// other to a controller.
#[derive(Debug, Clone, Default)]
pub struct BufferedSink {
    events: Arc<Mutex<Vec<HostEvent>>>,
}

impl BufferedSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all buffered events
    pub fn drain(&self) -> Vec<HostEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of buffered events
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for BufferedSink {
    fn emit(&mut self, event: HostEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fps_report_serialization() {
        let plain = HostEvent::FrameProcessed(FpsReport::measurement(29.5));
        assert_eq!(
            serde_json::to_value(&plain).unwrap(),
            json!({"type": "frameProcessed", "fps": 29.5})
        );

        let adjusted = HostEvent::FrameProcessed(FpsReport {
            fps: 20.0,
            auto_adjusted: Some(true),
            new_target_fps: Some(25),
            reason: Some("Performance optimization".to_string()),
        });
        assert_eq!(
            serde_json::to_value(&adjusted).unwrap(),
            json!({
                "type": "frameProcessed",
                "fps": 20.0,
                "autoAdjusted": true,
                "newTargetFPS": 25,
                "reason": "Performance optimization"
            })
        );
    }

    #[test]
    fn test_device_capability_serialization() {
        let event = HostEvent::DeviceCapability {
            tier: DeviceTier::High,
            recommended_fps: 60,
            core_count: 8,
            memory_gb: 16.0,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "deviceCapability",
                "tier": "high",
                "recommendedFPS": 60,
                "coreCount": 8,
                "memoryGB": 16.0
            })
        );
    }

    #[test]
    fn test_pose_serialization_carries_frame_time() {
        let event = HostEvent::PoseDetected {
            landmarks: Vec::new(),
            processing_time: 31.5,
            frame_timestamp: 4033.25,
            timestamp: 1_718_000_000_123.0,
            confidence: 0.5,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "poseDetected");
        assert_eq!(value["frameTimestamp"], 4033.25);
        assert_eq!(value["timestamp"], 1_718_000_000_123.0);
        assert_eq!(value["processingTime"], 31.5);
    }

    #[test]
    fn test_service_error_serialization() {
        let event = HostEvent::ServiceError {
            error: "detector crashed".to_string(),
            processing_time: 12.5,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "serviceError");
        assert_eq!(value["processingTime"], 12.5);
    }

    #[test]
    fn test_buffered_sink_shares_buffer() {
        let sink = BufferedSink::new();
        let mut writer = sink.clone();
        writer.emit(HostEvent::FrameProcessed(FpsReport::measurement(1.0)));

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.drain().len(), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut sink = ChannelSink::new(tx);
        drop(rx);
        sink.emit(HostEvent::FrameProcessed(FpsReport::measurement(1.0)));
    }

    #[test]
    fn test_bounded_channel_delivers_critical_events() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let mut sink = ChannelSink::new(tx);

        let consumer = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(50));
            rx.iter().collect::<Vec<HostEvent>>()
        });

        sink.emit(HostEvent::FrameProcessed(FpsReport::measurement(30.0)));
        sink.emit(HostEvent::FrameProcessed(FpsReport::measurement(29.0)));
        for i in 0..3 {
            sink.emit(HostEvent::ServiceError {
                error: format!("failure {}", i),
                processing_time: 5.0,
            });
        }
        sink.emit(HostEvent::FrameProcessed(FpsReport {
            fps: 20.0,
            auto_adjusted: Some(true),
            new_target_fps: Some(25),
            reason: Some("Performance optimization".to_string()),
        }));
        let dropped = sink.dropped();
        drop(sink);

        let events = consumer.join().unwrap();
        let errors = events
            .iter()
            .filter(|e| matches!(e, HostEvent::ServiceError { .. }))
            .count();
        assert_eq!(errors, 3);
        assert_eq!(events.last().map(HostEvent::must_deliver), Some(true));
        assert_eq!(dropped, 1);
        assert_eq!(events.len(), 5);
    }

    #[test]
    fn test_must_deliver_classification() {
        assert!(!HostEvent::FrameProcessed(FpsReport::measurement(1.0)).must_deliver());
        assert!(HostEvent::ServiceError {
            error: String::new(),
            processing_time: 0.0,
        }
        .must_deliver());
    }
}
