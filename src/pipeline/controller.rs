//! Frame Admission & Adaptive Performance Controller
//!
//! [`PipelineController`] owns every piece of mutable pipeline state for one
//! capture session: the governor, the auto-tuner, both output throttles and
//! the in-flight request map. It is single-owner and not thread-safe by
//! itself; [`super::ControllerQueue`] gives it a serial execution context.
//!
//! All operations take the current `Instant` (or read it from the event)
//! instead of sampling the clock, so behavior is reproducible under a
//! synthetic timeline.

use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::events::{EventSink, FpsReport, HostEvent};
use super::settings::{ControllerOptions, ControllerSettings, SettingsUpdate};
use super::stats::PipelineStats;
use crate::capture::Frame;
use crate::device::{DeviceTier, HardwareProfile};
use crate::inference::{
    pose_confidence, CorrelationId, InFlightStats, InFlightTracker, InferenceCompletion,
    InferenceOutcome, PoseInferenceGateway,
};
use crate::performance::{
    clamp_target_fps, AutoTuner, FrameRateGovernor, GovernorStats, OutputThrottle,
};

/// Per-frame diagnostics: `info` with detailed logging, `trace` otherwise
macro_rules! detail {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            info!($($arg)+)
        } else {
            trace!($($arg)+)
        }
    };
}

/// What happened to one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutcome {
    /// Passed the admission gate
    pub admitted: bool,
    /// Accepted by the gateway
    pub dispatched: bool,
    /// Set when this frame closed a measurement window
    pub measured_fps: Option<f32>,
}

/// Serializable view of the controller
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerSnapshot {
    /// Session identifier
    pub session_id: Uuid,
    /// Device tier
    pub tier: DeviceTier,
    /// Hardware facts used for classification
    pub hardware: HardwareProfile,
    /// Tier-recommended FPS (auto-tune ceiling)
    #[serde(rename = "recommendedFPS")]
    pub recommended_fps: u32,
    /// Current admission target
    #[serde(rename = "targetFPS")]
    pub target_fps: u32,
    /// Last measured FPS
    #[serde(rename = "measuredFPS")]
    pub measured_fps: f32,
    /// Measurement history, oldest first
    pub fps_history: Vec<f32>,
    /// Outstanding inference requests
    pub in_flight: usize,
    /// Effective settings after clamping
    pub settings: ControllerSettings,
    /// Controller counters
    pub stats: PipelineStats,
    /// Governor counters
    pub governor: GovernorStats,
    /// In-flight tracker counters
    pub in_flight_stats: InFlightStats,
}

/// Adaptive frame admission controller
pub struct PipelineController {
    session_id: Uuid,

    /// Correlation ids are offsets from this instant
    epoch: Instant,

    hardware: HardwareProfile,
    tier: DeviceTier,

    /// Effective values; clamped knobs hold what was applied
    settings: ControllerSettings,

    governor: FrameRateGovernor,
    tuner: AutoTuner,
    result_throttle: OutputThrottle,
    fps_throttle: OutputThrottle,
    in_flight: InFlightTracker,

    gateway: Box<dyn PoseInferenceGateway>,
    sink: Box<dyn EventSink>,

    stats: PipelineStats,
}

impl PipelineController {
    /// Create a controller and announce the device capability
    ///
    /// Classification happens here, once, unless `options.forced_tier` is
    /// set. The `DeviceCapability` event is the first event the sink sees.
    pub fn new(
        options: ControllerOptions,
        hardware: HardwareProfile,
        gateway: Box<dyn PoseInferenceGateway>,
        sink: Box<dyn EventSink>,
        now: Instant,
    ) -> Self {
        let in_flight_age_ms = options.in_flight_age_ms();
        let ControllerOptions {
            mut settings,
            auto_tune,
            thresholds,
            forced_tier,
            ..
        } = options;

        let tier = match forced_tier {
            Some(tier) => {
                info!("Device tier forced to {}", tier);
                tier
            }
            None => hardware.classify(&thresholds),
        };

        let requested = settings
            .target_fps
            .map(i64::from)
            .unwrap_or_else(|| i64::from(tier.recommended_fps()));

        let target_fps = clamp_target_fps(requested);
        if i64::from(target_fps) != requested {
            debug!("Initial target FPS {} clamped to {}", requested, target_fps);
        }

        let mut governor = FrameRateGovernor::new(target_fps, auto_tune.history_size, now);
        governor.set_history_enabled(settings.auto_adjust_fps);

        let tuner = AutoTuner::new(auto_tune, tier.recommended_fps(), settings.auto_adjust_fps);

        let result_throttle = OutputThrottle::pose_results(settings.result_throttle_ms);
        let fps_throttle = OutputThrottle::fps_reports(
            settings.fps_report_throttle_ms,
            settings.fps_change_threshold,
        );

        settings.target_fps = Some(target_fps);
        settings.result_throttle_ms = result_throttle.min_interval().as_millis() as u64;
        settings.fps_report_throttle_ms = fps_throttle.min_interval().as_millis() as u64;
        if let Some(change) = fps_throttle.min_change() {
            settings.fps_change_threshold = change;
        }

        let session_id = Uuid::new_v4();
        info!(
            "Pipeline controller {} created: tier {}, target {} FPS, gateway '{}'",
            session_id,
            tier,
            target_fps,
            gateway.name()
        );

        let mut controller = Self {
            session_id,
            epoch: now,
            hardware,
            tier,
            settings,
            governor,
            tuner,
            result_throttle,
            fps_throttle,
            in_flight: InFlightTracker::new(in_flight_age_ms),
            gateway,
            sink,
            stats: PipelineStats::default(),
        };

        controller.emit(HostEvent::DeviceCapability {
            tier,
            recommended_fps: tier.recommended_fps(),
            core_count: hardware.core_count,
            memory_gb: hardware.memory_gb(),
        });

        controller
    }

    /// Feed one captured frame
    ///
    /// Measurement always runs. Admission runs only while pose detection is
    /// enabled; an admitted frame is dispatched to the gateway immediately.
    pub fn on_frame(&mut self, frame: Frame, now: Instant) -> FrameOutcome {
        self.stats.frames_received += 1;

        let (admitted, measured_fps) = if self.settings.enable_pose_detection {
            let decision = self.governor.on_frame_arrived(now);
            (decision.admit, decision.measurement)
        } else {
            (false, self.governor.on_frame_measured_only(now))
        };

        if let Some(fps) = measured_fps {
            self.on_measurement(fps, now);
        }

        let sequence = frame.sequence;
        let dispatched = if admitted {
            self.stats.frames_admitted += 1;
            self.dispatch(frame, now)
        } else {
            self.stats.frames_skipped += 1;
            false
        };

        detail!(
            self.settings.enable_detailed_logging,
            "Frame {}: admitted={} dispatched={} in_flight={}",
            sequence,
            admitted,
            dispatched,
            self.in_flight.len()
        );

        FrameOutcome {
            admitted,
            dispatched,
            measured_fps,
        }
    }

    fn on_measurement(&mut self, fps: f32, now: Instant) {
        let evicted = self.in_flight.evict_stale(now);
        if evicted > 0 {
            self.stats.evicted += evicted as u64;
            warn!(
                "Evicted {} in-flight request(s) older than {:?}",
                evicted,
                self.in_flight.max_age()
            );
        }

        let adjustment =
            self.tuner
                .maybe_adjust(now, self.governor.history(), self.governor.target_fps());

        match adjustment {
            Some(adjustment) => {
                let applied = self.governor.set_target_fps(i64::from(adjustment.new_fps));
                self.settings.target_fps = Some(applied);
                self.stats.auto_adjustments += 1;
                self.stats.fps_reports_emitted += 1;

                // Adjustment reports bypass the FPS-report throttle
                self.emit(HostEvent::FrameProcessed(FpsReport {
                    fps,
                    auto_adjusted: Some(true),
                    new_target_fps: Some(applied),
                    reason: Some(adjustment.reason.description().to_string()),
                }));
            }
            None => {
                if self.fps_throttle.should_emit_value(now, fps) {
                    self.stats.fps_reports_emitted += 1;
                    self.emit(HostEvent::FrameProcessed(FpsReport::measurement(fps)));
                } else {
                    self.stats.fps_reports_throttled += 1;
                }
            }
        }

        detail!(
            self.settings.enable_detailed_logging,
            "Measured {:.1} FPS (target {}): {}",
            fps,
            self.governor.target_fps(),
            self.stats.summary()
        );
    }

    fn dispatch(&mut self, frame: Frame, now: Instant) -> bool {
        let correlation = CorrelationId::from_offset(now.saturating_duration_since(self.epoch));
        let sequence = frame.sequence;

        self.in_flight.record_dispatch(correlation, now);

        match self.gateway.submit(frame, correlation) {
            Ok(()) => {
                self.stats.dispatched += 1;
                true
            }
            Err(e) => {
                self.in_flight.cancel(correlation);
                self.stats.dispatch_failures += 1;
                warn!(
                    "Dispatch of frame {} to '{}' failed: {}",
                    sequence,
                    self.gateway.name(),
                    e
                );
                false
            }
        }
    }

    /// Handle an inference result
    ///
    /// The result's arrival time is `completion.completed_at`. Failures are
    /// always surfaced. Successes are surfaced only if detection and
    /// streaming are enabled *now* and a person was found, subject to the
    /// pose-result throttle.
    pub fn on_inference_completed(&mut self, completion: InferenceCompletion) {
        let InferenceCompletion {
            correlation,
            outcome,
            completed_at,
        } = completion;

        self.stats.completions += 1;

        let processing = self
            .in_flight
            .complete(correlation, completed_at)
            .unwrap_or_else(|| outcome.latency());
        let processing_ms = processing.as_secs_f64() * 1000.0;
        self.stats.processing.record(processing_ms);

        match outcome {
            InferenceOutcome::Failure { error, .. } => {
                self.stats.inference_failures += 1;
                warn!("Inference {} failed after {:.1}ms: {}", correlation, processing_ms, error);
                self.emit(HostEvent::ServiceError {
                    error,
                    processing_time: processing_ms,
                });
            }
            InferenceOutcome::Success { landmarks, .. } => {
                if !self.settings.enable_pose_detection
                    || !self.settings.enable_result_streaming
                    || landmarks.is_empty()
                {
                    self.stats.results_discarded += 1;
                    detail!(
                        self.settings.enable_detailed_logging,
                        "Result {} discarded ({} landmarks, {:.1}ms)",
                        correlation,
                        landmarks.len(),
                        processing_ms
                    );
                    return;
                }

                if !self.result_throttle.should_emit(completed_at) {
                    self.stats.results_throttled += 1;
                    return;
                }

                self.stats.results_emitted += 1;
                let confidence = pose_confidence(&landmarks);
                detail!(
                    self.settings.enable_detailed_logging,
                    "Pose {}: {} landmarks, confidence {:.2}, {:.1}ms",
                    correlation,
                    landmarks.len(),
                    confidence,
                    processing_ms
                );
                self.emit(HostEvent::PoseDetected {
                    landmarks,
                    processing_time: processing_ms,
                    frame_timestamp: correlation.as_millis_f64(),
                    timestamp: chrono::Utc::now().timestamp_millis() as f64,
                    confidence,
                });
            }
        }
    }

    fn emit(&mut self, event: HostEvent) {
        trace!("Emitting {}", event.kind());
        self.sink.emit(event);
    }

    // === Runtime settings ===

    /// Set the admission target, clamped to [1, 60]
    pub fn set_target_fps(&mut self, fps: i64) -> u32 {
        let applied = self.governor.set_target_fps(fps);
        self.settings.target_fps = Some(applied);
        applied
    }

    /// Enable or disable auto-adjustment
    ///
    /// Disabling clears the measurement history.
    pub fn set_auto_adjust(&mut self, enabled: bool) {
        self.settings.auto_adjust_fps = enabled;
        self.tuner.set_enabled(enabled);
        self.governor.set_history_enabled(enabled);
    }

    /// Enable or disable pose detection
    ///
    /// Takes effect for the next frame. Requests already dispatched are not
    /// cancelled; their results are discarded on arrival.
    pub fn set_pose_detection(&mut self, enabled: bool) {
        if enabled != self.settings.enable_pose_detection {
            info!("Pose detection {}", if enabled { "enabled" } else { "disabled" });
        }
        self.settings.enable_pose_detection = enabled;
    }

    /// Enable or disable pose-result delivery
    pub fn set_result_streaming(&mut self, enabled: bool) {
        if enabled != self.settings.enable_result_streaming {
            debug!("Result streaming {}", if enabled { "enabled" } else { "disabled" });
        }
        self.settings.enable_result_streaming = enabled;
    }

    /// Set the pose-result interval; returns the applied value
    pub fn set_result_throttle_ms(&mut self, ms: u64) -> u64 {
        let applied = self.result_throttle.set_min_interval_ms(ms);
        self.settings.result_throttle_ms = applied;
        applied
    }

    /// Toggle per-frame diagnostics at info level
    pub fn set_detailed_logging(&mut self, enabled: bool) {
        self.settings.enable_detailed_logging = enabled;
    }

    /// Set the FPS-report change gate; returns the applied value
    pub fn set_fps_change_threshold(&mut self, threshold: f32) -> f32 {
        let applied = self
            .fps_throttle
            .set_min_change(threshold)
            .unwrap_or(self.settings.fps_change_threshold);
        self.settings.fps_change_threshold = applied;
        applied
    }

    /// Set the FPS-report interval; returns the applied value
    pub fn set_fps_report_throttle_ms(&mut self, ms: u64) -> u64 {
        let applied = self.fps_throttle.set_min_interval_ms(ms);
        self.settings.fps_report_throttle_ms = applied;
        applied
    }

    /// Apply every field present in `update`
    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(fps) = update.target_fps {
            self.set_target_fps(fps);
        }
        if let Some(enabled) = update.auto_adjust_fps {
            self.set_auto_adjust(enabled);
        }
        if let Some(enabled) = update.enable_pose_detection {
            self.set_pose_detection(enabled);
        }
        if let Some(enabled) = update.enable_result_streaming {
            self.set_result_streaming(enabled);
        }
        if let Some(ms) = update.result_throttle_ms {
            self.set_result_throttle_ms(ms);
        }
        if let Some(enabled) = update.enable_detailed_logging {
            self.set_detailed_logging(enabled);
        }
        if let Some(threshold) = update.fps_change_threshold {
            self.set_fps_change_threshold(threshold);
        }
        if let Some(ms) = update.fps_report_throttle_ms {
            self.set_fps_report_throttle_ms(ms);
        }
    }

    // === Accessors ===

    /// Session identifier
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Device tier, fixed for the session
    pub fn tier(&self) -> DeviceTier {
        self.tier
    }

    /// Hardware facts
    pub fn hardware(&self) -> &HardwareProfile {
        &self.hardware
    }

    /// Effective settings
    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Current admission target
    pub fn target_fps(&self) -> u32 {
        self.governor.target_fps()
    }

    /// Last measured FPS
    pub fn measured_fps(&self) -> f32 {
        self.governor.measured_fps()
    }

    /// Measurement history, oldest first
    pub fn fps_history(&self) -> Vec<f32> {
        self.governor.history().to_vec()
    }

    /// Outstanding inference requests
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Controller counters
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Serializable view of the current state
    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            session_id: self.session_id,
            tier: self.tier,
            hardware: self.hardware,
            recommended_fps: self.tier.recommended_fps(),
            target_fps: self.governor.target_fps(),
            measured_fps: self.governor.measured_fps(),
            fps_history: self.fps_history(),
            in_flight: self.in_flight.len(),
            settings: self.settings.clone(),
            stats: self.stats.clone(),
            governor: self.governor.stats().clone(),
            in_flight_stats: self.in_flight.stats().clone(),
        }
    }
}

impl std::fmt::Debug for PipelineController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineController")
            .field("session_id", &self.session_id)
            .field("tier", &self.tier)
            .field("target_fps", &self.governor.target_fps())
            .field("gateway", &self.gateway.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{InferenceError, Landmark};
    use crate::pipeline::BufferedSink;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    /// Gateway recording submissions, optionally refusing them
    #[derive(Clone, Default)]
    struct RecordingGateway {
        submitted: Arc<Mutex<Vec<CorrelationId>>>,
        refuse: bool,
    }

    impl PoseInferenceGateway for RecordingGateway {
        fn submit(&mut self, _frame: Frame, correlation: CorrelationId) -> crate::inference::Result<()> {
            if self.refuse {
                return Err(InferenceError::Rejected("busy".to_string()));
            }
            self.submitted.lock().push(correlation);
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn frame(sequence: u64) -> Frame {
        Frame::new(sequence, 2, 2, Bytes::from_static(&[0u8; 16]))
    }

    fn high_end() -> HardwareProfile {
        HardwareProfile::new(8, 16_000_000_000)
    }

    fn controller_with(
        settings: ControllerSettings,
        gateway: RecordingGateway,
        start: Instant,
    ) -> (PipelineController, BufferedSink) {
        let sink = BufferedSink::new();
        let options = ControllerOptions {
            settings,
            ..Default::default()
        };
        let controller = PipelineController::new(
            options,
            high_end(),
            Box::new(gateway),
            Box::new(sink.clone()),
            start,
        );
        (controller, sink)
    }

    /// Feed frames every `interval_ms` from `from_ms` up to and including `to_ms`
    fn run_camera(
        controller: &mut PipelineController,
        start: Instant,
        interval_ms: u64,
        from_ms: u64,
        to_ms: u64,
    ) {
        let mut t = from_ms;
        let mut seq = 0;
        while t <= to_ms {
            controller.on_frame(frame(seq), start + Duration::from_millis(t));
            seq += 1;
            t += interval_ms;
        }
    }

    fn adjustments(events: &[HostEvent]) -> Vec<&FpsReport> {
        events
            .iter()
            .filter_map(|e| match e {
                HostEvent::FrameProcessed(report) if report.auto_adjusted == Some(true) => {
                    Some(report)
                }
                _ => None,
            })
            .collect()
    }

    fn pose(visibility: f32) -> Vec<Landmark> {
        vec![
            Landmark {
                visibility,
                ..Default::default()
            };
            33
        ]
    }

    #[test]
    fn test_device_capability_is_first_event() {
        let start = Instant::now();
        let (controller, sink) =
            controller_with(ControllerSettings::default(), RecordingGateway::default(), start);

        let events = sink.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            HostEvent::DeviceCapability {
                tier: DeviceTier::High,
                recommended_fps: 60,
                core_count: 8,
                memory_gb: 16.0,
            }
        );
        assert_eq!(controller.target_fps(), 60);
    }

    #[test]
    fn test_forced_tier_and_target_clamp() {
        let sink = BufferedSink::new();
        let options = ControllerOptions {
            settings: ControllerSettings {
                target_fps: Some(90),
                ..Default::default()
            },
            forced_tier: Some(DeviceTier::Low),
            ..Default::default()
        };
        let controller = PipelineController::new(
            options,
            high_end(),
            Box::new(RecordingGateway::default()),
            Box::new(sink),
            Instant::now(),
        );

        assert_eq!(controller.tier(), DeviceTier::Low);
        assert_eq!(controller.target_fps(), 60);
        assert_eq!(controller.settings().target_fps, Some(60));
    }

    #[test]
    fn test_degradation_lowers_target() {
        let start = Instant::now();
        let settings = ControllerSettings {
            target_fps: Some(30),
            ..Default::default()
        };
        let (mut controller, sink) = controller_with(settings, RecordingGateway::default(), start);

        // 20 FPS camera for five windows
        run_camera(&mut controller, start, 50, 50, 5000);

        let events = sink.drain();
        let adjusted = adjustments(&events);
        assert_eq!(adjusted.len(), 1);
        assert_eq!(adjusted[0].new_target_fps, Some(25));
        assert_eq!(adjusted[0].reason.as_deref(), Some("Performance optimization"));
        assert_eq!(controller.target_fps(), 25);
        assert_eq!(controller.stats().auto_adjustments, 1);
    }

    #[test]
    fn test_headroom_raises_target() {
        let start = Instant::now();
        let settings = ControllerSettings {
            target_fps: Some(30),
            ..Default::default()
        };
        let (mut controller, sink) = controller_with(settings, RecordingGateway::default(), start);

        // 40 FPS camera, target 30: efficiency above 0.95
        run_camera(&mut controller, start, 25, 25, 5000);

        let events = sink.drain();
        let adjusted = adjustments(&events);
        assert_eq!(adjusted.len(), 1);
        assert_eq!(adjusted[0].new_target_fps, Some(35));
        assert_eq!(
            adjusted[0].reason.as_deref(),
            Some("Performance headroom available")
        );
    }

    #[test]
    fn test_admission_bounded_by_target() {
        let start = Instant::now();
        let settings = ControllerSettings {
            target_fps: Some(15),
            auto_adjust_fps: false,
            ..Default::default()
        };
        let gateway = RecordingGateway::default();
        let submitted = gateway.submitted.clone();
        let (mut controller, _sink) = controller_with(settings, gateway, start);

        // 60 FPS camera for one second
        let mut admitted = 0;
        for i in 0..60u64 {
            let outcome = controller.on_frame(frame(i), start + Duration::from_micros(i * 16_667));
            if outcome.admitted {
                admitted += 1;
            }
        }

        assert!(admitted <= 16, "admitted {}", admitted);
        assert!(admitted >= 13, "admitted {}", admitted);
        assert_eq!(submitted.lock().len(), admitted);
    }

    #[test]
    fn test_pose_detection_disabled_still_measures() {
        let start = Instant::now();
        let settings = ControllerSettings {
            enable_pose_detection: false,
            ..Default::default()
        };
        let gateway = RecordingGateway::default();
        let submitted = gateway.submitted.clone();
        let (mut controller, sink) = controller_with(settings, gateway, start);

        run_camera(&mut controller, start, 50, 50, 1000);

        assert!(submitted.lock().is_empty());
        assert_eq!(controller.stats().frames_admitted, 0);
        assert!((controller.measured_fps() - 20.0).abs() < 0.01);
        assert!(sink
            .drain()
            .iter()
            .any(|e| matches!(e, HostEvent::FrameProcessed(_))));
    }

    #[test]
    fn test_dispatch_failure_cleans_up() {
        let start = Instant::now();
        let gateway = RecordingGateway {
            refuse: true,
            ..Default::default()
        };
        let (mut controller, _sink) = controller_with(ControllerSettings::default(), gateway, start);

        let outcome = controller.on_frame(frame(0), start + Duration::from_millis(10));
        assert!(outcome.admitted);
        assert!(!outcome.dispatched);
        assert_eq!(controller.in_flight(), 0);
        assert_eq!(controller.stats().dispatch_failures, 1);

        // Pipeline keeps going
        let outcome = controller.on_frame(frame(1), start + Duration::from_millis(100));
        assert!(outcome.admitted);
    }

    #[test]
    fn test_result_streaming_and_throttle() {
        let start = Instant::now();
        let settings = ControllerSettings {
            enable_result_streaming: true,
            ..Default::default()
        };
        let gateway = RecordingGateway::default();
        let submitted = gateway.submitted.clone();
        let (mut controller, sink) = controller_with(settings, gateway, start);
        sink.drain();

        controller.on_frame(frame(0), start + Duration::from_millis(10));
        controller.on_frame(frame(1), start + Duration::from_millis(40));
        let ids = submitted.lock().clone();
        assert_eq!(ids.len(), 2);

        controller.on_inference_completed(InferenceCompletion {
            correlation: ids[0],
            outcome: InferenceOutcome::Success {
                landmarks: pose(0.9),
                latency: Duration::from_millis(5),
            },
            completed_at: start + Duration::from_millis(40),
        });
        // Second result inside the 100ms window
        controller.on_inference_completed(InferenceCompletion {
            correlation: ids[1],
            outcome: InferenceOutcome::Success {
                landmarks: pose(0.9),
                latency: Duration::from_millis(5),
            },
            completed_at: start + Duration::from_millis(70),
        });

        let events = sink.drain();
        assert_eq!(events.len(), 1);
        match &events[0] {
            HostEvent::PoseDetected {
                landmarks,
                processing_time,
                frame_timestamp,
                confidence,
                ..
            } => {
                assert_eq!(landmarks.len(), 33);
                assert!((processing_time - 30.0).abs() < 1e-6);
                assert!((frame_timestamp - 10.0).abs() < 1e-6);
                assert_eq!(*frame_timestamp, ids[0].as_millis_f64());
                assert!((confidence - 0.9).abs() < 1e-4);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(controller.stats().results_throttled, 1);
        assert_eq!(controller.in_flight(), 0);
    }

    #[test]
    fn test_results_discarded_without_streaming() {
        let start = Instant::now();
        let gateway = RecordingGateway::default();
        let submitted = gateway.submitted.clone();
        let (mut controller, sink) =
            controller_with(ControllerSettings::default(), gateway, start);
        sink.drain();

        controller.on_frame(frame(0), start + Duration::from_millis(10));
        let id = submitted.lock()[0];
        controller.on_inference_completed(InferenceCompletion {
            correlation: id,
            outcome: InferenceOutcome::Success {
                landmarks: pose(1.0),
                latency: Duration::from_millis(5),
            },
            completed_at: start + Duration::from_millis(30),
        });

        assert!(sink.is_empty());
        assert_eq!(controller.stats().results_discarded, 1);
    }

    #[test]
    fn test_late_result_after_disabling_detection() {
        let start = Instant::now();
        let settings = ControllerSettings {
            enable_result_streaming: true,
            ..Default::default()
        };
        let gateway = RecordingGateway::default();
        let submitted = gateway.submitted.clone();
        let (mut controller, sink) = controller_with(settings, gateway, start);
        sink.drain();

        controller.on_frame(frame(0), start + Duration::from_millis(10));
        controller.set_pose_detection(false);

        let id = submitted.lock()[0];
        controller.on_inference_completed(InferenceCompletion {
            correlation: id,
            outcome: InferenceOutcome::Success {
                landmarks: pose(1.0),
                latency: Duration::from_millis(5),
            },
            completed_at: start + Duration::from_millis(50),
        });

        assert!(sink.is_empty());
        assert_eq!(controller.stats().results_discarded, 1);
    }

    #[test]
    fn test_failure_always_reported() {
        let start = Instant::now();
        let settings = ControllerSettings {
            enable_pose_detection: false,
            ..Default::default()
        };
        let (mut controller, sink) = controller_with(settings, RecordingGateway::default(), start);
        sink.drain();

        // Unknown id: processing time falls back to the reported latency
        for i in 0..3 {
            controller.on_inference_completed(InferenceCompletion {
                correlation: CorrelationId(i),
                outcome: InferenceOutcome::Failure {
                    error: "model not loaded".to_string(),
                    latency: Duration::from_millis(12),
                },
                completed_at: start + Duration::from_millis(i),
            });
        }

        let events = sink.drain();
        assert_eq!(events.len(), 3);
        for event in events {
            match event {
                HostEvent::ServiceError {
                    error,
                    processing_time,
                } => {
                    assert_eq!(error, "model not loaded");
                    assert!((processing_time - 12.0).abs() < 1e-6);
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[test]
    fn test_stale_requests_evicted() {
        let start = Instant::now();
        let settings = ControllerSettings {
            auto_adjust_fps: false,
            ..Default::default()
        };
        let (mut controller, _sink) = controller_with(settings, RecordingGateway::default(), start);

        // Nothing ever completes
        run_camera(&mut controller, start, 100, 100, 3000);
        assert!(controller.stats().evicted > 0);
        assert!(controller.in_flight() <= 21);

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.in_flight_stats.evicted, controller.stats().evicted);
    }

    #[test]
    fn test_disabling_auto_adjust_clears_history() {
        let start = Instant::now();
        let (mut controller, _sink) =
            controller_with(ControllerSettings::default(), RecordingGateway::default(), start);

        run_camera(&mut controller, start, 50, 50, 3000);
        assert_eq!(controller.fps_history().len(), 3);

        controller.set_auto_adjust(false);
        controller.set_auto_adjust(true);
        assert!(controller.fps_history().is_empty());
    }

    #[test]
    fn test_fps_reports_throttled() {
        let start = Instant::now();
        let settings = ControllerSettings {
            auto_adjust_fps: false,
            fps_report_throttle_ms: 5000,
            ..Default::default()
        };
        let (mut controller, sink) = controller_with(settings, RecordingGateway::default(), start);
        sink.drain();

        // Steady camera: only the first report passes
        run_camera(&mut controller, start, 50, 50, 4000);

        let reports = sink
            .drain()
            .into_iter()
            .filter(|e| matches!(e, HostEvent::FrameProcessed(_)))
            .count();
        assert_eq!(reports, 1);
        assert_eq!(controller.stats().fps_reports_throttled, 3);
    }

    #[test]
    fn test_apply_clamps() {
        let start = Instant::now();
        let (mut controller, _sink) =
            controller_with(ControllerSettings::default(), RecordingGateway::default(), start);

        controller.apply(SettingsUpdate {
            target_fps: Some(-4),
            result_throttle_ms: Some(0),
            fps_change_threshold: Some(0.1),
            fps_report_throttle_ms: Some(10),
            enable_result_streaming: Some(true),
            ..Default::default()
        });

        let settings = controller.settings();
        assert_eq!(controller.target_fps(), 1);
        assert_eq!(settings.result_throttle_ms, 16);
        assert_eq!(settings.fps_change_threshold, 0.5);
        assert_eq!(settings.fps_report_throttle_ms, 100);
        assert!(settings.enable_result_streaming);
    }
}
