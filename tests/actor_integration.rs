//! End-to-end runs of the controller thread with the simulated detector and
//! synthetic camera in real time.

use lamco_pose_governor::capture::{SyntheticCamera, SyntheticCameraConfig};
use lamco_pose_governor::device::HardwareProfile;
use lamco_pose_governor::inference::{SimulatedGateway, SimulatedGatewayConfig};
use lamco_pose_governor::pipeline::{
    ChannelSink, ControllerOptions, ControllerQueue, ControllerSettings, HostEvent,
    PipelineController, SettingsUpdate,
};
use std::sync::atomic::AtomicBool;
use std::time::Instant;

fn fast_detector(seed: u64) -> SimulatedGatewayConfig {
    SimulatedGatewayConfig {
        latency_ms: 5.0,
        latency_jitter_ms: 0.0,
        failure_rate: 0.0,
        drop_rate: 0.0,
        no_person_rate: 0.0,
        queue_depth: 8,
        seed: Some(seed),
    }
}

fn small_camera(fps: u32, max_frames: u64) -> SyntheticCameraConfig {
    SyntheticCameraConfig {
        fps,
        width: 32,
        height: 24,
        jitter_ms: 0.0,
        max_frames: Some(max_frames),
        seed: Some(11),
        ..Default::default()
    }
}

#[test]
fn test_camera_run_streams_poses_to_host() {
    let (event_tx, event_rx) = crossbeam_channel::unbounded();
    let queue = ControllerQueue::new();
    let gateway = SimulatedGateway::new(fast_detector(3), queue.completion_sender()).unwrap();

    let options = ControllerOptions {
        settings: ControllerSettings {
            target_fps: Some(15),
            auto_adjust_fps: false,
            enable_result_streaming: true,
            result_throttle_ms: 50,
            ..Default::default()
        },
        ..Default::default()
    };
    let controller = PipelineController::new(
        options,
        HardwareProfile::new(8, 16_000_000_000),
        Box::new(gateway),
        Box::new(ChannelSink::new(event_tx)),
        Instant::now(),
    );
    let mut handle = queue.spawn(controller).unwrap();

    let mut camera = SyntheticCamera::new(small_camera(30, 45)).unwrap();
    let stop = AtomicBool::new(false);
    let frames = handle.submitter().run_capture(&mut camera, &stop).unwrap();
    assert_eq!(frames, 45);

    // Give the last completions time to come back
    std::thread::sleep(std::time::Duration::from_millis(100));
    let snapshot = handle.shutdown().unwrap();
    drop(handle);

    assert_eq!(snapshot.stats.frames_received, 45);
    assert!((15..=25).contains(&snapshot.stats.frames_admitted));
    assert_eq!(snapshot.in_flight, 0);

    let events: Vec<HostEvent> = event_rx.try_iter().collect();
    assert!(matches!(
        events.first(),
        Some(HostEvent::DeviceCapability { .. })
    ));
    let poses = events
        .iter()
        .filter(|e| matches!(e, HostEvent::PoseDetected { .. }))
        .count();
    assert!(poses > 5, "only {} poses delivered", poses);
    assert!(!events
        .iter()
        .any(|e| matches!(e, HostEvent::ServiceError { .. })));
}

#[test]
fn test_failing_detector_reports_every_error() {
    let (event_tx, event_rx) = crossbeam_channel::unbounded();
    let queue = ControllerQueue::new();
    let config = SimulatedGatewayConfig {
        failure_rate: 1.0,
        ..fast_detector(5)
    };
    let gateway = SimulatedGateway::new(config, queue.completion_sender()).unwrap();

    let options = ControllerOptions {
        settings: ControllerSettings {
            target_fps: Some(10),
            auto_adjust_fps: false,
            ..Default::default()
        },
        ..Default::default()
    };
    let controller = PipelineController::new(
        options,
        HardwareProfile::new(8, 16_000_000_000),
        Box::new(gateway),
        Box::new(ChannelSink::new(event_tx)),
        Instant::now(),
    );
    let mut handle = queue.spawn(controller).unwrap();

    let mut camera = SyntheticCamera::new(small_camera(20, 20)).unwrap();
    let stop = AtomicBool::new(false);
    handle.submitter().run_capture(&mut camera, &stop).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(100));

    let snapshot = handle.shutdown().unwrap();
    let errors = event_rx
        .try_iter()
        .filter(|e| matches!(e, HostEvent::ServiceError { .. }))
        .count() as u64;

    assert!(errors > 0);
    assert_eq!(errors, snapshot.stats.inference_failures);
    assert_eq!(errors, snapshot.stats.dispatched);
}

#[test]
fn test_settings_update_applies_in_order() {
    let queue = ControllerQueue::new();
    let gateway = SimulatedGateway::new(fast_detector(9), queue.completion_sender()).unwrap();
    let (event_tx, _event_rx) = crossbeam_channel::unbounded();
    let controller = PipelineController::new(
        ControllerOptions::default(),
        HardwareProfile::new(4, 8_000_000_000),
        Box::new(gateway),
        Box::new(ChannelSink::new(event_tx)),
        Instant::now(),
    );
    let handle = queue.spawn(controller).unwrap();

    let update: SettingsUpdate =
        serde_json::from_str(r#"{"targetFPS": 24, "autoAdjustFPS": false}"#).unwrap();
    handle.update_settings(update).unwrap();

    let snapshot = handle.snapshot().unwrap();
    assert_eq!(snapshot.target_fps, 24);
    assert!(!snapshot.settings.auto_adjust_fps);
    assert!(snapshot.fps_history.is_empty());
    assert_eq!(handle.latest_snapshot().target_fps, 24);
}
