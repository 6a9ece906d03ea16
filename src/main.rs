//! lamco-pose-governor - Adaptive frame admission for camera pose estimation
//!
//! Entry point for the simulation binary. Wires a synthetic camera and a
//! simulated pose detector through the controller and prints host events.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lamco_pose_governor::capture::SyntheticCamera;
use lamco_pose_governor::config::{Config, ConfigOverrides, LoggingConfig};
use lamco_pose_governor::device::{classify, DeviceTier, HardwareProfile};
use lamco_pose_governor::inference::SimulatedGateway;
use lamco_pose_governor::pipeline::{
    ChannelSink, ControllerQueue, FrameSubmitter, HostEvent, PipelineController, SettingsUpdate,
};
use lamco_pose_governor::utils::{format_user_error, log_startup_diagnostics};

/// Command-line arguments for lamco-pose-governor
#[derive(Parser, Debug)]
#[command(name = "lamco-pose-governor")]
#[command(version, about = "Adaptive frame admission for camera pose estimation", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        env = "LAMCO_POSE_CONFIG",
        default_value = "/etc/lamco-pose-governor/config.toml"
    )]
    pub config: PathBuf,

    /// Stop after this many seconds (runs until Ctrl+C otherwise)
    #[arg(short, long, env = "LAMCO_POSE_DURATION")]
    pub duration: Option<u64>,

    /// Synthetic camera frame rate
    #[arg(long)]
    pub camera_fps: Option<u32>,

    /// Initial admission target (1-60, default: tier recommendation)
    #[arg(short, long)]
    pub target_fps: Option<u32>,

    /// Force the device tier (high|medium|low|unknown)
    #[arg(long)]
    pub tier: Option<DeviceTier>,

    /// Disable automatic target adjustment
    #[arg(long)]
    pub no_auto_adjust: bool,

    /// Deliver pose results to the host
    #[arg(long)]
    pub stream_results: bool,

    /// Log per-frame diagnostics at info level
    #[arg(long)]
    pub detailed_logging: bool,

    /// Print host events to stdout as JSON lines (logs go to stderr)
    #[arg(long)]
    pub json_events: bool,

    /// Read settings updates as JSON lines from stdin
    #[arg(long)]
    pub settings_stdin: bool,

    /// Seconds between status lines
    #[arg(long, default_value = "5")]
    pub status_interval: u64,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Write logs to file (in addition to the console)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            target_fps: self.target_fps,
            no_auto_adjust: self.no_auto_adjust,
            stream_results: self.stream_results,
            detailed_logging: self.detailed_logging,
            camera_fps: self.camera_fps,
            forced_tier: self.tier,
            log_format: self.log_format.clone(),
            log_file: self.log_file.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let loaded = Config::load(&args.config);
    let base = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => Config::default_config(),
    };
    let config = base.with_overrides(args.overrides());
    config.validate().context("Invalid configuration after CLI overrides")?;

    let _log_guard = init_logging(args.verbose, &config.logging, args.json_events)?;

    info!("════════════════════════════════════════════════════════");
    info!("  lamco-pose-governor v{}", env!("CARGO_PKG_VERSION"));
    info!("  Built: {}", env!("BUILD_DATE"));
    info!("  Commit: {}", env!("GIT_HASH"));
    info!("  Profile: {}", if cfg!(debug_assertions) { "debug" } else { "release" });
    info!("════════════════════════════════════════════════════════");

    if let Err(e) = &loaded {
        warn!("Failed to load config: {:#}, using defaults", e);
    } else {
        info!("Configuration loaded from {}", args.config.display());
    }
    debug!("Config: {:?}", config);

    let hardware = HardwareProfile::detect();
    let expected_tier = config.device.forced_tier.unwrap_or_else(|| {
        classify(
            hardware.core_count,
            hardware.memory_bytes,
            &config.device.thresholds,
        )
    });
    log_startup_diagnostics(&hardware, Some(expected_tier));

    if let Err(e) = run(&args, config, hardware).await {
        eprintln!("{}", format_user_error(&e));
        return Err(e);
    }

    info!("lamco-pose-governor shut down");
    Ok(())
}

async fn run(args: &Args, config: Config, hardware: HardwareProfile) -> Result<()> {
    let (event_tx, event_rx) = crossbeam_channel::unbounded::<HostEvent>();
    let json_events = args.json_events;
    let printer = std::thread::Builder::new()
        .name("host-events".to_string())
        .spawn(move || {
            for event in event_rx.iter() {
                if json_events {
                    match serde_json::to_string(&event) {
                        Ok(line) => println!("{}", line),
                        Err(e) => warn!("Failed to serialize {} event: {}", event.kind(), e),
                    }
                } else {
                    log_event(&event);
                }
            }
        })
        .context("Failed to spawn event printer thread")?;

    let queue = ControllerQueue::new();
    let gateway = SimulatedGateway::new(config.inference.simulated.clone(), queue.completion_sender())
        .context("Failed to start simulated pose detector")?;

    let controller = PipelineController::new(
        config.controller_options(),
        hardware,
        Box::new(gateway),
        Box::new(ChannelSink::new(event_tx)),
        Instant::now(),
    );
    let mut handle = queue.spawn(controller).context("Failed to start controller")?;

    let mut camera =
        SyntheticCamera::new(config.capture.clone()).context("Failed to open synthetic camera")?;

    if args.settings_stdin {
        spawn_settings_reader(handle.submitter())?;
    }

    let stop = Arc::new(AtomicBool::new(false));
    let capture_stop = Arc::clone(&stop);
    let submitter = handle.submitter();
    let mut capture = tokio::task::spawn_blocking(move || {
        submitter.run_capture(&mut camera, &capture_stop)
    });

    let timer = async {
        match args.duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(timer);

    let mut status = tokio::time::interval(Duration::from_secs(args.status_interval.max(1)));
    status.tick().await;

    let finished = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break None;
            }
            _ = &mut timer => {
                info!("Run duration elapsed, shutting down");
                break None;
            }
            result = &mut capture => break Some(result),
            _ = status.tick() => {
                let snapshot = handle.latest_snapshot();
                info!(
                    "Status: tier {}, target {} FPS, measured {:.1} FPS, {} in flight",
                    snapshot.tier,
                    snapshot.target_fps,
                    snapshot.measured_fps,
                    snapshot.in_flight
                );
            }
        }
    };

    stop.store(true, Ordering::Relaxed);
    let capture_result = match finished {
        Some(result) => result,
        None => capture.await,
    }
    .context("Capture task panicked")?;

    let snapshot = handle.shutdown().context("Controller shutdown failed")?;
    drop(handle);
    if printer.join().is_err() {
        warn!("Event printer thread panicked");
    }

    info!("=== Session {} ===", snapshot.session_id);
    info!("  Tier: {} (recommended {} FPS)", snapshot.tier, snapshot.recommended_fps);
    info!("  Final target: {} FPS", snapshot.target_fps);
    info!("  Last measured: {:.1} FPS", snapshot.measured_fps);
    info!("  {}", snapshot.stats.summary());

    let frames = capture_result?;
    info!("Capture delivered {} frames", frames);
    Ok(())
}

fn log_event(event: &HostEvent) {
    match event {
        HostEvent::FrameProcessed(report) if report.auto_adjusted == Some(true) => info!(
            "FPS adjusted to {} ({}), measured {:.1}",
            report.new_target_fps.unwrap_or_default(),
            report.reason.as_deref().unwrap_or(""),
            report.fps
        ),
        HostEvent::FrameProcessed(report) => debug!("FPS report: {:.1}", report.fps),
        HostEvent::PoseDetected {
            landmarks,
            processing_time,
            confidence,
            ..
        } => debug!(
            "Pose: {} landmarks, confidence {:.2}, {:.1}ms",
            landmarks.len(),
            confidence,
            processing_time
        ),
        HostEvent::DeviceCapability {
            tier,
            recommended_fps,
            ..
        } => info!("Device capability: {} ({} FPS)", tier, recommended_fps),
        HostEvent::ServiceError {
            error,
            processing_time,
        } => warn!("Service error after {:.1}ms: {}", processing_time, error),
    }
}

fn spawn_settings_reader(submitter: FrameSubmitter) -> Result<()> {
    std::thread::Builder::new()
        .name("settings-stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<SettingsUpdate>(&line) {
                    Ok(update) => {
                        if submitter.update_settings(update).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Ignoring settings line: {}", e),
                }
            }
            debug!("Settings reader finished");
        })
        .context("Failed to spawn settings reader thread")?;
    Ok(())
}

fn init_logging(
    verbose: u8,
    logging: &LoggingConfig,
    console_stderr: bool,
) -> Result<Option<WorkerGuard>> {
    let log_level = match verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "lamco_pose_governor={level},warn",
            level = log_level
        ))
    });

    let console = || {
        if console_stderr {
            BoxMakeWriter::new(std::io::stderr)
        } else {
            BoxMakeWriter::new(std::io::stdout)
        }
    };

    // Non-blocking file writer; the guard flushes on drop
    let (file_writer, guard) = match &logging.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    match logging.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(console()))
                .with(file_writer.map(|writer| {
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_ansi(false)
                }))
                .init();
        }
        "compact" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact().with_writer(console()))
                .with(file_writer.map(|writer| {
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_writer(writer)
                        .with_ansi(false)
                }))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(console()))
                .with(file_writer.map(|writer| {
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                }))
                .init();
        }
    }

    if let Some(path) = &logging.file {
        info!("Logging to file: {}", path.display());
    }

    Ok(guard)
}
