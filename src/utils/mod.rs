//! Utility Functions and Diagnostics
//!
//! System diagnostics and user-friendly error formatting.
//!
//! ## Diagnostics
//!
//! The [`diagnostics`] module logs the runtime environment and the device
//! classification at startup:
//!
//! ```no_run
//! use lamco_pose_governor::device::{HardwareProfile, TierThresholds};
//! use lamco_pose_governor::utils::{log_startup_diagnostics, SystemInfo};
//!
//! let hardware = HardwareProfile::detect();
//! SystemInfo::from_hardware(hardware).log(); // OS, kernel, cores, memory
//!
//! let tier = hardware.classify(&TierThresholds::default());
//! log_startup_diagnostics(&hardware, Some(tier));
//! ```
//!
//! ## Error Formatting
//!
//! The [`errors`] module renders fatal errors for people, not logs:
//!
//! ```no_run
//! use lamco_pose_governor::utils::format_user_error;
//!
//! # fn run() -> anyhow::Result<()> { Ok(()) }
//! if let Err(e) = run() {
//!     eprintln!("{}", format_user_error(&e));
//! }
//! ```
//!
//! Error categories with context-aware help:
//! - Camera errors → device presence, permission, stalls
//! - Detector errors → load reduction, `[inference]` settings
//! - Config errors → syntax, inconsistent thresholds

pub mod diagnostics;
pub mod errors;

pub use diagnostics::{log_startup_diagnostics, SystemInfo};
pub use errors::format_user_error;
