//! # lamco-pose-governor
//!
//! Frame admission and adaptive performance control for a live camera
//! pose-estimation pipeline.
//!
//! Sits between a camera's frame producer and an asynchronous pose
//! detector and decides which frames are worth the detector's time, how
//! fast the pipeline is really running, when to re-target its own frame
//! rate, and how often results may leave for a slower host.
//!
//! # Architecture
//!
//! ```text
//! lamco-pose-governor
//!   ├─> Device Tier Classifier (cores + memory -> tier, recommended FPS)
//!   ├─> Frame-Rate Governor (measure always, admit at target rate)
//!   ├─> Auto-Tuner (history vs target -> +/- 5 FPS within tier bounds)
//!   ├─> Output Throttles (pose results, FPS reports)
//!   └─> Pose Inference Gateway boundary (in-flight tracking, eviction)
//! ```
//!
//! # Data Flow
//!
//! **Frame Path:** Capture → Governor → (admitted) → Inference Gateway
//!
//! **Result Path:** Gateway → Controller queue → Result Throttle → Host
//!
//! **Control Path:** Governor measurement → Auto-Tuner → Governor target
//!
//! # Modules
//!
//! - [`device`]: tier classification and hardware probing
//! - [`performance`]: governor, auto-tuner, output throttle
//! - [`inference`]: gateway trait, correlation ids, in-flight tracker,
//!   simulated detector
//! - [`capture`]: capture source trait and synthetic camera
//! - [`pipeline`]: the controller, its serial queue, and host events
//! - [`config`]: TOML configuration
//! - [`utils`]: diagnostics and user-facing error formatting

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Camera capture boundary
pub mod capture;

/// Configuration
pub mod config;

/// Device capability tiers
pub mod device;

/// Pose inference boundary
///
/// Gateway trait, correlation ids, in-flight request tracking, and a
/// simulated detector for running the pipeline without a model.
pub mod inference;

/// Frame admission and adaptive performance control
pub mod performance;

/// Controller, serial queue, and host events
pub mod pipeline;

/// Utility functions
pub mod utils;
