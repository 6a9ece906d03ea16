//! Output Throttling
//!
//! Rate-limits outbound event classes so a fast inference or measurement
//! loop does not flood a slower consumer.
//!
//! | Class | Gate | Default | Floor |
//! |-------|------|---------|-------|
//! | Pose results | interval | 100ms | 16ms |
//! | FPS reports | interval OR change | 500ms / 2.0 FPS | 100ms / 0.5 FPS |
//!
//! The first event of a class always passes. Parameters are runtime
//! adjustable and are clamped to the class floor rather than rejected.

use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::debug;

/// Outbound event class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrottleClass {
    /// Pose-detected events (interval gate only)
    PoseResults,
    /// FPS reports (interval or magnitude-of-change gate)
    FpsReports,
}

impl ThrottleClass {
    /// Smallest accepted minimum interval (ms)
    pub fn min_interval_floor_ms(&self) -> u64 {
        match self {
            // About one frame at 60 FPS
            Self::PoseResults => 16,
            Self::FpsReports => 100,
        }
    }

    /// Smallest accepted change threshold, `None` for interval-only classes
    pub fn min_change_floor(&self) -> Option<f32> {
        match self {
            Self::PoseResults => None,
            Self::FpsReports => Some(0.5),
        }
    }
}

/// Throttle counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct ThrottleStats {
    /// Events let through
    pub emitted: u64,
    /// Events suppressed
    pub suppressed: u64,
}

/// Per-class output throttle
#[derive(Debug, Clone)]
pub struct OutputThrottle {
    class: ThrottleClass,
    min_interval: Duration,
    /// Only meaningful for classes with a change floor
    min_change: Option<f32>,
    last_emit: Option<Instant>,
    last_value: Option<f32>,
    stats: ThrottleStats,
}

impl OutputThrottle {
    /// Interval-only throttle for pose results
    pub fn pose_results(min_interval_ms: u64) -> Self {
        Self::new(ThrottleClass::PoseResults, min_interval_ms, None)
    }

    /// Interval-or-change throttle for FPS reports
    pub fn fps_reports(min_interval_ms: u64, min_change: f32) -> Self {
        Self::new(ThrottleClass::FpsReports, min_interval_ms, Some(min_change))
    }

    fn new(class: ThrottleClass, min_interval_ms: u64, min_change: Option<f32>) -> Self {
        let mut throttle = Self {
            class,
            min_interval: Duration::ZERO,
            min_change: None,
            last_emit: None,
            last_value: None,
            stats: ThrottleStats::default(),
        };
        throttle.set_min_interval_ms(min_interval_ms);
        if let Some(change) = min_change {
            throttle.set_min_change(change);
        }
        throttle
    }

    /// Interval gate; records the emission when it passes
    pub fn should_emit(&mut self, now: Instant) -> bool {
        let pass = self.interval_elapsed(now);
        self.record(pass, now, None);
        pass
    }

    /// Interval-or-change gate; records the emission when it passes
    ///
    /// For interval-only classes this behaves like [`Self::should_emit`].
    pub fn should_emit_value(&mut self, now: Instant, value: f32) -> bool {
        let changed = match (self.min_change, self.last_value) {
            (Some(threshold), Some(last)) => (value - last).abs() >= threshold,
            _ => false,
        };
        let pass = changed || self.interval_elapsed(now);
        self.record(pass, now, Some(value));
        pass
    }

    fn interval_elapsed(&self, now: Instant) -> bool {
        match self.last_emit {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        }
    }

    fn record(&mut self, pass: bool, now: Instant, value: Option<f32>) {
        if pass {
            self.last_emit = Some(now);
            if value.is_some() {
                self.last_value = value;
            }
            self.stats.emitted += 1;
        } else {
            self.stats.suppressed += 1;
        }
    }

    /// Set the minimum interval, clamped to the class floor
    ///
    /// Returns the applied value in milliseconds.
    pub fn set_min_interval_ms(&mut self, requested_ms: u64) -> u64 {
        let floor = self.class.min_interval_floor_ms();
        let applied = requested_ms.max(floor);
        if applied != requested_ms {
            debug!(
                "{:?} throttle interval {}ms clamped to {}ms",
                self.class, requested_ms, applied
            );
        }
        self.min_interval = Duration::from_millis(applied);
        applied
    }

    /// Set the change threshold, clamped to the class floor
    ///
    /// Ignored for interval-only classes. Returns the applied value.
    pub fn set_min_change(&mut self, requested: f32) -> Option<f32> {
        let floor = self.class.min_change_floor()?;
        // f32::max discards NaN
        let applied = requested.max(floor);
        if applied != requested {
            debug!(
                "{:?} throttle change threshold {} clamped to {}",
                self.class, requested, applied
            );
        }
        self.min_change = Some(applied);
        Some(applied)
    }

    /// Class of this throttle
    pub fn class(&self) -> ThrottleClass {
        self.class
    }

    /// Current minimum interval
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Current change threshold
    pub fn min_change(&self) -> Option<f32> {
        self.min_change
    }

    /// Last emitted value (FPS reports)
    pub fn last_value(&self) -> Option<f32> {
        self.last_value
    }

    /// Get statistics
    pub fn stats(&self) -> &ThrottleStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(start: Instant, ms: u64) -> Instant {
        start + Duration::from_millis(ms)
    }

    #[test]
    fn test_burst_yields_single_result() {
        let mut throttle = OutputThrottle::pose_results(100);
        let start = Instant::now();

        let emitted = (0..1000)
            .filter(|i| throttle.should_emit(start + Duration::from_micros(i * 50)))
            .count();

        assert_eq!(emitted, 1);
        assert_eq!(throttle.stats().suppressed, 999);
    }

    #[test]
    fn test_pose_interval_gate() {
        let mut throttle = OutputThrottle::pose_results(100);
        let start = Instant::now();
        assert!(throttle.should_emit(start));
        assert!(!throttle.should_emit(ms(start, 99)));
        assert!(throttle.should_emit(ms(start, 100)));
    }

    #[test]
    fn test_fps_change_bypasses_interval() {
        let mut throttle = OutputThrottle::fps_reports(500, 2.0);
        let start = Instant::now();
        assert!(throttle.should_emit_value(start, 30.0));
        assert!(throttle.should_emit_value(ms(start, 10), 33.0));
        assert_eq!(throttle.last_value(), Some(33.0));
    }

    #[test]
    fn test_fps_small_change_waits_for_interval() {
        let mut throttle = OutputThrottle::fps_reports(500, 2.0);
        let start = Instant::now();
        assert!(throttle.should_emit_value(start, 30.0));
        assert!(!throttle.should_emit_value(ms(start, 200), 31.0));
        assert!(throttle.should_emit_value(ms(start, 500), 31.0));
    }

    #[test]
    fn test_suppressed_value_not_recorded() {
        let mut throttle = OutputThrottle::fps_reports(500, 2.0);
        let start = Instant::now();
        assert!(throttle.should_emit_value(start, 30.0));
        // 31.5 suppressed; comparison stays against 30.0
        assert!(!throttle.should_emit_value(ms(start, 100), 31.5));
        assert!(throttle.should_emit_value(ms(start, 200), 32.0));
    }

    #[test]
    fn test_floors() {
        let mut pose = OutputThrottle::pose_results(0);
        assert_eq!(pose.min_interval(), Duration::from_millis(16));
        assert_eq!(pose.set_min_change(5.0), None);

        let mut fps = OutputThrottle::fps_reports(10, 0.1);
        assert_eq!(fps.min_interval(), Duration::from_millis(100));
        assert_eq!(fps.min_change(), Some(0.5));
        assert_eq!(fps.set_min_change(f32::NAN), Some(0.5));
        assert_eq!(fps.set_min_interval_ms(750), 750);
    }
}
