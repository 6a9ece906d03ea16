//! Pipeline statistics

use serde::Serialize;

/// Round-trip processing time statistics
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingTimeStats {
    /// Samples recorded
    pub samples: u64,
    /// Exponential moving average (ms)
    pub avg_ms: f64,
    /// Fastest sample (ms)
    pub min_ms: f64,
    /// Slowest sample (ms)
    pub max_ms: f64,
}

impl ProcessingTimeStats {
    /// Empty statistics
    pub fn new() -> Self {
        Self {
            samples: 0,
            avg_ms: 0.0,
            min_ms: f64::MAX,
            max_ms: 0.0,
        }
    }

    /// Record one sample
    pub fn record(&mut self, ms: f64) {
        self.samples += 1;
        if self.samples == 1 {
            self.avg_ms = ms;
        } else {
            // Exponential moving average (α = 0.1)
            self.avg_ms = self.avg_ms * 0.9 + ms * 0.1;
        }
        self.min_ms = self.min_ms.min(ms);
        self.max_ms = self.max_ms.max(ms);
    }

    /// Fastest sample, 0 before any sample
    pub fn min(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.min_ms
        }
    }
}

impl Default for ProcessingTimeStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Controller counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    /// Frames delivered by the capture source
    pub frames_received: u64,
    /// Frames passing the admission gate
    pub frames_admitted: u64,
    /// Frames rejected by the gate or by disabled detection
    pub frames_skipped: u64,
    /// Frames handed to the gateway
    pub dispatched: u64,
    /// Submissions the gateway refused
    pub dispatch_failures: u64,
    /// Completions received
    pub completions: u64,
    /// Completions reporting failure
    pub inference_failures: u64,
    /// In-flight records dropped by the age sweep
    pub evicted: u64,
    /// Pose results delivered
    pub results_emitted: u64,
    /// Pose results suppressed by the throttle
    pub results_throttled: u64,
    /// Pose results dropped (detection or streaming off, no person)
    pub results_discarded: u64,
    /// FPS reports delivered (including adjustments)
    pub fps_reports_emitted: u64,
    /// FPS reports suppressed by the throttle
    pub fps_reports_throttled: u64,
    /// Auto-tune target changes
    pub auto_adjustments: u64,
    /// Round-trip timing
    pub processing: ProcessingTimeStats,
}

impl PipelineStats {
    /// Percentage of frames admitted
    pub fn admission_percentage(&self) -> f32 {
        if self.frames_received > 0 {
            (self.frames_admitted as f32 / self.frames_received as f32) * 100.0
        } else {
            0.0
        }
    }

    /// Format stats for logging
    pub fn summary(&self) -> String {
        format!(
            "{} frames, {:.0}% admitted, {} dispatched ({} failed), {} results ({} throttled), \
             {} errors, {} evicted, avg {:.1}ms (min {:.1}, max {:.1})",
            self.frames_received,
            self.admission_percentage(),
            self.dispatched,
            self.dispatch_failures,
            self.results_emitted,
            self.results_throttled,
            self.inference_failures,
            self.evicted,
            self.processing.avg_ms,
            self.processing.min(),
            self.processing.max_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_ema() {
        let mut stats = ProcessingTimeStats::new();
        assert_eq!(stats.min(), 0.0);

        stats.record(10.0);
        assert_eq!(stats.avg_ms, 10.0);

        stats.record(20.0);
        assert!((stats.avg_ms - 11.0).abs() < 1e-9);
        assert_eq!(stats.min(), 10.0);
        assert_eq!(stats.max_ms, 20.0);
    }

    #[test]
    fn test_admission_percentage() {
        let stats = PipelineStats {
            frames_received: 60,
            frames_admitted: 15,
            ..Default::default()
        };
        assert!((stats.admission_percentage() - 25.0).abs() < 1e-4);
        assert!(stats.summary().starts_with("60 frames, 25% admitted"));
    }
}
