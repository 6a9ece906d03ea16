//! In-Flight Request Tracking
//!
//! Records the dispatch time of every submitted frame, keyed by
//! correlation id, so the matching completion can report round-trip
//! processing time. Completions may arrive in any order.
//!
//! A detector that silently drops a request would otherwise leave its
//! record behind forever, so [`InFlightTracker::evict_stale`] removes
//! records older than a fixed age. The controller runs the sweep once per
//! measurement window.

use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::CorrelationId;

/// Lowest accepted eviction age
pub const MIN_IN_FLIGHT_AGE_MS: u64 = 100;

/// Tracker counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct InFlightStats {
    /// Records created
    pub dispatched: u64,
    /// Records matched by a completion
    pub completed: u64,
    /// Records removed because dispatch failed
    pub cancelled: u64,
    /// Records removed by the age sweep
    pub evicted: u64,
    /// Completions with no matching record
    pub unmatched: u64,
    /// Largest number of simultaneous records seen
    pub peak_pending: usize,
}

/// Outstanding inference requests
#[derive(Debug)]
pub struct InFlightTracker {
    pending: HashMap<CorrelationId, Instant>,
    max_age: Duration,
    stats: InFlightStats,
}

impl InFlightTracker {
    /// Create a tracker evicting records older than `max_age_ms`
    pub fn new(max_age_ms: u64) -> Self {
        Self {
            pending: HashMap::new(),
            max_age: Duration::from_millis(max_age_ms.max(MIN_IN_FLIGHT_AGE_MS)),
            stats: InFlightStats::default(),
        }
    }

    /// Record that `id` was dispatched at `now`
    pub fn record_dispatch(&mut self, id: CorrelationId, now: Instant) {
        if self.pending.insert(id, now).is_some() {
            debug!("In-flight record {} replaced", id);
        }
        self.stats.dispatched += 1;
        self.stats.peak_pending = self.stats.peak_pending.max(self.pending.len());
    }

    /// Match a completion; returns round-trip time when the record exists
    pub fn complete(&mut self, id: CorrelationId, now: Instant) -> Option<Duration> {
        match self.pending.remove(&id) {
            Some(dispatched) => {
                self.stats.completed += 1;
                Some(now.saturating_duration_since(dispatched))
            }
            None => {
                self.stats.unmatched += 1;
                trace!("No in-flight record for {}", id);
                None
            }
        }
    }

    /// Remove a record whose dispatch failed
    pub fn cancel(&mut self, id: CorrelationId) -> bool {
        let removed = self.pending.remove(&id).is_some();
        if removed {
            self.stats.cancelled += 1;
        }
        removed
    }

    /// Drop records older than the configured age; returns how many
    pub fn evict_stale(&mut self, now: Instant) -> usize {
        let max_age = self.max_age;
        let before = self.pending.len();
        self.pending
            .retain(|_, dispatched| now.saturating_duration_since(*dispatched) <= max_age);
        let evicted = before - self.pending.len();
        self.stats.evicted += evicted as u64;
        evicted
    }

    /// Number of outstanding records
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is outstanding
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Eviction age
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Get statistics
    pub fn stats(&self) -> &InFlightStats {
        &self.stats
    }
}
