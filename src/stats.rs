//! # Stats
//!
//! Counter collaborator used by the pipeline. The backend is pluggable behind
//! the statsd-shaped `Stats` trait; `InMemoryStats` keeps everything in
//! process and is what tests and the binary use.
//!
//! `PipelineStats` holds the loop's own hot-path counters as atomics.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Name of the counter incremented for every unrouted activity
pub const DROPPED: &str = "dropped";

/// Metrics sink
pub trait Stats: Send + Sync + 'static {
    fn incr(&self, key: &str);

    fn decr(&self, key: &str);

    fn timing(&self, key: &str, ms: f64);

    fn gauge(&self, key: &str, value: i64);

    fn set(&self, key: &str, value: i64);
}

/// Running summary of the samples recorded for one timing key
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSummary {
    pub count: u64,
    pub sum_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl TimingSummary {
    fn first(ms: f64) -> Self {
        Self {
            count: 1,
            sum_ms: ms,
            min_ms: ms,
            max_ms: ms,
        }
    }

    fn record(&mut self, ms: f64) {
        self.count += 1;
        self.sum_ms += ms;
        self.min_ms = self.min_ms.min(ms);
        self.max_ms = self.max_ms.max(ms);
    }

    pub fn mean_ms(&self) -> f64 {
        self.sum_ms / self.count as f64
    }
}

/// Concurrent in-process stats backend.
///
/// Timings are folded into a `TimingSummary` per key, so memory stays bounded
/// by the number of keys however long the process runs.
#[derive(Debug, Default)]
pub struct InMemoryStats {
    counters: DashMap<String, i64>,
    gauges: DashMap<String, i64>,
    timings: DashMap<String, TimingSummary>,
    sets: DashMap<String, HashSet<i64>>,
}

impl InMemoryStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter (0 if never touched)
    pub fn counter(&self, key: &str) -> i64 {
        self.counters.get(key).map(|v| *v).unwrap_or(0)
    }

    pub fn gauge_value(&self, key: &str) -> Option<i64> {
        self.gauges.get(key).map(|v| *v)
    }

    pub fn timing_summary(&self, key: &str) -> Option<TimingSummary> {
        self.timings.get(key).map(|v| *v)
    }

    /// Number of distinct values recorded for a set
    pub fn set_cardinality(&self, key: &str) -> usize {
        self.sets.get(key).map(|v| v.len()).unwrap_or(0)
    }
}

impl Stats for InMemoryStats {
    fn incr(&self, key: &str) {
        *self.counters.entry(key.to_string()).or_insert(0) += 1;
    }

    fn decr(&self, key: &str) {
        *self.counters.entry(key.to_string()).or_insert(0) -= 1;
    }

    fn timing(&self, key: &str, ms: f64) {
        self.timings
            .entry(key.to_string())
            .and_modify(|summary| summary.record(ms))
            .or_insert_with(|| TimingSummary::first(ms));
    }

    fn gauge(&self, key: &str, value: i64) {
        self.gauges.insert(key.to_string(), value);
    }

    fn set(&self, key: &str, value: i64) {
        self.sets.entry(key.to_string()).or_default().insert(value);
    }
}

/// Consume loop counters
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub received: AtomicU64,
    pub processed: AtomicU64,
    pub parse_failures: AtomicU64,
    pub dispatch_failures: AtomicU64,
    pub dropped: AtomicU64,
    pub handler_failures: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn get_processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn get_parse_failures(&self) -> u64 {
        self.parse_failures.load(Ordering::Relaxed)
    }

    pub fn get_dispatch_failures(&self) -> u64 {
        self.dispatch_failures.load(Ordering::Relaxed)
    }

    pub fn get_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn get_handler_failures(&self) -> u64 {
        self.handler_failures.load(Ordering::Relaxed)
    }
}
