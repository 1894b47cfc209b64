//! In-process metrics for the journey engine.
//!
//! Counters and histograms live in a global registry; workers log a
//! snapshot after every run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the journey engine.
#[derive(Debug, Default)]
pub struct Metrics {
    // Reconstruction
    pub journeys_rebuilt: Counter,
    pub journeys_failed: Counter,
    pub bots_detected: Counter,
    pub events_read: Counter,

    // Consolidation cleanup
    pub duplicates_deleted: Counter,
    pub orphans_deleted: Counter,

    // Store
    pub store_errors: Counter,

    // Latency histograms
    pub rebuild_latency_ms: Histogram,
    pub store_latency_ms: Histogram,

    // Gauges
    pub rebuilds_in_flight: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            journeys_rebuilt: self.journeys_rebuilt.get(),
            journeys_failed: self.journeys_failed.get(),
            bots_detected: self.bots_detected.get(),
            events_read: self.events_read.get(),
            duplicates_deleted: self.duplicates_deleted.get(),
            orphans_deleted: self.orphans_deleted.get(),
            store_errors: self.store_errors.get(),
            rebuild_latency_mean_ms: self.rebuild_latency_ms.mean(),
            store_latency_mean_ms: self.store_latency_ms.mean(),
            rebuilds_in_flight: self.rebuilds_in_flight.get(),
        }
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub journeys_rebuilt: u64,
    pub journeys_failed: u64,
    pub bots_detected: u64,
    pub events_read: u64,
    pub duplicates_deleted: u64,
    pub orphans_deleted: u64,
    pub store_errors: u64,
    pub rebuild_latency_mean_ms: f64,
    pub store_latency_mean_ms: f64,
    pub rebuilds_in_flight: u64,
}

impl MetricsSnapshot {
    /// Emits the snapshot as one structured log line.
    pub fn log(&self) {
        info!(
            journeys_rebuilt = self.journeys_rebuilt,
            journeys_failed = self.journeys_failed,
            bots_detected = self.bots_detected,
            events_read = self.events_read,
            duplicates_deleted = self.duplicates_deleted,
            orphans_deleted = self.orphans_deleted,
            store_errors = self.store_errors,
            rebuild_latency_mean_ms = self.rebuild_latency_mean_ms,
            store_latency_mean_ms = self.store_latency_mean_ms,
            "Metrics snapshot"
        );
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
