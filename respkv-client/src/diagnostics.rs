//! # Operation Diagnostics
//!
//! Provide the sink every client operation reports to: elapsed time, items
//! read and written, and a warning when an operation is slow.
//!
//! ## Design Principles
//! 1. **Injected Sink**: The client holds an `Arc<dyn Diagnostics>` handed in
//!    at construction; nothing here is process-global.
//! 2. **Accumulator Pattern**: `DiagnosticsRecorder` aggregates events with
//!    atomic counters so recording is cheap and allocation-free.
//! 3. **Fixed Buckets**: Latency buckets live in a contiguous array.
//!
//! ## Notes
//! - `TracingDiagnostics` is the default sink and only emits `tracing` events.
//! - Bucket boundaries are expressed in microseconds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

/// Category reported for every store operation.
pub const CATEGORY: &str = "redis";

/// Error code attached to slow-operation warnings.
pub const SLOW_OPERATION_CODE: &str = "SLOW_REDIS";

/// Sink for per-operation diagnostics.
pub trait Diagnostics: Send + Sync {
    /// Records one finished operation.
    fn track(&self, category: &'static str, elapsed: Duration, items_read: usize, items_written: usize);

    /// Reports an operation whose elapsed time exceeded the threshold.
    fn warn_slow(
        &self,
        error_code: &'static str,
        operation: &'static str,
        elapsed: Duration,
        threshold: Duration,
    );
}

/// Default sink writing `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn track(&self, category: &'static str, elapsed: Duration, items_read: usize, items_written: usize) {
        debug!(category, elapsed_ns = elapsed.as_nanos() as u64, items_read, items_written, "track");
    }

    fn warn_slow(
        &self,
        error_code: &'static str,
        operation: &'static str,
        elapsed: Duration,
        threshold: Duration,
    ) {
        warn!(
            error_code,
            operation,
            elapsed_ms = elapsed.as_millis() as u64,
            threshold_ms = threshold.as_millis() as u64,
            "slow store operation"
        );
    }
}

/// Default latency bucket boundaries in microseconds.
pub const DEFAULT_LATENCY_BUCKETS_US: [u64; 12] =
    [50, 100, 200, 500, 1_000, 2_000, 5_000, 10_000, 20_000, 50_000, 100_000, 500_000];

/// Snapshot of recorded diagnostics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    /// Total operations tracked.
    pub operations: u64,
    /// Sum of items read across operations.
    pub items_read: u64,
    /// Sum of items written across operations.
    pub items_written: u64,
    /// Slow-operation warnings received.
    pub slow_operations: u64,
    /// Latency histogram snapshot.
    pub latency: LatencySnapshot,
}

/// Snapshot of the latency histogram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencySnapshot {
    /// Bucket boundaries in microseconds.
    pub bounds_us: Vec<u64>,
    /// Bucket counts, including the overflow bucket at the end.
    pub buckets: Vec<u64>,
    /// Total number of samples.
    pub samples: u64,
    /// Sum of latencies in microseconds.
    pub sum_us: u64,
}

/// Thread-safe accumulating sink.
///
/// `Ordering::Relaxed` is enough: counters are read as independent totals,
/// never as a consistent cross-field view.
pub struct DiagnosticsRecorder {
    operations: AtomicU64,
    items_read: AtomicU64,
    items_written: AtomicU64,
    slow_operations: AtomicU64,
    latency: LatencyHistogram,
}

impl DiagnosticsRecorder {
    /// Creates a recorder with the default latency buckets.
    pub fn new() -> Self {
        Self::with_latency_buckets(DEFAULT_LATENCY_BUCKETS_US.to_vec())
    }

    /// Creates a recorder with custom bucket boundaries (ascending microseconds).
    pub fn with_latency_buckets(bounds_us: Vec<u64>) -> Self {
        DiagnosticsRecorder {
            operations: AtomicU64::new(0),
            items_read: AtomicU64::new(0),
            items_written: AtomicU64::new(0),
            slow_operations: AtomicU64::new(0),
            latency: LatencyHistogram::new(bounds_us),
        }
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            operations: self.operations.load(Ordering::Relaxed),
            items_read: self.items_read.load(Ordering::Relaxed),
            items_written: self.items_written.load(Ordering::Relaxed),
            slow_operations: self.slow_operations.load(Ordering::Relaxed),
            latency: self.latency.snapshot(),
        }
    }
}

impl Default for DiagnosticsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagnostics for DiagnosticsRecorder {
    fn track(&self, _category: &'static str, elapsed: Duration, items_read: usize, items_written: usize) {
        self.operations.fetch_add(1, Ordering::Relaxed);
        self.items_read.fetch_add(items_read as u64, Ordering::Relaxed);
        self.items_written.fetch_add(items_written as u64, Ordering::Relaxed);
        self.latency.record(elapsed);
    }

    fn warn_slow(&self, _error_code: &'static str, _operation: &'static str, _elapsed: Duration, _threshold: Duration) {
        self.slow_operations.fetch_add(1, Ordering::Relaxed);
    }
}

/// Fixed-bucket latency histogram.
///
/// Uses a linear scan to pick buckets; the list is small and stays hot in cache.
pub struct LatencyHistogram {
    bounds_us: Vec<u64>,
    buckets: Vec<AtomicU64>,
    sum_us: AtomicU64,
    samples: AtomicU64,
}

impl LatencyHistogram {
    /// Creates a histogram with `bounds_us.len() + 1` buckets (last is overflow).
    pub fn new(bounds_us: Vec<u64>) -> Self {
        let buckets = (0..=bounds_us.len()).map(|_| AtomicU64::new(0)).collect();
        LatencyHistogram {
            bounds_us,
            buckets,
            sum_us: AtomicU64::new(0),
            samples: AtomicU64::new(0),
        }
    }

    /// Records into the first bucket where `micros <= bound`, else overflow.
    pub fn record(&self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.samples.fetch_add(1, Ordering::Relaxed);
        self.sum_us.fetch_add(micros, Ordering::Relaxed);

        let idx = self
            .bounds_us
            .iter()
            .position(|&bound| micros <= bound)
            .unwrap_or(self.bounds_us.len());
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LatencySnapshot {
        LatencySnapshot {
            bounds_us: self.bounds_us.clone(),
            buckets: self.buckets.iter().map(|b| b.load(Ordering::Relaxed)).collect(),
            samples: self.samples.load(Ordering::Relaxed),
            sum_us: self.sum_us.load(Ordering::Relaxed),
        }
    }
}
