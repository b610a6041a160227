//! Lock-free metrics collection and periodic reporting
//!
//! Counter updates use atomics so resolvers and analyzers shared across
//! threads never contend on a lock. `report()` swaps the periodic counters
//! to take a snapshot.
//!
//! NOTE: All atomics use Relaxed ordering; these are statistical counters
//! only and must not drive logic decisions.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Exponential bucket boundaries (microseconds)
/// Buckets: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200
const BUCKET_BOUNDS: [u64; 10] = [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];
const NUM_BUCKETS: usize = 11;

/// Hit path depth bucket boundaries (number of ids in the path)
/// Buckets: ≤1, ≤2, ≤3, ≤4, ≤6, ≤8, ≤12, ≤16, ≤24, ≤32, >32
const DEPTH_BOUNDS: [u64; 10] = [1, 2, 3, 4, 6, 8, 12, 16, 24, 32];

#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

#[inline]
fn depth_bucket_index(depth: u64) -> usize {
    DEPTH_BOUNDS.partition_point(|&bound| bound < depth)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Swap all buckets to zero and return their values
#[inline]
fn swap_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Load all bucket values without resetting
#[inline]
fn load_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.load(Ordering::Relaxed);
    }
    result
}

/// Compute percentile from latency histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile) as u64;
    let mut cumulative = 0u64;

    // Last bucket uses 2x the previous bound
    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
        [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200, 102400];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// Lock-free metrics collector
pub struct Metrics {
    /// Hit path queries whose point landed inside the root (monotonic)
    paths_resolved_total: AtomicU64,
    /// Hit path queries outside the root frame (monotonic)
    paths_missed_total: AtomicU64,
    /// Hit path depth histogram (cumulative)
    path_depth_buckets: [AtomicU64; NUM_BUCKETS],
    path_depth_sum: AtomicU64,
    path_depth_max: AtomicU64,
    /// Summaries computed (monotonic)
    summaries_total: AtomicU64,
    /// Visit events consumed by summaries (monotonic)
    visits_total: AtomicU64,
    /// Sessions counted by summaries (monotonic)
    sessions_total: AtomicU64,
    /// Operations since last report (reset on report)
    ops_since_report: AtomicU64,
    /// Operation latency histogram (reset on report)
    latency_buckets: [AtomicU64; NUM_BUCKETS],
    latency_sum_us: AtomicU64,
    latency_max_us: AtomicU64,
    /// Last report time (only accessed from reporter)
    last_report_time: Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            paths_resolved_total: AtomicU64::new(0),
            paths_missed_total: AtomicU64::new(0),
            path_depth_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            path_depth_sum: AtomicU64::new(0),
            path_depth_max: AtomicU64::new(0),
            summaries_total: AtomicU64::new(0),
            visits_total: AtomicU64::new(0),
            sessions_total: AtomicU64::new(0),
            ops_since_report: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            latency_sum_us: AtomicU64::new(0),
            latency_max_us: AtomicU64::new(0),
            last_report_time: Mutex::new(Instant::now()),
        }
    }

    /// Record a hit path query (lock-free). An empty path counts as a miss.
    #[inline]
    pub fn record_path_resolved(&self, depth: usize, latency_us: u64) {
        if depth == 0 {
            self.paths_missed_total.fetch_add(1, Ordering::Relaxed);
        } else {
            let depth = depth as u64;
            self.paths_resolved_total.fetch_add(1, Ordering::Relaxed);
            self.path_depth_buckets[depth_bucket_index(depth)].fetch_add(1, Ordering::Relaxed);
            self.path_depth_sum.fetch_add(depth, Ordering::Relaxed);
            update_atomic_max(&self.path_depth_max, depth);
        }
        self.record_latency(latency_us);
    }

    /// Record a visit summary (lock-free)
    #[inline]
    pub fn record_summary(&self, visits: usize, sessions: usize, latency_us: u64) {
        self.summaries_total.fetch_add(1, Ordering::Relaxed);
        self.visits_total.fetch_add(visits as u64, Ordering::Relaxed);
        self.sessions_total.fetch_add(sessions as u64, Ordering::Relaxed);
        self.record_latency(latency_us);
    }

    #[inline]
    fn record_latency(&self, latency_us: u64) {
        self.ops_since_report.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.latency_max_us, latency_us);
    }

    #[inline]
    pub fn paths_resolved_total(&self) -> u64 {
        self.paths_resolved_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn paths_missed_total(&self) -> u64 {
        self.paths_missed_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn summaries_total(&self) -> u64 {
        self.summaries_total.load(Ordering::Relaxed)
    }

    /// Snapshot all metrics and reset the periodic latency counters
    pub fn report(&self) -> MetricsSummary {
        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let ops = self.ops_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.latency_sum_us.swap(0, Ordering::Relaxed);
        let latency_max = self.latency_max_us.swap(0, Ordering::Relaxed);
        let lat_buckets = swap_buckets(&self.latency_buckets);

        let elapsed_secs = elapsed.as_secs_f64();
        let ops_per_sec = if elapsed_secs > 0.0 { ops as f64 / elapsed_secs } else { 0.0 };
        let avg_latency = if ops > 0 { latency_sum / ops } else { 0 };

        let path_depth_buckets = load_buckets(&self.path_depth_buckets);
        let paths_resolved_total = self.paths_resolved_total.load(Ordering::Relaxed);
        let path_depth_sum = self.path_depth_sum.load(Ordering::Relaxed);
        let path_depth_avg =
            if paths_resolved_total > 0 { path_depth_sum / paths_resolved_total } else { 0 };

        MetricsSummary {
            paths_resolved_total,
            paths_missed_total: self.paths_missed_total.load(Ordering::Relaxed),
            path_depth_buckets,
            path_depth_sum,
            path_depth_avg,
            path_depth_max: self.path_depth_max.load(Ordering::Relaxed),
            summaries_total: self.summaries_total.load(Ordering::Relaxed),
            visits_total: self.visits_total.load(Ordering::Relaxed),
            sessions_total: self.sessions_total.load(Ordering::Relaxed),
            ops,
            ops_per_sec,
            lat_buckets,
            latency_sum_us: latency_sum,
            avg_latency_us: avg_latency,
            max_latency_us: latency_max,
            lat_p50_us: percentile_from_buckets(&lat_buckets, 0.50),
            lat_p95_us: percentile_from_buckets(&lat_buckets, 0.95),
            lat_p99_us: percentile_from_buckets(&lat_buckets, 0.99),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of histogram buckets (exported for the text exposition writer)
pub const METRICS_NUM_BUCKETS: usize = NUM_BUCKETS;

pub const METRICS_BUCKET_BOUNDS: [u64; 10] = BUCKET_BOUNDS;
pub const METRICS_DEPTH_BOUNDS: [u64; 10] = DEPTH_BOUNDS;

#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub paths_resolved_total: u64,
    pub paths_missed_total: u64,
    /// Hit path depth histogram
    /// Bounds: ≤1, ≤2, ≤3, ≤4, ≤6, ≤8, ≤12, ≤16, ≤24, ≤32, >32
    pub path_depth_buckets: [u64; NUM_BUCKETS],
    pub path_depth_sum: u64,
    pub path_depth_avg: u64,
    pub path_depth_max: u64,
    pub summaries_total: u64,
    pub visits_total: u64,
    pub sessions_total: u64,
    /// Operations since the previous report
    pub ops: u64,
    pub ops_per_sec: f64,
    /// Operation latency histogram
    /// Bounds: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200 µs
    pub lat_buckets: [u64; NUM_BUCKETS],
    pub latency_sum_us: u64,
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
    pub lat_p50_us: u64,
    pub lat_p95_us: u64,
    pub lat_p99_us: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            paths_resolved = %self.paths_resolved_total,
            paths_missed = %self.paths_missed_total,
            path_depth_max = %self.path_depth_max,
            summaries = %self.summaries_total,
            visits = %self.visits_total,
            sessions = %self.sessions_total,
            ops = %self.ops,
            ops_per_sec = %format!("{:.1}", self.ops_per_sec),
            avg_latency_us = %self.avg_latency_us,
            max_latency_us = %self.max_latency_us,
            p99_us = %self.lat_p99_us,
            "metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.paths_resolved_total(), 0);
        assert_eq!(metrics.summaries_total(), 0);
    }

    #[test]
    fn test_record_path_hit_and_miss() {
        let metrics = Metrics::new();

        metrics.record_path_resolved(3, 10);
        metrics.record_path_resolved(0, 5);
        metrics.record_path_resolved(5, 20);

        assert_eq!(metrics.paths_resolved_total(), 2);
        assert_eq!(metrics.paths_missed_total(), 1);
        assert_eq!(metrics.path_depth_max.load(Ordering::Relaxed), 5);
        assert_eq!(metrics.path_depth_sum.load(Ordering::Relaxed), 8);
    }

    #[test]
    fn test_record_summary() {
        let metrics = Metrics::new();

        metrics.record_summary(10, 4, 50);
        metrics.record_summary(5, 1, 50);

        let summary = metrics.report();
        assert_eq!(summary.summaries_total, 2);
        assert_eq!(summary.visits_total, 15);
        assert_eq!(summary.sessions_total, 5);
    }

    #[test]
    fn test_report_resets_latency() {
        let metrics = Metrics::new();

        metrics.record_path_resolved(2, 100);
        metrics.record_path_resolved(2, 200);
        metrics.record_summary(1, 1, 300);

        let summary = metrics.report();
        assert_eq!(summary.ops, 3);
        assert!(summary.ops_per_sec > 0.0);
        assert_eq!(summary.latency_sum_us, 600);
        assert_eq!(summary.avg_latency_us, 200);
        assert_eq!(summary.max_latency_us, 300);
        assert_eq!(summary.path_depth_avg, 2);

        assert_eq!(metrics.ops_since_report.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.latency_sum_us.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.latency_max_us.load(Ordering::Relaxed), 0);

        // Monotonic counters survive the report
        let again = metrics.report();
        assert_eq!(again.paths_resolved_total, 2);
        assert_eq!(again.ops, 0);
    }

    #[test]
    fn test_report_empty() {
        let summary = Metrics::new().report();
        assert_eq!(summary.ops, 0);
        assert_eq!(summary.ops_per_sec, 0.0);
        assert_eq!(summary.avg_latency_us, 0);
        assert_eq!(summary.lat_p99_us, 0);
        assert_eq!(summary.path_depth_avg, 0);
    }

    #[test]
    fn test_report_keeps_exact_sums() {
        let metrics = Metrics::new();

        metrics.record_path_resolved(1, 3);
        metrics.record_path_resolved(2, 4);

        let summary = metrics.report();
        assert_eq!(summary.path_depth_sum, 3);
        assert_eq!(summary.path_depth_avg, 1);
        assert_eq!(summary.latency_sum_us, 7);
        assert_eq!(summary.avg_latency_us, 3);
    }

    #[test]
    fn test_bucket_index() {
        assert_eq!(bucket_index(0), 0);
        assert_eq!(bucket_index(100), 0);
        assert_eq!(bucket_index(101), 1);
        assert_eq!(bucket_index(51200), 9);
        assert_eq!(bucket_index(51201), 10);
    }

    #[test]
    fn test_depth_bucket_index() {
        assert_eq!(depth_bucket_index(1), 0);
        assert_eq!(depth_bucket_index(2), 1);
        assert_eq!(depth_bucket_index(5), 4);
        assert_eq!(depth_bucket_index(32), 9);
        assert_eq!(depth_bucket_index(33), 10);
    }

    #[test]
    fn test_percentile_computation() {
        let metrics = Metrics::new();
        for _ in 0..100 {
            metrics.record_summary(1, 1, 150);
        }

        let summary = metrics.report();
        assert_eq!(summary.lat_p50_us, 200);
        assert_eq!(summary.lat_p99_us, 200);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(Metrics::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let m = metrics.clone();
            handles.push(thread::spawn(move || {
                for i in 0..1000 {
                    m.record_path_resolved(1 + i % 4, i as u64);
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(metrics.paths_resolved_total(), 10_000);
    }
}
