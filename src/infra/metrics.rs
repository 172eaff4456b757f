//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations to avoid mutex contention.
//! All counter updates are lock-free; reporting is the only operation
//! that needs synchronization (via atomic swap).
//!
//! NOTE: All atomics use Relaxed ordering; these are statistical
//! counters only. Do NOT use these atomics for coordination or logic decisions.

use crate::domain::review::MessageKind;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Prometheus-style exponential bucket boundaries (microseconds)
/// Buckets: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200
const BUCKET_BOUNDS: [u64; 10] = [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];
const NUM_BUCKETS: usize = 11;

pub const METRICS_BUCKET_BOUNDS: [u64; 10] = BUCKET_BOUNDS;
pub const METRICS_NUM_BUCKETS: usize = NUM_BUCKETS;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
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

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile) as u64;
    let mut cumulative = 0u64;

    // Upper bounds for each bucket (last bucket uses 2x the previous bound)
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
///
/// All recording operations are lock-free using atomics, except the
/// per-profile close counts which sit behind a short-lived lock.
pub struct Metrics {
    /// Detections handed to the engine (monotonic)
    detections_total: AtomicU64,
    /// Detections since last report (reset on report)
    detections_since_report: AtomicU64,
    /// Payloads dropped before ingestion (monotonic)
    detections_malformed: AtomicU64,
    /// Detection/profile matches (monotonic)
    detections_matched: AtomicU64,
    /// Detections replayed from the startup snapshot (monotonic)
    snapshot_detections: AtomicU64,
    /// Sum of handling latencies in microseconds (reset on report)
    latency_sum_us: AtomicU64,
    /// Max handling latency in microseconds (reset on report)
    latency_max_us: AtomicU64,
    /// Handling latency histogram buckets (reset on report)
    latency_buckets: [AtomicU64; NUM_BUCKETS],
    reviews_opened: AtomicU64,
    reviews_closed: AtomicU64,
    /// Currently open reviews (gauge)
    open_reviews: AtomicU64,
    ghost_detections_closed: AtomicU64,
    published_new: AtomicU64,
    published_update: AtomicU64,
    published_end: AtomicU64,
    publish_failures: AtomicU64,
    /// Current ingest queue depth (updated by the producer)
    event_queue_depth: AtomicU64,
    /// Reviews closed per profile name
    profile_closed: parking_lot::RwLock<FxHashMap<String, u64>>,
    /// Last report time (only accessed from reporter, not atomic)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            detections_total: AtomicU64::new(0),
            detections_since_report: AtomicU64::new(0),
            detections_malformed: AtomicU64::new(0),
            detections_matched: AtomicU64::new(0),
            snapshot_detections: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
            latency_max_us: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            reviews_opened: AtomicU64::new(0),
            reviews_closed: AtomicU64::new(0),
            open_reviews: AtomicU64::new(0),
            ghost_detections_closed: AtomicU64::new(0),
            published_new: AtomicU64::new(0),
            published_update: AtomicU64::new(0),
            published_end: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
            event_queue_depth: AtomicU64::new(0),
            profile_closed: parking_lot::RwLock::new(FxHashMap::default()),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record a detection was handled with given latency (lock-free)
    #[inline]
    pub fn record_detection_processed(&self, latency_us: u64) {
        self.detections_total.fetch_add(1, Ordering::Relaxed);
        self.detections_since_report.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);

        let bucket = bucket_index(latency_us);
        self.latency_buckets[bucket].fetch_add(1, Ordering::Relaxed);

        update_atomic_max(&self.latency_max_us, latency_us);
    }

    #[inline]
    pub fn record_detection_malformed(&self) {
        self.detections_malformed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_detection_matched(&self) {
        self.detections_matched.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_snapshot_detections(&self, count: u64) {
        self.snapshot_detections.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_review_opened(&self) {
        self.reviews_opened.fetch_add(1, Ordering::Relaxed);
        self.open_reviews.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a review closing under the given profile
    pub fn record_review_closed(&self, profile_name: &str) {
        self.reviews_closed.fetch_add(1, Ordering::Relaxed);
        // Saturating decrement
        let _ = self
            .open_reviews
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
        *self.profile_closed.write().entry(profile_name.to_string()).or_insert(0) += 1;
    }

    #[inline]
    pub fn record_ghost_closed(&self, count: u64) {
        self.ghost_detections_closed.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_published(&self, kind: MessageKind) {
        let counter = match kind {
            MessageKind::New => &self.published_new,
            MessageKind::Update => &self.published_update,
            MessageKind::End => &self.published_end,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_publish_failed(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Set current event queue depth (called by the producer)
    #[inline]
    pub fn set_event_queue_depth(&self, depth: u64) {
        self.event_queue_depth.store(depth, Ordering::Relaxed);
    }

    #[inline]
    pub fn detections_total(&self) -> u64 {
        self.detections_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn detections_malformed(&self) -> u64 {
        self.detections_malformed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn open_reviews(&self) -> u64 {
        self.open_reviews.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn publish_failures(&self) -> u64 {
        self.publish_failures.load(Ordering::Relaxed)
    }

    /// Closed-review counts per profile, sorted by profile name
    pub fn profile_closed(&self) -> Vec<(String, u64)> {
        let map = self.profile_closed.read();
        let mut counts: Vec<(String, u64)> = map.iter().map(|(k, v)| (k.clone(), *v)).collect();
        counts.sort_unstable();
        counts
    }

    /// Calculate and return metrics summary, then reset periodic counters
    ///
    /// This is the only method that resets counters. It uses atomic swap
    /// to get a consistent snapshot while allowing concurrent updates.
    pub fn report(&self) -> MetricsSummary {
        let detections_count = self.detections_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.latency_sum_us.swap(0, Ordering::Relaxed);
        let max_latency = self.latency_max_us.swap(0, Ordering::Relaxed);
        let lat_buckets = swap_buckets(&self.latency_buckets);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let detections_per_sec = if elapsed.as_secs_f64() > 0.0 {
            detections_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let avg_latency = if detections_count > 0 { latency_sum / detections_count } else { 0 };

        MetricsSummary {
            detections_total: self.detections_total.load(Ordering::Relaxed),
            detections_per_sec,
            detections_malformed: self.detections_malformed.load(Ordering::Relaxed),
            detections_matched: self.detections_matched.load(Ordering::Relaxed),
            snapshot_detections: self.snapshot_detections.load(Ordering::Relaxed),
            avg_latency_us: avg_latency,
            max_latency_us: max_latency,
            lat_buckets,
            lat_p50_us: percentile_from_buckets(&lat_buckets, 0.50),
            lat_p95_us: percentile_from_buckets(&lat_buckets, 0.95),
            lat_p99_us: percentile_from_buckets(&lat_buckets, 0.99),
            reviews_opened: self.reviews_opened.load(Ordering::Relaxed),
            reviews_closed: self.reviews_closed.load(Ordering::Relaxed),
            open_reviews: self.open_reviews.load(Ordering::Relaxed),
            ghost_detections_closed: self.ghost_detections_closed.load(Ordering::Relaxed),
            published_new: self.published_new.load(Ordering::Relaxed),
            published_update: self.published_update.load(Ordering::Relaxed),
            published_end: self.published_end.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            event_queue_depth: self.event_queue_depth.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the metrics
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub detections_total: u64,
    pub detections_per_sec: f64,
    pub detections_malformed: u64,
    pub detections_matched: u64,
    pub snapshot_detections: u64,
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
    /// Detection handling latency histogram buckets
    /// Bounds: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200 µs
    pub lat_buckets: [u64; NUM_BUCKETS],
    pub lat_p50_us: u64,
    pub lat_p95_us: u64,
    pub lat_p99_us: u64,
    pub reviews_opened: u64,
    pub reviews_closed: u64,
    pub open_reviews: u64,
    pub ghost_detections_closed: u64,
    pub published_new: u64,
    pub published_update: u64,
    pub published_end: u64,
    pub publish_failures: u64,
    pub event_queue_depth: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            detections_total = %self.detections_total,
            detections_per_sec = format!("{:.1}", self.detections_per_sec),
            malformed = %self.detections_malformed,
            avg_latency_us = %self.avg_latency_us,
            p99_us = %self.lat_p99_us,
            open_reviews = %self.open_reviews,
            reviews_closed = %self.reviews_closed,
            ghosts = %self.ghost_detections_closed,
            publish_failures = %self.publish_failures,
            queue_depth = %self.event_queue_depth,
            "metrics"
        );
    }
}
