//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations to avoid mutex contention.
//!
//! NOTE: All atomics use Relaxed ordering. These are statistical counters
//! only; never use them for coordination or logic decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Counters for the ingestion pipeline and its collaborators
pub struct Metrics {
    /// Samples successfully parsed off the inbound transport
    samples_received: AtomicU64,
    /// Malformed payloads or samples rejected by validation
    samples_rejected: AtomicU64,
    /// Samples dropped because a shard channel was full
    samples_dropped: AtomicU64,
    /// Samples durably appended to the store
    samples_persisted: AtomicU64,
    /// Append failures (sample aborted)
    storage_errors: AtomicU64,
    /// Zone entry transitions evaluated
    transitions_entered: AtomicU64,
    /// Zone exit transitions evaluated
    transitions_exited: AtomicU64,
    /// Alerts delivered to the broker
    alerts_published: AtomicU64,
    /// Individual publish attempts that failed and were retried
    publish_retries: AtomicU64,
    /// Alerts lost after exhausting the retry budget
    publish_failures: AtomicU64,
    /// Interval window for the events-per-second rate
    window_received: AtomicU64,
    started_at: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            samples_received: AtomicU64::new(0),
            samples_rejected: AtomicU64::new(0),
            samples_dropped: AtomicU64::new(0),
            samples_persisted: AtomicU64::new(0),
            storage_errors: AtomicU64::new(0),
            transitions_entered: AtomicU64::new(0),
            transitions_exited: AtomicU64::new(0),
            alerts_published: AtomicU64::new(0),
            publish_retries: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
            window_received: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn record_sample_received(&self) {
        self.samples_received.fetch_add(1, Ordering::Relaxed);
        self.window_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sample_rejected(&self) {
        self.samples_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sample_dropped(&self) {
        self.samples_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sample_persisted(&self) {
        self.samples_persisted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_storage_error(&self) {
        self.storage_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transition(&self, entered: bool) {
        if entered {
            self.transitions_entered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.transitions_exited.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_alert_published(&self) {
        self.alerts_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_retry(&self) {
        self.publish_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot totals and reset the rate window
    pub fn report(&self, interval_secs: u64) -> MetricsSummary {
        let window = self.window_received.swap(0, Ordering::Relaxed);
        let rate = if interval_secs > 0 {
            window as f64 / interval_secs as f64
        } else {
            0.0
        };

        MetricsSummary {
            uptime_secs: self.started_at.elapsed().as_secs(),
            samples_received: self.samples_received.load(Ordering::Relaxed),
            samples_rejected: self.samples_rejected.load(Ordering::Relaxed),
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
            samples_persisted: self.samples_persisted.load(Ordering::Relaxed),
            storage_errors: self.storage_errors.load(Ordering::Relaxed),
            transitions_entered: self.transitions_entered.load(Ordering::Relaxed),
            transitions_exited: self.transitions_exited.load(Ordering::Relaxed),
            alerts_published: self.alerts_published.load(Ordering::Relaxed),
            publish_retries: self.publish_retries.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            samples_per_sec: rate,
        }
    }

    #[cfg(test)]
    pub fn storage_error_count(&self) -> u64 {
        self.storage_errors.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub fn publish_failure_count(&self) -> u64 {
        self.publish_failures.load(Ordering::Relaxed)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time totals for the periodic report
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub uptime_secs: u64,
    pub samples_received: u64,
    pub samples_rejected: u64,
    pub samples_dropped: u64,
    pub samples_persisted: u64,
    pub storage_errors: u64,
    pub transitions_entered: u64,
    pub transitions_exited: u64,
    pub alerts_published: u64,
    pub publish_retries: u64,
    pub publish_failures: u64,
    pub samples_per_sec: f64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            uptime_secs = %self.uptime_secs,
            received = %self.samples_received,
            rejected = %self.samples_rejected,
            dropped = %self.samples_dropped,
            persisted = %self.samples_persisted,
            storage_errors = %self.storage_errors,
            entered = %self.transitions_entered,
            exited = %self.transitions_exited,
            published = %self.alerts_published,
            publish_retries = %self.publish_retries,
            publish_failures = %self.publish_failures,
            samples_per_sec = %format!("{:.1}", self.samples_per_sec),
            "metrics_report"
        );
    }
}
