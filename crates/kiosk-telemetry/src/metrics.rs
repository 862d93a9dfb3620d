//! Request metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;

/// How many recent latency samples are kept for percentile queries.
const LATENCY_BUFFER_SIZE: usize = 1000;

/// Collector for HTTP request metrics.
///
/// All counters are lock-free; the latency buffer takes a short write lock
/// per request.
#[derive(Default)]
pub struct RequestMetrics {
    total_requests: AtomicU64,
    client_errors: AtomicU64,
    server_errors: AtomicU64,
    total_latency_us: AtomicU64,
    recent_latencies_us: RwLock<Vec<u64>>,
}

impl RequestMetrics {
    /// Creates a new, empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            recent_latencies_us: RwLock::new(Vec::with_capacity(LATENCY_BUFFER_SIZE)),
            ..Self::default()
        }
    }

    /// Records a completed request with its response status and latency.
    pub fn record(&self, status: u16, latency: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        match status {
            400..=499 => {
                self.client_errors.fetch_add(1, Ordering::Relaxed);
            }
            500..=599 => {
                self.server_errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }

        let us = latency.as_micros() as u64;
        self.total_latency_us.fetch_add(us, Ordering::Relaxed);

        let mut recent = self.recent_latencies_us.write();
        if recent.len() >= LATENCY_BUFFER_SIZE {
            recent.remove(0);
        }
        recent.push(us);
    }

    /// Returns the total number of requests seen.
    #[must_use]
    pub fn requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Returns the average latency in milliseconds.
    #[must_use]
    pub fn average_latency_ms(&self) -> f64 {
        let count = self.total_requests.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let total = self.total_latency_us.load(Ordering::Relaxed);
        (total as f64 / count as f64) / 1000.0
    }

    /// Returns the given percentile latency in milliseconds.
    #[must_use]
    pub fn percentile_latency_ms(&self, percentile: u8) -> f64 {
        let recent = self.recent_latencies_us.read();
        if recent.is_empty() {
            return 0.0;
        }

        let mut sorted = recent.clone();
        sorted.sort_unstable();

        let idx = ((f64::from(percentile) / 100.0) * (sorted.len() - 1) as f64) as usize;
        sorted.get(idx).copied().unwrap_or(0) as f64 / 1000.0
    }

    /// Takes a point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.total_requests.load(Ordering::Relaxed),
            client_errors: self.client_errors.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
            average_latency_ms: self.average_latency_ms(),
            p99_latency_ms: self.percentile_latency_ms(99),
        }
    }
}

/// A point-in-time view of the request counters.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    /// Total requests seen.
    pub requests: u64,
    /// Requests answered with a 4xx status.
    pub client_errors: u64,
    /// Requests answered with a 5xx status.
    pub server_errors: u64,
    /// Average latency in milliseconds.
    pub average_latency_ms: f64,
    /// 99th percentile latency in milliseconds.
    pub p99_latency_ms: f64,
}
