use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-stage counters. Clones share the same counters.
#[derive(Debug, Clone)]
pub struct StageMetrics {
    /// Values taken from the inbound link
    received: Arc<AtomicU64>,
    /// Values handed to the outbound link
    forwarded: Arc<AtomicU64>,
    /// Values rejected by a filter
    discarded: Arc<AtomicU64>,
    /// Timer-driven drains of the buffering stage
    flushes: Arc<AtomicU64>,
    /// Values lost to buffer window restarts
    overwritten: Arc<AtomicU64>,
    /// Creation time for throughput calculation
    start_time: Instant,
}

impl StageMetrics {
    /// Create a new metrics collector for a stage
    pub fn new() -> Self {
        Self {
            received: Arc::new(AtomicU64::new(0)),
            forwarded: Arc::new(AtomicU64::new(0)),
            discarded: Arc::new(AtomicU64::new(0)),
            flushes: Arc::new(AtomicU64::new(0)),
            overwritten: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Overwrite the lost-value count with the buffer's running total
    pub fn set_overwritten(&self, total: u64) {
        self.overwritten.store(total, Ordering::Relaxed);
    }

    pub fn total_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn total_forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    pub fn total_discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    pub fn total_flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    pub fn total_overwritten(&self) -> u64 {
        self.overwritten.load(Ordering::Relaxed)
    }

    /// Forwarded values per second since creation
    pub fn throughput_vps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            0.0
        } else {
            self.total_forwarded() as f64 / elapsed
        }
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_received: self.total_received(),
            total_forwarded: self.total_forwarded(),
            total_discarded: self.total_discarded(),
            total_flushes: self.total_flushes(),
            total_overwritten: self.total_overwritten(),
            throughput_vps: self.throughput_vps(),
            elapsed: self.start_time.elapsed(),
        }
    }
}

impl Default for StageMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub total_received: u64,
    pub total_forwarded: u64,
    pub total_discarded: u64,
    pub total_flushes: u64,
    pub total_overwritten: u64,
    pub throughput_vps: f64,
    pub elapsed: Duration,
}

impl MetricsSnapshot {
    /// Format metrics as a human-readable string
    pub fn format(&self) -> String {
        format!(
            "Received: {}, Forwarded: {}, Discarded: {}, Flushes: {}, Overwritten: {}, \
             Throughput: {:.2} values/s, Elapsed: {:.2}s",
            self.total_received,
            self.total_forwarded,
            self.total_discarded,
            self.total_flushes,
            self.total_overwritten,
            self.throughput_vps,
            self.elapsed.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_shared_between_clones() {
        let metrics = StageMetrics::new();
        let clone = metrics.clone();
        for _ in 0..10 {
            clone.record_received();
        }
        clone.record_forwarded();
        clone.record_discarded();
        assert_eq!(metrics.total_received(), 10);
        assert_eq!(metrics.total_forwarded(), 1);
        assert_eq!(metrics.total_discarded(), 1);
    }

    #[test]
    fn test_snapshot_format() {
        let metrics = StageMetrics::new();
        metrics.record_flush();
        metrics.set_overwritten(10);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_flushes, 1);
        assert_eq!(snapshot.total_overwritten, 10);
        assert!(snapshot.format().contains("Flushes: 1"));
        assert!(snapshot.format().contains("Overwritten: 10"));
    }
}
