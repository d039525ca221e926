//! Moderation call statistics — a supplemented ambient-metrics feature,
//! not in the distilled spec but a natural fit alongside the health
//! probe (mirrors the teacher's `FailoverController`-style counters
//! pattern, generalized to a primary/fallback pair).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, Default)]
pub struct ModerationStatsSnapshot {
    pub total_requests: u64,
    pub flagged_count: u64,
    pub primary_calls: u64,
    pub primary_failures: u64,
    pub fallback_calls: u64,
    pub fallback_failures: u64,
    pub both_failed: u64,
    pub avg_latency_ms: f64,
}

#[derive(Default)]
pub struct ModerationStats {
    total_requests: AtomicU64,
    flagged_count: AtomicU64,
    primary_calls: AtomicU64,
    primary_failures: AtomicU64,
    fallback_calls: AtomicU64,
    fallback_failures: AtomicU64,
    both_failed: AtomicU64,
    latency_avg_ms: Mutex<f64>,
    latency_samples: AtomicU64,
}

impl ModerationStats {
    /// One `moderate()` call, regardless of which provider served it.
    pub fn record_request(&self, flagged: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if flagged {
            self.flagged_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_primary(&self, failed: bool) {
        self.primary_calls.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.primary_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_fallback(&self, failed: bool) {
        self.fallback_calls.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.fallback_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_both_failed(&self) {
        self.both_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Moving average over all samples seen so far.
    pub fn record_latency(&self, elapsed: Duration) {
        let n = self.latency_samples.fetch_add(1, Ordering::Relaxed) + 1;
        let mut avg = self.latency_avg_ms.lock();
        let sample_ms = elapsed.as_secs_f64() * 1000.0;
        *avg += (sample_ms - *avg) / n as f64;
    }

    pub fn snapshot(&self) -> ModerationStatsSnapshot {
        ModerationStatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            flagged_count: self.flagged_count.load(Ordering::Relaxed),
            primary_calls: self.primary_calls.load(Ordering::Relaxed),
            primary_failures: self.primary_failures.load(Ordering::Relaxed),
            fallback_calls: self.fallback_calls.load(Ordering::Relaxed),
            fallback_failures: self.fallback_failures.load(Ordering::Relaxed),
            both_failed: self.both_failed.load(Ordering::Relaxed),
            avg_latency_ms: *self.latency_avg_ms.lock(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_average_converges_to_mean() {
        let stats = ModerationStats::default();
        stats.record_latency(Duration::from_millis(100));
        stats.record_latency(Duration::from_millis(200));
        let snapshot = stats.snapshot();
        assert!((snapshot.avg_latency_ms - 150.0).abs() < 1e-6);
    }
}
