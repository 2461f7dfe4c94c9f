//! Aggregate counters backing `GET /api/stats` (spec §4.6): total requests,
//! rate-limit hits, average processing time. Plain atomics — there is
//! nothing here that needs `dashmap`'s per-key concurrency.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct ServerStats {
    total_requests: AtomicU64,
    rate_limit_hits: AtomicU64,
    total_processing_millis: AtomicU64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, elapsed: std::time::Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_processing_millis.fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_rate_limit_hit(&self) {
        self.rate_limit_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_millis = self.total_processing_millis.load(Ordering::Relaxed);
        let average_processing_ms = if total_requests == 0 { 0.0 } else { total_millis as f64 / total_requests as f64 };
        StatsSnapshot { total_requests, rate_limit_hits: self.rate_limit_hits.load(Ordering::Relaxed), average_processing_ms }
    }
}

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub rate_limit_hits: u64,
    pub average_processing_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_is_zero_with_no_requests() {
        let stats = ServerStats::new();
        assert_eq!(stats.snapshot().average_processing_ms, 0.0);
    }

    #[test]
    fn average_divides_total_by_count() {
        let stats = ServerStats::new();
        stats.record_request(std::time::Duration::from_millis(10));
        stats.record_request(std::time::Duration::from_millis(30));
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.average_processing_ms, 20.0);
    }
}
