//! The circuit-breaker-protected response cache (spec §4.6): predictions,
//! fares, route statistics, and popular-route summaries each get their own
//! TTL, but share one cache implementation and one breaker per cache
//! instance. Keys are whatever the caller's canonical key function (see
//! `fingerprint.rs`) produces — never a reflectively-derived key.

use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::circuit_breaker::CircuitBreaker;

pub const PREDICTION_TTL: Duration = Duration::from_secs(60 * 60);
pub const FARE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const ROUTE_STAT_TTL: Duration = Duration::from_secs(6 * 60 * 60);
pub const POPULAR_ROUTE_TTL: Duration = Duration::from_secs(30 * 60);

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A TTL cache guarded by a [`CircuitBreaker`]. When the breaker is OPEN,
/// `get`/`set` behave as a clean miss/no-op rather than an error, so callers
/// fall straight through to the database path without special-casing the
/// breaker state themselves.
pub struct TtlCache<K, V> {
    entries: DashMap<K, Entry<V>>,
    breaker: CircuitBreaker,
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        TtlCache { entries: DashMap::new(), breaker: CircuitBreaker::new() }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Returns `Some(value)` on a live hit, `None` on a miss, an expired
    /// entry, or a breaker-closed-for-business path.
    pub fn get(&self, key: &K) -> Option<V> {
        if !self.breaker.allow_request() {
            return None;
        }
        let hit = self.entries.get(key).and_then(|entry| if entry.expires_at > Instant::now() { Some(entry.value.clone()) } else { None });
        self.breaker.record_success();
        if hit.is_none() {
            // Expired entries are swept lazily; remove one we just saw stale.
            self.entries.remove(key);
        }
        hit
    }

    /// Writes are idempotent last-writer-wins, per spec §5.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        if !self.breaker.allow_request() {
            return;
        }
        self.entries.insert(key, Entry { value, expires_at: Instant::now() + ttl });
        self.breaker.record_success();
    }

    /// Records a genuine cache-backend failure (as opposed to a plain
    /// miss) — e.g. a corrupted entry the caller couldn't make sense of.
    pub fn record_backend_failure(&self) {
        self.breaker.record_failure();
    }

    /// Periodic sweep of expired entries, mirroring the rate limiter's
    /// 24h sweep cadence conceptually (spec §4.6) even though TTLs here are
    /// much shorter; keeps the map from growing unbounded between hits.
    pub fn sweep_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn a_fresh_entry_hits() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        cache.set("k".to_string(), 7, Duration::from_secs(60));
        assert_eq!(cache.get(&"k".to_string()), Some(7));
    }

    #[test]
    fn an_expired_entry_misses_and_is_swept() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        cache.set("k".to_string(), 7, Duration::from_millis(1));
        sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&"k".to_string()), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn an_open_breaker_behaves_as_a_miss_not_an_error() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        cache.set("k".to_string(), 7, Duration::from_secs(60));
        for _ in 0..5 {
            cache.record_backend_failure();
        }
        assert_eq!(cache.get(&"k".to_string()), None);
    }
}
