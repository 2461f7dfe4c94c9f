//! Per-client rate limiting (spec §4.6): two rolling windows — 100
//! requests/minute and 1000 requests/day — keyed by the sha256 client
//! fingerprint from `fingerprint.rs`. In-memory, swept periodically so
//! clients that stop sending traffic don't pin memory forever.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

const MINUTE_LIMIT: u32 = 100;
const MINUTE_WINDOW: Duration = Duration::from_secs(60);
const DAY_LIMIT: u32 = 1000;
const DAY_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);
/// Entries idle longer than this are swept (spec §4.6).
const SWEEP_IDLE_AFTER: Duration = DAY_WINDOW;

struct ClientWindow {
    minute_count: AtomicU32,
    minute_started_at: std::sync::Mutex<Instant>,
    day_count: AtomicU32,
    day_started_at: std::sync::Mutex<Instant>,
    last_seen: std::sync::Mutex<Instant>,
}

impl ClientWindow {
    fn new(now: Instant) -> Self {
        ClientWindow {
            minute_count: AtomicU32::new(0),
            minute_started_at: std::sync::Mutex::new(now),
            day_count: AtomicU32::new(0),
            day_started_at: std::sync::Mutex::new(now),
            last_seen: std::sync::Mutex::new(now),
        }
    }
}

/// Outcome of a rejected request: how long the caller should wait before
/// retrying, in whole seconds.
#[derive(Debug, Clone, Copy)]
pub struct RateLimited {
    pub retry_after_secs: u64,
}

pub struct RateLimiter {
    clients: DashMap<String, ClientWindow>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        RateLimiter { clients: DashMap::new() }
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks and records one request against `fingerprint`'s two rolling
    /// windows. Linearizable per client: the whole check-and-increment runs
    /// against one `DashMap` shard's lock.
    pub fn is_allowed(&self, fingerprint: &str) -> Result<(), RateLimited> {
        let now = Instant::now();
        let entry = self.clients.entry(fingerprint.to_string()).or_insert_with(|| ClientWindow::new(now));
        *entry.last_seen.lock().unwrap() = now;

        {
            let mut started = entry.minute_started_at.lock().unwrap();
            if now.duration_since(*started) >= MINUTE_WINDOW {
                *started = now;
                entry.minute_count.store(0, Ordering::SeqCst);
            }
        }
        {
            let mut started = entry.day_started_at.lock().unwrap();
            if now.duration_since(*started) >= DAY_WINDOW {
                *started = now;
                entry.day_count.store(0, Ordering::SeqCst);
            }
        }

        let day_count = entry.day_count.fetch_add(1, Ordering::SeqCst) + 1;
        if day_count > DAY_LIMIT {
            let started = *entry.day_started_at.lock().unwrap();
            let retry_after = DAY_WINDOW.saturating_sub(now.duration_since(started));
            return Err(RateLimited { retry_after_secs: clamp_retry_after(retry_after, DAY_WINDOW) });
        }

        let minute_count = entry.minute_count.fetch_add(1, Ordering::SeqCst) + 1;
        if minute_count > MINUTE_LIMIT {
            let started = *entry.minute_started_at.lock().unwrap();
            let retry_after = MINUTE_WINDOW.saturating_sub(now.duration_since(started));
            return Err(RateLimited { retry_after_secs: clamp_retry_after(retry_after, MINUTE_WINDOW) });
        }

        Ok(())
    }

    /// Drops clients not seen in the last 24 hours (spec §4.6).
    pub fn sweep(&self) {
        let now = Instant::now();
        self.clients.retain(|_, window| now.duration_since(*window.last_seen.lock().unwrap()) < SWEEP_IDLE_AFTER);
    }

    /// `POST /api/reset-rate-limit`: admin-only, clears the whole table.
    pub fn reset_all(&self) {
        self.clients.clear();
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

/// Rounds `retry_after` up to a whole second (so callers never undercount a
/// sub-second remainder) then clamps to `window`'s own length, so a breach
/// right at the start of a fresh window can never advertise more than the
/// window it is gating — e.g. never more than 60s for the minute window
/// (spec §8 scenario 5).
fn clamp_retry_after(retry_after: Duration, window: Duration) -> u64 {
    let rounded_up = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    rounded_up.min(window.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_minute_limit() {
        let limiter = RateLimiter::new();
        for _ in 0..MINUTE_LIMIT {
            assert!(limiter.is_allowed("client-a").is_ok());
        }
        assert!(limiter.is_allowed("client-a").is_err());
    }

    #[test]
    fn distinct_clients_have_independent_windows() {
        let limiter = RateLimiter::new();
        for _ in 0..MINUTE_LIMIT {
            limiter.is_allowed("client-a").unwrap();
        }
        assert!(limiter.is_allowed("client-b").is_ok());
    }

    #[test]
    fn reset_all_clears_tracked_clients() {
        let limiter = RateLimiter::new();
        limiter.is_allowed("client-a").unwrap();
        assert_eq!(limiter.tracked_clients(), 1);
        limiter.reset_all();
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn breach_reports_a_positive_retry_after() {
        let limiter = RateLimiter::new();
        for _ in 0..MINUTE_LIMIT {
            limiter.is_allowed("client-a").unwrap();
        }
        let err = limiter.is_allowed("client-a").unwrap_err();
        assert!(err.retry_after_secs > 0);
    }

    #[test]
    fn breach_at_the_start_of_a_fresh_window_never_exceeds_the_window_length() {
        let limiter = RateLimiter::new();
        for _ in 0..MINUTE_LIMIT {
            limiter.is_allowed("client-a").unwrap();
        }
        let err = limiter.is_allowed("client-a").unwrap_err();
        assert!(err.retry_after_secs <= MINUTE_WINDOW.as_secs());
    }

    #[test]
    fn clamp_never_exceeds_the_window_even_on_a_whole_window_remainder() {
        assert_eq!(clamp_retry_after(MINUTE_WINDOW, MINUTE_WINDOW), MINUTE_WINDOW.as_secs());
    }
}
