//! The circuit breaker fronting the prediction/fare cache (spec §4.6).
//! Three states — CLOSED (normal), OPEN (skip cache, fall straight to the
//! database path), HALF_OPEN (single probe) — tracked with a small piece of
//! atomic state rather than the sliding-window call log a general-purpose
//! resilience crate would carry, since the only input here is "did the last
//! cache operation succeed".

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{info, warn};

/// Consecutive backend errors before the breaker trips open (spec §4.6).
const FAILURE_THRESHOLD: u32 = 5;
/// How long OPEN holds before allowing a single HALF_OPEN probe (spec §4.6).
const OPEN_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

/// Tracks one circuit's worth of state. `opened_at` only matters while
/// `state == Open`, so it sits behind a `Mutex` rather than its own atomic
/// to avoid torn reads between the instant and the transition that set it.
pub struct CircuitBreaker {
    state: AtomicU8,
    consecutive_failures: AtomicU32,
    opened_at: Mutex<Option<Instant>>,
    trips: AtomicU64,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        CircuitBreaker { state: AtomicU8::new(CircuitState::Closed as u8), consecutive_failures: AtomicU32::new(0), opened_at: Mutex::new(None), trips: AtomicU64::new(0) }
    }
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::SeqCst))
    }

    /// Whether a cache operation may be attempted right now: always true
    /// when CLOSED, never when OPEN (unless the timeout has elapsed, which
    /// promotes to HALF_OPEN and allows exactly this one caller through),
    /// and true for the single HALF_OPEN probe.
    pub fn allow_request(&self) -> bool {
        match self.state() {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = self.opened_at.lock().unwrap().map(|at| at.elapsed()).unwrap_or(Duration::MAX);
                if elapsed >= OPEN_TIMEOUT {
                    // Promote to HALF_OPEN and let this caller through as the probe.
                    if self.state.compare_exchange(CircuitState::Open as u8, CircuitState::HalfOpen as u8, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
                        info!("circuit breaker: OPEN timeout elapsed, admitting HALF_OPEN probe");
                        true
                    } else {
                        false
                    }
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        if self.state() != CircuitState::Closed {
            info!("circuit breaker: probe succeeded, closing");
            self.state.store(CircuitState::Closed as u8, Ordering::SeqCst);
            *self.opened_at.lock().unwrap() = None;
        }
    }

    pub fn record_failure(&self) {
        match self.state() {
            CircuitState::HalfOpen => {
                warn!("circuit breaker: probe failed, reopening");
                self.trip();
            }
            CircuitState::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                if failures >= FAILURE_THRESHOLD {
                    warn!(failures, "circuit breaker: consecutive failure threshold reached, opening");
                    self.trip();
                }
            }
            CircuitState::Open => {}
        }
    }

    fn trip(&self) {
        self.state.store(CircuitState::Open as u8, Ordering::SeqCst);
        *self.opened_at.lock().unwrap() = Some(Instant::now());
        self.consecutive_failures.store(0, Ordering::SeqCst);
        self.trips.fetch_add(1, Ordering::SeqCst);
    }

    pub fn trip_count(&self) -> u64 {
        self.trips.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_closed_below_the_failure_threshold() {
        let cb = CircuitBreaker::new();
        for _ in 0..FAILURE_THRESHOLD - 1 {
            cb.record_failure();
        }
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.allow_request());
    }

    #[test]
    fn opens_after_five_consecutive_failures() {
        let cb = CircuitBreaker::new();
        for _ in 0..FAILURE_THRESHOLD {
            cb.record_failure();
        }
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow_request());
    }

    #[test]
    fn a_success_resets_the_failure_count() {
        let cb = CircuitBreaker::new();
        for _ in 0..FAILURE_THRESHOLD - 1 {
            cb.record_failure();
        }
        cb.record_success();
        for _ in 0..FAILURE_THRESHOLD - 1 {
            cb.record_failure();
        }
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_probe_failure_reopens_immediately() {
        let cb = CircuitBreaker::new();
        cb.state.store(CircuitState::HalfOpen as u8, Ordering::SeqCst);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn half_open_probe_success_closes() {
        let cb = CircuitBreaker::new();
        cb.state.store(CircuitState::HalfOpen as u8, Ordering::SeqCst);
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
