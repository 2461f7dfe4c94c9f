//! Configuration types. A phase document (serde, loaded from disk by the
//! binary) plus the small set of environment inputs listed in spec §6,
//! gathered here rather than scattered `env::var` calls at each call site.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::scheduler::DayType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteWindow {
    pub origin: String,
    pub destination: String,
    pub from_time: String,
    pub to_time: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IntervalWindow {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl IntervalWindow {
    /// Draws a uniform random delay within `[min, max]`, per spec §4.1.
    pub fn sample(&self) -> std::time::Duration {
        let frac: f64 = rand::random();
        let secs = self.min_secs + frac * (self.max_secs - self.min_secs);
        std::time::Duration::from_secs_f64(secs.max(0.0))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_secs: f64,
    pub max_delay_secs: f64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            initial_delay_secs: 1.0,
            max_delay_secs: 30.0,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// `delay(n) = min(max_delay, initial_delay * backoff^n * U(0.5, 1.5))`,
    /// per spec §4.1.
    pub fn backoff_delay(&self, attempt: u32) -> std::time::Duration {
        let jitter = 0.5 + rand::random::<f64>();
        let raw = self.initial_delay_secs * self.backoff_multiplier.powi(attempt as i32) * jitter;
        std::time::Duration::from_secs_f64(raw.min(self.max_delay_secs))
    }
}

/// A per-phase document, as described in spec §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseConfig {
    pub phase_name: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub day_types: Vec<DayType>,
    pub routes: Vec<RouteWindow>,
    pub request_interval: IntervalWindow,
    pub retry: RetryConfig,
}

/// Environment inputs read once at startup (spec §6): upstream
/// credentials, database URL, cache endpoint, log level, optional port.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub hsp_username: String,
    pub hsp_password: String,
    pub database_url: String,
    pub cache_endpoint: Option<String>,
    pub log_level: String,
    pub port: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum EnvConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("{0} was not a valid port number")]
    InvalidPort(String),
}

impl EnvConfig {
    pub fn from_env() -> Result<Self, EnvConfigError> {
        let var = |name: &'static str| std::env::var(name).map_err(|_| EnvConfigError::Missing(name));
        let port_raw = std::env::var("HSP_PORT").unwrap_or_else(|_| "8080".to_string());
        let port = port_raw.parse().map_err(|_| EnvConfigError::InvalidPort(port_raw.clone()))?;
        Ok(EnvConfig {
            hsp_username: var("HSP_USERNAME")?,
            hsp_password: var("HSP_PASSWORD")?,
            database_url: var("DATABASE_URL")?,
            cache_endpoint: std::env::var("CACHE_ENDPOINT").ok(),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_sample_stays_in_bounds() {
        let window = IntervalWindow { min_secs: 2.0, max_secs: 3.0 };
        for _ in 0..100 {
            let sample = window.sample().as_secs_f64();
            assert!((2.0..=3.0).contains(&sample));
        }
    }

    #[test]
    fn backoff_respects_ceiling() {
        let cfg = RetryConfig::default();
        for attempt in 0..10 {
            assert!(cfg.backoff_delay(attempt).as_secs_f64() <= cfg.max_delay_secs);
        }
    }
}
