use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which rung of the fallback ladder (spec §4.5) a prediction was served
/// from. Modeled as a tagged variant rather than a trait hierarchy so the
/// level is attachable to the response and assertable in tests (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum PredictionLevel {
    ExactRouteOperator = 1,
    RouteSummary = 2,
    OperatorNetwork = 3,
    NetworkWide = 4,
    IndustryFloor = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
    VeryLow,
}

/// A deterministic fingerprint over (origin, destination, departure_date,
/// departure_time), used both as the prediction cache key and as the
/// `PredictionCacheEntry` primary key. Built from an explicit ordered tuple
/// of inputs rather than reflective keyword-argument hashing — see §9's
/// design note on the source's cache-key bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredictionFingerprint(pub [u8; 16]);

impl std::fmt::Display for PredictionFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A cached prediction response, owned by the serving layer (C6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionCacheEntry {
    pub fingerprint: PredictionFingerprint,
    pub predicted_delay_minutes: f64,
    pub on_time_probability: f64,
    pub ppm5_probability: f64,
    pub ppm15_probability: f64,
    pub severe_delay_probability: f64,
    pub confidence: Confidence,
    pub sample_size: u64,
    pub level: PredictionLevel,
    pub model_version: &'static str,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub hit_count: u64,
}

/// The result of a single `predict` call (spec §4.5), before the serving
/// layer overlays fares and recommendations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub expected_delay_minutes: f64,
    pub on_time_probability: f64,
    pub ppm5_probability: f64,
    pub ppm15_probability: f64,
    pub severe_delay_probability: f64,
    pub confidence: Confidence,
    pub sample_size: u64,
    pub level: PredictionLevel,
    pub is_degraded: bool,
    pub degradation_reason: Option<&'static str>,
    pub explanation: String,
}

pub const MODEL_VERSION: &str = "hsp-predictor-1";
