use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::station::Crs;

/// A stable RTTI Service Identifier. Opaque beyond "globally unique per
/// train instance" — unlike `Crs`, RIDs have no fixed-width format worth
/// validating here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rid(pub String);

impl Rid {
    pub fn new(raw: impl Into<String>) -> Self {
        Rid(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Rid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A scheduled train instance. Immutable once observed: every field here is
/// set once at ingest and never revised by a later ingest of the same RID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub rid: Rid,
    pub uid: String,
    pub headcode: String,
    pub operator_code: String,
    pub scheduled_departure_date: chrono::NaiveDate,
    pub passenger_service: bool,
}

/// Which side of a stop's delay computation `source ≥ scheduled` holds the
/// observation — distinguishes a real observed time from a forecast, and
/// flags whether the stop came from ingest or a later repair pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    /// Observed via HSP service-details, at ingest time.
    Observed,
    /// Recomputed by the dedicated repair pass (spec §3), from the same
    /// stored timestamps.
    Repaired,
}

/// A (RID, location) pair: one stop in a service's schedule, carrying the
/// scheduled/actual times and the derived delay.
///
/// Invariant: `delay_minutes` is `Some` iff both `scheduled_departure` (or
/// arrival, whichever this stop reports) and the corresponding actual time
/// are `Some`; the value is computed once at ingest and only ever revised
/// by [`Provenance::Repaired`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStop {
    pub rid: Rid,
    pub location: Crs,
    pub scheduled_arrival: Option<DateTime<Utc>>,
    pub scheduled_departure: Option<DateTime<Utc>>,
    pub actual_arrival: Option<DateTime<Utc>>,
    pub actual_departure: Option<DateTime<Utc>>,
    /// Arrival delay in minutes. Positive = late, negative = early, null =
    /// unobserved. Always in `[-180, 720]` when `Some` (spec §8).
    pub arrival_delay_minutes: Option<i32>,
    /// Departure delay in minutes, same convention as `arrival_delay_minutes`.
    pub departure_delay_minutes: Option<i32>,
    pub cancellation_reason: Option<String>,
    pub provenance: Provenance,
}

impl ServiceStop {
    /// The delay value the statistics aggregator (C4) groups on: arrival
    /// delay when present (a stop is normally grouped by its arrival at the
    /// destination), falling back to departure delay for origin stops that
    /// have no scheduled arrival.
    pub fn effective_delay_minutes(&self) -> Option<i32> {
        self.arrival_delay_minutes.or(self.departure_delay_minutes)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_reason.is_some()
    }
}

/// The admissible range for a delay in minutes, per spec §3/§8.
pub const DELAY_MIN_MINUTES: i32 = -180;
pub const DELAY_MAX_MINUTES: i32 = 720;

pub fn delay_in_range(minutes: i32) -> bool {
    (DELAY_MIN_MINUTES..=DELAY_MAX_MINUTES).contains(&minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_delay_prefers_arrival() {
        let stop = ServiceStop {
            rid: Rid::new("X"),
            location: Crs::parse("EUS").unwrap(),
            scheduled_arrival: None,
            scheduled_departure: None,
            actual_arrival: None,
            actual_departure: None,
            arrival_delay_minutes: Some(3),
            departure_delay_minutes: Some(5),
            cancellation_reason: None,
            provenance: Provenance::Observed,
        };
        assert_eq!(stop.effective_delay_minutes(), Some(3));
    }

    #[test]
    fn delay_range_bounds() {
        assert!(delay_in_range(-180));
        assert!(delay_in_range(720));
        assert!(!delay_in_range(-181));
        assert!(!delay_in_range(721));
    }
}
