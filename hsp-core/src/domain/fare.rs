use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::station::Crs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketType {
    Advance,
    OffPeak,
    Anytime,
    SuperOffPeak,
    Season,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketClass {
    Standard,
    First,
}

/// The admissible price window, per spec §3: `1 <= adult_pence <= 100_000`.
pub const MIN_ADMISSIBLE_PENCE: u32 = 1;
pub const MAX_ADMISSIBLE_PENCE: u32 = 100_000;

pub fn is_admissible_price(adult_pence: u32) -> bool {
    (MIN_ADMISSIBLE_PENCE..=MAX_ADMISSIBLE_PENCE).contains(&adult_pence)
}

/// A single fare offer, keyed by (origin, destination, ticket_type,
/// ticket_class). Dropped at ingest if `adult_pence` falls outside the
/// admissible window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FareOffer {
    pub origin: Crs,
    pub destination: Crs,
    pub ticket_type: TicketType,
    pub ticket_class: TicketClass,
    pub adult_pence: u32,
    pub child_pence: Option<u32>,
    pub valid_from: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub route_restriction: Option<String>,
    pub issuing_operator: Option<String>,
    /// Tag identifying which feed/decoder run produced this row. A (route,
    /// ticket_type) key must never mix data_source values — see §4.3.
    pub data_source: String,
    pub ingested_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admissibility_window() {
        assert!(!is_admissible_price(0));
        assert!(is_admissible_price(1));
        assert!(is_admissible_price(100_000));
        assert!(!is_admissible_price(100_001));
    }
}
