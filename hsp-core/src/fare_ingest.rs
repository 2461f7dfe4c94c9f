//! Fare ingester: a degenerate specialization of C3 that parses the
//! upstream fares archive into [`FareOffer`] rows (spec §3, §4.3).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::client::{FaresArchiveDecoder, HspClient};
use crate::domain::FareOffer;
use crate::domain::fare::is_admissible_price;
use crate::error::NormalizeError;
use crate::store::Store;

/// Re-download threshold: a local copy older than this is considered stale
/// (spec §4.3).
const FRESHNESS_WINDOW: Duration = Duration::hours(24);

pub struct FareIngester {
    client: Arc<HspClient>,
    store: Store,
    decoder: Arc<dyn FaresArchiveDecoder>,
}

#[derive(Debug, Clone, Default)]
pub struct FareSyncReport {
    pub refreshed: bool,
    pub fares_written: u64,
    pub dropped_inadmissible: u64,
    pub dropped_data_source_conflict: u64,
}

impl FareIngester {
    pub fn new(client: Arc<HspClient>, store: Store, decoder: Arc<dyn FaresArchiveDecoder>) -> Self {
        FareIngester { client, store, decoder }
    }

    /// Re-downloads and re-ingests the fare archive if `last_downloaded` is
    /// absent or older than [`FRESHNESS_WINDOW`]; otherwise a no-op that
    /// reuses the cached rows already in `fare_cache` (spec §4.3).
    pub async fn sync(&self, last_downloaded: Option<DateTime<Utc>>) -> Result<FareSyncReport, NormalizeError> {
        if !is_stale(last_downloaded, Utc::now()) {
            info!("fare archive is fresh; reusing cached rows");
            return Ok(FareSyncReport::default());
        }

        let archive = match self.client.fetch_fares_archive(None).await? {
            Some(archive) => archive,
            None => {
                info!("upstream reported no change to the fares archive");
                return Ok(FareSyncReport { refreshed: true, ..Default::default() });
            }
        };

        let offers = self.decoder.decode(&archive)?;
        let outcome = filter_admissible(offers);

        for fare in &outcome.accepted {
            self.store.upsert_fare(fare).await?;
        }

        Ok(FareSyncReport {
            refreshed: true,
            fares_written: outcome.accepted.len() as u64,
            dropped_inadmissible: outcome.dropped_inadmissible,
            dropped_data_source_conflict: outcome.dropped_data_source_conflict,
        })
    }
}

/// Whether the fare archive needs re-downloading: absent local copy, or one
/// older than [`FRESHNESS_WINDOW`] (spec §4.3, §8 scenario 6).
fn is_stale(last_downloaded: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_downloaded {
        None => true,
        Some(when) => now - when >= FRESHNESS_WINDOW,
    }
}

struct FilterOutcome {
    accepted: Vec<FareOffer>,
    dropped_inadmissible: u64,
    dropped_data_source_conflict: u64,
}

/// Pure structural validation over one archive's worth of decoded offers:
/// drops fares outside the admissible price window, then drops every fare
/// in a `(route, ticket_type)` group whose `data_source` tags disagree
/// (spec §4.3).
fn filter_admissible(offers: Vec<FareOffer>) -> FilterOutcome {
    let mut dropped_inadmissible = 0u64;
    let priced: Vec<FareOffer> = offers
        .into_iter()
        .filter(|fare| {
            let admissible = is_admissible_price(fare.adult_pence);
            if !admissible {
                dropped_inadmissible += 1;
            }
            admissible
        })
        .collect();

    let mut sources_by_key: HashMap<(String, String, std::mem::Discriminant<crate::domain::TicketType>), HashSet<String>> = HashMap::new();
    for fare in &priced {
        let key = group_key(fare);
        sources_by_key.entry(key).or_default().insert(fare.data_source.clone());
    }

    let mut dropped_data_source_conflict = 0u64;
    let accepted = priced
        .into_iter()
        .filter(|fare| {
            let sources = &sources_by_key[&group_key(fare)];
            let consistent = sources.len() == 1;
            if !consistent {
                dropped_data_source_conflict += 1;
                warn!(
                    origin = %fare.origin.as_str(),
                    destination = %fare.destination.as_str(),
                    "dropping fare: data_source disagrees within (route, ticket_type) group"
                );
            }
            consistent
        })
        .collect();

    FilterOutcome { accepted, dropped_inadmissible, dropped_data_source_conflict }
}

fn group_key(fare: &FareOffer) -> (String, String, std::mem::Discriminant<crate::domain::TicketType>) {
    (fare.origin.as_str().to_string(), fare.destination.as_str().to_string(), std::mem::discriminant(&fare.ticket_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Crs, TicketClass, TicketType};
    use chrono::NaiveDate;

    fn fare(origin: &str, destination: &str, ticket_type: TicketType, adult_pence: u32, data_source: &str) -> FareOffer {
        FareOffer {
            origin: Crs::parse(origin).unwrap(),
            destination: Crs::parse(destination).unwrap(),
            ticket_type,
            ticket_class: TicketClass::Standard,
            adult_pence,
            child_pence: None,
            valid_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            valid_until: None,
            route_restriction: None,
            issuing_operator: None,
            data_source: data_source.to_string(),
            ingested_at: Utc::now(),
        }
    }

    #[test]
    fn absent_copy_is_always_stale() {
        assert!(is_stale(None, Utc::now()));
    }

    #[test]
    fn copy_23_hours_old_is_fresh() {
        let now = Utc::now();
        assert!(!is_stale(Some(now - Duration::hours(23)), now));
    }

    #[test]
    fn copy_25_hours_old_is_stale() {
        let now = Utc::now();
        assert!(is_stale(Some(now - Duration::hours(25)), now));
    }

    #[test]
    fn fares_outside_the_admissible_window_are_dropped() {
        let offers = vec![fare("EUS", "MAN", TicketType::Advance, 0, "feed-a"), fare("EUS", "MAN", TicketType::Advance, 100_001, "feed-a")];
        let outcome = filter_admissible(offers);
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.dropped_inadmissible, 2);
    }

    #[test]
    fn mixed_data_source_within_a_group_drops_the_whole_group() {
        let offers = vec![fare("EUS", "MAN", TicketType::Advance, 2500, "feed-a"), fare("EUS", "MAN", TicketType::Advance, 2600, "feed-b")];
        let outcome = filter_admissible(offers);
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.dropped_data_source_conflict, 2);
    }

    #[test]
    fn distinct_ticket_types_are_independent_groups() {
        let offers = vec![fare("EUS", "MAN", TicketType::Advance, 2500, "feed-a"), fare("EUS", "MAN", TicketType::Anytime, 5000, "feed-a")];
        let outcome = filter_admissible(offers);
        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(outcome.dropped_data_source_conflict, 0);
    }
}
