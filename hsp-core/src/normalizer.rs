//! Record normalizer & store (C3): turns one task's worth of
//! `fetch_service_details` responses into `Service`/`ServiceStop` rows,
//! dropping structurally invalid records and counting why (spec §4.3).

use chrono::Utc;

use crate::client::{ServiceDetailStop, ServiceDetailsResponse};
use crate::domain::{Crs, DataQualityMetrics, Provenance, Rid, Service, ServiceStop};
use crate::domain::service::delay_in_range;
use crate::error::{NormalizeError, StoreError};
use crate::store::Store;
use crate::time;

/// Wraps a [`Store`] with the structural-validation pass spec §4.3
/// requires at ingest.
pub struct Normalizer {
    store: Store,
}

/// The outcome of one `ingest_batch` call: records written plus the
/// [`DataQualityMetrics`] row persisted alongside them.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub records_written: u64,
    pub quality: DataQualityMetrics,
}

/// The report produced by [`repair_delays`]: how many stops were revised.
#[derive(Debug, Clone, Default)]
pub struct RepairReport {
    pub stops_examined: usize,
    pub stops_revised: usize,
}

impl Normalizer {
    pub fn new(store: Store) -> Self {
        Normalizer { store }
    }

    /// Ingests every detail response fetched for one scheduler task,
    /// writing exactly one [`DataQualityMetrics`] row for the batch
    /// (spec §3's [SUPPLEMENT] row shape).
    pub async fn ingest_batch(&self, phase_name: &str, details: &[ServiceDetailsResponse]) -> Result<IngestReport, NormalizeError> {
        let mut quality = DataQualityMetrics { phase_name: phase_name.to_string(), ingested_at: Utc::now(), ..Default::default() };
        let mut written = 0u64;

        for detail in details {
            let outcome = build_outcome(detail);
            quality.dropped_missing_rid += outcome.dropped_missing_rid;
            quality.dropped_malformed_crs += outcome.dropped_malformed_crs;
            quality.dropped_schedule_actual_mismatch += outcome.dropped_schedule_actual_mismatch;
            quality.dropped_delay_out_of_range += outcome.dropped_delay_out_of_range;

            if let Some(service) = outcome.service {
                self.store.upsert_service(&service).await?;
                for stop in &outcome.stops {
                    self.store.upsert_stop(stop).await?;
                    written += 1;
                }
            }
        }

        quality.records_written = written;
        self.store.record_data_quality(&quality).await?;
        Ok(IngestReport { records_written: written, quality })
    }

    /// Re-derives `delay_minutes` for every stop of `rid` from its stored
    /// scheduled/actual timestamps. The only code path permitted to mutate
    /// a `ServiceStop` after creation (spec §3, §4.3 [SUPPLEMENT]).
    pub async fn repair_delays(&self, rid: &Rid) -> Result<RepairReport, StoreError> {
        let stops = self.store.stops_for_rid(rid).await?;
        let mut report = RepairReport::default();
        for stop in stops {
            report.stops_examined += 1;
            let arrival = recompute_delay(stop.scheduled_arrival, stop.actual_arrival);
            let departure = recompute_delay(stop.scheduled_departure, stop.actual_departure);
            if arrival != stop.arrival_delay_minutes || departure != stop.departure_delay_minutes {
                self.store.update_stop_delays(rid, &stop.location, arrival, departure).await?;
                report.stops_revised += 1;
            }
        }
        Ok(report)
    }
}

fn recompute_delay(scheduled: Option<chrono::DateTime<Utc>>, actual: Option<chrono::DateTime<Utc>>) -> Option<i32> {
    match (scheduled, actual) {
        (Some(s), Some(a)) => {
            let minutes = time::delay_minutes(s, a);
            delay_in_range(minutes).then_some(minutes)
        }
        _ => None,
    }
}

#[derive(Debug, Default)]
struct IngestOutcome {
    service: Option<Service>,
    stops: Vec<ServiceStop>,
    dropped_missing_rid: u64,
    dropped_malformed_crs: u64,
    dropped_schedule_actual_mismatch: u64,
    dropped_delay_out_of_range: u64,
}

/// Pure structural validation over one `fetch_service_details` response.
/// No I/O: the caller upserts whatever this returns.
fn build_outcome(details: &ServiceDetailsResponse) -> IngestOutcome {
    let mut outcome = IngestOutcome::default();

    if details.rid.trim().is_empty() {
        outcome.dropped_missing_rid += 1;
        return outcome;
    }
    let rid = Rid::new(details.rid.clone());

    outcome.service = Some(Service {
        rid: rid.clone(),
        uid: details.uid.clone(),
        headcode: details.headcode.clone(),
        operator_code: details.operator_code.clone(),
        scheduled_departure_date: details.scheduled_departure_date,
        passenger_service: details.passenger_service,
    });

    for raw_stop in &details.stops {
        match build_stop(&rid, details.scheduled_departure_date, raw_stop) {
            Ok(stop) => outcome.stops.push(stop),
            Err(DropReason::MalformedCrs) => outcome.dropped_malformed_crs += 1,
            Err(DropReason::ScheduleActualMismatch) => outcome.dropped_schedule_actual_mismatch += 1,
            Err(DropReason::DelayOutOfRange) => outcome.dropped_delay_out_of_range += 1,
        }
    }

    outcome
}

enum DropReason {
    MalformedCrs,
    ScheduleActualMismatch,
    DelayOutOfRange,
}

fn build_stop(rid: &Rid, date: chrono::NaiveDate, raw: &ServiceDetailStop) -> Result<ServiceStop, DropReason> {
    let location = Crs::parse(&raw.location_crs).map_err(|_| DropReason::MalformedCrs)?;

    let scheduled_arrival = parse_time(date, raw.scheduled_arrival.as_deref())?;
    let scheduled_departure = parse_time(date, raw.scheduled_departure.as_deref())?;
    let actual_arrival = parse_time(date, raw.actual_arrival.as_deref())?;
    let actual_departure = parse_time(date, raw.actual_departure.as_deref())?;

    let arrival_delay_minutes = delay_for(scheduled_arrival, actual_arrival)?;
    let departure_delay_minutes = delay_for(scheduled_departure, actual_departure)?;

    Ok(ServiceStop {
        rid: rid.clone(),
        location,
        scheduled_arrival,
        scheduled_departure,
        actual_arrival,
        actual_departure,
        arrival_delay_minutes,
        departure_delay_minutes,
        cancellation_reason: raw.cancellation_reason.clone(),
        provenance: Provenance::Observed,
    })
}

fn parse_time(date: chrono::NaiveDate, hhmm: Option<&str>) -> Result<Option<chrono::DateTime<Utc>>, DropReason> {
    match hhmm {
        None => Ok(None),
        Some(raw) => time::hhmm_to_utc(date, raw).map(Some).map_err(|_| DropReason::ScheduleActualMismatch),
    }
}

fn delay_for(scheduled: Option<chrono::DateTime<Utc>>, actual: Option<chrono::DateTime<Utc>>) -> Result<Option<i32>, DropReason> {
    match (scheduled, actual) {
        (Some(s), Some(a)) => {
            let minutes = time::delay_minutes(s, a);
            if delay_in_range(minutes) {
                Ok(Some(minutes))
            } else {
                Err(DropReason::DelayOutOfRange)
            }
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_details(rid: &str) -> ServiceDetailsResponse {
        ServiceDetailsResponse {
            rid: rid.to_string(),
            uid: "C12345".to_string(),
            headcode: "1A23".to_string(),
            operator_code: "GW".to_string(),
            scheduled_departure_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            passenger_service: true,
            stops: vec![ServiceDetailStop {
                location_crs: "EUS".to_string(),
                scheduled_arrival: Some("0930".to_string()),
                scheduled_departure: None,
                actual_arrival: Some("0933".to_string()),
                actual_departure: None,
                cancellation_reason: None,
            }],
        }
    }

    #[test]
    fn missing_rid_is_dropped_wholesale() {
        let outcome = build_outcome(&sample_details(""));
        assert_eq!(outcome.dropped_missing_rid, 1);
        assert!(outcome.service.is_none());
    }

    #[test]
    fn well_formed_stop_computes_delay() {
        let outcome = build_outcome(&sample_details("X12345"));
        assert!(outcome.service.is_some());
        assert_eq!(outcome.stops.len(), 1);
        assert_eq!(outcome.stops[0].arrival_delay_minutes, Some(3));
        assert_eq!(outcome.dropped_malformed_crs, 0);
    }

    #[test]
    fn malformed_crs_drops_only_that_stop() {
        let mut details = sample_details("X12345");
        details.stops[0].location_crs = "EUSTON".to_string();
        let outcome = build_outcome(&details);
        assert!(outcome.service.is_some());
        assert!(outcome.stops.is_empty());
        assert_eq!(outcome.dropped_malformed_crs, 1);
    }

    #[test]
    fn out_of_range_delay_is_dropped() {
        let mut details = sample_details("X12345");
        details.stops[0].scheduled_arrival = Some("0930".to_string());
        // 13.5 hours late: past the +720 minute ceiling, not a rollover case.
        details.stops[0].actual_arrival = Some("2300".to_string());
        let outcome = build_outcome(&details);
        assert_eq!(outcome.dropped_delay_out_of_range, 1);
        assert!(outcome.stops.is_empty());
    }
}
