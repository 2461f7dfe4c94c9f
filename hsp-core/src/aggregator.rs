//! Statistics aggregator (C4): recomputes `RouteStat`/`OperatorStat`/
//! `TimeSlotStat` from stored `service_details` rows (spec §4.4). Routes
//! and operators are processed independently; a failure on one never
//! blocks the others.

use std::collections::BTreeMap;

use chrono::{Datelike, Timelike, Utc};
use tracing::{error, info};

use crate::domain::{Crs, DelayHistogram, DelaySummary, Grade, OperatorStat, PunctualityPercentages, RouteStat, TimeSlotStat, stats::reliability_score};
use crate::error::StoreError;
use crate::store::{AggregationRow, Store};

/// Tallies of what `recompute` did, for CLI/log reporting.
#[derive(Debug, Clone, Default)]
pub struct AggregateReport {
    pub routes_recomputed: usize,
    pub routes_failed: usize,
    pub operators_recomputed: usize,
    pub operators_failed: usize,
}

/// Runs one full aggregation pass: route statistics, operator statistics,
/// and the per-route time-slot breakdown, per spec §4.4.
pub async fn recompute(store: &Store) -> Result<AggregateReport, StoreError> {
    let today = Utc::now().date_naive();
    let mut report = AggregateReport::default();

    for (origin, destination) in store.distinct_routes().await? {
        match recompute_route(store, &origin, &destination, today).await {
            Ok(()) => report.routes_recomputed += 1,
            Err(e) => {
                error!(%origin, %destination, error = %e, "route aggregation failed, prior statistics remain canonical");
                report.routes_failed += 1;
            }
        }
    }

    for operator_code in store.distinct_operators().await? {
        match recompute_operator(store, &operator_code, today).await {
            Ok(()) => report.operators_recomputed += 1,
            Err(e) => {
                error!(operator_code, error = %e, "operator aggregation failed, prior statistics remain canonical");
                report.operators_failed += 1;
            }
        }
    }

    info!(
        routes_recomputed = report.routes_recomputed,
        routes_failed = report.routes_failed,
        operators_recomputed = report.operators_recomputed,
        operators_failed = report.operators_failed,
        "aggregation pass complete"
    );
    Ok(report)
}

async fn recompute_route(store: &Store, origin: &Crs, destination: &Crs, today: chrono::NaiveDate) -> Result<(), StoreError> {
    let rows = store.stops_for_route(origin, destination).await?;
    let summary = summarize(&rows);

    let stat = RouteStat {
        origin: *origin,
        destination: *destination,
        calculation_date: today,
        total_services: summary.total,
        punctuality: summary.punctuality,
        delay: summary.delay,
        histogram: summary.histogram,
        cancelled_count: summary.cancelled_count,
        cancelled_percentage: summary.cancelled_percentage,
        reliability_score: summary.reliability_score,
        grade: summary.grade,
        hourly_breakdown: hourly_breakdown(&rows),
        weekday_breakdown: weekday_breakdown(&rows),
    };
    store.upsert_route_stat(&stat).await?;

    for (hour, hour_rows) in group_by_hour(&rows) {
        let hour_summary = summarize(&hour_rows);
        let time_slot = TimeSlotStat {
            origin: *origin,
            destination: *destination,
            hour_of_day: hour,
            day_of_week: None,
            calculation_date: today,
            total_services: hour_summary.total,
            punctuality: hour_summary.punctuality,
            delay: hour_summary.delay,
        };
        store.upsert_time_slot_stat(&time_slot).await?;
    }
    for (weekday, weekday_rows) in group_by_weekday(&rows) {
        let weekday_summary = summarize(&weekday_rows);
        let time_slot = TimeSlotStat {
            origin: *origin,
            destination: *destination,
            hour_of_day: 0,
            day_of_week: Some(weekday),
            calculation_date: today,
            total_services: weekday_summary.total,
            punctuality: weekday_summary.punctuality,
            delay: weekday_summary.delay,
        };
        store.upsert_time_slot_stat(&time_slot).await?;
    }

    Ok(())
}

async fn recompute_operator(store: &Store, operator_code: &str, today: chrono::NaiveDate) -> Result<(), StoreError> {
    let rows = store.stops_for_operator(operator_code).await?;
    let summary = summarize(&rows);
    let stat = OperatorStat {
        operator_code: operator_code.to_string(),
        calculation_date: today,
        total_services: summary.total,
        punctuality: summary.punctuality,
        delay: summary.delay,
        histogram: summary.histogram,
        cancelled_count: summary.cancelled_count,
        cancelled_percentage: summary.cancelled_percentage,
        reliability_score: summary.reliability_score,
        grade: summary.grade,
    };
    store.upsert_operator_stat(&stat).await
}

/// The shared aggregation result for one group of rows, whatever the
/// grouping key (route, operator, hour, weekday).
struct GroupSummary {
    total: u64,
    punctuality: PunctualityPercentages,
    delay: DelaySummary,
    histogram: DelayHistogram,
    cancelled_count: u64,
    cancelled_percentage: f64,
    reliability_score: f64,
    grade: Grade,
}

/// Spec §4.4 steps 2–3, computed once and shared by routes, operators, and
/// time slots. Delays are sorted ascending (stable) before percentile/median
/// computation, per the determinism rule.
fn summarize(rows: &[AggregationRow]) -> GroupSummary {
    let total = rows.len() as u64;
    let cancelled_count = rows.iter().filter(|r| r.cancellation_reason.is_some()).count() as u64;
    let cancelled_percentage = percentage(cancelled_count, total);

    let mut delays: Vec<i32> = rows.iter().filter_map(|r| r.delay_minutes).collect();
    delays.sort_unstable();

    let punctuality = PunctualityPercentages {
        on_time_percentage: percentage(count_within(&delays, 1), total),
        time_to_3_percentage: percentage(count_within(&delays, 3), total),
        time_to_5_percentage: percentage(count_within(&delays, 5), total),
        time_to_10_percentage: percentage(count_within(&delays, 10), total),
        time_to_15_percentage: percentage(count_within(&delays, 15), total),
        time_to_30_percentage: percentage(count_within(&delays, 30), total),
    };

    let delay_summary = delay_summary(&delays);

    let mut histogram = DelayHistogram::default();
    for &d in &delays {
        histogram.record(d);
    }
    // Stops with no recorded delay (cancelled or never reported) still count
    // toward the group, so they get their own bucket rather than being
    // dropped from the histogram's total (spec §8: bucket counts sum to
    // `total_services`).
    for _ in 0..(total - delays.len() as u64) {
        histogram.record_no_data();
    }

    let severe_delay_percentage = 100.0 - punctuality.time_to_30_percentage;
    let score = reliability_score(punctuality.time_to_5_percentage, punctuality.time_to_10_percentage, cancelled_percentage, severe_delay_percentage);

    GroupSummary {
        total,
        punctuality,
        delay: delay_summary,
        histogram,
        cancelled_count,
        cancelled_percentage,
        reliability_score: score,
        grade: Grade::from_score(score),
    }
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * count as f64 / total as f64
    }
}

fn count_within(sorted_delays: &[i32], threshold: i32) -> u64 {
    sorted_delays.iter().filter(|&&d| d <= threshold).count() as u64
}

fn delay_summary(sorted_delays: &[i32]) -> DelaySummary {
    if sorted_delays.is_empty() {
        return DelaySummary::default();
    }
    let n = sorted_delays.len();
    let sum: i64 = sorted_delays.iter().map(|&d| d as i64).sum();
    let avg = sum as f64 / n as f64;
    let median = if n % 2 == 0 {
        (sorted_delays[n / 2 - 1] as f64 + sorted_delays[n / 2] as f64) / 2.0
    } else {
        sorted_delays[n / 2] as f64
    };
    let max = *sorted_delays.last().unwrap();
    let variance = sorted_delays.iter().map(|&d| (d as f64 - avg).powi(2)).sum::<f64>() / n as f64;
    DelaySummary { avg_delay: avg, median_delay: median, max_delay: max, std_delay: variance.sqrt() }
}

fn hourly_breakdown(rows: &[AggregationRow]) -> BTreeMap<u8, PunctualityPercentages> {
    group_by_hour(rows).into_iter().map(|(hour, rows)| (hour, summarize(&rows).punctuality)).collect()
}

fn weekday_breakdown(rows: &[AggregationRow]) -> BTreeMap<u8, PunctualityPercentages> {
    group_by_weekday(rows).into_iter().map(|(weekday, rows)| (weekday, summarize(&rows).punctuality)).collect()
}

fn group_by_hour(rows: &[AggregationRow]) -> BTreeMap<u8, Vec<AggregationRow>> {
    let mut groups: BTreeMap<u8, Vec<AggregationRow>> = BTreeMap::new();
    for row in rows {
        if let Some(scheduled) = row.scheduled_departure {
            groups.entry(scheduled.hour() as u8).or_default().push(row.clone());
        }
    }
    groups
}

fn group_by_weekday(rows: &[AggregationRow]) -> BTreeMap<u8, Vec<AggregationRow>> {
    let mut groups: BTreeMap<u8, Vec<AggregationRow>> = BTreeMap::new();
    for row in rows {
        if let Some(scheduled) = row.scheduled_departure {
            groups.entry(scheduled.weekday().num_days_from_monday() as u8).or_default().push(row.clone());
        }
    }
    groups
}

/// Network-wide average across the latest row per route — ladder level 4
/// (spec §4.5). Returns `None` if no route has any statistics yet.
pub struct NetworkWideStat {
    pub total_services: u64,
    pub punctuality: PunctualityPercentages,
    pub delay: DelaySummary,
    pub cancelled_percentage: f64,
}

pub fn combine_network_wide(stats: &[RouteStat]) -> Option<NetworkWideStat> {
    if stats.is_empty() {
        return None;
    }
    let total_services: u64 = stats.iter().map(|s| s.total_services).sum();
    if total_services == 0 {
        return None;
    }
    let weighted = |f: fn(&RouteStat) -> f64| -> f64 {
        stats.iter().map(|s| f(s) * s.total_services as f64).sum::<f64>() / total_services as f64
    };
    let punctuality = PunctualityPercentages {
        on_time_percentage: weighted(|s| s.punctuality.on_time_percentage),
        time_to_3_percentage: weighted(|s| s.punctuality.time_to_3_percentage),
        time_to_5_percentage: weighted(|s| s.punctuality.time_to_5_percentage),
        time_to_10_percentage: weighted(|s| s.punctuality.time_to_10_percentage),
        time_to_15_percentage: weighted(|s| s.punctuality.time_to_15_percentage),
        time_to_30_percentage: weighted(|s| s.punctuality.time_to_30_percentage),
    };
    let delay = DelaySummary {
        avg_delay: weighted(|s| s.delay.avg_delay),
        median_delay: weighted(|s| s.delay.median_delay),
        max_delay: stats.iter().map(|s| s.delay.max_delay).max().unwrap_or(0),
        std_delay: weighted(|s| s.delay.std_delay),
    };
    let cancelled_percentage = weighted(|s| s.cancelled_percentage);
    Some(NetworkWideStat { total_services, punctuality, delay, cancelled_percentage })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(delay: Option<i32>, cancelled: bool) -> AggregationRow {
        AggregationRow {
            delay_minutes: delay,
            cancellation_reason: cancelled.then(|| "reason".to_string()),
            scheduled_departure: None,
            operator_code: "GW".to_string(),
        }
    }

    #[test]
    fn summarize_computes_percentages_and_histogram() {
        let rows = vec![row(Some(0), false), row(Some(4), false), row(Some(20), false), row(None, true)];
        let summary = summarize(&rows);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.cancelled_count, 1);
        assert_eq!(summary.cancelled_percentage, 25.0);
        assert_eq!(summary.histogram.total(), summary.total);
        assert_eq!(summary.histogram.bucket_no_data, 1);
        assert_eq!(summary.punctuality.on_time_percentage, 25.0);
        assert_eq!(summary.punctuality.time_to_5_percentage, 50.0);
    }

    #[test]
    fn median_is_deterministic_under_ties() {
        let rows = vec![row(Some(5), false), row(Some(5), false), row(Some(1), false), row(Some(9), false)];
        let summary = summarize(&rows);
        assert_eq!(summary.delay.median_delay, 5.0);
    }

    #[test]
    fn network_wide_average_is_weighted_by_sample_size() {
        let big = RouteStat {
            origin: Crs::parse("EUS").unwrap(),
            destination: Crs::parse("MAN").unwrap(),
            calculation_date: Utc::now().date_naive(),
            total_services: 900,
            punctuality: PunctualityPercentages { on_time_percentage: 90.0, ..Default::default() },
            delay: DelaySummary::default(),
            histogram: DelayHistogram::default(),
            cancelled_count: 0,
            cancelled_percentage: 0.0,
            reliability_score: 0.0,
            grade: Grade::A,
            hourly_breakdown: BTreeMap::new(),
            weekday_breakdown: BTreeMap::new(),
        };
        let small = RouteStat { total_services: 100, punctuality: PunctualityPercentages { on_time_percentage: 0.0, ..Default::default() }, ..big.clone() };
        let combined = combine_network_wide(&[big, small]).unwrap();
        assert_eq!(combined.total_services, 1000);
        assert_eq!(combined.punctuality.on_time_percentage, 81.0);
    }
}
