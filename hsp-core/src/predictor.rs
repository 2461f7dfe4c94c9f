//! Prediction engine (C5): combines cached statistics with a fallback
//! ladder and time-of-day/weekday adjustment factors to produce a delay
//! estimate with confidence (spec §4.5).

use chrono::{NaiveDate, NaiveTime, Timelike, Weekday};

use crate::aggregator::NetworkWideStat;
use crate::domain::{Confidence, Crs, PredictionLevel, PredictionResult};
use crate::error::StoreError;
use crate::store::Store;

/// Minimum sample size a ladder rung needs before it is trusted, per spec
/// §4.5.
const SAMPLE_FLOOR: u64 = 30;

/// Hard-coded industry floor, the ladder's last rung (spec §4.5).
const FLOOR_ON_TIME_PERCENTAGE: f64 = 64.0;
const FLOOR_MEAN_DELAY_MINUTES: f64 = 4.0;

pub struct Predictor {
    store: Store,
}

/// One rung's worth of summary statistics, independent of which table it
/// came from — the shape the ladder climbs down through.
struct RungStats {
    sample_size: u64,
    on_time_percentage: f64,
    time_to_5_percentage: f64,
    time_to_15_percentage: f64,
    time_to_30_percentage: f64,
    avg_delay: f64,
}

impl Predictor {
    pub fn new(store: Store) -> Self {
        Predictor { store }
    }

    /// `predict(origin, destination, departure_date, departure_time,
    /// operator_hint?)`, per spec §4.5.
    pub async fn predict(
        &self,
        origin: &Crs,
        destination: &Crs,
        departure_date: NaiveDate,
        departure_time: NaiveTime,
        operator_hint: Option<&str>,
    ) -> Result<PredictionResult, StoreError> {
        let route_stat = self.store.latest_route_stat(origin, destination).await?;
        let operator_stat = match operator_hint {
            Some(code) => self.store.latest_operator_stat(code).await?,
            None => None,
        };

        let (rung, level) = self.climb_ladder(route_stat, operator_stat, operator_hint).await?;

        let hour_factor = hour_of_day_factor(departure_time.hour());
        let weekday_factor = weekday_factor(departure_date.weekday());

        let (expected_delay, on_time_probability) =
            apply_factor(rung.avg_delay, rung.on_time_percentage / 100.0, hour_factor);
        let (expected_delay, on_time_probability) = apply_factor(expected_delay, on_time_probability, weekday_factor);

        let confidence = confidence_for(rung.sample_size, level);
        let is_degraded = level == PredictionLevel::IndustryFloor;
        let degradation_reason = is_degraded.then_some("no_route_data");

        let explanation = explain(level, rung.sample_size, expected_delay, on_time_probability, is_degraded);

        Ok(PredictionResult {
            expected_delay_minutes: round1(expected_delay),
            on_time_probability,
            ppm5_probability: rung.time_to_5_percentage / 100.0,
            ppm15_probability: rung.time_to_15_percentage / 100.0,
            severe_delay_probability: (100.0 - rung.time_to_30_percentage) / 100.0,
            confidence,
            sample_size: rung.sample_size,
            level,
            is_degraded,
            degradation_reason,
            explanation,
        })
    }

    /// Walks the five-rung fallback ladder, returning the first rung that
    /// clears [`SAMPLE_FLOOR`] (spec §4.5).
    async fn climb_ladder(
        &self,
        route_stat: Option<crate::domain::RouteStat>,
        operator_stat: Option<crate::domain::OperatorStat>,
        operator_hint: Option<&str>,
    ) -> Result<(RungStats, PredictionLevel), StoreError> {
        if operator_hint.is_some() {
            if let (Some(route), Some(operator)) = (&route_stat, &operator_stat) {
                let combined = combine_route_and_operator(route, operator);
                if combined.sample_size >= SAMPLE_FLOOR {
                    return Ok((combined, PredictionLevel::ExactRouteOperator));
                }
            }
        }

        if let Some(route) = &route_stat {
            if route.total_services >= SAMPLE_FLOOR {
                return Ok((rung_from_route(route), PredictionLevel::RouteSummary));
            }
        }

        if let Some(operator) = &operator_stat {
            if operator.total_services >= SAMPLE_FLOOR {
                return Ok((rung_from_operator(operator), PredictionLevel::OperatorNetwork));
            }
        }

        if let Some(network) = self.store.network_wide_average().await? {
            if network.total_services >= SAMPLE_FLOOR {
                return Ok((rung_from_network(&network), PredictionLevel::NetworkWide));
            }
        }

        Ok((
            RungStats {
                sample_size: 0,
                on_time_percentage: FLOOR_ON_TIME_PERCENTAGE,
                time_to_5_percentage: FLOOR_ON_TIME_PERCENTAGE,
                time_to_15_percentage: FLOOR_ON_TIME_PERCENTAGE,
                time_to_30_percentage: FLOOR_ON_TIME_PERCENTAGE,
                avg_delay: FLOOR_MEAN_DELAY_MINUTES,
            },
            PredictionLevel::IndustryFloor,
        ))
    }
}

/// Combines a route's and an operator's statistics for ladder level 1,
/// weighting each by its own sample size — the same weighted-blend shape
/// the aggregator's network-wide average uses.
fn combine_route_and_operator(route: &crate::domain::RouteStat, operator: &crate::domain::OperatorStat) -> RungStats {
    let sample_size = route.total_services.min(operator.total_services);
    let route_weight = route.total_services as f64;
    let operator_weight = operator.total_services as f64;
    let total_weight = route_weight + operator_weight;
    let blend = |route_value: f64, operator_value: f64| -> f64 {
        if total_weight == 0.0 {
            0.0
        } else {
            (route_value * route_weight + operator_value * operator_weight) / total_weight
        }
    };
    RungStats {
        sample_size,
        on_time_percentage: blend(route.punctuality.on_time_percentage, operator.punctuality.on_time_percentage),
        time_to_5_percentage: blend(route.punctuality.time_to_5_percentage, operator.punctuality.time_to_5_percentage),
        time_to_15_percentage: blend(route.punctuality.time_to_15_percentage, operator.punctuality.time_to_15_percentage),
        time_to_30_percentage: blend(route.punctuality.time_to_30_percentage, operator.punctuality.time_to_30_percentage),
        avg_delay: blend(route.delay.avg_delay, operator.delay.avg_delay),
    }
}

fn rung_from_route(route: &crate::domain::RouteStat) -> RungStats {
    RungStats {
        sample_size: route.total_services,
        on_time_percentage: route.punctuality.on_time_percentage,
        time_to_5_percentage: route.punctuality.time_to_5_percentage,
        time_to_15_percentage: route.punctuality.time_to_15_percentage,
        time_to_30_percentage: route.punctuality.time_to_30_percentage,
        avg_delay: route.delay.avg_delay,
    }
}

fn rung_from_operator(operator: &crate::domain::OperatorStat) -> RungStats {
    RungStats {
        sample_size: operator.total_services,
        on_time_percentage: operator.punctuality.on_time_percentage,
        time_to_5_percentage: operator.punctuality.time_to_5_percentage,
        time_to_15_percentage: operator.punctuality.time_to_15_percentage,
        time_to_30_percentage: operator.punctuality.time_to_30_percentage,
        avg_delay: operator.delay.avg_delay,
    }
}

fn rung_from_network(network: &NetworkWideStat) -> RungStats {
    RungStats {
        sample_size: network.total_services,
        on_time_percentage: network.punctuality.on_time_percentage,
        time_to_5_percentage: network.punctuality.time_to_5_percentage,
        time_to_15_percentage: network.punctuality.time_to_15_percentage,
        time_to_30_percentage: network.punctuality.time_to_30_percentage,
        avg_delay: network.delay.avg_delay,
    }
}

/// `[0, 6)` early, `[6, 10)` morning peak, `[10, 16)` midday, `[16, 19)`
/// evening peak, `[19, 24)` evening — spec §4.5 table.
fn hour_of_day_factor(hour: u32) -> f64 {
    match hour {
        0..=5 => 0.85,
        6..=9 => 1.15,
        10..=15 => 1.00,
        16..=18 => 1.20,
        _ => 1.05,
    }
}

fn weekday_factor(weekday: Weekday) -> f64 {
    match weekday {
        Weekday::Sat | Weekday::Sun => 0.90,
        _ => 1.00,
    }
}

/// Scales expected delay directly by `factor`; adjusts `on_time_probability`
/// by its inverse, per spec §4.5: `p_adj = clamp(p · (2 − factor), 0, 1)`.
fn apply_factor(expected_delay: f64, on_time_probability: f64, factor: f64) -> (f64, f64) {
    (expected_delay * factor, (on_time_probability * (2.0 - factor)).clamp(0.0, 1.0))
}

/// HIGH requires level ≤ 2 and sample ≥ 150; MEDIUM requires sample ≥ 50;
/// LOW otherwise; VERY_LOW at level 5 (spec §4.5).
fn confidence_for(sample_size: u64, level: PredictionLevel) -> Confidence {
    if level == PredictionLevel::IndustryFloor {
        return Confidence::VeryLow;
    }
    if level <= PredictionLevel::RouteSummary && sample_size >= 150 {
        Confidence::High
    } else if sample_size >= 50 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn explain(level: PredictionLevel, sample_size: u64, expected_delay: f64, on_time_probability: f64, is_degraded: bool) -> String {
    if is_degraded {
        return format!(
            "No statistics are available for this route; falling back to the industry-wide floor \
             (on-time {:.0}%, mean delay {:.1} min).",
            FLOOR_ON_TIME_PERCENTAGE, FLOOR_MEAN_DELAY_MINUTES
        );
    }
    let basis = match level {
        PredictionLevel::ExactRouteOperator => "this route and operator",
        PredictionLevel::RouteSummary => "this route across all operators",
        PredictionLevel::OperatorNetwork => "this operator across its whole network",
        PredictionLevel::NetworkWide => "the network-wide average across all routes",
        PredictionLevel::IndustryFloor => unreachable!("handled by the is_degraded branch above"),
    };
    format!(
        "Based on {sample_size} observed services for {basis}, expected delay is {:.1} minutes with a {:.0}% chance of an on-time arrival.",
        round1(expected_delay),
        on_time_probability * 100.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DelayHistogram, DelaySummary, Grade, OperatorStat, PunctualityPercentages, RouteStat};
    use std::collections::BTreeMap;

    fn seeded_route(total_services: u64, on_time_percentage: f64, avg_delay: f64) -> RouteStat {
        RouteStat {
            origin: Crs::parse("EUS").unwrap(),
            destination: Crs::parse("MAN").unwrap(),
            calculation_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            total_services,
            punctuality: PunctualityPercentages {
                on_time_percentage,
                time_to_3_percentage: on_time_percentage,
                time_to_5_percentage: on_time_percentage,
                time_to_10_percentage: on_time_percentage,
                time_to_15_percentage: on_time_percentage,
                time_to_30_percentage: 98.0,
            },
            delay: DelaySummary { avg_delay, median_delay: avg_delay, max_delay: 60, std_delay: 2.0 },
            histogram: DelayHistogram::default(),
            cancelled_count: 0,
            cancelled_percentage: 0.0,
            reliability_score: 90.0,
            grade: Grade::A,
            hourly_breakdown: BTreeMap::new(),
            weekday_breakdown: BTreeMap::new(),
        }
    }

    #[test]
    fn morning_peak_and_weekday_factors_compose_multiplicatively() {
        let tuesday = hour_of_day_factor(9) * weekday_factor(Weekday::Tue);
        let saturday = hour_of_day_factor(9) * weekday_factor(Weekday::Sat);
        assert_eq!(tuesday, 1.15);
        assert!((saturday - 1.15 * 0.90).abs() < 1e-9);
    }

    #[test]
    fn high_confidence_requires_level_and_sample_size() {
        assert_eq!(confidence_for(150, PredictionLevel::RouteSummary), Confidence::High);
        assert_eq!(confidence_for(149, PredictionLevel::RouteSummary), Confidence::Medium);
        assert_eq!(confidence_for(150, PredictionLevel::OperatorNetwork), Confidence::Medium);
        assert_eq!(confidence_for(0, PredictionLevel::IndustryFloor), Confidence::VeryLow);
    }

    #[test]
    fn rung_from_route_matches_route_stat_fields() {
        let route = seeded_route(1000, 70.0, 4.2);
        let rung = rung_from_route(&route);
        assert_eq!(rung.sample_size, 1000);
        assert_eq!(rung.avg_delay, 4.2);
    }

    #[test]
    fn combine_weights_by_sample_size() {
        let route = seeded_route(900, 80.0, 4.0);
        let operator = OperatorStat {
            operator_code: "GW".to_string(),
            calculation_date: route.calculation_date,
            total_services: 100,
            punctuality: PunctualityPercentages { on_time_percentage: 0.0, ..Default::default() },
            delay: DelaySummary { avg_delay: 0.0, ..Default::default() },
            histogram: DelayHistogram::default(),
            cancelled_count: 0,
            cancelled_percentage: 0.0,
            reliability_score: 0.0,
            grade: Grade::F,
        };
        let combined = combine_route_and_operator(&route, &operator);
        assert_eq!(combined.sample_size, 100);
        assert!((combined.on_time_percentage - 72.0).abs() < 1e-9);
    }
}
