use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::station::Crs;

/// Six-bucket delay histogram: the five spec §3 delay buckets `[0,5)
/// [5,15) [15,30) [30,60) [60,inf)` plus `no_data` for stops whose delay is
/// unobserved (cancelled or never reported). `no_data` participates in
/// [`Self::total`] so the bucket counts always sum to the group's total
/// service count, per spec §8.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayHistogram {
    pub bucket_0_5: u64,
    pub bucket_5_15: u64,
    pub bucket_15_30: u64,
    pub bucket_30_60: u64,
    pub bucket_60_plus: u64,
    pub bucket_no_data: u64,
}

impl DelayHistogram {
    pub fn total(&self) -> u64 {
        self.bucket_0_5 + self.bucket_5_15 + self.bucket_15_30 + self.bucket_30_60 + self.bucket_60_plus + self.bucket_no_data
    }

    pub fn bucket_for(delay_minutes: i32) -> HistogramBucket {
        match delay_minutes {
            i32::MIN..=4 => HistogramBucket::Bucket0To5,
            5..=14 => HistogramBucket::Bucket5To15,
            15..=29 => HistogramBucket::Bucket15To30,
            30..=59 => HistogramBucket::Bucket30To60,
            _ => HistogramBucket::Bucket60Plus,
        }
    }

    pub fn record(&mut self, delay_minutes: i32) {
        match Self::bucket_for(delay_minutes) {
            HistogramBucket::Bucket0To5 => self.bucket_0_5 += 1,
            HistogramBucket::Bucket5To15 => self.bucket_5_15 += 1,
            HistogramBucket::Bucket15To30 => self.bucket_15_30 += 1,
            HistogramBucket::Bucket30To60 => self.bucket_30_60 += 1,
            HistogramBucket::Bucket60Plus => self.bucket_60_plus += 1,
        }
    }

    /// Records a stop whose delay was never observed (spec §3: `delay_minutes`
    /// null). Keeps [`Self::total`] equal to the group's total service count
    /// even though such stops contribute to none of the five delay buckets.
    pub fn record_no_data(&mut self) {
        self.bucket_no_data += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistogramBucket {
    Bucket0To5,
    Bucket5To15,
    Bucket15To30,
    Bucket30To60,
    Bucket60Plus,
}

/// Letter grade derived from `reliability_score`, per spec §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Grade::A
        } else if score >= 80.0 {
            Grade::B
        } else if score >= 70.0 {
            Grade::C
        } else if score >= 60.0 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

/// The "on time within K minutes" percentages computed identically for
/// routes, operators, and time slots.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PunctualityPercentages {
    /// PPM-1 / "on time" in the ORR sense used by this system: `delay <= 1`.
    pub on_time_percentage: f64,
    pub time_to_3_percentage: f64,
    pub time_to_5_percentage: f64,
    pub time_to_10_percentage: f64,
    pub time_to_15_percentage: f64,
    pub time_to_30_percentage: f64,
}

/// Central-tendency/spread summary of delay minutes over a non-null sample.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DelaySummary {
    pub avg_delay: f64,
    pub median_delay: f64,
    pub max_delay: i32,
    pub std_delay: f64,
}

/// A denormalized route-level reliability row, keyed by (origin,
/// destination, calculation_date). Per spec §3, the most recent row per
/// (origin, destination) is canonical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStat {
    pub origin: Crs,
    pub destination: Crs,
    pub calculation_date: NaiveDate,
    pub total_services: u64,
    pub punctuality: PunctualityPercentages,
    pub delay: DelaySummary,
    pub histogram: DelayHistogram,
    pub cancelled_count: u64,
    pub cancelled_percentage: f64,
    pub reliability_score: f64,
    pub grade: Grade,
    pub hourly_breakdown: std::collections::BTreeMap<u8, PunctualityPercentages>,
    pub weekday_breakdown: std::collections::BTreeMap<u8, PunctualityPercentages>,
}

/// Operator-level analogue of [`RouteStat`], keyed by operator code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorStat {
    pub operator_code: String,
    pub calculation_date: NaiveDate,
    pub total_services: u64,
    pub punctuality: PunctualityPercentages,
    pub delay: DelaySummary,
    pub histogram: DelayHistogram,
    pub cancelled_count: u64,
    pub cancelled_percentage: f64,
    pub reliability_score: f64,
    pub grade: Grade,
}

/// Keyed by (origin, destination, hour_of_day, day_of_week). `day_of_week =
/// None` means "all days" per spec §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlotStat {
    pub origin: Crs,
    pub destination: Crs,
    pub hour_of_day: u8,
    pub day_of_week: Option<u8>,
    pub calculation_date: NaiveDate,
    pub total_services: u64,
    pub punctuality: PunctualityPercentages,
    pub delay: DelaySummary,
}

/// Computes `reliability_score` per spec §4.4, clamped to `[0, 100]`.
pub fn reliability_score(ppm5: f64, ppm10: f64, cancelled_pct: f64, severe_delay_pct: f64) -> f64 {
    let raw = 0.4 * ppm5 + 0.3 * ppm10 + 0.2 * (100.0 - cancelled_pct) + 0.1 * (100.0 - severe_delay_pct);
    raw.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_bucketing_matches_spec_boundaries() {
        let mut h = DelayHistogram::default();
        for d in [0, 4, 5, 14, 15, 29, 30, 59, 60, 500] {
            h.record(d);
        }
        assert_eq!(h.bucket_0_5, 2);
        assert_eq!(h.bucket_5_15, 2);
        assert_eq!(h.bucket_15_30, 2);
        assert_eq!(h.bucket_30_60, 2);
        assert_eq!(h.bucket_60_plus, 2);
        assert_eq!(h.total(), 10);
    }

    #[test]
    fn no_data_bucket_keeps_total_equal_to_group_size() {
        let mut h = DelayHistogram::default();
        h.record(0);
        h.record(20);
        h.record_no_data();
        let total_services = 3;
        assert_eq!(h.total(), total_services);
    }

    #[test]
    fn grade_thresholds() {
        assert_eq!(Grade::from_score(95.0), Grade::A);
        assert_eq!(Grade::from_score(90.0), Grade::A);
        assert_eq!(Grade::from_score(89.9), Grade::B);
        assert_eq!(Grade::from_score(60.0), Grade::D);
        assert_eq!(Grade::from_score(59.9), Grade::F);
    }

    #[test]
    fn reliability_score_clamped() {
        assert_eq!(reliability_score(100.0, 100.0, 0.0, 0.0), 100.0);
        assert_eq!(reliability_score(0.0, 0.0, 100.0, 100.0), 0.0);
    }
}
