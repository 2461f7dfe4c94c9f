//! Europe/London civil time arithmetic, per the §9 design note: never a
//! naive fixed offset, always resolved through a DST-aware timezone table.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Europe::London;

/// Parses an `HHMM` string (as sent by the upstream HSP feed) against a
/// civil date, interpreting it in Europe/London, and returns the UTC
/// instant.
///
/// `LocalResult::Ambiguous` (the autumn BST->GMT changeover, where a local
/// time occurs twice) resolves to the earlier of the two offsets — the
/// pre-changeover (summer) instant, matching how HSP's own timestamps are
/// understood to round-trip. `LocalResult::None` (the spring GMT->BST gap,
/// where a local time does not exist) shifts the naive time forward by one
/// hour, the conventional resolution for a skipped civil hour.
pub fn hhmm_to_utc(date: NaiveDate, hhmm: &str) -> Result<DateTime<Utc>, TimeParseError> {
    if hhmm.len() != 4 || !hhmm.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeParseError::Malformed(hhmm.to_string()));
    }
    let hour: u32 = hhmm[0..2].parse().map_err(|_| TimeParseError::Malformed(hhmm.to_string()))?;
    let minute: u32 = hhmm[2..4].parse().map_err(|_| TimeParseError::Malformed(hhmm.to_string()))?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| TimeParseError::Malformed(hhmm.to_string()))?;
    let naive = NaiveDateTime::new(date, time);
    Ok(resolve_london_local(naive).with_timezone(&Utc))
}

fn resolve_london_local(naive: NaiveDateTime) -> DateTime<chrono_tz::Tz> {
    match London.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earlier, _later) => earlier,
        LocalResult::None => {
            let shifted = naive + chrono::Duration::hours(1);
            match London.from_local_datetime(&shifted) {
                LocalResult::Single(dt) => dt,
                LocalResult::Ambiguous(earlier, _) => earlier,
                LocalResult::None => London.from_utc_datetime(&shifted),
            }
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TimeParseError {
    #[error("malformed HHMM time string: {0:?}")]
    Malformed(String),
}

/// Correct a next-day roll-over: when `actual` precedes `scheduled` by more
/// than 12 hours, the service crossed midnight and `actual` needs 24h added
/// (spec §4.3).
pub fn correct_rollover(scheduled: DateTime<Utc>, actual: DateTime<Utc>) -> DateTime<Utc> {
    if scheduled - actual > chrono::Duration::hours(12) {
        actual + chrono::Duration::hours(24)
    } else {
        actual
    }
}

/// `round((actual - scheduled) / 60s)`, per spec §4.3.
pub fn delay_minutes(scheduled: DateTime<Utc>, actual: DateTime<Utc>) -> i32 {
    let corrected = correct_rollover(scheduled, actual);
    let seconds = (corrected - scheduled).num_seconds();
    (seconds as f64 / 60.0).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn parses_hhmm_in_winter() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let utc = hhmm_to_utc(date, "0930").unwrap();
        // GMT in January: local 09:30 == UTC 09:30.
        assert_eq!(utc.format("%H:%M").to_string(), "09:30");
    }

    #[test]
    fn parses_hhmm_in_summer_bst() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 15).unwrap();
        let utc = hhmm_to_utc(date, "0930").unwrap();
        // BST is UTC+1 in July: local 09:30 == UTC 08:30.
        assert_eq!(utc.format("%H:%M").to_string(), "08:30");
    }

    #[test]
    fn rejects_malformed_hhmm() {
        assert!(hhmm_to_utc(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), "93a0").is_err());
        assert!(hhmm_to_utc(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), "930").is_err());
    }

    #[test]
    fn rollover_adds_a_day() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let scheduled = hhmm_to_utc(date, "2355").unwrap();
        let actual = hhmm_to_utc(date, "0005").unwrap();
        let corrected = correct_rollover(scheduled, actual);
        assert_eq!(corrected.date_naive(), date.succ_opt().unwrap());
    }

    #[test]
    fn delay_minutes_rounds_to_nearest() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let scheduled = hhmm_to_utc(date, "0900").unwrap();
        let actual = scheduled + chrono::Duration::seconds(150);
        assert_eq!(delay_minutes(scheduled, actual), 3);
    }
}
