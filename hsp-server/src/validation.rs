//! Input validation for the HTTP boundary (spec §4.6): CRS codes, the
//! today..today+90 departure-date window, and `HH:MM` times. Violations are
//! collected rather than returned on the first failure, so a single 422
//! response can list every field that's wrong.

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use hsp_core::domain::Crs;

use crate::error::ValidationIssue;

const MAX_ADVANCE_DAYS: i64 = 90;

pub fn parse_crs(field: &'static str, raw: &str, issues: &mut Vec<ValidationIssue>) -> Option<Crs> {
    if raw.len() != 3 || !raw.bytes().all(|b| b.is_ascii_uppercase()) {
        issues.push(ValidationIssue::new(field, format!("{raw:?} must match ^[A-Z]{{3}}$")));
        return None;
    }
    match Crs::parse(raw) {
        Ok(crs) => Some(crs),
        Err(e) => {
            issues.push(ValidationIssue::new(field, e.to_string()));
            None
        }
    }
}

pub fn parse_departure_date(field: &'static str, raw: &str, issues: &mut Vec<ValidationIssue>) -> Option<NaiveDate> {
    let date = match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date,
        Err(_) => {
            issues.push(ValidationIssue::new(field, format!("{raw:?} is not a valid YYYY-MM-DD date")));
            return None;
        }
    };
    let today = Utc::now().date_naive();
    let latest = today + Duration::days(MAX_ADVANCE_DAYS);
    if date < today || date > latest {
        issues.push(ValidationIssue::new(field, format!("{date} is outside the allowed window [{today}, {latest}]")));
        return None;
    }
    Some(date)
}

pub fn parse_departure_time(field: &'static str, raw: &str, issues: &mut Vec<ValidationIssue>) -> Option<NaiveTime> {
    match NaiveTime::parse_from_str(raw, "%H:%M") {
        Ok(time) => Some(time),
        Err(_) => {
            issues.push(ValidationIssue::new(field, format!("{raw:?} is not a valid HH:MM time")));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercase_crs_is_rejected() {
        let mut issues = Vec::new();
        assert!(parse_crs("origin", "eus", &mut issues).is_none());
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn well_formed_crs_is_accepted() {
        let mut issues = Vec::new();
        assert!(parse_crs("origin", "EUS", &mut issues).is_some());
        assert!(issues.is_empty());
    }

    #[test]
    fn date_before_today_is_rejected() {
        let mut issues = Vec::new();
        let yesterday = (Utc::now().date_naive() - Duration::days(1)).format("%Y-%m-%d").to_string();
        assert!(parse_departure_date("departure_date", &yesterday, &mut issues).is_none());
    }

    #[test]
    fn date_past_the_90_day_window_is_rejected() {
        let mut issues = Vec::new();
        let too_far = (Utc::now().date_naive() + Duration::days(91)).format("%Y-%m-%d").to_string();
        assert!(parse_departure_date("departure_date", &too_far, &mut issues).is_none());
    }

    #[test]
    fn malformed_time_is_rejected() {
        let mut issues = Vec::new();
        assert!(parse_departure_time("departure_time", "25:99", &mut issues).is_none());
    }
}
