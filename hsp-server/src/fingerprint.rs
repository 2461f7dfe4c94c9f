//! The canonical prediction cache key (spec §4.6, §9): built from an
//! explicit, ordered tuple of inputs rather than a reflective `@cached`
//! wrapper keyed on keyword arguments — the source's bug this design note
//! calls out.

use chrono::{NaiveDate, NaiveTime};
use hsp_core::domain::{Crs, PredictionFingerprint};
use sha2::{Digest, Sha256};

/// `sha256(origin || destination || departure_date || departure_time)`,
/// truncated to the first 16 bytes. Any caller wanting a prediction cache
/// key must go through this function — there is no alternate keying path.
pub fn prediction_fingerprint(origin: &Crs, destination: &Crs, departure_date: NaiveDate, departure_time: NaiveTime) -> PredictionFingerprint {
    let mut hasher = Sha256::new();
    hasher.update(origin.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(destination.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(departure_date.format("%Y-%m-%d").to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(departure_time.format("%H:%M").to_string().as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    PredictionFingerprint(bytes)
}

/// The fare cache shares the same (origin, destination) half of the tuple,
/// but has no time dimension — a distinct key function, not a reuse of
/// `prediction_fingerprint` with dummy arguments.
pub fn fare_cache_key(origin: &Crs, destination: &Crs) -> String {
    format!("fare:{}:{}", origin.as_str(), destination.as_str())
}

/// Per-client rate-limiter fingerprint (spec §4.6):
/// `sha256(ip || ":" || user_agent)[:16]`, hex-encoded.
pub fn client_fingerprint(ip: &str, user_agent: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    hasher.update(b":");
    hasher.update(user_agent.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_produce_the_same_fingerprint_regardless_of_call_site() {
        let origin = Crs::parse("EUS").unwrap();
        let destination = Crs::parse("MAN").unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let time = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        let a = prediction_fingerprint(&origin, &destination, date, time);
        let b = prediction_fingerprint(&origin, &destination, date, time);
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_routes_produce_distinct_fingerprints() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let time = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        let a = prediction_fingerprint(&Crs::parse("EUS").unwrap(), &Crs::parse("MAN").unwrap(), date, time);
        let b = prediction_fingerprint(&Crs::parse("MAN").unwrap(), &Crs::parse("EUS").unwrap(), date, time);
        assert_ne!(a, b);
    }

    #[test]
    fn client_fingerprint_is_sixteen_hex_chars() {
        let fp = client_fingerprint("203.0.113.9", "curl/8.0");
        assert_eq!(fp.len(), 16);
        assert!(fp.bytes().all(|b| b.is_ascii_hexdigit()));
    }
}
