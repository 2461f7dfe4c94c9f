use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated 3-letter Computer Reservation System code (e.g. `EUS`).
///
/// Construction always uppercases and checks `^[A-Z]{3}$`; there is no way
/// to hold an invalid CRS in one of these once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs([u8; 3]);

/// The CRS code did not match `^[A-Z]{3}$` once uppercased.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid CRS code {0:?}: must be exactly 3 alphabetic characters")]
pub struct InvalidCrs(pub String);

impl Crs {
    pub fn parse(raw: &str) -> Result<Self, InvalidCrs> {
        let upper = raw.to_ascii_uppercase();
        let bytes = upper.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_alphabetic()) {
            return Err(InvalidCrs(raw.to_string()));
        }
        Ok(Crs([bytes[0], bytes[1], bytes[2]]))
    }

    pub fn as_str(&self) -> &str {
        // Safe: constructed only from ascii-alphabetic bytes.
        std::str::from_utf8(&self.0).unwrap()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Crs {
    type Error = InvalidCrs;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Crs::parse(&value)
    }
}

impl From<Crs> for String {
    fn from(value: Crs) -> Self {
        value.as_str().to_string()
    }
}

/// A National Location Code: 4 ASCII digits, used to cross-reference a
/// station against the fares system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nlc([u8; 4]);

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid NLC code {0:?}: must be exactly 4 digits")]
pub struct InvalidNlc(pub String);

impl Nlc {
    pub fn parse(raw: &str) -> Result<Self, InvalidNlc> {
        let bytes = raw.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(|b| b.is_ascii_digit()) {
            return Err(InvalidNlc(raw.to_string()));
        }
        Ok(Nlc([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap()
    }
}

impl fmt::Display for Nlc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Nlc {
    type Error = InvalidNlc;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Nlc::parse(&value)
    }
}

impl From<Nlc> for String {
    fn from(value: Nlc) -> Self {
        value.as_str().to_string()
    }
}

/// A station, identified by CRS, optionally cross-referenced by NLC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub crs: Crs,
    pub nlc: Option<Nlc>,
    pub name: String,
}

/// A Train Operating Company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operator {
    /// 2-4 character short code, e.g. `GW`, `SWR`.
    pub code: String,
    pub name: String,
}

impl Operator {
    pub fn validate_code(code: &str) -> bool {
        (2..=4).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_alphanumeric())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crs_parses_and_uppercases() {
        let crs = Crs::parse("eus").unwrap();
        assert_eq!(crs.as_str(), "EUS");
    }

    #[test]
    fn crs_rejects_wrong_length() {
        assert!(Crs::parse("EUST").is_err());
        assert!(Crs::parse("EU").is_err());
    }

    #[test]
    fn crs_rejects_digits() {
        assert!(Crs::parse("E12").is_err());
    }

    #[test]
    fn nlc_parses_four_digits() {
        assert!(Nlc::parse("1234").is_ok());
        assert!(Nlc::parse("12a4").is_err());
        assert!(Nlc::parse("123").is_err());
    }

    #[test]
    fn operator_code_validation() {
        assert!(Operator::validate_code("GW"));
        assert!(Operator::validate_code("SWR"));
        assert!(!Operator::validate_code("A"));
        assert!(!Operator::validate_code("TOOLONG"));
    }
}
