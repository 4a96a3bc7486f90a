//! Duration parsing from strings
//!
//! Accepts compact unit-suffixed strings such as `"100ms"`, `"1s"`, `"1m30s"`
//! or `"1h 30m"`. Recognised units: `ns`, `us` (or `µs`), `ms`, `s`, `m`,
//! `h`, `d`. A bare `"0"` is also accepted.

use std::time::Duration;

use thiserror::Error;

/// Error type for duration parsing
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DurationParseError {
    #[error("Invalid duration format: {0}")]
    InvalidFormat(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    #[error("Empty duration string")]
    EmptyString,
}

fn unit_nanos(unit: &str) -> Option<f64> {
    let nanos = match unit {
        "ns" => 1.0,
        "us" | "µs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60.0 * 1e9,
        "h" => 3600.0 * 1e9,
        "d" => 86_400.0 * 1e9,
        _ => return None,
    };
    Some(nanos)
}

/// Parse a duration string into a Duration
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "foundation")]
/// # {
/// use std::time::Duration;
///
/// use restock_common::time::parse_duration;
///
/// assert_eq!(parse_duration("100ms").unwrap(), Duration::from_millis(100));
/// assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
/// assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
/// # }
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, DurationParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(DurationParseError::EmptyString);
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total_nanos = 0.0_f64;
    let mut rest = s;

    while !rest.is_empty() {
        rest = rest.trim_start();

        let number_len =
            rest.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(rest.len());
        if number_len == 0 {
            return Err(DurationParseError::InvalidFormat(format!(
                "expected number at '{rest}'"
            )));
        }
        let (number, tail) = rest.split_at(number_len);
        let value: f64 =
            number.parse().map_err(|_| DurationParseError::InvalidNumber(number.to_string()))?;

        let unit_len =
            tail.find(|c: char| c.is_ascii_digit() || c == '.' || c.is_whitespace())
                .unwrap_or(tail.len());
        if unit_len == 0 {
            return Err(DurationParseError::InvalidFormat(format!(
                "missing unit after '{number}'"
            )));
        }
        let (unit, tail) = tail.split_at(unit_len);
        let scale =
            unit_nanos(unit).ok_or_else(|| DurationParseError::UnknownUnit(unit.to_string()))?;

        total_nanos += value * scale;
        rest = tail;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(DurationParseError::InvalidFormat(format!("'{s}' is out of range")));
    }

    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

/// Render a duration in the compact form [`parse_duration`] accepts
///
/// Picks the largest unit that represents the value exactly, e.g. `"1m"`,
/// `"90s"`, `"250ms"`.
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }

    const UNITS: [(&str, u128); 6] = [
        ("h", 3_600_000_000_000),
        ("m", 60_000_000_000),
        ("s", 1_000_000_000),
        ("ms", 1_000_000),
        ("us", 1_000),
        ("ns", 1),
    ];

    UNITS
        .iter()
        .find(|(_, scale)| nanos % scale == 0)
        .map_or_else(|| format!("{nanos}ns"), |(unit, scale)| format!("{}{unit}", nanos / scale))
}

/// Serde adapter storing a [`Duration`] as a compact duration string
///
/// Use with `#[serde(with = "restock_common::time::duration::serde_str")]`.
#[cfg(feature = "serde")]
pub mod serde_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for time::duration.
    use super::*;

    /// Validates single-unit parsing.
    ///
    /// Assertions:
    /// - Each unit scales to the expected `Duration`.
    #[test]
    fn test_parse_single_units() {
        assert_eq!(parse_duration("100ms").unwrap(), Duration::from_millis(100));
        assert_eq!(parse_duration("1s").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86_400));
        assert_eq!(parse_duration("250us").unwrap(), Duration::from_micros(250));
        assert_eq!(parse_duration("7ns").unwrap(), Duration::from_nanos(7));
    }

    /// Validates concatenated and spaced segments.
    ///
    /// Assertions:
    /// - `1m30s`, `1h 30m` and `1s500ms` sum their parts.
    #[test]
    fn test_parse_compound() {
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1h 30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1s500ms").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("  5s  ").unwrap(), Duration::from_secs(5));
    }

    /// Validates fractional values and bare zero.
    ///
    /// Assertions:
    /// - `1.5h` is 5400s, `0.5s` is 500ms, `0` is zero.
    #[test]
    fn test_parse_decimals_and_zero() {
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("0.5s").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    /// Validates malformed input is rejected.
    ///
    /// Assertions:
    /// - Empty, unit-less, number-less, unknown-unit and negative strings fail.
    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_duration(""), Err(DurationParseError::EmptyString));
        assert!(matches!(parse_duration("5"), Err(DurationParseError::InvalidFormat(_))));
        assert!(matches!(parse_duration("x"), Err(DurationParseError::InvalidFormat(_))));
        assert!(matches!(parse_duration("5x"), Err(DurationParseError::UnknownUnit(_))));
        assert!(parse_duration("-1s").is_err());
        assert!(matches!(parse_duration("1..5s"), Err(DurationParseError::InvalidNumber(_))));
    }

    /// Validates formatting picks the largest exact unit.
    ///
    /// Assertions:
    /// - Output strings parse back to the same duration.
    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_millis(100)), "100ms");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m");
        assert_eq!(format_duration(Duration::from_secs(90)), "90s");
        assert_eq!(format_duration(Duration::from_secs(7200)), "2h");

        let odd = Duration::from_micros(1_234);
        assert_eq!(parse_duration(&format_duration(odd)).unwrap(), odd);
    }
}
