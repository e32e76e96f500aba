//! Date parsing for report parameters and configuration files
//!
//! Report ranges and pricing periods are expressed as timezone-free wall-clock
//! instants. Inputs carrying an explicit offset keep their wall-clock reading
//! and drop the offset.

use crate::error::{BillstatError, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a report date
///
/// Accepts `YYYY-MM-DD` (midnight), `YYYY-MM-DD HH:MM[:SS[.f]]`, the same with a
/// `T` separator, and RFC 3339 timestamps.
///
/// # Example
///
/// ```
/// use billstat_core::dates::parse_report_date;
/// use chrono::Timelike;
///
/// let date = parse_report_date("2024-01-15").unwrap();
/// assert_eq!(date.hour(), 0);
///
/// let date = parse_report_date("2024-01-15T10:30:00+02:00").unwrap();
/// assert_eq!(date.hour(), 10);
///
/// assert!(parse_report_date("yesterday").is_err());
/// ```
pub fn parse_report_date(input: &str) -> Result<NaiveDateTime> {
    let trimmed = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt);
        }
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.naive_local())
        .map_err(|_| {
            BillstatError::InvalidDate(format!(
                "'{trimmed}', expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS"
            ))
        })
}

/// First instant of the month containing `now`
pub fn start_of_month(now: NaiveDateTime) -> NaiveDateTime {
    let date = now.date();
    let first = date - Duration::days(i64::from(date.day0()));
    first.and_time(NaiveTime::MIN)
}

/// Render an instant as `YYYY-MM-DD HH:MM:SS`
///
/// Microseconds are appended only when non-zero.
pub fn format_report_date(instant: NaiveDateTime) -> String {
    if instant.nanosecond() / 1_000 == 0 {
        instant.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        instant.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

/// Serde adapter for report range dates, space separated
///
/// Use with `#[serde(with = "crate::dates::space_separated")]`.
pub mod space_separated {
    use super::{format_report_date, parse_report_date};
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S>(instant: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_report_date(*instant))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_report_date(&raw).map_err(de::Error::custom)
    }
}
