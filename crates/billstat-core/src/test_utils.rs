//! Shared test utilities for unit tests
//!
//! Integration tests (in tests/) cannot see this module because it's
//! marked with #[cfg(test)]; they have their own helpers in
//! tests/common/mod.rs.

use chrono::{NaiveDate, NaiveDateTime};

/// Midnight on the given calendar day
pub fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
    at_hms(year, month, day, 0, 0, 0)
}

/// An arbitrary wall-clock instant
pub fn at_hms(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, min, sec))
        .unwrap()
}
