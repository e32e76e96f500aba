//! Calendar bucket granularities
//!
//! A [`BucketSize`] is chosen once per report and answers three questions:
//! whether two instants share a bucket, where the bucket containing an instant
//! starts, and where the next bucket starts. Buckets always begin at midnight;
//! weekly buckets begin on Monday and are identified by ISO week.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Reporting granularity
///
/// # Examples
/// ```
/// use billstat_core::granularity::BucketSize;
/// use chrono::NaiveDate;
///
/// let d = NaiveDate::from_ymd_opt(2024, 1, 17).unwrap().and_hms_opt(15, 0, 0).unwrap();
/// let start = BucketSize::Weekly.start_of_bucket(d);
/// assert_eq!(start.to_string(), "2024-01-15 00:00:00");
/// assert_eq!(BucketSize::Weekly.next_bucket(start).to_string(), "2024-01-22 00:00:00");
///
/// // Unknown names fall back to daily
/// assert_eq!(BucketSize::from_name_or_default(Some("hourly")), BucketSize::Daily);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketSize {
    /// One bucket per calendar day
    #[default]
    Daily,
    /// One bucket per ISO week, starting Monday
    Weekly,
    /// One bucket per calendar month
    Monthly,
    /// One bucket per calendar year
    Yearly,
}

impl BucketSize {
    /// All granularities
    pub const ALL: [BucketSize; 4] = [
        BucketSize::Daily,
        BucketSize::Weekly,
        BucketSize::Monthly,
        BucketSize::Yearly,
    ];

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Resolve a requested granularity name, defaulting to daily
    ///
    /// Unknown or missing names are not an error.
    pub fn from_name_or_default(name: Option<&str>) -> Self {
        match name {
            Some(name) => name.parse().unwrap_or_else(|_| {
                debug!("Unknown bucket size '{}', using daily", name);
                Self::Daily
            }),
            None => Self::Daily,
        }
    }

    /// Whether two instants fall in the same bucket
    pub fn same_bucket(&self, a: NaiveDateTime, b: NaiveDateTime) -> bool {
        match self {
            Self::Daily => a.date() == b.date(),
            Self::Weekly => a.iso_week() == b.iso_week(),
            Self::Monthly => a.year() == b.year() && a.month() == b.month(),
            Self::Yearly => a.year() == b.year(),
        }
    }

    /// Start of the bucket containing `instant`
    pub fn start_of_bucket(&self, instant: NaiveDateTime) -> NaiveDateTime {
        Self::midnight(self.first_day(instant.date()))
    }

    /// Start of the first bucket strictly after `instant`
    ///
    /// For an already-normalized bucket start this advances exactly one unit.
    pub fn next_bucket(&self, instant: NaiveDateTime) -> NaiveDateTime {
        let first = self.first_day(instant.date());
        let next = match self {
            Self::Daily => first + Duration::days(1),
            Self::Weekly => first + Duration::days(7),
            Self::Monthly => first + Months::new(1),
            Self::Yearly => first + Months::new(12),
        };
        Self::midnight(next)
    }

    fn first_day(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Daily => date,
            Self::Weekly => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Self::Monthly => date - Duration::days(i64::from(date.day0())),
            Self::Yearly => date - Duration::days(i64::from(date.ordinal0())),
        }
    }

    fn midnight(date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::MIN)
    }
}

impl fmt::Display for BucketSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BucketSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(format!("Invalid bucket size: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{at, at_hms};

    #[test]
    fn test_name_resolution() {
        assert_eq!(
            BucketSize::from_name_or_default(Some("weekly")),
            BucketSize::Weekly
        );
        assert_eq!(
            BucketSize::from_name_or_default(Some(" Monthly ")),
            BucketSize::Monthly
        );
        assert_eq!(
            BucketSize::from_name_or_default(Some("fortnightly")),
            BucketSize::Daily
        );
        assert_eq!(BucketSize::from_name_or_default(None), BucketSize::Daily);
        assert_eq!(BucketSize::Yearly.to_string(), "yearly");
    }

    #[test]
    fn test_daily() {
        let size = BucketSize::Daily;
        let d = at_hms(2024, 2, 28, 17, 45, 10);
        assert_eq!(size.start_of_bucket(d), at(2024, 2, 28));
        assert_eq!(size.next_bucket(d), at(2024, 2, 29));
        assert_eq!(size.next_bucket(at(2024, 2, 29)), at(2024, 3, 1));
        assert!(size.same_bucket(d, at(2024, 2, 28)));
        assert!(!size.same_bucket(d, at(2024, 2, 29)));
    }

    #[test]
    fn test_weekly_uses_iso_weeks() {
        let size = BucketSize::Weekly;
        // Monday 2024-12-30 opens ISO week 2025-W01
        assert!(size.same_bucket(at(2024, 12, 30), at(2025, 1, 2)));
        assert!(!size.same_bucket(at(2024, 12, 29), at(2025, 1, 2)));
        assert!(!size.same_bucket(at(2024, 12, 29), at(2024, 12, 30)));
    }

    #[test]
    fn test_weekly_boundaries() {
        let size = BucketSize::Weekly;
        // Sunday
        assert_eq!(size.start_of_bucket(at_hms(2024, 12, 29, 8, 0, 0)), at(2024, 12, 23));
        // Monday stays put
        assert_eq!(size.start_of_bucket(at_hms(2024, 12, 30, 8, 0, 0)), at(2024, 12, 30));
        assert_eq!(size.next_bucket(at(2024, 12, 30)), at(2025, 1, 6));
        // From mid-week the next boundary is the following Monday
        assert_eq!(size.next_bucket(at_hms(2025, 1, 2, 9, 30, 0)), at(2025, 1, 6));
        // From Sunday it is the very next day
        assert_eq!(size.next_bucket(at(2025, 1, 5)), at(2025, 1, 6));
    }

    #[test]
    fn test_monthly() {
        let size = BucketSize::Monthly;
        assert_eq!(size.start_of_bucket(at_hms(2024, 1, 31, 23, 59, 59)), at(2024, 1, 1));
        assert_eq!(size.next_bucket(at(2024, 1, 31)), at(2024, 2, 1));
        assert_eq!(size.next_bucket(at(2024, 12, 15)), at(2025, 1, 1));
        assert!(size.same_bucket(at(2024, 3, 1), at(2024, 3, 31)));
        assert!(!size.same_bucket(at(2024, 3, 1), at(2023, 3, 1)));
    }

    #[test]
    fn test_yearly() {
        let size = BucketSize::Yearly;
        assert_eq!(size.start_of_bucket(at(2024, 12, 31)), at(2024, 1, 1));
        assert_eq!(size.next_bucket(at(2024, 2, 29)), at(2025, 1, 1));
        assert!(size.same_bucket(at(2024, 1, 1), at(2024, 12, 31)));
        assert!(!size.same_bucket(at(2024, 12, 31), at(2025, 1, 1)));
    }

    #[test]
    fn test_bucket_contains_instant() {
        let instants = [
            at_hms(2024, 2, 29, 12, 0, 0),
            at(2023, 1, 1),
            at_hms(2020, 12, 31, 23, 59, 59),
            at_hms(2021, 1, 3, 1, 0, 0),
        ];
        for size in BucketSize::ALL {
            for d in instants {
                let start = size.start_of_bucket(d);
                assert!(start <= d, "{size}: {start} > {d}");
                assert!(d < size.next_bucket(start), "{size}: {d} not before next");
                assert!(size.same_bucket(d, d));
                assert!(size.same_bucket(start, d));
            }
        }
    }
}
