//! Time bucketing module
//!
//! Divides a report range into calendar-aligned buckets, each tagged with the
//! rates in force at its start. A bucket ends at the earliest of the next
//! calendar boundary, the end of the active pricing period, and the end of
//! the range, so no bucket ever straddles a price change.
//!
//! # Examples
//!
//! ```
//! use billstat::bucketing::TimeBucketer;
//! use billstat::pricing_table::{PricingPeriod, PricingTable};
//! use billstat::types::Rates;
//! use chrono::NaiveDate;
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let table = PricingTable::new(vec![
//!     PricingPeriod::new(day(1), day(31), Rates::new(0.1, 0.2, 0.02)),
//! ]).unwrap();
//!
//! let plan = TimeBucketer::new(&table).divide_range(day(1), day(3), Some("daily")).unwrap();
//! assert_eq!(plan.buckets.len(), 2);
//! assert_eq!(plan.buckets[1].end, day(3));
//! ```

use billstat_core::error::{BillstatError, Result};
use billstat_core::granularity::BucketSize;
use billstat_core::types::Bucket;
use billstat_pricing::PricingTable;
use chrono::NaiveDateTime;
use std::collections::VecDeque;
use tracing::debug;

/// Most buckets a single report returns
pub const DEFAULT_MAX_BUCKETS: usize = 62;

/// Result of dividing a range
#[derive(Debug, Clone, PartialEq)]
pub struct BucketPlan {
    /// Buckets in chronological order, oldest evicted first when over the cap
    pub buckets: Vec<Bucket>,
    /// Granularity actually used
    pub bucket_size: BucketSize,
    /// How many leading buckets were dropped to respect the cap
    pub evicted: usize,
}

/// Splits date ranges into rate-tagged buckets
pub struct TimeBucketer<'a> {
    pricing: &'a PricingTable,
    max_buckets: usize,
}

impl<'a> TimeBucketer<'a> {
    /// Create a bucketer with the default cap
    pub fn new(pricing: &'a PricingTable) -> Self {
        Self {
            pricing,
            max_buckets: DEFAULT_MAX_BUCKETS,
        }
    }

    /// Set the bucket cap; values below one are raised to one
    pub fn with_max_buckets(mut self, max_buckets: usize) -> Self {
        self.max_buckets = max_buckets.max(1);
        self
    }

    /// Divide `[start, end)` using a granularity name
    ///
    /// Unknown or missing names fall back to daily.
    pub fn divide_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        bucket_name: Option<&str>,
    ) -> Result<BucketPlan> {
        self.divide_range_with(start, end, BucketSize::from_name_or_default(bucket_name))
    }

    /// Divide `[start, end)` at a known granularity
    ///
    /// The whole range is always walked, even when early buckets end up
    /// evicted, so the pricing cursor sees every instant in order.
    pub fn divide_range_with(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        bucket_size: BucketSize,
    ) -> Result<BucketPlan> {
        if start > end {
            return Err(BillstatError::InvalidDateRange {
                from: start,
                to: end,
            });
        }

        let mut cursor = self.pricing.cursor();
        let mut buckets = VecDeque::new();
        let mut evicted = 0;
        let mut current = start;

        while current < end {
            let period = cursor.active_period(current);

            let mut bucket_end = bucket_size.next_bucket(current).min(end);
            // An ended period is only returned once the table is exhausted
            if period.end > current {
                bucket_end = bucket_end.min(period.end);
            }

            buckets.push_back(Bucket {
                start: current,
                end: bucket_end,
                rates: period.rates,
            });
            if buckets.len() > self.max_buckets {
                buckets.pop_front();
                evicted += 1;
            }

            current = bucket_end;
        }

        if evicted > 0 {
            debug!(
                "Evicted {} oldest buckets to stay within {}",
                evicted, self.max_buckets
            );
        }
        debug!(
            "Divided {}..{} into {} {} buckets",
            start,
            end,
            buckets.len(),
            bucket_size
        );

        Ok(BucketPlan {
            buckets: buckets.into(),
            bucket_size,
            evicted,
        })
    }
}
