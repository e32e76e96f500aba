//! Aggregation module for merging priced usage records
//!
//! Records arrive in discovery order (bucket by bucket, cpu then volume then
//! image within a bucket) and are folded into one [`AggregateEntry`] per
//! user, project and calendar bucket. Entries keep the order in which they
//! were first created.
//!
//! Costs are accumulated from rounded increments: each record contributes
//! `round(quantity * rate, 4)`, so totals may differ from rounding once at
//! the end.
//!
//! # Merge strategies
//!
//! - [`MergeStrategy::LinearScan`] searches existing entries front to back for
//!   the first one with the same user, project and bucket.
//! - [`MergeStrategy::Keyed`] looks entries up by `(user, project, bucket
//!   start)` in a hash map.
//!
//! Both produce the same entries in the same order.
//!
//! # Examples
//!
//! ```
//! use billstat::aggregation::{MergeStrategy, RecordAggregator};
//! use billstat::granularity::BucketSize;
//! use billstat::types::{Bucket, PricedRecord, ProjectId, Rates, UsageRecord};
//! use chrono::NaiveDate;
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let bucket = Bucket { start: day(1), end: day(2), rates: Rates::new(0.1, 0.2, 0.02) };
//! let record = UsageRecord::image(ProjectId::new("p1"), 5.0, day(1));
//!
//! let mut aggregator = RecordAggregator::new(BucketSize::Daily).with_strategy(MergeStrategy::Keyed);
//! aggregator.add_record(&PricedRecord::new(record, &bucket, None));
//!
//! let entries = aggregator.into_entries();
//! assert_eq!(entries[0].image, Some(5.0));
//! assert_eq!(entries[0].image_cost, Some(0.1));
//! ```

use crate::aggregation_types::AggregateEntry;
use crate::cost_calculator::CostCalculator;
use crate::granularity::BucketSize;
use crate::types::{PricedRecord, ProjectId, UserId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::trace;

/// How records find the entry they merge into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeStrategy {
    /// Scan existing entries in creation order
    #[default]
    LinearScan,
    /// Hash lookup on user, project and bucket start
    Keyed,
}

type EntryKey = (Option<UserId>, ProjectId, NaiveDateTime);

/// Folds priced records into aggregate entries
///
/// An aggregator is bound to one granularity for its whole lifetime.
pub struct RecordAggregator {
    bucket_size: BucketSize,
    strategy: MergeStrategy,
    entries: Vec<AggregateEntry>,
    index: HashMap<EntryKey, usize>,
}

impl RecordAggregator {
    /// Create an empty aggregator using linear scan
    pub fn new(bucket_size: BucketSize) -> Self {
        Self {
            bucket_size,
            strategy: MergeStrategy::default(),
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Choose the merge strategy
    pub fn with_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn bucket_size(&self) -> BucketSize {
        self.bucket_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge one record
    pub fn add_record(&mut self, priced: &PricedRecord) {
        let record = &priced.record;
        let cost = CostCalculator::calculate(record.quantity, priced.rate);

        if let Some(position) = self.find(priced) {
            self.entries[position].add_usage(record.kind, record.quantity, cost);
            return;
        }

        let from_date = self.bucket_size.start_of_bucket(priced.from_date);
        let to_date = self.bucket_size.next_bucket(from_date);
        let username = if record.user.is_some() {
            priced.username.clone()
        } else {
            None
        };

        let mut entry = AggregateEntry::new(
            from_date,
            to_date,
            record.user.clone(),
            username,
            record.project_id.clone(),
        );
        entry.add_usage(record.kind, record.quantity, cost);
        trace!(
            "New entry for {:?} in {} at {}",
            record.user, record.project_id, from_date
        );

        if self.strategy == MergeStrategy::Keyed {
            self.index.insert(
                (record.user.clone(), record.project_id.clone(), from_date),
                self.entries.len(),
            );
        }
        self.entries.push(entry);
    }

    /// Merge records in order
    pub fn extend<'r>(&mut self, records: impl IntoIterator<Item = &'r PricedRecord>) {
        for record in records {
            self.add_record(record);
        }
    }

    /// Finished entries in creation order
    pub fn into_entries(self) -> Vec<AggregateEntry> {
        self.entries
    }

    /// Aggregate a slice of records in one go
    pub fn aggregate(
        bucket_size: BucketSize,
        strategy: MergeStrategy,
        records: &[PricedRecord],
    ) -> Vec<AggregateEntry> {
        let mut aggregator = Self::new(bucket_size).with_strategy(strategy);
        aggregator.extend(records);
        aggregator.into_entries()
    }

    fn find(&self, priced: &PricedRecord) -> Option<usize> {
        let record = &priced.record;
        match self.strategy {
            MergeStrategy::LinearScan => self.entries.iter().position(|entry| {
                entry.user == record.user
                    && entry.project_id == record.project_id
                    && self.bucket_size.same_bucket(entry.from_date, priced.from_date)
            }),
            MergeStrategy::Keyed => {
                let key = (
                    record.user.clone(),
                    record.project_id.clone(),
                    self.bucket_size.start_of_bucket(priced.from_date),
                );
                self.index.get(&key).copied()
            }
        }
    }
}
