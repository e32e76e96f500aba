//! Core types, traits, and utilities for billstat
//!
//! This crate provides the foundational types, error handling, the
//! calendar granularity strategy and the collaborator traits used by
//! all other billstat crates.

pub mod aggregation_types;
pub mod dates;
pub mod error;
pub mod granularity;
pub mod provider;
pub mod types;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use error::{BillstatError, Result};
pub use granularity::BucketSize;
pub use types::{Bucket, ProjectId, Rates, RoleMap, UsageKind, UsageRecord, UserId};
