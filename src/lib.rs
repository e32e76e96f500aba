//! billstat - Bucketed cost reports over cloud resource usage
//!
//! This library provides functionality to:
//! - Divide a date range into calendar-aligned buckets that respect price changes
//! - Decide which projects and users a caller may see from their roles
//! - Merge raw usage rows into per-bucket, per-user cost entries
//! - Render reports as tables or JSON
//!
//! # Examples
//!
//! ```no_run
//! use billstat::{
//!     pricing_table::PricingLoader,
//!     pricing_table::PricingSource,
//!     report::{ReportBuilder, ReportRequest},
//!     types::UserId,
//! };
//! use billstat_store::DatasetStore;
//! use chrono::NaiveDate;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> billstat::Result<()> {
//!     let dataset = Arc::new(DatasetStore::load(DatasetStore::default_dir()?).await?);
//!     let pricing = PricingLoader::new(PricingSource::Embedded).table().await?;
//!     let builder = ReportBuilder::with_backend(dataset, pricing);
//!
//!     let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap();
//!     let request = ReportRequest::new(day(1), day(31), UserId::new("alice")).with_bucket("weekly");
//!     let report = builder.generate_for_caller(&request).await?;
//!     println!("{} entries", report.entries.len());
//!
//!     Ok(())
//! }
//! ```

pub mod access;
pub mod aggregation;
pub mod bucketing;
pub mod cli;
pub mod output;
pub mod report;

// Modules from the workspace crates, re-exported so paths stay short
pub use billstat_core::{aggregation_types, dates, error, granularity, provider, types};
pub use billstat_pricing::{cost_calculator, pricing_table, resolver};

// Re-export commonly used types
pub use error::{BillstatError, Result};
pub use granularity::BucketSize;
pub use types::{Bucket, ProjectId, Rates, UsageKind, UsageRecord, UserId};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
