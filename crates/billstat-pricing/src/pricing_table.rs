//! Pricing table module
//!
//! The pricing table is parsed once and shared read-only between reports as an
//! `Arc<PricingTable>`. [`PricingLoader`] caches the parsed table and offers an
//! explicit [`refresh`](PricingLoader::refresh) to pick up a changed file.
//!
//! The file format is JSON:
//!
//! ```json
//! {
//!   "periods": [
//!     { "start": "2024-01-01", "end": "2025-01-01",
//!       "cpuRate": 0.03, "volumeRate": 0.0001, "imageRate": 0.0001 }
//!   ],
//!   "maxBuckets": 62
//! }
//! ```
//!
//! `maxBuckets` is optional and overrides the default bucket cap.

use crate::resolver::PricingCursor;
use billstat_core::dates::parse_report_date;
use billstat_core::error::{BillstatError, Result};
use billstat_core::types::Rates;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Embedded pricing data used when no pricing file is configured
const EMBEDDED_PRICING: &str = include_str!("../embedded/pricing.json");

/// A time range with fixed per-kind rates; `end` is exclusive
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPeriod {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(flatten)]
    pub rates: Rates,
}

impl PricingPeriod {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, rates: Rates) -> Self {
        Self { start, end, rates }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPricingFile {
    periods: Vec<RawPeriod>,
    #[serde(default)]
    max_buckets: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPeriod {
    start: String,
    end: String,
    cpu_rate: f64,
    volume_rate: f64,
    image_rate: f64,
}

impl RawPeriod {
    fn into_period(self) -> Result<PricingPeriod> {
        Ok(PricingPeriod {
            start: parse_report_date(&self.start)?,
            end: parse_report_date(&self.end)?,
            rates: Rates::new(self.cpu_rate, self.volume_rate, self.image_rate),
        })
    }
}

/// Validated, ordered list of pricing periods
///
/// Guaranteed non-empty, sorted by start, and free of overlaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingTable {
    periods: Vec<PricingPeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_buckets: Option<usize>,
}

impl PricingTable {
    /// Build a table from periods, validating them
    pub fn new(periods: Vec<PricingPeriod>) -> Result<Self> {
        if periods.is_empty() {
            return Err(BillstatError::Config(
                "pricing table must define at least one period".to_string(),
            ));
        }

        for period in &periods {
            if period.start >= period.end {
                return Err(BillstatError::Config(format!(
                    "pricing period starting {} does not end after it starts",
                    period.start
                )));
            }
            let rates = [
                period.rates.cpu_rate,
                period.rates.volume_rate,
                period.rates.image_rate,
            ];
            if rates.iter().any(|r| !r.is_finite() || *r < 0.0) {
                return Err(BillstatError::Config(format!(
                    "pricing period starting {} has a negative or non-finite rate",
                    period.start
                )));
            }
        }

        for pair in periods.windows(2) {
            let (previous, next) = (&pair[0], &pair[1]);
            if next.start < previous.end {
                return Err(BillstatError::Config(format!(
                    "pricing periods starting {} and {} overlap or are out of order",
                    previous.start, next.start
                )));
            }
            if next.start > previous.end {
                warn!(
                    "Gap in pricing periods between {} and {}; later rates apply",
                    previous.end, next.start
                );
            }
        }

        Ok(Self {
            periods,
            max_buckets: None,
        })
    }

    /// Set the bucket cap carried by this table
    pub fn with_max_buckets(mut self, max_buckets: usize) -> Result<Self> {
        if max_buckets == 0 {
            return Err(BillstatError::Config(
                "maxBuckets must be at least 1".to_string(),
            ));
        }
        self.max_buckets = Some(max_buckets);
        Ok(self)
    }

    /// Parse a table from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawPricingFile = serde_json::from_str(json)?;
        let periods = raw
            .periods
            .into_iter()
            .map(RawPeriod::into_period)
            .collect::<Result<Vec<_>>>()?;
        let table = Self::new(periods)?;
        match raw.max_buckets {
            Some(max) => table.with_max_buckets(max),
            None => Ok(table),
        }
    }

    /// The table compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_PRICING)
    }

    /// Periods in chronological order
    pub fn periods(&self) -> &[PricingPeriod] {
        &self.periods
    }

    /// Bucket cap configured alongside the periods, if any
    pub fn max_buckets(&self) -> Option<usize> {
        self.max_buckets
    }

    /// A fresh cursor positioned at the first period
    pub fn cursor(&self) -> PricingCursor<'_> {
        PricingCursor::new(&self.periods)
    }
}

/// Where the pricing table comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PricingSource {
    /// The table compiled into the binary
    Embedded,
    /// A JSON file on disk
    File(PathBuf),
}

/// Loads and caches the pricing table
pub struct PricingLoader {
    /// Cached table
    cache: Arc<RwLock<Option<Arc<PricingTable>>>>,
    source: PricingSource,
}

impl PricingLoader {
    /// Create a new PricingLoader
    pub fn new(source: PricingSource) -> Self {
        Self {
            cache: Arc::new(RwLock::new(None)),
            source,
        }
    }

    /// Where this loader reads from
    pub fn source(&self) -> &PricingSource {
        &self.source
    }

    /// Get the pricing table, loading it on first use
    pub async fn table(&self) -> Result<Arc<PricingTable>> {
        {
            let cache = self.cache.read().await;
            if let Some(table) = cache.as_ref() {
                return Ok(Arc::clone(table));
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(table) = cache.as_ref() {
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(self.load().await?);
        *cache = Some(Arc::clone(&table));
        Ok(table)
    }

    /// Discard the cached table and load it again
    ///
    /// On failure the previously cached table is kept.
    pub async fn refresh(&self) -> Result<Arc<PricingTable>> {
        let table = Arc::new(self.load().await?);
        let mut cache = self.cache.write().await;
        *cache = Some(Arc::clone(&table));
        Ok(table)
    }

    async fn load(&self) -> Result<PricingTable> {
        let table = match &self.source {
            PricingSource::Embedded => {
                info!("Using embedded pricing table");
                PricingTable::embedded()?
            }
            PricingSource::File(path) => {
                info!("Loading pricing table from {}", path.display());
                let content = tokio::fs::read_to_string(path).await?;
                PricingTable::from_json(&content).map_err(|e| BillstatError::Parse {
                    file: path.clone(),
                    error: e.to_string(),
                })?
            }
        };
        debug!("Loaded {} pricing periods", table.periods().len());
        Ok(table)
    }
}
