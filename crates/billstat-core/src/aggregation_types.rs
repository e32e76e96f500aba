//! Aggregation data types for billstat
//!
//! Pure data structures making up a cost report. These types have no
//! dependencies on pricing or storage.

use crate::granularity::BucketSize;
use crate::types::{ProjectId, UsageKind, UserId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Aggregated usage of one user (or one project, for images) in one bucket
///
/// Quantity and cost fields are present only for kinds that occurred. The
/// window is always the full calendar bucket, never a record's own window.
///
/// # Examples
/// ```
/// use billstat_core::aggregation_types::AggregateEntry;
/// use billstat_core::types::{ProjectId, UsageKind};
/// use chrono::NaiveDate;
///
/// let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let mut entry = AggregateEntry::new(day, day + chrono::Duration::days(1), None, None, ProjectId::new("p1"));
/// entry.add_usage(UsageKind::Image, 5.0, 0.1);
///
/// let json = serde_json::to_value(&entry).unwrap();
/// assert_eq!(json["image"], 5.0);
/// assert_eq!(json["imageCost"], 0.1);
/// assert!(json["user"].is_null());
/// assert!(json.get("cpu").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateEntry {
    /// Start of the calendar bucket
    pub from_date: NaiveDateTime,
    /// End of the calendar bucket (exclusive)
    pub to_date: NaiveDateTime,
    /// Owner of the usage; `None` for per-project image usage
    pub user: Option<UserId>,
    /// Display name of the owner
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub username: Option<String>,
    /// Project the usage was billed to
    pub project_id: ProjectId,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cpu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cpu_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub volume_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_cost: Option<f64>,
}

impl AggregateEntry {
    /// Create an entry with no usage yet
    pub fn new(
        from_date: NaiveDateTime,
        to_date: NaiveDateTime,
        user: Option<UserId>,
        username: Option<String>,
        project_id: ProjectId,
    ) -> Self {
        Self {
            from_date,
            to_date,
            user,
            username,
            project_id,
            cpu: None,
            cpu_cost: None,
            volume: None,
            volume_cost: None,
            image: None,
            image_cost: None,
        }
    }

    /// Accumulated quantity of `kind`, if any occurred
    pub fn quantity(&self, kind: UsageKind) -> Option<f64> {
        match kind {
            UsageKind::Cpu => self.cpu,
            UsageKind::Volume => self.volume,
            UsageKind::Image => self.image,
        }
    }

    /// Accumulated cost of `kind`, if any occurred
    pub fn cost(&self, kind: UsageKind) -> Option<f64> {
        match kind {
            UsageKind::Cpu => self.cpu_cost,
            UsageKind::Volume => self.volume_cost,
            UsageKind::Image => self.image_cost,
        }
    }

    /// Sum of all per-kind costs
    pub fn total_cost(&self) -> f64 {
        UsageKind::ALL
            .iter()
            .filter_map(|kind| self.cost(*kind))
            .sum()
    }

    /// Add usage of `kind`; `cost` is the already-rounded cost of this increment
    pub fn add_usage(&mut self, kind: UsageKind, quantity: f64, cost: f64) {
        let (total_quantity, total_cost) = match kind {
            UsageKind::Cpu => (&mut self.cpu, &mut self.cpu_cost),
            UsageKind::Volume => (&mut self.volume, &mut self.volume_cost),
            UsageKind::Image => (&mut self.image, &mut self.image_cost),
        };
        *total_quantity = Some(total_quantity.unwrap_or(0.0) + quantity);
        *total_cost = Some(total_cost.unwrap_or(0.0) + cost);
    }
}

/// A bucketed cost report
///
/// The range dates serialize space separated (`2024-01-01 00:00:00`); entry
/// windows use the `T` separator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Requested start of the range
    #[serde(with = "crate::dates::space_separated")]
    pub from_date: NaiveDateTime,
    /// Requested end of the range
    #[serde(with = "crate::dates::space_separated")]
    pub to_date: NaiveDateTime,
    /// Granularity actually used
    pub bucket: BucketSize,
    /// Aggregated entries in discovery order
    pub entries: Vec<AggregateEntry>,
}

/// A project visible to a caller, with the caller's roles in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: ProjectId,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    pub roles: Vec<String>,
}

/// Calculate totals from aggregated data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub cpu: f64,
    pub cpu_cost: f64,
    pub volume: f64,
    pub volume_cost: f64,
    pub image: f64,
    pub image_cost: f64,
}

impl Totals {
    pub fn from_entries(entries: &[AggregateEntry]) -> Self {
        let mut totals = Self::default();
        for entry in entries {
            for kind in UsageKind::ALL {
                let quantity = entry.quantity(kind).unwrap_or(0.0);
                let cost = entry.cost(kind).unwrap_or(0.0);
                let (total_quantity, total_cost) = match kind {
                    UsageKind::Cpu => (&mut totals.cpu, &mut totals.cpu_cost),
                    UsageKind::Volume => (&mut totals.volume, &mut totals.volume_cost),
                    UsageKind::Image => (&mut totals.image, &mut totals.image_cost),
                };
                *total_quantity += quantity;
                *total_cost += cost;
            }
        }
        totals
    }

    pub fn total_cost(&self) -> f64 {
        self.cpu_cost + self.volume_cost + self.image_cost
    }
}
