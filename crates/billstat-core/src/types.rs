//! Core domain types for billstat
//!
//! This module contains the fundamental types used throughout the billstat library:
//! strongly-typed identifiers, usage kinds, rate snapshots, buckets and the usage
//! rows exchanged with a [`UsageStore`](crate::provider::UsageStore).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Role name that grants visibility into every user's usage within a project
pub const BILLING_ROLE: &str = "billing";

/// Strongly-typed user identifier
///
/// # Examples
/// ```
/// use billstat_core::types::UserId;
///
/// let user = UserId::new("3f2a9c");
/// assert_eq!(user.as_str(), "3f2a9c");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a new UserId from any string-like type
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Strongly-typed project (tenant) identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    /// Create a new ProjectId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ProjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Roles a user holds, per project
pub type RoleMap = BTreeMap<ProjectId, BTreeSet<String>>;

/// Kind of metered resource
///
/// The declaration order is the canonical fetch order within a bucket.
///
/// # Examples
/// ```
/// use billstat_core::types::UsageKind;
///
/// assert_eq!("volume".parse::<UsageKind>().unwrap(), UsageKind::Volume);
/// assert_eq!(UsageKind::Image.to_string(), "image");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageKind {
    /// Instance core hours
    Cpu,
    /// Volume gigabyte hours
    Volume,
    /// Image storage gigabyte hours, tracked per project only
    Image,
}

impl UsageKind {
    /// All kinds, in canonical order
    pub const ALL: [UsageKind; 3] = [UsageKind::Cpu, UsageKind::Volume, UsageKind::Image];

    /// Lowercase name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Volume => "volume",
            Self::Image => "image",
        }
    }

    /// Whether usage of this kind is attributed to individual users
    pub fn is_user_scoped(&self) -> bool {
        !matches!(self, Self::Image)
    }
}

impl fmt::Display for UsageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UsageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "volume" => Ok(Self::Volume),
            "image" => Ok(Self::Image),
            _ => Err(format!("Invalid usage kind: {s}")),
        }
    }
}

/// Per-kind unit rates in force for some stretch of time
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rates {
    /// Price per core hour
    pub cpu_rate: f64,
    /// Price per volume gigabyte hour
    pub volume_rate: f64,
    /// Price per image gigabyte hour
    pub image_rate: f64,
}

impl Rates {
    /// Create a new rate snapshot
    pub fn new(cpu_rate: f64, volume_rate: f64, image_rate: f64) -> Self {
        Self {
            cpu_rate,
            volume_rate,
            image_rate,
        }
    }

    /// Rate applying to the given kind
    pub fn for_kind(&self, kind: UsageKind) -> f64 {
        match kind {
            UsageKind::Cpu => self.cpu_rate,
            UsageKind::Volume => self.volume_rate,
            UsageKind::Image => self.image_rate,
        }
    }
}

/// A reporting window with one pricing snapshot
///
/// `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(flatten)]
    pub rates: Rates,
}

/// Usage row returned by a usage store query
///
/// # Examples
/// ```
/// use billstat_core::types::{ProjectId, UsageKind, UsageRecord, UserId};
/// use chrono::NaiveDate;
///
/// let ts = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(10, 0, 0).unwrap();
/// let record = UsageRecord::new(UsageKind::Cpu, Some(UserId::new("u1")), ProjectId::new("p1"), 2.5, ts);
/// assert!(record.user.is_some());
///
/// let image = UsageRecord::image(ProjectId::new("p1"), 5.0, ts);
/// assert!(image.user.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    /// User the usage belongs to; absent for image usage
    #[serde(default)]
    pub user: Option<UserId>,
    /// Project the usage was billed to
    pub project_id: ProjectId,
    /// Metered quantity (hours, gigabyte hours)
    pub quantity: f64,
    /// When the usage was recorded
    pub timestamp: NaiveDateTime,
    /// What was metered
    pub kind: UsageKind,
}

impl UsageRecord {
    /// Create a usage record
    pub fn new(
        kind: UsageKind,
        user: Option<UserId>,
        project_id: ProjectId,
        quantity: f64,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            user,
            project_id,
            quantity,
            timestamp,
            kind,
        }
    }

    /// Create an image storage record, which never carries a user
    pub fn image(project_id: ProjectId, quantity: f64, timestamp: NaiveDateTime) -> Self {
        Self::new(UsageKind::Image, None, project_id, quantity, timestamp)
    }
}

/// A usage record annotated with the bucket it was fetched for
#[derive(Debug, Clone, PartialEq)]
pub struct PricedRecord {
    /// The raw record
    pub record: UsageRecord,
    /// Start of the bucket the record was fetched for
    pub from_date: NaiveDateTime,
    /// End of the bucket the record was fetched for
    pub to_date: NaiveDateTime,
    /// Unit rate for the record's kind in that bucket
    pub rate: f64,
    /// Display name of the record's user, if known
    pub username: Option<String>,
}

impl PricedRecord {
    /// Annotate a record with its bucket and the bucket's rate for its kind
    pub fn new(record: UsageRecord, bucket: &Bucket, username: Option<String>) -> Self {
        let rate = bucket.rates.for_kind(record.kind);
        Self {
            record,
            from_date: bucket.start,
            to_date: bucket.end,
            rate,
            username,
        }
    }
}
