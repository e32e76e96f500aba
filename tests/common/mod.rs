//! Common test utilities and helpers for billstat tests
//!
//! This module provides reusable builders, a shared pricing table, on-disk
//! dataset fixtures and a store that always fails.

#![allow(dead_code)]

use async_trait::async_trait;
use billstat::{
    error::{BillstatError, Result},
    pricing_table::{PricingPeriod, PricingTable},
    provider::{RoleProvider, UsageQuery, UsageStore, UserDirectory},
    types::{ProjectId, Rates, RoleMap, UsageKind, UsageRecord, UserId},
};
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tempfile::TempDir;

/// Pricing with a change on 2024-01-17
pub static PRICING: Lazy<Arc<PricingTable>> = Lazy::new(|| {
    Arc::new(
        PricingTable::new(vec![
            PricingPeriod::new(at(2020, 1, 1), at(2024, 1, 17), Rates::new(0.12345, 0.5, 0.02)),
            PricingPeriod::new(at(2024, 1, 17), at(2030, 1, 1), Rates::new(0.2, 0.25, 0.04)),
        ])
        .unwrap(),
    )
});

/// Midnight on the given day
pub fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
    at_hms(year, month, day, 0, 0, 0)
}

pub fn at_hms(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, min, sec)
        .unwrap()
}

/// Role map from `(project, roles)` pairs
pub fn role_map(entries: &[(&str, &[&str])]) -> RoleMap {
    entries
        .iter()
        .map(|(project, roles)| {
            (
                ProjectId::new(*project),
                roles.iter().map(|r| r.to_string()).collect::<BTreeSet<_>>(),
            )
        })
        .collect()
}

/// Builder for creating test UsageRecord instances
pub struct UsageRecordBuilder {
    kind: UsageKind,
    user: Option<String>,
    project: String,
    quantity: f64,
    timestamp: NaiveDateTime,
}

impl UsageRecordBuilder {
    /// Create a new builder: one cpu hour for alice in p1 on 2024-01-01
    pub fn new() -> Self {
        Self {
            kind: UsageKind::Cpu,
            user: Some("alice".to_string()),
            project: "p1".to_string(),
            quantity: 1.0,
            timestamp: at_hms(2024, 1, 1, 12, 0, 0),
        }
    }

    pub fn with_kind(mut self, kind: UsageKind) -> Self {
        self.kind = kind;
        if kind == UsageKind::Image {
            self.user = None;
        }
        self
    }

    pub fn with_user(mut self, user: &str) -> Self {
        self.user = Some(user.to_string());
        self
    }

    pub fn with_project(mut self, project: &str) -> Self {
        self.project = project.to_string();
        self
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn build(self) -> UsageRecord {
        UsageRecord::new(
            self.kind,
            self.user.map(UserId::new),
            ProjectId::new(self.project),
            self.quantity,
            self.timestamp,
        )
    }
}

impl Default for UsageRecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes a dataset directory to a temp dir
pub struct DatasetBuilder {
    users: BTreeMap<String, String>,
    projects: BTreeMap<String, String>,
    roles: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    records: Vec<UsageRecord>,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self {
            users: BTreeMap::new(),
            projects: BTreeMap::new(),
            roles: BTreeMap::new(),
            records: Vec::new(),
        }
    }

    pub fn user(mut self, id: &str, name: &str) -> Self {
        self.users.insert(id.to_string(), name.to_string());
        self
    }

    pub fn project(mut self, id: &str, name: &str) -> Self {
        self.projects.insert(id.to_string(), name.to_string());
        self
    }

    pub fn role(mut self, user: &str, project: &str, role: &str) -> Self {
        self.roles
            .entry(user.to_string())
            .or_default()
            .entry(project.to_string())
            .or_default()
            .push(role.to_string());
        self
    }

    pub fn record(mut self, record: UsageRecord) -> Self {
        self.records.push(record);
        self
    }

    /// Write `directory.json` and one usage file per kind
    pub fn write(self) -> TempDir {
        let dir = TempDir::new().unwrap();
        let directory = json!({
            "users": self.users,
            "projects": self.projects,
            "roles": self.roles,
        });
        std::fs::write(
            dir.path().join("directory.json"),
            serde_json::to_string_pretty(&directory).unwrap(),
        )
        .unwrap();

        let usage_dir = dir.path().join("usage");
        std::fs::create_dir(&usage_dir).unwrap();
        for kind in UsageKind::ALL {
            let lines: Vec<String> = self
                .records
                .iter()
                .filter(|r| r.kind == kind)
                .map(|r| {
                    json!({
                        "kind": r.kind,
                        "user": r.user,
                        "projectId": r.project_id,
                        "quantity": r.quantity,
                        "timestamp": r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                    })
                    .to_string()
                })
                .collect();
            std::fs::write(usage_dir.join(format!("{kind}.jsonl")), lines.join("\n")).unwrap();
        }
        dir
    }
}

impl Default for DatasetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A backend whose usage queries always fail
pub struct FailingStore;

#[async_trait]
impl UsageStore for FailingStore {
    async fn compute_usage(&self, _query: &UsageQuery) -> Result<Vec<UsageRecord>> {
        Ok(Vec::new())
    }

    async fn volume_usage(&self, _query: &UsageQuery) -> Result<Vec<UsageRecord>> {
        Err(BillstatError::Store {
            store: "failing".to_string(),
            message: "volume table unavailable".to_string(),
        })
    }

    async fn image_usage(&self, _query: &UsageQuery) -> Result<Vec<UsageRecord>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl UserDirectory for FailingStore {
    async fn display_name(&self, _user: &UserId) -> Result<Option<String>> {
        Ok(None)
    }
}

#[async_trait]
impl RoleProvider for FailingStore {
    async fn roles_for(&self, _user: &UserId) -> Result<RoleMap> {
        Ok(role_map(&[("p1", &["billing"])]))
    }

    async fn project_name(&self, _project: &ProjectId) -> Result<Option<String>> {
        Ok(None)
    }
}
