//! Collaborator traits consumed by the report engine
//!
//! The engine never talks to a database directly. Usage rows, display names
//! and role maps come from implementations of the traits below; the
//! `billstat-store` crate ships a file-backed implementation of all three.

use crate::error::Result;
use crate::types::{ProjectId, RoleMap, UsageKind, UsageRecord, UserId};
use async_trait::async_trait;
use chrono::NaiveDateTime;

/// Range query against the usage store
///
/// A row qualifies when its timestamp lies in `[start, end)` and its project is
/// either in `billing_projects` (any user) or in `user_projects` with `user` as
/// its owner. Image usage has no user dimension and only reads
/// `billing_projects`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageQuery {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub billing_projects: Vec<ProjectId>,
    pub user_projects: Vec<ProjectId>,
    pub user: UserId,
}

impl UsageQuery {
    /// Whether `instant` lies within the query window
    pub fn covers(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Whether a row of `kind` for `project` owned by `user` is visible
    pub fn admits(&self, kind: UsageKind, project: &ProjectId, user: Option<&UserId>) -> bool {
        if self.billing_projects.contains(project) {
            return true;
        }
        kind.is_user_scoped() && user == Some(&self.user) && self.user_projects.contains(project)
    }
}

/// Read-only source of usage rows.
///
/// Implementations must be safe to query concurrently; the report builder
/// issues one set of queries per bucket in parallel.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Instance core hours within the query window
    async fn compute_usage(&self, query: &UsageQuery) -> Result<Vec<UsageRecord>>;

    /// Volume gigabyte hours within the query window
    async fn volume_usage(&self, query: &UsageQuery) -> Result<Vec<UsageRecord>>;

    /// Image storage gigabyte hours within the query window, per project
    async fn image_usage(&self, query: &UsageQuery) -> Result<Vec<UsageRecord>>;

    /// Dispatch to the query for `kind`
    async fn usage(&self, kind: UsageKind, query: &UsageQuery) -> Result<Vec<UsageRecord>> {
        match kind {
            UsageKind::Cpu => self.compute_usage(query).await,
            UsageKind::Volume => self.volume_usage(query).await,
            UsageKind::Image => self.image_usage(query).await,
        }
    }
}

/// Resolves user ids to display names
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn display_name(&self, user: &UserId) -> Result<Option<String>>;
}

/// Source of per-user project roles
#[async_trait]
pub trait RoleProvider: Send + Sync {
    /// Roles held by `user`, keyed by project
    async fn roles_for(&self, user: &UserId) -> Result<RoleMap>;

    /// Human-readable project name, if known
    async fn project_name(&self, project: &ProjectId) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::at;

    fn query() -> UsageQuery {
        UsageQuery {
            start: at(2024, 1, 1),
            end: at(2024, 1, 2),
            billing_projects: vec![ProjectId::new("billed")],
            user_projects: vec![ProjectId::new("own")],
            user: UserId::new("alice"),
        }
    }

    #[test]
    fn test_covers_is_half_open() {
        let q = query();
        assert!(q.covers(at(2024, 1, 1)));
        assert!(!q.covers(at(2024, 1, 2)));
    }

    #[test]
    fn test_billing_projects_admit_everyone() {
        let q = query();
        let billed = ProjectId::new("billed");
        assert!(q.admits(UsageKind::Cpu, &billed, Some(&UserId::new("bob"))));
        assert!(q.admits(UsageKind::Image, &billed, None));
    }

    #[test]
    fn test_user_projects_admit_only_the_user() {
        let q = query();
        let own = ProjectId::new("own");
        assert!(q.admits(UsageKind::Volume, &own, Some(&UserId::new("alice"))));
        assert!(!q.admits(UsageKind::Volume, &own, Some(&UserId::new("bob"))));
        assert!(!q.admits(UsageKind::Image, &own, None));
        assert!(!q.admits(UsageKind::Cpu, &ProjectId::new("other"), Some(&UserId::new("alice"))));
    }

    struct FixedStore;

    #[async_trait]
    impl UsageStore for FixedStore {
        async fn compute_usage(&self, query: &UsageQuery) -> Result<Vec<UsageRecord>> {
            Ok(vec![UsageRecord::new(
                UsageKind::Cpu,
                Some(query.user.clone()),
                ProjectId::new("own"),
                1.0,
                query.start,
            )])
        }

        async fn volume_usage(&self, _query: &UsageQuery) -> Result<Vec<UsageRecord>> {
            Ok(Vec::new())
        }

        async fn image_usage(&self, query: &UsageQuery) -> Result<Vec<UsageRecord>> {
            Ok(vec![UsageRecord::image(ProjectId::new("billed"), 2.0, query.start)])
        }
    }

    #[tokio::test]
    async fn test_usage_dispatches_by_kind() {
        let store = FixedStore;
        let q = query();
        assert_eq!(store.usage(UsageKind::Cpu, &q).await.unwrap().len(), 1);
        assert!(store.usage(UsageKind::Volume, &q).await.unwrap().is_empty());
        let images = store.usage(UsageKind::Image, &q).await.unwrap();
        assert_eq!(images[0].kind, UsageKind::Image);
    }
}
