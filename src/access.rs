//! Access scope resolution
//!
//! Decides whose usage a caller may see in which projects. Projects where the
//! caller holds the `billing` role are *billing scoped*: every user's usage
//! is visible. Projects where the caller holds any other role are *self
//! scoped*: only one user's usage is visible. Projects the caller has no role
//! in are dropped.
//!
//! Viewing a specific user narrows the scopes further:
//!
//! - viewing yourself turns every project into a self-scoped one
//! - viewing someone else is only possible through billing-scoped projects,
//!   which become self-scoped for that user; the caller's other projects are
//!   left out

use crate::provider::UsageQuery;
use crate::types::{BILLING_ROLE, ProjectId, RoleMap, UserId};
use chrono::NaiveDateTime;
use tracing::debug;

/// Projects and user a report is allowed to read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessScope {
    /// Projects where every user's usage is visible
    pub billing_projects: Vec<ProjectId>,
    /// Projects where only `effective_user`'s usage is visible
    pub user_projects: Vec<ProjectId>,
    /// User whose usage is read in `user_projects`
    pub effective_user: UserId,
}

impl AccessScope {
    /// Whether the scope can see anything at all
    pub fn is_empty(&self) -> bool {
        self.billing_projects.is_empty() && self.user_projects.is_empty()
    }

    /// Usage store query for `[start, end)` under this scope
    pub fn query(&self, start: NaiveDateTime, end: NaiveDateTime) -> UsageQuery {
        UsageQuery {
            start,
            end,
            billing_projects: self.billing_projects.clone(),
            user_projects: self.user_projects.clone(),
            user: self.effective_user.clone(),
        }
    }
}

/// Resolves an [`AccessScope`] from a caller's roles
pub struct AccessScopeResolver<'a> {
    roles: &'a RoleMap,
    caller: &'a UserId,
}

impl<'a> AccessScopeResolver<'a> {
    pub fn new(roles: &'a RoleMap, caller: &'a UserId) -> Self {
        Self { roles, caller }
    }

    /// Resolve the scope for a request
    ///
    /// Without a project filter every project in the role map is requested.
    pub fn resolve(
        &self,
        project_filter: Option<&[ProjectId]>,
        viewing_user: Option<&UserId>,
    ) -> AccessScope {
        let requested: Vec<&ProjectId> = match project_filter {
            Some(filter) => filter.iter().collect(),
            None => self.roles.keys().collect(),
        };

        let mut billing_projects = Vec::new();
        let mut user_projects = Vec::new();
        for project in requested {
            if billing_projects.contains(project) || user_projects.contains(project) {
                continue;
            }
            match self.roles.get(project) {
                Some(roles) if roles.contains(BILLING_ROLE) => billing_projects.push(project.clone()),
                Some(roles) if !roles.is_empty() => user_projects.push(project.clone()),
                _ => debug!("Caller {} has no role in project {}, skipping", self.caller, project),
            }
        }

        let effective_user = match viewing_user {
            Some(user) if user == self.caller => {
                user_projects.append(&mut billing_projects);
                user.clone()
            }
            Some(user) => {
                if !user_projects.is_empty() {
                    debug!(
                        "Excluding {} non-billing projects while viewing user {}",
                        user_projects.len(),
                        user
                    );
                }
                user_projects = std::mem::take(&mut billing_projects);
                user.clone()
            }
            None => self.caller.clone(),
        };

        AccessScope {
            billing_projects,
            user_projects,
            effective_user,
        }
    }
}

/// Parse a comma-separated project filter
///
/// Blank items are ignored; a filter with no items at all yields `None`.
pub fn parse_project_filter(filter: &str) -> Option<Vec<ProjectId>> {
    let projects: Vec<ProjectId> = filter
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(ProjectId::new)
        .collect();
    (!projects.is_empty()).then_some(projects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn roles() -> RoleMap {
        let mut map = RoleMap::new();
        map.insert(
            ProjectId::new("billed"),
            BTreeSet::from(["billing".to_string(), "member".to_string()]),
        );
        map.insert(ProjectId::new("member"), BTreeSet::from(["member".to_string()]));
        map.insert(ProjectId::new("empty"), BTreeSet::new());
        map
    }

    fn ids(names: &[&str]) -> Vec<ProjectId> {
        names.iter().map(|n| ProjectId::new(*n)).collect()
    }

    #[test]
    fn test_partition_without_viewing_user() {
        let roles = roles();
        let caller = UserId::new("alice");
        let scope = AccessScopeResolver::new(&roles, &caller).resolve(None, None);

        assert_eq!(scope.billing_projects, ids(&["billed"]));
        assert_eq!(scope.user_projects, ids(&["member"]));
        assert_eq!(scope.effective_user, caller);
    }

    #[test]
    fn test_unknown_projects_are_dropped() {
        let roles = roles();
        let caller = UserId::new("alice");
        let filter = ids(&["stranger", "member", "member"]);
        let scope = AccessScopeResolver::new(&roles, &caller).resolve(Some(&filter), None);

        assert!(scope.billing_projects.is_empty());
        assert_eq!(scope.user_projects, ids(&["member"]));
    }

    #[test]
    fn test_viewing_self_merges_billing_into_user_projects() {
        let roles = roles();
        let caller = UserId::new("alice");
        let scope = AccessScopeResolver::new(&roles, &caller).resolve(None, Some(&caller));

        assert!(scope.billing_projects.is_empty());
        assert_eq!(scope.user_projects, ids(&["member", "billed"]));
        assert_eq!(scope.effective_user, caller);
    }

    #[test]
    fn test_viewing_other_user_uses_billing_projects_only() {
        let roles = roles();
        let caller = UserId::new("alice");
        let bob = UserId::new("bob");
        let scope = AccessScopeResolver::new(&roles, &caller).resolve(None, Some(&bob));

        assert!(scope.billing_projects.is_empty());
        assert_eq!(scope.user_projects, ids(&["billed"]));
        assert_eq!(scope.effective_user, bob);
    }

    #[test]
    fn test_viewing_other_user_without_billing_sees_nothing() {
        let roles = roles();
        let caller = UserId::new("alice");
        let filter = ids(&["member"]);
        let scope = AccessScopeResolver::new(&roles, &caller)
            .resolve(Some(&filter), Some(&UserId::new("bob")));
        assert!(scope.is_empty());
    }

    #[test]
    fn test_query_carries_scope() {
        let roles = roles();
        let caller = UserId::new("alice");
        let scope = AccessScopeResolver::new(&roles, &caller).resolve(None, None);
        let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let query = scope.query(start, start + chrono::Duration::days(1));
        assert_eq!(query.billing_projects, scope.billing_projects);
        assert_eq!(query.user, caller);
    }

    #[test]
    fn test_parse_project_filter() {
        assert_eq!(parse_project_filter("a, b,,c "), Some(ids(&["a", "b", "c"])));
        assert_eq!(parse_project_filter(" , "), None);
        assert_eq!(parse_project_filter(""), None);
    }
}
