//! Report generation
//!
//! [`ReportBuilder`] ties the pieces together for one request:
//!
//! 1. resolve the caller's [`AccessScope`] from their roles
//! 2. divide the requested range into rate-tagged buckets
//! 3. fetch cpu, volume and image usage for every bucket concurrently
//! 4. annotate each record with its bucket, rate and owner's display name
//! 5. merge the records into aggregate entries
//!
//! Any failed fetch fails the whole report.
//!
//! # Examples
//!
//! ```no_run
//! use billstat::report::{ReportBuilder, ReportParams, ReportRequest};
//! use billstat::pricing_table::PricingTable;
//! use billstat::types::UserId;
//! use billstat_store::DatasetStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> billstat::Result<()> {
//! let dataset = Arc::new(DatasetStore::load("/var/lib/billstat").await?);
//! let pricing = Arc::new(PricingTable::embedded()?);
//! let builder = ReportBuilder::with_backend(dataset, pricing);
//!
//! let params = ReportParams {
//!     from_date: Some("2024-01-01".to_string()),
//!     bucket: Some("weekly".to_string()),
//!     ..Default::default()
//! };
//! let now = chrono::Local::now().naive_local();
//! let request = ReportRequest::from_params(&params, UserId::new("alice"), now)?;
//! let report = builder.generate_for_caller(&request).await?;
//! println!("{} entries", report.entries.len());
//! # Ok(())
//! # }
//! ```

use crate::access::{AccessScope, AccessScopeResolver, parse_project_filter};
use crate::aggregation::{MergeStrategy, RecordAggregator};
use crate::aggregation_types::{ProjectSummary, Report};
use crate::bucketing::{DEFAULT_MAX_BUCKETS, TimeBucketer};
use crate::dates::{parse_report_date, start_of_month};
use crate::error::{BillstatError, Result};
use crate::provider::{RoleProvider, UsageStore, UserDirectory};
use crate::types::{Bucket, PricedRecord, ProjectId, RoleMap, UsageKind, UserId};
use billstat_pricing::PricingTable;
use chrono::NaiveDateTime;
use futures::future::try_join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Tunables shared by every report a builder produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSettings {
    /// Most buckets returned per report; older buckets are evicted first
    pub max_buckets: usize,
    /// How records are matched to existing entries
    pub merge_strategy: MergeStrategy,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            max_buckets: DEFAULT_MAX_BUCKETS,
            merge_strategy: MergeStrategy::default(),
        }
    }
}

/// Raw, unvalidated report parameters as received from a caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportParams {
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub bucket: Option<String>,
    /// Comma-separated project ids
    pub projects: Option<String>,
    pub user: Option<String>,
}

/// A validated report request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub from_date: NaiveDateTime,
    pub to_date: NaiveDateTime,
    /// Requested granularity name; unknown names mean daily
    pub bucket: Option<String>,
    /// Projects to report on; `None` means all of the caller's projects
    pub projects: Option<Vec<ProjectId>>,
    /// Restrict the report to one user's usage
    pub viewing_user: Option<UserId>,
    /// Who is asking
    pub caller: UserId,
}

impl ReportRequest {
    pub fn new(from_date: NaiveDateTime, to_date: NaiveDateTime, caller: UserId) -> Self {
        Self {
            from_date,
            to_date,
            bucket: None,
            projects: None,
            viewing_user: None,
            caller,
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn with_projects(mut self, projects: Vec<ProjectId>) -> Self {
        self.projects = Some(projects);
        self
    }

    pub fn with_viewing_user(mut self, user: UserId) -> Self {
        self.viewing_user = Some(user);
        self
    }

    /// Validate raw parameters
    ///
    /// A missing start defaults to the first day of `now`'s month and a
    /// missing end to `now`. Dates are parsed before anything else happens,
    /// and a range ending before it starts is rejected.
    pub fn from_params(params: &ReportParams, caller: UserId, now: NaiveDateTime) -> Result<Self> {
        let from_date = match params.from_date.as_deref() {
            Some(from) => parse_report_date(from)?,
            None => start_of_month(now),
        };
        let to_date = match params.to_date.as_deref() {
            Some(to) => parse_report_date(to)?,
            None => now,
        };
        if from_date > to_date {
            return Err(BillstatError::InvalidDateRange {
                from: from_date,
                to: to_date,
            });
        }

        let viewing_user = params
            .user
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(UserId::new);

        Ok(Self {
            from_date,
            to_date,
            bucket: params.bucket.clone(),
            projects: params.projects.as_deref().and_then(parse_project_filter),
            viewing_user,
            caller,
        })
    }
}

/// Builds cost reports from usage collaborators and a pricing table
pub struct ReportBuilder {
    store: Arc<dyn UsageStore>,
    directory: Arc<dyn UserDirectory>,
    roles: Arc<dyn RoleProvider>,
    pricing: Arc<PricingTable>,
    settings: ReportSettings,
    show_progress: bool,
}

impl ReportBuilder {
    /// Create a builder from separate collaborators
    pub fn new(
        store: Arc<dyn UsageStore>,
        directory: Arc<dyn UserDirectory>,
        roles: Arc<dyn RoleProvider>,
        pricing: Arc<PricingTable>,
    ) -> Self {
        Self {
            store,
            directory,
            roles,
            pricing,
            settings: ReportSettings::default(),
            show_progress: false,
        }
    }

    /// Create a builder from one backend serving all three collaborator roles
    pub fn with_backend<B>(backend: Arc<B>, pricing: Arc<PricingTable>) -> Self
    where
        B: UsageStore + UserDirectory + RoleProvider + 'static,
    {
        Self::new(backend.clone(), backend.clone(), backend, pricing)
    }

    pub fn with_settings(mut self, settings: ReportSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the pricing table used by later reports
    pub fn with_pricing(mut self, pricing: Arc<PricingTable>) -> Self {
        self.pricing = pricing;
        self
    }

    /// Enable or disable the progress spinner
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    pub fn pricing(&self) -> &Arc<PricingTable> {
        &self.pricing
    }

    /// Generate a report, looking up the caller's roles first
    pub async fn generate_for_caller(&self, request: &ReportRequest) -> Result<Report> {
        let roles = self.roles.roles_for(&request.caller).await?;
        self.generate_report(request, &roles).await
    }

    /// Generate a report for a caller holding `roles`
    pub async fn generate_report(&self, request: &ReportRequest, roles: &RoleMap) -> Result<Report> {
        let scope = AccessScopeResolver::new(roles, &request.caller)
            .resolve(request.projects.as_deref(), request.viewing_user.as_ref());
        debug!(
            "Scope for {}: {} billing projects, {} user projects as {}",
            request.caller,
            scope.billing_projects.len(),
            scope.user_projects.len(),
            scope.effective_user
        );

        let plan = TimeBucketer::new(&self.pricing)
            .with_max_buckets(self.settings.max_buckets)
            .divide_range(request.from_date, request.to_date, request.bucket.as_deref())?;

        let progress = self.spinner(plan.buckets.len());

        let batches = try_join_all(
            plan.buckets
                .iter()
                .map(|bucket| self.fetch_bucket(bucket, &scope, progress.as_ref())),
        )
        .await;
        let batches = match batches {
            Ok(batches) => batches,
            Err(e) => {
                if let Some(pb) = progress {
                    pb.abandon_with_message("Report failed");
                }
                return Err(e);
            }
        };

        let mut aggregator =
            RecordAggregator::new(plan.bucket_size).with_strategy(self.settings.merge_strategy);
        let mut record_count = 0;
        for batch in &batches {
            record_count += batch.len();
            aggregator.extend(batch);
        }
        let entries = aggregator.into_entries();

        if let Some(pb) = progress {
            pb.finish_with_message(format!(
                "Aggregated {} records into {} entries",
                record_count,
                entries.len()
            ));
        }
        info!(
            "Built {} report with {} entries over {} buckets",
            plan.bucket_size,
            entries.len(),
            plan.buckets.len()
        );

        Ok(Report {
            from_date: request.from_date,
            to_date: request.to_date,
            bucket: plan.bucket_size,
            entries,
        })
    }

    /// Projects the caller holds a role in, with names and roles
    pub async fn list_projects(&self, caller: &UserId) -> Result<Vec<ProjectSummary>> {
        let roles = self.roles.roles_for(caller).await?;
        let mut projects = Vec::with_capacity(roles.len());
        for (id, project_roles) in roles {
            let name = self.roles.project_name(&id).await?;
            projects.push(ProjectSummary {
                id,
                name,
                roles: project_roles.into_iter().collect(),
            });
        }
        Ok(projects)
    }

    /// Fetch and annotate all usage for one bucket, cpu then volume then image
    async fn fetch_bucket(
        &self,
        bucket: &Bucket,
        scope: &AccessScope,
        progress: Option<&ProgressBar>,
    ) -> Result<Vec<PricedRecord>> {
        let query = scope.query(bucket.start, bucket.end);
        let (cpu, volume, image) = futures::try_join!(
            self.store.usage(UsageKind::Cpu, &query),
            self.store.usage(UsageKind::Volume, &query),
            self.store.usage(UsageKind::Image, &query),
        )?;

        let mut names: HashMap<UserId, Option<String>> = HashMap::new();
        let mut priced = Vec::with_capacity(cpu.len() + volume.len() + image.len());

        for record in cpu.into_iter().chain(volume) {
            let username = match &record.user {
                Some(user) => match names.get(user) {
                    Some(name) => name.clone(),
                    None => {
                        let name = self.directory.display_name(user).await?;
                        names.insert(user.clone(), name.clone());
                        name
                    }
                },
                None => None,
            };
            priced.push(PricedRecord::new(record, bucket, username));
        }

        for mut record in image {
            record.user = None;
            priced.push(PricedRecord::new(record, bucket, None));
        }

        if let Some(pb) = progress {
            pb.inc(1);
        }
        Ok(priced)
    }

    fn spinner(&self, buckets: usize) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new(buckets as u64);
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed_precise}] {pos}/{len} buckets")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Fetching usage");
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(pb)
    }
}
