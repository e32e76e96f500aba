//! CLI interface for billstat
//!
//! This module defines the command-line interface using clap.
//!
//! # Example
//!
//! ```bash
//! # Weekly report for January 2024
//! billstat report --caller alice --from 2024-01-01 --to 2024-02-01 --bucket weekly
//!
//! # One user's usage in two projects, as JSON
//! billstat --json report --caller alice --projects p1,p2 --user bob
//!
//! # Projects visible to a caller
//! billstat projects --caller alice
//! ```

use crate::aggregation::MergeStrategy;
use crate::bucketing::DEFAULT_MAX_BUCKETS;
use crate::pricing_table::PricingSource;
use crate::report::{ReportParams, ReportSettings};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Bucketed cost reports over cloud resource usage
#[derive(Parser, Debug, Clone)]
#[command(name = "billstat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Only show warnings and errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Dataset directory (defaults to <data dir>/billstat)
    #[arg(long, env = "BILLSTAT_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Pricing table JSON file (defaults to the built-in table)
    #[arg(long, env = "BILLSTAT_PRICING", global = true)]
    pub pricing: Option<PathBuf>,

    /// Merge records with a hash index instead of a linear scan
    #[arg(long, global = true)]
    pub keyed_merge: bool,

    /// Most buckets per report; older buckets are dropped first
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_buckets: Option<u64>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Where the pricing table comes from
    pub fn pricing_source(&self) -> PricingSource {
        match &self.pricing {
            Some(path) => PricingSource::File(path.clone()),
            None => PricingSource::Embedded,
        }
    }

    /// Report settings; the command line wins over the pricing table's cap
    pub fn report_settings(&self, table_max_buckets: Option<usize>) -> ReportSettings {
        let max_buckets = self
            .max_buckets
            .and_then(|max| usize::try_from(max).ok())
            .or(table_max_buckets)
            .unwrap_or(DEFAULT_MAX_BUCKETS);
        let merge_strategy = if self.keyed_merge {
            MergeStrategy::Keyed
        } else {
            MergeStrategy::LinearScan
        };
        ReportSettings {
            max_buckets,
            merge_strategy,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build a cost report
    Report(ReportArgs),

    /// List the projects a caller holds roles in
    Projects {
        /// User the listing is for
        #[arg(long, env = "BILLSTAT_CALLER")]
        caller: String,
    },

    /// Show the pricing table in use
    Pricing,
}

/// Arguments for the report command
#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// User requesting the report
    #[arg(long, env = "BILLSTAT_CALLER")]
    pub caller: String,

    /// Start of the range (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS), defaults to the start of this month
    #[arg(long)]
    pub from: Option<String>,

    /// End of the range, exclusive; defaults to now
    #[arg(long)]
    pub to: Option<String>,

    /// Bucket size: daily, weekly, monthly or yearly (unknown values mean daily)
    #[arg(long, short = 'b')]
    pub bucket: Option<String>,

    /// Comma-separated project ids (defaults to all of the caller's projects)
    #[arg(long, short = 'p')]
    pub projects: Option<String>,

    /// Only report this user's usage
    #[arg(long, short = 'u')]
    pub user: Option<String>,
}

impl ReportArgs {
    /// Raw report parameters
    pub fn to_params(&self) -> ReportParams {
        ReportParams {
            from_date: self.from.clone(),
            to_date: self.to.clone(),
            bucket: self.bucket.clone(),
            projects: self.projects.clone(),
            user: self.user.clone(),
        }
    }
}
