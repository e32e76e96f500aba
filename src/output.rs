//! Output formatting module for billstat
//!
//! This module provides formatters for displaying reports in different formats:
//! - Table format for human-readable terminal output
//! - JSON format for machine-readable output and integration with other tools
//!
//! # Examples
//!
//! ```
//! use billstat::aggregation_types::{Report, Totals};
//! use billstat::granularity::BucketSize;
//! use billstat::output::get_formatter;
//! use chrono::NaiveDate;
//!
//! let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let report = Report { from_date: day, to_date: day, bucket: BucketSize::Daily, entries: vec![] };
//! let totals = Totals::from_entries(&report.entries);
//!
//! let json = get_formatter(true).format_report(&report, &totals);
//! assert!(json.contains("\"bucket\": \"daily\""));
//! ```

use crate::aggregation_types::{AggregateEntry, ProjectSummary, Report, Totals};
use crate::pricing_table::PricingTable;
use colored::Colorize;
use prettytable::{Table, format, row};
use serde::Serialize;
use tracing::warn;

/// Trait for output formatters
pub trait OutputFormatter {
    /// Format a report with its totals
    fn format_report(&self, report: &Report, totals: &Totals) -> String;

    /// Format a project listing
    fn format_projects(&self, projects: &[ProjectSummary]) -> String;

    /// Format the pricing table
    fn format_pricing(&self, pricing: &PricingTable) -> String;
}

/// Table formatter for human-readable output
pub struct TableFormatter;

impl TableFormatter {
    /// Format a quantity with two decimals
    fn format_quantity(value: Option<f64>) -> String {
        value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
    }

    /// Format a cost with the four decimals it is rounded to
    fn format_cost(value: Option<f64>) -> String {
        value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
    }

    fn format_owner(entry: &AggregateEntry) -> String {
        match (&entry.username, &entry.user) {
            (Some(name), _) => name.clone(),
            (None, Some(user)) => user.to_string(),
            (None, None) => "(images)".to_string(),
        }
    }

    /// Create a totals row for tables
    fn format_totals_row(totals: &Totals) -> prettytable::Row {
        row![
            b -> "TOTAL",
            "",
            "",
            r -> format!("{:.2}", totals.cpu),
            r -> format!("{:.4}", totals.cpu_cost),
            r -> format!("{:.2}", totals.volume),
            r -> format!("{:.4}", totals.volume_cost),
            r -> format!("{:.2}", totals.image),
            r -> format!("{:.4}", totals.image_cost),
            rb -> format!("{:.4}", totals.total_cost())
        ]
    }
}

impl OutputFormatter for TableFormatter {
    fn format_report(&self, report: &Report, totals: &Totals) -> String {
        let header = format!(
            "{} {} to {} ({})",
            "Cost report".bold(),
            report.from_date.format("%Y-%m-%d %H:%M"),
            report.to_date.format("%Y-%m-%d %H:%M"),
            report.bucket.to_string().cyan()
        );

        if report.entries.is_empty() {
            return format!("{header}\nNo usage found for this period.");
        }

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);

        table.set_titles(row![
            b -> "Period",
            b -> "User",
            b -> "Project",
            b -> "CPU h",
            b -> "CPU Cost",
            b -> "Volume GBh",
            b -> "Volume Cost",
            b -> "Image GBh",
            b -> "Image Cost",
            b -> "Total"
        ]);

        for entry in &report.entries {
            table.add_row(row![
                format!(
                    "{} to {}",
                    entry.from_date.format("%Y-%m-%d"),
                    entry.to_date.format("%Y-%m-%d")
                ),
                Self::format_owner(entry),
                entry.project_id,
                r -> Self::format_quantity(entry.cpu),
                r -> Self::format_cost(entry.cpu_cost),
                r -> Self::format_quantity(entry.volume),
                r -> Self::format_cost(entry.volume_cost),
                r -> Self::format_quantity(entry.image),
                r -> Self::format_cost(entry.image_cost),
                r -> format!("{:.4}", entry.total_cost())
            ]);
        }

        table.add_row(Self::format_totals_row(totals));

        format!("{header}\n{table}")
    }

    fn format_projects(&self, projects: &[ProjectSummary]) -> String {
        if projects.is_empty() {
            return "No projects found.".to_string();
        }

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(row![b -> "Project", b -> "Name", b -> "Roles"]);

        for project in projects {
            table.add_row(row![
                project.id,
                project.name.as_deref().unwrap_or("-"),
                project.roles.join(", ")
            ]);
        }

        table.to_string()
    }

    fn format_pricing(&self, pricing: &PricingTable) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(row![
            b -> "From",
            b -> "Until",
            b -> "CPU / h",
            b -> "Volume / GBh",
            b -> "Image / GBh"
        ]);

        for period in pricing.periods() {
            table.add_row(row![
                period.start.format("%Y-%m-%d %H:%M"),
                period.end.format("%Y-%m-%d %H:%M"),
                r -> period.rates.cpu_rate,
                r -> period.rates.volume_rate,
                r -> period.rates.image_rate
            ]);
        }

        match pricing.max_buckets() {
            Some(max) => format!("{table}Bucket cap: {max}"),
            None => table.to_string(),
        }
    }
}

/// JSON formatter for machine-readable output
///
/// Reports keep their wire shape: `{fromDate, toDate, bucket, entries}`.
pub struct JsonFormatter;

impl JsonFormatter {
    fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|e| {
            warn!("Failed to serialize output: {}", e);
            "null".to_string()
        })
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &Report, _totals: &Totals) -> String {
        Self::to_json(report)
    }

    fn format_projects(&self, projects: &[ProjectSummary]) -> String {
        Self::to_json(projects)
    }

    fn format_pricing(&self, pricing: &PricingTable) -> String {
        Self::to_json(pricing)
    }
}

/// Get the appropriate formatter based on output format preference
pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(TableFormatter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::granularity::BucketSize;
    use crate::pricing_table::PricingPeriod;
    use crate::types::{ProjectId, Rates, UsageKind, UserId};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn report() -> Report {
        let mut cpu = AggregateEntry::new(
            at(2024, 1, 1),
            at(2024, 1, 2),
            Some(UserId::new("u1")),
            Some("Alice".to_string()),
            ProjectId::new("p1"),
        );
        cpu.add_usage(UsageKind::Cpu, 3.0, 0.3705);
        let mut image = AggregateEntry::new(at(2024, 1, 1), at(2024, 1, 2), None, None, ProjectId::new("p1"));
        image.add_usage(UsageKind::Image, 5.0, 0.1);

        Report {
            from_date: at(2024, 1, 1),
            to_date: at(2024, 1, 3),
            bucket: BucketSize::Daily,
            entries: vec![cpu, image],
        }
    }

    #[test]
    fn test_quantity_and_cost_formatting() {
        assert_eq!(TableFormatter::format_quantity(Some(3.0)), "3.00");
        assert_eq!(TableFormatter::format_quantity(None), "-");
        assert_eq!(TableFormatter::format_cost(Some(0.3705)), "0.3705");
        assert_eq!(TableFormatter::format_cost(None), "-");
    }

    #[test]
    fn test_table_report() {
        colored::control::set_override(false);
        let report = report();
        let totals = Totals::from_entries(&report.entries);
        let output = TableFormatter.format_report(&report, &totals);

        assert!(output.contains("Cost report 2024-01-01 00:00 to 2024-01-03 00:00 (daily)"));
        assert!(output.contains("Alice"));
        assert!(output.contains("(images)"));
        assert!(output.contains("0.3705"));
        assert!(output.contains("TOTAL"));
        assert!(output.contains("0.4705"));
    }

    #[test]
    fn test_table_empty_report() {
        let mut report = report();
        report.entries.clear();
        let output = TableFormatter.format_report(&report, &Totals::default());
        assert!(output.contains("No usage found"));
    }

    #[test]
    fn test_json_report_shape() {
        let report = report();
        let totals = Totals::from_entries(&report.entries);
        let output = JsonFormatter.format_report(&report, &totals);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["bucket"], "daily");
        assert_eq!(value["entries"][0]["cpuCost"], 0.3705);
        assert_eq!(value["entries"][1]["image"], 5.0);
        assert!(value["entries"][1]["user"].is_null());
        assert!(value["entries"][1].get("username").is_none());
        assert!(value.get("totals").is_none());
    }

    #[test]
    fn test_projects() {
        let projects = vec![ProjectSummary {
            id: ProjectId::new("p1"),
            name: Some("Physics".to_string()),
            roles: vec!["billing".to_string(), "member".to_string()],
        }];
        let table = get_formatter(false).format_projects(&projects);
        assert!(table.contains("Physics"));
        assert!(table.contains("billing, member"));

        let json = get_formatter(true).format_projects(&projects);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["id"], "p1");

        assert_eq!(get_formatter(false).format_projects(&[]), "No projects found.");
    }

    #[test]
    fn test_pricing() {
        let pricing = PricingTable::new(vec![PricingPeriod::new(
            at(2024, 1, 1),
            at(2025, 1, 1),
            Rates::new(0.03, 0.0001, 0.0002),
        )])
        .unwrap();

        let table = get_formatter(false).format_pricing(&pricing);
        assert!(table.contains("2024-01-01 00:00"));
        assert!(table.contains("0.0002"));

        let json = get_formatter(true).format_pricing(&pricing);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["periods"][0]["cpuRate"], 0.03);
        assert_eq!(value["periods"][0]["start"], "2024-01-01T00:00:00");
    }
}
