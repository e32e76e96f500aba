//! billstat - Bucketed cost reports over cloud resource usage

use billstat::{
    aggregation_types::Totals,
    cli::{Cli, Command},
    error::Result,
    output::get_formatter,
    pricing_table::PricingLoader,
    report::{ReportBuilder, ReportRequest},
    types::UserId,
};
use billstat_store::DatasetStore;
use clap::Parser;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first to check for quiet flag
    let cli = Cli::parse();

    // Initialize logging. The --quiet flag should override RUST_LOG.
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("warn")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("billstat=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let formatter = get_formatter(cli.json);
    let pricing_loader = PricingLoader::new(cli.pricing_source());

    match &cli.command {
        Command::Pricing => {
            info!("Showing pricing from {:?}", pricing_loader.source());
            let pricing = pricing_loader.table().await?;
            println!("{}", formatter.format_pricing(&pricing));
        }
        Command::Projects { caller } => {
            let builder = build_report_builder(&cli, &pricing_loader).await?;
            let projects = builder.list_projects(&UserId::new(caller.as_str())).await?;
            println!("{}", formatter.format_projects(&projects));
        }
        Command::Report(args) => {
            info!("Running cost report for {}", args.caller);

            let now = chrono::Local::now().naive_local();
            let request = ReportRequest::from_params(&args.to_params(), UserId::new(args.caller.as_str()), now)?;

            let show_progress = !cli.json && is_terminal::is_terminal(std::io::stdout());
            let builder = build_report_builder(&cli, &pricing_loader)
                .await?
                .with_progress(show_progress);

            let report = builder.generate_for_caller(&request).await?;
            let totals = Totals::from_entries(&report.entries);
            println!("{}", formatter.format_report(&report, &totals));
        }
    }

    Ok(())
}

/// Load the dataset and pricing table and wire up a report builder
async fn build_report_builder(cli: &Cli, pricing_loader: &PricingLoader) -> Result<ReportBuilder> {
    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => DatasetStore::default_dir()?,
    };
    let dataset = Arc::new(DatasetStore::load(&data_dir).await?);
    let pricing = pricing_loader.table().await?;
    debug!(
        "Dataset '{}' with {} records, pricing from {:?}",
        dataset.name(),
        dataset.len(),
        pricing_loader.source()
    );
    let settings = cli.report_settings(pricing.max_buckets());

    Ok(ReportBuilder::with_backend(dataset, pricing).with_settings(settings))
}
