//! costreport - Monthly cloud cost reports from the AWS Cost Explorer API

use anyhow::{Context, Result, bail};
use clap::Parser;
use costreport::cli::{Cli, Command, DeliveryArgs, QueryArgs};
use costreport::export::CsvExporter;
use costreport::output::{OutputFormatter, get_formatter};
use costreport::runner::{ReportRunner, RunSummary, latest_breakdown};
use costreport_aws::{CostExplorerBilling, OrganizationsAccounts, S3ObjectStore, SesMailer};
use costreport_core::accounts::AccountDirectory;
use costreport_core::breakdown::BreakdownThresholds;
use costreport_core::delivery::{Mailer, ObjectStore, OutgoingMail};
use costreport_core::query::QueryExecutor;
use costreport_core::region::match_region;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Wire the AWS collaborators into a runner
async fn create_runner(query: &QueryArgs, show_progress: bool) -> Result<ReportRunner> {
    let today = chrono::Local::now().date_naive();
    let config = Arc::new(query.to_config(today).context("Invalid configuration")?);
    info!(
        period = %config.window.period,
        metric = %config.metric,
        "Using report window"
    );

    let billing = Arc::new(CostExplorerBilling::from_env().await);
    let accounts = OrganizationsAccounts::from_env().await;
    let directory = AccountDirectory::load(&accounts, config.account_label)
        .await
        .into_directory();

    let executor = Arc::new(QueryExecutor::new(billing, config));
    Ok(ReportRunner::new(executor, Arc::new(directory)).with_progress(show_progress))
}

/// Export the registry and hand the files to the configured delivery targets
async fn deliver(summary: &RunSummary, delivery: &DeliveryArgs) -> Result<()> {
    if delivery.no_export {
        return Ok(());
    }

    let files = CsvExporter::new(&delivery.output_dir)
        .export(&summary.registry)
        .context("Failed to export reports")?;

    if let Some(bucket) = &delivery.s3_bucket {
        let store = S3ObjectStore::from_env(bucket.clone()).await;
        for path in &files {
            let key = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .context("Exported file has no name")?;
            store
                .upload(path, &key)
                .await
                .with_context(|| format!("Failed to upload {}", path.display()))?;
        }
    }

    if let Some(recipients) = &delivery.ses_send {
        let Some(from) = &delivery.ses_from else {
            bail!("SES_SEND is set but SES_FROM is missing");
        };
        let mailer = SesMailer::from_env(&delivery.ses_region).await;
        mailer
            .send(&OutgoingMail::report(from.clone(), recipients, files))
            .await
            .context("Failed to send report mail")?;
    }

    Ok(())
}

fn report_failures(summary: &RunSummary) -> Result<()> {
    if summary.is_success() {
        return Ok(());
    }
    for failure in &summary.failures {
        warn!(report = %failure.name, error = %failure.error, "Report missing from output");
    }
    bail!(
        "{} of {} reports failed",
        summary.failures.len(),
        summary.failures.len() + summary.registry.len()
    )
}

fn print_usage_breakdown(summary: &RunSummary, formatter: &dyn OutputFormatter) {
    let Some(usage) = summary.registry.get("Usage") else {
        return;
    };
    if let Some(breakdown) = latest_breakdown(usage, &BreakdownThresholds::default()) {
        println!("{}", formatter.format_breakdown("Usage by region", &breakdown));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging. The --quiet flag should override RUST_LOG.
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("warn")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("costreport=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let formatter = get_formatter(cli.json);
    let show_progress = !cli.json && is_terminal::is_terminal(std::io::stdout());

    match cli.command {
        Command::Run(args) => {
            info!("Running default report plan");
            let runner = create_runner(&args.query, show_progress).await?;
            let summary = runner.run_plan(&args.plan_options()).await;

            println!("{}", formatter.format_registry(&summary.registry));
            print_usage_breakdown(&summary, formatter.as_ref());

            deliver(&summary, &args.delivery).await?;
            report_failures(&summary)?;
        }
        Command::Report(args) => {
            let request = args.request();
            info!(report = %request.name, "Running single report");
            let runner = create_runner(&args.query, show_progress).await?;
            let report = runner
                .build_report(&request)
                .await
                .with_context(|| format!("Report {} failed", request.name))?;

            println!("{}", formatter.format_report(&report));
            if args.breakdown {
                if let Some(breakdown) = latest_breakdown(&report, &BreakdownThresholds::default()) {
                    println!(
                        "{}",
                        formatter.format_breakdown(&format!("{} by region", report.name), &breakdown)
                    );
                }
            }
        }
        Command::Classify { labels } => {
            let results: Vec<_> = labels
                .into_iter()
                .map(|label| {
                    let region = match_region(&label);
                    (label, region)
                })
                .collect();
            println!("{}", formatter.format_classifications(&results));
        }
    }

    Ok(())
}
