//! Report runner
//!
//! Executes an ordered list of [`ReportRequest`]s and collects the finished
//! reports into a [`ReportRegistry`]. Reports may be built concurrently, but
//! the registry always receives them in request order. A report whose query
//! fails is recorded in the [`RunSummary`] and the run moves on.

use costreport_core::accounts::AccountDirectory;
use costreport_core::breakdown::{BreakdownThresholds, RegionalBreakdown, regional_breakdown};
use costreport_core::error::{CostReportError, Result};
use costreport_core::query::QueryExecutor;
use costreport_core::registry::{Report, ReportRegistry};
use costreport_core::table::ReportTable;
use costreport_core::types::{Dimension, RecordScope, ReportRequest, ReportStyle};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::{error, info};

/// Region keys that do not name a physical region
pub const NON_REGIONAL_KEYS: [&str; 2] = ["NoRegion", "global"];

/// Which optional reports a default run includes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanOptions {
    /// Add a month-over-month service change report
    pub changes: bool,
    /// Add a per-account report
    pub accounts: bool,
    /// Add a usage report for every region with spend
    pub per_region: bool,
}

/// The default report plan, in execution order
pub fn default_plan(options: &PlanOptions) -> Vec<ReportRequest> {
    let mut plan = vec![
        ReportRequest::by_dimension("Usage", Dimension::UsageType),
        ReportRequest::by_dimension("Instances", Dimension::InstanceType),
        ReportRequest::by_dimension("Services", Dimension::Service)
            .with_scope(RecordScope::WithSupport),
        ReportRequest::by_dimension("Regions", Dimension::Region),
    ];
    if options.changes {
        plan.push(
            ReportRequest::by_dimension("ServicesChange", Dimension::Service)
                .with_style(ReportStyle::Change),
        );
    }
    if options.accounts {
        plan.push(ReportRequest::by_dimension("Accounts", Dimension::LinkedAccount));
    }
    plan
}

/// One usage-type report per region key of a region report
///
/// Keys in [`NON_REGIONAL_KEYS`] are skipped. Requests follow the row order
/// of `regions`.
pub fn regional_plan(regions: &ReportTable) -> Vec<ReportRequest> {
    regions
        .rows()
        .iter()
        .map(|row| row.key.as_str())
        .filter(|key| !NON_REGIONAL_KEYS.contains(key))
        .map(|region| {
            ReportRequest::by_dimension(region, Dimension::UsageType).with_region(region)
        })
        .collect()
}

/// A report that could not be built
#[derive(Debug)]
pub struct ReportFailure {
    pub name: String,
    pub error: CostReportError,
}

/// Outcome of a run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub registry: ReportRegistry,
    pub failures: Vec<ReportFailure>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Append another summary's reports and failures after this one's
    pub fn absorb(&mut self, other: RunSummary) {
        for report in other.registry.into_reports() {
            self.registry.append(report);
        }
        self.failures.extend(other.failures);
    }
}

/// Builds reports from requests
pub struct ReportRunner {
    executor: Arc<QueryExecutor>,
    accounts: Arc<AccountDirectory>,
    concurrency: usize,
    show_progress: bool,
}

impl ReportRunner {
    /// Create a runner; concurrency comes from the executor's config
    pub fn new(executor: Arc<QueryExecutor>, accounts: Arc<AccountDirectory>) -> Self {
        let concurrency = executor.config().concurrency.max(1);
        Self {
            executor,
            accounts,
            concurrency,
            show_progress: false,
        }
    }

    /// Enable or disable the progress spinner
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Query and build a single report
    pub async fn build_report(&self, request: &ReportRequest) -> Result<Report> {
        let records = self.executor.execute(request).await?;
        let table = ReportTable::build(&records, &self.accounts, request.style);
        info!(
            report = %request.name,
            style = %request.style,
            rows = table.len(),
            periods = table.periods().len(),
            "Report built"
        );
        Ok(Report::new(request.name.clone(), request.style, table))
    }

    /// Build every request, keeping request order in the registry
    pub async fn run(&self, requests: &[ReportRequest]) -> RunSummary {
        let progress = self.show_progress.then(|| {
            let pb = ProgressBar::new(requests.len() as u64);
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg} [{elapsed_precise}] {pos}/{len} reports")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message("Querying Cost Explorer");
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            pb
        });

        let mut summary = RunSummary::default();
        let mut outcomes = stream::iter(requests)
            .map(|request| async move { (request, self.build_report(request).await) })
            .buffered(self.concurrency);

        while let Some((request, outcome)) = outcomes.next().await {
            match outcome {
                Ok(report) => summary.registry.append(report),
                Err(e) => {
                    error!(report = %request.name, error = %e, "Report failed");
                    summary.failures.push(ReportFailure {
                        name: request.name.clone(),
                        error: e,
                    });
                }
            }
            if let Some(pb) = &progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
        summary
    }

    /// Run the default plan, followed by per-region reports when requested
    pub async fn run_plan(&self, options: &PlanOptions) -> RunSummary {
        let mut summary = self.run(&default_plan(options)).await;

        if options.per_region {
            let regional = match summary.registry.get("Regions") {
                Some(report) => regional_plan(&report.table),
                None => Vec::new(),
            };
            info!(reports = regional.len(), "Building per-region usage reports");
            let regional_summary = self.run(&regional).await;
            for report in regional_summary.registry.iter() {
                log_breakdown(report);
            }
            summary.absorb(regional_summary);
        }

        summary
    }
}

/// Regional breakdown of a report's most recent period
pub fn latest_breakdown(
    report: &Report,
    thresholds: &BreakdownThresholds,
) -> Option<RegionalBreakdown> {
    let latest = report.table.periods().len().checked_sub(1)?;
    Some(regional_breakdown(&report.table, latest, thresholds))
}

fn log_breakdown(report: &Report) {
    if let Some(breakdown) = latest_breakdown(report, &BreakdownThresholds::per_region()) {
        info!(
            report = %report.name,
            regions = ?breakdown.by_region,
            unresolved = breakdown.unresolved.len(),
            "Regional breakdown"
        );
    }
}
