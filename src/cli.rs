//! CLI interface for costreport
//!
//! Every setting can also come from the environment variable named in its
//! help text, so scheduled jobs can be configured without flags.
//!
//! # Example
//!
//! ```bash
//! # Default report set for the last twelve full months
//! costreport run --output-dir /tmp/reports
//!
//! # Include the current month and a month-over-month service view
//! costreport run --current-month --changes
//!
//! # One ad-hoc report
//! costreport report --name Teams --group-by tag:team --style change
//!
//! # Check how usage types are placed in regions
//! costreport classify USE1-BoxUsage:m5.large EUW2-DataTransfer-Out-Bytes
//! ```

use crate::runner::PlanOptions;
use chrono::NaiveDate;
use clap::builder::FalseyValueParser;
use clap::{Args, Parser, Subcommand};
use costreport_core::config::{
    AccountLabelField, DEFAULT_LOOKBACK_MONTHS, ReportConfig, ReportWindow, TagFilter,
};
use costreport_core::error::Result;
use costreport_core::retry::RetryPolicy;
use costreport_core::types::{
    Granularity, GroupBy, Metric, RecordScope, ReportRequest, ReportStyle,
};
use std::path::PathBuf;

/// Monthly cloud cost reports from the AWS Cost Explorer API
#[derive(Parser, Debug, Clone)]
#[command(name = "costreport")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Only show warnings and errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build the default report set, export it and optionally deliver it
    Run(RunArgs),

    /// Build a single report
    Report(ReportArgs),

    /// Classify usage-type labels into regions
    Classify {
        /// Usage-type labels
        #[arg(required = true)]
        labels: Vec<String>,
    },
}

/// Date window arguments
#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    /// Include the current, incomplete month
    #[arg(long, env = "CURRENT_MONTH", value_parser = FalseyValueParser::new())]
    pub current_month: bool,

    /// Only report the last full month
    #[arg(long, env = "LAST_MONTH_ONLY", value_parser = FalseyValueParser::new())]
    pub last_month_only: bool,

    /// Months of history to report
    #[arg(long, default_value_t = DEFAULT_LOOKBACK_MONTHS, conflicts_with = "last_month_only")]
    pub months: u32,

    /// Reference date instead of today (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub today: Option<NaiveDate>,
}

impl WindowArgs {
    /// Resolve the report window relative to `today` unless overridden
    pub fn window(&self, today: NaiveDate) -> Result<ReportWindow> {
        let months = if self.last_month_only { 1 } else { self.months };
        ReportWindow::ending_on(self.today.unwrap_or(today), months, self.current_month)
    }
}

/// Query arguments shared by `run` and `report`
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Keep support charges in the default record filter
    #[arg(long, env = "INC_SUPPORT", value_parser = FalseyValueParser::new())]
    pub include_support: bool,

    /// Restrict every report to resources carrying this tag key
    #[arg(long, env = "TAG_KEY")]
    pub tag_key: Option<String>,

    /// Search pattern for candidate values of the tag key
    #[arg(long, env = "TAG_VALUE_FILTER", default_value = "*")]
    pub tag_value_filter: String,

    /// Account attribute shown instead of account ids (Name or Email)
    #[arg(long, env = "ACCOUNT_LABEL", default_value = "Email")]
    pub account_label: AccountLabelField,

    /// Cost metric
    #[arg(long, default_value = "UnblendedCost")]
    pub metric: Metric,

    /// Period size of every report (monthly or daily)
    #[arg(long, default_value = "monthly")]
    pub granularity: Granularity,

    /// Reports queried at the same time
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// Retries for throttled or unavailable billing calls
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    /// Per-request timeout in seconds (0 disables)
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,
}

impl QueryArgs {
    /// Build the run configuration
    pub fn to_config(&self, today: NaiveDate) -> Result<ReportConfig> {
        let mut config = ReportConfig::new(self.window.window(today)?);
        config.metric = self.metric;
        config.granularity = self.granularity;
        config.include_support = self.include_support;
        config.tag_filter = self.tag_key.as_ref().map(|key| TagFilter {
            key: key.clone(),
            search: self.tag_value_filter.clone(),
        });
        config.account_label = self.account_label;
        config.concurrency = self.concurrency;
        config.retry = RetryPolicy {
            max_retries: self.max_retries,
            request_timeout_secs: self.timeout,
            ..RetryPolicy::default()
        };
        config.validate()?;
        Ok(config)
    }
}

/// Export and delivery arguments
#[derive(Args, Debug, Clone)]
pub struct DeliveryArgs {
    /// Directory receiving one CSV file per report
    #[arg(long, default_value = "reports")]
    pub output_dir: PathBuf,

    /// Skip writing CSV files (also disables upload and mail)
    #[arg(long)]
    pub no_export: bool,

    /// Upload the exported files to this S3 bucket
    #[arg(long, env = "S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Comma-separated recipients of the report mail
    #[arg(long, env = "SES_SEND")]
    pub ses_send: Option<String>,

    /// Sender address of the report mail
    #[arg(long, env = "SES_FROM", requires = "ses_send")]
    pub ses_from: Option<String>,

    /// Region of the SES endpoint
    #[arg(long, env = "SES_REGION", default_value = "us-east-1")]
    pub ses_region: String,
}

/// Arguments of `costreport run`
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    #[command(flatten)]
    pub delivery: DeliveryArgs,

    /// Add a month-over-month service change report
    #[arg(long)]
    pub changes: bool,

    /// Add a per-account report
    #[arg(long)]
    pub accounts: bool,

    /// Add a usage report for every region with spend
    #[arg(long)]
    pub per_region: bool,
}

impl RunArgs {
    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            changes: self.changes,
            accounts: self.accounts,
            per_region: self.per_region,
        }
    }
}

/// Arguments of `costreport report`
#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Report name
    #[arg(long, default_value = "Report")]
    pub name: String,

    /// Group-bys, e.g. SERVICE or tag:team; none gives one Total row
    #[arg(long, value_delimiter = ',')]
    pub group_by: Vec<GroupBy>,

    /// Total or Change
    #[arg(long, default_value = "total")]
    pub style: ReportStyle,

    /// Restrict to one region
    #[arg(long)]
    pub region: Option<String>,

    /// Record kinds counted: standard, with-support, credits-only,
    /// refunds-only, upfront-only or unfiltered
    #[arg(long, default_value = "standard")]
    pub scope: RecordScope,

    /// Also print the regional breakdown of the most recent period
    #[arg(long)]
    pub breakdown: bool,
}

impl ReportArgs {
    pub fn request(&self) -> ReportRequest {
        let mut request = ReportRequest::new(self.name.clone(), self.group_by.clone())
            .with_style(self.style)
            .with_scope(self.scope);
        if let Some(region) = &self.region {
            request = request.with_region(region.clone());
        }
        request
    }
}

/// Parse a `YYYY-MM-DD` date argument
pub fn parse_date(value: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date: {value} (expected YYYY-MM-DD)"))
}
