//! costreport - Monthly cloud cost reports from the AWS Cost Explorer API
//!
//! This library provides functionality to:
//! - Run an ordered plan of cost reports against a billing API
//! - Render reports as terminal tables or JSON
//! - Export reports as CSV files for upload and mail delivery
//!
//! The aggregation engine itself lives in `costreport-core`; the AWS
//! implementations of its collaborator traits live in `costreport-aws`.
//!
//! # Examples
//!
//! ```no_run
//! use costreport::runner::{PlanOptions, ReportRunner};
//! use costreport_aws::{CostExplorerBilling, OrganizationsAccounts};
//! use costreport_core::{AccountDirectory, QueryExecutor, ReportConfig, ReportWindow};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> costreport_core::Result<()> {
//!     let today = chrono::Utc::now().date_naive();
//!     let config = Arc::new(ReportConfig::new(ReportWindow::ending_on(today, 12, false)?));
//!
//!     let billing = Arc::new(CostExplorerBilling::from_env().await);
//!     let accounts = OrganizationsAccounts::from_env().await;
//!     let directory = AccountDirectory::load(&accounts, config.account_label)
//!         .await
//!         .into_directory();
//!
//!     let executor = Arc::new(QueryExecutor::new(billing, config));
//!     let runner = ReportRunner::new(executor, Arc::new(directory));
//!     let summary = runner.run_plan(&PlanOptions::default()).await;
//!     println!("{} reports built", summary.registry.len());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod export;
pub mod output;
pub mod runner;

pub use runner::{PlanOptions, ReportRunner, RunSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
