//! Core aggregation engine for costreport
//!
//! This crate turns paginated billing query results into time-indexed report
//! tables. It provides the domain types, the query executor, the table
//! builder, the region classifier, and the collaborator traits that the AWS
//! adapters and test doubles implement.

pub mod accounts;
pub mod billing;
pub mod breakdown;
pub mod config;
pub mod delivery;
pub mod error;
pub mod filters;
pub mod query;
pub mod region;
pub mod registry;
pub mod retry;
pub mod table;
pub mod types;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use accounts::{AccountDirectory, AccountLoad, AccountSource};
pub use billing::BillingApi;
pub use config::{AccountLabelField, ReportConfig, ReportWindow};
pub use error::{BillingErrorKind, CostReportError, Result};
pub use query::QueryExecutor;
pub use region::{RegionMatch, classify};
pub use registry::{Report, ReportRegistry};
pub use table::ReportTable;
pub use types::{CostRecord, Dimension, GroupKey, ReportRequest, ReportStyle, TimePeriod};
