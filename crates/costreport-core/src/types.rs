//! Core domain types for costreport
//!
//! Strongly-typed wrappers for the concepts shared by the query executor,
//! the table builder and the export layer: billing periods, group keys,
//! cost records and report requests.

use crate::error::{CostReportError, Result};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Key under which a period's aggregate is recorded when a query has no group-by
pub const TOTAL_KEY: &str = "Total";

/// Half-open date interval `[start, end)` at day granularity
///
/// # Examples
/// ```
/// use costreport_core::types::TimePeriod;
/// use chrono::NaiveDate;
///
/// let jan = TimePeriod::new(
///     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
/// )
/// .unwrap();
/// assert_eq!(jan.to_string(), "2024-01-01..2024-02-01");
/// assert!(TimePeriod::new(jan.end(), jan.start()).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimePeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl TimePeriod {
    /// Create a period, rejecting empty or inverted intervals
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(CostReportError::InvalidPeriod(format!(
                "start {start} must be before end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse a period from the `YYYY-MM-DD` strings used by the billing API
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_api_date(start)?, parse_api_date(end)?)
    }

    /// Inclusive start date
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Exclusive end date
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether the period begins on the first day of a month
    pub fn is_month_aligned(&self) -> bool {
        self.start.day() == 1
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_api_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| CostReportError::InvalidDate(value.to_string()))
}

/// Billing dimension value identifying one row of a report
///
/// A service name, usage type, instance type, region code, or a resolved
/// account label.
///
/// # Examples
/// ```
/// use costreport_core::types::GroupKey;
///
/// let key = GroupKey::new("Amazon Elastic Compute Cloud - Compute");
/// assert_eq!(key.as_str(), "Amazon Elastic Compute Cloud - Compute");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey(String);

impl GroupKey {
    /// Create a new GroupKey
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for GroupKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GroupKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for GroupKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One cost amount for one group in one period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostRecord {
    /// First day of the billing period
    pub period_start: NaiveDate,
    /// Group the amount belongs to
    pub group_key: GroupKey,
    /// Spend; zero means "no spend", not "no data"
    pub amount: Decimal,
}

impl CostRecord {
    /// Create a new record
    pub fn new(period_start: NaiveDate, group_key: impl Into<GroupKey>, amount: Decimal) -> Self {
        Self {
            period_start,
            group_key: group_key.into(),
            amount,
        }
    }
}

/// Presentation style of a report
///
/// # Examples
/// ```
/// use costreport_core::types::ReportStyle;
/// use std::str::FromStr;
///
/// assert_eq!(ReportStyle::from_str("change").unwrap(), ReportStyle::Change);
/// assert_eq!(ReportStyle::Total.to_string(), "Total");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReportStyle {
    /// Raw per-period totals
    #[default]
    Total,
    /// Period-over-period deltas, first period kept as baseline
    Change,
}

impl fmt::Display for ReportStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Total => write!(f, "Total"),
            Self::Change => write!(f, "Change"),
        }
    }
}

impl FromStr for ReportStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "total" => Ok(Self::Total),
            "change" => Ok(Self::Change),
            _ => Err(format!("Invalid report style: {s}")),
        }
    }
}

/// Billing dimensions a report can be grouped or filtered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Service,
    UsageType,
    InstanceType,
    Region,
    LinkedAccount,
    RecordType,
}

impl Dimension {
    /// Name used by the billing API
    pub fn api_name(self) -> &'static str {
        match self {
            Self::Service => "SERVICE",
            Self::UsageType => "USAGE_TYPE",
            Self::InstanceType => "INSTANCE_TYPE",
            Self::Region => "REGION",
            Self::LinkedAccount => "LINKED_ACCOUNT",
            Self::RecordType => "RECORD_TYPE",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "SERVICE" => Ok(Self::Service),
            "USAGE_TYPE" => Ok(Self::UsageType),
            "INSTANCE_TYPE" => Ok(Self::InstanceType),
            "REGION" => Ok(Self::Region),
            "LINKED_ACCOUNT" => Ok(Self::LinkedAccount),
            "RECORD_TYPE" => Ok(Self::RecordType),
            _ => Err(format!("Invalid dimension: {s}")),
        }
    }
}

/// One grouping applied to a cost query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupBy {
    /// Group by a billing dimension
    Dimension(Dimension),
    /// Group by the values of a cost allocation tag
    Tag(String),
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dimension(d) => write!(f, "{d}"),
            Self::Tag(key) => write!(f, "tag:{key}"),
        }
    }
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.strip_prefix("tag:") {
            Some(key) if !key.is_empty() => Ok(Self::Tag(key.to_string())),
            Some(_) => Err("Tag group-by needs a key, e.g. tag:team".to_string()),
            None => s.parse().map(Self::Dimension),
        }
    }
}

/// Cost metric requested from the billing API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Metric {
    #[default]
    UnblendedCost,
    BlendedCost,
    AmortizedCost,
    NetUnblendedCost,
    NetAmortizedCost,
}

impl Metric {
    /// Name used by the billing API
    pub fn api_name(self) -> &'static str {
        match self {
            Self::UnblendedCost => "UnblendedCost",
            Self::BlendedCost => "BlendedCost",
            Self::AmortizedCost => "AmortizedCost",
            Self::NetUnblendedCost => "NetUnblendedCost",
            Self::NetAmortizedCost => "NetAmortizedCost",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "unblendedcost" | "unblended" => Ok(Self::UnblendedCost),
            "blendedcost" | "blended" => Ok(Self::BlendedCost),
            "amortizedcost" | "amortized" => Ok(Self::AmortizedCost),
            "netunblendedcost" | "netunblended" => Ok(Self::NetUnblendedCost),
            "netamortizedcost" | "netamortized" => Ok(Self::NetAmortizedCost),
            _ => Err(format!("Invalid metric: {s}")),
        }
    }
}

/// Time bucket size of a cost query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Granularity {
    #[default]
    Monthly,
    Daily,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monthly => write!(f, "MONTHLY"),
            Self::Daily => write!(f, "DAILY"),
        }
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "daily" => Ok(Self::Daily),
            _ => Err(format!("Invalid granularity: {s} (expected monthly or daily)")),
        }
    }
}

/// Record kinds known to the billing API's `RECORD_TYPE` dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Credit,
    Refund,
    Upfront,
    Support,
}

impl RecordKind {
    /// Value used by the billing API
    pub fn api_name(self) -> &'static str {
        match self {
            Self::Credit => "Credit",
            Self::Refund => "Refund",
            Self::Upfront => "Upfront",
            Self::Support => "Support",
        }
    }
}

/// Which record kinds a report counts
///
/// The `*Only` scopes replace the default exclusion with an inclusion of a
/// single kind; they are mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecordScope {
    /// Exclude credits, refunds, upfront fees and support
    #[default]
    Standard,
    /// Exclude credits, refunds and upfront fees; keep support
    WithSupport,
    /// Only credits
    CreditsOnly,
    /// Only refunds
    RefundsOnly,
    /// Only upfront reservation fees
    UpfrontOnly,
    /// No record-kind filter at all
    Unfiltered,
}

impl RecordScope {
    /// Apply the run-wide include-support setting
    ///
    /// Only the default exclusion is widened; inclusion scopes are left alone.
    pub fn with_global_support(self, include_support: bool) -> Self {
        match self {
            Self::Standard if include_support => Self::WithSupport,
            other => other,
        }
    }
}

impl fmt::Display for RecordScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Standard => "standard",
            Self::WithSupport => "with-support",
            Self::CreditsOnly => "credits-only",
            Self::RefundsOnly => "refunds-only",
            Self::UpfrontOnly => "upfront-only",
            Self::Unfiltered => "unfiltered",
        };
        f.write_str(name)
    }
}

impl FromStr for RecordScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "standard" => Ok(Self::Standard),
            "with-support" | "support" => Ok(Self::WithSupport),
            "credits-only" | "credits" => Ok(Self::CreditsOnly),
            "refunds-only" | "refunds" => Ok(Self::RefundsOnly),
            "upfront-only" | "upfront" => Ok(Self::UpfrontOnly),
            "unfiltered" | "all" => Ok(Self::Unfiltered),
            _ => Err(format!("Invalid record scope: {s}")),
        }
    }
}

/// One report to build during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    /// Report name, used as sheet/file name downstream
    pub name: String,
    /// Groupings; empty means one `Total` row
    pub group_by: Vec<GroupBy>,
    /// Presentation style
    pub style: ReportStyle,
    /// Restrict to one region
    pub region: Option<String>,
    /// Record kinds counted
    pub scope: RecordScope,
}

impl ReportRequest {
    /// Total-style request grouped by one dimension with the standard scope
    pub fn new(name: impl Into<String>, group_by: Vec<GroupBy>) -> Self {
        Self {
            name: name.into(),
            group_by,
            style: ReportStyle::Total,
            region: None,
            scope: RecordScope::Standard,
        }
    }

    /// Shorthand for a request grouped by a single dimension
    pub fn by_dimension(name: impl Into<String>, dimension: Dimension) -> Self {
        Self::new(name, vec![GroupBy::Dimension(dimension)])
    }

    /// Set the style
    pub fn with_style(mut self, style: ReportStyle) -> Self {
        self.style = style;
        self
    }

    /// Restrict to a region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the record scope
    pub fn with_scope(mut self, scope: RecordScope) -> Self {
        self.scope = scope;
        self
    }
}
