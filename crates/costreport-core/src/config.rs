//! Run configuration
//!
//! One immutable [`ReportConfig`] is built at startup and shared by the query
//! executor and the runner. Nothing below reads the process environment.

use crate::error::{CostReportError, Result};
use crate::retry::RetryPolicy;
use crate::types::{Granularity, Metric, TimePeriod};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Months covered by a default run
pub const DEFAULT_LOOKBACK_MONTHS: u32 = 12;

/// Account attribute used as the display label for account ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccountLabelField {
    Name,
    #[default]
    Email,
}

impl fmt::Display for AccountLabelField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => write!(f, "Name"),
            Self::Email => write!(f, "Email"),
        }
    }
}

impl FromStr for AccountLabelField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "email" => Ok(Self::Email),
            _ => Err(format!("Invalid account label field: {s} (expected Name or Email)")),
        }
    }
}

/// Tag key whose values constrain every report, plus the value search pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    /// Cost allocation tag key
    pub key: String,
    /// Search string passed to the tag value lookup (`*` matches all)
    pub search: String,
}

/// Date range covered by a run
///
/// `period` is what cost queries use; `tag_search` ends today so tag values
/// first seen in the current month are still found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    /// Cost query period
    pub period: TimePeriod,
    /// Tag value lookup period
    pub tag_search: TimePeriod,
}

impl ReportWindow {
    /// Compute the window relative to `today`
    ///
    /// The period starts on the first day of the month `lookback_months`
    /// before today and ends on the first day of the current month, or on
    /// today when `include_current_month` is set.
    ///
    /// # Examples
    /// ```
    /// use costreport_core::config::ReportWindow;
    /// use chrono::NaiveDate;
    ///
    /// let today = NaiveDate::from_ymd_opt(2024, 6, 17).unwrap();
    /// let window = ReportWindow::ending_on(today, 12, false).unwrap();
    /// assert_eq!(window.period.to_string(), "2023-06-01..2024-06-01");
    /// ```
    pub fn ending_on(
        today: NaiveDate,
        lookback_months: u32,
        include_current_month: bool,
    ) -> Result<Self> {
        if lookback_months == 0 {
            return Err(CostReportError::Config(
                "lookback must cover at least one month".to_string(),
            ));
        }
        let month_start = first_of_month(today);
        let start = today
            .checked_sub_months(Months::new(lookback_months))
            .map(first_of_month)
            .ok_or_else(|| {
                CostReportError::Config(format!(
                    "cannot look back {lookback_months} months from {today}"
                ))
            })?;
        let end = if include_current_month {
            today
        } else {
            month_start
        };

        Ok(Self {
            period: TimePeriod::new(start, end)?,
            tag_search: TimePeriod::new(start, today)?,
        })
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Immutable configuration shared by every report of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Date range queried
    pub window: ReportWindow,
    /// Cost metric
    pub metric: Metric,
    /// Bucket size
    pub granularity: Granularity,
    /// Keep support charges in the default record scope
    pub include_support: bool,
    /// Run-wide tag constraint
    pub tag_filter: Option<TagFilter>,
    /// Account attribute used to relabel account ids
    pub account_label: AccountLabelField,
    /// Retry and timeout settings for billing calls
    pub retry: RetryPolicy,
    /// Reports built concurrently; 1 means strictly sequential
    pub concurrency: usize,
}

impl ReportConfig {
    /// Configuration with defaults for everything but the window
    pub fn new(window: ReportWindow) -> Self {
        Self {
            window,
            metric: Metric::default(),
            granularity: Granularity::default(),
            include_support: false,
            tag_filter: None,
            account_label: AccountLabelField::default(),
            retry: RetryPolicy::default(),
            concurrency: 1,
        }
    }

    /// Validate values that clap cannot check on its own
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(CostReportError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if let Some(tag) = &self.tag_filter {
            if tag.key.trim().is_empty() {
                return Err(CostReportError::Config("tag key is empty".to_string()));
            }
        }
        Ok(())
    }
}
