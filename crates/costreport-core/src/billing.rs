//! Billing API collaborator interface
//!
//! This module defines the [`BillingApi`] trait that billing adapters must
//! implement, together with the request and page types exchanged across it.
//! The AWS Cost Explorer adapter lives in the `costreport-aws` crate; tests use
//! in-memory implementations.

use crate::error::Result;
use crate::filters::FilterSpec;
use crate::types::{Granularity, GroupBy, Metric, TimePeriod};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One cost-and-usage query, identical across all of its pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostQuery {
    pub period: TimePeriod,
    pub granularity: Granularity,
    pub metric: Metric,
    pub group_by: Vec<GroupBy>,
    pub filter: Option<FilterSpec>,
}

/// Amount for one group within one period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAmount {
    /// Group keys, one per group-by
    pub keys: Vec<String>,
    /// Amount of the requested metric
    pub amount: Decimal,
}

/// Results for one time bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodResult {
    pub period: TimePeriod,
    /// Period aggregate; populated by the API when the query has no group-by
    pub total: Option<Decimal>,
    pub groups: Vec<GroupAmount>,
}

/// One page of query results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostPage {
    pub results: Vec<PeriodResult>,
    /// Present while more pages remain
    pub next_page_token: Option<String>,
}

/// Billing data source
#[async_trait]
pub trait BillingApi: Send + Sync {
    /// Fetch one page of cost and usage data
    async fn cost_and_usage(
        &self,
        query: &CostQuery,
        next_page_token: Option<&str>,
    ) -> Result<CostPage>;

    /// Candidate values of `tag_key` matching `search` during `period`
    async fn tag_values(
        &self,
        search: &str,
        period: &TimePeriod,
        tag_key: &str,
    ) -> Result<Vec<String>>;
}
