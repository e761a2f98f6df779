//! Query executor
//!
//! Turns a [`ReportRequest`] into a fully paginated sequence of
//! [`CostRecord`]s: it assembles the filter (record scope, region, tag
//! values), issues the query, follows continuation tokens until the billing
//! API stops returning one, and flattens the per-period groups.
//!
//! Every collaborator call runs under the configured [`RetryPolicy`]
//! (`crate::retry`); errors that survive it propagate to the caller.

use crate::billing::{BillingApi, CostQuery, PeriodResult};
use crate::config::ReportConfig;
use crate::error::Result;
use crate::filters::{FilterSpec, TagConstraint};
use crate::retry::with_retry;
use crate::types::{CostRecord, GroupKey, RecordScope, ReportRequest, TOTAL_KEY};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Separator used when a query groups by more than one key
const MULTI_KEY_SEPARATOR: &str = " / ";

/// Executes paginated billing queries for report requests
pub struct QueryExecutor {
    billing: Arc<dyn BillingApi>,
    config: Arc<ReportConfig>,
}

impl QueryExecutor {
    /// Create a new executor
    pub fn new(billing: Arc<dyn BillingApi>, config: Arc<ReportConfig>) -> Self {
        Self { billing, config }
    }

    /// Get the run configuration
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Resolve the run-wide tag constraint, if a tag key is configured
    pub async fn tag_constraint(&self) -> Result<Option<TagConstraint>> {
        let Some(tag) = &self.config.tag_filter else {
            return Ok(None);
        };

        let period = self.config.window.tag_search;
        let values = with_retry(&self.config.retry, "GetTags", || {
            self.billing.tag_values(&tag.search, &period, &tag.key)
        })
        .await?;

        if values.is_empty() {
            warn!(
                tag_key = %tag.key,
                search = %tag.search,
                "No tag values matched; tag constraint dropped"
            );
        } else {
            debug!(tag_key = %tag.key, count = values.len(), "Resolved tag values");
        }

        Ok(Some(TagConstraint {
            key: tag.key.clone(),
            values,
        }))
    }

    /// Build the query for a request
    ///
    /// Unfiltered requests skip the tag lookup and carry no tag constraint.
    pub async fn build_query(&self, request: &ReportRequest) -> Result<CostQuery> {
        let scope = request
            .scope
            .with_global_support(self.config.include_support);
        let tags = match scope {
            RecordScope::Unfiltered => None,
            _ => self.tag_constraint().await?,
        };
        let filter = FilterSpec::for_request(scope, request.region.as_deref(), tags.as_ref());

        Ok(CostQuery {
            period: self.config.window.period,
            granularity: self.config.granularity,
            metric: self.config.metric,
            group_by: request.group_by.clone(),
            filter,
        })
    }

    /// Run a query to completion and return its raw period results
    ///
    /// Pagination ends only when the billing API omits the continuation token.
    pub async fn fetch_all(&self, query: &CostQuery) -> Result<Vec<PeriodResult>> {
        let mut results = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let token = next_token.as_deref();
            let page = with_retry(&self.config.retry, "GetCostAndUsage", || {
                self.billing.cost_and_usage(query, token)
            })
            .await?;
            pages += 1;
            debug!(
                page = pages,
                periods = page.results.len(),
                more = page.next_page_token.is_some(),
                "Fetched cost page"
            );

            results.extend(page.results);
            match page.next_page_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        Ok(results)
    }

    /// Execute a report request and flatten the results into records
    pub async fn execute(&self, request: &ReportRequest) -> Result<Vec<CostRecord>> {
        let query = self.build_query(request).await?;
        info!(
            report = %request.name,
            period = %query.period,
            filter = query.filter.as_ref().map(|f| f.to_string()).unwrap_or_default(),
            "Querying cost and usage"
        );

        let results = self.fetch_all(&query).await?;
        Ok(flatten(&results))
    }
}

/// Flatten period results into one record per (period, group)
///
/// A period without groups yields a single record under [`TOTAL_KEY`].
pub fn flatten(results: &[PeriodResult]) -> Vec<CostRecord> {
    let mut records = Vec::new();

    for result in results {
        let period_start = result.period.start();
        if result.groups.is_empty() {
            records.push(CostRecord::new(
                period_start,
                TOTAL_KEY,
                result.total.unwrap_or(Decimal::ZERO),
            ));
            continue;
        }

        for group in &result.groups {
            let key = match group.keys.as_slice() {
                [] => GroupKey::new(TOTAL_KEY),
                [single] => GroupKey::new(single.clone()),
                many => GroupKey::new(many.join(MULTI_KEY_SEPARATOR)),
            };
            records.push(CostRecord::new(period_start, key, group.amount));
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::GroupAmount;
    use crate::config::{ReportWindow, TagFilter};
    use crate::error::{BillingErrorKind, CostReportError};
    use crate::retry::RetryPolicy;
    use crate::test_utils::{MockBilling, month, period_result};
    use crate::types::Dimension;
    use chrono::NaiveDate;
    use rust_decimal::dec;

    fn config() -> ReportConfig {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let mut config = ReportConfig::new(ReportWindow::ending_on(today, 2, false).unwrap());
        config.retry = RetryPolicy {
            initial_delay_ms: 1,
            max_delay_ms: 1,
            request_timeout_secs: 0,
            ..RetryPolicy::default()
        };
        config
    }

    fn executor(billing: Arc<MockBilling>, config: ReportConfig) -> QueryExecutor {
        QueryExecutor::new(billing, Arc::new(config))
    }

    #[tokio::test]
    async fn test_follows_pages_until_token_absent() {
        let billing = Arc::new(MockBilling::with_pages(vec![
            vec![period_result(month(2024, 1), &[("EC2", dec!(10))])],
            vec![period_result(month(2024, 1), &[("S3", dec!(2))])],
            vec![period_result(month(2024, 2), &[("EC2", dec!(12))])],
        ]));
        let exec = executor(billing.clone(), config());

        let records = exec
            .execute(&ReportRequest::by_dimension("Services", Dimension::Service))
            .await
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(billing.calls(), 3);
        assert_eq!(
            billing.tokens_seen(),
            vec![None, Some("page-1".to_string()), Some("page-2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_every_page_carries_the_same_query() {
        let billing = Arc::new(MockBilling::with_pages(vec![
            vec![period_result(month(2024, 1), &[("EC2", dec!(10))])],
            vec![period_result(month(2024, 2), &[("EC2", dec!(12))])],
        ]));
        let exec = executor(billing.clone(), config());

        exec.execute(
            &ReportRequest::by_dimension("eu", Dimension::UsageType).with_region("eu-west-1"),
        )
        .await
        .unwrap();

        let queries = billing.queries_seen();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0], queries[1]);
        assert!(queries[1].filter.is_some());
    }

    #[tokio::test]
    async fn test_global_support_flag_widens_standard_scope() {
        let billing = Arc::new(MockBilling::with_pages(vec![vec![]]));
        let mut config = config();
        config.include_support = true;
        let exec = executor(billing, config);

        let query = exec
            .build_query(&ReportRequest::by_dimension("Services", Dimension::Service))
            .await
            .unwrap();

        assert_eq!(
            query.filter,
            FilterSpec::record_scope(RecordScope::WithSupport)
        );
        assert_eq!(query.granularity, crate::types::Granularity::Monthly);
    }

    #[tokio::test]
    async fn test_tag_constraint_added_when_values_found() {
        let billing = Arc::new(
            MockBilling::with_pages(vec![vec![]]).with_tag_values(vec!["prod".to_string()]),
        );
        let mut config = config();
        config.tag_filter = Some(TagFilter {
            key: "env".to_string(),
            search: "*".to_string(),
        });
        let exec = executor(billing, config);

        let query = exec
            .build_query(&ReportRequest::by_dimension("Services", Dimension::Service))
            .await
            .unwrap();

        assert_eq!(
            query.filter.unwrap().to_string(),
            "NOT (RECORD_TYPE in [Credit, Refund, Upfront, Support]) AND tag:env in [prod]"
        );
    }

    #[tokio::test]
    async fn test_tag_constraint_dropped_when_no_values() {
        let billing = Arc::new(MockBilling::with_pages(vec![vec![]]).with_tag_values(vec![]));
        let mut config = config();
        config.tag_filter = Some(TagFilter {
            key: "env".to_string(),
            search: "prod*".to_string(),
        });
        let exec = executor(billing, config);

        let query = exec
            .build_query(&ReportRequest::by_dimension("Services", Dimension::Service))
            .await
            .unwrap();

        assert_eq!(query.filter, FilterSpec::record_scope(RecordScope::Standard));
    }

    #[tokio::test]
    async fn test_unfiltered_request_skips_tag_constraint() {
        let billing = Arc::new(
            MockBilling::with_pages(vec![vec![]]).with_tag_values(vec!["prod".to_string()]),
        );
        let mut config = config();
        config.tag_filter = Some(TagFilter {
            key: "env".to_string(),
            search: "*".to_string(),
        });
        let exec = executor(billing.clone(), config);

        let query = exec
            .build_query(
                &ReportRequest::by_dimension("All", Dimension::Service)
                    .with_scope(RecordScope::Unfiltered),
            )
            .await
            .unwrap();
        assert!(query.filter.is_none());

        let query = exec
            .build_query(
                &ReportRequest::by_dimension("eu", Dimension::UsageType)
                    .with_scope(RecordScope::Unfiltered)
                    .with_region("eu-west-1"),
            )
            .await
            .unwrap();
        assert_eq!(
            query.filter,
            Some(FilterSpec::dimension(Dimension::Region, ["eu-west-1"]))
        );
        assert_eq!(billing.tag_calls(), 0);
    }

    #[tokio::test]
    async fn test_throttling_is_retried() {
        let billing = Arc::new(
            MockBilling::with_pages(vec![vec![period_result(
                month(2024, 1),
                &[("EC2", dec!(1))],
            )]])
            .failing_first(2, BillingErrorKind::Throttled),
        );
        let exec = executor(billing.clone(), config());

        let records = exec
            .execute(&ReportRequest::by_dimension("Services", Dimension::Service))
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(billing.calls(), 3);
    }

    #[tokio::test]
    async fn test_access_denied_propagates_without_retry() {
        let billing = Arc::new(
            MockBilling::with_pages(vec![vec![]]).failing_first(1, BillingErrorKind::AccessDenied),
        );
        let exec = executor(billing.clone(), config());

        let err = exec
            .execute(&ReportRequest::by_dimension("Services", Dimension::Service))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CostReportError::Billing {
                kind: BillingErrorKind::AccessDenied,
                ..
            }
        ));
        assert_eq!(billing.calls(), 1);
    }

    #[test]
    fn test_flatten_uses_total_sentinel_for_ungrouped_periods() {
        let results = vec![PeriodResult {
            period: month(2024, 1),
            total: Some(dec!(42.5)),
            groups: vec![],
        }];

        let records = flatten(&results);
        assert_eq!(
            records,
            vec![CostRecord::new(month(2024, 1).start(), TOTAL_KEY, dec!(42.5))]
        );
    }

    #[test]
    fn test_flatten_joins_multiple_keys() {
        let results = vec![PeriodResult {
            period: month(2024, 1),
            total: None,
            groups: vec![GroupAmount {
                keys: vec!["EC2".to_string(), "us-east-1".to_string()],
                amount: dec!(3),
            }],
        }];

        let records = flatten(&results);
        assert_eq!(records[0].group_key.as_str(), "EC2 / us-east-1");
    }

    #[test]
    fn test_flatten_keeps_zero_amounts() {
        let results = vec![period_result(month(2024, 1), &[("Tax", dec!(0))])];
        let records = flatten(&results);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, Decimal::ZERO);
    }
}
