//! AWS Cost Explorer billing adapter

use crate::error::AwsAdapterError;
use async_trait::async_trait;
use aws_sdk_costexplorer::Client;
use aws_sdk_costexplorer::types::{
    DateInterval, DimensionValues, Expression, Granularity as CeGranularity, GroupDefinition,
    GroupDefinitionType, MetricValue, ResultByTime, TagValues,
};
use costreport_core::billing::{BillingApi, CostPage, CostQuery, GroupAmount, PeriodResult};
use costreport_core::error::{CostReportError, Result};
use costreport_core::filters::FilterSpec;
use costreport_core::types::{Granularity, GroupBy, Metric, TimePeriod};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

/// [`BillingApi`] backed by the Cost Explorer API
pub struct CostExplorerBilling {
    client: Client,
}

impl CostExplorerBilling {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Client using the default credential chain in the billing region
    pub async fn from_env() -> Self {
        let config = crate::load_config(crate::BILLING_REGION).await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl BillingApi for CostExplorerBilling {
    async fn cost_and_usage(
        &self,
        query: &CostQuery,
        next_page_token: Option<&str>,
    ) -> Result<CostPage> {
        let operation = "GetCostAndUsage";
        let group_by = group_definitions(&query.group_by);

        let response = self
            .client
            .get_cost_and_usage()
            .time_period(date_interval(operation, &query.period)?)
            .granularity(granularity(query.granularity))
            .metrics(query.metric.api_name())
            .set_group_by((!group_by.is_empty()).then_some(group_by))
            .set_filter(query.filter.as_ref().map(to_expression))
            .set_next_page_token(next_page_token.map(str::to_string))
            .send()
            .await
            .map_err(|e| AwsAdapterError::from_sdk(operation, e))?;

        let results = response
            .results_by_time()
            .iter()
            .map(|result| to_period_result(result, query.metric))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            periods = results.len(),
            more = response.next_page_token().is_some(),
            "Cost Explorer page"
        );

        Ok(CostPage {
            results,
            next_page_token: response.next_page_token().map(str::to_string),
        })
    }

    async fn tag_values(
        &self,
        search: &str,
        period: &TimePeriod,
        tag_key: &str,
    ) -> Result<Vec<String>> {
        let operation = "GetTags";
        let mut values = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let response = self
                .client
                .get_tags()
                .search_string(search)
                .time_period(date_interval(operation, period)?)
                .tag_key(tag_key)
                .set_next_page_token(next_token.take())
                .send()
                .await
                .map_err(|e| AwsAdapterError::from_sdk(operation, e))?;

            values.extend(response.tags().iter().cloned());
            match response.next_page_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => return Ok(values),
            }
        }
    }
}

fn date_interval(
    operation: &'static str,
    period: &TimePeriod,
) -> std::result::Result<DateInterval, AwsAdapterError> {
    DateInterval::builder()
        .start(period.start().format("%Y-%m-%d").to_string())
        .end(period.end().format("%Y-%m-%d").to_string())
        .build()
        .map_err(|e| AwsAdapterError::malformed(operation, e))
}

fn granularity(granularity: Granularity) -> CeGranularity {
    match granularity {
        Granularity::Monthly => CeGranularity::Monthly,
        Granularity::Daily => CeGranularity::Daily,
    }
}

/// Translate group-bys into Cost Explorer group definitions
pub fn group_definitions(group_by: &[GroupBy]) -> Vec<GroupDefinition> {
    group_by
        .iter()
        .map(|group| match group {
            GroupBy::Dimension(dimension) => GroupDefinition::builder()
                .r#type(GroupDefinitionType::Dimension)
                .key(dimension.api_name())
                .build(),
            GroupBy::Tag(key) => GroupDefinition::builder()
                .r#type(GroupDefinitionType::Tag)
                .key(key)
                .build(),
        })
        .collect()
}

/// Translate a filter tree into a Cost Explorer expression
pub fn to_expression(filter: &FilterSpec) -> Expression {
    match filter {
        FilterSpec::And(operands) => Expression::builder()
            .set_and(Some(operands.iter().map(to_expression).collect()))
            .build(),
        FilterSpec::Not(inner) => Expression::builder().not(to_expression(inner)).build(),
        FilterSpec::Dimension { key, values } => Expression::builder()
            .dimensions(
                DimensionValues::builder()
                    .key(key.api_name().into())
                    .set_values(Some(values.clone()))
                    .build(),
            )
            .build(),
        FilterSpec::Tags { key, values } => Expression::builder()
            .tags(
                TagValues::builder()
                    .key(key)
                    .set_values(Some(values.clone()))
                    .build(),
            )
            .build(),
    }
}

/// Convert one time bucket of a response
pub fn to_period_result(result: &ResultByTime, metric: Metric) -> Result<PeriodResult> {
    let interval = result.time_period().ok_or_else(|| {
        CostReportError::from(AwsAdapterError::malformed(
            "GetCostAndUsage",
            "result without time period",
        ))
    })?;
    let period = TimePeriod::parse(interval.start(), interval.end())?;

    let total = metric_amount(result.total(), metric, || format!("{period} total"))?;

    let groups = result
        .groups()
        .iter()
        .map(|group| {
            let keys: Vec<String> = group.keys().to_vec();
            let context = || format!("{period} {}", keys.join(", "));
            let amount = metric_amount(group.metrics(), metric, context)?.ok_or_else(|| {
                CostReportError::InvalidAmount {
                    value: "<missing>".to_string(),
                    context: context(),
                }
            })?;
            Ok(GroupAmount { keys, amount })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PeriodResult {
        period,
        total,
        groups,
    })
}

fn metric_amount(
    metrics: Option<&HashMap<String, MetricValue>>,
    metric: Metric,
    context: impl Fn() -> String,
) -> Result<Option<Decimal>> {
    let Some(raw) = metrics
        .and_then(|m| m.get(metric.api_name()))
        .and_then(|value| value.amount())
    else {
        return Ok(None);
    };
    parse_amount(raw)
        .map(Some)
        .ok_or_else(|| CostReportError::InvalidAmount {
            value: raw.to_string(),
            context: context(),
        })
}

/// Parse an amount string, accepting the scientific notation Cost Explorer
/// uses for tiny values
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}
