//! Common test utilities and helpers for costreport tests
//!
//! This module provides in-memory billing and account collaborators plus
//! small builders for period results and report windows.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Months, NaiveDate};
use costreport_core::accounts::{Account, AccountPage, AccountSource};
use costreport_core::billing::{BillingApi, CostPage, CostQuery, GroupAmount, PeriodResult};
use costreport_core::config::{ReportConfig, ReportWindow};
use costreport_core::error::{BillingErrorKind, CostReportError, Result};
use costreport_core::retry::RetryPolicy;
use costreport_core::types::TimePeriod;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Reference date used by every integration test
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

/// Calendar month starting on the first of `month`
pub fn month(year: i32, month: u32) -> TimePeriod {
    let start = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    TimePeriod::new(start, start + Months::new(1)).unwrap()
}

/// Period result with one group per `(key, amount)` pair
pub fn period_result(period: TimePeriod, groups: &[(&str, Decimal)]) -> PeriodResult {
    PeriodResult {
        period,
        total: None,
        groups: groups
            .iter()
            .map(|(key, amount)| GroupAmount {
                keys: vec![key.to_string()],
                amount: *amount,
            })
            .collect(),
    }
}

/// Two-month configuration without retries
pub fn test_config(concurrency: usize) -> ReportConfig {
    let mut config = ReportConfig::new(ReportWindow::ending_on(today(), 2, false).unwrap());
    config.retry = RetryPolicy::none();
    config.concurrency = concurrency;
    config
}

/// Route key of a query: its group-bys joined with commas
fn route(query: &CostQuery) -> String {
    query
        .group_by
        .iter()
        .map(|g| g.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Default)]
struct Route {
    results: Vec<PeriodResult>,
    delay: Option<Duration>,
    failure: Option<BillingErrorKind>,
}

/// Billing API answering by group-by, e.g. `SERVICE` or `tag:team`
///
/// Each route answers with a single page. Unknown routes answer with no
/// results.
#[derive(Default)]
pub struct RoutedBilling {
    routes: HashMap<String, Route>,
    queries: Mutex<Vec<CostQuery>>,
}

impl RoutedBilling {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, route: &str, results: Vec<PeriodResult>) -> Self {
        self.routes.entry(route.to_string()).or_default().results = results;
        self
    }

    /// Delay the answer for `route`
    pub fn delayed(mut self, route: &str, delay: Duration) -> Self {
        self.routes.entry(route.to_string()).or_default().delay = Some(delay);
        self
    }

    /// Fail every call for `route`
    pub fn failing(mut self, route: &str, kind: BillingErrorKind) -> Self {
        self.routes.entry(route.to_string()).or_default().failure = Some(kind);
        self
    }

    pub fn queries(&self) -> Vec<CostQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl BillingApi for RoutedBilling {
    async fn cost_and_usage(
        &self,
        query: &CostQuery,
        _next_page_token: Option<&str>,
    ) -> Result<CostPage> {
        self.queries.lock().unwrap().push(query.clone());

        let Some(route) = self.routes.get(&route(query)) else {
            return Ok(CostPage::default());
        };
        if let Some(delay) = route.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(kind) = route.failure {
            return Err(CostReportError::billing(kind, "injected failure"));
        }
        Ok(CostPage {
            results: route.results.clone(),
            next_page_token: None,
        })
    }

    async fn tag_values(
        &self,
        _search: &str,
        _period: &TimePeriod,
        _tag_key: &str,
    ) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Account source with one page, or failing every call
pub struct StaticAccounts {
    accounts: Vec<Account>,
    fail_with: Option<String>,
}

impl StaticAccounts {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self {
            accounts,
            fail_with: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            accounts: Vec::new(),
            fail_with: Some(reason.to_string()),
        }
    }
}

#[async_trait]
impl AccountSource for StaticAccounts {
    async fn list_accounts_page(&self, _next_token: Option<&str>) -> Result<AccountPage> {
        if let Some(reason) = &self.fail_with {
            return Err(CostReportError::Accounts(reason.clone()));
        }
        Ok(AccountPage {
            accounts: self.accounts.clone(),
            next_token: None,
        })
    }
}

/// Account with both label fields set
pub fn account(id: &str, name: &str, email: &str) -> Account {
    Account {
        id: id.to_string(),
        name: Some(name.to_string()),
        email: Some(email.to_string()),
    }
}
