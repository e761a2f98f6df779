//! Shared test utilities for unit tests
//!
//! In-memory collaborators for the billing API and the account source.
//!
//! Note: Integration tests (in tests/) cannot access this module because it's
//! marked with #[cfg(test)]. Integration tests have their own copy in
//! tests/common/mod.rs.

use crate::accounts::{Account, AccountPage, AccountSource};
use crate::billing::{BillingApi, CostPage, CostQuery, GroupAmount, PeriodResult};
use crate::error::{BillingErrorKind, CostReportError, Result};
use crate::types::TimePeriod;
use async_trait::async_trait;
use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use std::sync::Mutex;

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

#[derive(Default)]
struct BillingState {
    calls: usize,
    tag_calls: usize,
    tokens: Vec<Option<String>>,
    queries: Vec<CostQuery>,
    failures_left: usize,
}

/// Billing API serving canned pages; page `i` links to `page-{i+1}`
pub struct MockBilling {
    pages: Vec<Vec<PeriodResult>>,
    tag_values: Vec<String>,
    failure: BillingErrorKind,
    state: Mutex<BillingState>,
}

impl MockBilling {
    pub fn with_pages(pages: Vec<Vec<PeriodResult>>) -> Self {
        Self {
            pages,
            tag_values: Vec::new(),
            failure: BillingErrorKind::Other,
            state: Mutex::new(BillingState::default()),
        }
    }

    pub fn with_tag_values(mut self, values: Vec<String>) -> Self {
        self.tag_values = values;
        self
    }

    /// Fail the first `count` cost calls with `kind`
    pub fn failing_first(mut self, count: usize, kind: BillingErrorKind) -> Self {
        self.failure = kind;
        self.state.get_mut().unwrap().failures_left = count;
        self
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    /// Number of tag value lookups
    pub fn tag_calls(&self) -> usize {
        self.state.lock().unwrap().tag_calls
    }

    pub fn tokens_seen(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().tokens.clone()
    }

    pub fn queries_seen(&self) -> Vec<CostQuery> {
        self.state.lock().unwrap().queries.clone()
    }
}

#[async_trait]
impl BillingApi for MockBilling {
    async fn cost_and_usage(
        &self,
        query: &CostQuery,
        next_page_token: Option<&str>,
    ) -> Result<CostPage> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(CostReportError::billing(self.failure, "injected failure"));
        }
        state.tokens.push(next_page_token.map(str::to_string));
        state.queries.push(query.clone());

        let index = match next_page_token {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| {
                    CostReportError::billing(BillingErrorKind::InvalidRequest, "bad token")
                })?,
        };
        let results = self.pages.get(index).cloned().unwrap_or_default();
        let next_page_token = (index + 1 < self.pages.len()).then(|| format!("page-{}", index + 1));

        Ok(CostPage {
            results,
            next_page_token,
        })
    }

    async fn tag_values(
        &self,
        _search: &str,
        _period: &TimePeriod,
        _tag_key: &str,
    ) -> Result<Vec<String>> {
        self.state.lock().unwrap().tag_calls += 1;
        Ok(self.tag_values.clone())
    }
}

/// Account source serving canned pages, or failing every call
pub struct MockAccounts {
    pages: Vec<Vec<Account>>,
    fail_with: Option<String>,
    calls: Mutex<usize>,
}

impl MockAccounts {
    pub fn with_pages(pages: Vec<Vec<Account>>) -> Self {
        Self {
            pages,
            fail_with: None,
            calls: Mutex::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            pages: Vec::new(),
            fail_with: Some(reason.to_string()),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl AccountSource for MockAccounts {
    async fn list_accounts_page(&self, next_token: Option<&str>) -> Result<AccountPage> {
        *self.calls.lock().unwrap() += 1;
        if let Some(reason) = &self.fail_with {
            return Err(CostReportError::Accounts(reason.clone()));
        }
        let index = next_token.and_then(|t| t.parse::<usize>().ok()).unwrap_or(0);
        Ok(AccountPage {
            accounts: self.pages.get(index).cloned().unwrap_or_default(),
            next_token: (index + 1 < self.pages.len()).then(|| (index + 1).to_string()),
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
