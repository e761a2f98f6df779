//! Account directory
//!
//! Maps opaque account ids to human-readable labels so that reports grouped
//! by linked account show names instead of twelve-digit ids. The directory is
//! loaded once per run and is best-effort: a failed listing produces
//! [`AccountLoad::Degraded`] and the run continues with raw ids.

use crate::config::AccountLabelField;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// One account as reported by the account source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Account {
    /// The attribute selected as display label
    pub fn label(&self, field: AccountLabelField) -> Option<&str> {
        match field {
            AccountLabelField::Name => self.name.as_deref(),
            AccountLabelField::Email => self.email.as_deref(),
        }
    }
}

/// One page of an account listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountPage {
    pub accounts: Vec<Account>,
    /// Present while more pages remain
    pub next_token: Option<String>,
}

/// Paginated source of account metadata
#[async_trait]
pub trait AccountSource: Send + Sync {
    /// Fetch one page of accounts
    async fn list_accounts_page(&self, next_token: Option<&str>) -> Result<AccountPage>;
}

/// Read-only account id → label mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountDirectory {
    labels: HashMap<String, String>,
}

/// Outcome of loading the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountLoad {
    /// Full listing succeeded
    Loaded(AccountDirectory),
    /// Listing failed; reports fall back to raw account ids
    Degraded { reason: String },
}

impl AccountLoad {
    /// The usable directory, empty when degraded
    ///
    /// Logs the degradation so it is never silent.
    pub fn into_directory(self) -> AccountDirectory {
        match self {
            Self::Loaded(directory) => directory,
            Self::Degraded { reason } => {
                warn!(%reason, "Getting account names failed; using raw account ids");
                AccountDirectory::default()
            }
        }
    }

    /// Whether the listing failed
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

impl AccountDirectory {
    /// Build a directory from accounts, labelling each with `field`
    ///
    /// Accounts missing the selected attribute are left out, so their ids
    /// pass through unchanged.
    pub fn from_accounts<'a>(
        accounts: impl IntoIterator<Item = &'a Account>,
        field: AccountLabelField,
    ) -> Self {
        let labels = accounts
            .into_iter()
            .filter_map(|account| {
                account
                    .label(field)
                    .map(|label| (account.id.clone(), label.to_string()))
            })
            .collect();
        Self { labels }
    }

    /// Load every page from `source`
    pub async fn load(source: &dyn AccountSource, field: AccountLabelField) -> AccountLoad {
        match Self::fetch_all(source).await {
            Ok(accounts) => {
                debug!(count = accounts.len(), "Loaded account directory");
                AccountLoad::Loaded(Self::from_accounts(&accounts, field))
            }
            Err(e) => AccountLoad::Degraded {
                reason: e.to_string(),
            },
        }
    }

    async fn fetch_all(source: &dyn AccountSource) -> Result<Vec<Account>> {
        let mut accounts = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let page = source.list_accounts_page(next_token.as_deref()).await?;
            accounts.extend(page.accounts);
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => return Ok(accounts),
            }
        }
    }

    /// Label for an account id
    pub fn label(&self, account_id: &str) -> Option<&str> {
        self.labels.get(account_id).map(String::as_str)
    }

    /// Label for `key` if it is a known account id, otherwise `key` itself
    pub fn relabel<'a>(&'a self, key: &'a str) -> &'a str {
        self.label(key).unwrap_or(key)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
