//! AWS Organizations account source

use crate::error::AwsAdapterError;
use async_trait::async_trait;
use aws_sdk_organizations::Client;
use costreport_core::accounts::{Account, AccountPage, AccountSource};
use costreport_core::error::{CostReportError, Result};

/// [`AccountSource`] listing the accounts of the caller's organization
pub struct OrganizationsAccounts {
    client: Client,
}

impl OrganizationsAccounts {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Client using the default credential chain in the organizations region
    pub async fn from_env() -> Self {
        let config = crate::load_config(crate::BILLING_REGION).await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl AccountSource for OrganizationsAccounts {
    async fn list_accounts_page(&self, next_token: Option<&str>) -> Result<AccountPage> {
        let response = self
            .client
            .list_accounts()
            .set_next_token(next_token.map(str::to_string))
            .send()
            .await
            .map_err(|e| {
                CostReportError::Accounts(AwsAdapterError::from_sdk("ListAccounts", e).to_string())
            })?;

        let accounts = response
            .accounts()
            .iter()
            .filter_map(|account| {
                Some(Account {
                    id: account.id()?.to_string(),
                    name: account.name().map(str::to_string),
                    email: account.email().map(str::to_string),
                })
            })
            .collect();

        Ok(AccountPage {
            accounts,
            next_token: response.next_token().map(str::to_string),
        })
    }
}
