//! AWS adapters for costreport
//!
//! This crate implements the core collaborator traits on top of the AWS SDK:
//! Cost Explorer for billing data, Organizations for account labels, S3 for
//! report upload and SES for mail delivery.

pub mod cost_explorer;
pub mod error;
pub mod organizations;
pub mod s3;
pub mod ses;

pub use cost_explorer::CostExplorerBilling;
pub use error::AwsAdapterError;
pub use organizations::OrganizationsAccounts;
pub use s3::S3ObjectStore;
pub use ses::SesMailer;

/// Region hosting the global billing and organizations endpoints
pub const BILLING_REGION: &str = "us-east-1";

/// Load shared AWS configuration pinned to `region`
pub async fn load_config(region: &str) -> aws_config::SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .load()
        .await
}
