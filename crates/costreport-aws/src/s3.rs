//! S3 upload of exported reports

use crate::error::AwsAdapterError;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use costreport_core::delivery::ObjectStore;
use costreport_core::error::{CostReportError, Result};
use std::path::Path;
use tracing::{error, info};

/// [`ObjectStore`] writing into one S3 bucket
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Client using the default credential chain and region
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config), bucket)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(&self, path: &Path, key: &str) -> Result<()> {
        let content = tokio::fs::read(path).await?;
        let size = content.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(content))
            .send()
            .await
            .map_err(|e| {
                let err = AwsAdapterError::from_sdk("PutObject", e);
                error!(error = %err, "Failed to upload to S3");
                CostReportError::Delivery(err.to_string())
            })?;

        info!(key, size, bucket = %self.bucket, "Report uploaded to S3");
        Ok(())
    }
}
