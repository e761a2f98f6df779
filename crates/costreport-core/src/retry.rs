//! Bounded retry with exponential backoff for billing calls.
//!
//! Throttling and transient failures (including per-request timeouts) are
//! retried; access-denied and malformed-request errors are returned on the
//! first attempt.

use crate::error::{CostReportError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry and timeout settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not including the initial request)
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay in milliseconds
    pub max_delay_ms: u64,
    /// Multiplier applied per attempt
    pub backoff_multiplier: f64,
    /// Per-request timeout in seconds; 0 disables the timeout
    pub request_timeout_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            request_timeout_secs: 60,
        }
    }
}

impl RetryPolicy {
    /// Policy that makes exactly one attempt
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = (self.initial_delay_ms as f64) * self.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    fn timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

/// Execute `make_request` under the policy.
///
/// Returns the first success, the first non-retryable error, or the last
/// error once retries are exhausted.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, make_request: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_retries + 1;

    for attempt in 0..max_attempts {
        let result = match policy.timeout() {
            Some(limit) => tokio::time::timeout(limit, make_request())
                .await
                .unwrap_or_else(|_| {
                    Err(CostReportError::Timeout {
                        operation: operation.to_string(),
                        seconds: policy.request_timeout_secs,
                    })
                }),
            None => make_request().await,
        };

        match result {
            Ok(value) => {
                if attempt > 0 {
                    debug!(operation, attempt = attempt + 1, "Request succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) if error.is_retryable() && attempt + 1 < max_attempts => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    operation,
                    error = %error,
                    attempt = attempt + 1,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Retryable error, will retry after delay"
                );
                tokio::time::sleep(delay).await;
            }
            Err(error) => {
                if attempt > 0 {
                    warn!(
                        operation,
                        error = %error,
                        attempts = attempt + 1,
                        "Request failed after all retry attempts"
                    );
                }
                return Err(error);
            }
        }
    }

    unreachable!("retry loop returns on the final attempt")
}
