//! Error types for costreport
//!
//! This module defines the error types used throughout the costreport library.
//! All errors are derived from `thiserror` for convenient error handling
//! and automatic `From` implementations.
//!
//! # Example
//!
//! ```
//! use costreport_core::error::{CostReportError, Result};
//!
//! fn example_function() -> Result<()> {
//!     // This will automatically convert io::Error to CostReportError
//!     let _file = std::fs::read_to_string("nonexistent.txt")?;
//!     Ok(())
//! }
//! ```

use std::fmt;
use thiserror::Error;

/// Classification of a failure reported by the billing collaborator
///
/// Drives the retry policy: only `Throttled` and `Unavailable` are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingErrorKind {
    /// Request rate exceeded (e.g. `LimitExceededException`)
    Throttled,
    /// Transient service or network failure, including timeouts
    Unavailable,
    /// Caller lacks permission for the operation
    AccessDenied,
    /// Malformed request: bad filter, bad token, bad date range
    InvalidRequest,
    /// Anything else
    Other,
}

impl BillingErrorKind {
    /// Whether a request failing with this kind may succeed if repeated
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Throttled | Self::Unavailable)
    }
}

impl fmt::Display for BillingErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Throttled => "throttled",
            Self::Unavailable => "unavailable",
            Self::AccessDenied => "access denied",
            Self::InvalidRequest => "invalid request",
            Self::Other => "error",
        };
        f.write_str(name)
    }
}

/// Main error type for costreport operations
#[derive(Error, Debug)]
pub enum CostReportError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The billing API rejected or failed a request
    #[error("Billing API {kind}: {message}")]
    Billing {
        /// Failure classification
        kind: BillingErrorKind,
        /// Collaborator-supplied detail
        message: String,
    },

    /// The account listing failed
    #[error("Account listing failed: {0}")]
    Accounts(String),

    /// A collaborator call exceeded the per-request timeout
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        /// Operation name
        operation: String,
        /// Configured timeout
        seconds: u64,
    },

    /// An amount returned by the billing API could not be parsed
    #[error("Invalid amount '{value}' for {context}")]
    InvalidAmount {
        /// Raw amount string
        value: String,
        /// Which period/group carried it
        context: String,
    },

    /// Invalid time period
    #[error("Invalid time period: {0}")]
    InvalidPeriod(String),

    /// Invalid date format
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Export or delivery failure
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

impl CostReportError {
    /// Shorthand for a billing error
    pub fn billing(kind: BillingErrorKind, message: impl Into<String>) -> Self {
        Self::Billing {
            kind,
            message: message.into(),
        }
    }

    /// Whether the retry policy should repeat the failed call
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Billing { kind, .. } => kind.is_retryable(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}

/// Convenience type alias for Results in costreport
pub type Result<T> = std::result::Result<T, CostReportError>;
