//! Error mapping from AWS SDK failures into core errors

use aws_sdk_costexplorer::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use costreport_core::error::{BillingErrorKind, CostReportError};
use std::fmt;
use thiserror::Error;

/// Failure inside an AWS adapter
#[derive(Error, Debug)]
pub enum AwsAdapterError {
    /// The service answered with an error code
    #[error("{operation} failed with {code}: {message}")]
    Service {
        operation: &'static str,
        code: String,
        message: String,
    },

    /// The request never got a service answer (timeout, connection, DNS)
    #[error("{operation} could not reach AWS: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    /// A request or response could not be built or read
    #[error("{operation}: {message}")]
    Malformed {
        operation: &'static str,
        message: String,
    },

    /// The outgoing mail could not be assembled
    #[error("Invalid mail: {0}")]
    Mail(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AwsAdapterError {
    /// Classify an SDK error from any AWS service client
    pub fn from_sdk<E, R>(operation: &'static str, err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: fmt::Debug,
    {
        match &err {
            SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => Self::Transport {
                operation,
                message: DisplayErrorContext(&err).to_string(),
            },
            _ => Self::Service {
                operation,
                code: err.code().unwrap_or("Unknown").to_string(),
                message: err
                    .message()
                    .map(str::to_string)
                    .unwrap_or_else(|| DisplayErrorContext(&err).to_string()),
            },
        }
    }

    /// Malformed-data shorthand
    pub fn malformed(operation: &'static str, message: impl fmt::Display) -> Self {
        Self::Malformed {
            operation,
            message: message.to_string(),
        }
    }

    /// Retry classification of this failure
    pub fn billing_kind(&self) -> BillingErrorKind {
        match self {
            Self::Service { code, .. } => kind_for_code(code),
            Self::Transport { .. } => BillingErrorKind::Unavailable,
            Self::Malformed { .. } => BillingErrorKind::InvalidRequest,
            Self::Mail(_) | Self::Io(_) => BillingErrorKind::Other,
        }
    }
}

/// Map an AWS error code to a billing error kind
pub fn kind_for_code(code: &str) -> BillingErrorKind {
    match code {
        "LimitExceededException"
        | "ThrottlingException"
        | "Throttling"
        | "TooManyRequestsException"
        | "RequestLimitExceeded" => BillingErrorKind::Throttled,
        "ServiceUnavailable"
        | "ServiceUnavailableException"
        | "InternalServerError"
        | "InternalFailure"
        | "ServiceException" => BillingErrorKind::Unavailable,
        "AccessDeniedException" | "AccessDenied" | "UnauthorizedOperation"
        | "UnrecognizedClientException" => BillingErrorKind::AccessDenied,
        "ValidationException"
        | "InvalidNextTokenException"
        | "DataUnavailableException"
        | "BillExpirationException"
        | "RequestChangedException" => BillingErrorKind::InvalidRequest,
        _ => BillingErrorKind::Other,
    }
}

impl From<AwsAdapterError> for CostReportError {
    fn from(err: AwsAdapterError) -> Self {
        CostReportError::billing(err.billing_kind(), err.to_string())
    }
}
