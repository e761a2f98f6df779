//! Export collaborators
//!
//! Exported report files are optionally uploaded to object storage and mailed
//! as attachments. Both are fire-once side effects at the end of a run.

use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Default subject of the report mail
pub const DEFAULT_SUBJECT: &str = "Cost Explorer Report";

/// Default plain-text body of the report mail
pub const DEFAULT_BODY: &str = "Find your Cost Explorer report attached\n\n";

/// Object storage destination for exported files
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `path` under `key`
    async fn upload(&self, path: &Path, key: &str) -> Result<()>;
}

/// Mail transport for the exported files
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<()>;
}

/// A report mail with file attachments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<PathBuf>,
}

impl OutgoingMail {
    /// Report mail with the default subject and body
    ///
    /// `recipients` is the comma-separated list used by the `SES_SEND` setting;
    /// blank entries are ignored.
    pub fn report(from: impl Into<String>, recipients: &str, attachments: Vec<PathBuf>) -> Self {
        Self {
            from: from.into(),
            to: parse_recipients(recipients),
            subject: DEFAULT_SUBJECT.to_string(),
            body: DEFAULT_BODY.to_string(),
            attachments,
        }
    }
}

/// Split a comma-separated recipient list
pub fn parse_recipients(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
