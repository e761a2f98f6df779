//! Filter expressions for billing queries
//!
//! A [`FilterSpec`] is a small expression tree that the billing adapter
//! translates into its native filter type. It is assembled per report from
//! the report's [`RecordScope`], an optional region and an optional set of
//! tag values.
//!
//! # Examples
//!
//! ```
//! use costreport_core::filters::FilterSpec;
//! use costreport_core::types::RecordScope;
//!
//! let filter = FilterSpec::for_request(RecordScope::Standard, Some("us-east-2"), None).unwrap();
//! assert_eq!(
//!     filter.to_string(),
//!     "REGION in [us-east-2] AND NOT (RECORD_TYPE in [Credit, Refund, Upfront, Support])"
//! );
//! ```

use crate::types::{Dimension, RecordKind, RecordScope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical filter expression over billing dimensions and tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterSpec {
    /// All children must match
    And(Vec<FilterSpec>),
    /// Child must not match
    Not(Box<FilterSpec>),
    /// Dimension value is one of `values`
    Dimension {
        key: Dimension,
        values: Vec<String>,
    },
    /// Tag value is one of `values`
    Tags { key: String, values: Vec<String> },
}

/// Tag values a report must carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagConstraint {
    /// Tag key
    pub key: String,
    /// Candidate values; an empty list means "no constraint"
    pub values: Vec<String>,
}

impl FilterSpec {
    /// Leaf matching a dimension against a set of values
    pub fn dimension<I, S>(key: Dimension, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Dimension {
            key,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Negation of `inner`
    pub fn not(inner: FilterSpec) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Conjunction; a single operand is returned unwrapped
    pub fn and(mut operands: Vec<FilterSpec>) -> Self {
        if operands.len() == 1 {
            operands.remove(0)
        } else {
            Self::And(operands)
        }
    }

    /// Record-kind filter for a scope, or `None` for [`RecordScope::Unfiltered`]
    pub fn record_scope(scope: RecordScope) -> Option<Self> {
        let kinds = |kinds: &[RecordKind]| {
            Self::dimension(Dimension::RecordType, kinds.iter().map(|k| k.api_name()))
        };
        match scope {
            RecordScope::Standard => Some(Self::not(kinds(&[
                RecordKind::Credit,
                RecordKind::Refund,
                RecordKind::Upfront,
                RecordKind::Support,
            ]))),
            RecordScope::WithSupport => Some(Self::not(kinds(&[
                RecordKind::Credit,
                RecordKind::Refund,
                RecordKind::Upfront,
            ]))),
            RecordScope::CreditsOnly => Some(kinds(&[RecordKind::Credit])),
            RecordScope::RefundsOnly => Some(kinds(&[RecordKind::Refund])),
            RecordScope::UpfrontOnly => Some(kinds(&[RecordKind::Upfront])),
            RecordScope::Unfiltered => None,
        }
    }

    /// Assemble the filter for one report
    ///
    /// The region leaf comes first, then the record-kind filter, then the tag
    /// leaf. A tag constraint with no candidate values is dropped, and
    /// [`RecordScope::Unfiltered`] ignores the tag constraint entirely. Returns
    /// `None` when nothing constrains the query.
    pub fn for_request(
        scope: RecordScope,
        region: Option<&str>,
        tags: Option<&TagConstraint>,
    ) -> Option<Self> {
        let mut operands = Vec::new();

        if let Some(region) = region {
            operands.push(Self::dimension(Dimension::Region, [region]));
        }
        if let Some(records) = Self::record_scope(scope) {
            operands.push(records);
        }
        let tags = tags.filter(|t| scope != RecordScope::Unfiltered && !t.values.is_empty());
        if let Some(tags) = tags {
            operands.push(Self::Tags {
                key: tags.key.clone(),
                values: tags.values.clone(),
            });
        }

        if operands.is_empty() {
            None
        } else {
            Some(Self::and(operands))
        }
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(operands) => {
                for (i, op) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " AND ")?;
                    }
                    match op {
                        Self::And(_) => write!(f, "({op})")?,
                        _ => write!(f, "{op}")?,
                    }
                }
                Ok(())
            }
            Self::Not(inner) => write!(f, "NOT ({inner})"),
            Self::Dimension { key, values } => write!(f, "{key} in [{}]", values.join(", ")),
            Self::Tags { key, values } => write!(f, "tag:{key} in [{}]", values.join(", ")),
        }
    }
}
