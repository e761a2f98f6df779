//! Region classifier
//!
//! Usage-type labels usually start with a short region code (`USE1-`,
//! `EUW2-`), but several services omit it. Classification walks two ordered
//! rule tables and the first match wins:
//!
//! 1. [`REGION_CODES`]: a label starting with a short code or its full region
//!    name resolves to that region.
//! 2. [`FALLBACK_RULES`]: patterns for code-less labels, all billed in
//!    `us-east-1`.
//!
//! Anything else is [`RegionMatch::Unresolved`]. Unresolved labels are never
//! mapped to a default region.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// Short code → region, in evaluation order
///
/// The bare `EU` code must stay last so it cannot shadow the `EU*` codes.
pub const REGION_CODES: [(&str, &str); 17] = [
    ("USW1", "us-west-1"),
    ("USW2", "us-west-2"),
    ("USE1", "us-east-1"),
    ("USE2", "us-east-2"),
    ("EUN1", "eu-north-1"),
    ("APS3", "ap-south-1"),
    ("EUW3", "eu-west-3"),
    ("EUW2", "eu-west-2"),
    ("EUW1", "eu-west-1"),
    ("APN2", "ap-northeast-2"),
    ("APN1", "ap-northeast-1"),
    ("SAE1", "sa-east-1"),
    ("CAN1", "ca-central-1"),
    ("APS1", "ap-southeast-1"),
    ("APS2", "ap-southeast-2"),
    ("EUC1", "eu-central-1"),
    ("EU", "eu-north-1"),
];

/// Region implied by every fallback rule
pub const FALLBACK_REGION: &str = "us-east-1";

/// How a fallback rule matches a label
#[derive(Debug)]
pub enum Pattern {
    /// Regex anchored at the start of the label
    Regex(Regex),
    /// Literal prefix
    Prefix(&'static str),
}

impl Pattern {
    fn matches(&self, label: &str) -> bool {
        match self {
            Self::Regex(re) => re.is_match(label),
            Self::Prefix(prefix) => label.starts_with(prefix),
        }
    }
}

/// A fallback rule for labels without a region code
#[derive(Debug)]
pub struct FallbackRule {
    /// Short description used in diagnostics
    pub name: &'static str,
    pub pattern: Pattern,
    pub region: &'static str,
}

fn regex_rule(name: &'static str, pattern: &str) -> FallbackRule {
    FallbackRule {
        name,
        // Patterns are compile-time constants covered by the fixture tests
        pattern: Pattern::Regex(Regex::new(pattern).expect("valid fallback pattern")),
        region: FALLBACK_REGION,
    }
}

fn prefix_rule(prefix: &'static str) -> FallbackRule {
    FallbackRule {
        name: prefix,
        pattern: Pattern::Prefix(prefix),
        region: FALLBACK_REGION,
    }
}

/// Fallback rules, in evaluation order
pub static FALLBACK_RULES: Lazy<Vec<FallbackRule>> = Lazy::new(|| {
    vec![
        regex_rule("compute instance", r"^(Box|Instance|Node|Heavy)Usage"),
        regex_rule(
            "relational storage",
            r"^(RDS:)?(Multi-AZ)?(Usage:db|-?GP2|-?PIOPS|StorageUsag)",
        ),
        regex_rule("block storage", r"^EBS(Optimized)?:"),
        regex_rule("media transcoding", r"^ets-(hd|sd|audio)-"),
        prefix_rule("agent-assessment"),
        prefix_rule("Storage-ShardHour"),
        prefix_rule("Lambda-GB-Second"),
    ]
});

/// Outcome of classifying one label
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RegionMatch {
    /// One of the known region codes
    Resolved(&'static str),
    /// No rule matched
    Unresolved,
}

impl RegionMatch {
    pub fn region(self) -> Option<&'static str> {
        match self {
            Self::Resolved(region) => Some(region),
            Self::Unresolved => None,
        }
    }

    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

impl fmt::Display for RegionMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(region) => f.write_str(region),
            Self::Unresolved => f.write_str("unresolved"),
        }
    }
}

/// Classify a label without logging
pub fn match_region(label: &str) -> RegionMatch {
    for (code, region) in REGION_CODES {
        if label.starts_with(code) || label.starts_with(region) {
            return RegionMatch::Resolved(region);
        }
    }

    FALLBACK_RULES
        .iter()
        .find(|rule| rule.pattern.matches(label))
        .map_or(RegionMatch::Unresolved, |rule| RegionMatch::Resolved(rule.region))
}

/// Classify a usage-type label, logging unresolved labels
///
/// # Examples
/// ```
/// use costreport_core::region::{classify, RegionMatch};
///
/// assert_eq!(classify("USE1-BoxUsage:m5.large"), RegionMatch::Resolved("us-east-1"));
/// assert_eq!(classify("RandomVendorSKU-42"), RegionMatch::Unresolved);
/// ```
pub fn classify(label: &str) -> RegionMatch {
    let result = match_region(label);
    if !result.is_resolved() {
        warn!(label, "Could not regionalize usage type");
    }
    result
}

/// Every region code the classifier can return
pub fn known_regions() -> impl Iterator<Item = &'static str> {
    REGION_CODES.iter().map(|(_, region)| *region)
}
