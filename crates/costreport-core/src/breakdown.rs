//! Regional breakdown of a usage-type table
//!
//! Sums one period of a usage-type report per classified region. Labels the
//! classifier cannot place are returned separately instead of being folded
//! into a region. [`BreakdownThresholds`] decides which cells are too small
//! to count.

use crate::region::{RegionMatch, classify};
use crate::table::ReportTable;
use crate::types::GroupKey;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Smallest cell amount included in a breakdown by default
pub const DEFAULT_MIN_AMOUNT: Decimal = Decimal::ONE;

/// Suffix of usage types metered in bytes
pub const BYTES_SUFFIX: &str = "Bytes";

/// Threshold for byte-metered usage types in per-region breakdowns (10^9)
pub const DEFAULT_MIN_BYTES_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Cells a breakdown skips
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakdownThresholds {
    /// Cells below this amount are skipped
    pub min_amount: Decimal,
    /// When set, usage types ending in [`BYTES_SUFFIX`] below this amount are
    /// skipped as well
    pub min_bytes_amount: Option<Decimal>,
}

impl Default for BreakdownThresholds {
    fn default() -> Self {
        Self {
            min_amount: DEFAULT_MIN_AMOUNT,
            min_bytes_amount: None,
        }
    }
}

impl BreakdownThresholds {
    /// Thresholds used for the per-region usage reports
    pub fn per_region() -> Self {
        Self {
            min_bytes_amount: Some(DEFAULT_MIN_BYTES_AMOUNT),
            ..Self::default()
        }
    }

    /// Keep nothing out
    pub fn none() -> Self {
        Self {
            min_amount: Decimal::MIN,
            min_bytes_amount: None,
        }
    }

    fn skips(&self, label: &str, amount: Decimal) -> bool {
        if amount < self.min_amount {
            return true;
        }
        match self.min_bytes_amount {
            Some(min) => label.ends_with(BYTES_SUFFIX) && amount < min,
            None => false,
        }
    }
}

/// Per-region totals for one period
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegionalBreakdown {
    pub by_region: BTreeMap<&'static str, Decimal>,
    pub unresolved: Vec<(GroupKey, Decimal)>,
}

impl RegionalBreakdown {
    /// Sum of the unresolved amounts
    pub fn unresolved_total(&self) -> Decimal {
        self.unresolved.iter().map(|(_, amount)| *amount).sum()
    }

    /// Sum over resolved regions
    pub fn resolved_total(&self) -> Decimal {
        self.by_region.values().copied().sum()
    }
}

/// Break down column `period_index` of `table` by region
///
/// Cells caught by `thresholds` are skipped. An out-of-range index yields an
/// empty breakdown.
pub fn regional_breakdown(
    table: &ReportTable,
    period_index: usize,
    thresholds: &BreakdownThresholds,
) -> RegionalBreakdown {
    let mut breakdown = RegionalBreakdown::default();

    for row in table.rows() {
        let Some(amount) = row.values.get(period_index).copied() else {
            continue;
        };
        if thresholds.skips(row.key.as_str(), amount) {
            continue;
        }
        match classify(row.key.as_str()) {
            RegionMatch::Resolved(region) => {
                *breakdown.by_region.entry(region).or_insert(Decimal::ZERO) += amount;
            }
            RegionMatch::Unresolved => breakdown.unresolved.push((row.key.clone(), amount)),
        }
    }

    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::AccountDirectory;
    use crate::types::{CostRecord, ReportStyle};
    use chrono::NaiveDate;
    use rust_decimal::dec;

    fn usage_table() -> ReportTable {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let records = vec![
            CostRecord::new(jan, "USE1-BoxUsage:m5.large", dec!(40)),
            CostRecord::new(jan, "BoxUsage:t3.micro", dec!(2.5)),
            CostRecord::new(jan, "EUW2-DataTransfer-Out-Bytes", dec!(7)),
            CostRecord::new(jan, "RandomVendorSKU-42", dec!(3)),
            CostRecord::new(jan, "USW2-Requests-Tier1", dec!(0.4)),
        ];
        ReportTable::build(&records, &AccountDirectory::default(), ReportStyle::Total)
    }

    #[test]
    fn test_sums_per_region_and_surfaces_unresolved() {
        let breakdown = regional_breakdown(&usage_table(), 0, &BreakdownThresholds::default());

        assert_eq!(breakdown.by_region.get("us-east-1"), Some(&dec!(42.5)));
        assert_eq!(breakdown.by_region.get("eu-west-2"), Some(&dec!(7)));
        assert_eq!(
            breakdown.unresolved,
            vec![(GroupKey::new("RandomVendorSKU-42"), dec!(3))]
        );
        assert_eq!(breakdown.resolved_total(), dec!(49.5));
        assert_eq!(breakdown.unresolved_total(), dec!(3));
    }

    #[test]
    fn test_small_amounts_skipped() {
        let breakdown = regional_breakdown(&usage_table(), 0, &BreakdownThresholds::default());
        assert!(!breakdown.by_region.contains_key("us-west-2"));

        let everything = regional_breakdown(&usage_table(), 0, &BreakdownThresholds::none());
        assert_eq!(everything.by_region.get("us-west-2"), Some(&dec!(0.4)));
    }

    #[test]
    fn test_per_region_thresholds_skip_small_byte_usage() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let records = vec![
            CostRecord::new(jan, "EUW2-DataTransfer-Out-Bytes", dec!(7)),
            CostRecord::new(jan, "EUW2-TimedStorage-Bytes", dec!(2000000000)),
            CostRecord::new(jan, "EUW2-BoxUsage:m5.large", dec!(12)),
        ];
        let table = ReportTable::build(&records, &AccountDirectory::default(), ReportStyle::Total);

        let breakdown = regional_breakdown(&table, 0, &BreakdownThresholds::per_region());
        assert_eq!(breakdown.by_region.get("eu-west-2"), Some(&dec!(2000000012)));

        let breakdown = regional_breakdown(&table, 0, &BreakdownThresholds::default());
        assert_eq!(breakdown.by_region.get("eu-west-2"), Some(&dec!(2000000019)));
    }

    #[test]
    fn test_out_of_range_period_is_empty() {
        let breakdown = regional_breakdown(&usage_table(), 5, &BreakdownThresholds::default());
        assert_eq!(breakdown, RegionalBreakdown::default());
    }
}
