//! Property-based tests for costreport using proptest

use chrono::NaiveDate;
use costreport_core::accounts::AccountDirectory;
use costreport_core::region::{known_regions, match_region};
use costreport_core::table::ReportTable;
use costreport_core::types::{CostRecord, ReportStyle};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashSet};

// Strategies for generating test data

prop_compose! {
    fn arb_record()(
        month in 1u32..=6,
        key in prop::sample::select(vec!["EC2", "S3", "RDS", "Lambda", "CloudFront"]),
        cents in -50_000i64..5_000_000,
    ) -> CostRecord {
        CostRecord::new(
            NaiveDate::from_ymd_opt(2024, month, 1).unwrap(),
            key,
            Decimal::new(cents, 2),
        )
    }
}

fn arb_records() -> impl Strategy<Value = Vec<CostRecord>> {
    prop::collection::vec(arb_record(), 0..60)
}

fn build(records: &[CostRecord], style: ReportStyle) -> ReportTable {
    ReportTable::build(records, &AccountDirectory::default(), style)
}

proptest! {
    #[test]
    fn test_every_row_has_a_value_per_period(records in arb_records()) {
        let table = build(&records, ReportStyle::Total);

        let periods: BTreeSet<_> = records.iter().map(|r| r.period_start).collect();
        prop_assert_eq!(table.periods().len(), periods.len());
        prop_assert!(table.periods().windows(2).all(|w| w[0] < w[1]));
        for row in table.rows() {
            prop_assert_eq!(row.values.len(), table.periods().len());
        }

        let keys: HashSet<_> = records.iter().map(|r| r.group_key.as_str()).collect();
        prop_assert_eq!(table.len(), keys.len());
    }

    #[test]
    fn test_total_cells_sum_records(records in arb_records()) {
        let table = build(&records, ReportStyle::Total);

        for (index, period) in table.periods().iter().enumerate() {
            for row in table.rows() {
                let expected: Decimal = records
                    .iter()
                    .filter(|r| r.period_start == *period && r.group_key == row.key)
                    .map(|r| r.amount)
                    .sum();
                prop_assert_eq!(row.values[index], expected);
            }
        }
    }

    #[test]
    fn test_change_is_difference_of_totals(records in arb_records()) {
        let totals = build(&records, ReportStyle::Total);
        let changes = build(&records, ReportStyle::Change);

        for row in changes.rows() {
            let total = totals.row(row.key.as_str()).unwrap();
            if let Some(first) = row.values.first() {
                prop_assert_eq!(*first, total.values[0]);
            }
            for i in 1..row.values.len() {
                prop_assert_eq!(row.values[i], total.values[i] - total.values[i - 1]);
            }
        }
    }

    #[test]
    fn test_rows_sorted_by_latest_period(
        records in arb_records(),
        style in prop::sample::select(vec![ReportStyle::Total, ReportStyle::Change]),
    ) {
        let table = build(&records, style);
        prop_assert!(table.rows().windows(2).all(|w| w[0].latest() >= w[1].latest()));
    }

    #[test]
    fn test_build_is_deterministic(records in arb_records()) {
        prop_assert_eq!(
            build(&records, ReportStyle::Change),
            build(&records, ReportStyle::Change)
        );
    }

    #[test]
    fn test_classifier_is_total(label in ".{0,40}") {
        if let Some(region) = match_region(&label).region() {
            prop_assert!(known_regions().any(|known| known == region));
        }
    }

    #[test]
    fn test_region_code_prefix_resolves(
        code in prop::sample::select(vec!["USE1", "USW2", "EUW1", "APN1", "SAE1", "CAN1"]),
        rest in "[A-Za-z:.]{1,20}",
    ) {
        let usage_type = format!("{code}-{rest}");
        prop_assert!(match_region(&usage_type).is_resolved());
    }
}
