//! Report table builder
//!
//! Pivots flat [`CostRecord`]s into a [`ReportTable`]: one column per billing
//! period in chronological order, one row per group key, every cell present.
//!
//! Building runs in fixed steps:
//!
//! 1. group keys that are account ids are replaced by their directory label
//! 2. records are pivoted; missing cells become zero and records landing on the
//!    same cell are summed
//! 3. for [`ReportStyle::Change`], each period after the first becomes the
//!    delta against the previous period's total (the first period keeps its
//!    raw total as baseline)
//! 4. rows are stably sorted descending by the most recent period
//!
//! # Examples
//!
//! ```
//! use costreport_core::accounts::AccountDirectory;
//! use costreport_core::table::ReportTable;
//! use costreport_core::types::{CostRecord, ReportStyle};
//! use chrono::NaiveDate;
//! use rust_decimal::dec;
//!
//! let jan = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let feb = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
//! let records = vec![
//!     CostRecord::new(jan, "EC2", dec!(100)),
//!     CostRecord::new(feb, "EC2", dec!(150)),
//!     CostRecord::new(feb, "S3", dec!(20)),
//! ];
//!
//! let table = ReportTable::build(&records, &AccountDirectory::default(), ReportStyle::Change);
//! assert_eq!(table.row("EC2").unwrap().values, vec![dec!(100), dec!(50)]);
//! assert_eq!(table.row("S3").unwrap().values, vec![dec!(0), dec!(20)]);
//! ```

use crate::accounts::AccountDirectory;
use crate::types::{CostRecord, GroupKey, ReportStyle};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// One row of a report: a group key and one value per period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub key: GroupKey,
    pub values: Vec<Decimal>,
}

impl TableRow {
    /// Value in the most recent period
    pub fn latest(&self) -> Decimal {
        self.values.last().copied().unwrap_or(Decimal::ZERO)
    }

    /// Sum over all periods
    pub fn sum(&self) -> Decimal {
        self.values.iter().copied().sum()
    }
}

/// Time-indexed, group-keyed cost table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTable {
    periods: Vec<NaiveDate>,
    rows: Vec<TableRow>,
}

impl ReportTable {
    /// Build a table from records
    pub fn build(records: &[CostRecord], accounts: &AccountDirectory, style: ReportStyle) -> Self {
        let mut table = Self::pivot(records, accounts);
        if style == ReportStyle::Change {
            table.derive_changes();
        }
        table.sort_by_latest();
        table
    }

    fn pivot(records: &[CostRecord], accounts: &AccountDirectory) -> Self {
        let periods: Vec<NaiveDate> = records
            .iter()
            .map(|r| r.period_start)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let column: HashMap<NaiveDate, usize> =
            periods.iter().enumerate().map(|(i, p)| (*p, i)).collect();

        let mut rows: Vec<TableRow> = Vec::new();
        let mut row_index: HashMap<GroupKey, usize> = HashMap::new();

        for record in records {
            let key = GroupKey::new(accounts.relabel(record.group_key.as_str()));
            let row = *row_index.entry(key.clone()).or_insert_with(|| {
                rows.push(TableRow {
                    key,
                    values: vec![Decimal::ZERO; periods.len()],
                });
                rows.len() - 1
            });

            let row = &mut rows[row];
            let col = column[&record.period_start];
            let sum = row.values[col].checked_add(record.amount).unwrap_or_else(|| {
                warn!(
                    key = %row.key,
                    period = %record.period_start,
                    "Cell overflowed while summing; using 0"
                );
                Decimal::ZERO
            });
            row.values[col] = sum;
        }

        Self { periods, rows }
    }

    fn derive_changes(&mut self) {
        for row in &mut self.rows {
            let totals = row.values.clone();
            for (i, window) in totals.windows(2).enumerate() {
                let [previous, current] = [window[0], window[1]];
                let change = current.checked_sub(previous).unwrap_or_else(|| {
                    warn!(
                        key = %row.key,
                        period = %self.periods[i + 1],
                        "Change overflowed; using 0"
                    );
                    Decimal::ZERO
                });
                row.values[i + 1] = change;
            }
        }
    }

    fn sort_by_latest(&mut self) {
        // sort_by is stable: ties keep first-appearance order
        self.rows.sort_by(|a, b| b.latest().cmp(&a.latest()));
    }

    /// Period start dates, chronological
    pub fn periods(&self) -> &[NaiveDate] {
        &self.periods
    }

    /// Rows, descending by the most recent period
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Look up a row by key
    pub fn row(&self, key: &str) -> Option<&TableRow> {
        self.rows.iter().find(|r| r.key.as_str() == key)
    }

    /// Most recent period start
    pub fn latest_period(&self) -> Option<NaiveDate> {
        self.periods.last().copied()
    }

    /// Value at `(key, period_index)`
    pub fn cell(&self, key: &str, period_index: usize) -> Option<Decimal> {
        self.row(key).and_then(|r| r.values.get(period_index).copied())
    }

    /// Column sums, one per period
    pub fn column_totals(&self) -> Vec<Decimal> {
        let mut totals = vec![Decimal::ZERO; self.periods.len()];
        for row in &self.rows {
            for (total, value) in totals.iter_mut().zip(&row.values) {
                *total = total.saturating_add(*value);
            }
        }
        totals
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
