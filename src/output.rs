//! Output formatting for costreport
//!
//! This module renders finished reports for the terminal:
//! - Table format for human-readable output
//! - JSON format for machine-readable output and integration with other tools
//!
//! # Examples
//!
//! ```
//! use costreport::output::get_formatter;
//! use costreport_core::accounts::AccountDirectory;
//! use costreport_core::registry::Report;
//! use costreport_core::table::ReportTable;
//! use costreport_core::types::{CostRecord, ReportStyle};
//! use chrono::NaiveDate;
//! use rust_decimal::dec;
//!
//! let jan = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let records = vec![CostRecord::new(jan, "EC2", dec!(100))];
//! let table = ReportTable::build(&records, &AccountDirectory::default(), ReportStyle::Total);
//! let report = Report::new("Services", ReportStyle::Total, table);
//!
//! let formatter = get_formatter(true);
//! assert!(formatter.format_report(&report).contains("\"Services\""));
//! ```

use chrono::{Datelike, NaiveDate};
use colored::Colorize;
use costreport_core::breakdown::RegionalBreakdown;
use costreport_core::region::RegionMatch;
use costreport_core::registry::{Report, ReportRegistry};
use costreport_core::types::ReportStyle;
use prettytable::{Cell, Row, Table, format, row};
use rust_decimal::Decimal;
use serde_json::json;

/// Trait for output formatters
pub trait OutputFormatter {
    /// Format one report
    fn format_report(&self, report: &Report) -> String;

    /// Format every report of a registry, in order
    fn format_registry(&self, registry: &ReportRegistry) -> String;

    /// Format a regional breakdown
    fn format_breakdown(&self, title: &str, breakdown: &RegionalBreakdown) -> String;

    /// Format label classifications
    fn format_classifications(&self, results: &[(String, RegionMatch)]) -> String;
}

/// Table formatter for human-readable output
pub struct TableFormatter;

impl TableFormatter {
    /// Format currency with dollar sign
    fn format_currency(amount: Decimal) -> String {
        let rounded = amount.round_dp(2);
        if rounded.is_sign_negative() && !rounded.is_zero() {
            format!("-${:.2}", rounded.abs())
        } else {
            format!("${:.2}", rounded.abs())
        }
    }

    /// Column titles: `YYYY-MM` for monthly periods, full dates otherwise
    fn period_titles(periods: &[NaiveDate]) -> Vec<String> {
        let pattern = if periods.iter().all(|p| p.day() == 1) {
            "%Y-%m"
        } else {
            "%Y-%m-%d"
        };
        periods.iter().map(|p| p.format(pattern).to_string()).collect()
    }

    fn value_cell(amount: Decimal, style: ReportStyle, is_baseline: bool) -> Cell {
        let cell = Cell::new(&Self::format_currency(amount));
        if style == ReportStyle::Change && !is_baseline {
            if amount > Decimal::ZERO {
                return cell.style_spec("rFr");
            } else if amount < Decimal::ZERO {
                return cell.style_spec("rFg");
            }
        }
        cell.style_spec("r")
    }
}

impl OutputFormatter for TableFormatter {
    fn format_report(&self, report: &Report) -> String {
        let table_data = &report.table;
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);

        let mut titles = vec![Cell::new("Key").style_spec("b")];
        titles.extend(
            Self::period_titles(table_data.periods())
                .iter()
                .map(|title| Cell::new(title).style_spec("bc")),
        );
        table.set_titles(Row::new(titles));

        for data_row in table_data.rows() {
            let mut cells = vec![Cell::new(data_row.key.as_str())];
            cells.extend(
                data_row
                    .values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| Self::value_cell(*v, report.style, i == 0)),
            );
            table.add_row(Row::new(cells));
        }

        let mut totals = vec![Cell::new("TOTAL").style_spec("b")];
        totals.extend(
            table_data
                .column_totals()
                .into_iter()
                .map(|t| Cell::new(&Self::format_currency(t)).style_spec("br")),
        );
        table.add_row(Row::new(totals));

        format!(
            "{} ({})\n{}",
            report.name.bold(),
            report.style,
            table
        )
    }

    fn format_registry(&self, registry: &ReportRegistry) -> String {
        registry
            .iter()
            .map(|report| self.format_report(report))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn format_breakdown(&self, title: &str, breakdown: &RegionalBreakdown) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(row![b -> "Region", b -> "Cost"]);

        for (region, amount) in &breakdown.by_region {
            table.add_row(row![region, r -> Self::format_currency(*amount)]);
        }
        table.add_row(row![b -> "TOTAL", br -> Self::format_currency(breakdown.resolved_total())]);

        let mut output = format!("{}\n{}", title.bold(), table);
        if !breakdown.unresolved.is_empty() {
            output.push_str(&format!(
                "{} {} usage types ({}) could not be placed in a region:\n",
                "warning:".yellow().bold(),
                breakdown.unresolved.len(),
                Self::format_currency(breakdown.unresolved_total())
            ));
            for (key, amount) in &breakdown.unresolved {
                output.push_str(&format!("  {key}: {}\n", Self::format_currency(*amount)));
            }
        }
        output
    }

    fn format_classifications(&self, results: &[(String, RegionMatch)]) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(row![b -> "Usage type", b -> "Region"]);

        for (label, region) in results {
            let region_cell = match region {
                RegionMatch::Resolved(code) => Cell::new(code),
                RegionMatch::Unresolved => Cell::new("unresolved").style_spec("Fy"),
            };
            table.add_row(Row::new(vec![Cell::new(label), region_cell]));
        }
        table.to_string()
    }
}

/// JSON formatter for machine-readable output
///
/// Amounts are emitted as decimal strings so no precision is lost.
pub struct JsonFormatter;

impl JsonFormatter {
    fn report_value(report: &Report) -> serde_json::Value {
        json!({
            "name": report.name,
            "style": report.style.to_string(),
            "periods": report
                .table
                .periods()
                .iter()
                .map(|p| p.format("%Y-%m-%d").to_string())
                .collect::<Vec<_>>(),
            "rows": report.table.rows().iter().map(|row| json!({
                "key": row.key.as_str(),
                "values": row.values.iter().map(Decimal::to_string).collect::<Vec<_>>(),
            })).collect::<Vec<_>>(),
            "totals": report
                .table
                .column_totals()
                .iter()
                .map(Decimal::to_string)
                .collect::<Vec<_>>(),
        })
    }

    fn pretty(value: &serde_json::Value) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &Report) -> String {
        Self::pretty(&Self::report_value(report))
    }

    fn format_registry(&self, registry: &ReportRegistry) -> String {
        Self::pretty(&json!({
            "reports": registry.iter().map(Self::report_value).collect::<Vec<_>>(),
        }))
    }

    fn format_breakdown(&self, title: &str, breakdown: &RegionalBreakdown) -> String {
        Self::pretty(&json!({
            "title": title,
            "by_region": breakdown
                .by_region
                .iter()
                .map(|(region, amount)| (region.to_string(), json!(amount.to_string())))
                .collect::<serde_json::Map<_, _>>(),
            "unresolved": breakdown.unresolved.iter().map(|(key, amount)| json!({
                "key": key.as_str(),
                "amount": amount.to_string(),
            })).collect::<Vec<_>>(),
        }))
    }

    fn format_classifications(&self, results: &[(String, RegionMatch)]) -> String {
        Self::pretty(&json!({
            "classifications": results.iter().map(|(label, region)| json!({
                "usage_type": label,
                "region": region.region(),
            })).collect::<Vec<_>>(),
        }))
    }
}

/// Get the appropriate formatter based on output preference
pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(TableFormatter)
    }
}
