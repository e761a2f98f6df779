//! Ordered collection of finished reports
//!
//! The registry is the handoff point to exporters. Reports are kept in the
//! order they were appended; names are not deduplicated.

use crate::table::ReportTable;
use crate::types::ReportStyle;
use serde::{Deserialize, Serialize};

/// A named, finished report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub name: String,
    pub style: ReportStyle,
    pub table: ReportTable,
}

impl Report {
    pub fn new(name: impl Into<String>, style: ReportStyle, table: ReportTable) -> Self {
        Self {
            name: name.into(),
            style,
            table,
        }
    }
}

/// Reports in append order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportRegistry {
    reports: Vec<Report>,
}

impl ReportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a report; duplicate names are retained
    pub fn append(&mut self, report: Report) {
        self.reports.push(report);
    }

    /// All reports in append order
    pub fn all(&self) -> &[Report] {
        &self.reports
    }

    /// First report with `name`
    pub fn get(&self, name: &str) -> Option<&Report> {
        self.reports.iter().find(|r| r.name == name)
    }

    /// Consume the registry, yielding reports in append order
    pub fn into_reports(self) -> Vec<Report> {
        self.reports
    }

    pub fn iter(&self) -> impl Iterator<Item = &Report> {
        self.reports.iter()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

impl<'a> IntoIterator for &'a ReportRegistry {
    type Item = &'a Report;
    type IntoIter = std::slice::Iter<'a, Report>;

    fn into_iter(self) -> Self::IntoIter {
        self.reports.iter()
    }
}
