//! CSV export of finished reports
//!
//! Each report becomes `<dir>/<name>.csv` with a `Key` column followed by one
//! column per period. Reports sharing a name get a numeric suffix so no file
//! is overwritten.

use costreport_core::error::Result;
use costreport_core::registry::{Report, ReportRegistry};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes reports as CSV files into one directory
pub struct CsvExporter {
    dir: PathBuf,
}

impl CsvExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Export every report, returning the written paths in registry order
    pub fn export(&self, registry: &ReportRegistry) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.dir)?;

        let mut taken: HashSet<String> = HashSet::new();
        let mut written = Vec::with_capacity(registry.len());

        for report in registry {
            let file_name = unique_file_name(&file_stem(&report.name), &mut taken);
            let path = self.dir.join(file_name);
            write_report(report, &path)?;
            debug!(report = %report.name, path = %path.display(), "Wrote CSV");
            written.push(path);
        }

        info!(files = written.len(), dir = %self.dir.display(), "Exported reports");
        Ok(written)
    }
}

/// Write one report as CSV
pub fn write_report(report: &Report, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(std::io::Error::from)?;

    let mut header = vec!["Key".to_string()];
    header.extend(
        report
            .table
            .periods()
            .iter()
            .map(|p| p.format("%Y-%m-%d").to_string()),
    );
    writer.write_record(&header).map_err(std::io::Error::from)?;

    for row in report.table.rows() {
        let mut record = vec![row.key.to_string()];
        record.extend(row.values.iter().map(|v| v.to_string()));
        writer.write_record(&record).map_err(std::io::Error::from)?;
    }

    writer.flush()?;
    Ok(())
}

/// First of `<stem>.csv`, `<stem>-2.csv`, ... not yet in `taken`; records it
fn unique_file_name(stem: &str, taken: &mut HashSet<String>) -> String {
    let mut file_name = format!("{stem}.csv");
    let mut suffix = 2;
    while taken.contains(&file_name) {
        file_name = format!("{stem}-{suffix}.csv");
        suffix += 1;
    }
    taken.insert(file_name.clone());
    file_name
}

/// File-system safe stem for a report name
pub fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_matches('.');
    if stem.is_empty() {
        "report".to_string()
    } else {
        stem.to_string()
    }
}
