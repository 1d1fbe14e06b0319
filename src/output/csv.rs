//! CSV output formatter for detection reports.
//!
//! One row per candidate that reached the scoring stage. Skipped candidates
//! get a row with `status = skipped`, an empty score and the failure reason,
//! so they can never be mistaken for zero-similarity results.
//!
//! # Columns
//!
//! - `rank`: Position in the ranking (empty for skipped rows)
//! - `status`: `scored` or `skipped`
//! - `name`, `path`, `size`
//! - `score`: Similarity percentage
//! - `tier`: Classification tier
//! - `selected`: Recommended for deletion
//! - `modified`: Last modified time (RFC 3339)
//! - `reason`: Why the candidate was skipped

use std::collections::BTreeSet;
use std::io;

use serde::Serialize;

use super::{format_time, OutputError};
use crate::similarity::{ClassificationTier, DetectionReport};

/// A single row in the CSV output.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    rank: Option<usize>,
    status: &'static str,
    name: &'a str,
    path: String,
    size: Option<u64>,
    score: Option<f64>,
    tier: Option<ClassificationTier>,
    selected: bool,
    modified: Option<String>,
    reason: Option<String>,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    report: &'a DetectionReport,
    selected: &'a BTreeSet<String>,
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(report: &'a DetectionReport, selected: &'a BTreeSet<String>) -> Self {
        Self { report, selected }
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), OutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for (idx, result) in self.report.ranked().into_iter().enumerate() {
            csv_writer.serialize(CsvRow {
                rank: Some(idx + 1),
                status: "scored",
                name: &result.name,
                path: result.path.to_string_lossy().into_owned(),
                size: Some(result.size),
                score: Some((result.score.value() * 100.0).round() / 100.0),
                tier: Some(ClassificationTier::of(result.score)),
                selected: self.selected.contains(&result.name),
                modified: format_time(result.modified),
                reason: None,
            })?;
        }

        for skip in &self.report.skipped {
            csv_writer.serialize(CsvRow {
                rank: None,
                status: "skipped",
                name: &skip.name,
                path: skip.path.to_string_lossy().into_owned(),
                size: None,
                score: None,
                tier: None,
                selected: false,
                modified: None,
                reason: Some(format!("{}: {}", skip.reason, skip.message)),
            })?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if serialization fails.
    pub fn to_string(&self) -> Result<String, OutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
