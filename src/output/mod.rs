//! Output formatters for detection reports.
//!
//! This module renders a [`DetectionReport`] in one of three formats:
//! - coloured text table for people ([`text`])
//! - JSON for automation and scripting ([`json`])
//! - CSV for spreadsheet import ([`csv`])
//!
//! Skipped candidates are always rendered separately from scored ones.
//!
//! # Example
//!
//! ```no_run
//! use neardupe::output::{OutputFormat, render};
//! use neardupe::error::ExitCode;
//! use neardupe::scanner::{Walker, WalkerConfig};
//! use neardupe::similarity::{auto_select, DetectorConfig, DuplicateDetector, SelectionPolicy};
//! use std::path::Path;
//!
//! let dir = Path::new("/downloads");
//! let detector = DuplicateDetector::new(DetectorConfig::default());
//! let report = detector.detect(&dir.join("a.txt"), &Walker::new(dir, WalkerConfig::default())).unwrap();
//! let selected = auto_select(&report.classification(), SelectionPolicy::AllMatches);
//!
//! render(&report, &selected, ExitCode::Success, OutputFormat::Json, &mut std::io::stdout()).unwrap();
//! ```

pub mod csv;
pub mod json;
pub mod text;

use std::collections::BTreeSet;
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ExitCode;
use crate::similarity::DetectionReport;

// Re-export main types
pub use self::csv::CsvOutput;
pub use self::json::JsonOutput;
pub use self::text::TextOutput;

/// Report output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Text,
    /// JSON document
    Json,
    /// CSV rows
    Csv,
}

impl OutputFormat {
    /// Whether the format is meant for other programs.
    #[must_use]
    pub fn is_machine_readable(self) -> bool {
        !matches!(self, Self::Text)
    }
}

/// Errors that can occur while writing a report.
#[derive(Debug, Error)]
pub enum OutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization error.
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
}

/// Write `report` to `writer` in the chosen format.
///
/// Text output is coloured only when colours are enabled globally (see
/// [`yansi::whenever`]).
///
/// # Errors
///
/// Returns [`OutputError`] if serialization or writing fails.
pub fn render<W: Write>(
    report: &DetectionReport,
    selected: &BTreeSet<String>,
    exit_code: ExitCode,
    format: OutputFormat,
    writer: &mut W,
) -> Result<(), OutputError> {
    match format {
        OutputFormat::Text => TextOutput::new(report, selected).write_to(writer)?,
        OutputFormat::Json => JsonOutput::new(report, selected, exit_code).write_to(writer, true)?,
        OutputFormat::Csv => CsvOutput::new(report, selected).write_to(writer)?,
    }
    Ok(())
}

/// Format a modification time as RFC 3339.
fn format_time(time: Option<std::time::SystemTime>) -> Option<String> {
    time.map(|t| {
        let datetime: DateTime<Utc> = t.into();
        datetime.to_rfc3339()
    })
}
