//! JSON output formatter for detection reports.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "target": { "path": "/docs/new.txt", "size": 2000 },
//!   "results": [
//!     {
//!       "name": "copy.txt",
//!       "path": "/docs/copy.txt",
//!       "size": 2048,
//!       "score": 100.0,
//!       "tier": "exact",
//!       "selected": true,
//!       "modified": "2024-05-01T12:00:00+00:00"
//!     }
//!   ],
//!   "skipped": [
//!     { "name": "broken.pdf", "path": "/docs/broken.pdf", "reason": "candidate-unreadable", "message": "..." }
//!   ],
//!   "classification": { "exact": ["copy.txt"], "high": [], "moderate": [], "no-match": [] },
//!   "summary": { "window_size": 10, "mode": "raw", "scored": 1, "skipped": 1, ... }
//! }
//! ```
//!
//! Results are ranked by score descending, then name.

use std::collections::BTreeSet;
use std::io::Write;

use chrono::Utc;
use serde::Serialize;

use super::{format_time, OutputError};
use crate::error::ExitCode;
use crate::scanner::ExtractionMode;
use crate::similarity::{
    Classification, ClassificationTier, DetectionReport, PrefilterStats, SkippedCandidate,
};

/// Target document in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonTarget {
    /// Path of the target
    pub path: String,
    /// Size in bytes
    pub size: u64,
}

/// A scored candidate in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonCandidate {
    /// File name
    pub name: String,
    /// Path of the candidate
    pub path: String,
    /// Size in bytes at detection time
    pub size: u64,
    /// Similarity percentage
    pub score: f64,
    /// Classification tier
    pub tier: ClassificationTier,
    /// Whether the candidate is recommended for deletion
    pub selected: bool,
    /// Last modified time (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Window size used for fingerprinting
    pub window_size: usize,
    /// Extraction mode
    pub mode: ExtractionMode,
    /// Pre-filter statistics
    pub prefilter: PrefilterStats,
    /// Number of scored candidates
    pub scored: usize,
    /// Number of skipped candidates
    pub skipped: usize,
    /// Number of candidates at or above the moderate tier
    pub matches: usize,
    /// Number recommended for deletion
    pub selected: usize,
    /// Duration of the run in milliseconds
    pub duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "ND000")
    pub exit_code_name: String,
    /// When the report was generated (RFC 3339)
    pub generated_at: String,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// The target document
    pub target: JsonTarget,
    /// Ranked scored candidates
    pub results: Vec<JsonCandidate>,
    /// Candidates that could not be scored
    pub skipped: Vec<SkippedCandidate>,
    /// Names per tier
    pub classification: Classification,
    /// Run statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create the JSON view of a report.
    #[must_use]
    pub fn new(report: &DetectionReport, selected: &BTreeSet<String>, exit_code: ExitCode) -> Self {
        let classification = report.classification();
        let results = report
            .ranked()
            .into_iter()
            .map(|r| JsonCandidate {
                name: r.name.clone(),
                path: r.path.to_string_lossy().into_owned(),
                size: r.size,
                score: r.score.value(),
                tier: ClassificationTier::of(r.score),
                selected: selected.contains(&r.name),
                modified: format_time(r.modified),
            })
            .collect();

        Self {
            target: JsonTarget {
                path: report.target.path.to_string_lossy().into_owned(),
                size: report.target.size,
            },
            results,
            skipped: report.skipped.clone(),
            summary: JsonSummary {
                window_size: report.window_size,
                mode: report.mode,
                prefilter: report.prefilter.clone(),
                scored: report.results.len(),
                skipped: report.skipped.len(),
                matches: classification.match_count(),
                selected: selected.len(),
                duration_ms: report.duration.as_millis() as u64,
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
                generated_at: Utc::now().to_rfc3339(),
            },
            classification,
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), OutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures;

    fn output() -> serde_json::Value {
        let report = fixtures::report();
        let selected: BTreeSet<String> = ["copy.txt".to_string()].into();
        let json = JsonOutput::new(&report, &selected, ExitCode::PartialSuccess)
            .to_json()
            .unwrap();
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_results_ranked_with_tiers() {
        let value = output();
        let results = value["results"].as_array().unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["name"], "copy.txt");
        assert_eq!(results[0]["score"], 100.0);
        assert_eq!(results[0]["tier"], "exact");
        assert_eq!(results[0]["selected"], true);
        assert_eq!(results[1]["tier"], "moderate");
        assert_eq!(results[1]["selected"], false);
        assert_eq!(results[2]["tier"], "no-match");
    }

    #[test]
    fn test_skipped_and_classification() {
        let value = output();

        assert_eq!(value["skipped"][0]["reason"], "candidate-unreadable");
        assert_eq!(value["classification"]["exact"][0], "copy.txt");
        assert!(value["classification"]["high"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_summary() {
        let value = output();
        let summary = &value["summary"];

        assert_eq!(summary["scored"], 3);
        assert_eq!(summary["skipped"], 1);
        assert_eq!(summary["matches"], 2);
        assert_eq!(summary["exit_code"], 3);
        assert_eq!(summary["exit_code_name"], "ND003");
        assert_eq!(summary["mode"], "raw");
        assert_eq!(summary["prefilter"]["input"], 6);
    }

    #[test]
    fn test_pretty_output_ends_with_newline() {
        let report = fixtures::report();
        let mut buffer = Vec::new();
        JsonOutput::new(&report, &BTreeSet::new(), ExitCode::Success)
            .write_to(&mut buffer, true)
            .unwrap();
        let out = String::from_utf8(buffer).unwrap();
        assert!(out.contains('\n'));
        assert!(out.ends_with("}\n"));
    }
}
