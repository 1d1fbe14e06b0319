//! Human-readable report table.
//!
//! ```text
//! Target: /docs/new.txt (1.95 KiB, window 10, raw)
//! Candidates: 6 listed, 3 scored, 1 skipped (0 too large, 1 unsupported)
//!
//!     SCORE  TIER      SEL  NAME
//!   100.00%  exact     *    copy.txt
//!    85.00%  moderate       edit.txt
//!
//! Skipped (not compared):
//!   broken.pdf  unreadable: Failed to extract text from PDF
//! ```

use std::collections::BTreeSet;
use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::Paint;

use crate::similarity::{ClassificationTier, DetectionReport};

/// Text table formatter.
pub struct TextOutput<'a> {
    report: &'a DetectionReport,
    selected: &'a BTreeSet<String>,
}

impl<'a> TextOutput<'a> {
    /// Create a new text formatter.
    #[must_use]
    pub fn new(report: &'a DetectionReport, selected: &'a BTreeSet<String>) -> Self {
        Self { report, selected }
    }

    /// Write the table to the given writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let report = self.report;
        let stats = &report.prefilter;

        writeln!(
            writer,
            "{} {} ({}, window {}, {})",
            "Target:".bold(),
            report.target.path.display(),
            ByteSize::b(report.target.size),
            report.window_size,
            report.mode
        )?;
        writeln!(
            writer,
            "Candidates: {} listed, {} scored, {} skipped ({} too large, {} unsupported)",
            stats.input,
            report.results.len(),
            report.skipped.len(),
            stats.excluded_size,
            stats.excluded_extension
        )?;
        writeln!(writer)?;

        if report.results.is_empty() {
            writeln!(writer, "{}", "No candidates to compare.".dim())?;
        } else {
            writeln!(
                writer,
                "{}",
                format!("  {:>8}  {:<9} {:<4} {}", "SCORE", "TIER", "SEL", "NAME").bold()
            )?;
            for result in report.ranked() {
                let tier = ClassificationTier::of(result.score);
                let mark = if self.selected.contains(&result.name) {
                    "*"
                } else {
                    ""
                };
                let line = format!(
                    "  {:>8}  {:<9} {:<4} {}",
                    result.score.to_string(),
                    tier.label(),
                    mark,
                    result.name
                );
                let painted = match tier {
                    ClassificationTier::Exact => line.red().bold(),
                    ClassificationTier::High => line.red(),
                    ClassificationTier::Moderate => line.yellow(),
                    ClassificationTier::NoMatch => line.dim(),
                };
                writeln!(writer, "{}", painted)?;
            }
        }

        if !report.skipped.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "{}", "Skipped (not compared):".yellow().bold())?;
            for skip in &report.skipped {
                writeln!(writer, "  {}  {}: {}", skip.name, skip.reason, skip.message)?;
            }
        }

        writeln!(writer)?;
        writeln!(
            writer,
            "{} recommended for deletion, finished in {:.2?}",
            self.selected.len(),
            report.duration
        )?;
        Ok(())
    }
}
