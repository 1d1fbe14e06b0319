//! Structured error handling and exit codes.

use serde::Serialize;

use crate::similarity::DetectError;

/// Process exit codes.
///
/// - 0: Success (detection completed, near-duplicates found)
/// - 1: General error (unexpected failure)
/// - 2: No matches (detection completed, nothing at or above the moderate tier)
/// - 3: Partial success (completed, but some candidates were skipped)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Near-duplicates were found.
    Success = 0,
    /// An unexpected error occurred.
    GeneralError = 1,
    /// Detection completed but no candidate matched.
    NoMatches = 2,
    /// Detection completed but some candidates could not be scored.
    PartialSuccess = 3,
    /// Interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "ND000",
            Self::GeneralError => "ND001",
            Self::NoMatches => "ND002",
            Self::PartialSuccess => "ND003",
            Self::Interrupted => "ND130",
        }
    }

    /// Exit code for a completed run.
    ///
    /// Skipped candidates take precedence: a run that could not score
    /// everything is reported as partial even when it found matches.
    #[must_use]
    pub fn for_run(matches: usize, skipped: usize) -> Self {
        if skipped > 0 {
            Self::PartialSuccess
        } else if matches > 0 {
            Self::Success
        } else {
            Self::NoMatches
        }
    }

    /// Exit code for an error that ended the run.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        let interrupted = err
            .chain()
            .any(|cause| matches!(cause.downcast_ref::<DetectError>(), Some(DetectError::Interrupted)));
        if interrupted {
            Self::Interrupted
        } else {
            Self::GeneralError
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "ND001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
