//! Overlap scoring of two fingerprint sets.
//!
//! The score is the Jaccard index of the two hash sets expressed as a
//! percentage: `|a ∩ b| / |a ∪ b| * 100`.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::fingerprint::FingerprintSet;

/// Errors that can occur while scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScoreError {
    /// Both fingerprint sets are empty, so the union is empty.
    #[error("cannot compare two empty fingerprint sets")]
    EmptyComparison,
}

/// Similarity percentage in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct SimilarityScore(f64);

impl SimilarityScore {
    /// Score of two identical non-empty sets.
    pub const IDENTICAL: SimilarityScore = SimilarityScore(100.0);

    /// Score of two disjoint sets.
    pub const DISJOINT: SimilarityScore = SimilarityScore(0.0);

    /// Wrap a percentage, clamping it into `[0, 100]`.
    #[must_use]
    pub fn new(percent: f64) -> Self {
        Self(percent.clamp(0.0, 100.0))
    }

    /// The raw percentage.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for SimilarityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.0)
    }
}

/// Score the overlap of two fingerprint sets.
///
/// # Errors
///
/// Returns [`ScoreError::EmptyComparison`] when both sets are empty.
///
/// # Example
///
/// ```
/// use neardupe::similarity::{fingerprint, score};
///
/// let a = fingerprint("hello world", 3).unwrap();
/// assert_eq!(score(&a, &a).unwrap().value(), 100.0);
/// ```
pub fn score(a: &FingerprintSet, b: &FingerprintSet) -> Result<SimilarityScore, ScoreError> {
    if a.is_empty() && b.is_empty() {
        return Err(ScoreError::EmptyComparison);
    }

    let common = a.intersection_len(b);
    let union = a.len() + b.len() - common;
    Ok(SimilarityScore::new(common as f64 / union as f64 * 100.0))
}
