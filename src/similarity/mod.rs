//! Content similarity: fingerprinting, scoring, pre-filtering, detection and
//! classification.
//!
//! # Pipeline
//!
//! 1. [`prefilter`] narrows a directory listing by size and extension
//! 2. [`fingerprint`] hashes every fixed-size character window of a text
//! 3. [`score`] compares two fingerprint sets (Jaccard, as a percentage)
//! 4. [`DuplicateDetector`] runs the above for one target document
//! 5. [`classify`] and [`auto_select`] turn scores into recommendations

pub mod classify;
pub mod detector;
pub mod fingerprint;
pub mod prefilter;
pub mod scorer;

pub use classify::{
    auto_select, classify, Classification, ClassificationTier, SelectionPolicy, HIGH_THRESHOLD,
    MODERATE_THRESHOLD,
};
pub use detector::{
    CandidateResult, DetectError, DetectionReport, DetectorConfig, DuplicateDetector,
    ExtractorBudget, SkipReason, SkippedCandidate, DEFAULT_EXTRACT_TIMEOUT,
    DEFAULT_MAX_EXTRACTOR_THREADS, DEFAULT_WINDOW_SIZE,
};
pub use fingerprint::{fingerprint, rolling_hashes, FingerprintError, FingerprintSet, HASH_BASE};
pub use prefilter::{prefilter, PrefilterConfig, PrefilterStats, DEFAULT_SIZE_RATIO};
pub use scorer::{score, ScoreError, SimilarityScore};
