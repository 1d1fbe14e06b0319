//! Near-duplicate detection for a single target document.
//!
//! # Overview
//!
//! A detection run:
//! 1. reads and fingerprints the target once
//! 2. lists the directory and narrows it with the size [`prefilter`]
//! 3. extracts, fingerprints and scores every surviving candidate on a
//!    bounded thread pool
//!
//! A candidate whose text cannot be extracted, or whose fingerprint cannot
//! be computed, is reported in [`DetectionReport::skipped`] and never mixed
//! up with a zero-similarity result. Failing to read or fingerprint the
//! target aborts the run with [`DetectError::TargetUnreadable`].
//!
//! Every extraction is time-bounded by [`DetectorConfig::extract_timeout`].
//! A stalled extractor is abandoned on its own thread and the candidate is
//! skipped. Abandoned threads keep counting against an [`ExtractorBudget`]
//! until they finish, so a run of pathological files cannot pile up threads
//! without bound. An extractor that panics is treated like one that failed.
//!
//! # Example
//!
//! ```no_run
//! use neardupe::scanner::{Walker, WalkerConfig};
//! use neardupe::similarity::{DetectorConfig, DuplicateDetector};
//! use std::path::Path;
//!
//! let dir = Path::new("/downloads");
//! let detector = DuplicateDetector::new(DetectorConfig::default().with_window_size(10));
//! let walker = Walker::new(dir, WalkerConfig::default());
//!
//! let report = detector.detect(&dir.join("report.pdf"), &walker).unwrap();
//! for result in report.ranked() {
//!     println!("{}: {}", result.name, result.score);
//! }
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, OnceLock};
use std::time::{Duration, Instant, SystemTime};

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use super::classify::{classify, Classification};
use super::fingerprint::{fingerprint, FingerprintSet};
use super::prefilter::{prefilter, PrefilterConfig, PrefilterStats};
use super::scorer::{score, SimilarityScore};
use crate::actions::lock::DirectoryLock;
use crate::progress::{ProgressCallback, PHASE_LISTING, PHASE_SCORING};
use crate::scanner::{
    DirectoryView, DocumentError, DocumentExtractor, ExtractionMode, FileEntry, PreprocessContext,
    ScanError, TextSource,
};

/// Default number of characters per fingerprint window.
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Default time allowed for extracting one document.
pub const DEFAULT_EXTRACT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on extractor threads alive at once, abandoned ones included.
pub const DEFAULT_MAX_EXTRACTOR_THREADS: usize = 32;

/// Counts live extractor threads, including ones abandoned after a timeout.
#[derive(Debug)]
pub struct ExtractorBudget {
    live: AtomicUsize,
    limit: usize,
}

impl ExtractorBudget {
    /// Create a budget allowing at most `limit` live extractor threads.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            live: AtomicUsize::new(0),
            limit: limit.max(1),
        }
    }

    /// The budget shared by every detector in the process.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<ExtractorBudget>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::new(DEFAULT_MAX_EXTRACTOR_THREADS))))
    }

    /// Number of extractor threads still running.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Maximum number of live extractor threads.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    fn try_acquire(self: &Arc<Self>) -> Option<ExtractorSlot> {
        self.live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |live| {
                (live < self.limit).then_some(live + 1)
            })
            .ok()
            .map(|_| ExtractorSlot(Arc::clone(self)))
    }
}

/// Held by an extractor thread for as long as it runs.
struct ExtractorSlot(Arc<ExtractorBudget>);

impl Drop for ExtractorSlot {
    fn drop(&mut self) {
        self.0.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Errors that abort a whole detection run.
#[derive(Debug, Error)]
pub enum DetectError {
    /// The target's text could not be obtained or fingerprinted.
    #[error("target document {path} is unreadable: {reason}")]
    TargetUnreadable {
        /// Path of the target document
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// The directory could not be listed.
    #[error("failed to list directory: {0}")]
    Listing(#[from] ScanError),

    /// The run was cancelled by the shutdown flag.
    #[error("detection interrupted")]
    Interrupted,
}

/// Why a candidate was left out of the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Text extraction failed or timed out
    CandidateUnreadable,
    /// Text was extracted but could not be fingerprinted or scored
    CandidateFingerprintFailed,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CandidateUnreadable => write!(f, "unreadable"),
            Self::CandidateFingerprintFailed => write!(f, "fingerprint failed"),
        }
    }
}

/// A candidate that was scored against the target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateResult {
    /// Path of the candidate relative to the listed directory
    pub name: String,
    /// Path of the candidate
    pub path: PathBuf,
    /// Stored size in bytes at detection time
    pub size: u64,
    /// Modification time at detection time
    #[serde(skip)]
    pub modified: Option<SystemTime>,
    /// Similarity to the target
    pub score: SimilarityScore,
}

/// A candidate that could not be scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCandidate {
    /// Path of the candidate relative to the listed directory
    pub name: String,
    /// Path of the candidate
    pub path: PathBuf,
    /// Category of failure
    pub reason: SkipReason,
    /// Underlying error message
    pub message: String,
}

/// Outcome of a detection run.
#[derive(Debug, Clone)]
pub struct DetectionReport {
    /// The target document
    pub target: FileEntry,
    /// Window size used for both sides
    pub window_size: usize,
    /// Extraction mode used for both sides
    pub mode: ExtractionMode,
    /// Scored candidates in directory enumeration order
    pub results: Vec<CandidateResult>,
    /// Candidates that could not be scored
    pub skipped: Vec<SkippedCandidate>,
    /// Pre-filter statistics
    pub prefilter: PrefilterStats,
    /// Wall-clock time of the run
    pub duration: Duration,
}

impl DetectionReport {
    /// Results sorted by score descending, then by name ascending.
    #[must_use]
    pub fn ranked(&self) -> Vec<&CandidateResult> {
        let mut ranked: Vec<&CandidateResult> = self.results.iter().collect();
        ranked.sort_by(|a, b| {
            b.score
                .value()
                .total_cmp(&a.score.value())
                .then_with(|| a.name.cmp(&b.name))
        });
        ranked
    }

    /// Classify every scored candidate.
    #[must_use]
    pub fn classification(&self) -> Classification {
        classify(&self.results)
    }

    /// Look up a scored candidate by name.
    #[must_use]
    pub fn result(&self, name: &str) -> Option<&CandidateResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// Whether any candidate was skipped.
    #[must_use]
    pub fn has_skipped(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Configuration for a [`DuplicateDetector`].
#[derive(Clone)]
pub struct DetectorConfig {
    /// Characters per fingerprint window.
    pub window_size: usize,
    /// Candidate pre-filter settings.
    pub prefilter: PrefilterConfig,
    /// Extraction mode for target and candidates.
    pub mode: ExtractionMode,
    /// Number of threads extracting candidates in parallel.
    /// Default is 4 to prevent disk thrashing.
    pub io_threads: usize,
    /// Time allowed per extraction. Zero disables the bound.
    pub extract_timeout: Duration,
    /// Limit on extractor threads, shared across detectors by default.
    pub extractor_budget: Arc<ExtractorBudget>,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
    /// Lock held in shared mode while the run is in flight.
    pub lock: Option<DirectoryLock>,
}

impl std::fmt::Debug for DetectorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorConfig")
            .field("window_size", &self.window_size)
            .field("prefilter", &self.prefilter)
            .field("mode", &self.mode)
            .field("io_threads", &self.io_threads)
            .field("extract_timeout", &self.extract_timeout)
            .field("extractor_budget", &self.extractor_budget)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .field("lock", &self.lock)
            .finish()
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            prefilter: PrefilterConfig::default(),
            mode: ExtractionMode::Raw,
            io_threads: 4,
            extract_timeout: DEFAULT_EXTRACT_TIMEOUT,
            extractor_budget: ExtractorBudget::shared(),
            shutdown_flag: None,
            progress_callback: None,
            lock: None,
        }
    }
}

impl DetectorConfig {
    /// Set the window size.
    #[must_use]
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Set the pre-filter configuration.
    #[must_use]
    pub fn with_prefilter(mut self, prefilter: PrefilterConfig) -> Self {
        self.prefilter = prefilter;
        self
    }

    /// Set the extraction mode.
    #[must_use]
    pub fn with_mode(mut self, mode: ExtractionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the I/O thread count.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the per-document extraction timeout.
    #[must_use]
    pub fn with_extract_timeout(mut self, timeout: Duration) -> Self {
        self.extract_timeout = timeout;
        self
    }

    /// Set the extractor thread budget.
    #[must_use]
    pub fn with_extractor_budget(mut self, budget: Arc<ExtractorBudget>) -> Self {
        self.extractor_budget = budget;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Set the directory lock.
    #[must_use]
    pub fn with_lock(mut self, lock: DirectoryLock) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Per-candidate outcome before it is sorted into results or skips.
enum Outcome {
    Scored(CandidateResult),
    Skipped(SkippedCandidate),
    Cancelled,
}

/// Scores the documents of a directory against a target document.
pub struct DuplicateDetector {
    config: DetectorConfig,
    source: Arc<dyn TextSource>,
}

impl std::fmt::Debug for DuplicateDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateDetector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DuplicateDetector {
    /// Create a detector that reads documents from disk in the configured mode.
    #[must_use]
    pub fn new(config: DetectorConfig) -> Self {
        let extractor = DocumentExtractor::new(config.mode, Arc::new(PreprocessContext::default()));
        Self::with_source(config, Arc::new(extractor))
    }

    /// Create a detector with a custom text source.
    #[must_use]
    pub fn with_source(config: DetectorConfig, source: Arc<dyn TextSource>) -> Self {
        Self { config, source }
    }

    /// The detector configuration.
    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Score every plausible candidate in `directory` against `target`.
    ///
    /// # Errors
    ///
    /// - [`DetectError::TargetUnreadable`] if the target cannot be read,
    ///   extracted or fingerprinted (including a text shorter than the window)
    /// - [`DetectError::Listing`] if the directory cannot be listed
    /// - [`DetectError::Interrupted`] if the shutdown flag was raised
    pub fn detect(
        &self,
        target: &Path,
        directory: &dyn DirectoryView,
    ) -> Result<DetectionReport, DetectError> {
        let start = Instant::now();
        let _guard = self.config.lock.as_ref().map(DirectoryLock::begin_detection);

        log::info!(
            "Detecting near-duplicates of {} in {} (window={}, mode={})",
            target.display(),
            directory.root().display(),
            self.config.window_size,
            self.config.mode
        );

        let unreadable = |reason: String| DetectError::TargetUnreadable {
            path: target.to_path_buf(),
            reason,
        };

        let target_entry = FileEntry::from_path(target).map_err(|e| unreadable(e.to_string()))?;
        let target_text = self
            .extract(target)
            .map_err(|e| unreadable(e.to_string()))?;
        let target_fp = fingerprint(&target_text, self.config.window_size)
            .map_err(|e| unreadable(e.to_string()))?;
        log::debug!(
            "Target {}: {} bytes, {} distinct hashes",
            target_entry.name,
            target_entry.size,
            target_fp.len()
        );

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_phase_start(PHASE_LISTING, 0);
        }
        let listing = directory.list();
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_phase_end(PHASE_LISTING);
        }
        let listing = listing?;

        let target_entry = identify_target(&listing, target_entry);
        let (candidates, prefilter_stats) =
            prefilter(listing, &target_entry, &self.config.prefilter);

        if self.config.is_shutdown_requested() {
            return Err(DetectError::Interrupted);
        }

        let outcomes = self.score_candidates(candidates, &target_fp);

        let mut results = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                Outcome::Scored(result) => results.push(result),
                Outcome::Skipped(skip) => {
                    log::warn!("Skipped {} ({}): {}", skip.name, skip.reason, skip.message);
                    skipped.push(skip);
                }
                Outcome::Cancelled => {}
            }
        }

        if self.config.is_shutdown_requested() {
            log::info!("Detection interrupted by shutdown request");
            return Err(DetectError::Interrupted);
        }

        let duration = start.elapsed();
        log::info!(
            "Scored {} candidate(s), skipped {} in {:.2?}",
            results.len(),
            skipped.len(),
            duration
        );

        Ok(DetectionReport {
            target: target_entry,
            window_size: self.config.window_size,
            mode: self.config.mode,
            results,
            skipped,
            prefilter: prefilter_stats,
            duration,
        })
    }

    fn score_candidates(&self, candidates: Vec<FileEntry>, target_fp: &FingerprintSet) -> Vec<Outcome> {
        let total = candidates.len();
        let done = AtomicUsize::new(0);

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_phase_start(PHASE_SCORING, total);
        }

        let run = || -> Vec<Outcome> {
            candidates
                .into_par_iter()
                .map(|candidate| {
                    if self.config.is_shutdown_requested() {
                        return Outcome::Cancelled;
                    }
                    let outcome = self.score_candidate(candidate, target_fp);
                    let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(ref cb) = self.config.progress_callback {
                        let path = match &outcome {
                            Outcome::Scored(r) => r.path.to_string_lossy(),
                            Outcome::Skipped(s) => s.path.to_string_lossy(),
                            Outcome::Cancelled => "".into(),
                        };
                        cb.on_progress(current, &path);
                    }
                    outcome
                })
                .collect()
        };

        let outcomes = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads)
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(e) => {
                log::warn!(
                    "Failed to create custom thread pool ({}), using global pool with {} threads",
                    e,
                    rayon::current_num_threads()
                );
                run()
            }
        };

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_phase_end(PHASE_SCORING);
        }

        outcomes
    }

    fn score_candidate(&self, candidate: FileEntry, target_fp: &FingerprintSet) -> Outcome {
        let skip = |reason: SkipReason, message: String| {
            Outcome::Skipped(SkippedCandidate {
                name: candidate.name.clone(),
                path: candidate.path.clone(),
                reason,
                message,
            })
        };

        let text = match self.extract(&candidate.path) {
            Ok(text) => text,
            Err(e) => return skip(SkipReason::CandidateUnreadable, e.to_string()),
        };

        let candidate_fp = match fingerprint(&text, self.config.window_size) {
            Ok(fp) => fp,
            Err(e) => return skip(SkipReason::CandidateFingerprintFailed, e.to_string()),
        };

        match score(target_fp, &candidate_fp) {
            Ok(similarity) => {
                log::debug!("{}: {}", candidate.name, similarity);
                Outcome::Scored(CandidateResult {
                    name: candidate.name,
                    path: candidate.path,
                    size: candidate.size,
                    modified: candidate.modified,
                    score: similarity,
                })
            }
            Err(e) => skip(SkipReason::CandidateFingerprintFailed, e.to_string()),
        }
    }

    /// Extract text, giving up after the configured timeout.
    fn extract(&self, path: &Path) -> Result<String, DocumentError> {
        let timeout = self.config.extract_timeout;
        if timeout.is_zero() {
            return extract_contained(self.source.as_ref(), path);
        }

        let budget = &self.config.extractor_budget;
        let Some(slot) = budget.try_acquire() else {
            log::warn!(
                "Not extracting {}: {} extractor threads still running",
                path.display(),
                budget.live()
            );
            return Err(DocumentError::ExtractionFailed {
                path: path.to_path_buf(),
                message: format!("{} extractor threads still running", budget.limit()),
            });
        };

        let (tx, rx) = mpsc::channel();
        let source = Arc::clone(&self.source);
        let owned = path.to_path_buf();
        std::thread::Builder::new()
            .name("neardupe-extract".to_string())
            .spawn(move || {
                let result = extract_contained(source.as_ref(), &owned);
                drop(slot);
                // The receiver may have given up already
                let _ = tx.send(result);
            })
            .map_err(|e| DocumentError::ExtractionFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Extraction of {} exceeded {:?}, abandoning ({} of {} extractor threads still running)",
                    path.display(),
                    timeout,
                    budget.live(),
                    budget.limit()
                );
                Err(DocumentError::Timeout(path.to_path_buf()))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(DocumentError::ExtractionFailed {
                path: path.to_path_buf(),
                message: "extractor terminated unexpectedly".to_string(),
            }),
        }
    }
}

/// Run an extractor, turning a panic into [`DocumentError::ExtractionFailed`].
fn extract_contained(source: &dyn TextSource, path: &Path) -> Result<String, DocumentError> {
    panic::catch_unwind(AssertUnwindSafe(|| source.extract_text(path))).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        log::warn!("Extractor panicked on {}: {}", path.display(), message);
        Err(DocumentError::ExtractionFailed {
            path: path.to_path_buf(),
            message: format!("extractor panicked: {}", message),
        })
    })
}

/// Replace the target entry with its listing entry when both name the same file.
///
/// The listing may spell the path differently (relative vs. absolute,
/// symlinked parent). Only entries with the same final path component are
/// resolved.
fn identify_target(listing: &[FileEntry], target: FileEntry) -> FileEntry {
    if listing.iter().any(|e| e.path == target.path) {
        return target;
    }
    let Ok(canonical) = target.path.canonicalize() else {
        return target;
    };
    listing
        .iter()
        .filter(|e| e.path.file_name() == target.path.file_name())
        .find(|e| e.path.canonicalize().is_ok_and(|p| p == canonical))
        .map(|e| FileEntry {
            path: e.path.clone(),
            ..target.clone()
        })
        .unwrap_or(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// In-memory directory with fixed sizes.
    struct MemoryDirectory {
        root: PathBuf,
        entries: Vec<FileEntry>,
    }

    impl DirectoryView for MemoryDirectory {
        fn root(&self) -> &Path {
            &self.root
        }

        fn list(&self) -> Result<Vec<FileEntry>, ScanError> {
            Ok(self.entries.clone())
        }
    }

    /// Text source backed by a map; missing paths are unreadable.
    struct MemorySource {
        texts: HashMap<PathBuf, String>,
        delay: Option<(PathBuf, Duration)>,
    }

    impl TextSource for MemorySource {
        fn extract_text(&self, path: &Path) -> Result<String, DocumentError> {
            if let Some((slow, delay)) = &self.delay {
                if slow == path {
                    std::thread::sleep(*delay);
                }
            }
            self.texts
                .get(path)
                .cloned()
                .ok_or_else(|| DocumentError::UnsupportedFormat("missing".to_string()))
        }
    }

    struct Fixture {
        _dir: TempDir,
        target: PathBuf,
        directory: MemoryDirectory,
        source: MemorySource,
    }

    /// Target lives on disk (for metadata); candidates are in memory.
    fn fixture(target_text: &str, candidates: &[(&str, u64, Option<&str>)]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target.txt");
        fs::write(&target, target_text).unwrap();

        let mut texts = HashMap::new();
        texts.insert(target.clone(), target_text.to_string());
        let mut entries = vec![FileEntry::new(target.clone(), target_text.len() as u64)];
        for (name, size, text) in candidates {
            let path = dir.path().join(name);
            if let Some(text) = text {
                texts.insert(path.clone(), text.to_string());
            }
            entries.push(FileEntry::new(path, *size));
        }

        Fixture {
            directory: MemoryDirectory {
                root: dir.path().to_path_buf(),
                entries,
            },
            source: MemorySource { texts, delay: None },
            target,
            _dir: dir,
        }
    }

    fn detector(fixture: Fixture, config: DetectorConfig) -> (DuplicateDetector, Fixture) {
        let source = MemorySource {
            texts: fixture.source.texts.clone(),
            delay: fixture.source.delay.clone(),
        };
        (DuplicateDetector::with_source(config, Arc::new(source)), fixture)
    }

    const TEXT: &str = "The quick brown fox jumps over the lazy dog";

    #[test]
    fn test_identical_candidate_scores_100() {
        let f = fixture(TEXT, &[("copy.txt", 43, Some(TEXT))]);
        let (d, f) = detector(f, DetectorConfig::default());

        let report = d.detect(&f.target, &f.directory).unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].score, SimilarityScore::IDENTICAL);
        assert!(report.skipped.is_empty());
        assert_eq!(report.prefilter.excluded_self, 1);
    }

    #[test]
    fn test_unreadable_and_short_candidates_are_skipped() {
        let f = fixture(
            TEXT,
            &[
                ("copy.txt", 43, Some(TEXT)),
                ("broken.pdf", 43, None),
                ("tiny.txt", 3, Some("abc")),
            ],
        );
        let (d, f) = detector(f, DetectorConfig::default());

        let report = d.detect(&f.target, &f.directory).unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.skipped.len(), 2);
        let reasons: HashMap<_, _> = report
            .skipped
            .iter()
            .map(|s| (s.name.as_str(), s.reason))
            .collect();
        assert_eq!(reasons["broken.pdf"], SkipReason::CandidateUnreadable);
        assert_eq!(reasons["tiny.txt"], SkipReason::CandidateFingerprintFailed);
        assert!(report.has_skipped());
    }

    #[test]
    fn test_target_shorter_than_window_is_unreadable() {
        let f = fixture("short", &[("copy.txt", 5, Some("short"))]);
        let (d, f) = detector(f, DetectorConfig::default().with_window_size(10));

        let err = d.detect(&f.target, &f.directory).unwrap_err();
        assert!(matches!(err, DetectError::TargetUnreadable { .. }));
    }

    #[test]
    fn test_missing_target_is_unreadable() {
        let f = fixture(TEXT, &[]);
        let (d, f) = detector(f, DetectorConfig::default());

        let err = d
            .detect(&f.directory.root.join("gone.txt"), &f.directory)
            .unwrap_err();
        assert!(matches!(err, DetectError::TargetUnreadable { .. }));
    }

    #[test]
    fn test_oversized_candidate_never_scored() {
        let f = fixture(TEXT, &[("big.txt", 1000, Some(TEXT))]);
        let (d, f) = detector(f, DetectorConfig::default());

        let report = d.detect(&f.target, &f.directory).unwrap();

        assert!(report.results.is_empty());
        assert!(report.skipped.is_empty());
        assert_eq!(report.prefilter.excluded_size, 1);
    }

    #[test]
    fn test_ranked_order() {
        let f = fixture(
            TEXT,
            &[
                ("b.txt", 43, Some(TEXT)),
                ("c.txt", 43, Some("The quick brown fox jumps over the lazy cat")),
                ("a.txt", 43, Some(TEXT)),
                ("z.txt", 43, Some("Completely unrelated words in this file ok")),
            ],
        );
        let (d, f) = detector(f, DetectorConfig::default());

        let report = d.detect(&f.target, &f.directory).unwrap();
        let ranked: Vec<_> = report.ranked().iter().map(|r| r.name.as_str()).collect();

        assert_eq!(ranked, vec!["a.txt", "b.txt", "c.txt", "z.txt"]);
        // Enumeration order preserved in raw results
        assert_eq!(report.results[0].name, "b.txt");
    }

    #[test]
    fn test_slow_extraction_times_out() {
        let mut f = fixture(TEXT, &[("slow.txt", 43, Some(TEXT)), ("copy.txt", 43, Some(TEXT))]);
        f.source.delay = Some((f.directory.root.join("slow.txt"), Duration::from_millis(500)));
        let config = DetectorConfig::default().with_extract_timeout(Duration::from_millis(50));
        let (d, f) = detector(f, config);

        let report = d.detect(&f.target, &f.directory).unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].name, "copy.txt");
        assert_eq!(report.skipped[0].reason, SkipReason::CandidateUnreadable);
    }

    /// Panics on PDFs, delegates everything else.
    struct PanickingPdfSource(MemorySource);

    impl TextSource for PanickingPdfSource {
        fn extract_text(&self, path: &Path) -> Result<String, DocumentError> {
            if path.extension().is_some_and(|e| e == "pdf") {
                panic!("malformed cross-reference table");
            }
            self.0.extract_text(path)
        }
    }

    fn panicking_pdf_detector(config: DetectorConfig) -> (DuplicateDetector, Fixture) {
        let f = fixture(TEXT, &[("b.txt", 43, Some(TEXT)), ("c.pdf", 43, Some(TEXT))]);
        let source = PanickingPdfSource(MemorySource {
            texts: f.source.texts.clone(),
            delay: None,
        });
        (DuplicateDetector::with_source(config, Arc::new(source)), f)
    }

    #[test]
    fn test_panicking_extractor_is_skipped_inline() {
        let (d, f) =
            panicking_pdf_detector(DetectorConfig::default().with_extract_timeout(Duration::ZERO));

        let report = d.detect(&f.target, &f.directory).unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].name, "b.txt");
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].name, "c.pdf");
        assert_eq!(report.skipped[0].reason, SkipReason::CandidateUnreadable);
        assert!(report.skipped[0].message.contains("panicked"));
    }

    #[test]
    fn test_panicking_extractor_is_skipped_on_thread() {
        let (d, f) = panicking_pdf_detector(DetectorConfig::default());

        let report = d.detect(&f.target, &f.directory).unwrap();

        assert_eq!(report.results[0].name, "b.txt");
        assert_eq!(report.skipped[0].name, "c.pdf");
        assert!(report.skipped[0].message.contains("panicked"));
    }

    #[test]
    fn test_exhausted_budget_skips_candidates() {
        let mut f = fixture(TEXT, &[("slow.txt", 43, Some(TEXT)), ("copy.txt", 43, Some(TEXT))]);
        f.source.delay = Some((f.directory.root.join("slow.txt"), Duration::from_millis(400)));
        let budget = Arc::new(ExtractorBudget::new(1));
        let config = DetectorConfig::default()
            .with_io_threads(1)
            .with_extract_timeout(Duration::from_millis(50))
            .with_extractor_budget(Arc::clone(&budget));
        let (d, f) = detector(f, config);

        // The abandoned slow.txt extractor still holds the only slot
        let report = d.detect(&f.target, &f.directory).unwrap();

        assert!(report.results.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert!(report
            .skipped
            .iter()
            .any(|s| s.name == "copy.txt" && s.message.contains("still running")));

        std::thread::sleep(Duration::from_millis(600));
        assert_eq!(budget.live(), 0);
    }

    #[test]
    fn test_budget_slots_are_released() {
        let budget = Arc::new(ExtractorBudget::new(1));
        let slot = budget.try_acquire().unwrap();
        assert!(budget.try_acquire().is_none());
        drop(slot);
        assert_eq!(budget.live(), 0);
        assert!(budget.try_acquire().is_some());
    }

    #[test]
    fn test_shutdown_interrupts() {
        let f = fixture(TEXT, &[("copy.txt", 43, Some(TEXT))]);
        let flag = Arc::new(AtomicBool::new(true));
        let (d, f) = detector(f, DetectorConfig::default().with_shutdown_flag(flag));

        let err = d.detect(&f.target, &f.directory).unwrap_err();
        assert!(matches!(err, DetectError::Interrupted));
    }

    #[test]
    fn test_detection_releases_lock() {
        let f = fixture(TEXT, &[("copy.txt", 43, Some(TEXT))]);
        let lock = DirectoryLock::new(f.directory.root.clone());
        let (d, f) = detector(f, DetectorConfig::default().with_lock(lock.clone()));

        d.detect(&f.target, &f.directory).unwrap();
        assert_eq!(lock.in_flight(), 0);
    }

    #[test]
    fn test_identify_target_resolves_alias() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.txt");
        fs::write(&path, "x").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let aliased = dir.path().join("sub").join("..").join("doc.txt");

        let listing = vec![FileEntry::new(path.clone(), 1)];
        let resolved = identify_target(&listing, FileEntry::new(aliased, 1));

        assert_eq!(resolved.path, path);
    }
}
