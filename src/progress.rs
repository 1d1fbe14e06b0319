//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`Progress`] struct which implements [`ProgressCallback`]
//! to display progress bars in the terminal while candidates are scored, and
//! [`DeleteProgressCallback`] for confirmed deletions.
//! Progress is hidden in quiet mode and for machine-readable output.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use std::path::Path;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::actions::{BatchDeleteResult, DeleteProgressCallback};

/// Phase name for directory listing.
pub const PHASE_LISTING: &str = "listing";

/// Phase name for candidate extraction and scoring.
pub const PHASE_SCORING: &str = "scoring";

/// Progress callback for detection phases.
///
/// Implement this trait to receive progress updates during a detection run.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase ([`PHASE_LISTING`] or [`PHASE_SCORING`])
    /// * `total` - Total number of items to process
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Number of items finished so far
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    listing: Mutex<Option<ProgressBar>>,
    scoring: Mutex<Option<ProgressBar>>,
    deleting: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use neardupe::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// assert!(progress.is_quiet());
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            listing: Mutex::new(None),
            scoring: Mutex::new(None),
            deleting: Mutex::new(None),
            quiet,
        }
    }

    /// Whether output is suppressed.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    fn slot(bar: &Mutex<Option<ProgressBar>>) -> MutexGuard<'_, Option<ProgressBar>> {
        bar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listing_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn scoring_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        match phase {
            PHASE_LISTING => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::listing_style());
                pb.set_message("Listing directory");
                pb.enable_steady_tick(Duration::from_millis(100));
                *Self::slot(&self.listing) = Some(pb);
            }
            _ => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::scoring_style());
                pb.set_message("Scoring candidates");
                *Self::slot(&self.scoring) = Some(pb);
            }
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        if let Some(ref pb) = *Self::slot(&self.scoring) {
            pb.set_position(current as u64);
            pb.set_message(truncate_path(path, 30));
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        match phase {
            PHASE_LISTING => {
                if let Some(pb) = Self::slot(&self.listing).take() {
                    pb.finish_and_clear();
                }
            }
            _ => {
                if let Some(pb) = Self::slot(&self.scoring).take() {
                    pb.finish_with_message("Scoring complete");
                }
            }
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }

        if let Some(ref pb) = *Self::slot(&self.scoring) {
            pb.set_message(message.to_string());
        } else if let Some(ref pb) = *Self::slot(&self.listing) {
            pb.set_message(message.to_string());
        }
    }
}

impl DeleteProgressCallback for Progress {
    fn on_before_delete(&self, path: &Path, index: usize, total: usize) {
        if self.quiet {
            return;
        }

        let mut slot = Self::slot(&self.deleting);
        let pb = slot.get_or_insert_with(|| {
            let pb = self.multi.add(ProgressBar::new(total as u64));
            pb.set_style(Self::scoring_style());
            pb
        });
        pb.set_position(index as u64);
        pb.set_message(truncate_path(&path.to_string_lossy(), 30));
    }

    fn on_delete_success(&self, _path: &Path, _size: u64) {
        if let Some(ref pb) = *Self::slot(&self.deleting) {
            pb.inc(1);
        }
    }

    fn on_delete_failure(&self, path: &Path, error: &str) {
        log::debug!("Delete failed for {}: {}", path.display(), error);
        if let Some(ref pb) = *Self::slot(&self.deleting) {
            pb.inc(1);
        }
    }

    fn on_complete(&self, _result: &BatchDeleteResult) {
        if let Some(pb) = Self::slot(&self.deleting).take() {
            pb.finish_and_clear();
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len >= max_len {
        let tail: String = file_name.chars().skip(name_len + 3 - max_len).collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}
