//! User-confirmed deletion of recommended near-duplicates.
//!
//! # Overview
//!
//! Detection only recommends. This module is the separate, user-facing step
//! that actually removes files:
//! - the user confirms the batch through a [`Confirmer`]
//! - the directory's [`DirectoryLock`] is taken exclusively, waiting for
//!   in-flight detection runs to finish
//! - each file is checked against the [`FileSnapshot`] taken at detection
//!   time (TOCTOU protection) before it is moved to the trash or removed
//!
//! # Example
//!
//! ```no_run
//! use neardupe::actions::delete::{confirm_and_delete, AssumeYes, DeleteConfig, FileSnapshot};
//! use std::path::Path;
//!
//! let snapshot = FileSnapshot::capture(Path::new("/downloads/copy.txt")).unwrap();
//! let result = confirm_and_delete(&[snapshot], &AssumeYes, None, &DeleteConfig::trash(), None)
//!     .unwrap();
//! println!("{}", result.summary());
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bytesize::ByteSize;
use thiserror::Error;

use super::lock::DirectoryLock;
use crate::similarity::CandidateResult;

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0} - try running with elevated privileges")]
    PermissionDenied(PathBuf),

    /// File was modified since it was scored (TOCTOU protection).
    #[error("file modified since detection: {0}")]
    Modified(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed { path: PathBuf, message: String },

    /// Permanent delete operation failed.
    #[error("permanent delete failed for {path}: {message}")]
    PermanentDeleteFailed { path: PathBuf, message: String },

    /// The confirmation prompt could not be shown.
    #[error("confirmation prompt failed: {0}")]
    ConfirmationFailed(String),

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    /// Get the path associated with this error (if any).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::Modified(p)
            | Self::TrashFailed { path: p, .. }
            | Self::PermanentDeleteFailed { path: p, .. }
            | Self::Io { path: p, .. } => Some(p),
            Self::ConfirmationFailed(_) => None,
        }
    }

    fn from_io(path: &Path, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }
    }
}

/// Result of a successful deletion operation.
#[derive(Debug, Clone)]
pub struct DeleteResult {
    /// Path that was deleted.
    pub path: PathBuf,
    /// Size of the deleted file in bytes.
    pub size: u64,
    /// Whether deletion was permanent (true) or to trash (false).
    pub permanent: bool,
}

impl DeleteResult {
    /// Create a new delete result.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, permanent: bool) -> Self {
        Self {
            path,
            size,
            permanent,
        }
    }
}

/// Results of a batch deletion operation.
#[derive(Debug, Clone, Default)]
pub struct BatchDeleteResult {
    /// Successfully deleted files.
    pub successes: Vec<DeleteResult>,
    /// Failed deletions with their errors.
    pub failures: Vec<(PathBuf, String)>,
    /// Total bytes freed.
    pub bytes_freed: u64,
    /// The user declined the confirmation prompt.
    pub declined: bool,
}

impl BatchDeleteResult {
    /// Number of successful deletions.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    /// Number of failed deletions.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Total number of attempted deletions.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// Check if all deletions succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.declined {
            "Deletion declined, no files removed".to_string()
        } else if self.all_succeeded() {
            format!(
                "Deleted {} file(s), freed {}",
                self.success_count(),
                ByteSize::b(self.bytes_freed)
            )
        } else {
            format!(
                "Deleted {} file(s), {} failed, freed {}",
                self.success_count(),
                self.failure_count(),
                ByteSize::b(self.bytes_freed)
            )
        }
    }
}

/// Configuration for deletion operations.
#[derive(Debug, Clone)]
pub struct DeleteConfig {
    /// Use permanent deletion instead of trash.
    pub permanent: bool,
    /// Verify size and modification time before deletion (TOCTOU protection).
    pub verify_snapshot: bool,
    /// Continue on error (process remaining files even if some fail).
    pub continue_on_error: bool,
}

impl Default for DeleteConfig {
    fn default() -> Self {
        Self {
            permanent: false,
            verify_snapshot: true,
            continue_on_error: true,
        }
    }
}

impl DeleteConfig {
    /// Create config for trash deletion.
    #[must_use]
    pub fn trash() -> Self {
        Self::default()
    }

    /// Create config for permanent deletion.
    #[must_use]
    pub fn permanent() -> Self {
        Self {
            permanent: true,
            ..Self::default()
        }
    }

    /// Enable/disable TOCTOU verification.
    #[must_use]
    pub fn with_verify_snapshot(mut self, verify: bool) -> Self {
        self.verify_snapshot = verify;
        self
    }

    /// Enable/disable continue on error.
    #[must_use]
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }
}

/// Callback trait for deletion progress reporting.
pub trait DeleteProgressCallback: Send + Sync {
    /// Called before each file deletion.
    fn on_before_delete(&self, path: &Path, index: usize, total: usize);

    /// Called after successful deletion.
    fn on_delete_success(&self, path: &Path, size: u64);

    /// Called after failed deletion.
    fn on_delete_failure(&self, path: &Path, error: &str);

    /// Called when batch operation completes.
    fn on_complete(&self, result: &BatchDeleteResult);
}

/// Asks the user whether a batch may be deleted.
pub trait Confirmer: Send + Sync {
    /// Return `true` to proceed with deleting `paths`.
    ///
    /// # Errors
    ///
    /// Returns [`DeleteError::ConfirmationFailed`] if the user cannot be asked.
    fn confirm(&self, paths: &[PathBuf], permanent: bool) -> Result<bool, DeleteError>;
}

/// Interactive terminal prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct DialogConfirmer;

impl Confirmer for DialogConfirmer {
    fn confirm(&self, paths: &[PathBuf], permanent: bool) -> Result<bool, DeleteError> {
        for path in paths {
            eprintln!("  {}", path.display());
        }
        let action = if permanent {
            "Permanently delete"
        } else {
            "Move to trash"
        };
        dialoguer::Confirm::new()
            .with_prompt(format!("{} {} file(s)?", action, paths.len()))
            .default(false)
            .interact()
            .map_err(|e| DeleteError::ConfirmationFailed(e.to_string()))
    }
}

/// Confirms every batch without asking (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirmer for AssumeYes {
    fn confirm(&self, _paths: &[PathBuf], _permanent: bool) -> Result<bool, DeleteError> {
        Ok(true)
    }
}

/// File metadata snapshot for TOCTOU verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    /// Path to the file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time.
    pub mtime: Option<SystemTime>,
}

impl FileSnapshot {
    /// Create a snapshot of a file's current state.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or can't be accessed.
    pub fn capture(path: &Path) -> Result<Self, DeleteError> {
        let metadata = fs::metadata(path).map_err(|e| DeleteError::from_io(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            mtime: metadata.modified().ok(),
        })
    }

    /// Snapshot of a candidate as it was listed at detection time.
    #[must_use]
    pub fn from_result(result: &CandidateResult) -> Self {
        Self {
            path: result.path.clone(),
            size: result.size,
            mtime: result.modified,
        }
    }

    /// Verify that the file still matches this snapshot.
    ///
    /// # Errors
    ///
    /// Returns error if file was modified, deleted, or can't be accessed.
    pub fn verify(&self) -> Result<(), DeleteError> {
        let current = Self::capture(&self.path)?;

        if let (Some(orig), Some(curr)) = (self.mtime, current.mtime) {
            if orig != curr {
                log::warn!(
                    "File modified since detection: {} (mtime changed)",
                    self.path.display()
                );
                return Err(DeleteError::Modified(self.path.clone()));
            }
        }

        if self.size != current.size {
            log::warn!(
                "File modified since detection: {} (size changed from {} to {})",
                self.path.display(),
                self.size,
                current.size
            );
            return Err(DeleteError::Modified(self.path.clone()));
        }

        Ok(())
    }
}

/// Delete a single file to the system trash.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `PermissionDenied` if deletion is not allowed
/// - `TrashFailed` if the trash operation fails
pub fn delete_to_trash(path: &Path) -> Result<DeleteResult, DeleteError> {
    let size = fs::metadata(path)
        .map_err(|e| DeleteError::from_io(path, e))?
        .len();

    trash::delete(path).map_err(|e| {
        log::error!("Trash operation failed for {}: {}", path.display(), e);
        DeleteError::TrashFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    log::info!("Moved to trash: {} ({})", path.display(), ByteSize::b(size));

    Ok(DeleteResult::new(path.to_path_buf(), size, false))
}

/// Permanently delete a single file.
///
/// **WARNING**: This operation cannot be undone.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `PermissionDenied` if deletion is not allowed
/// - `PermanentDeleteFailed` if the delete operation fails
pub fn permanent_delete(path: &Path) -> Result<DeleteResult, DeleteError> {
    let size = fs::metadata(path)
        .map_err(|e| DeleteError::from_io(path, e))?
        .len();

    fs::remove_file(path).map_err(|e| {
        log::error!("Permanent delete failed for {}: {}", path.display(), e);
        DeleteError::PermanentDeleteFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    log::info!("Permanently deleted: {} ({})", path.display(), ByteSize::b(size));

    Ok(DeleteResult::new(path.to_path_buf(), size, true))
}

/// Delete a single file after checking it against its snapshot.
///
/// # Errors
///
/// - `Modified` if the file was changed since detection
/// - Other errors from [`delete_to_trash`] or [`permanent_delete`]
pub fn delete_verified(
    snapshot: &FileSnapshot,
    config: &DeleteConfig,
) -> Result<DeleteResult, DeleteError> {
    if config.verify_snapshot {
        snapshot.verify()?;
    }

    if config.permanent {
        permanent_delete(&snapshot.path)
    } else {
        delete_to_trash(&snapshot.path)
    }
}

/// Delete multiple files in batch.
///
/// Processes all files, continuing on error if configured to do so.
pub fn delete_batch<C: DeleteProgressCallback + ?Sized>(
    snapshots: &[FileSnapshot],
    config: &DeleteConfig,
    callback: Option<&C>,
) -> BatchDeleteResult {
    let mut result = BatchDeleteResult::default();
    let total = snapshots.len();

    for (index, snapshot) in snapshots.iter().enumerate() {
        let path = &snapshot.path;
        if let Some(cb) = callback {
            cb.on_before_delete(path, index, total);
        }

        match delete_verified(snapshot, config) {
            Ok(del) => {
                result.bytes_freed += del.size;
                if let Some(cb) = callback {
                    cb.on_delete_success(path, del.size);
                }
                result.successes.push(del);
            }
            Err(e) => {
                let error_msg = e.to_string();
                log::warn!("Failed to delete {}: {}", path.display(), error_msg);

                if let Some(cb) = callback {
                    cb.on_delete_failure(path, &error_msg);
                }

                result.failures.push((path.clone(), error_msg));

                if !config.continue_on_error {
                    log::info!("Stopping batch deletion due to error (continue_on_error=false)");
                    break;
                }
            }
        }
    }

    if let Some(cb) = callback {
        cb.on_complete(&result);
    }

    log::info!("{}", result.summary());

    result
}

/// Ask for confirmation, then delete the batch under the directory lock.
///
/// A declined confirmation deletes nothing and returns a result with
/// `declined` set.
///
/// # Errors
///
/// Returns [`DeleteError::ConfirmationFailed`] if the prompt fails. Per-file
/// failures are reported in the returned [`BatchDeleteResult`].
pub fn confirm_and_delete(
    snapshots: &[FileSnapshot],
    confirmer: &dyn Confirmer,
    lock: Option<&DirectoryLock>,
    config: &DeleteConfig,
    callback: Option<&dyn DeleteProgressCallback>,
) -> Result<BatchDeleteResult, DeleteError> {
    if snapshots.is_empty() {
        return Ok(BatchDeleteResult::default());
    }

    let paths: Vec<PathBuf> = snapshots.iter().map(|s| s.path.clone()).collect();
    if !confirmer.confirm(&paths, config.permanent)? {
        log::info!("Deletion of {} file(s) declined", paths.len());
        return Ok(BatchDeleteResult {
            declined: true,
            ..BatchDeleteResult::default()
        });
    }

    let _guard = lock.map(DirectoryLock::begin_deletion);
    Ok(delete_batch(snapshots, config, callback))
}
