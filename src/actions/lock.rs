//! Per-directory advisory lock serializing deletion against detection.
//!
//! # Overview
//!
//! Any number of detection runs may read a directory at once. A deletion
//! must not remove a file that an in-flight run is still scoring, so it takes
//! the exclusive side of the lock, which waits until every detection guard
//! has been dropped. Waiting deleters block new detection runs from starting,
//! so a steady stream of file arrivals cannot starve a deletion.
//!
//! The lock is advisory: it only coordinates code paths in this process that
//! go through it.
//!
//! # Example
//!
//! ```
//! use neardupe::actions::lock::DirectoryLock;
//!
//! let lock = DirectoryLock::new("/downloads");
//! {
//!     let _detecting = lock.begin_detection();
//!     assert_eq!(lock.in_flight(), 1);
//! }
//! let _deleting = lock.begin_deletion();
//! assert_eq!(lock.in_flight(), 0);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct LockCounts {
    /// Detection runs holding a guard
    detections: usize,
    /// Whether a deletion holds the lock
    deleting: bool,
    /// Deletions waiting for detections to drain
    deleters_waiting: usize,
}

#[derive(Debug)]
struct LockState {
    path: PathBuf,
    counts: Mutex<LockCounts>,
    changed: Condvar,
}

impl LockState {
    fn counts(&self) -> MutexGuard<'_, LockCounts> {
        // Counters stay consistent even if a holder panicked
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, LockCounts>) -> MutexGuard<'a, LockCounts> {
        self.changed
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared/exclusive lock for one directory.
///
/// Cloning yields another handle to the same lock.
#[derive(Clone)]
pub struct DirectoryLock {
    state: Arc<LockState>,
}

impl fmt::Debug for DirectoryLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryLock")
            .field("path", &self.state.path)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl DirectoryLock {
    /// Create a lock for the given directory.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            state: Arc::new(LockState {
                path: path.into(),
                counts: Mutex::new(LockCounts::default()),
                changed: Condvar::new(),
            }),
        }
    }

    /// Directory this lock guards.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.state.path
    }

    /// Number of detection runs currently holding a guard.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.state.counts().detections
    }

    /// Register a detection run.
    ///
    /// Blocks while a deletion holds or is waiting for the lock.
    #[must_use = "the detection is only registered while the guard is alive"]
    pub fn begin_detection(&self) -> DetectionGuard {
        let mut counts = self.state.counts();
        while counts.deleting || counts.deleters_waiting > 0 {
            counts = self.state.wait(counts);
        }
        counts.detections += 1;
        log::trace!(
            "Detection started in {} ({} in flight)",
            self.state.path.display(),
            counts.detections
        );
        DetectionGuard {
            state: Arc::clone(&self.state),
        }
    }

    /// Take the lock exclusively for deleting files.
    ///
    /// Blocks until no detection run is in flight.
    #[must_use = "the lock is released when the guard is dropped"]
    pub fn begin_deletion(&self) -> DeletionGuard {
        let mut counts = self.state.counts();
        counts.deleters_waiting += 1;
        while counts.deleting || counts.detections > 0 {
            log::debug!(
                "Deletion in {} waiting for {} detection run(s)",
                self.state.path.display(),
                counts.detections
            );
            counts = self.state.wait(counts);
        }
        counts.deleters_waiting -= 1;
        counts.deleting = true;
        DeletionGuard {
            state: Arc::clone(&self.state),
        }
    }
}

/// Shared guard held for the duration of a detection run.
#[derive(Debug)]
pub struct DetectionGuard {
    state: Arc<LockState>,
}

impl Drop for DetectionGuard {
    fn drop(&mut self) {
        let mut counts = self.state.counts();
        counts.detections = counts.detections.saturating_sub(1);
        drop(counts);
        self.state.changed.notify_all();
    }
}

/// Exclusive guard held while files are deleted.
#[derive(Debug)]
pub struct DeletionGuard {
    state: Arc<LockState>,
}

impl Drop for DeletionGuard {
    fn drop(&mut self) {
        let mut counts = self.state.counts();
        counts.deleting = false;
        drop(counts);
        self.state.changed.notify_all();
    }
}

/// Hands out one [`DirectoryLock`] per directory path.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<PathBuf, DirectoryLock>>,
}

impl LockRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `dir`, created on first use.
    ///
    /// Paths are compared as given; canonicalize them first if aliases matter.
    pub fn lock_for(&self, dir: &Path) -> DirectoryLock {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(dir.to_path_buf())
            .or_insert_with(|| DirectoryLock::new(dir))
            .clone()
    }

    /// Number of directories with a lock.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no lock has been handed out yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
