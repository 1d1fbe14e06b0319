//! File actions module.
//!
//! This module provides functionality for:
//! - User-confirmed deletion of recommended near-duplicates ([`delete`])
//! - Serializing deletion against in-flight detection runs ([`lock`])
//!
//! # Deletion
//!
//! Deletion is never triggered by detection itself. It goes through
//! [`delete::confirm_and_delete`], which:
//! - asks a [`Confirmer`] first
//! - moves files to the system trash by default (permanent on request)
//! - verifies each file against its detection-time snapshot
//!
//! ```no_run
//! use neardupe::actions::{confirm_and_delete, DeleteConfig, DialogConfirmer, DirectoryLock, FileSnapshot};
//! use std::path::Path;
//!
//! let lock = DirectoryLock::new("/downloads");
//! let snapshot = FileSnapshot::capture(Path::new("/downloads/copy.txt")).unwrap();
//! let result = confirm_and_delete(&[snapshot], &DialogConfirmer, Some(&lock), &DeleteConfig::trash(), None);
//! ```

pub mod delete;
pub mod lock;

// Re-export commonly used types
pub use delete::{
    confirm_and_delete, delete_batch, delete_to_trash, delete_verified, permanent_delete,
    AssumeYes, BatchDeleteResult, Confirmer, DeleteConfig, DeleteError, DeleteProgressCallback,
    DeleteResult, DialogConfirmer, FileSnapshot,
};
pub use lock::{DeletionGuard, DetectionGuard, DirectoryLock, LockRegistry};
