//! Scanner module for directory listing and document text extraction.
//!
//! This module provides the collaborators the detector consumes:
//! - Directory enumeration with size metadata ([`walker`])
//! - Text extraction from PDF, DOCX, RTF, HTML and plain text ([`document`])
//! - Explicit NLP preprocessing context ([`preprocess`])
//!
//! Both collaborators sit behind traits ([`DirectoryView`] and
//! [`document::TextSource`]) so the detector can be driven by in-memory
//! fixtures as well as the real filesystem.
//!
//! # Example
//!
//! ```no_run
//! use neardupe::scanner::{DirectoryView, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! for entry in walker.list().unwrap() {
//!     println!("{}: {} bytes", entry.name, entry.size);
//! }
//! ```

pub mod document;
pub mod preprocess;
pub mod walker;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

// Re-export main types
pub use document::{DocumentError, DocumentExtractor, ExtractionMode, TextSource};
pub use preprocess::PreprocessContext;
pub use walker::{Walker, WalkerConfig};

/// Metadata for a file in the watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Identifier unique within a listing: the path relative to the listed
    /// directory, `/`-separated. Equals the file name at the top level.
    pub name: String,
    /// Path to the file
    pub path: PathBuf,
    /// Stored size in bytes
    pub size: u64,
    /// Last modification time, if the platform reports one
    pub modified: Option<SystemTime>,
}

impl FileEntry {
    /// Create a new FileEntry. The name is taken from the last path component.
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            name,
            path,
            size,
            modified: None,
        }
    }

    /// Replace the identifier.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Attach a modification time.
    #[must_use]
    pub fn with_modified(mut self, modified: SystemTime) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Read size and modification time of a file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the metadata cannot be read.
    pub fn from_path(path: &Path) -> Result<Self, ScanError> {
        let metadata = std::fs::metadata(path).map_err(|e| ScanError::from_io(path, e))?;
        let mut entry = Self::new(path.to_path_buf(), metadata.len());
        entry.modified = metadata.modified().ok();
        Ok(entry)
    }

    /// Lowercase extension without the leading dot.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
    }
}

/// A read-only view of a directory's files and their sizes.
pub trait DirectoryView: Send + Sync {
    /// The directory this view enumerates.
    fn root(&self) -> &Path;

    /// Enumerate the files of the directory.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the directory itself cannot be read.
    /// Unreadable individual entries are skipped.
    fn list(&self) -> Result<Vec<FileEntry>, ScanError>;
}

/// Errors that can occur during directory listing.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Classify an I/O error for the given path.
    #[must_use]
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}
