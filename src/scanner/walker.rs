//! Directory enumeration for candidate discovery.
//!
//! # Overview
//!
//! The [`Walker`] lists the regular files of the watched directory together
//! with their stored sizes. By default only the top level is listed, matching
//! the set of documents a new arrival is compared against; recursive listing
//! is opt-in.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{DirectoryView, FileEntry, ScanError};

/// Configuration for directory listing.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,
}

/// Filesystem-backed [`DirectoryView`].
#[derive(Debug, Clone)]
pub struct Walker {
    /// Directory to list
    root: PathBuf,
    /// Listing configuration
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given directory.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
        }
    }

    fn is_hidden(name: &str) -> bool {
        name.starts_with('.')
    }

    /// `/`-joined path of `path` below the root.
    fn relative_name(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect();
        (!parts.is_empty()).then(|| parts.join("/"))
    }
}

impl DirectoryView for Walker {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list(&self) -> Result<Vec<FileEntry>, ScanError> {
        let metadata = std::fs::metadata(&self.root).map_err(|e| ScanError::from_io(&self.root, e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }

        let max_depth = if self.config.recursive { usize::MAX } else { 1 };
        let skip_hidden = self.config.skip_hidden;

        let mut entries = Vec::new();
        let walk = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| {
                // The root itself may be hidden (e.g. temp dirs)
                e.depth() == 0
                    || !(skip_hidden && Walker::is_hidden(&e.file_name().to_string_lossy()))
            });

        for result in walk {
            let dir_entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !dir_entry.file_type().is_file() {
                continue;
            }
            match dir_entry.metadata() {
                Ok(meta) => {
                    let mut entry = FileEntry::new(dir_entry.path().to_path_buf(), meta.len());
                    if let Some(name) = self.relative_name(dir_entry.path()) {
                        entry = entry.with_name(name);
                    }
                    entry.modified = meta.modified().ok();
                    entries.push(entry);
                }
                Err(e) => {
                    log::warn!(
                        "Failed to read metadata for {}: {}",
                        dir_entry.path().display(),
                        e
                    );
                }
            }
        }

        log::debug!("Listed {} files in {}", entries.len(), self.root.display());
        Ok(entries)
    }
}
