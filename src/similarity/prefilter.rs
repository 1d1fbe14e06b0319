//! Size-based candidate pre-filtering.
//!
//! Fingerprinting requires full text extraction, which is by far the most
//! expensive step. Before it runs, the directory listing is narrowed to
//! entries that could plausibly be near-duplicates of the target:
//!
//! - not the target itself
//! - a supported document extension
//! - a stored size of at most `size_ratio` times the target's size
//!
//! Candidates much larger than the target are assumed too dissimilar to
//! score. A true near-duplicate that was padded beyond the ratio is missed.

use crate::scanner::document::SUPPORTED_EXTENSIONS;
use crate::scanner::FileEntry;

/// Default upper bound of candidate size relative to the target size.
pub const DEFAULT_SIZE_RATIO: f64 = 1.5;

/// Configuration for the candidate pre-filter.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefilterConfig {
    /// Candidates larger than `target_size * size_ratio` are dropped.
    pub size_ratio: f64,
    /// Lowercase extensions (without the dot) that are eligible.
    pub extensions: Vec<String>,
}

impl Default for PrefilterConfig {
    fn default() -> Self {
        Self {
            size_ratio: DEFAULT_SIZE_RATIO,
            extensions: SUPPORTED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PrefilterConfig {
    /// Set the size ratio.
    #[must_use]
    pub fn with_size_ratio(mut self, ratio: f64) -> Self {
        self.size_ratio = ratio;
        self
    }

    /// Restrict eligible extensions.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    fn accepts_extension(&self, entry: &FileEntry) -> bool {
        entry
            .extension()
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }
}

/// Statistics from the pre-filter pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct PrefilterStats {
    /// Entries in the listing
    pub input: usize,
    /// Entries dropped because they are the target
    pub excluded_self: usize,
    /// Entries dropped for an unsupported extension
    pub excluded_extension: usize,
    /// Entries dropped for being too large
    pub excluded_size: usize,
    /// Entries that remain candidates
    pub retained: usize,
}

/// Narrow a directory listing to plausible candidates for `target`.
///
/// Listing order is preserved.
#[must_use]
pub fn prefilter(
    listing: Vec<FileEntry>,
    target: &FileEntry,
    config: &PrefilterConfig,
) -> (Vec<FileEntry>, PrefilterStats) {
    let mut stats = PrefilterStats {
        input: listing.len(),
        ..Default::default()
    };
    let max_size = target.size as f64 * config.size_ratio;

    let retained: Vec<FileEntry> = listing
        .into_iter()
        .filter(|entry| {
            if entry.path == target.path {
                stats.excluded_self += 1;
                false
            } else if !config.accepts_extension(entry) {
                log::trace!("Prefilter: unsupported extension {}", entry.path.display());
                stats.excluded_extension += 1;
                false
            } else if entry.size as f64 > max_size {
                log::debug!(
                    "Prefilter: {} too large ({} > {:.0} bytes)",
                    entry.name,
                    entry.size,
                    max_size
                );
                stats.excluded_size += 1;
                false
            } else {
                true
            }
        })
        .collect();

    stats.retained = retained.len();
    log::debug!(
        "Prefilter: {} → {} candidates ({} too large, {} unsupported)",
        stats.input,
        stats.retained,
        stats.excluded_size,
        stats.excluded_extension
    );

    (retained, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn entry(name: &str, size: u64) -> FileEntry {
        FileEntry::new(PathBuf::from("/docs").join(name), size)
    }

    #[test]
    fn test_excludes_target() {
        let target = entry("note.txt", 100);
        let listing = vec![entry("note.txt", 100), entry("copy.txt", 100)];

        let (kept, stats) = prefilter(listing, &target, &PrefilterConfig::default());

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "copy.txt");
        assert_eq!(stats.excluded_self, 1);
    }

    #[test]
    fn test_size_boundary() {
        let target = entry("note.txt", 100);
        let listing = vec![
            entry("exact.txt", 150),
            entry("over.txt", 151),
            entry("small.txt", 1),
        ];

        let (kept, stats) = prefilter(listing, &target, &PrefilterConfig::default());
        let names: Vec<_> = kept.iter().map(|e| e.name.as_str()).collect();

        assert_eq!(names, vec!["exact.txt", "small.txt"]);
        assert_eq!(stats.excluded_size, 1);
    }

    #[test]
    fn test_unsupported_extension() {
        let target = entry("note.txt", 100);
        let listing = vec![
            entry("movie.mp4", 10),
            entry("download.pdf.crdownload", 10),
            entry("README", 10),
            entry("report.PDF", 10),
        ];

        let (kept, stats) = prefilter(listing, &target, &PrefilterConfig::default());

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "report.PDF");
        assert_eq!(stats.excluded_extension, 3);
    }

    #[test]
    fn test_custom_ratio_and_extensions() {
        let target = entry("note.txt", 100);
        let listing = vec![entry("a.txt", 200), entry("b.md", 200)];
        let config = PrefilterConfig::default()
            .with_size_ratio(2.0)
            .with_extensions([".md"]);

        let (kept, _) = prefilter(listing, &target, &config);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "b.md");
    }

    #[test]
    fn test_preserves_order() {
        let target = entry("t.txt", 100);
        let listing = vec![entry("c.txt", 1), entry("a.txt", 2), entry("b.txt", 3)];

        let (kept, stats) = prefilter(listing, &target, &PrefilterConfig::default());
        let names: Vec<_> = kept.iter().map(|e| e.name.as_str()).collect();

        assert_eq!(names, vec!["c.txt", "a.txt", "b.txt"]);
        assert_eq!(stats.input, 3);
        assert_eq!(stats.retained, 3);
    }

    #[test]
    fn test_empty_target_keeps_only_empty_candidates() {
        let target = entry("t.txt", 0);
        let listing = vec![entry("empty.txt", 0), entry("one.txt", 1)];

        let (kept, _) = prefilter(listing, &target, &PrefilterConfig::default());

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "empty.txt");
    }
}
