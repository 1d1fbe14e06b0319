//! Application configuration management.
//!
//! Settings are merged from several layers, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. TOML file (platform config dir, or `--config <PATH>`)
//! 3. Environment variables prefixed `NEARDUPE_` (e.g. `NEARDUPE_WINDOW_SIZE=12`)
//! 4. Command-line flags ([`CliOverrides`])
//!
//! # Example file
//!
//! ```toml
//! window_size = 12
//! size_ratio = 2.0
//! mode = "preprocessed"
//! select = "best"
//! settle_delay_secs = 3
//! ignore_suffixes = [".crdownload", ".part", ".tmp", ".download"]
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scanner::document::SUPPORTED_EXTENSIONS;
use crate::scanner::preprocess::DEFAULT_STOPWORDS;
use crate::scanner::{ExtractionMode, PreprocessContext};
use crate::similarity::{
    DetectorConfig, PrefilterConfig, SelectionPolicy, DEFAULT_SIZE_RATIO, DEFAULT_WINDOW_SIZE,
};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "NEARDUPE_";

/// Suffixes of files that are still being written by a download.
pub const DEFAULT_IGNORE_SUFFIXES: &[&str] = &[".crdownload", ".part", ".tmp"];

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer could not be parsed or merged.
    #[error("failed to load configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// An explicitly requested file does not exist.
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    /// A value is out of range.
    #[error("invalid configuration value for `{field}`: {message}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        message: String,
    },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Characters per fingerprint window.
    pub window_size: usize,
    /// Maximum candidate size relative to the target.
    pub size_ratio: f64,
    /// Text extraction mode.
    pub mode: ExtractionMode,
    /// Threads used to extract candidates.
    pub io_threads: usize,
    /// Seconds allowed per document extraction (0 disables the bound).
    pub extract_timeout_secs: u64,
    /// Seconds to wait after a file appears before examining it.
    pub settle_delay_secs: u64,
    /// Worker threads in watch mode.
    pub workers: usize,
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Skip hidden files when listing.
    pub skip_hidden: bool,
    /// Which matches are pre-marked for deletion.
    pub select: SelectionPolicy,
    /// Delete permanently instead of moving to trash.
    pub permanent: bool,
    /// Extensions eligible for comparison.
    pub extensions: Vec<String>,
    /// File suffixes ignored by the watcher.
    pub ignore_suffixes: Vec<String>,
    /// Stopwords for preprocessed mode (built-in list when unset).
    pub stopwords: Option<Vec<String>>,
    /// Strip common suffixes in preprocessed mode.
    pub stem: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            size_ratio: DEFAULT_SIZE_RATIO,
            mode: ExtractionMode::Raw,
            io_threads: 4,
            extract_timeout_secs: 30,
            settle_delay_secs: 5,
            workers: 2,
            recursive: false,
            skip_hidden: true,
            select: SelectionPolicy::AllMatches,
            permanent: false,
            extensions: SUPPORTED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            ignore_suffixes: DEFAULT_IGNORE_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            stopwords: None,
            stem: true,
        }
    }
}

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ExtractionMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_threads: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settle_delay_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recursive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<SelectionPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permanent: Option<bool>,
}

impl Config {
    /// Load configuration from every layer and validate it.
    ///
    /// With `path = None` the platform config file is used if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if an explicit `path` is missing,
    /// [`ConfigError::Figment`] if a layer fails to parse, and
    /// [`ConfigError::Invalid`] if a merged value is out of range.
    pub fn load(path: Option<&Path>, overrides: &CliOverrides) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) if !p.exists() => return Err(ConfigError::NotFound(p.to_path_buf())),
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path().filter(|p| p.exists()),
        };

        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = &file {
            log::debug!("Loading configuration from {}", file.display());
            figment = figment.merge(Toml::file(file));
        }
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(overrides))
            .extract()
            .map_err(Box::new)?;

        config.validate()?;
        Ok(config)
    }

    /// Platform-specific configuration file path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "neardupe", "neardupe")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(invalid("window_size", "must be at least 1"));
        }
        if !(self.size_ratio.is_finite() && self.size_ratio > 0.0) {
            return Err(invalid("size_ratio", "must be a positive number"));
        }
        if self.io_threads == 0 {
            return Err(invalid("io_threads", "must be at least 1"));
        }
        if self.workers == 0 {
            return Err(invalid("workers", "must be at least 1"));
        }
        if self.extensions.is_empty() {
            return Err(invalid("extensions", "must name at least one extension"));
        }
        Ok(())
    }

    /// Pre-filter settings.
    #[must_use]
    pub fn prefilter_config(&self) -> PrefilterConfig {
        PrefilterConfig::default()
            .with_size_ratio(self.size_ratio)
            .with_extensions(self.extensions.iter().cloned())
    }

    /// Preprocessing context for [`ExtractionMode::Preprocessed`].
    #[must_use]
    pub fn preprocess_context(&self) -> Arc<PreprocessContext> {
        let context = match &self.stopwords {
            Some(words) => PreprocessContext::new(words, self.stem),
            None => PreprocessContext::new(DEFAULT_STOPWORDS.iter().copied(), self.stem),
        };
        Arc::new(context)
    }

    /// Detector settings, without runtime hooks (shutdown flag, progress, lock).
    #[must_use]
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig::default()
            .with_window_size(self.window_size)
            .with_prefilter(self.prefilter_config())
            .with_mode(self.mode)
            .with_io_threads(self.io_threads)
            .with_extract_timeout(Duration::from_secs(self.extract_timeout_secs))
    }
}

fn invalid(field: &'static str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.to_string(),
    }
}
