//! Command-line interface definitions for neardupe.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options (verbosity, color, config file) apply to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Compare one document against the rest of its directory
//! neardupe scan ~/Downloads/report.pdf
//!
//! # JSON output for scripting
//! neardupe scan ~/Downloads/report.pdf --output json
//!
//! # Watch a directory and trash exact copies as they arrive
//! neardupe watch ~/Downloads --select best --delete --yes
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CliOverrides;
use crate::output::OutputFormat;
use crate::scanner::ExtractionMode;
use crate::similarity::SelectionPolicy;

/// Near-duplicate document detector.
///
/// neardupe fingerprints documents with a rolling hash and reports which
/// files in a directory are copies or close edits of a given document.
#[derive(Debug, Parser)]
#[command(name = "neardupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON objects on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compare a document against the other documents in a directory
    Scan(ScanArgs),
    /// Watch a directory and examine every new document
    Watch(WatchArgs),
}

/// Detection options shared by `scan` and `watch`.
#[derive(Debug, Clone, Default, Args)]
pub struct DetectArgs {
    /// Characters per fingerprint window
    #[arg(short, long, value_name = "N")]
    pub window: Option<usize>,

    /// Ignore candidates larger than this multiple of the target size
    #[arg(long, value_name = "RATIO")]
    pub size_ratio: Option<f64>,

    /// Compare raw text or preprocessed (normalized, stopwords removed, stemmed) text
    #[arg(short, long, value_enum)]
    pub mode: Option<ExtractionMode>,

    /// Which matches to mark for deletion
    #[arg(short, long, value_enum)]
    pub select: Option<SelectionPolicy>,

    /// Number of threads extracting candidates
    ///
    /// Lower values reduce disk thrashing on HDDs.
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Delete the selected candidates after confirmation
    #[arg(long)]
    pub delete: bool,

    /// Use permanent deletion instead of moving to trash
    ///
    /// Warning: Files cannot be recovered after permanent deletion.
    #[arg(long, requires = "delete")]
    pub permanent: bool,

    /// Skip confirmation prompts
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl DetectArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            window_size: self.window,
            size_ratio: self.size_ratio,
            mode: self.mode,
            io_threads: self.io_threads,
            select: self.select,
            permanent: self.permanent.then_some(true),
            ..CliOverrides::default()
        }
    }
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Document to compare
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Directory holding the candidates (defaults to the target's directory)
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    #[command(flatten)]
    pub detect: DetectArgs,
}

/// Arguments for the watch subcommand.
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Directory to watch
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Seconds to wait after a file appears before examining it
    #[arg(long, value_name = "SECS")]
    pub settle_delay: Option<u64>,

    /// Number of worker threads handling new files
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Also watch subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Output format for each report
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    #[command(flatten)]
    pub detect: DetectArgs,
}

impl Cli {
    /// Configuration values set on the command line.
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        match &self.command {
            Commands::Scan(args) => args.detect.overrides(),
            Commands::Watch(args) => CliOverrides {
                settle_delay_secs: args.settle_delay,
                workers: args.workers,
                recursive: args.recursive.then_some(true),
                ..args.detect.overrides()
            },
        }
    }

    /// Output format of the chosen subcommand.
    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        match &self.command {
            Commands::Scan(args) => args.output,
            Commands::Watch(args) => args.output,
        }
    }

    /// Detection options of the chosen subcommand.
    #[must_use]
    pub fn detect_args(&self) -> &DetectArgs {
        match &self.command {
            Commands::Scan(args) => &args.detect,
            Commands::Watch(args) => &args.detect,
        }
    }
}
