//! neardupe - Near-Duplicate Document Detector
//!
//! Fingerprints documents with a Rabin-Karp rolling hash, scores every
//! candidate in a directory against a target by Jaccard similarity, and
//! sorts the candidates into exact, high and moderate tiers. Matches can be
//! moved to the trash after confirmation, either for a single document
//! (`scan`) or for every document that appears in a watched directory
//! (`watch`).

pub mod actions;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod similarity;
pub mod watcher;

use std::collections::BTreeSet;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::actions::{
    confirm_and_delete, AssumeYes, Confirmer, DeleteConfig, DeleteProgressCallback,
    DialogConfirmer, FileSnapshot, LockRegistry,
};
use crate::cli::{Cli, Commands, DetectArgs};
use crate::config::Config;
use crate::error::ExitCode;
use crate::output::{render, OutputFormat};
use crate::progress::{Progress, ProgressCallback};
use crate::scanner::{DocumentExtractor, Walker, WalkerConfig};
use crate::similarity::{auto_select, DetectionReport, DuplicateDetector};
use crate::watcher::{WatchConfig, Watcher};

/// Run the command described by `cli` and return the process exit code.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the target cannot be read,
/// the directory cannot be listed or watched, or the run is interrupted.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    if cli.no_color || !io::stdout().is_terminal() {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref(), &cli.overrides())
        .context("failed to load configuration")?;
    log::debug!("Effective configuration: {:?}", config);

    let shutdown = signal::install_handler().context("failed to install signal handler")?;
    let format = cli.output_format();
    let detect = cli.detect_args().clone();

    match &cli.command {
        Commands::Scan(args) => {
            let target = args
                .target
                .canonicalize()
                .with_context(|| format!("cannot open target {}", args.target.display()))?;
            let dir = match &args.dir {
                Some(dir) => dir.clone(),
                None => parent_dir(&target)?,
            };
            let dir = dir
                .canonicalize()
                .with_context(|| format!("cannot open directory {}", dir.display()))?;

            let runner = Runner::new(config, detect, format, !cli.quiet, shutdown.flag());
            runner.examine(&target, &dir)
        }
        Commands::Watch(args) => {
            let dir = args
                .dir
                .canonicalize()
                .with_context(|| format!("cannot open directory {}", args.dir.display()))?;
            let watch_config = WatchConfig::new(&dir)
                .with_recursive(config.recursive)
                .with_settle_delay(Duration::from_secs(config.settle_delay_secs))
                .with_workers(config.workers)
                .with_ignore_suffixes(config.ignore_suffixes.iter().cloned());

            // Several workers may report at once; progress bars would interleave
            let runner = Arc::new(Runner::new(config, detect, format, false, shutdown.flag()));
            let handler_runner = Arc::clone(&runner);
            let watcher = Watcher::new(watch_config, move |path: &Path| {
                handler_runner.examine_new_file(path);
            })?;

            let flag = shutdown.flag();
            watcher.run(&flag)?;
            if flag.load(Ordering::SeqCst) {
                Ok(ExitCode::Interrupted)
            } else {
                Ok(ExitCode::Success)
            }
        }
    }
}

fn parent_dir(path: &Path) -> Result<PathBuf> {
    path.parent()
        .map(Path::to_path_buf)
        .with_context(|| format!("{} has no parent directory", path.display()))
}

/// Everything needed to examine one target document.
struct Runner {
    config: Config,
    args: DetectArgs,
    format: OutputFormat,
    show_progress: bool,
    shutdown: Arc<AtomicBool>,
    locks: LockRegistry,
    /// Serializes report output and confirmation prompts between workers.
    console: Mutex<()>,
}

impl Runner {
    fn new(
        config: Config,
        args: DetectArgs,
        format: OutputFormat,
        show_progress: bool,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            args,
            format,
            show_progress: show_progress && !format.is_machine_readable(),
            shutdown,
            locks: LockRegistry::new(),
            console: Mutex::new(()),
        }
    }

    /// Watch-mode entry: examine `path` against its own directory and log the outcome.
    fn examine_new_file(&self, path: &Path) {
        let result = path
            .canonicalize()
            .with_context(|| format!("cannot open {}", path.display()))
            .and_then(|target| {
                let dir = parent_dir(&target)?;
                self.examine(&target, &dir)
            });

        match result {
            Ok(code) => log::info!("{}: finished ({})", path.display(), code.code_prefix()),
            Err(e) if ExitCode::for_error(&e) == ExitCode::Interrupted => {
                log::debug!("{}: interrupted", path.display());
            }
            Err(e) => log::error!("{}: {:#}", path.display(), e),
        }
    }

    /// Detect, report, and optionally delete the selected candidates.
    fn examine(&self, target: &Path, dir: &Path) -> Result<ExitCode> {
        let lock = self.locks.lock_for(dir);
        let progress: Arc<dyn ProgressCallback> = Arc::new(Progress::new(!self.show_progress));
        let detector_config = self
            .config
            .detector_config()
            .with_shutdown_flag(Arc::clone(&self.shutdown))
            .with_progress_callback(progress)
            .with_lock(lock.clone());
        let extractor = DocumentExtractor::new(self.config.mode, self.config.preprocess_context());
        let detector = DuplicateDetector::with_source(detector_config, Arc::new(extractor));

        let walker = Walker::new(
            dir,
            WalkerConfig {
                recursive: self.config.recursive,
                skip_hidden: self.config.skip_hidden,
            },
        );

        let report = detector.detect(target, &walker)?;
        let classification = report.classification();
        let selected = auto_select(&classification, self.config.select);
        let exit_code = ExitCode::for_run(classification.match_count(), report.skipped.len());

        let _console = self.console.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            render(&report, &selected, exit_code, self.format, &mut out)
                .context("failed to write report")?;
        }

        if self.args.delete && !selected.is_empty() {
            self.delete_selected(&report, &selected, &lock)?;
        }

        Ok(exit_code)
    }

    fn delete_selected(
        &self,
        report: &DetectionReport,
        selected: &BTreeSet<String>,
        lock: &actions::DirectoryLock,
    ) -> Result<()> {
        let snapshots: Vec<FileSnapshot> = report
            .ranked()
            .into_iter()
            .filter(|result| selected.contains(&result.name))
            .map(FileSnapshot::from_result)
            .collect();

        let delete_config = if self.config.permanent {
            DeleteConfig::permanent()
        } else {
            DeleteConfig::trash()
        };
        let confirmer: &dyn Confirmer = if self.args.yes {
            &AssumeYes
        } else {
            &DialogConfirmer
        };

        let progress = Progress::new(!self.show_progress);
        let result = confirm_and_delete(
            &snapshots,
            confirmer,
            Some(lock),
            &delete_config,
            Some(&progress as &dyn DeleteProgressCallback),
        )
        .context("deletion was not confirmed")?;
        eprintln!("{}", result.summary());
        if !result.declined {
            for (path, error) in &result.failures {
                eprintln!("  {}: {}", path.display(), error);
            }
        }
        Ok(())
    }
}
