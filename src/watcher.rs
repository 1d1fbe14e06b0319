//! Directory watcher that feeds newly created documents to a handler.
//!
//! Filesystem notifications come from `notify`. Only file creations are
//! forwarded; partial downloads (`.crdownload`, `.part`, `.tmp`) are ignored.
//! Every accepted path waits for the settle delay, so the writer can finish,
//! and is then handed to one of a fixed number of worker threads. A slow
//! detection run therefore only occupies its own worker.
//!
//! # Example
//!
//! ```no_run
//! use neardupe::watcher::{WatchConfig, Watcher};
//! use std::sync::atomic::AtomicBool;
//!
//! let config = WatchConfig::new("/downloads");
//! let watcher = Watcher::new(config, |path: &std::path::Path| {
//!     println!("new file: {}", path.display());
//! })
//! .unwrap();
//! watcher.run(&AtomicBool::new(false)).unwrap();
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use notify::event::CreateKind;
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode};
use thiserror::Error;

use crate::config::DEFAULT_IGNORE_SUFFIXES;
use crate::signal::sleep_unless;

/// How often the event loop checks the shutdown flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Errors that stop the watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The watched path is missing or not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The platform watcher could not be created or attached.
    #[error("failed to watch {path}: {source}")]
    Notify {
        /// Watched directory
        path: PathBuf,
        /// Underlying notify error
        #[source]
        source: notify::Error,
    },

    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Watcher settings.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Directory to watch.
    pub directory: PathBuf,
    /// Watch subdirectories too.
    pub recursive: bool,
    /// Delay between the creation event and the handler call.
    pub settle_delay: Duration,
    /// Number of worker threads.
    pub workers: usize,
    /// File name suffixes that are never dispatched.
    pub ignore_suffixes: Vec<String>,
}

impl WatchConfig {
    /// Defaults for `directory`: non-recursive, 5 s settle delay, 2 workers.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            recursive: false,
            settle_delay: Duration::from_secs(5),
            workers: 2,
            ignore_suffixes: DEFAULT_IGNORE_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Set recursive watching.
    #[must_use]
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Set the settle delay.
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the worker count (at least one).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Replace the ignored suffixes.
    #[must_use]
    pub fn with_ignore_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_suffixes = suffixes.into_iter().map(Into::into).collect();
        self
    }

    fn is_ignored(&self, path: &Path) -> bool {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        self.ignore_suffixes
            .iter()
            .any(|suffix| name.ends_with(&suffix.to_lowercase()))
    }
}

/// Receives the paths of settled new files.
pub trait CreatedFileHandler: Send + Sync {
    /// Called on a worker thread once per new file.
    fn on_created(&self, path: &Path);
}

impl<F> CreatedFileHandler for F
where
    F: Fn(&Path) + Send + Sync,
{
    fn on_created(&self, path: &Path) {
        self(path)
    }
}

/// A path waiting for its settle delay.
struct Job {
    path: PathBuf,
    ready_at: Instant,
}

/// Watches a directory and dispatches new files to a handler.
pub struct Watcher {
    config: WatchConfig,
    handler: Arc<dyn CreatedFileHandler>,
}

impl Watcher {
    /// Create a watcher for `config.directory`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::NotADirectory`] if the directory does not exist.
    pub fn new<H>(config: WatchConfig, handler: H) -> Result<Self, WatchError>
    where
        H: CreatedFileHandler + 'static,
    {
        if !config.directory.is_dir() {
            return Err(WatchError::NotADirectory(config.directory.clone()));
        }
        Ok(Self {
            config,
            handler: Arc::new(handler),
        })
    }

    /// The watcher configuration.
    #[must_use]
    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Paths in `event` that should be dispatched.
    #[must_use]
    pub fn accepted_paths(&self, event: &Event) -> Vec<PathBuf> {
        if !matches!(
            event.kind,
            EventKind::Create(CreateKind::File | CreateKind::Any)
        ) {
            return Vec::new();
        }
        event
            .paths
            .iter()
            .filter(|path| !path.is_dir())
            .filter(|path| {
                if self.config.is_ignored(path) {
                    log::debug!("Ignoring partial download {}", path.display());
                    false
                } else {
                    true
                }
            })
            .cloned()
            .collect()
    }

    /// Watch until `shutdown` is set.
    ///
    /// Jobs still waiting for their settle delay when shutdown is requested
    /// are dropped; handler calls already running are waited for.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Notify`] if the platform watcher fails to start
    /// and [`WatchError::Spawn`] if a worker thread cannot be created.
    pub fn run(&self, shutdown: &AtomicBool) -> Result<(), WatchError> {
        use notify::Watcher as _;

        let notify_error = |source| WatchError::Notify {
            path: self.config.directory.clone(),
            source,
        };

        let (event_tx, event_rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    let _ = event_tx.send(event);
                }
                Err(e) => log::warn!("File watcher error: {}", e),
            },
            NotifyConfig::default(),
        )
        .map_err(notify_error)?;

        let mode = if self.config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(&self.config.directory, mode)
            .map_err(notify_error)?;

        log::info!(
            "Watching {} ({} workers, settle delay {:?})",
            self.config.directory.display(),
            self.config.workers,
            self.config.settle_delay
        );

        thread::scope(|scope| {
            let (job_tx, job_rx) = mpsc::channel::<Job>();
            let job_rx = Arc::new(Mutex::new(job_rx));

            for id in 0..self.config.workers.max(1) {
                let job_rx = Arc::clone(&job_rx);
                let handler = Arc::clone(&self.handler);
                thread::Builder::new()
                    .name(format!("neardupe-worker-{}", id))
                    .spawn_scoped(scope, move || worker_loop(&job_rx, handler.as_ref(), shutdown))
                    .map_err(WatchError::Spawn)?;
            }

            while !shutdown.load(Ordering::SeqCst) {
                let event = match event_rx.recv_timeout(POLL_INTERVAL) {
                    Ok(event) => event,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                };
                for path in self.accepted_paths(&event) {
                    log::debug!("New file {}", path.display());
                    let job = Job {
                        path,
                        ready_at: Instant::now() + self.config.settle_delay,
                    };
                    if job_tx.send(job).is_err() {
                        log::warn!("All workers have stopped");
                        return Ok(());
                    }
                }
            }

            log::info!("Watcher stopping");
            Ok(())
        })
    }
}

fn worker_loop(jobs: &Mutex<Receiver<Job>>, handler: &dyn CreatedFileHandler, shutdown: &AtomicBool) {
    loop {
        let job = {
            let rx = jobs.lock().unwrap_or_else(PoisonError::into_inner);
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(job) => job,
                Err(RecvTimeoutError::Timeout) => {
                    if shutdown.load(Ordering::SeqCst) {
                        return;
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => return,
            }
        };

        let wait = job.ready_at.saturating_duration_since(Instant::now());
        if !sleep_unless(shutdown, wait) {
            return;
        }
        if !job.path.exists() {
            log::debug!("{} disappeared before it settled", job.path.display());
            continue;
        }
        handler.on_created(&job.path);
    }
}
