//! Logging setup using the `log` facade and `env_logger` backend.
//!
//! The level comes from, in priority order:
//!
//! 1. `RUST_LOG` (if set)
//! 2. `--quiet` (errors only) or `--verbose` (debug, trace with `-vv`)
//! 3. info
//!
//! Debug builds print a timestamp and, when verbose, the module path. Release
//! builds print level and message only. PDF parsing crates are noisy at debug
//! level, so they are capped at `warn` unless `RUST_LOG` says otherwise.

use std::env;
use std::io::Write;

use env_logger::Builder;
use log::LevelFilter;

/// Third-party modules capped at `warn`.
const NOISY_MODULES: &[&str] = &["pdf_extract", "lopdf", "notify"];

/// Initialize logging from the CLI verbosity flags.
///
/// Returns `false` if a logger was already installed (for example when
/// `run_app` is called more than once in a test process).
///
/// # Example
///
/// ```rust,no_run
/// use neardupe::logging::init_logging;
///
/// init_logging(1, false);
/// log::debug!("visible with -v");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) -> bool {
    let mut builder = Builder::new();
    let level = determine_level(verbose, quiet);

    if env::var_os("RUST_LOG").is_some() {
        builder.parse_default_env();
    } else {
        builder.filter_level(level);
        for module in NOISY_MODULES {
            builder.filter_module(module, level.min(LevelFilter::Warn));
        }
    }

    configure_format(&mut builder, verbose);

    let installed = builder.try_init().is_ok();
    if installed {
        log::debug!("Logging initialized at level {:?}", log::max_level());
    }
    installed
}

/// Map CLI flags to a level. `quiet` wins over `verbose`.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn configure_format(builder: &mut Builder, verbose: u8) {
    #[cfg(debug_assertions)]
    {
        builder.format(move |buf, record| {
            let timestamp = buf.timestamp_seconds();
            let level = record.level();
            let level_style = buf.default_level_style(level);

            if verbose >= 1 {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} [{}] {}",
                    timestamp,
                    level,
                    record.module_path().unwrap_or("unknown"),
                    record.args()
                )
            } else {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} {}",
                    timestamp,
                    level,
                    record.args()
                )
            }
        });
    }

    #[cfg(not(debug_assertions))]
    {
        let _ = verbose;
        builder.format(|buf, record| {
            let level = record.level();
            let level_style = buf.default_level_style(level);
            writeln!(
                buf,
                "{level_style}{:<5}{level_style:#} {}",
                level,
                record.args()
            )
        });
    }
}
