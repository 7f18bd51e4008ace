//! Tracing setup for Marquee
//!
//! Console output at the level the operator picks, plus a full trace log of
//! the last run on disk for post-mortem debugging of classification passes.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// File name of the trace log, replaced on every start.
pub const LAST_RUN_LOG: &str = "marquee-last-run.log";

/// Installs the global subscriber: a console layer at `console_level` and a
/// trace-level file layer writing [`LAST_RUN_LOG`] under `logs_dir`
/// (default `./logs`).
///
/// `RUST_LOG` takes precedence over `console_level` on the console.
///
/// # Errors
///
/// - `Box<dyn std::error::Error>` - If the logs directory or log file cannot be created
pub fn init_tracing(
    console_level: Level,
    logs_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (log_file, log_path) = open_last_run_log(logs_dir.unwrap_or_else(|| Path::new("logs")))?;

    let console = fmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_filter(console_filter(console_level));

    let trace_file = fmt::layer()
        .with_ansi(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(log_file)
        .with_filter(EnvFilter::new("trace"));

    tracing_subscriber::registry()
        .with(console)
        .with(trace_file)
        .init();

    tracing::info!(
        "Tracing initialized: console={}, trace log={}",
        console_level,
        log_path.display()
    );
    Ok(())
}

fn console_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()))
}

fn open_last_run_log(dir: &Path) -> std::io::Result<(File, PathBuf)> {
    create_dir_all(dir)?;
    let path = dir.join(LAST_RUN_LOG);
    Ok((File::create(&path)?, path))
}

/// Console verbosity selectable with `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliLogLevel {
    Error,
    Warn,
    Info,
    /// Per-id classification decisions and cache misses
    Debug,
    /// Everything, including upstream request URLs
    Trace,
}

impl CliLogLevel {
    /// ```
    /// use marquee_core::tracing_setup::CliLogLevel;
    ///
    /// assert_eq!(CliLogLevel::Info.as_tracing_level(), tracing::Level::INFO);
    /// ```
    pub fn as_tracing_level(self) -> Level {
        match self {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

impl std::fmt::Display for CliLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = self.as_tracing_level().to_string().to_lowercase();
        f.write_str(&level)
    }
}
