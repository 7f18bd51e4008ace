//! Marquee CLI - Command-line interface
//!
//! Runs the addon server and exposes the classification pipeline for
//! one-off inspection of a list.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use marquee_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "marquee")]
#[command(about = "Movie and series catalogs from public title lists")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,

    /// Console log level (`RUST_LOG` overrides)
    #[arg(long, value_enum, default_value_t = CliLogLevel::Info)]
    log_level: CliLogLevel,

    /// Directory for the user registry and snapshots
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory for the last-run trace log
    #[arg(long)]
    logs_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_level.as_tracing_level(), cli.logs_dir.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    commands::handle_command(cli.command, cli.data_dir).await
}
