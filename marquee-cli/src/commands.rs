//! CLI command implementations

use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use marquee_core::MarqueeConfig;
use marquee_search::CatalogService;
use marquee_search::service::parse_list;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the addon server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run a full classification pass and store its snapshots
    Refresh {
        /// User namespace owning the list
        uid: String,
        /// List URL or id
        list: String,
    },
    /// Print the title ids of a list
    Fetch {
        /// List URL or id
        list: String,
    },
    /// Classify a list and print the outcome as JSON
    Classify {
        /// List URL or id
        list: String,
    },
    /// Print the lists registered for a user
    Lists {
        uid: String,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns the first failure of the command, with context
pub async fn handle_command(command: Commands, data_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = MarqueeConfig::from_env();
    if let Some(dir) = data_dir {
        config.storage.data_dir = dir;
    }

    match command {
        Commands::Serve { host, port } => serve(config, host, port).await,
        Commands::Refresh { uid, list } => refresh(config, &uid, &list).await,
        Commands::Fetch { list } => fetch(config, &list).await,
        Commands::Classify { list } => classify(config, &list).await,
        Commands::Lists { uid } => lists(config, &uid).await,
    }
}

async fn open_service(config: MarqueeConfig) -> anyhow::Result<CatalogService> {
    let data_dir = config.storage.data_dir.clone();
    CatalogService::open(config)
        .await
        .with_context(|| format!("Failed to open data directory {}", data_dir.display()))
}

/// Start the addon server
///
/// # Errors
/// - Registry could not be loaded or the address could not be bound
pub async fn serve(
    mut config: MarqueeConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    marquee_web::run_server(config)
        .await
        .map_err(|e| anyhow::anyhow!("Server failed: {e}"))
}

/// Refresh one registered list
///
/// # Errors
/// - `ListError::NotFound` - The user has not added the list
/// - `ListError::Unavailable` - The list fetch yielded no ids
/// - `MarqueeError::Storage` - Snapshots could not be written
pub async fn refresh(config: MarqueeConfig, uid: &str, list: &str) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    let list = parse_list(list)?;

    let report = service.refresh_list(uid, &list).await?;
    println!(
        "Refreshed {} ({}): {} ids, {} movies, {} series, {} excluded",
        report.list,
        report.title,
        report.fetched,
        report.movies,
        report.series,
        report.excluded.len()
    );
    Ok(())
}

/// Print a list's title and ids
///
/// # Errors
/// - `ListError::Malformed` - No list id in the input
pub async fn fetch(config: MarqueeConfig, list: &str) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    let list = parse_list(list)?;

    let fetched = service.list_ids(&list).await;
    println!("{} ({} titles)", fetched.title, fetched.ids.len());
    for id in &fetched.ids {
        println!("  {id}");
    }
    Ok(())
}

/// Classify a list without storing anything
///
/// # Errors
/// - `ListError::Malformed` - No list id in the input
pub async fn classify(config: MarqueeConfig, list: &str) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    let list = parse_list(list)?;

    let (fetched, outcome) = service.classify_list(&list).await;
    tracing::info!(
        "Classified {} ids of {}: {} movies, {} series",
        fetched.ids.len(),
        list,
        outcome.movies.len(),
        outcome.series.len()
    );
    let json = serde_json::to_string_pretty(&outcome).context("Failed to encode outcome")?;
    println!("{json}");
    Ok(())
}

/// Print a user's lists
///
/// # Errors
/// - `MarqueeError::Storage` - The registry could not be loaded
pub async fn lists(config: MarqueeConfig, uid: &str) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    let entries = service.lists(uid).await;
    if entries.is_empty() {
        println!("No lists registered for {uid}");
        return Ok(());
    }
    for entry in entries {
        println!("{}  {}", entry.id, entry.name);
    }
    Ok(())
}
