use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use starsync::export::export_json;
use starsync::{
    Config, HttpTransport, PageWalker, ReadmeResolver, Reconciler, SqliteStore, SyncOptions,
    Transport,
};

#[derive(Parser)]
#[command(name = "starsync")]
#[command(about = "Mirror your GitHub stars into a local SQLite database")]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database file
    #[arg(long)]
    db: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Do not update the database (offline, use existing data)
    #[arg(long)]
    skip_update: bool,

    /// Export the database as JSON to stdout
    #[arg(long)]
    json: bool,

    /// Fetch README content for starred repositories
    #[arg(long)]
    get_readme: bool,

    /// Store private starred repositories
    #[arg(long)]
    store_private: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli)?;

    init_logging(cli.debug, &config.logging.level)?;
    debug!("Starting starsync v{}", env!("CARGO_PKG_VERSION"));

    if config.sync.fetch_readme {
        info!("Fetching READMEs enabled");
    }
    if cli.json {
        info!("JSON export enabled");
    }

    let db_path = config.database_path();
    if cli.skip_update && cli.json && !db_path.exists() {
        bail!(
            "Database file {} not found, use the exporter without --skip-update at least once.",
            db_path.display()
        );
    }

    // Resolve the credential before touching the database so a missing token
    // leaves no empty database behind.
    let transport: Option<Arc<dyn Transport>> = if cli.skip_update {
        None
    } else {
        Some(Arc::new(HttpTransport::from_config(&config)?))
    };

    let store = SqliteStore::open_at(&db_path)?;

    match transport {
        Some(transport) => cmd_sync(&config, transport, &store).await?,
        None => info!("Skipping update (offline mode)"),
    }

    if cli.json {
        export_json(&store, std::io::stdout().lock())?;
    }

    Ok(())
}

/// Initialize logging; RUST_LOG wins over flags and configuration
fn init_logging(debug: bool, level: &str) -> Result<()> {
    let default_level = if debug { "debug" } else { level };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout is reserved for the JSON export
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();

    Ok(())
}

/// Load configuration from specified path or default location
fn load_config(config_path: Option<&std::path::Path>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(path),
        None => Config::load_or_default(),
    }
}

/// Command-line flags take precedence over the configuration file
fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<()> {
    if let Some(db) = &cli.db {
        config.database = db.clone();
        config.expand_paths()?;
    }
    if cli.get_readme {
        config.sync.fetch_readme = true;
    }
    if cli.store_private {
        config.sync.store_private = true;
    }
    Ok(())
}

/// Fetch all starred repositories and reconcile them with the store
async fn cmd_sync(config: &Config, transport: Arc<dyn Transport>, store: &SqliteStore) -> Result<()> {
    info!("Fetching stars from {}...", config.api_base());

    let options = SyncOptions {
        store_private: config.sync.store_private,
        fetch_readme: config.sync.fetch_readme,
    };
    let resolver = ReadmeResolver::new(transport.clone(), config.api_base());
    let walker = PageWalker::new(transport, config.starred_url());

    let summary = Reconciler::new(store, Some(&resolver), options)
        .run(walker.into_stream())
        .await?;

    info!("New stars: {}", summary.new);
    info!("Updated stars: {}", summary.updated);
    debug!(
        "Unchanged: {}, private skipped: {}, pages: {}",
        summary.skipped, summary.skipped_private, summary.pages
    );

    Ok(())
}
