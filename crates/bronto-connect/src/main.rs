//! bronto-connect - Bronto incremental sync connector
//!
//! The binary checks a configuration against a catalog and state before a
//! run and shows what a run would fetch. Syncing itself needs a wire client,
//! which embedders supply through the library's `RemoteApi` trait.
//!
//! # Usage
//!
//! ```bash
//! # Validate config, catalog and state
//! bronto-connect -c config.json --catalog catalog.json --state state.json validate
//!
//! # Show start dates and window counts per selected stream
//! bronto-connect -c config.json --catalog catalog.json --state state.json plan
//!
//! # List available streams
//! bronto-connect streams
//! ```

use anyhow::{Context, Result};
use bronto_connect::streams::{create_stream_registry, StreamStrategy};
use bronto_connect::sync::{resolve_start, windows, Clock, SystemClock};
use bronto_connect::traits::{format_timestamp, Catalog, State};
use bronto_connect::ConnectConfig;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "bronto-connect")]
#[command(version, about = "Incremental sync connector for the Bronto marketing API")]
struct Cli {
    /// Path to configuration file (JSON or YAML)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Path to the catalog selecting streams and fields
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Path to the state file from a previous run
    #[arg(long)]
    state: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration, catalog and state (default)
    Validate,
    /// Show where each selected stream would start and how many windows it spans
    Plan,
    /// List available streams
    Streams,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(Commands::Streams) = &cli.command {
        return list_streams();
    }

    let config = ConnectConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    let catalog = load_catalog(cli.catalog.as_deref())?;
    let state = load_state(cli.state.as_deref().or(config.state_path.as_deref()))?;

    match cli.command.unwrap_or(Commands::Validate) {
        Commands::Validate => validate(&config, &catalog, &state),
        Commands::Plan => plan(&config, &catalog, &state),
        Commands::Streams => list_streams(),
    }
}

/// Logs go to stderr; stdout is reserved for output messages.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    match path {
        Some(path) => Catalog::from_file(path)
            .with_context(|| format!("Failed to load catalog from {}", path.display())),
        None => Ok(Catalog::new()),
    }
}

fn load_state(path: Option<&Path>) -> Result<State> {
    match path {
        Some(path) if path.exists() => State::from_file(path)
            .with_context(|| format!("Failed to load state from {}", path.display())),
        Some(path) => {
            info!(path = %path.display(), "No state file yet, starting fresh");
            Ok(State::new())
        }
        None => Ok(State::new()),
    }
}

fn resolve_selected(catalog: &Catalog) -> Result<Vec<(Box<dyn StreamStrategy>, String)>> {
    let registry = create_stream_registry();
    let mut resolved = Vec::new();
    for entry in catalog.selected_streams() {
        entry
            .replication_method()
            .with_context(|| format!("Stream '{}'", entry.stream))?;
        let strategy = registry.resolve(entry)?;
        resolved.push((strategy, entry.stream.clone()));
    }
    Ok(resolved)
}

fn validate(config: &ConnectConfig, catalog: &Catalog, state: &State) -> Result<()> {
    let settings = config.engine_settings()?;
    let resolved = resolve_selected(catalog)?;

    println!("✓ Configuration valid!\n");
    println!("Settings:");
    println!("  Start date: {}", format_timestamp(&settings.start_date));
    println!("  Page size: {}", settings.page_size);
    println!("  Timeout retries: {}", settings.retry.max_retries);
    match &config.state_path {
        Some(path) => println!("  State file: {}", path.display()),
        None => println!("  State file: (none)"),
    }
    println!();

    println!("Selected streams ({}):", resolved.len());
    for (strategy, name) in &resolved {
        let bookmark = strategy
            .incremental()
            .and_then(|inc| state.get(name, inc.replication_key));
        println!(
            "  - {} [{}]{}",
            name,
            strategy.operation(),
            bookmark
                .map(|b| format!(" resuming from {}", b))
                .unwrap_or_default()
        );
    }
    Ok(())
}

fn plan(config: &ConnectConfig, catalog: &Catalog, state: &State) -> Result<()> {
    let settings = config.engine_settings()?;
    let registry = create_stream_registry();
    let now = SystemClock.now();

    for entry in catalog.selected_streams() {
        let strategy = registry.resolve(entry)?;
        let Some(incremental) = strategy.incremental() else {
            println!("{}: single pass, no checkpoint", entry.stream);
            continue;
        };

        let mut start = resolve_start(
            strategy.table(),
            entry.replication_method()?,
            state.get(strategy.table(), incremental.replication_key),
            settings.start_date,
        )?;
        if let Some(policy) = strategy.retention() {
            start = policy.apply(start, now);
        }
        let count = windows(start, now, incremental.interval).count();
        println!(
            "{}: from {} in {} windows of {}h ({} = {})",
            entry.stream,
            format_timestamp(&start),
            count,
            incremental.interval.num_hours(),
            incremental.replication_key,
            state
                .get(strategy.table(), incremental.replication_key)
                .unwrap_or("unset"),
        );
    }
    Ok(())
}

fn list_streams() -> Result<()> {
    println!("Available streams:");
    let registry = create_stream_registry();
    for name in registry.list() {
        if let Some(strategy) = registry.create(name) {
            let key = strategy
                .incremental()
                .map(|inc| inc.replication_key)
                .unwrap_or("-");
            println!("  {:<20} {:<32} {}", name, strategy.operation().as_str(), key);
        }
    }
    Ok(())
}
