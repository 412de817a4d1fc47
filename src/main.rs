//! Lumen main entry point
//!
//! Command-line interface for the Lumen site search engine: loads the
//! configuration, opens the index database, and serves the HTTP API.

use clap::Parser;
use lumen::api::{build_router, AppState};
use lumen::config::load_config;
use lumen::indexer::IndexingController;
use lumen::lemma::LemmaExtractor;
use lumen::search::SearchEngine;
use lumen::storage::SqliteStorage;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Lumen: a self-hosted site search engine
///
/// Lumen crawls the configured websites, builds a per-site lemma index,
/// and answers ranked keyword queries over an HTTP API.
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(version)]
#[command(about = "A self-hosted site search engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = Arc::new(load_config(&cli.config)?);
    tracing::info!(
        "Configured sites: {}, bind address: {}",
        config.sites.len(),
        config.server.bind_addr
    );

    let storage = Arc::new(Mutex::new(SqliteStorage::new(Path::new(
        &config.storage.database_path,
    ))?));
    let extractor = Arc::new(LemmaExtractor::new());

    let controller = Arc::new(IndexingController::new(
        config.clone(),
        storage.clone(),
        extractor.clone(),
    )?);
    let search = SearchEngine::new(storage.clone(), extractor);

    let router = build_router(AppState {
        controller,
        search,
        storage,
    });

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    tracing::info!("API listening on {}", config.server.bind_addr);
    axum::serve(listener, router).await?;

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lumen=info,warn"),
            1 => EnvFilter::new("lumen=debug,info"),
            2 => EnvFilter::new("lumen=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
