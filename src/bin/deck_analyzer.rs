//! Deck Analyzer service
//!
//! Serves `POST /analyzeDeck`. All tag sets and the combo index are loaded
//! before the listener is bound, so the first request pays no warm-up cost.

use anyhow::{Context, Result};
use clap::Parser;
use deck_analyzer::engine::{DEFAULT_COMBO_BULK_URL, DEFAULT_SCRYFALL_API};
use deck_analyzer::{server, DeckAnalyzer, EngineConfig};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "deck-analyzer")]
#[command(about = "HTTP service that analyzes Commander deck lists")]
struct Cli {
    /// Address to listen on
    #[arg(short, long, env = "DECK_ANALYZER_BIND", default_value = "127.0.0.1:5000")]
    bind: String,

    /// Concurrent card lookups per request
    #[arg(short, long, env = "DECK_ANALYZER_WORKERS", default_value = "10")]
    workers: usize,

    /// Timeout for each upstream request, in seconds
    #[arg(long, env = "DECK_ANALYZER_TIMEOUT_SECS", default_value = "15")]
    timeout_secs: u64,

    /// Timeout for each page of the bulk combo listing, in seconds
    #[arg(long, env = "DECK_ANALYZER_COMBO_TIMEOUT_SECS", default_value = "120")]
    combo_timeout_secs: u64,

    /// Base URL of the card lookup and search API
    #[arg(long, env = "SCRYFALL_API", default_value = DEFAULT_SCRYFALL_API)]
    scryfall_api: String,

    /// URL of the bulk combo variant listing
    #[arg(long, env = "COMBO_BULK_URL", default_value = DEFAULT_COMBO_BULK_URL)]
    combo_url: String,

    /// Start serving immediately and load tag sets on first use
    #[arg(long)]
    skip_warm_up: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = EngineConfig::default()
        .with_scryfall_api(cli.scryfall_api)
        .with_combo_bulk_url(cli.combo_url)
        .with_workers(cli.workers)
        .with_timeout(Duration::from_secs(cli.timeout_secs))
        .with_combo_timeout(Duration::from_secs(cli.combo_timeout_secs));

    // The blocking HTTP client has to be created (and dropped) outside the
    // async runtime, so the engine lives here rather than inside `serve`.
    let engine = Arc::new(DeckAnalyzer::new(config).context("Failed to start analysis engine")?);

    log::info!(
        "Card lookups: {} workers, {:?} timeout",
        engine.config().workers,
        engine.config().timeout
    );

    if cli.skip_warm_up {
        log::warn!("Skipping warm-up; first requests will fetch tag sets lazily");
    } else {
        engine.warm_up();
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;
    runtime.block_on(serve(&cli.bind, engine.clone()))?;
    drop(runtime);

    Ok(())
}

async fn serve(bind: &str, engine: Arc<DeckAnalyzer>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    log::info!("Listening on {}", bind);

    axum::serve(listener, server::router(engine))
        .await
        .context("Server error")
}
