//! Deck Report - analyze a deck list file without running the service
//!
//! Reads one card per line (quantities and `#` comments allowed), runs the
//! same analysis as `POST /analyzeDeck` and prints the report as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use deck_analyzer::card::parse_deck_text;
use deck_analyzer::engine::{DEFAULT_COMBO_BULK_URL, DEFAULT_SCRYFALL_API};
use deck_analyzer::{DeckAnalyzer, EngineConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "deck-report")]
#[command(about = "Analyze a Commander deck list file and print the report as JSON")]
struct Cli {
    /// Deck list file; the first card is treated as the commander
    #[arg(short, long)]
    input: PathBuf,

    /// Concurrent card lookups
    #[arg(short, long, default_value = "10")]
    workers: usize,

    /// Timeout for each upstream request, in seconds
    #[arg(long, default_value = "15")]
    timeout_secs: u64,

    /// Timeout for each page of the bulk combo listing, in seconds
    #[arg(long, default_value = "120")]
    combo_timeout_secs: u64,

    /// Base URL of the card lookup and search API
    #[arg(long, env = "SCRYFALL_API", default_value = DEFAULT_SCRYFALL_API)]
    scryfall_api: String,

    /// URL of the bulk combo variant listing
    #[arg(long, env = "COMBO_BULK_URL", default_value = DEFAULT_COMBO_BULK_URL)]
    combo_url: String,

    /// Print compact JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let text = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    let deck = parse_deck_text(&text);
    if deck.is_empty() {
        anyhow::bail!("No card names found in {}", cli.input.display());
    }
    eprintln!("Analyzing {} entries from {}...", deck.len(), cli.input.display());

    let config = EngineConfig::default()
        .with_scryfall_api(cli.scryfall_api)
        .with_combo_bulk_url(cli.combo_url)
        .with_workers(cli.workers)
        .with_timeout(Duration::from_secs(cli.timeout_secs))
        .with_combo_timeout(Duration::from_secs(cli.combo_timeout_secs));
    let engine = DeckAnalyzer::new(config)?;

    let (names, cards) = engine.resolve_deck(&deck);
    for card in cards.iter().filter(|c| !c.is_resolved()) {
        eprintln!(
            "  warning: {}: {}",
            card.name,
            card.error.as_deref().unwrap_or("unresolved")
        );
    }

    let report = engine.analyze_resolved(&cards, &names);
    let json = if cli.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{}", json);

    Ok(())
}
