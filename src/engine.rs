//! Request orchestration: dedupe, resolve, analyze, assemble.

use crate::analyzers::{self, *};
use crate::card::{parse_card_names, Card};
use crate::combos::ComboIndex;
use crate::error::{Error, Result};
use crate::resolver::CardResolver;
use crate::tags::{preload_roster, TagSetCache};
use crate::upstream::{HttpFetch, ReqwestFetch};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

pub const DEFAULT_SCRYFALL_API: &str = "https://api.scryfall.com";
pub const DEFAULT_COMBO_BULK_URL: &str = "https://json.commanderspellbook.com/variants.json";

/// Configuration for the analysis engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the card lookup and search service
    pub scryfall_api: String,
    /// URL of the bulk combo variant listing
    pub combo_bulk_url: String,
    /// Size of the card lookup pool, shared by all in-flight requests
    pub workers: usize,
    /// Upper bound on any single upstream request
    pub timeout: Duration,
    /// Upper bound on each page of the bulk combo listing
    pub combo_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scryfall_api: DEFAULT_SCRYFALL_API.to_string(),
            combo_bulk_url: DEFAULT_COMBO_BULK_URL.to_string(),
            workers: 10,
            timeout: Duration::from_secs(15),
            combo_timeout: Duration::from_secs(120),
        }
    }
}

impl EngineConfig {
    pub fn with_scryfall_api(mut self, url: impl Into<String>) -> Self {
        self.scryfall_api = url.into();
        self
    }

    pub fn with_combo_bulk_url(mut self, url: impl Into<String>) -> Self {
        self.combo_bulk_url = url.into();
        self
    }

    /// Set the lookup pool size (at least one worker)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_combo_timeout(mut self, timeout: Duration) -> Self {
        self.combo_timeout = timeout;
        self
    }
}

/// One report block per analyzer, keyed by the names clients expect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeckAnalysis {
    pub type_counts: BTreeMap<String, usize>,
    pub color_counts: ColorCounts,
    pub avg_converted_mana_cost: f64,
    pub mana_curve_histogram: BTreeMap<String, usize>,
    pub max_converted_mana_cost: f64,
    pub ramp_analysis: RampAnalysis,
    pub interaction_analysis: InteractionAnalysis,
    pub card_draw_analysis: CardDrawAnalysis,
    pub tribal_synergy_analysis: TribalSynergyAnalysis,
    pub recursion_analysis: RecursionAnalysis,
    pub commander_analysis: CommanderAnalysis,
    pub gamechanger_analysis: GamechangerAnalysis,
    pub mass_land_denial_analysis: MassLandDenialAnalysis,
    #[serde(rename = "2_card_combo_analysis")]
    pub two_card_combo_analysis: ComboAnalysis,
    pub extra_turns_analysis: ExtraTurnsAnalysis,
    pub tutor_analysis: TutorAnalysis,
}

/// Pull the deck list out of a request body.
///
/// A missing `deck` field is an empty deck. Anything other than an array of
/// strings is rejected.
pub fn parse_deck_request(body: &Value) -> Result<Vec<String>> {
    let Some(deck) = body.get("deck") else {
        return Ok(Vec::new());
    };
    let entries = deck.as_array().ok_or(Error::InvalidDeck)?;

    entries
        .iter()
        .map(|entry| entry.as_str().map(str::to_string).ok_or(Error::InvalidDeck))
        .collect()
}

/// The deck-analysis engine.
///
/// Holds the process-wide caches (resolved cards, tag sets, combo index) and
/// the lookup pool. Share one instance across requests behind an `Arc`.
///
/// The pool bounds card lookups across all concurrent requests, so the
/// upstream never sees more than `workers` lookups at once.
pub struct DeckAnalyzer {
    config: EngineConfig,
    fetch: Arc<dyn HttpFetch>,
    resolver: CardResolver,
    tags: TagSetCache,
    combos: OnceLock<ComboIndex>,
    pool: rayon::ThreadPool,
}

impl DeckAnalyzer {
    /// Engine talking to the live services.
    ///
    /// Must be called outside of an async runtime context.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let fetch = ReqwestFetch::new(config.timeout).map_err(Error::Client)?;
        Self::with_fetch(config, Arc::new(fetch))
    }

    /// Engine using `fetch` for every upstream call
    pub fn with_fetch(config: EngineConfig, fetch: Arc<dyn HttpFetch>) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .thread_name(|i| format!("card-lookup-{}", i))
            .build()?;

        Ok(Self {
            resolver: CardResolver::new(fetch.clone(), config.scryfall_api.clone()),
            tags: TagSetCache::new(fetch.clone(), config.scryfall_api.clone()),
            combos: OnceLock::new(),
            pool,
            fetch,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tags(&self) -> &TagSetCache {
        &self.tags
    }

    pub fn resolver(&self) -> &CardResolver {
        &self.resolver
    }

    /// Populate every tag set the analyzers use and build the combo index.
    ///
    /// Runs sequentially and blocks until done. Meant to finish before the
    /// first request is served.
    pub fn warm_up(&self) {
        let roster = preload_roster();
        log::info!("Warming {} tag sets...", roster.len());
        self.tags.preload(&roster);

        log::info!("Building combo index...");
        let combos = self.combo_index();
        log::info!("Warm-up complete ({} combos indexed)", combos.len());
    }

    /// The combo index, downloaded on first use
    pub fn combo_index(&self) -> &ComboIndex {
        self.combos
            .get_or_init(|| {
                ComboIndex::build(
                    self.fetch.as_ref(),
                    &self.config.combo_bulk_url,
                    self.config.combo_timeout,
                )
            })
    }

    /// Resolve every distinct name in `deck` on the lookup pool.
    pub fn resolve_deck(&self, deck: &[String]) -> (Vec<String>, Vec<Card>) {
        let names = parse_card_names(deck);
        let cards = self.resolver.resolve_all(&self.pool, &names);
        (names, cards)
    }

    /// Run the full analysis for one deck list.
    pub fn analyze(&self, deck: &[String]) -> DeckAnalysis {
        let (names, cards) = self.resolve_deck(deck);
        let unresolved = cards.iter().filter(|c| !c.is_resolved()).count();
        log::info!(
            "Analyzing deck: {} distinct names, {} unresolved",
            names.len(),
            unresolved
        );
        self.analyze_resolved(&cards, &names)
    }

    /// Parse a raw request body and analyze the deck it carries.
    ///
    /// The body must be a JSON object; anything else is malformed.
    pub fn analyze_request(&self, body: &[u8]) -> Result<DeckAnalysis> {
        let body: serde_json::Map<String, Value> = serde_json::from_slice(body)?;
        let deck = parse_deck_request(&Value::Object(body))?;
        Ok(self.analyze(&deck))
    }

    /// Run every analyzer over already-resolved cards.
    ///
    /// `names` is the deduplicated deck list; its first entry is the commander.
    pub fn analyze_resolved(&self, cards: &[Card], names: &[String]) -> DeckAnalysis {
        let tags = &self.tags;

        DeckAnalysis {
            type_counts: analyzers::count_card_types(cards),
            color_counts: analyzers::count_colors(cards),
            avg_converted_mana_cost: analyzers::average_mana_value(cards),
            mana_curve_histogram: analyzers::mana_curve_histogram(cards),
            max_converted_mana_cost: analyzers::max_mana_value(cards),
            ramp_analysis: analyzers::analyze_ramp(cards, tags),
            interaction_analysis: analyzers::analyze_interaction(cards, tags),
            card_draw_analysis: analyzers::analyze_card_draw(cards, tags),
            tribal_synergy_analysis: analyzers::analyze_tribal_synergy(cards, tags),
            recursion_analysis: analyzers::analyze_recursion(cards, tags),
            commander_analysis: analyzers::analyze_commander(cards, names),
            gamechanger_analysis: analyzers::analyze_gamechangers(cards, tags),
            mass_land_denial_analysis: analyzers::analyze_mass_land_denial(cards, tags),
            two_card_combo_analysis: analyzers::analyze_two_card_combos(
                cards,
                names,
                self.combo_index(),
            ),
            extra_turns_analysis: analyzers::analyze_extra_turns(cards, tags),
            tutor_analysis: analyzers::analyze_non_land_tutors(cards, tags),
        }
    }
}
