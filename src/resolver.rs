//! Card-name resolution against the fuzzy card lookup service.

use crate::card::Card;
use crate::upstream::{build_url, HttpFetch};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Resolves card names to card records, memoizing successful lookups.
///
/// The cache is keyed by the trimmed name exactly as requested, so two
/// spellings of the same card occupy two entries. Failed lookups are never
/// cached and will be attempted again on the next request. Entries are never
/// evicted for the life of the process.
pub struct CardResolver {
    fetch: Arc<dyn HttpFetch>,
    api_base: String,
    cache: RwLock<HashMap<String, Card>>,
}

impl CardResolver {
    pub fn new(fetch: Arc<dyn HttpFetch>, api_base: impl Into<String>) -> Self {
        Self {
            fetch,
            api_base: api_base.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Lookup URL for a fuzzy card name
    pub fn named_url(api_base: &str, name: &str) -> anyhow::Result<String> {
        build_url(api_base, "cards/named", &[("fuzzy", name)])
    }

    /// Resolve one name. Never fails: problems come back as an error marker.
    pub fn resolve(&self, name: &str) -> Card {
        if let Some(card) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            log::debug!("Card cache hit: {}", name);
            return card.clone();
        }

        match self.lookup(name) {
            Ok(card) => {
                self.cache
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entry(name.to_string())
                    .or_insert_with(|| card.clone());
                card
            }
            Err(message) => {
                log::warn!("Could not resolve '{}': {}", name, message);
                Card::unresolved(name, message)
            }
        }
    }

    /// Resolve a batch of names on `pool`.
    ///
    /// The output has one card per input name. Callers must not rely on its
    /// order matching the input.
    pub fn resolve_all(&self, pool: &rayon::ThreadPool, names: &[String]) -> Vec<Card> {
        pool.install(|| names.par_iter().map(|name| self.resolve(name)).collect())
    }

    /// Number of names currently cached
    pub fn cached_len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lookup(&self, name: &str) -> Result<Card, String> {
        let url = Self::named_url(&self.api_base, name).map_err(|e| e.to_string())?;
        let reply = self
            .fetch
            .get_json(&url)
            .map_err(|e| format!("Scryfall lookup failed: {:#}", e))?;

        if !reply.is_success() {
            return Err(format!("Scryfall lookup failed ({})", reply.status));
        }

        Card::from_json(&reply.body).map_err(|e| format!("Scryfall returned a malformed card: {}", e))
    }
}
