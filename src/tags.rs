//! Classification sets: which card names carry a given tag.
//!
//! Each set comes from a paginated card search. Sets are fetched at most
//! once per process and never invalidated. A fetch that fails part-way
//! (bad status, transport error, payload without `data`) is stored as an
//! empty set and is not retried.

use crate::upstream::{build_url, HttpFetch};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// How a tag value is turned into a search expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// Curated oracle tag, `oracletag:<value>`
    OracleTag,
    /// Boolean card property, `is:<value>`
    Characteristic,
    /// Literal rules-text phrase, `oracle:"<value>"`
    OraclePhrase,
}

/// Cache key: one classification kind plus one tag value or phrase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagKey {
    pub kind: TagKind,
    pub value: String,
}

impl TagKey {
    pub fn new(kind: TagKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn oracle_tag(value: impl Into<String>) -> Self {
        Self::new(TagKind::OracleTag, value)
    }

    pub fn characteristic(value: impl Into<String>) -> Self {
        Self::new(TagKind::Characteristic, value)
    }

    pub fn phrase(value: impl Into<String>) -> Self {
        Self::new(TagKind::OraclePhrase, value)
    }

    /// Search expression understood by the card search service
    pub fn query(&self) -> String {
        match self.kind {
            TagKind::OracleTag => format!("oracletag:{}", self.value),
            TagKind::Characteristic => format!("is:{}", self.value),
            TagKind::OraclePhrase => format!("oracle:\"{}\"", self.value),
        }
    }

    /// URL of the first search page for this key
    pub fn search_url(&self, api_base: &str) -> anyhow::Result<String> {
        build_url(api_base, "cards/search", &[("q", &self.query())])
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.query())
    }
}

/// Oracle tags warmed at start-up.
pub const ARCHETYPE_TAGS: &[&str] = &[
    "ramp",
    "removal",
    "boardwipe",
    "counterspell",
    "graveyardhate",
    "draw",
    "recursion",
    "tribal",
    "win-condition",
    "land-removal",
    "lockdown-land",
    "extra-turn",
    "tutor",
];

/// Characteristics warmed at start-up.
pub const CHARACTERISTICS: &[&str] = &["gamechanger"];

/// Oracle-text phrases warmed at start-up.
pub const PHRASES: &[&str] = &["destroy all lands"];

/// Every key the analyzers depend on, in warm-up order.
pub fn preload_roster() -> Vec<TagKey> {
    ARCHETYPE_TAGS
        .iter()
        .map(|t| TagKey::oracle_tag(*t))
        .chain(CHARACTERISTICS.iter().map(|t| TagKey::characteristic(*t)))
        .chain(PHRASES.iter().map(|t| TagKey::phrase(*t)))
        .collect()
}

pub type TagSet = Arc<HashSet<String>>;

/// Process-wide cache of classification sets.
///
/// Each key owns a `OnceLock`, so concurrent first lookups of the same key
/// share one upstream fetch: the first caller fetches, the rest block until
/// the set is committed.
pub struct TagSetCache {
    fetch: Arc<dyn HttpFetch>,
    api_base: String,
    sets: RwLock<HashMap<TagKey, Arc<OnceLock<TagSet>>>>,
}

impl TagSetCache {
    pub fn new(fetch: Arc<dyn HttpFetch>, api_base: impl Into<String>) -> Self {
        Self {
            fetch,
            api_base: api_base.into(),
            sets: RwLock::new(HashMap::new()),
        }
    }

    /// Card names classified under `key`, fetching them on first use.
    pub fn get(&self, key: &TagKey) -> TagSet {
        let slot = self.slot(key);
        slot.get_or_init(|| Arc::new(self.fetch_all_pages(key)))
            .clone()
    }

    /// Shorthand for [`TagSetCache::get`] with a freshly built key
    pub fn get_tag_set(&self, kind: TagKind, value: &str) -> TagSet {
        self.get(&TagKey::new(kind, value))
    }

    /// Union of several sets
    pub fn union(&self, keys: &[TagKey]) -> HashSet<String> {
        let mut all = HashSet::new();
        for key in keys {
            all.extend(self.get(key).iter().cloned());
        }
        all
    }

    /// Fetch every key in `keys` sequentially. Already-populated keys are skipped.
    pub fn preload(&self, keys: &[TagKey]) {
        for key in keys {
            let cards = self.get(key);
            log::info!("Tag set {}: {} cards", key, cards.len());
        }
    }

    /// Whether `key` has been populated
    pub fn is_cached(&self, key: &TagKey) -> bool {
        self.sets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .is_some_and(|slot| slot.get().is_some())
    }

    fn slot(&self, key: &TagKey) -> Arc<OnceLock<TagSet>> {
        if let Some(slot) = self
            .sets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return slot.clone();
        }

        self.sets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .clone()
    }

    /// Walk the search pages for `key`. Any failure yields an empty set.
    fn fetch_all_pages(&self, key: &TagKey) -> HashSet<String> {
        let mut url = match key.search_url(&self.api_base) {
            Ok(url) => Some(url),
            Err(e) => {
                log::warn!("Tag set {}: {:#}", key, e);
                return HashSet::new();
            }
        };

        let mut names = HashSet::new();
        let mut pages = 0usize;

        while let Some(page_url) = url.take() {
            let reply = match self.fetch.get_json(&page_url) {
                Ok(reply) => reply,
                Err(e) => {
                    log::warn!("Tag set {}: request failed, caching empty set: {:#}", key, e);
                    return HashSet::new();
                }
            };

            if !reply.is_success() {
                log::warn!(
                    "Tag set {}: upstream returned {}, caching empty set",
                    key,
                    reply.status
                );
                return HashSet::new();
            }

            let Some(data) = reply.body.get("data").and_then(Value::as_array) else {
                log::warn!("Tag set {}: response has no data field, caching empty set", key);
                return HashSet::new();
            };

            names.extend(
                data.iter()
                    .filter_map(|card| card.get("name").and_then(Value::as_str))
                    .map(str::to_string),
            );
            pages += 1;

            url = reply
                .body
                .get("next_page")
                .and_then(Value::as_str)
                .map(str::to_string);
        }

        log::debug!("Tag set {}: {} cards over {} pages", key, names.len(), pages);
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::{CannedFetch, JsonReply};
    use serde_json::json;

    const API: &str = "https://api.scryfall.com";

    fn page(names: &[&str], next: Option<&str>) -> JsonReply {
        let data: Vec<Value> = names.iter().map(|n| json!({"name": n})).collect();
        let mut body = json!({"object": "list", "data": data, "has_more": next.is_some()});
        if let Some(next) = next {
            body["next_page"] = json!(next);
        }
        JsonReply::ok(body)
    }

    #[test]
    fn test_query_expressions() {
        assert_eq!(TagKey::oracle_tag("ramp").query(), "oracletag:ramp");
        assert_eq!(TagKey::characteristic("gamechanger").query(), "is:gamechanger");
        assert_eq!(
            TagKey::phrase("destroy all lands").query(),
            "oracle:\"destroy all lands\""
        );
    }

    #[test]
    fn test_follows_pagination() {
        let key = TagKey::oracle_tag("ramp");
        let first = key.search_url(API).unwrap();
        let second = "https://api.scryfall.com/cards/search?page=2&q=oracletag%3Aramp";
        let fetch = Arc::new(
            CannedFetch::new()
                .route(first.clone(), page(&["Sol Ring", "Cultivate"], Some(second)))
                .route(second, page(&["Rampant Growth"], None)),
        );
        let cache = TagSetCache::new(fetch.clone(), API);

        let set = cache.get(&key);
        assert_eq!(set.len(), 3);
        assert!(set.contains("Rampant Growth"));
        assert_eq!(fetch.total_calls(), 2);
    }

    #[test]
    fn test_repeated_lookup_hits_cache() {
        let key = TagKey::oracle_tag("draw");
        let fetch = Arc::new(
            CannedFetch::new().route(key.search_url(API).unwrap(), page(&["Rhystic Study"], None)),
        );
        let cache = TagSetCache::new(fetch.clone(), API);

        let a = cache.get(&key);
        let b = cache.get_tag_set(TagKind::OracleTag, "draw");
        assert_eq!(a, b);
        assert!(cache.is_cached(&key));
        assert_eq!(fetch.total_calls(), 1);
    }

    #[test]
    fn test_bad_status_caches_empty_set() {
        let key = TagKey::oracle_tag("removal");
        let fetch = Arc::new(
            CannedFetch::new().route(key.search_url(API).unwrap(), JsonReply::status(503)),
        );
        let cache = TagSetCache::new(fetch.clone(), API);

        assert!(cache.get(&key).is_empty());
        assert!(cache.get(&key).is_empty());
        assert_eq!(fetch.total_calls(), 1);
    }

    #[test]
    fn test_failure_midway_discards_earlier_pages() {
        let key = TagKey::oracle_tag("tutor");
        let next = "https://api.scryfall.com/cards/search?page=2&q=oracletag%3Atutor";
        let fetch = Arc::new(
            CannedFetch::new()
                .route(key.search_url(API).unwrap(), page(&["Demonic Tutor"], Some(next)))
                .route(next, JsonReply::ok(json!({"object": "error"}))),
        );
        let cache = TagSetCache::new(fetch, API);

        assert!(cache.get(&key).is_empty());
    }

    #[test]
    fn test_transport_error_caches_empty_set() {
        let key = TagKey::characteristic("gamechanger");
        let fetch = Arc::new(CannedFetch::new().fail(key.search_url(API).unwrap(), "dns failure"));
        let cache = TagSetCache::new(fetch.clone(), API);

        assert!(cache.get(&key).is_empty());
        cache.get(&key);
        assert_eq!(fetch.total_calls(), 1);
    }

    #[test]
    fn test_union_and_preload() {
        let a = TagKey::oracle_tag("land-removal");
        let b = TagKey::phrase("destroy all lands");
        let fetch = Arc::new(
            CannedFetch::new()
                .route(a.search_url(API).unwrap(), page(&["Armageddon", "Strip Mine"], None))
                .route(b.search_url(API).unwrap(), page(&["Armageddon", "Ravages of War"], None)),
        );
        let cache = TagSetCache::new(fetch.clone(), API);

        cache.preload(&[a.clone(), b.clone()]);
        assert_eq!(fetch.total_calls(), 2);

        let all = cache.union(&[a, b]);
        assert_eq!(all.len(), 3);
        assert_eq!(fetch.total_calls(), 2);
    }

    #[test]
    fn test_preload_roster_covers_every_kind() {
        let roster = preload_roster();
        assert_eq!(roster.len(), ARCHETYPE_TAGS.len() + 2);
        assert!(roster.contains(&TagKey::characteristic("gamechanger")));
        assert!(roster.contains(&TagKey::phrase("destroy all lands")));
        assert_eq!(roster[0], TagKey::oracle_tag("ramp"));
    }

    #[test]
    fn test_concurrent_first_lookups_share_one_fetch() {
        let key = TagKey::oracle_tag("counterspell");
        let fetch = Arc::new(
            CannedFetch::new().route(key.search_url(API).unwrap(), page(&["Counterspell"], None)),
        );
        let cache = Arc::new(TagSetCache::new(fetch.clone(), API));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let key = key.clone();
                std::thread::spawn(move || cache.get(&key).len())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }
        assert_eq!(fetch.total_calls(), 1);
    }
}
