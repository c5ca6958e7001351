//! Two-card combo index built from the bulk combo-variant listing.

use crate::card::Card;
use crate::upstream::HttpFetch;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Metadata for one two-card combo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComboEntry {
    /// Canonical names of both pieces, in listing order
    pub cards: [String; 2],
    /// Effects the combo produces (e.g. "Infinite colorless mana")
    pub produces: Vec<String>,
    pub description: String,
    pub prerequisites: String,
}

// ─── Listing payload ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct NamedCard {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariantUse {
    card: NamedCard,
    #[serde(default)]
    must_be_commander: bool,
}

#[derive(Deserialize)]
struct Feature {
    name: String,
}

#[derive(Deserialize)]
struct Produced {
    feature: Feature,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Variant {
    #[serde(default)]
    uses: Vec<VariantUse>,
    #[serde(default)]
    produces: Vec<Produced>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    easy_prerequisites: String,
    #[serde(default)]
    notable_prerequisites: String,
    #[serde(default)]
    other_prerequisites: String,
}

/// Either the bulk file (`variants`) or one page of the paginated API
/// (`results` + `next`).
#[derive(Deserialize)]
struct VariantPage {
    #[serde(default, alias = "results")]
    variants: Vec<serde_json::Value>,
    #[serde(default)]
    next: Option<String>,
}

impl Variant {
    /// Keep only plain two-card combos with no piece locked to the command zone.
    fn into_entry(self) -> Option<ComboEntry> {
        if self.uses.len() != 2 || self.uses.iter().any(|u| u.must_be_commander) {
            return None;
        }

        let prerequisites = [
            self.easy_prerequisites,
            self.notable_prerequisites,
            self.other_prerequisites,
        ]
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

        let mut uses = self.uses.into_iter();
        let first = uses.next()?.card.name;
        let second = uses.next()?.card.name;

        Some(ComboEntry {
            cards: [first, second],
            produces: self.produces.into_iter().map(|p| p.feature.name).collect(),
            description: self.description,
            prerequisites,
        })
    }
}

/// Order-independent lookup key for a pair of card names.
pub fn pair_key(a: &str, b: &str) -> (String, String) {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Read-only map from unordered card-name pairs to combo metadata.
#[derive(Debug, Default)]
pub struct ComboIndex {
    combos: HashMap<(String, String), ComboEntry>,
}

impl ComboIndex {
    /// Download the full variant listing from `url` and index it.
    ///
    /// Each page request is bounded by `timeout`. Follows `next` links when the listing is paginated. A failed or
    /// malformed page is logged and ends the walk; whatever was indexed up to
    /// that point is kept, so an outage on the first page yields an empty
    /// index.
    pub fn build(fetch: &dyn HttpFetch, url: &str, timeout: Duration) -> Self {
        let mut index = Self::default();
        let mut next = Some(url.to_string());
        let mut seen = 0usize;

        while let Some(page_url) = next.take() {
            let reply = match fetch.get_json_within(&page_url, timeout) {
                Ok(reply) if reply.is_success() => reply,
                Ok(reply) => {
                    log::warn!("Combo listing {} returned {}", page_url, reply.status);
                    break;
                }
                Err(e) => {
                    log::warn!("Combo listing {} failed: {:#}", page_url, e);
                    break;
                }
            };

            let page = match VariantPage::deserialize(&reply.body) {
                Ok(page) => page,
                Err(e) => {
                    log::warn!("Combo listing {} is malformed: {}", page_url, e);
                    break;
                }
            };

            seen += page.variants.len();
            for raw in &page.variants {
                match Variant::deserialize(raw) {
                    Ok(variant) => {
                        if let Some(entry) = variant.into_entry() {
                            index.insert(entry);
                        }
                    }
                    Err(e) => log::debug!("Skipping unreadable combo variant: {}", e),
                }
            }
            next = page.next;
        }

        log::info!(
            "Combo index: {} two-card combos from {} variants",
            index.len(),
            seen
        );
        index
    }

    /// Index a batch of entries directly
    pub fn from_entries(entries: impl IntoIterator<Item = ComboEntry>) -> Self {
        let mut index = Self::default();
        for entry in entries {
            index.insert(entry);
        }
        index
    }

    /// The first variant listed for a pair wins.
    fn insert(&mut self, entry: ComboEntry) {
        let key = pair_key(&entry.cards[0], &entry.cards[1]);
        self.combos.entry(key).or_insert(entry);
    }

    /// Combo formed by `a` and `b`, in either order, ignoring case
    pub fn lookup_pair(&self, a: &str, b: &str) -> Option<&ComboEntry> {
        self.combos.get(&pair_key(a, b))
    }

    pub fn len(&self) -> usize {
        self.combos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combos.is_empty()
    }
}

/// Every indexed combo among `cards`, minus those locked to another commander.
///
/// A combo whose prerequisites mention "commander" but not `commander` (the
/// deck's designated commander, any case) is assumed to need a different
/// commander and is dropped.
pub fn find_deck_combos(index: &ComboIndex, cards: &[Card], commander: &str) -> Vec<ComboEntry> {
    let commander = commander.trim().to_lowercase();
    let mut found = Vec::new();

    for (i, a) in cards.iter().enumerate() {
        for b in &cards[i + 1..] {
            let Some(combo) = index.lookup_pair(&a.name, &b.name) else {
                continue;
            };

            let prerequisites = combo.prerequisites.to_lowercase();
            if prerequisites.contains("commander") && !prerequisites.contains(&commander) {
                log::debug!(
                    "Skipping {} + {}: locked to another commander",
                    combo.cards[0],
                    combo.cards[1]
                );
                continue;
            }
            found.push(combo.clone());
        }
    }

    found
}
