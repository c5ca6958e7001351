//! Deck-composition metrics.
//!
//! Each analyzer looks at the resolved card list (two also need the deck's
//! name list) and produces one block of the aggregate report. Whether land
//! cards are excluded differs per analyzer and is noted on each function.

use crate::card::Card;
use crate::combos::{find_deck_combos, ComboEntry, ComboIndex};
use crate::tags::{TagKey, TagSetCache};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Card types counted by [`count_card_types`].
pub const CARD_TYPES: [&str; 7] = [
    "Creature",
    "Instant",
    "Sorcery",
    "Artifact",
    "Enchantment",
    "Land",
    "Planeswalker",
];

/// Mana curve buckets, in display order.
pub const CURVE_BUCKETS: [&str; 8] = ["0", "1", "2", "3", "4", "5", "6", "7+"];

fn non_lands(cards: &[Card]) -> impl Iterator<Item = &Card> {
    cards.iter().filter(|c| !c.is_land())
}

/// Names of cards (optionally skipping lands) that appear in `set`.
fn names_in<'a>(
    cards: impl IntoIterator<Item = &'a Card>,
    set: &HashSet<String>,
) -> Vec<String> {
    cards
        .into_iter()
        .filter(|c| set.contains(&c.name))
        .map(|c| c.name.clone())
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// Type, color and curve
// ============================================================================

/// How many cards mention each of [`CARD_TYPES`] in their type line.
/// Lands included. Types with no cards are omitted.
pub fn count_card_types(cards: &[Card]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for card in cards {
        for card_type in CARD_TYPES {
            if card.type_line.contains(card_type) {
                *counts.entry(card_type.to_string()).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// Per-color card counts; colorless cards go under `C`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColorCount {
    #[serde(rename = "W")]
    pub white: usize,
    #[serde(rename = "U")]
    pub blue: usize,
    #[serde(rename = "B")]
    pub black: usize,
    #[serde(rename = "R")]
    pub red: usize,
    #[serde(rename = "G")]
    pub green: usize,
    #[serde(rename = "C")]
    pub colorless: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorCounts {
    pub color_count: ColorCount,
}

/// Color identity tally. Lands included.
pub fn count_colors(cards: &[Card]) -> ColorCounts {
    let mut count = ColorCount::default();

    for card in cards {
        if card.color_identity.is_empty() {
            count.colorless += 1;
            continue;
        }
        for color in &card.color_identity {
            match color.as_str() {
                "W" => count.white += 1,
                "U" => count.blue += 1,
                "B" => count.black += 1,
                "R" => count.red += 1,
                "G" => count.green += 1,
                other => log::debug!("{}: ignoring unknown color '{}'", card.name, other),
            }
        }
    }

    ColorCounts { color_count: count }
}

/// Mean mana value of non-land cards, rounded to 2 decimals; 0 with none.
pub fn average_mana_value(cards: &[Card]) -> f64 {
    let (total, count) = non_lands(cards).fold((0.0, 0usize), |(t, n), c| (t + c.cmc, n + 1));
    if count == 0 {
        0.0
    } else {
        round2(total / count as f64)
    }
}

fn curve_bucket(cmc: f64) -> &'static str {
    let value = cmc.max(0.0) as usize;
    CURVE_BUCKETS[value.min(7)]
}

/// Sort position of a bucket label, with "7+" after "6".
fn bucket_order(label: &str) -> u32 {
    label.replace('+', "9").parse().unwrap_or(u32::MAX)
}

/// Non-land cards per mana value. All eight buckets are always present.
pub fn mana_curve_histogram(cards: &[Card]) -> BTreeMap<String, usize> {
    let mut histogram: BTreeMap<String, usize> = CURVE_BUCKETS
        .iter()
        .map(|b| (b.to_string(), 0))
        .collect();

    for card in non_lands(cards) {
        *histogram.entry(curve_bucket(card.cmc).to_string()).or_insert(0) += 1;
    }

    debug_assert!(histogram
        .keys()
        .zip(histogram.keys().skip(1))
        .all(|(a, b)| bucket_order(a) < bucket_order(b)));
    histogram
}

/// Highest mana value among non-land cards; 0 with none.
pub fn max_mana_value(cards: &[Card]) -> f64 {
    non_lands(cards).map(|c| c.cmc).fold(0.0, f64::max)
}

// ============================================================================
// Tag-driven analyzers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RampAnalysis {
    pub ramp_count: usize,
    pub ramp_cards: Vec<String>,
}

/// Non-land cards tagged `ramp`.
pub fn analyze_ramp(cards: &[Card], tags: &TagSetCache) -> RampAnalysis {
    let ramp_cards = names_in(non_lands(cards), &tags.get(&TagKey::oracle_tag("ramp")));
    RampAnalysis {
        ramp_count: ramp_cards.len(),
        ramp_cards,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InteractionAnalysis {
    pub removal: usize,
    pub board_wipes: usize,
    pub counterspells: usize,
    pub graveyard_hate: usize,
    pub removal_cards: Vec<String>,
    pub board_wipe_cards: Vec<String>,
    pub counterspell_cards: Vec<String>,
    pub graveyard_hate_cards: Vec<String>,
    pub interaction_count: usize,
    /// Every card that matched at least one interaction tag, once
    pub interaction_cards: Vec<String>,
}

/// Removal, board wipes, counterspells and graveyard hate. Lands included.
///
/// A card can count toward several categories at once.
pub fn analyze_interaction(cards: &[Card], tags: &TagSetCache) -> InteractionAnalysis {
    let removal = tags.get(&TagKey::oracle_tag("removal"));
    let boardwipe = tags.get(&TagKey::oracle_tag("boardwipe"));
    let counterspell = tags.get(&TagKey::oracle_tag("counterspell"));
    let graveyard_hate = tags.get(&TagKey::oracle_tag("graveyardhate"));

    let mut summary = InteractionAnalysis::default();

    for card in cards {
        let name = &card.name;
        let mut matched = false;

        if removal.contains(name) {
            summary.removal += 1;
            summary.removal_cards.push(name.clone());
            matched = true;
        }
        if boardwipe.contains(name) {
            summary.board_wipes += 1;
            summary.board_wipe_cards.push(name.clone());
            matched = true;
        }
        if counterspell.contains(name) {
            summary.counterspells += 1;
            summary.counterspell_cards.push(name.clone());
            matched = true;
        }
        if graveyard_hate.contains(name) {
            summary.graveyard_hate += 1;
            summary.graveyard_hate_cards.push(name.clone());
            matched = true;
        }

        if matched {
            summary.interaction_cards.push(name.clone());
        }
    }

    summary.interaction_count = summary.interaction_cards.len();
    summary
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardDrawAnalysis {
    pub card_draw_count: usize,
    pub card_draw_cards: Vec<String>,
}

/// Cards tagged `draw`. Lands included.
pub fn analyze_card_draw(cards: &[Card], tags: &TagSetCache) -> CardDrawAnalysis {
    let card_draw_cards = names_in(cards, &tags.get(&TagKey::oracle_tag("draw")));
    CardDrawAnalysis {
        card_draw_count: card_draw_cards.len(),
        card_draw_cards,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TribalSynergyAnalysis {
    pub most_common_tribe: Option<String>,
    pub tribe_creature_count: usize,
    pub tribal_synergy_card_count: usize,
    pub tribal_synergy_cards: Vec<String>,
    pub matching_synergy_cards_for_tribe: Vec<String>,
    pub matching_synergy_card_count: usize,
}

/// Most frequent creature subtype, with its count.
///
/// Ties go to the subtype seen first while walking `cards`.
fn most_common_subtype(cards: &[Card]) -> Option<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();

    for card in cards {
        for subtype in card.creature_subtypes() {
            let count = counts.entry(subtype).or_insert(0);
            if *count == 0 {
                first_seen.push(subtype);
            }
            *count += 1;
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for subtype in first_seen {
        let count = counts[subtype];
        if best.map_or(true, |(_, n)| count > n) {
            best = Some((subtype, count));
        }
    }
    best.map(|(s, n)| (s.to_string(), n))
}

/// "elf" -> "Elf"
fn capitalize(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Tribal payoffs, and which of them care about the deck's main creature type.
/// Lands included.
pub fn analyze_tribal_synergy(cards: &[Card], tags: &TagSetCache) -> TribalSynergyAnalysis {
    let tribal = tags.get(&TagKey::oracle_tag("tribal"));
    let synergy: Vec<&Card> = cards.iter().filter(|c| tribal.contains(&c.name)).collect();

    let (tribe, tribe_creature_count, matching) = match most_common_subtype(cards) {
        Some((subtype, count)) => {
            let needle = subtype.to_lowercase();
            let matching: Vec<String> = synergy
                .iter()
                .filter(|c| c.oracle_text.to_lowercase().contains(&needle))
                .map(|c| c.name.clone())
                .collect();
            (Some(capitalize(&subtype)), count, matching)
        }
        None => (None, 0, Vec::new()),
    };

    TribalSynergyAnalysis {
        most_common_tribe: tribe,
        tribe_creature_count,
        tribal_synergy_card_count: synergy.len(),
        tribal_synergy_cards: synergy.iter().map(|c| c.name.clone()).collect(),
        matching_synergy_card_count: matching.len(),
        matching_synergy_cards_for_tribe: matching,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecursionAnalysis {
    pub recursion_count: usize,
    pub recursion_cards: Vec<String>,
}

/// Cards tagged `recursion`. Lands included.
pub fn analyze_recursion(cards: &[Card], tags: &TagSetCache) -> RecursionAnalysis {
    let recursion_cards = names_in(cards, &tags.get(&TagKey::oracle_tag("recursion")));
    RecursionAnalysis {
        recursion_count: recursion_cards.len(),
        recursion_cards,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GamechangerAnalysis {
    pub gamechanger_count: usize,
    pub gamechanger_cards: Vec<String>,
}

/// Non-land win conditions and official game changers.
pub fn analyze_gamechangers(cards: &[Card], tags: &TagSetCache) -> GamechangerAnalysis {
    let set = tags.union(&[
        TagKey::oracle_tag("win-condition"),
        TagKey::characteristic("gamechanger"),
    ]);
    let gamechanger_cards = names_in(non_lands(cards), &set);
    GamechangerAnalysis {
        gamechanger_count: gamechanger_cards.len(),
        gamechanger_cards,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MassLandDenialAnalysis {
    pub mass_land_denial_count: usize,
    pub mass_land_denial_cards: Vec<String>,
}

/// Non-land cards that destroy or lock down lands en masse.
pub fn analyze_mass_land_denial(cards: &[Card], tags: &TagSetCache) -> MassLandDenialAnalysis {
    let set = tags.union(&[
        TagKey::oracle_tag("land-removal"),
        TagKey::oracle_tag("lockdown-land"),
        TagKey::phrase("destroy all lands"),
    ]);
    let mass_land_denial_cards = names_in(non_lands(cards), &set);
    MassLandDenialAnalysis {
        mass_land_denial_count: mass_land_denial_cards.len(),
        mass_land_denial_cards,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtraTurnsAnalysis {
    pub extra_turn_count: usize,
    pub extra_turn_cards: Vec<String>,
}

/// Cards tagged `extra-turn`. Lands included.
pub fn analyze_extra_turns(cards: &[Card], tags: &TagSetCache) -> ExtraTurnsAnalysis {
    let extra_turn_cards = names_in(cards, &tags.get(&TagKey::oracle_tag("extra-turn")));
    ExtraTurnsAnalysis {
        extra_turn_count: extra_turn_cards.len(),
        extra_turn_cards,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TutorAnalysis {
    pub tutor_count: usize,
    pub tutor_cards: Vec<String>,
}

/// Non-land cards tagged `tutor`; fetch lands are not counted.
pub fn analyze_non_land_tutors(cards: &[Card], tags: &TagSetCache) -> TutorAnalysis {
    let tutor_cards = names_in(non_lands(cards), &tags.get(&TagKey::oracle_tag("tutor")));
    TutorAnalysis {
        tutor_count: tutor_cards.len(),
        tutor_cards,
    }
}

// ============================================================================
// Commander and combos
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommanderInfo {
    pub commander_name: String,
    pub commander_type_line: String,
    pub commander_colors: Vec<String>,
    pub commander_oracle_text: String,
    pub is_legendary: bool,
}

/// Commander lookup result. A miss is reported in-band as `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommanderAnalysis {
    Found(CommanderInfo),
    Missing { error: String },
}

/// Find the card named by the first deck entry, ignoring case.
///
/// An unresolved commander still carries the requested name, so it is
/// reported as found with an empty type line and `is_legendary: false`.
pub fn analyze_commander(cards: &[Card], deck_names: &[String]) -> CommanderAnalysis {
    let Some(requested) = deck_names.first().filter(|_| !cards.is_empty()) else {
        return CommanderAnalysis::Missing {
            error: "Deck list or card data missing".to_string(),
        };
    };

    let wanted = requested.trim().to_lowercase();
    match cards.iter().find(|c| c.name.to_lowercase() == wanted) {
        Some(card) => CommanderAnalysis::Found(CommanderInfo {
            commander_name: card.name.clone(),
            commander_type_line: card.type_line.clone(),
            commander_colors: card.color_identity.clone(),
            commander_oracle_text: card.oracle_text.clone(),
            is_legendary: card.is_legendary(),
        }),
        None => CommanderAnalysis::Missing {
            error: format!(
                "Commander '{}' not found or invalid (may be a typo)",
                requested
            ),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComboAnalysis {
    pub combo_count: usize,
    pub combos: Vec<ComboEntry>,
}

/// Two-card combos present in the deck, honouring commander locks.
pub fn analyze_two_card_combos(
    cards: &[Card],
    deck_names: &[String],
    index: &ComboIndex,
) -> ComboAnalysis {
    let commander = deck_names.first().map(String::as_str).unwrap_or("");
    let combos = find_deck_combos(index, cards, commander);
    ComboAnalysis {
        combo_count: combos.len(),
        combos,
    }
}
