//! Card records and deck-list normalization.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;

/// A resolved card, or an error marker for a name that could not be resolved.
///
/// Error markers carry the requested name and empty gameplay fields, so they
/// flow through the analyzers like a colorless, typeless zero-cost card.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub name: String,
    pub type_line: String,
    pub cmc: f64,
    pub color_identity: Vec<String>,
    pub oracle_text: String,
    /// Why resolution failed, when it did
    pub error: Option<String>,
}

impl Card {
    /// Error marker for a name the lookup service could not resolve
    pub fn unresolved(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_line: String::new(),
            cmc: 0.0,
            color_identity: Vec::new(),
            oracle_text: String::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.error.is_none()
    }

    /// "Land" appears as a whole word in the type line.
    pub fn is_land(&self) -> bool {
        self.type_line.split_whitespace().any(|t| t == "Land")
    }

    pub fn is_legendary(&self) -> bool {
        self.type_line.contains("Legendary")
    }

    /// Creature subtypes from the type line, in order of appearance.
    ///
    /// Takes everything after the first em-dash, splits on whitespace and
    /// `/`, and keeps purely alphabetic tokens. Non-creatures have none.
    pub fn creature_subtypes(&self) -> Vec<&str> {
        lazy_static! {
            static ref SUBTYPE_SPLIT: Regex = Regex::new(r"\s+|/").unwrap();
        }

        if !self.type_line.contains("Creature") {
            return Vec::new();
        }
        let Some((_, subtypes)) = self.type_line.split_once('—') else {
            return Vec::new();
        };
        let subtypes = subtypes.split('—').next().unwrap_or("").trim();

        SUBTYPE_SPLIT
            .split(subtypes)
            .filter(|t| !t.is_empty() && t.chars().all(char::is_alphabetic))
            .collect()
    }
}

#[derive(Deserialize)]
struct CardFace {
    #[serde(default)]
    oracle_text: String,
}

/// Card object as returned by the lookup service.
#[derive(Deserialize)]
struct RawCard {
    name: String,
    #[serde(default)]
    type_line: String,
    #[serde(default)]
    cmc: f64,
    #[serde(default)]
    color_identity: Vec<String>,
    #[serde(default)]
    oracle_text: Option<String>,
    #[serde(default)]
    card_faces: Vec<CardFace>,
}

impl From<RawCard> for Card {
    fn from(raw: RawCard) -> Self {
        // Multi-faced cards keep their rules text on the faces
        let oracle_text = match raw.oracle_text {
            Some(text) => text,
            None => raw
                .card_faces
                .iter()
                .map(|f| f.oracle_text.as_str())
                .collect::<Vec<_>>()
                .join("\n//\n"),
        };

        Self {
            name: raw.name,
            type_line: raw.type_line,
            cmc: raw.cmc,
            color_identity: raw.color_identity,
            oracle_text,
            error: None,
        }
    }
}

impl Card {
    /// Decode a card from the lookup service's JSON representation.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        RawCard::deserialize(value).map(Card::from)
    }
}

/// Trim names, drop empty entries and duplicates, keep first-seen order.
pub fn parse_card_names<S: AsRef<str>>(deck_list: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();

    for name in deck_list {
        let cleaned = name.as_ref().trim();
        if !cleaned.is_empty() && seen.insert(cleaned.to_string()) {
            result.push(cleaned.to_string());
        }
    }

    result
}

/// Parse a plain-text deck list: one card per line, `#` comments and blank
/// lines ignored, leading quantities such as `1 ` or `4x ` stripped.
///
/// The result is not deduplicated; feed it to [`parse_card_names`].
pub fn parse_deck_text(text: &str) -> Vec<String> {
    lazy_static! {
        static ref QUANTITY: Regex = Regex::new(r"^\d+x?\s+").unwrap();
    }

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| QUANTITY.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}
