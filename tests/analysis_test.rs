//! End-to-end analysis against canned upstream responses
//!
//! These tests drive the public engine API the same way the HTTP service
//! does, with every card lookup, tag search and combo listing served from
//! memory.

use deck_analyzer::card::parse_deck_text;
use deck_analyzer::engine::DEFAULT_COMBO_BULK_URL;
use deck_analyzer::resolver::CardResolver;
use deck_analyzer::server::respond;
use deck_analyzer::tags::{preload_roster, TagKey};
use deck_analyzer::upstream::{CannedFetch, JsonReply};
use deck_analyzer::{DeckAnalyzer, EngineConfig};
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;

const API: &str = "https://api.scryfall.com";

fn card_json(name: &str, type_line: &str, cmc: f64, colors: &[&str], text: &str) -> JsonReply {
    JsonReply::ok(json!({
        "object": "card",
        "name": name,
        "type_line": type_line,
        "cmc": cmc,
        "color_identity": colors,
        "oracle_text": text
    }))
}

fn named(name: &str) -> String {
    CardResolver::named_url(API, name).unwrap()
}

fn search(key: &TagKey) -> String {
    key.search_url(API).unwrap()
}

fn tag_page(names: &[&str]) -> JsonReply {
    let data: Vec<Value> = names.iter().map(|n| json!({"object": "card", "name": n})).collect();
    JsonReply::ok(json!({"object": "list", "has_more": false, "data": data}))
}

fn combo_listing(variants: Value) -> JsonReply {
    JsonReply::ok(json!({"timestamp": "2026-10-01T00:00:00Z", "variants": variants}))
}

fn engine(fetch: Arc<CannedFetch>) -> DeckAnalyzer {
    DeckAnalyzer::with_fetch(EngineConfig::default().with_workers(4), fetch).unwrap()
}

fn deck(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[test]
fn test_sol_ring_and_forest() {
    let fetch = Arc::new(
        CannedFetch::new()
            .route(named("Sol Ring"), card_json("Sol Ring", "Artifact", 1.0, &[], "{T}: Add {C}{C}."))
            .route(named("Forest"), card_json("Forest", "Basic Land — Forest", 0.0, &[], "({T}: Add {G}.)")),
    );
    let engine = engine(fetch);

    let report = serde_json::to_value(engine.analyze(&deck(&["Sol Ring", "Forest"]))).unwrap();

    assert_eq!(
        report["mana_curve_histogram"],
        json!({"0": 0, "1": 1, "2": 0, "3": 0, "4": 0, "5": 0, "6": 0, "7+": 0})
    );
    assert_eq!(report["avg_converted_mana_cost"], json!(1.0));
    assert_eq!(report["max_converted_mana_cost"], json!(1.0));
    assert_eq!(report["type_counts"], json!({"Artifact": 1, "Land": 1}));
    assert_eq!(report["color_counts"]["color_count"]["C"], 2);

    // Sol Ring is at position 0 but is not legendary
    assert_eq!(report["commander_analysis"]["commander_name"], "Sol Ring");
    assert_eq!(report["commander_analysis"]["is_legendary"], false);
}

#[test]
fn test_two_card_combo_detected() {
    let combo = json!([{
        "uses": [
            {"card": {"name": "Exquisite Blood"}, "mustBeCommander": false},
            {"card": {"name": "Sanguine Bond"}, "mustBeCommander": false}
        ],
        "produces": [{"feature": {"name": "Infinite lifeloss"}}],
        "description": "Gain 1 life to start the loop.",
        "easyPrerequisites": "Both permanents on the battlefield.",
        "notablePrerequisites": ""
    }]);
    let fetch = Arc::new(
        CannedFetch::new()
            .route(named("Vito, Thorn of the Dusk Rose"), card_json("Vito, Thorn of the Dusk Rose", "Legendary Creature — Vampire Cleric", 3.0, &["B"], ""))
            .route(named("Sanguine Bond"), card_json("Sanguine Bond", "Enchantment", 5.0, &["B"], ""))
            .route(named("exquisite blood"), card_json("Exquisite Blood", "Enchantment", 5.0, &["B"], ""))
            .route(DEFAULT_COMBO_BULK_URL, combo_listing(combo)),
    );
    let engine = engine(fetch);

    let report = engine.analyze(&deck(&[
        "Vito, Thorn of the Dusk Rose",
        "Sanguine Bond",
        "exquisite blood",
    ]));

    let combos = &report.two_card_combo_analysis;
    assert_eq!(combos.combo_count, 1);
    assert!(combos.combos[0].cards.contains(&"Sanguine Bond".to_string()));
    assert!(combos.combos[0].cards.contains(&"Exquisite Blood".to_string()));
    assert_eq!(combos.combos[0].produces, vec!["Infinite lifeloss"]);
}

#[test]
fn test_tag_outage_reports_zero_and_is_not_retried() {
    let ramp = TagKey::oracle_tag("ramp");
    let fetch = Arc::new(
        CannedFetch::new()
            .route(named("Cultivate"), card_json("Cultivate", "Sorcery", 3.0, &["G"], "Search your library for up to two basic land cards."))
            .route(search(&ramp), JsonReply::status(503)),
    );
    let engine = engine(fetch.clone());

    let first = engine.analyze(&deck(&["Cultivate"]));
    assert_eq!(first.ramp_analysis.ramp_count, 0);
    assert!(engine.tags().is_cached(&ramp));

    let second = engine.analyze(&deck(&["Cultivate"]));
    assert_eq!(second.ramp_analysis.ramp_count, 0);
    assert_eq!(fetch.calls_to(&search(&ramp)), 1);
    // Card lookups are cached too
    assert_eq!(fetch.calls_to(&named("Cultivate")), 1);
}

#[test]
fn test_warm_up_prefetches_every_tag_once() {
    let fetch = Arc::new(CannedFetch::new().route(
        search(&TagKey::oracle_tag("draw")),
        tag_page(&["Rhystic Study"]),
    ));
    let engine = engine(fetch.clone());

    engine.warm_up();
    let roster = preload_roster();
    for key in &roster {
        assert!(engine.tags().is_cached(key), "{} not warmed", key);
        assert_eq!(fetch.calls_to(&search(key)), 1);
    }
    assert_eq!(fetch.calls_to(DEFAULT_COMBO_BULK_URL), 1);

    let calls_after_warm_up = fetch.total_calls();
    engine.analyze(&[]);
    assert_eq!(fetch.total_calls(), calls_after_warm_up);
}

#[test]
fn test_unresolved_names_are_retried() {
    let fetch = Arc::new(CannedFetch::new().route(named("Sol Rnig"), JsonReply::status(404)));
    let engine = engine(fetch.clone());

    let report = engine.analyze(&deck(&["Sol Rnig"]));
    // The error marker flows through as a colorless zero-cost card
    assert_eq!(report.mana_curve_histogram["0"], 1);
    assert_eq!(report.color_counts.color_count.colorless, 1);

    engine.analyze(&deck(&["Sol Rnig"]));
    assert_eq!(fetch.calls_to(&named("Sol Rnig")), 2);
    assert_eq!(engine.resolver().cached_len(), 0);
}

#[test]
fn test_commander_typo_is_nested_error() {
    let edgar = card_json(
        "Edgar Markov",
        "Legendary Creature — Vampire Knight",
        6.0,
        &["B", "R", "W"],
        "Eminence",
    );
    let fetch = Arc::new(
        CannedFetch::new()
            .route(named("Sol Ring"), card_json("Sol Ring", "Artifact", 1.0, &[], ""))
            .route(named("Edgr Markov"), edgar.clone())
            .route(named("EDGAR MARKOV"), edgar),
    );
    let engine = engine(fetch);

    // Fuzzy lookup corrects the spelling, but the commander check compares
    // the requested name against resolved names
    let (status, body) = respond(&engine, br#"{"deck": ["Edgr Markov", "Sol Ring"]}"#);
    assert_eq!(status.as_u16(), 200);
    assert_eq!(
        body["analysis"][0]["commander_analysis"],
        json!({"error": "Commander 'Edgr Markov' not found or invalid (may be a typo)"})
    );

    let (status, body) = respond(&engine, br#"{"deck": [" EDGAR MARKOV ", "Sol Ring"]}"#);
    assert_eq!(status.as_u16(), 200);
    let commander = &body["analysis"][0]["commander_analysis"];
    assert_eq!(commander["commander_name"], "Edgar Markov");
    assert_eq!(commander["is_legendary"], true);
    assert_eq!(commander["commander_colors"], json!(["B", "R", "W"]));
}

#[test]
fn test_http_surface_errors() {
    let engine = engine(Arc::new(CannedFetch::new()));

    let (status, body) = respond(&engine, br#"{"deck": {"Sol Ring": 1}}"#);
    assert_eq!(status.as_u16(), 400);
    assert_eq!(body, json!({"error": "Deck must be a list of strings"}));

    let (status, _) = respond(&engine, b"");
    assert_eq!(status.as_u16(), 500);

    // Valid JSON that is not an object carries no deck field at all
    let (status, body) = respond(&engine, br#"["Sol Ring"]"#);
    assert_eq!(status.as_u16(), 500);
    assert!(body["error"].is_string());
}

#[test]
fn test_deck_file_round_trip() {
    let fetch = Arc::new(
        CannedFetch::new()
            .route(named("Sol Ring"), card_json("Sol Ring", "Artifact", 1.0, &[], ""))
            .route(named("Arcane Signet"), card_json("Arcane Signet", "Artifact", 2.0, &[], "")),
    );
    let engine = engine(fetch);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deck.txt");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "# ramp package").unwrap();
    writeln!(f, "1 Sol Ring").unwrap();
    writeln!(f, "1x Arcane Signet").unwrap();
    writeln!(f, "Sol Ring").unwrap();
    f.flush().unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let report = engine.analyze(&parse_deck_text(&text));

    assert_eq!(report.mana_curve_histogram.values().sum::<usize>(), 2);
    assert_eq!(report.avg_converted_mana_cost, 1.5);
    assert_eq!(report.max_converted_mana_cost, 2.0);
}
