//! Unit extraction tests against the in-memory renderer.
//!
//! Covers trimming, duplicate terms, empty units, visibility waits, missing
//! card parts, and the exact bytes written to disk.

use std::time::Duration;

use tempfile::TempDir;

use wordsprint_scraper::config::ScrapeConfig;
use wordsprint_scraper::error::ScrapeError;
use wordsprint_scraper::extract::{extract_unit, scrape_unit};
use wordsprint_scraper::renderer::fake::{FakeCard, FakeEvent, FakePage, FakeRenderer, FakeSite};
use wordsprint_scraper::renderer::Renderer;
use wordsprint_scraper::session::Session;
use wordsprint_scraper::types::UnitId;

// ─────────────────────── helpers ───────────────────────

const BASE: &str = "http://fake.test";

fn unit_url(n: u32) -> String {
    format!("{BASE}/learning-systems/words/?u={n}")
}

fn test_config(dir: &TempDir) -> ScrapeConfig {
    let mut config = ScrapeConfig::default();
    config.set_base_url(BASE).unwrap();
    config.output_dir = dir.path().join("data");
    config.visibility_timeout = Duration::from_millis(200);
    config.element_timeout = Duration::from_millis(50);
    config.navigation_timeout = Duration::from_millis(50);
    config.poll_interval = Duration::from_millis(1);
    config
}

fn unit(n: u32) -> UnitId {
    UnitId::new(n).unwrap()
}

fn site_with_unit(n: u32, page: FakePage) -> FakeRenderer {
    FakeRenderer::new(FakeSite::new().page(&unit_url(n), page))
}

async fn open_session(renderer: &FakeRenderer) -> Session {
    Session::new(renderer.new_context().await.unwrap())
}

// ─────────────────────── extraction ───────────────────────

#[tokio::test]
async fn test_scenario_unit_three_written_with_two_space_indent() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let renderer = site_with_unit(
        3,
        FakePage::new()
            .card(FakeCard::new(" Bonjour ", " hello (greeting) "))
            .card(FakeCard::new("Merci", "thanks")),
    );
    let mut session = open_session(&renderer).await;

    let summary = scrape_unit(&mut session, unit(3), &config).await.unwrap();

    assert_eq!(summary.words, 2);
    assert_eq!(summary.path, dir.path().join("data").join("unit_3.json"));
    let written = std::fs::read_to_string(&summary.path).unwrap();
    assert_eq!(
        written,
        "{\n  \"Bonjour\": \"hello (greeting)\",\n  \"Merci\": \"thanks\"\n}"
    );
}

#[tokio::test]
async fn test_zero_cards_writes_empty_object() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let renderer = site_with_unit(1, FakePage::new());
    let mut session = open_session(&renderer).await;

    let summary = scrape_unit(&mut session, unit(1), &config).await.unwrap();

    assert_eq!(summary.words, 0);
    let written = std::fs::read_to_string(&summary.path).unwrap();
    assert_eq!(written, "{}");
    let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert!(parsed.as_object().unwrap().is_empty());
}

#[tokio::test]
async fn test_distinct_terms_one_entry_each() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let renderer = site_with_unit(
        2,
        FakePage::new()
            .card(FakeCard::new("apple", "a fruit"))
            .card(FakeCard::new("brick", "a block"))
            .card(FakeCard::new("cloud", "in the sky")),
    );
    let mut session = open_session(&renderer).await;

    let doc = extract_unit(session.context_mut(), unit(2), &config)
        .await
        .unwrap();

    assert_eq!(doc.len(), 3);
    assert_eq!(doc.get("apple"), Some("a fruit"));
    assert_eq!(doc.get("brick"), Some("a block"));
    assert_eq!(doc.get("cloud"), Some("in the sky"));
}

#[tokio::test]
async fn test_duplicate_term_keeps_later_meaning() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let renderer = site_with_unit(
        4,
        FakePage::new()
            .card(FakeCard::new("bank", "river side"))
            .card(FakeCard::new("coin", "money"))
            .card(FakeCard::new(" bank", "financial institution")),
    );
    let mut session = open_session(&renderer).await;

    let doc = extract_unit(session.context_mut(), unit(4), &config)
        .await
        .unwrap();

    assert_eq!(doc.len(), 2);
    assert_eq!(doc.get("bank"), Some("financial institution"));
    let terms: Vec<&str> = doc.iter().map(|(t, _)| t).collect();
    assert_eq!(terms, vec!["bank", "coin"]);
}

#[tokio::test]
async fn test_surrounding_whitespace_trimmed() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let renderer = site_with_unit(
        5,
        FakePage::new().card(FakeCard::new("  Apple \n", "  a fruit  ")),
    );
    let mut session = open_session(&renderer).await;

    let doc = extract_unit(session.context_mut(), unit(5), &config)
        .await
        .unwrap();

    assert_eq!(doc.get("Apple"), Some("a fruit"));
}

#[tokio::test]
async fn test_non_ascii_written_literally() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let renderer = site_with_unit(6, FakePage::new().card(FakeCard::new("apple", "תפוח")));
    let mut session = open_session(&renderer).await;

    let summary = scrape_unit(&mut session, unit(6), &config).await.unwrap();

    let bytes = std::fs::read(&summary.path).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("\"תפוח\""));
    assert!(!text.contains("\\u"));
    assert_eq!(text, "{\n  \"apple\": \"תפוח\"\n}");
}

#[tokio::test]
async fn test_extra_classes_on_card_still_match() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let renderer = site_with_unit(
        7,
        FakePage::new()
            .card(FakeCard::new("one", "1").classes("col-md-3 word-card flipped"))
            .card(FakeCard::new("two", "2").classes("word-card")),
    );
    let mut session = open_session(&renderer).await;

    let doc = extract_unit(session.context_mut(), unit(7), &config)
        .await
        .unwrap();

    assert_eq!(doc.len(), 2);
}

#[tokio::test]
async fn test_waits_for_delayed_visibility() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let renderer = site_with_unit(
        8,
        FakePage::new().card(FakeCard::new("slow", "eventually").reveal_after(5)),
    );
    let mut session = open_session(&renderer).await;

    let doc = extract_unit(session.context_mut(), unit(8), &config)
        .await
        .unwrap();

    assert_eq!(doc.get("slow"), Some("eventually"));
}

#[tokio::test]
async fn test_cards_scrolled_then_clicked_in_dom_order() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let renderer = site_with_unit(
        1,
        FakePage::new()
            .card(FakeCard::new("first", "1"))
            .card(FakeCard::new("second", "2")),
    );
    let mut session = open_session(&renderer).await;

    extract_unit(session.context_mut(), unit(1), &config)
        .await
        .unwrap();

    let journal = renderer.journal();
    let journal = journal.lock().await;
    let actions: Vec<&FakeEvent> = journal
        .events
        .iter()
        .filter(|e| matches!(e, FakeEvent::Scroll(_) | FakeEvent::Click(_)))
        .collect();
    assert_eq!(actions.len(), 4);
    assert!(matches!(actions[0], FakeEvent::Scroll(_)));
    assert!(matches!(actions[1], FakeEvent::Click(_)));
    assert!(matches!(actions[2], FakeEvent::Scroll(_)));
    assert!(matches!(actions[3], FakeEvent::Click(_)));
    assert_eq!(journal.events[0], FakeEvent::Navigate(unit_url(1)));
}

// ─────────────────────── failures ───────────────────────

#[tokio::test]
async fn test_meaning_never_visible_fails_unit() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let renderer = site_with_unit(
        9,
        FakePage::new()
            .card(FakeCard::new("ok", "fine"))
            .card(FakeCard::new("stuck", "hidden").never_revealed()),
    );
    let mut session = open_session(&renderer).await;

    let err = scrape_unit(&mut session, unit(9), &config)
        .await
        .unwrap_err();

    match err {
        ScrapeError::VisibilityTimeout { unit: u, card, .. } => {
            assert_eq!(u.get(), 9);
            assert_eq!(card, 1);
        }
        other => panic!("expected VisibilityTimeout, got {other:?}"),
    }
    assert!(!config.output_path(unit(9)).exists());
}

#[tokio::test]
async fn test_missing_word_fails_unit() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let renderer = site_with_unit(
        2,
        FakePage::new().card(FakeCard::new("x", "y").without_word()),
    );
    let mut session = open_session(&renderer).await;

    let err = extract_unit(session.context_mut(), unit(2), &config)
        .await
        .unwrap_err();

    assert!(err.is_extraction());
    assert!(matches!(err, ScrapeError::ElementMissing { ref selector, .. } if selector == ".word"));
}

#[tokio::test]
async fn test_missing_meaning_fails_unit() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let renderer = site_with_unit(
        2,
        FakePage::new().card(FakeCard::new("x", "y").without_meaning()),
    );
    let mut session = open_session(&renderer).await;

    let err = extract_unit(session.context_mut(), unit(2), &config)
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::ElementMissing { ref selector, .. } if selector == ".meaning"));
}
