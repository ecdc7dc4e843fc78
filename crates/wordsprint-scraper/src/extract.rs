//! Unit extractor: turns one unit's listing page into a [`UnitDocument`].
//!
//! Cards hide their meaning until clicked, so each card is scrolled into
//! view, clicked, and its meaning element polled until it is visible before
//! any text is read.

use tracing::{debug, info};

use crate::auth::is_same_page;
use crate::batch::UnitSummary;
use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::renderer::{ElementId, RenderContext};
use crate::session::Session;
use crate::storage;
use crate::types::{UnitDocument, UnitId, WordEntry};
use crate::wait::wait_until_visible;

/// Navigate to a unit's page and read every card on it, in document order.
///
/// Any card that lacks a word or meaning element, or whose meaning never
/// becomes visible, fails the whole unit. Landing on the login page instead
/// of the listing fails with [`ScrapeError::LoginRequired`] before anything
/// is read.
pub async fn extract_unit(
    ctx: &mut dyn RenderContext,
    unit: UnitId,
    config: &ScrapeConfig,
) -> ScrapeResult<UnitDocument> {
    let url = config.unit_url(unit)?;
    let nav = ctx.navigate(url.as_str(), config.navigation_timeout).await?;
    debug!(unit = %unit, url = %nav.final_url, load_ms = nav.load_time_ms, "unit page loaded");
    if is_same_page(&nav.final_url, config.login_url()?.as_str()) {
        return Err(ScrapeError::LoginRequired {
            unit,
            url: nav.final_url,
        });
    }

    let ctx: &dyn RenderContext = ctx;
    let cards = ctx.query_all(&config.selectors.card).await?;
    debug!(unit = %unit, cards = cards.len(), "cards found");

    let mut document = UnitDocument::new(unit);
    for (index, card) in cards.into_iter().enumerate() {
        let entry = read_card(ctx, unit, index, card, config).await?;
        let term = entry.term.clone();
        if let Some(previous) = document.insert(entry) {
            debug!(unit = %unit, card = index, term = %term, previous = %previous, "duplicate term replaced");
        }
    }
    Ok(document)
}

/// Expand one card and read its term and meaning.
async fn read_card(
    ctx: &dyn RenderContext,
    unit: UnitId,
    index: usize,
    card: ElementId,
    config: &ScrapeConfig,
) -> ScrapeResult<WordEntry> {
    let selectors = &config.selectors;
    let missing = |selector: &str| ScrapeError::ElementMissing {
        unit,
        card: index,
        selector: selector.to_string(),
    };

    ctx.scroll_into_view(card).await?;
    ctx.click(card).await?;

    let meaning_el = ctx
        .query_within(card, &selectors.meaning)
        .await?
        .ok_or_else(|| missing(&selectors.meaning))?;
    let visible = wait_until_visible(
        ctx,
        meaning_el,
        config.visibility_timeout,
        config.poll_interval,
    )
    .await?;
    if !visible {
        return Err(ScrapeError::VisibilityTimeout {
            unit,
            card: index,
            timeout: config.visibility_timeout,
        });
    }
    let meaning = ctx.inner_text(meaning_el).await?;

    let word_el = ctx
        .query_within(card, &selectors.word)
        .await?
        .ok_or_else(|| missing(&selectors.word))?;
    let term = ctx.inner_text(word_el).await?;

    Ok(WordEntry::from_raw(&term, &meaning))
}

/// Extract a unit through the session and write its document to disk.
pub async fn scrape_unit(
    session: &mut Session,
    unit: UnitId,
    config: &ScrapeConfig,
) -> ScrapeResult<UnitSummary> {
    let document = extract_unit(session.context_mut(), unit, config).await?;
    let path = storage::write_unit(&config.output_dir, &document)?;
    info!(unit = %unit, words = document.len(), path = %path.display(), "unit saved");
    Ok(UnitSummary {
        unit,
        words: document.len(),
        path,
    })
}
