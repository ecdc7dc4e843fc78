//! `wordsprint-scrape scrape`: log in and export units.

use anyhow::{Context, Result};
use tracing::info;

use crate::auth::login;
use crate::batch::{run_batch, BatchReport};
use crate::config::{Credentials, ScrapeConfig};
use crate::error::{ScrapeError, ScrapeResult};
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use crate::session::with_session;

/// Log in once and scrape every configured unit through `renderer`.
///
/// The session is released whether or not the run succeeds.
pub async fn scrape(
    renderer: &dyn Renderer,
    credentials: &Credentials,
    config: &ScrapeConfig,
) -> ScrapeResult<BatchReport> {
    with_session(renderer, |mut session| async move {
        let result: ScrapeResult<BatchReport> = async {
            login(&mut session, credentials, config).await?;
            run_batch(&mut session, config).await
        }
        .await;
        (session, result)
    })
    .await
}

/// Headline for a failed run, by error kind.
fn failure_context(e: &ScrapeError) -> &'static str {
    if e.is_config() {
        "configuration error"
    } else if e.is_auth() {
        "login failed"
    } else if e.is_extraction() {
        "unit extraction failed"
    } else {
        "scrape failed"
    }
}

/// Run the scrape command against a real Chromium instance.
pub async fn run(config: ScrapeConfig) -> Result<()> {
    let credentials = Credentials::load(&config.credentials_path).map_err(|e| {
        let headline = failure_context(&e);
        anyhow::Error::new(e).context(headline)
    })?;

    info!(
        first = %config.first_unit,
        last = %config.last_unit,
        output = %config.output_dir.display(),
        "starting scrape"
    );

    let renderer = ChromiumRenderer::launch(config.headless)
        .await
        .context("failed to start the browser")?;

    let report = scrape(&renderer, &credentials, &config)
        .await
        .map_err(|e| {
            let headline = failure_context(&e);
            anyhow::Error::new(e).context(headline)
        })?;

    for summary in &report.completed {
        println!(
            "  unit {:>2}: {:>4} words -> {}",
            summary.unit,
            summary.words,
            summary.path.display()
        );
    }
    for failure in &report.failed {
        eprintln!("  unit {:>2}: FAILED: {}", failure.unit, failure.error);
    }
    println!(
        "  {} unit(s), {} words in {}s",
        report.completed.len(),
        report.total_words(),
        (report.finished_at - report.started_at).num_seconds()
    );

    report.into_result()?;
    Ok(())
}
