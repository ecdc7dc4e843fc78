//! Condition-based waits with a bounded timeout.
//!
//! Every page transition polls for the condition it depends on instead of
//! sleeping for a fixed duration.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::ScrapeResult;
use crate::renderer::{ElementId, RenderContext};

/// Poll `check` until it yields `Some`, or until `timeout` elapses.
///
/// Returns `Ok(None)` on timeout. The check always runs at least once, and
/// errors from the check abort the wait immediately.
pub async fn poll_until<T, F, Fut>(
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> ScrapeResult<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ScrapeResult<Option<T>>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = check().await? {
            return Ok(Some(value));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

/// Wait until an element matching `selector` is present in the page.
pub async fn wait_for_element(
    ctx: &dyn RenderContext,
    selector: &str,
    timeout: Duration,
    interval: Duration,
) -> ScrapeResult<Option<ElementId>> {
    poll_until(timeout, interval, move || async move {
        ctx.query_first(selector).await
    })
    .await
}

/// Wait until `element` is visible. Returns `false` on timeout.
pub async fn wait_until_visible(
    ctx: &dyn RenderContext,
    element: ElementId,
    timeout: Duration,
    interval: Duration,
) -> ScrapeResult<bool> {
    let seen = poll_until(timeout, interval, move || async move {
        Ok(ctx.is_visible(element).await?.then_some(()))
    })
    .await?;
    Ok(seen.is_some())
}
