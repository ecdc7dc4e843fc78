//! Renderer abstraction for browser-based page interaction.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (Chromium via chromiumoxide, or the in-memory
//! [`fake`] page model used by tests).
//!
//! Elements are addressed by [`ElementId`] handles that stay valid until the
//! context navigates again.

pub mod chromium;
pub mod fake;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScrapeResult;

/// Result of navigating to a URL.
#[derive(Debug, Clone)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// Handle to an element found in the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub usize);

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> ScrapeResult<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> ScrapeResult<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab).
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL and wait for the load to finish, bounded by `timeout`.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> ScrapeResult<NavigationResult>;
    /// Get the current URL.
    async fn get_url(&self) -> ScrapeResult<String>;
    /// All elements matching a CSS selector, in document order.
    async fn query_all(&self, selector: &str) -> ScrapeResult<Vec<ElementId>>;
    /// First descendant of `parent` matching a CSS selector.
    async fn query_within(
        &self,
        parent: ElementId,
        selector: &str,
    ) -> ScrapeResult<Option<ElementId>>;
    async fn scroll_into_view(&self, element: ElementId) -> ScrapeResult<()>;
    async fn click(&self, element: ElementId) -> ScrapeResult<()>;
    /// Whether the element is rendered and visible, not merely present.
    async fn is_visible(&self, element: ElementId) -> ScrapeResult<bool>;
    /// Rendered text of the element.
    async fn inner_text(&self, element: ElementId) -> ScrapeResult<String>;
    /// Focus the element and type into it.
    async fn type_text(&self, element: ElementId, text: &str) -> ScrapeResult<()>;
    /// Press Enter with the element focused (submits its form).
    async fn press_enter(&self, element: ElementId) -> ScrapeResult<()>;
    /// Close this context.
    async fn close(self: Box<Self>) -> ScrapeResult<()>;

    /// First element matching a CSS selector.
    async fn query_first(&self, selector: &str) -> ScrapeResult<Option<ElementId>> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }
}
