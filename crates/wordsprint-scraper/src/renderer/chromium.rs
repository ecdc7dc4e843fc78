//! Chromium-based renderer using chromiumoxide.

use super::{ElementId, NavigationResult, RenderContext, Renderer};
use crate::error::{ScrapeError, ScrapeResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Visible means displayed, not hidden, not transparent, and with a layout box.
const IS_VISIBLE_JS: &str = r#"function() {
    const style = window.getComputedStyle(this);
    const rect = this.getBoundingClientRect();
    return style.display !== 'none'
        && style.visibility !== 'hidden'
        && parseFloat(style.opacity || '1') > 0
        && rect.width > 0
        && rect.height > 0;
}"#;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. WORDSPRINT_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("WORDSPRINT_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.wordsprint/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".wordsprint/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".wordsprint/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
            ]
        } else {
            vec![
                home.join(".wordsprint/chromium/chrome-linux64/chrome"),
                home.join(".wordsprint/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser", "chrome"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    browser: Mutex<Browser>,
    handler: Mutex<Option<JoinHandle<()>>>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Launch a Chromium instance, headless unless `headless` is false.
    pub async fn launch(headless: bool) -> ScrapeResult<Self> {
        let chrome_path = find_chromium().ok_or_else(|| {
            ScrapeError::Browser(
                "Chromium not found. Install Chrome or set WORDSPRINT_CHROMIUM_PATH.".to_string(),
            )
        })?;
        debug!(path = %chrome_path.display(), headless, "launching Chromium");

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if !headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| ScrapeError::Browser(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config).await?;

        // Drive the CDP connection in the background
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler event error: {e}");
                }
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            handler: Mutex::new(Some(handle)),
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> ScrapeResult<Box<dyn RenderContext>> {
        let page = self.browser.lock().await.new_page("about:blank").await?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            page,
            elements: Mutex::new(Vec::new()),
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&self) -> ScrapeResult<()> {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!("browser close failed: {e}");
        }
        if let Err(e) = browser.wait().await {
            warn!("waiting for browser exit failed: {e}");
        }
        if let Some(handle) = self.handler.lock().await.take() {
            handle.abort();
        }
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
    /// Elements handed out since the last navigation, indexed by `ElementId`.
    elements: Mutex<Vec<Arc<Element>>>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumContext {
    async fn element(&self, id: ElementId) -> ScrapeResult<Arc<Element>> {
        self.elements
            .lock()
            .await
            .get(id.0)
            .cloned()
            .ok_or_else(|| ScrapeError::Browser(format!("stale element handle {}", id.0)))
    }

    async fn register(&self, found: Vec<Element>) -> Vec<ElementId> {
        let mut elements = self.elements.lock().await;
        found
            .into_iter()
            .map(|el| {
                elements.push(Arc::new(el));
                ElementId(elements.len() - 1)
            })
            .collect()
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> ScrapeResult<NavigationResult> {
        let start = Instant::now();
        self.elements.get_mut().clear();

        let result = tokio::time::timeout(timeout, self.page.goto(url)).await;
        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_)) => {
                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => Err(ScrapeError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(ScrapeError::NavigationTimeout {
                url: url.to_string(),
                timeout,
            }),
        }
    }

    async fn get_url(&self) -> ScrapeResult<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn query_all(&self, selector: &str) -> ScrapeResult<Vec<ElementId>> {
        let found = self.page.find_elements(selector).await?;
        Ok(self.register(found).await)
    }

    async fn query_within(
        &self,
        parent: ElementId,
        selector: &str,
    ) -> ScrapeResult<Option<ElementId>> {
        let parent = self.element(parent).await?;
        let found = parent.find_elements(selector).await?;
        let first: Vec<Element> = found.into_iter().take(1).collect();
        Ok(self.register(first).await.into_iter().next())
    }

    async fn scroll_into_view(&self, element: ElementId) -> ScrapeResult<()> {
        self.element(element).await?.scroll_into_view().await?;
        Ok(())
    }

    async fn click(&self, element: ElementId) -> ScrapeResult<()> {
        self.element(element).await?.click().await?;
        Ok(())
    }

    async fn is_visible(&self, element: ElementId) -> ScrapeResult<bool> {
        let returns = self
            .element(element)
            .await?
            .call_js_fn(IS_VISIBLE_JS, false)
            .await?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn inner_text(&self, element: ElementId) -> ScrapeResult<String> {
        Ok(self
            .element(element)
            .await?
            .inner_text()
            .await?
            .unwrap_or_default())
    }

    async fn type_text(&self, element: ElementId, text: &str) -> ScrapeResult<()> {
        self.element(element)
            .await?
            .click()
            .await?
            .type_str(text)
            .await?;
        Ok(())
    }

    async fn press_enter(&self, element: ElementId) -> ScrapeResult<()> {
        self.element(element).await?.press_key("Enter").await?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> ScrapeResult<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        let this = *self;
        this.page.close().await?;
        Ok(())
    }
}
