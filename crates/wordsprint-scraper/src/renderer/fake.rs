//! In-memory renderer for tests and offline runs.
//!
//! A [`FakeSite`] maps URLs to [`FakePage`]s built from a small node tree.
//! The context understands the selector forms the scraper uses:
//! `.class`, `[class*='part']` and `[name="value"]`. Every interaction is
//! appended to a shared [`Journal`] so callers can inspect what happened
//! after the context is gone.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ElementId, NavigationResult, RenderContext, Renderer};
use crate::error::{ScrapeError, ScrapeResult};

/// When a node becomes visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reveal {
    Always,
    /// Hidden until an ancestor is clicked, then visible after
    /// the given number of visibility checks.
    OnClick { after_checks: u32 },
    Never,
}

/// A node in a fake page.
#[derive(Debug, Clone)]
pub struct FakeNode {
    pub classes: Vec<String>,
    pub name: Option<String>,
    pub text: String,
    pub reveal: Reveal,
    pub children: Vec<FakeNode>,
}

impl FakeNode {
    pub fn new(classes: &str) -> Self {
        Self {
            classes: classes.split_whitespace().map(str::to_string).collect(),
            name: None,
            text: String::new(),
            reveal: Reveal::Always,
            children: Vec::new(),
        }
    }

    /// An input field identified by its `name` attribute.
    pub fn input(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::new("")
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn reveal(mut self, reveal: Reveal) -> Self {
        self.reveal = reveal;
        self
    }

    pub fn child(mut self, child: FakeNode) -> Self {
        self.children.push(child);
        self
    }
}

/// Builder for a vocabulary card: a `word-card` node with `.word` and
/// `.meaning` children, the meaning hidden until the card is clicked.
#[derive(Debug, Clone)]
pub struct FakeCard {
    classes: String,
    term: Option<String>,
    meaning: Option<String>,
    reveal: Reveal,
}

impl FakeCard {
    pub fn new(term: &str, meaning: &str) -> Self {
        Self {
            classes: "word-card".to_string(),
            term: Some(term.to_string()),
            meaning: Some(meaning.to_string()),
            reveal: Reveal::OnClick { after_checks: 0 },
        }
    }

    pub fn classes(mut self, classes: &str) -> Self {
        self.classes = classes.to_string();
        self
    }

    pub fn without_word(mut self) -> Self {
        self.term = None;
        self
    }

    pub fn without_meaning(mut self) -> Self {
        self.meaning = None;
        self
    }

    /// Meaning becomes visible only after this many checks following the click.
    pub fn reveal_after(mut self, checks: u32) -> Self {
        self.reveal = Reveal::OnClick {
            after_checks: checks,
        };
        self
    }

    pub fn never_revealed(mut self) -> Self {
        self.reveal = Reveal::Never;
        self
    }

    pub fn into_node(self) -> FakeNode {
        let mut card = FakeNode::new(&self.classes);
        if let Some(term) = self.term {
            card = card.child(FakeNode::new("word").text(&term));
        }
        if let Some(meaning) = self.meaning {
            card = card.child(FakeNode::new("meaning").text(&meaning).reveal(self.reveal));
        }
        card
    }
}

/// A page: top-level nodes in document order.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub nodes: Vec<FakeNode>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, node: FakeNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn card(self, card: FakeCard) -> Self {
        self.node(card.into_node())
    }

    /// A login form with username and password inputs.
    pub fn login_form(username_field: &str, password_field: &str) -> Self {
        Self::new().node(
            FakeNode::new("login")
                .child(FakeNode::input(username_field))
                .child(FakeNode::input(password_field)),
        )
    }
}

/// URL → page mapping plus login behavior.
#[derive(Debug, Clone, Default)]
pub struct FakeSite {
    pages: HashMap<String, FakePage>,
    /// Pressing Enter on this URL navigates to the target URL.
    login: Option<(String, String)>,
    /// Until signed in, every other page redirects to this login URL.
    wall: Option<String>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// Submitting the form at `login_url` redirects to `landing_url`.
    pub fn login_redirect(mut self, login_url: &str, landing_url: &str) -> Self {
        self.login = Some((login_url.to_string(), landing_url.to_string()));
        self
    }

    /// Send every page except `login_url` back to the login form until a
    /// submission has redirected.
    pub fn login_wall(mut self, login_url: &str) -> Self {
        self.wall = Some(login_url.to_string());
        self
    }

    /// Where a request for `url` actually lands.
    fn resolve(&self, url: &str, signed_in: bool) -> (String, Option<&FakePage>) {
        match &self.wall {
            Some(login_url) if !signed_in && url != login_url => (
                format!("{login_url}?ReturnUrl={url}"),
                self.pages.get(login_url),
            ),
            _ => (url.to_string(), self.pages.get(url)),
        }
    }
}

/// One recorded interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeEvent {
    Navigate(String),
    Scroll(String),
    Click(String),
    Type { field: String, text: String },
    Enter(String),
}

/// Shared record of interactions across contexts.
#[derive(Debug, Default)]
pub struct Journal {
    pub events: Vec<FakeEvent>,
    pub contexts_opened: usize,
    pub contexts_closed: usize,
    pub shutdowns: usize,
}

/// Renderer over a [`FakeSite`].
pub struct FakeRenderer {
    site: Arc<FakeSite>,
    journal: Arc<Mutex<Journal>>,
    active_count: Arc<AtomicUsize>,
}

impl FakeRenderer {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site: Arc::new(site),
            journal: Arc::new(Mutex::new(Journal::default())),
            active_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn journal(&self) -> Arc<Mutex<Journal>> {
        Arc::clone(&self.journal)
    }

    /// Open a context directly, bypassing the trait object.
    pub async fn open(&self) -> FakeContext {
        self.active_count.fetch_add(1, Ordering::Relaxed);
        self.journal.lock().await.contexts_opened += 1;
        FakeContext {
            site: Arc::clone(&self.site),
            journal: Arc::clone(&self.journal),
            active_count: Arc::clone(&self.active_count),
            state: Mutex::new(PageState::default()),
            signed_in: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn new_context(&self) -> ScrapeResult<Box<dyn RenderContext>> {
        Ok(Box::new(self.open().await))
    }

    async fn shutdown(&self) -> ScrapeResult<()> {
        self.journal.lock().await.shutdowns += 1;
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// Flattened node with runtime state.
#[derive(Debug)]
struct NodeState {
    node: FakeNode,
    children: Vec<usize>,
    /// Checks remaining before an `OnClick` node turns visible, once armed.
    pending: Option<u32>,
}

#[derive(Debug, Default)]
struct PageState {
    url: String,
    nodes: Vec<NodeState>,
    roots: Vec<usize>,
}

impl PageState {
    fn load(url: &str, page: Option<&FakePage>) -> Self {
        let mut state = PageState {
            url: url.to_string(),
            ..Default::default()
        };
        if let Some(page) = page {
            for node in &page.nodes {
                let id = state.push(node);
                state.roots.push(id);
            }
        }
        state
    }

    fn push(&mut self, node: &FakeNode) -> usize {
        let id = self.nodes.len();
        self.nodes.push(NodeState {
            node: FakeNode {
                children: Vec::new(),
                ..node.clone()
            },
            children: Vec::new(),
            pending: None,
        });
        for child in &node.children {
            let child_id = self.push(child);
            self.nodes[id].children.push(child_id);
        }
        id
    }

    /// Pre-order traversal of the subtree rooted at each of `starts`.
    fn descendants(&self, starts: &[usize], out: &mut Vec<usize>) {
        for &id in starts {
            out.push(id);
            self.descendants(&self.nodes[id].children, out);
        }
    }

    fn get(&self, id: ElementId) -> ScrapeResult<&NodeState> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| ScrapeError::Browser(format!("stale element handle {}", id.0)))
    }

    fn label(&self, id: ElementId) -> String {
        match self.nodes.get(id.0) {
            Some(n) => n
                .node
                .name
                .clone()
                .unwrap_or_else(|| format!("{}:{}", n.node.classes.join("."), n.node.text.trim())),
            None => format!("#{}", id.0),
        }
    }
}

/// Parsed form of the selectors the fake understands.
enum Selector {
    Class(String),
    ClassContains(String),
    Name(String),
}

impl Selector {
    fn parse(raw: &str) -> ScrapeResult<Self> {
        let raw = raw.trim();
        if let Some(class) = raw.strip_prefix('.') {
            return Ok(Selector::Class(class.to_string()));
        }
        let attr = raw
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .ok_or_else(|| ScrapeError::Browser(format!("unsupported selector: {raw}")))?;
        let unquote = |v: &str| v.trim_matches(|c: char| c == '\'' || c == '"').to_string();
        if let Some(value) = attr.strip_prefix("class*=") {
            return Ok(Selector::ClassContains(unquote(value)));
        }
        if let Some(value) = attr.strip_prefix("name=") {
            return Ok(Selector::Name(unquote(value)));
        }
        Err(ScrapeError::Browser(format!("unsupported selector: {raw}")))
    }

    fn matches(&self, node: &FakeNode) -> bool {
        match self {
            Selector::Class(c) => node.classes.iter().any(|k| k == c),
            Selector::ClassContains(part) => node.classes.join(" ").contains(part.as_str()),
            Selector::Name(n) => node.name.as_deref() == Some(n.as_str()),
        }
    }
}

/// A context over the fake site.
pub struct FakeContext {
    site: Arc<FakeSite>,
    journal: Arc<Mutex<Journal>>,
    active_count: Arc<AtomicUsize>,
    state: Mutex<PageState>,
    signed_in: AtomicBool,
}

impl FakeContext {
    async fn record(&self, event: FakeEvent) {
        self.journal.lock().await.events.push(event);
    }
}

#[async_trait]
impl RenderContext for FakeContext {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> ScrapeResult<NavigationResult> {
        let (final_url, page) = self.site.resolve(url, self.signed_in.load(Ordering::Relaxed));
        *self.state.get_mut() = PageState::load(&final_url, page);
        self.record(FakeEvent::Navigate(url.to_string())).await;
        Ok(NavigationResult {
            final_url,
            load_time_ms: 0,
        })
    }

    async fn get_url(&self) -> ScrapeResult<String> {
        Ok(self.state.lock().await.url.clone())
    }

    async fn query_all(&self, selector: &str) -> ScrapeResult<Vec<ElementId>> {
        let selector = Selector::parse(selector)?;
        let state = self.state.lock().await;
        let mut all = Vec::new();
        state.descendants(&state.roots, &mut all);
        Ok(all
            .into_iter()
            .filter(|&id| selector.matches(&state.nodes[id].node))
            .map(ElementId)
            .collect())
    }

    async fn query_within(
        &self,
        parent: ElementId,
        selector: &str,
    ) -> ScrapeResult<Option<ElementId>> {
        let selector = Selector::parse(selector)?;
        let state = self.state.lock().await;
        let mut below = Vec::new();
        state.descendants(&state.get(parent)?.children, &mut below);
        Ok(below
            .into_iter()
            .find(|&id| selector.matches(&state.nodes[id].node))
            .map(ElementId))
    }

    async fn scroll_into_view(&self, element: ElementId) -> ScrapeResult<()> {
        let label = {
            let state = self.state.lock().await;
            state.get(element)?;
            state.label(element)
        };
        self.record(FakeEvent::Scroll(label)).await;
        Ok(())
    }

    async fn click(&self, element: ElementId) -> ScrapeResult<()> {
        let label = {
            let mut state = self.state.lock().await;
            let mut below = Vec::new();
            state.descendants(&state.get(element)?.children, &mut below);
            for id in below {
                let node = &mut state.nodes[id];
                if let Reveal::OnClick { after_checks } = node.node.reveal {
                    node.pending.get_or_insert(after_checks);
                }
            }
            state.label(element)
        };
        self.record(FakeEvent::Click(label)).await;
        Ok(())
    }

    async fn is_visible(&self, element: ElementId) -> ScrapeResult<bool> {
        let mut state = self.state.lock().await;
        state.get(element)?;
        let node = &mut state.nodes[element.0];
        Ok(match node.node.reveal {
            Reveal::Always => true,
            Reveal::Never => false,
            Reveal::OnClick { .. } => match node.pending.as_mut() {
                None => false,
                Some(0) => true,
                Some(n) => {
                    *n -= 1;
                    false
                }
            },
        })
    }

    async fn inner_text(&self, element: ElementId) -> ScrapeResult<String> {
        Ok(self.state.lock().await.get(element)?.node.text.clone())
    }

    async fn type_text(&self, element: ElementId, text: &str) -> ScrapeResult<()> {
        let field = {
            let state = self.state.lock().await;
            state.get(element)?;
            state.label(element)
        };
        self.record(FakeEvent::Type {
            field,
            text: text.to_string(),
        })
        .await;
        Ok(())
    }

    async fn press_enter(&self, element: ElementId) -> ScrapeResult<()> {
        let label = {
            let mut state = self.state.lock().await;
            state.get(element)?;
            let label = state.label(element);
            if let Some((login_url, landing_url)) = &self.site.login {
                if &state.url == login_url {
                    *state = PageState::load(landing_url, self.site.pages.get(landing_url));
                    self.signed_in.store(true, Ordering::Relaxed);
                }
            }
            label
        };
        self.record(FakeEvent::Enter(label)).await;
        Ok(())
    }

    async fn close(self: Box<Self>) -> ScrapeResult<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        self.journal.lock().await.contexts_closed += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_class_contains_tolerates_extra_classes() {
        let site = FakeSite::new().page(
            "http://t/u",
            FakePage::new()
                .card(FakeCard::new("a", "1").classes("flip word-card active"))
                .card(FakeCard::new("b", "2").classes("word-card-v2"))
                .node(FakeNode::new("other")),
        );
        let renderer = FakeRenderer::new(site);
        let mut ctx = renderer.open().await;
        ctx.navigate("http://t/u", Duration::from_secs(1)).await.unwrap();

        let cards = ctx.query_all("[class*='word-card']").await.unwrap();
        assert_eq!(cards.len(), 2);
        let exact = ctx.query_all(".word-card").await.unwrap();
        assert_eq!(exact, vec![cards[0]]);
    }

    #[tokio::test]
    async fn test_login_wall_redirects_until_signed_in() {
        let login = "http://t/login";
        let site = FakeSite::new()
            .page(login, FakePage::login_form("user", "pass"))
            .page("http://t/u", FakePage::new().card(FakeCard::new("a", "1")))
            .login_redirect(login, "http://t/home")
            .login_wall(login);
        let renderer = FakeRenderer::new(site);
        let mut ctx = renderer.open().await;

        let nav = ctx.navigate("http://t/u", Duration::from_secs(1)).await.unwrap();
        assert_eq!(nav.final_url, "http://t/login?ReturnUrl=http://t/u");
        assert!(ctx.query_all("[class*='word-card']").await.unwrap().is_empty());

        ctx.navigate(login, Duration::from_secs(1)).await.unwrap();
        let pass = ctx.query_first(r#"[name="pass"]"#).await.unwrap().unwrap();
        ctx.press_enter(pass).await.unwrap();

        let nav = ctx.navigate("http://t/u", Duration::from_secs(1)).await.unwrap();
        assert_eq!(nav.final_url, "http://t/u");
        assert_eq!(ctx.query_all("[class*='word-card']").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_meaning_hidden_until_click() {
        let site = FakeSite::new().page(
            "http://t/u",
            FakePage::new().card(FakeCard::new("a", "1").reveal_after(1)),
        );
        let renderer = FakeRenderer::new(site);
        let mut ctx = renderer.open().await;
        ctx.navigate("http://t/u", Duration::from_secs(1)).await.unwrap();

        let card = ctx.query_first("[class*='word-card']").await.unwrap().unwrap();
        let meaning = ctx.query_within(card, ".meaning").await.unwrap().unwrap();
        assert!(!ctx.is_visible(meaning).await.unwrap());

        ctx.click(card).await.unwrap();
        assert!(!ctx.is_visible(meaning).await.unwrap());
        assert!(ctx.is_visible(meaning).await.unwrap());
    }

    #[tokio::test]
    async fn test_unsupported_selector_is_error() {
        let renderer = FakeRenderer::new(FakeSite::new());
        let ctx = renderer.open().await;
        assert!(ctx.query_all("div > span").await.is_err());
    }
}
