//! Browser session with scoped acquisition.
//!
//! A session holds one browser context (and its cookies) for the whole run:
//! login happens once, then every unit is scraped through the same context.
//! [`with_session`] owns the acquire/release pair so the context and the
//! renderer are released on every exit path.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::ScrapeResult;
use crate::renderer::{RenderContext, Renderer};

/// An authenticated (or about to be) browsing session.
pub struct Session {
    context: Box<dyn RenderContext>,
    created_at: Instant,
    authenticated: bool,
}

impl Session {
    pub fn new(context: Box<dyn RenderContext>) -> Self {
        Self {
            context,
            created_at: Instant::now(),
            authenticated: false,
        }
    }

    pub fn context(&self) -> &dyn RenderContext {
        self.context.as_ref()
    }

    pub fn context_mut(&mut self) -> &mut dyn RenderContext {
        self.context.as_mut()
    }

    pub fn mark_authenticated(&mut self) {
        self.authenticated = true;
    }

    /// Whether login was observed to leave the login page.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// How long the session has been alive.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Close the session and release the browser context.
    pub async fn close(self) -> ScrapeResult<()> {
        self.context.close().await
    }
}

/// Open a session, run `work` with it, then release it whatever the outcome.
///
/// `work` receives the session by value and hands it back alongside its
/// result. The context is closed and the renderer shut down before the
/// result is returned. A release failure is reported only when `work`
/// itself succeeded.
pub async fn with_session<T, F, Fut>(renderer: &dyn Renderer, work: F) -> ScrapeResult<T>
where
    F: FnOnce(Session) -> Fut,
    Fut: Future<Output = (Session, ScrapeResult<T>)>,
{
    let context = match renderer.new_context().await {
        Ok(context) => context,
        Err(e) => {
            if let Err(shutdown_err) = renderer.shutdown().await {
                warn!("renderer shutdown failed: {shutdown_err}");
            }
            return Err(e);
        }
    };

    let (session, result) = work(Session::new(context)).await;
    debug!(age_ms = session.age().as_millis() as u64, "releasing session");

    let closed = session.close().await;
    let shut = renderer.shutdown().await;

    match result {
        Ok(value) => {
            closed?;
            shut?;
            Ok(value)
        }
        Err(e) => {
            if let Err(close_err) = closed {
                warn!("session close failed: {close_err}");
            }
            if let Err(shutdown_err) = shut {
                warn!("renderer shutdown failed: {shutdown_err}");
            }
            Err(e)
        }
    }
}
