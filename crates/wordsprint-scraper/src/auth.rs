//! Session authenticator: fills and submits the site's login form.

use tracing::{debug, info, warn};

use crate::config::{Credentials, ScrapeConfig};
use crate::error::{ScrapeError, ScrapeResult};
use crate::renderer::RenderContext;
use crate::session::Session;
use crate::wait::{poll_until, wait_for_element};

/// Log in through the login form.
///
/// Fails if the form fields cannot be found. Rejected credentials are not
/// detected here: the page stays on the login URL, a warning is logged, and
/// the failure shows up later when unit pages bounce back to the login form
/// ([`ScrapeError::LoginRequired`]).
pub async fn login(
    session: &mut Session,
    credentials: &Credentials,
    config: &ScrapeConfig,
) -> ScrapeResult<()> {
    let login_url = config.login_url()?;
    info!(url = %login_url, user = credentials.username(), "logging in");

    session
        .context_mut()
        .navigate(login_url.as_str(), config.navigation_timeout)
        .await?;

    let ctx = session.context();
    let selectors = &config.selectors;

    let username = wait_for_element(
        ctx,
        &selectors.username_field,
        config.element_timeout,
        config.poll_interval,
    )
    .await?
    .ok_or_else(|| ScrapeError::LoginFieldMissing {
        selector: selectors.username_field.clone(),
    })?;
    let password = ctx
        .query_first(&selectors.password_field)
        .await?
        .ok_or_else(|| ScrapeError::LoginFieldMissing {
            selector: selectors.password_field.clone(),
        })?;

    ctx.type_text(username, credentials.username()).await?;
    ctx.type_text(password, credentials.password()).await?;
    ctx.press_enter(password).await?;

    match wait_for_redirect(ctx, login_url.as_str(), config).await? {
        Some(landing) => {
            debug!(url = %landing, "login redirected");
            session.mark_authenticated();
        }
        None => warn!(
            "still on the login page after {:?}; credentials may have been rejected",
            config.navigation_timeout
        ),
    }
    Ok(())
}

/// Wait until the context has left `login_url`. Returns the new URL.
async fn wait_for_redirect(
    ctx: &dyn RenderContext,
    login_url: &str,
    config: &ScrapeConfig,
) -> ScrapeResult<Option<String>> {
    poll_until(config.navigation_timeout, config.poll_interval, move || async move {
        let current = ctx.get_url().await?;
        Ok((!is_same_page(&current, login_url)).then_some(current))
    })
    .await
}

/// Compare two URLs ignoring query string and fragment.
pub(crate) fn is_same_page(a: &str, b: &str) -> bool {
    fn strip(u: &str) -> &str {
        u.split(['?', '#']).next().unwrap_or(u)
    }
    strip(a).eq_ignore_ascii_case(strip(b))
}
