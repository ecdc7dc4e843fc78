//! Error types for the scraper library.

use std::path::PathBuf;
use std::time::Duration;

use crate::types::UnitId;

/// All errors that can occur while logging in, extracting, or persisting units.
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    #[error("Cannot read credentials file {path}: {source}")]
    CredentialsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed credentials file {path}: {source}")]
    CredentialsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Login field not found: {selector}")]
    LoginFieldMissing { selector: String },

    /// A unit page landed on the login form instead of the listing.
    #[error("Unit {unit}: redirected to the login page ({url}); were the credentials rejected?")]
    LoginRequired { unit: UnitId, url: String },

    #[error("Navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// A card lacks one of its required sub-elements.
    #[error("Unit {unit}, card {card}: element `{selector}` not found")]
    ElementMissing {
        unit: UnitId,
        card: usize,
        selector: String,
    },

    /// A card's meaning never became visible after expansion.
    #[error("Unit {unit}, card {card}: meaning not visible after {timeout:?}")]
    VisibilityTimeout {
        unit: UnitId,
        card: usize,
        timeout: Duration,
    },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("{} unit(s) failed: {}", .failed.len(), join_units(.failed))]
    BatchFailed { failed: Vec<UnitId> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScrapeError {
    /// Whether this error came from reading or validating configuration.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            ScrapeError::CredentialsRead { .. }
                | ScrapeError::CredentialsParse { .. }
                | ScrapeError::InvalidConfig(_)
        )
    }

    /// Whether this error means the site did not accept the session.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            ScrapeError::LoginFieldMissing { .. } | ScrapeError::LoginRequired { .. }
        )
    }

    /// Whether this error aborts the current unit only.
    pub fn is_extraction(&self) -> bool {
        matches!(
            self,
            ScrapeError::ElementMissing { .. } | ScrapeError::VisibilityTimeout { .. }
        )
    }
}

impl From<chromiumoxide::error::CdpError> for ScrapeError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        ScrapeError::Browser(e.to_string())
    }
}

fn join_units(units: &[UnitId]) -> String {
    units
        .iter()
        .map(|u| u.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
