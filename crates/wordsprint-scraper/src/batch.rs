//! Batch driver: scrape a range of units through one session.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::extract::scrape_unit;
use crate::session::Session;
use crate::types::UnitId;

/// What to do when one unit fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPolicy {
    /// Stop the run and return the unit's error.
    #[default]
    HaltOnFirstFailure,
    /// Record the failure and move on to the next unit.
    ContinueOnFailure,
}

/// A unit that was scraped and written.
#[derive(Debug, Clone)]
pub struct UnitSummary {
    pub unit: UnitId,
    pub words: usize,
    pub path: PathBuf,
}

/// A unit that failed under [`BatchPolicy::ContinueOnFailure`].
#[derive(Debug, Clone)]
pub struct UnitFailure {
    pub unit: UnitId,
    pub error: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub completed: Vec<UnitSummary>,
    pub failed: Vec<UnitFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total_words(&self) -> usize {
        self.completed.iter().map(|s| s.words).sum()
    }

    /// Turn a report with failures into [`ScrapeError::BatchFailed`].
    pub fn into_result(self) -> ScrapeResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ScrapeError::BatchFailed {
                failed: self.failed.iter().map(|f| f.unit).collect(),
            })
        }
    }
}

/// Scrape every configured unit in ascending order.
///
/// Under [`BatchPolicy::HaltOnFirstFailure`] the first unit error is
/// returned as-is. Under [`BatchPolicy::ContinueOnFailure`] failures are
/// collected in the report and the call itself succeeds.
pub async fn run_batch(session: &mut Session, config: &ScrapeConfig) -> ScrapeResult<BatchReport> {
    let started_at = Utc::now();
    let mut completed = Vec::new();
    let mut failed = Vec::new();

    if !session.is_authenticated() {
        warn!("session is not known to be authenticated");
    }

    for unit in config.units() {
        info!(unit = %unit, "scraping unit");
        match scrape_unit(session, unit, config).await {
            Ok(summary) => completed.push(summary),
            Err(e) => match config.policy {
                BatchPolicy::HaltOnFirstFailure => {
                    error!(unit = %unit, "unit failed, halting: {e}");
                    return Err(e);
                }
                BatchPolicy::ContinueOnFailure => {
                    warn!(unit = %unit, "unit failed, continuing: {e}");
                    failed.push(UnitFailure {
                        unit,
                        error: e.to_string(),
                    });
                }
            },
        }
    }

    let report = BatchReport {
        started_at,
        finished_at: Utc::now(),
        completed,
        failed,
    };
    info!(
        units = report.completed.len(),
        failed = report.failed.len(),
        words = report.total_words(),
        "batch finished"
    );
    Ok(report)
}
