//! WordSprint scraper: logs into the learning site and exports each
//! vocabulary unit as a term → meaning JSON document.

pub mod auth;
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod renderer;
pub mod session;
pub mod storage;
pub mod types;
pub mod wait;

pub use auth::login;
pub use batch::{run_batch, BatchPolicy, BatchReport, UnitFailure, UnitSummary};
pub use config::{Credentials, ScrapeConfig, SiteSelectors};
pub use error::{ScrapeError, ScrapeResult};
pub use extract::{extract_unit, scrape_unit};
pub use session::{with_session, Session};
pub use types::{UnitDocument, UnitId, WordEntry};
