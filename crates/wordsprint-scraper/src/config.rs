//! Configuration loading and resolution.
//!
//! Everything the scraper needs is carried in an explicit [`ScrapeConfig`]
//! value plus a [`Credentials`] value, both built once at startup and passed
//! down by reference.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

use crate::batch::BatchPolicy;
use crate::error::{ScrapeError, ScrapeResult};
use crate::types::UnitId;

pub const DEFAULT_BASE_URL: &str = "https://x.psychometrix.co.il";
pub const DEFAULT_CREDENTIALS_PATH: &str = "scraping/credentials.json";
pub const DEFAULT_OUTPUT_DIR: &str = "data";

/// Highest unit published on the site.
pub const DEFAULT_LAST_UNIT: u32 = 10;

/// Login credentials. The password is wiped from memory on drop.
pub struct Credentials {
    username: String,
    password: Zeroizing<String>,
}

#[derive(Deserialize)]
struct CredentialsFile {
    #[serde(rename = "USERNAME")]
    username: String,
    #[serde(rename = "PASSWORD")]
    password: String,
}

impl Credentials {
    /// Build credentials, rejecting empty values.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> ScrapeResult<Self> {
        let username = username.into();
        let password = Zeroizing::new(password.into());
        if username.trim().is_empty() {
            return Err(ScrapeError::InvalidConfig("USERNAME is empty".to_string()));
        }
        if password.is_empty() {
            return Err(ScrapeError::InvalidConfig("PASSWORD is empty".to_string()));
        }
        Ok(Self { username, password })
    }

    /// Load credentials from a JSON file with `USERNAME` and `PASSWORD` keys.
    pub fn load(path: &Path) -> ScrapeResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ScrapeError::CredentialsRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|e| match e {
            ScrapeError::Json(source) => ScrapeError::CredentialsParse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse credentials from a JSON document.
    pub fn from_json(raw: &str) -> ScrapeResult<Self> {
        let file: CredentialsFile = serde_json::from_str(raw)?;
        Self::new(file.username, file.password)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// CSS selectors describing the remote site's markup.
#[derive(Debug, Clone)]
pub struct SiteSelectors {
    pub username_field: String,
    pub password_field: String,
    /// Partial class match: cards may carry additional classes.
    pub card: String,
    pub word: String,
    pub meaning: String,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            username_field: r#"[name="_ctl0:page_content:txt_UserName"]"#.to_string(),
            password_field: r#"[name="_ctl0:page_content:txt_Password"]"#.to_string(),
            card: "[class*='word-card']".to_string(),
            word: ".word".to_string(),
            meaning: ".meaning".to_string(),
        }
    }
}

/// Full configuration for one scraping run.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub base_url: Url,
    pub login_path: String,
    pub words_path: String,
    pub credentials_path: PathBuf,
    pub output_dir: PathBuf,
    pub first_unit: UnitId,
    pub last_unit: UnitId,
    pub policy: BatchPolicy,
    /// Run the browser without a window.
    pub headless: bool,
    pub navigation_timeout: Duration,
    /// Bound on waiting for an element to appear in the DOM.
    pub element_timeout: Duration,
    /// Bound on waiting for an expanded meaning to become visible.
    pub visibility_timeout: Duration,
    pub poll_interval: Duration,
    pub selectors: SiteSelectors,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            login_path: "pages/loginout/login.aspx".to_string(),
            words_path: "learning-systems/words/".to_string(),
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            first_unit: UnitId::new(1).expect("1 is a valid unit"),
            last_unit: UnitId::new(DEFAULT_LAST_UNIT).expect("default last unit is valid"),
            policy: BatchPolicy::HaltOnFirstFailure,
            headless: true,
            navigation_timeout: Duration::from_secs(30),
            element_timeout: Duration::from_secs(10),
            visibility_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
            selectors: SiteSelectors::default(),
        }
    }
}

impl ScrapeConfig {
    /// Default configuration with `WORDSPRINT_*` environment overrides applied.
    pub fn from_env() -> ScrapeResult<Self> {
        let mut config = Self::default();
        if let Ok(base) = std::env::var("WORDSPRINT_BASE_URL") {
            config.set_base_url(&base)?;
        }
        if let Ok(path) = std::env::var("WORDSPRINT_CREDENTIALS") {
            config.credentials_path = PathBuf::from(path);
        }
        if let Ok(dir) = std::env::var("WORDSPRINT_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    /// Set the site root. Any path on it is kept as a prefix for every page.
    pub fn set_base_url(&mut self, raw: &str) -> ScrapeResult<()> {
        let mut url = Url::parse(raw)
            .map_err(|e| ScrapeError::InvalidConfig(format!("bad base URL '{raw}': {e}")))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.base_url = url;
        Ok(())
    }

    /// Set the inclusive unit range.
    pub fn set_units(&mut self, first: u32, last: u32) -> ScrapeResult<()> {
        let first = UnitId::new(first)?;
        let last = UnitId::new(last)?;
        if first > last {
            return Err(ScrapeError::InvalidConfig(format!(
                "unit range is empty ({first} > {last})"
            )));
        }
        self.first_unit = first;
        self.last_unit = last;
        Ok(())
    }

    pub fn login_url(&self) -> ScrapeResult<Url> {
        self.join(&self.login_path)
    }

    /// Listing page for one unit: `<words_path>?u=<unit>`.
    pub fn unit_url(&self, unit: UnitId) -> ScrapeResult<Url> {
        let mut url = self.join(&self.words_path)?;
        url.query_pairs_mut().append_pair("u", &unit.to_string());
        Ok(url)
    }

    /// Units to scrape, ascending.
    pub fn units(&self) -> impl Iterator<Item = UnitId> {
        (self.first_unit.get()..=self.last_unit.get()).filter_map(|n| UnitId::new(n).ok())
    }

    pub fn output_path(&self, unit: UnitId) -> PathBuf {
        self.output_dir.join(unit.file_name())
    }

    /// Resolve `path` under the base URL; a leading `/` does not escape it.
    fn join(&self, path: &str) -> ScrapeResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ScrapeError::InvalidConfig(format!("bad path '{path}': {e}")))
    }
}

/// Resolve the credentials file path: explicit flag, then environment, then default.
pub fn resolve_credentials_path(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }
    if let Ok(env_path) = std::env::var("WORDSPRINT_CREDENTIALS") {
        return PathBuf::from(env_path);
    }
    PathBuf::from(DEFAULT_CREDENTIALS_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_unit_url_has_query_parameter() {
        let config = ScrapeConfig::default();
        let url = config.unit_url(UnitId::new(3).unwrap()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://x.psychometrix.co.il/learning-systems/words/?u=3"
        );
        assert_eq!(
            config.login_url().unwrap().as_str(),
            "https://x.psychometrix.co.il/pages/loginout/login.aspx"
        );
    }

    #[test]
    fn test_base_url_path_prefix_kept() {
        let mut config = ScrapeConfig::default();
        config.set_base_url("https://host.test/prefix").unwrap();
        assert_eq!(
            config.login_url().unwrap().as_str(),
            "https://host.test/prefix/pages/loginout/login.aspx"
        );
        assert_eq!(
            config.unit_url(UnitId::new(2).unwrap()).unwrap().as_str(),
            "https://host.test/prefix/learning-systems/words/?u=2"
        );

        config.set_base_url("https://host.test/prefix/").unwrap();
        config.login_path = "/pages/loginout/login.aspx".to_string();
        assert_eq!(
            config.login_url().unwrap().as_str(),
            "https://host.test/prefix/pages/loginout/login.aspx"
        );
    }

    #[test]
    fn test_default_units_are_one_to_ten() {
        let config = ScrapeConfig::default();
        let units: Vec<u32> = config.units().map(|u| u.get()).collect();
        assert_eq!(units, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn test_set_units_rejects_reversed_range() {
        let mut config = ScrapeConfig::default();
        assert!(config.set_units(5, 2).is_err());
        assert!(config.set_units(0, 2).is_err());
        config.set_units(4, 4).unwrap();
        assert_eq!(config.units().count(), 1);
    }

    #[test]
    fn test_credentials_load_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"USERNAME": "dana", "PASSWORD": "s3cret"}}"#).unwrap();

        let creds = Credentials::load(file.path()).unwrap();
        assert_eq!(creds.username(), "dana");
        assert_eq!(creds.password(), "s3cret");
        assert!(!format!("{creds:?}").contains("s3cret"));
    }

    #[test]
    fn test_credentials_keys_are_case_sensitive() {
        let err = Credentials::from_json(r#"{"username": "dana", "password": "x"}"#).unwrap_err();
        assert!(matches!(err, ScrapeError::Json(_)));
    }

    #[test]
    fn test_credentials_missing_key_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"USERNAME": "dana"}}"#).unwrap();

        let err = Credentials::load(file.path()).unwrap_err();
        assert!(matches!(err, ScrapeError::CredentialsParse { .. }));
        assert!(err.is_config());
    }

    #[test]
    fn test_credentials_empty_value_rejected() {
        let err = Credentials::from_json(r#"{"USERNAME": "dana", "PASSWORD": ""}"#).unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidConfig(_)));
    }

    #[test]
    fn test_credentials_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = Credentials::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ScrapeError::CredentialsRead { .. }));
    }
}
