//! Environment readiness check.

use anyhow::Result;

use crate::config::{Credentials, ScrapeConfig};
use crate::renderer::chromium::find_chromium;

/// Check browser availability, the credentials file, and the output directory.
pub async fn run(config: &ScrapeConfig) -> Result<()> {
    println!("WordSprint Scraper Doctor");
    println!("=========================");
    println!();

    let mut ready = true;

    match find_chromium() {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => {
            ready = false;
            println!("[!!] Chromium NOT found. Install Chrome or set WORDSPRINT_CHROMIUM_PATH.");
        }
    }

    let creds_path = &config.credentials_path;
    match Credentials::load(creds_path) {
        Ok(creds) => println!(
            "[OK] Credentials for '{}' in {}",
            creds.username(),
            creds_path.display()
        ),
        Err(e) => {
            ready = false;
            println!("[!!] {e}");
        }
    }

    let out = &config.output_dir;
    if out.is_dir() {
        let readonly = std::fs::metadata(out)
            .map(|m| m.permissions().readonly())
            .unwrap_or(true);
        if readonly {
            ready = false;
            println!("[!!] Output directory is read-only: {}", out.display());
        } else {
            println!("[OK] Output directory: {}", out.display());
        }
    } else {
        println!("[??] Output directory will be created: {}", out.display());
    }

    println!("[..] Site: {}", config.base_url);
    println!(
        "[..] Units: {} to {} ({:?})",
        config.first_unit, config.last_unit, config.policy
    );

    println!();
    if ready {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}
