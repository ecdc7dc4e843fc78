//! WordSprint scraper entry point.

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::time::Duration;

use wordsprint_scraper::batch::BatchPolicy;
use wordsprint_scraper::cli;
use wordsprint_scraper::config::{resolve_credentials_path, ScrapeConfig};

#[derive(Parser)]
#[command(
    name = "wordsprint-scrape",
    about = "WordSprint scraper: export vocabulary units from the learning site as JSON",
    version
)]
struct Cli {
    #[command(flatten)]
    options: ScrapeOptions,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone)]
struct ScrapeOptions {
    /// Path to the credentials JSON file (USERNAME / PASSWORD).
    #[arg(long, global = true)]
    credentials: Option<String>,

    /// Directory the unit_<n>.json files are written to.
    #[arg(long, global = true)]
    output_dir: Option<String>,

    /// Site base URL.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// First unit to scrape.
    #[arg(long, global = true, default_value = "1")]
    from: u32,

    /// Last unit to scrape (inclusive).
    #[arg(long, global = true, default_value = "10")]
    to: u32,

    /// Keep going when a unit fails; exit non-zero at the end.
    #[arg(long, global = true)]
    continue_on_error: bool,

    /// Show the browser window.
    #[arg(long, global = true)]
    headful: bool,

    /// Seconds to wait for a card's meaning to become visible.
    #[arg(long, global = true, default_value = "10")]
    visibility_timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and scrape units (default).
    Scrape,
    /// Check environment and diagnose issues.
    Doctor,
    /// Generate shell completion scripts.
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

impl ScrapeOptions {
    fn into_config(self) -> Result<ScrapeConfig> {
        let mut config = ScrapeConfig::from_env()?;
        config.credentials_path = resolve_credentials_path(self.credentials.as_deref());
        if let Some(dir) = self.output_dir {
            config.output_dir = dir.into();
        }
        if let Some(base) = self.base_url {
            config.set_base_url(&base)?;
        }
        config.set_units(self.from, self.to)?;
        if self.continue_on_error {
            config.policy = BatchPolicy::ContinueOnFailure;
        }
        config.headless = !self.headful;
        config.visibility_timeout = Duration::from_secs(self.visibility_timeout);
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command.unwrap_or(Commands::Scrape) {
        Commands::Scrape => match cli.options.into_config() {
            Ok(config) => cli::scrape_cmd::run(config).await,
            Err(e) => Err(e),
        },
        Commands::Doctor => match cli.options.into_config() {
            Ok(config) => cli::doctor::run(&config).await,
            Err(e) => Err(e),
        },
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "wordsprint-scrape", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }

    result
}
