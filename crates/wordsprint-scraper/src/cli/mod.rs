//! CLI subcommand implementations for the `wordsprint-scrape` binary.

pub mod doctor;
pub mod scrape_cmd;
