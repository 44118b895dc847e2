//! socks4-harvest - SOCKS4 proxy scraper and verifier
//!
//! Scrapes public listings for SOCKS4 proxies and verifies each candidate
//! concurrently by relaying a request through it to an IP echo service.

pub mod error;
pub mod harvest;
pub mod proxy;

pub use error::ConfigError;
pub use harvest::{harvest, HarvestSummary};
pub use proxy::*;

use std::path::PathBuf;

/// Application result type
pub type Result<T> = anyhow::Result<T>;

/// Application configuration for a harvest run
#[derive(Debug, Clone)]
pub struct Config {
    /// Listing pages to scrape
    pub source_urls: Vec<String>,
    /// Where every scraped candidate is written
    pub candidates_path: PathBuf,
    /// Where verified proxies are written
    pub accepted_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_urls: vec![DEFAULT_SOURCE_URL.to_string()],
            candidates_path: PathBuf::from("all_scraped_proxies.txt"),
            accepted_path: PathBuf::from("valid_socks4_proxies.txt"),
        }
    }
}
