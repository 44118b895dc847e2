//! Proxy crawler module for fetching SOCKS4 candidates from listing pages
//!
//! This module provides functionality for:
//! - Fetching proxy listing pages
//! - Extracting `ip address` / `port` / `version` columns from an HTML table

use crate::proxy::models::{Endpoint, Protocol};
use crate::Result;
use log::{debug, warn};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

/// Default timeout for HTTP requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default user agent for HTTP requests
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// Listing scraped when no source is given
pub const DEFAULT_SOURCE_URL: &str = "https://www.socks-proxy.net/";

const IP_COLUMN: &str = "ip address";
const PORT_COLUMN: &str = "port";
const VERSION_COLUMN: &str = "version";

static TABLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("Invalid table selector"));
static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("Invalid row selector"));
static CELL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("th, td").expect("Invalid cell selector"));

/// Result of crawling a single source
#[derive(Debug, Clone)]
pub struct CrawlResult {
    /// The source that was crawled
    pub source: String,
    /// Endpoints extracted from the source
    pub endpoints: Vec<Endpoint>,
    /// Error message if crawling failed
    pub error: Option<String>,
}

impl CrawlResult {
    /// Create a successful crawl result
    pub fn success(source: String, endpoints: Vec<Endpoint>) -> Self {
        Self {
            source,
            endpoints,
            error: None,
        }
    }

    /// Create a failed crawl result
    pub fn failure(source: String, error: String) -> Self {
        Self {
            source,
            endpoints: Vec::new(),
            error: Some(error),
        }
    }

    /// Check if the crawl was successful
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Configuration for proxy crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Timeout for HTTP requests
    pub timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CrawlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Proxy crawler for fetching candidates from listing pages
pub struct ProxyCrawler {
    client: Client,
}

impl ProxyCrawler {
    /// Create a new proxy crawler with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(CrawlerConfig::default())
    }

    /// Create a new proxy crawler with custom configuration
    pub fn with_config(config: CrawlerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client })
    }

    /// Fetch a listing page and extract its SOCKS4 endpoints
    pub async fn crawl_url(&self, url: &str) -> Result<Vec<Endpoint>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let content = response.text().await?;
        Ok(Self::parse_listing(&content))
    }

    /// Fetch several listing pages in order, returning results for each
    pub async fn crawl_urls_with_results(&self, urls: &[String]) -> Vec<CrawlResult> {
        let mut results = Vec::new();

        for url in urls {
            let result = match self.crawl_url(url).await {
                Ok(endpoints) => CrawlResult::success(url.clone(), endpoints),
                Err(e) => CrawlResult::failure(url.clone(), e.to_string()),
            };
            results.push(result);
        }

        results
    }

    /// Parse SOCKS4 endpoints from a listing page
    ///
    /// The first `<table>` is read through its header row; a page without
    /// one yields nothing, since bare IP:PORT text carries no protocol. Row
    /// order is kept and duplicates are not removed.
    pub fn parse_listing(content: &str) -> Vec<Endpoint> {
        let document = Html::parse_document(content);

        match document.select(&TABLE_SELECTOR).next() {
            Some(table) => Self::extract_from_table(table),
            None => {
                warn!("no table found on the listing page");
                Vec::new()
            }
        }
    }

    fn extract_from_table(table: ElementRef<'_>) -> Vec<Endpoint> {
        let mut rows = table.select(&ROW_SELECTOR);

        let header: Vec<String> = match rows.next() {
            Some(row) => row.select(&CELL_SELECTOR).map(|c| cell_text(c).to_lowercase()).collect(),
            None => {
                warn!("no rows found in the listing table");
                return Vec::new();
            }
        };

        let column = |name: &str| header.iter().position(|h| h == name);
        let (ip_index, port_index, version_index) =
            match (column(IP_COLUMN), column(PORT_COLUMN), column(VERSION_COLUMN)) {
                (Some(ip), Some(port), Some(version)) => (ip, port, version),
                _ => {
                    warn!("expected columns not found in listing header: {:?}", header);
                    return Vec::new();
                }
            };
        let min_cells = ip_index.max(port_index).max(version_index) + 1;

        let mut endpoints = Vec::new();
        for row in rows {
            let cells: Vec<String> = row.select(&CELL_SELECTOR).map(cell_text).collect();
            if cells.len() < min_cells {
                continue;
            }

            if cells[version_index].parse::<Protocol>().is_err() {
                continue;
            }

            let port = match cells[port_index].parse::<u16>() {
                Ok(port) if port != 0 => port,
                _ => {
                    debug!("skipping row with invalid port {:?}", cells[port_index]);
                    continue;
                }
            };

            let endpoint = Endpoint::socks4(cells[ip_index].as_str(), port);
            debug!("scraped proxy: {}", endpoint);
            endpoints.push(endpoint);
        }

        endpoints
    }
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}
