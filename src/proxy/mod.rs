//! Proxy module for discovering and verifying SOCKS4 proxies
//!
//! This module provides functionality for:
//! - Crawling proxy listing pages for SOCKS4 candidates
//! - Reading saved candidate lists
//! - Verifying candidates through a SOCKS4 tunnel with bounded concurrency
//! - Saving candidate and verified lists atomically

pub mod checker;
pub mod crawler;
pub mod models;
pub mod parser;
pub mod probe;
pub mod sink;

pub use checker::{accepted_endpoints, CheckerConfig, ProxyChecker};
pub use crawler::{CrawlResult, CrawlerConfig, ProxyCrawler, DEFAULT_SOURCE_URL};
pub use models::{Endpoint, Protocol, Reason, VerificationOutcome};
pub use parser::ProxyParser;
pub use probe::TestTarget;
pub use sink::save_endpoints;
