//! Proxy parser module for reading saved candidate lists

use crate::proxy::models::{Endpoint, Protocol};
use crate::Result;
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

/// `[scheme://]host:port`, optionally with a trailing slash
static LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:([A-Za-z0-9]+)://)?([^:/\s]+):(\d{1,5})/?$").expect("Invalid proxy line regex")
});

/// Proxy parser for parsing endpoints from strings and files
pub struct ProxyParser;

impl ProxyParser {
    /// Parse a single proxy line
    ///
    /// Supports formats:
    /// - IP:PORT
    /// - socks4://IP:PORT
    ///
    /// Lines naming any other scheme are skipped.
    pub fn parse_line(line: &str) -> Option<Endpoint> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let caps = LINE_REGEX.captures(line)?;

        let protocol = match caps.get(1) {
            Some(scheme) => scheme.as_str().parse::<Protocol>().ok()?,
            None => Protocol::Socks4,
        };
        let port: u16 = caps[3].parse().ok()?;
        if port == 0 {
            return None;
        }

        Some(Endpoint::new(&caps[2], port, protocol))
    }

    /// Parse endpoints from a string (multiple lines), keeping their order
    pub fn parse_string(content: &str) -> Vec<Endpoint> {
        content.lines().filter_map(Self::parse_line).collect()
    }

    /// Parse endpoints from a file
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<Endpoint>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Self::parse_string(&content))
    }
}
