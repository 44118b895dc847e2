//! Configuration errors detected before any proxy is dispatched

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("concurrency limit must be at least 1")]
    ZeroConcurrency,
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
    #[error("invalid test URL {url}: {reason}")]
    InvalidTestUrl { url: String, reason: String },
    #[error("unsupported test URL scheme {0}, only http is supported")]
    UnsupportedScheme(String),
    #[error("failed to resolve test host {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("test host {0} has no IPv4 address")]
    NoIpv4Address(String),
}
