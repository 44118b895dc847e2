//! Proxy data models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Proxy protocol. Only SOCKS4 is verified by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Protocol {
    #[default]
    Socks4,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Socks4 => write!(f, "socks4"),
        }
    }
}

impl FromStr for Protocol {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "socks4" => Ok(Protocol::Socks4),
            other => Err(anyhow::anyhow!("unsupported protocol: {}", other)),
        }
    }
}

/// A candidate proxy endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub address: String,
    pub port: u16,
    pub protocol: Protocol,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, port: u16, protocol: Protocol) -> Self {
        Self {
            address: address.into(),
            port,
            protocol,
        }
    }

    /// Shorthand for a SOCKS4 endpoint
    pub fn socks4(address: impl Into<String>, port: u16) -> Self {
        Self::new(address, port, Protocol::Socks4)
    }

    /// Get the proxy URL string, e.g. `socks4://10.0.0.1:1080`
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.address, self.port)
    }

    /// Get the endpoint in ADDRESS:PORT format
    pub fn to_simple_string(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}

/// Why a verification attempt ended the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reason {
    Success,
    /// Tunnel could not be established or the connection dropped
    ConnectionError,
    /// Per-attempt deadline exceeded
    Timeout,
    /// SOCKS negotiation rejected or malformed
    ProtocolError,
    /// Non-200 status, unreadable body or a foreign origin IP
    UnexpectedResponse,
    OtherError,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reason::Success => "success",
            Reason::ConnectionError => "connection error",
            Reason::Timeout => "timeout",
            Reason::ProtocolError => "protocol error",
            Reason::UnexpectedResponse => "unexpected response",
            Reason::OtherError => "error",
        };
        f.write_str(s)
    }
}

/// Result of verifying a single endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub endpoint: Endpoint,
    pub reason: Reason,
    pub detail: Option<String>,
    pub response_time_ms: Option<u64>,
}

impl VerificationOutcome {
    pub fn success(endpoint: Endpoint, response_time_ms: u64) -> Self {
        Self {
            endpoint,
            reason: Reason::Success,
            detail: None,
            response_time_ms: Some(response_time_ms),
        }
    }

    /// A rejected outcome. `reason` must not be `Success`.
    pub fn rejected(endpoint: Endpoint, reason: Reason, detail: impl Into<String>) -> Self {
        debug_assert_ne!(reason, Reason::Success);
        Self {
            endpoint,
            reason,
            detail: Some(detail.into()),
            response_time_ms: None,
        }
    }

    pub fn timeout(endpoint: Endpoint) -> Self {
        Self::rejected(endpoint, Reason::Timeout, "connection timeout")
    }

    pub fn accepted(&self) -> bool {
        self.reason == Reason::Success
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.reason, &self.detail, self.response_time_ms) {
            (Reason::Success, _, Some(ms)) => write!(f, "Valid proxy: {} ({}ms)", self.endpoint, ms),
            (Reason::Success, _, None) => write!(f, "Valid proxy: {}", self.endpoint),
            (reason, Some(detail), _) => {
                write!(f, "Invalid proxy: {} | {}: {}", self.endpoint, reason, detail)
            }
            (reason, None, _) => write!(f, "Invalid proxy: {} | {}", self.endpoint, reason),
        }
    }
}
