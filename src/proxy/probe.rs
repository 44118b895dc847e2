//! SOCKS4 tunnel and HTTP exchange used to probe a single endpoint

use crate::error::ConfigError;
use crate::proxy::models::{Endpoint, Reason};
use bytes::Bytes;
use http_body_util::{BodyExt, Empty, LengthLimitError, Limited};
use hyper::client::conn::http1::Builder;
use hyper::header::{CONNECTION, HOST, USER_AGENT};
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use log::debug;
use serde::Deserialize;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::net::{SocketAddr, SocketAddrV4};
use tokio_socks::tcp::Socks4Stream;
use url::{Host, Url};

/// Largest response body accepted from the test service
const MAX_BODY_BYTES: usize = 64 * 1024;

const PROBE_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// The echo service every endpoint is probed against, resolved once per run.
///
/// SOCKS4 only carries IPv4 destinations, so the host is resolved locally
/// and the first IPv4 address is kept.
#[derive(Debug, Clone)]
pub struct TestTarget {
    url: String,
    addr: SocketAddrV4,
    authority: String,
    path: String,
}

impl TestTarget {
    pub async fn resolve(url: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(url).map_err(|e| ConfigError::InvalidTestUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if parsed.scheme() != "http" {
            return Err(ConfigError::UnsupportedScheme(parsed.scheme().to_string()));
        }

        let host = parsed.host().ok_or_else(|| ConfigError::InvalidTestUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        })?;
        let port = parsed.port_or_known_default().unwrap_or(80);

        let addr = match &host {
            Host::Ipv4(ip) => SocketAddrV4::new(*ip, port),
            Host::Ipv6(_) => return Err(ConfigError::NoIpv4Address(host.to_string())),
            Host::Domain(domain) => tokio::net::lookup_host((*domain, port))
                .await
                .map_err(|source| ConfigError::Resolve {
                    host: domain.to_string(),
                    source,
                })?
                .find_map(|addr| match addr {
                    SocketAddr::V4(v4) => Some(v4),
                    SocketAddr::V6(_) => None,
                })
                .ok_or_else(|| ConfigError::NoIpv4Address(domain.to_string()))?,
        };

        let authority = match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let path = match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        };

        Ok(Self {
            url: url.to_string(),
            addr,
            authority,
            path,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn addr(&self) -> SocketAddrV4 {
        self.addr
    }
}

/// A failed probe, classified. Never leaves the checker.
#[derive(Debug)]
pub(crate) struct Rejection {
    pub reason: Reason,
    pub detail: String,
}

impl Rejection {
    pub fn new(reason: Reason, detail: impl fmt::Display) -> Self {
        Self {
            reason,
            detail: detail.to_string(),
        }
    }
}

impl From<tokio_socks::Error> for Rejection {
    fn from(err: tokio_socks::Error) -> Self {
        let reason = match &err {
            tokio_socks::Error::Io(_) | tokio_socks::Error::ProxyServerUnreachable => {
                Reason::ConnectionError
            }
            _ => Reason::ProtocolError,
        };
        Self::new(reason, err)
    }
}

impl From<hyper::Error> for Rejection {
    fn from(err: hyper::Error) -> Self {
        let io_failure = err
            .source()
            .is_some_and(|source| source.downcast_ref::<io::Error>().is_some());

        let reason = if err.is_parse() || err.is_parse_status() {
            Reason::UnexpectedResponse
        } else if err.is_timeout() {
            Reason::Timeout
        } else if io_failure || err.is_closed() || err.is_incomplete_message() || err.is_canceled()
        {
            Reason::ConnectionError
        } else {
            Reason::OtherError
        };
        Self::new(reason, err)
    }
}

fn body_rejection(err: Box<dyn StdError + Send + Sync>) -> Rejection {
    if err.downcast_ref::<LengthLimitError>().is_some() {
        return Rejection::new(
            Reason::UnexpectedResponse,
            format!("response body exceeds {} bytes", MAX_BODY_BYTES),
        );
    }
    match err.downcast::<hyper::Error>() {
        Ok(hyper_err) => Rejection::from(*hyper_err),
        Err(other) => Rejection::new(Reason::OtherError, other),
    }
}

#[derive(Deserialize)]
struct OriginEcho {
    origin: String,
}

/// Tunnels a GET through `endpoint` to the test service and returns the
/// origin address the service observed.
pub(crate) async fn fetch_origin(
    endpoint: &Endpoint,
    target: &TestTarget,
) -> Result<String, Rejection> {
    let stream = Socks4Stream::connect(
        (endpoint.address.as_str(), endpoint.port),
        SocketAddr::V4(target.addr),
    )
    .await?;

    let (mut sender, conn) = Builder::new().handshake(TokioIo::new(stream)).await?;

    let peer = endpoint.to_simple_string();
    tokio::spawn(async move {
        if let Err(err) = conn.await {
            debug!("connection through {} ended: {}", peer, err);
        }
    });

    let request = Request::builder()
        .uri(target.path.as_str())
        .header(HOST, target.authority.as_str())
        .header(USER_AGENT, PROBE_USER_AGENT)
        .header(CONNECTION, "close")
        .body(Empty::<Bytes>::new())
        .map_err(|e| Rejection::new(Reason::OtherError, e))?;

    let response = sender.send_request(request).await?;
    let status = response.status();
    if status != StatusCode::OK {
        return Err(Rejection::new(
            Reason::UnexpectedResponse,
            format!("HTTP status: {}", status),
        ));
    }

    let body = Limited::new(response.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(body_rejection)?
        .to_bytes();
    drop(sender);

    let echo: OriginEcho = serde_json::from_slice(&body).map_err(|e| {
        Rejection::new(Reason::UnexpectedResponse, format!("malformed body: {}", e))
    })?;
    Ok(echo.origin)
}

/// Exact match of `address` against the echoed origin.
///
/// Some echo services report a forwarding chain as `"a, b"`; each entry is
/// compared on its own, never by substring.
pub fn origin_matches(origin: &str, address: &str) -> bool {
    let address = address.trim();
    !address.is_empty() && origin.split(',').map(str::trim).any(|ip| ip == address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_exact_match() {
        assert!(origin_matches("10.0.0.1", "10.0.0.1"));
        assert!(origin_matches(" 10.0.0.1 ", "10.0.0.1"));
    }

    #[test]
    fn test_origin_rejects_substring() {
        assert!(!origin_matches("110.0.0.15", "10.0.0.1"));
        assert!(!origin_matches("10.0.0.12", "10.0.0.1"));
        assert!(!origin_matches("", "10.0.0.1"));
        assert!(!origin_matches("10.0.0.1", ""));
    }

    #[test]
    fn test_origin_forwarding_chain() {
        assert!(origin_matches("203.0.113.7, 10.0.0.1", "10.0.0.1"));
        assert!(!origin_matches("203.0.113.7, 10.0.0.12", "10.0.0.1"));
    }

    #[tokio::test]
    async fn test_target_resolve_ip_literal() {
        let target = TestTarget::resolve("http://127.0.0.1:8080/ip?format=json")
            .await
            .unwrap();
        assert_eq!(target.addr(), "127.0.0.1:8080".parse().unwrap());
        assert_eq!(target.authority, "127.0.0.1:8080");
        assert_eq!(target.path, "/ip?format=json");
        assert_eq!(target.url(), "http://127.0.0.1:8080/ip?format=json");
    }

    #[tokio::test]
    async fn test_target_default_port() {
        let target = TestTarget::resolve("http://127.0.0.1/ip").await.unwrap();
        assert_eq!(target.addr().port(), 80);
        assert_eq!(target.authority, "127.0.0.1");
    }

    #[tokio::test]
    async fn test_target_rejects_https() {
        let err = TestTarget::resolve("https://127.0.0.1/ip").await.unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme(ref s) if s == "https"));
    }

    #[tokio::test]
    async fn test_target_rejects_garbage() {
        let err = TestTarget::resolve("not a url").await.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTestUrl { .. }));
    }

    #[tokio::test]
    async fn test_target_rejects_ipv6_only() {
        let err = TestTarget::resolve("http://[::1]:8080/ip").await.unwrap_err();
        assert!(matches!(err, ConfigError::NoIpv4Address(_)));
    }
}
