//! Proxy checker module for verifying SOCKS4 endpoints
//!
//! Every endpoint is probed by tunnelling an HTTP GET to an IP echo service
//! and comparing the echoed origin with the endpoint's own address. Probes
//! run concurrently, at most `concurrency` at a time, each under its own
//! deadline.

use crate::error::ConfigError;
use crate::proxy::models::{Endpoint, Reason, VerificationOutcome};
use crate::proxy::probe::{self, Rejection, TestTarget};
use futures::stream::{self, StreamExt};
use log::{info, warn};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Default timeout for proxy checks in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of concurrent checks
pub const DEFAULT_CONCURRENCY: usize = 100;

/// Default URL to test proxies against
pub const DEFAULT_TEST_URL: &str = "http://httpbin.org/ip";

/// Outcomes buffered between the scheduler and its reader
const OUTCOME_CHANNEL_CAPACITY: usize = 128;

/// Configuration for proxy checker
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Deadline for each verification attempt
    pub timeout: Duration,
    /// Maximum number of attempts in flight
    pub concurrency: usize,
    /// Echo service that reports the caller's IP as `{"origin": ...}`
    pub test_url: String,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            test_url: DEFAULT_TEST_URL.to_string(),
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_test_url(mut self, url: impl Into<String>) -> Self {
        self.test_url = url.into();
        self
    }

    /// Reject settings under which a run could never make progress
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Proxy checker for verifying endpoints
#[derive(Debug, Clone)]
pub struct ProxyChecker {
    config: CheckerConfig,
    target: TestTarget,
}

impl ProxyChecker {
    /// Create a checker with default configuration
    pub async fn new() -> Result<Self, ConfigError> {
        Self::with_config(CheckerConfig::default()).await
    }

    /// Create a checker with custom configuration.
    ///
    /// Validates the configuration and resolves the test service up front,
    /// so a bad setup fails before any endpoint is dispatched.
    pub async fn with_config(config: CheckerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let target = TestTarget::resolve(&config.test_url).await?;
        Ok(Self { config, target })
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    pub fn target(&self) -> &TestTarget {
        &self.target
    }

    /// Verify a single endpoint. Every failure is folded into the outcome.
    pub async fn check_endpoint(&self, endpoint: &Endpoint) -> VerificationOutcome {
        let start = Instant::now();

        let outcome = match tokio::time::timeout(self.config.timeout, self.probe(endpoint)).await {
            Ok(Ok(())) => {
                let elapsed = start.elapsed().as_millis() as u64;
                VerificationOutcome::success(endpoint.clone(), elapsed)
            }
            Ok(Err(rejection)) => {
                VerificationOutcome::rejected(endpoint.clone(), rejection.reason, rejection.detail)
            }
            Err(_) => VerificationOutcome::timeout(endpoint.clone()),
        };

        info!("{}", outcome);
        outcome
    }

    async fn probe(&self, endpoint: &Endpoint) -> Result<(), Rejection> {
        let origin = probe::fetch_origin(endpoint, &self.target).await?;
        if probe::origin_matches(&origin, &endpoint.address) {
            Ok(())
        } else {
            Err(Rejection::new(
                Reason::UnexpectedResponse,
                format!("echoed origin {} does not match proxy address", origin),
            ))
        }
    }

    /// Check endpoints concurrently, yielding outcomes as they complete.
    ///
    /// At most `concurrency` attempts are in flight; a finished attempt frees
    /// its slot for the next pending endpoint. Each attempt runs in its own
    /// task so that a panic is reported as `OtherError` for that endpoint
    /// only. The channel closes once every endpoint has produced exactly one
    /// outcome.
    pub fn check_endpoints_stream(
        &self,
        endpoints: Vec<Endpoint>,
    ) -> mpsc::Receiver<VerificationOutcome> {
        let capacity = self
            .config
            .concurrency
            .min(endpoints.len())
            .clamp(1, OUTCOME_CHANNEL_CAPACITY);
        let (tx, rx) = mpsc::channel(capacity);
        let checker = self.clone();

        tokio::spawn(async move {
            let concurrency = checker.config.concurrency.max(1);
            let mut outcomes = stream::iter(endpoints)
                .map(|endpoint| {
                    let checker = checker.clone();
                    let attempt_endpoint = endpoint.clone();
                    run_isolated(endpoint, async move {
                        checker.check_endpoint(&attempt_endpoint).await
                    })
                })
                .buffer_unordered(concurrency);

            while let Some(outcome) = outcomes.next().await {
                if tx.send(outcome).await.is_err() {
                    break;
                }
            }
        });

        rx
    }

    /// Check endpoints and wait for every outcome, in completion order
    pub async fn check_endpoints(&self, endpoints: Vec<Endpoint>) -> Vec<VerificationOutcome> {
        let mut results = Vec::with_capacity(endpoints.len());
        let mut rx = self.check_endpoints_stream(endpoints);
        while let Some(outcome) = rx.recv().await {
            results.push(outcome);
        }
        results
    }

    /// Check endpoints and separate into accepted and rejected outcomes
    pub async fn check_and_separate(
        &self,
        endpoints: Vec<Endpoint>,
    ) -> (Vec<VerificationOutcome>, Vec<VerificationOutcome>) {
        let results = self.check_endpoints(endpoints).await;

        let (good, bad): (Vec<_>, Vec<_>) = results.into_iter().partition(|r| r.accepted());

        (good, bad)
    }
}

/// Run one attempt in its own task; a panic becomes `OtherError` for
/// `endpoint` instead of tearing down the batch.
async fn run_isolated<F>(endpoint: Endpoint, attempt: F) -> VerificationOutcome
where
    F: Future<Output = VerificationOutcome> + Send + 'static,
{
    match tokio::spawn(attempt).await {
        Ok(outcome) => outcome,
        Err(e) => {
            let outcome = VerificationOutcome::rejected(
                endpoint,
                Reason::OtherError,
                format!("verification task failed: {}", e),
            );
            warn!("{}", outcome);
            outcome
        }
    }
}

/// Endpoints of accepted outcomes, keeping completion order
pub fn accepted_endpoints(outcomes: &[VerificationOutcome]) -> Vec<Endpoint> {
    outcomes
        .iter()
        .filter(|o| o.accepted())
        .map(|o| o.endpoint.clone())
        .collect()
}
