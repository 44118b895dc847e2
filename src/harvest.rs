//! Full pipeline: crawl listings, save candidates, verify, save accepted

use crate::proxy::{
    accepted_endpoints, save_endpoints, Endpoint, ProxyChecker, ProxyCrawler,
    VerificationOutcome,
};
use crate::{Config, Result};
use log::{info, warn};

/// Everything a harvest run produced
#[derive(Debug, Clone, Default)]
pub struct HarvestSummary {
    /// Candidates in extraction order
    pub candidates: Vec<Endpoint>,
    /// One outcome per candidate, in completion order
    pub outcomes: Vec<VerificationOutcome>,
}

impl HarvestSummary {
    /// Accepted endpoints in completion order
    pub fn accepted(&self) -> Vec<Endpoint> {
        accepted_endpoints(&self.outcomes)
    }

    pub fn rejected_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.accepted()).count()
    }
}

/// Crawl every source, verify the candidates and persist both lists.
///
/// Sources that fail to load are logged and skipped. When no candidate is
/// found nothing is written.
pub async fn harvest(
    config: &Config,
    crawler: &ProxyCrawler,
    checker: &ProxyChecker,
) -> Result<HarvestSummary> {
    let mut candidates = Vec::new();
    for result in crawler.crawl_urls_with_results(&config.source_urls).await {
        if result.is_success() {
            info!("found {} SOCKS4 proxies on {}", result.endpoints.len(), result.source);
            candidates.extend(result.endpoints);
        } else if let Some(error) = &result.error {
            warn!("error crawling {}: {}", result.source, error);
        }
    }

    if candidates.is_empty() {
        return Ok(HarvestSummary::default());
    }

    save_endpoints(&candidates, &config.candidates_path)?;

    let outcomes = checker.check_endpoints(candidates.clone()).await;
    let summary = HarvestSummary {
        candidates,
        outcomes,
    };

    save_endpoints(&summary.accepted(), &config.accepted_path)?;

    Ok(summary)
}
