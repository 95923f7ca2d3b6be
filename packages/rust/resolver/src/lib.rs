//! Enrichment of candidate company names.
//!
//! This crate provides:
//! - [`search`]: the [`SearchProvider`] trait and the DuckDuckGo HTML backend
//! - [`selection`]: scoring search hits against the company name
//! - [`facts`]: keyword-driven parsing of profile pages into [`CompanyFacts`](portfolioscout_shared::CompanyFacts)
//! - [`RateLimiter`]: the shared concurrency cap and request pacer
//! - [`Resolver`]: runs lookups concurrently and never fails a candidate loudly

pub mod facts;
pub mod limiter;
pub mod search;
pub mod selection;

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

use portfolioscout_fetcher::is_ssrf_target;
use portfolioscout_shared::{EnrichmentError, EnrichmentResult, ResolveConfig, ScoutError};

pub use facts::parse_facts;
pub use limiter::RateLimiter;
pub use search::{DuckDuckGoProvider, SearchHit, SearchProvider};
pub use selection::{build_query, score_hit, select_hit};

/// Resolves candidate names to enrichment results.
pub struct Resolver {
    config: ResolveConfig,
    client: Client,
    provider: Arc<dyn SearchProvider>,
    limiter: RateLimiter,
    candidate_timeout: Duration,
    allow_private_hosts: bool,
}

impl Resolver {
    /// Resolver backed by DuckDuckGo at `config.search_url`.
    pub fn new(config: ResolveConfig, user_agent: &str) -> Result<Self, ScoutError> {
        let client = build_client(&config, user_agent)?;
        let endpoint = Url::parse(&config.search_url)
            .map_err(|e| ScoutError::config(format!("invalid search_url {}: {e}", config.search_url)))?;
        let provider = Arc::new(DuckDuckGoProvider::new(client.clone(), endpoint));
        Ok(Self::with_provider(config, client, provider))
    }

    /// Resolver with a caller-supplied search backend.
    pub fn with_provider(config: ResolveConfig, client: Client, provider: Arc<dyn SearchProvider>) -> Self {
        let limiter = RateLimiter::new(config.workers, Duration::from_millis(config.delay_ms));
        // search + profile fetch
        let candidate_timeout = Duration::from_secs(config.timeout_secs.max(1) * 2);
        Self {
            config,
            client,
            provider,
            limiter,
            candidate_timeout,
            allow_private_hosts: false,
        }
    }

    /// Override the per-candidate time budget.
    pub fn with_candidate_timeout(mut self, timeout: Duration) -> Self {
        self.candidate_timeout = timeout;
        self
    }

    /// Permit profile fetches from loopback and private addresses (tests only).
    pub fn allow_private_hosts(mut self, allow: bool) -> Self {
        self.allow_private_hosts = allow;
        self
    }

    /// Resolve one name. Failures of any kind yield `matched = false`.
    #[instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn resolve(&self, name: &str) -> EnrichmentResult {
        let _permit = self.limiter.acquire().await;
        let secs = self.candidate_timeout.as_secs();

        let outcome = tokio::time::timeout(self.candidate_timeout, self.try_resolve(name))
            .await
            .unwrap_or(Err(EnrichmentError::Timeout(secs)));

        match outcome {
            Ok(result) => {
                debug!(source = ?result.source_url, "enriched");
                result
            }
            Err(EnrichmentError::NoMatch(reason)) => {
                debug!(%reason, "no matching search result");
                EnrichmentResult::unmatched(name)
            }
            Err(e) => {
                warn!(error = %e, "enrichment failed");
                EnrichmentResult::unmatched(name)
            }
        }
    }

    /// Resolve every name concurrently, bounded by the shared limiter.
    ///
    /// Results come back in input order, one per name.
    #[instrument(skip_all, fields(names = names.len()))]
    pub async fn resolve_all(self: &Arc<Self>, names: &[String]) -> Vec<EnrichmentResult> {
        let started = Instant::now();
        let handles: Vec<_> = names
            .iter()
            .map(|name| {
                let resolver = Arc::clone(self);
                let name = name.clone();
                tokio::spawn(async move { resolver.resolve(&name).await })
            })
            .collect();

        let mut results = Vec::with_capacity(names.len());
        for (name, handle) in names.iter().zip(handles) {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(name = %name, error = %e, "enrichment task failed");
                    results.push(EnrichmentResult::unmatched(name.as_str()));
                }
            }
        }

        info!(
            total = results.len(),
            matched = results.iter().filter(|r| r.matched).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "enrichment complete"
        );
        results
    }

    async fn try_resolve(&self, name: &str) -> Result<EnrichmentResult, EnrichmentError> {
        let query = build_query(&self.config.query_template, name);
        let hits = self.provider.search(&query, self.config.search_results).await?;

        let hit = select_hit(&hits, name, &self.config.preferred_domains)
            .ok_or_else(|| EnrichmentError::NoMatch(format!("{} hits, none plausible", hits.len())))?;
        debug!(url = %hit.url, title = %hit.title, "selected search hit");

        let target = Url::parse(&hit.url).map_err(|e| EnrichmentError::Fetch(format!("{}: {e}", hit.url)))?;
        if !self.allow_private_hosts && is_ssrf_target(&target) {
            return Err(EnrichmentError::Fetch(format!("{}: refusing private or non-HTTP target", hit.url)));
        }

        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| EnrichmentError::Fetch(format!("{}: {e}", hit.url)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::Fetch(format!("{}: HTTP {status}", hit.url)));
        }
        let html = response
            .text()
            .await
            .map_err(|e| EnrichmentError::Fetch(format!("{}: {e}", hit.url)))?;

        Ok(EnrichmentResult::matched(name, hit.url.clone(), parse_facts(&html)))
    }
}

/// HTTP client for search and profile requests.
pub fn build_client(config: &ResolveConfig, user_agent: &str) -> Result<Client, ScoutError> {
    Client::builder()
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| ScoutError::Network(format!("failed to build HTTP client: {e}")))
}
