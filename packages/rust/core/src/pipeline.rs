//! End-to-end analysis: fund URL → fetch → discover → extract → enrich → aggregate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, instrument, warn};
use url::Url;

use portfolioscout_extractor::{Extractor, dedupe_candidates};
use portfolioscout_fetcher::{PageFetcher, discover_portfolio_pages};
use portfolioscout_resolver::Resolver;
use portfolioscout_shared::{
    AnalysisConfig, AnalysisError, CompanyRecord, ExtractionError, FetchResult, PortfolioCandidate,
    RunId, ScoutError,
};

use crate::aggregator::aggregate;
use crate::summary::{PortfolioSummary, summarize};

/// Everything one analysis run produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub run_id: RunId,
    pub fund_url: String,
    /// Pages candidates were extracted from, in order.
    pub pages_analyzed: Vec<String>,
    pub records: Vec<CompanyRecord>,
    pub summary: PortfolioSummary,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each page is fetched.
    fn page_fetched(&self, url: &str, current: usize, total: usize);
    /// Called once extraction has settled on the candidate list.
    fn candidates_found(&self, count: usize);
    /// Called when the pipeline completes.
    fn done(&self, report: &AnalysisReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_fetched(&self, _url: &str, _current: usize, _total: usize) {}
    fn candidates_found(&self, _count: usize) {}
    fn done(&self, _report: &AnalysisReport) {}
}

/// Owns the pipeline stages for one configuration.
pub struct Analyzer {
    config: AnalysisConfig,
    fetcher: PageFetcher,
    extractor: Extractor,
    resolver: Arc<Resolver>,
}

impl Analyzer {
    /// Build every stage from `config`. Launches Chromium when configured.
    pub async fn new(config: AnalysisConfig) -> Result<Self, ScoutError> {
        let fetcher = PageFetcher::new(config.fetch.clone(), config.allow_private_hosts).await?;
        let extractor = Extractor::new(config.extract.clone());
        let resolver = Resolver::new(config.resolve.clone(), &config.fetch.user_agent)?
            .allow_private_hosts(config.allow_private_hosts);
        Ok(Self::from_parts(config, fetcher, extractor, resolver))
    }

    /// Assemble an analyzer from prebuilt stages.
    pub fn from_parts(config: AnalysisConfig, fetcher: PageFetcher, extractor: Extractor, resolver: Resolver) -> Self {
        Self {
            config,
            fetcher,
            extractor,
            resolver: Arc::new(resolver),
        }
    }

    pub fn renderer_name(&self) -> &str {
        self.fetcher.renderer_name()
    }

    /// Run the full analysis for `fund_url`.
    ///
    /// 1. Fetch the landing page (failure aborts)
    /// 2. Discover and fetch linked portfolio pages
    /// 3. Extract and deduplicate candidates
    /// 4. Enrich every candidate concurrently
    /// 5. Aggregate and summarize
    #[instrument(skip_all, fields(url = %fund_url))]
    pub async fn run(&self, fund_url: &Url, progress: &dyn ProgressReporter) -> Result<AnalysisReport, AnalysisError> {
        let start = Instant::now();
        let run_id = RunId::new();
        info!(%run_id, renderer = self.fetcher.renderer_name(), "starting analysis");

        // --- Phase 1: Landing page ---
        progress.phase("Fetching fund website");
        let landing = self.fetcher.fetch(fund_url).await?;
        progress.page_fetched(&landing.final_url, 1, 1);

        // --- Phase 2: Portfolio pages ---
        progress.phase("Looking for portfolio pages");
        let pages = self.portfolio_pages(fund_url, landing, progress).await;

        // --- Phase 3: Extraction ---
        progress.phase("Extracting portfolio companies");
        let mut candidates: Vec<PortfolioCandidate> = Vec::new();
        for page in &pages {
            candidates.extend(self.extractor.extract(page).await);
        }
        let candidates = dedupe_candidates(candidates);
        progress.candidates_found(candidates.len());
        info!(candidates = candidates.len(), pages = pages.len(), "extraction phase complete");

        if candidates.is_empty() {
            return Err(ExtractionError::NoCandidatesFound.into());
        }

        // --- Phase 4: Enrichment ---
        progress.phase(&format!("Enriching {} companies", candidates.len()));
        let names: Vec<String> = candidates.iter().map(|c| c.raw_text().to_string()).collect();
        let enrichments = self.resolver.resolve_all(&names).await;

        // --- Phase 5: Aggregate ---
        let records = aggregate(&candidates, &enrichments);
        let summary = summarize(&records);

        let report = AnalysisReport {
            run_id,
            fund_url: fund_url.to_string(),
            pages_analyzed: pages.iter().map(|p| p.final_url.clone()).collect(),
            records,
            summary,
            elapsed: start.elapsed(),
        };

        info!(
            run_id = %report.run_id,
            companies = report.records.len(),
            matched = report.summary.matched,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "analysis complete"
        );
        progress.done(&report);
        Ok(report)
    }

    /// Linked portfolio pages that fetched cleanly, or the landing page.
    async fn portfolio_pages(&self, fund_url: &Url, landing: FetchResult, progress: &dyn ProgressReporter) -> Vec<FetchResult> {
        let base = Url::parse(&landing.final_url).unwrap_or_else(|_| fund_url.clone());
        let discovered = discover_portfolio_pages(&landing.html, &base, self.config.fetch.max_portfolio_pages);
        if discovered.is_empty() {
            info!("no portfolio links found, using the landing page");
            return vec![landing];
        }

        let total = discovered.len();
        let mut pages = Vec::with_capacity(total);
        for (i, url) in discovered.iter().enumerate() {
            match self.fetcher.fetch(url).await {
                Ok(page) => {
                    progress.page_fetched(url.as_str(), i + 1, total);
                    pages.push(page);
                }
                Err(e) => warn!(%url, error = %e, "portfolio page failed, skipping"),
            }
        }

        if pages.is_empty() {
            warn!("every portfolio page failed, falling back to the landing page");
            return vec![landing];
        }
        pages
    }
}

/// Analyze `fund_url` with `config` and return the final records.
pub async fn analyze(fund_url: &Url, config: &AnalysisConfig) -> Result<Vec<CompanyRecord>, AnalysisError> {
    let analyzer = Analyzer::new(config.clone()).await?;
    let report = analyzer.run(fund_url, &SilentProgress).await?;
    Ok(report.records)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use portfolioscout_fetcher::{HttpRenderer, build_client};
    use portfolioscout_resolver::{SearchHit, SearchProvider};
    use portfolioscout_shared::{
        EnrichmentError, ExtractConfig, FetchConfig, FetchError, FundingStage, RendererKind,
        ResolveConfig,
    };
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures/html")
            .join(name);
        std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read fixture {name}: {e}"))
    }

    fn test_config() -> AnalysisConfig {
        AnalysisConfig {
            fetch: FetchConfig {
                renderer: RendererKind::Http,
                timeout_secs: 5,
                ..FetchConfig::default()
            },
            extract: ExtractConfig {
                ocr_enabled: false,
                ..ExtractConfig::default()
            },
            resolve: ResolveConfig {
                delay_ms: 0,
                timeout_secs: 5,
                ..ResolveConfig::default()
            },
            allow_private_hosts: true,
        }
    }

    /// Points "Acme" and "Beta Corp" at profile pages on the mock server.
    struct MockSearch {
        base: String,
    }

    #[async_trait]
    impl SearchProvider for MockSearch {
        async fn search(&self, query: &str, _limit: usize) -> Result<Vec<SearchHit>, EnrichmentError> {
            let hit = |title: &str, slug: &str| SearchHit {
                title: title.to_string(),
                url: format!("{}/organization/{slug}", self.base),
                snippet: String::new(),
            };
            if query.contains("\"Acme\"") {
                Ok(vec![hit("Acme - Crunchbase Company Profile", "acme")])
            } else if query.contains("\"Beta Corp\"") {
                Ok(vec![hit("Beta Corp - Crunchbase Company Profile", "beta-corp")])
            } else {
                Ok(Vec::new())
            }
        }

        fn name(&self) -> &'static str {
            "mock"
        }
    }

    fn analyzer(server: &MockServer) -> Analyzer {
        let config = test_config();
        let client = build_client(&config.fetch).unwrap();
        let fetcher = PageFetcher::with_renderer(
            config.fetch.clone(),
            client.clone(),
            Box::new(HttpRenderer::new(client.clone())),
            true,
        );
        let extractor = Extractor::new(config.extract.clone());
        let resolver = Resolver::with_provider(
            config.resolve.clone(),
            client,
            Arc::new(MockSearch { base: server.uri() }),
        )
        .allow_private_hosts(true);
        Analyzer::from_parts(config, fetcher, extractor, resolver)
    }

    async fn mount_html(server: &MockServer, at: &str, status: u16, body: String) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn full_run_discovers_extracts_and_enriches() {
        let server = MockServer::start().await;
        mount_html(&server, "/", 200, load_fixture("fund_home.html")).await;
        mount_html(&server, "/portfolio", 200, load_fixture("portfolio_container.html")).await;
        mount_html(&server, "/organization/acme", 200, load_fixture("company_profile.html")).await;
        mount_html(&server, "/organization/beta-corp", 404, String::new()).await;

        let url = Url::parse(&server.uri()).unwrap();
        let report = analyzer(&server).run(&url, &SilentProgress).await.unwrap();

        assert_eq!(report.pages_analyzed, vec![format!("{}/portfolio", server.uri())]);

        let names: Vec<_> = report.records.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Beta Corp", "Gamma", "Delta"]);

        let acme = &report.records[0];
        assert!(acme.matched);
        assert_eq!(acme.category.as_deref(), Some("Fintech"));
        assert_eq!(acme.funding_stage, Some(FundingStage::SeriesD));
        assert!(report.records[1..].iter().all(|r| !r.matched));

        assert_eq!(report.summary.total, 4);
        assert_eq!(report.summary.matched, 1);
    }

    #[tokio::test]
    async fn landing_page_is_used_without_portfolio_links() {
        let server = MockServer::start().await;
        mount_html(&server, "/", 200, load_fixture("card_grid.html")).await;

        let url = Url::parse(&server.uri()).unwrap();
        let report = analyzer(&server).run(&url, &SilentProgress).await.unwrap();

        assert_eq!(report.pages_analyzed.len(), 1);
        assert_eq!(report.records.len(), 5);
        assert!(report.records.iter().all(|r| !r.matched));
    }

    #[tokio::test]
    async fn failed_portfolio_page_falls_back_to_landing() {
        let server = MockServer::start().await;
        mount_html(&server, "/", 200, load_fixture("fund_home.html")).await;
        mount_html(&server, "/portfolio", 404, String::new()).await;

        let url = Url::parse(&server.uri()).unwrap();
        let err = analyzer(&server).run(&url, &SilentProgress).await.unwrap_err();

        // The landing page itself lists no companies.
        assert!(err.is_empty_result());
    }

    #[tokio::test]
    async fn blocked_landing_page_aborts() {
        let server = MockServer::start().await;
        mount_html(&server, "/", 403, String::new()).await;

        let url = Url::parse(&server.uri()).unwrap();
        let err = analyzer(&server).run(&url, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Fetch(FetchError::Blocked { .. })));
    }

    #[tokio::test]
    async fn runs_are_idempotent() {
        let server = MockServer::start().await;
        mount_html(&server, "/", 200, load_fixture("portfolio_container.html")).await;

        let url = Url::parse(&server.uri()).unwrap();
        let analyzer = analyzer(&server);
        let first = analyzer.run(&url, &SilentProgress).await.unwrap();
        let second = analyzer.run(&url, &SilentProgress).await.unwrap();
        assert_eq!(first.records, second.records);
        assert_ne!(first.run_id, second.run_id);
    }

    #[tokio::test]
    async fn analyze_entry_point_with_search_endpoint() {
        let server = MockServer::start().await;
        mount_html(&server, "/", 200, load_fixture("portfolio_container.html")).await;
        Mock::given(method("POST"))
            .and(path("/html/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
            .mount(&server)
            .await;

        let mut config = test_config();
        config.resolve.search_url = format!("{}/html/", server.uri());

        let url = Url::parse(&server.uri()).unwrap();
        let records = analyze(&url, &config).await.unwrap();
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| !r.matched && r.extraction_confidence > 0.0));
    }
}
