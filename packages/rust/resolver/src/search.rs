//! Web search providers.
//!
//! The resolver only needs a handful of hits per company, so any backend that
//! can return `(title, url, snippet)` triples fits behind [`SearchProvider`].

use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use portfolioscout_shared::EnrichmentError;

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// A web search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run `query` and return at most `limit` hits in ranking order.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, EnrichmentError>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// DuckDuckGo
// ---------------------------------------------------------------------------

static RESULT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".result").expect("static selector"));
static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.result__a").expect("static selector"));
static SNIPPET_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".result__snippet").expect("static selector"));

/// DuckDuckGo's HTML endpoint. No API key required.
pub struct DuckDuckGoProvider {
    client: Client,
    endpoint: Url,
}

impl DuckDuckGoProvider {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, EnrichmentError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .form(&[("q", query)])
            .send()
            .await
            .map_err(|e| EnrichmentError::Search(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::Search(format!("search returned HTTP {status}")));
        }

        let html = response
            .text()
            .await
            .map_err(|e| EnrichmentError::Search(e.to_string()))?;

        let hits = parse_results(&html, &self.endpoint, limit);
        debug!(query, hits = hits.len(), "search complete");
        Ok(hits)
    }

    fn name(&self) -> &'static str {
        "duckduckgo"
    }
}

/// Parse a DuckDuckGo HTML results page.
pub fn parse_results(html: &str, endpoint: &Url, limit: usize) -> Vec<SearchHit> {
    let doc = Html::parse_document(html);
    let mut hits = Vec::new();

    for result in doc.select(&RESULT_SEL) {
        if hits.len() >= limit {
            break;
        }
        if result.value().classes().any(|c| c == "result--ad") {
            continue;
        }
        let Some(anchor) = result.select(&TITLE_SEL).next() else {
            continue;
        };
        let Some(url) = anchor
            .value()
            .attr("href")
            .and_then(|href| unwrap_redirect(href, endpoint))
        else {
            continue;
        };

        let title = collapse(anchor.text());
        let snippet = result
            .select(&SNIPPET_SEL)
            .next()
            .map(|s| collapse(s.text()))
            .unwrap_or_default();

        if !title.is_empty() {
            hits.push(SearchHit { title, url, snippet });
        }
    }

    hits
}

/// Resolve a result link to its destination, unwrapping `uddg=` redirects.
fn unwrap_redirect(href: &str, endpoint: &Url) -> Option<String> {
    let link = endpoint.join(href).ok()?;
    if let Some((_, target)) = link.query_pairs().find(|(k, _)| k == "uddg") {
        let target = Url::parse(&target).ok()?;
        return matches!(target.scheme(), "http" | "https").then(|| target.to_string());
    }
    matches!(link.scheme(), "http" | "https").then(|| link.to_string())
}

fn collapse<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}
