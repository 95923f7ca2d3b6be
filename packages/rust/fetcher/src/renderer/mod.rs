//! Renderer abstraction for turning a URL into page HTML.
//!
//! Fund sites often build their portfolio grid client-side, so the default
//! renderer drives headless Chromium. [`HttpRenderer`] is the no-browser
//! fallback: a plain GET with no script execution.

pub mod chromium;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use portfolioscout_shared::FetchError;

pub use chromium::{ChromiumRenderer, find_chromium};

/// HTML produced by a renderer.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// URL after redirects.
    pub final_url: String,
    /// Serialized DOM.
    pub html: String,
}

/// An engine that can produce the (rendered) HTML of a page.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render `url`, giving up after `timeout`.
    async fn render(&self, url: &Url, timeout: Duration) -> Result<RenderedPage, FetchError>;

    /// Human-readable renderer name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// HttpRenderer
// ---------------------------------------------------------------------------

/// Plain HTTP renderer. Sees only server-rendered markup.
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, url: &Url, timeout: Duration) -> Result<RenderedPage, FetchError> {
        debug!(%url, "fetching page over HTTP");

        let response = self
            .client
            .get(url.as_str())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, &e, timeout))?;

        check_status(url, response.status())?;
        let final_url = response.url().to_string();

        let html = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(url, &e, timeout))?;

        Ok(RenderedPage { final_url, html })
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Map an HTTP status onto the fetch error taxonomy.
pub(crate) fn check_status(url: &Url, status: StatusCode) -> Result<(), FetchError> {
    if status.is_success() {
        return Ok(());
    }
    match status.as_u16() {
        401 | 403 | 429 | 451 => Err(FetchError::blocked(url, format!("HTTP {status}"))),
        _ => Err(FetchError::network(url, format!("HTTP {status}"))),
    }
}

/// Classify a reqwest failure.
pub(crate) fn map_reqwest_error(url: &Url, err: &reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::timeout(url, timeout.as_secs())
    } else {
        FetchError::network(url, err.to_string())
    }
}
