//! Chromium-based renderer using chromiumoxide.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use reqwest::StatusCode;
use tracing::{debug, info, warn};
use url::Url;

use portfolioscout_shared::{FetchError, ScoutError};

use super::{PageRenderer, RenderedPage, check_status};

/// Env var pointing at a specific Chromium/Chrome binary.
const CHROMIUM_PATH_ENV: &str = "PORTFOLIOSCOUT_CHROMIUM_PATH";

/// Find a Chromium binary: env override first, then the usual names on `PATH`.
pub fn find_chromium() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(CHROMIUM_PATH_ENV) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
        warn!(path = %p, "{CHROMIUM_PATH_ENV} does not exist, searching PATH");
    }

    for name in ["chromium", "chromium-browser", "google-chrome", "google-chrome-stable"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Headless Chromium renderer. Executes page scripts before reading the DOM.
pub struct ChromiumRenderer {
    browser: Browser,
    settle: Duration,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium instance.
    ///
    /// `settle` is how long to wait after navigation for client-side rendering.
    pub async fn launch(settle: Duration) -> Result<Self, ScoutError> {
        let chrome_path = find_chromium().ok_or_else(|| {
            ScoutError::Network(format!(
                "Chromium not found; install it or set {CHROMIUM_PATH_ENV}"
            ))
        })?;

        let config = BrowserConfig::builder()
            .chrome_executable(&chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .build()
            .map_err(|e| ScoutError::Network(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScoutError::Network(format!("failed to launch Chromium: {e}")))?;

        // The CDP handler must be polled for the browser to make progress.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "chromium handler event error");
                }
            }
        });

        info!(path = %chrome_path.display(), "launched headless Chromium");
        Ok(Self { browser, settle })
    }

    /// Check the main document's status, let scripts settle, then serialize the DOM.
    async fn read_document(&self, page: &Page, url: &Url) -> Result<RenderedPage, FetchError> {
        let status = page
            .wait_for_navigation_response()
            .await
            .ok()
            .flatten()
            .and_then(|request| request.response.as_ref().map(|r| r.status));
        if let Some(status) = status {
            check_document_status(url, status)?;
        }

        tokio::time::sleep(self.settle).await;

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());

        page.content()
            .await
            .map(|html| RenderedPage { final_url, html })
            .map_err(|e| FetchError::network(url, format!("failed to read DOM: {e}")))
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn render(&self, url: &Url, timeout: Duration) -> Result<RenderedPage, FetchError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::network(url, format!("failed to open tab: {e}")))?;

        let navigation = tokio::time::timeout(timeout, page.goto(url.as_str())).await;
        let outcome = match navigation {
            Err(_) => Err(FetchError::timeout(url, timeout.as_secs())),
            Ok(Err(e)) => Err(FetchError::network(url, format!("navigation failed: {e}"))),
            Ok(Ok(_)) => self.read_document(&page, url).await,
        };

        if let Err(e) = page.close().await {
            debug!(error = %e, "failed to close tab");
        }

        outcome
    }

    fn name(&self) -> &str {
        "chromium"
    }
}

/// Map a CDP response status onto the fetch error taxonomy.
///
/// Out-of-range values (CDP reports 0 for some non-network loads) pass.
fn check_document_status(url: &Url, status: i64) -> Result<(), FetchError> {
    match u16::try_from(status).ok().and_then(|s| StatusCode::from_u16(s).ok()) {
        Some(status) => check_status(url, status),
        None => Ok(()),
    }
}
