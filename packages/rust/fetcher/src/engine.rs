//! Page fetcher: render a page, then download the images it references.
//!
//! Each call is a fresh network roundtrip. A transient network failure is
//! retried once; timeouts and blocks are returned immediately.

use std::net::IpAddr;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

use portfolioscout_shared::{
    FetchConfig, FetchError, FetchResult, ImageAsset, RendererKind, ScoutError,
};

use crate::images::{ImageRef, ImageSource, collect_image_refs};
use crate::renderer::{ChromiumRenderer, HttpRenderer, PageRenderer, find_chromium};

/// Concurrent image downloads per page.
const IMAGE_CONCURRENCY: usize = 4;

/// Renders pages and collects their images.
pub struct PageFetcher {
    config: FetchConfig,
    client: Client,
    renderer: Box<dyn PageRenderer>,
    /// Allow localhost/private IPs (for integration tests with mock servers).
    allow_private_hosts: bool,
}

impl PageFetcher {
    /// Create a fetcher, launching Chromium if the config asks for it.
    pub async fn new(config: FetchConfig, allow_private_hosts: bool) -> Result<Self, ScoutError> {
        let client = build_client(&config)?;

        let renderer: Box<dyn PageRenderer> = match config.renderer {
            RendererKind::Http => Box::new(HttpRenderer::new(client.clone())),
            RendererKind::Chromium => Box::new(ChromiumRenderer::launch(settle(&config)).await?),
            RendererKind::Auto => {
                if find_chromium().is_some() {
                    match ChromiumRenderer::launch(settle(&config)).await {
                        Ok(r) => Box::new(r),
                        Err(e) => {
                            warn!(error = %e, "Chromium launch failed, falling back to plain HTTP");
                            Box::new(HttpRenderer::new(client.clone()))
                        }
                    }
                } else {
                    warn!("Chromium not found; JavaScript-rendered portfolios may be missed");
                    Box::new(HttpRenderer::new(client.clone()))
                }
            }
        };

        Ok(Self::with_renderer(config, client, renderer, allow_private_hosts))
    }

    /// Create a fetcher around an explicit renderer.
    pub fn with_renderer(
        config: FetchConfig,
        client: Client,
        renderer: Box<dyn PageRenderer>,
        allow_private_hosts: bool,
    ) -> Self {
        Self {
            config,
            client,
            renderer,
            allow_private_hosts,
        }
    }

    /// Name of the active renderer.
    pub fn renderer_name(&self) -> &str {
        self.renderer.name()
    }

    /// Fetch `url`: render it and download the images it references.
    #[instrument(skip_all, fields(url = %url, renderer = self.renderer.name()))]
    pub async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError> {
        if !self.allow_private_hosts && is_ssrf_target(url) {
            warn!("SSRF protection: blocked");
            return Err(FetchError::blocked(url, "private or non-HTTP target"));
        }

        let page = match self.render_once(url).await {
            Err(e) if e.is_transient() => {
                warn!(error = %e, "transient fetch failure, retrying once");
                self.render_once(url).await?
            }
            other => other?,
        };

        let mut result = FetchResult::new(url.as_str(), page.final_url, page.html);
        let base = Url::parse(&result.final_url).unwrap_or_else(|_| url.clone());
        result.images = self.download_images(&result.html, &base).await;

        info!(
            html_len = result.html.len(),
            images = result.images.len(),
            hash = %&result.content_hash[..12],
            "page fetched"
        );
        Ok(result)
    }

    async fn render_once(&self, url: &Url) -> Result<crate::renderer::RenderedPage, FetchError> {
        let budget = Duration::from_secs(self.config.timeout_secs);
        // The renderer enforces the budget per request; this bounds the whole call.
        match tokio::time::timeout(budget + Duration::from_secs(1), self.renderer.render(url, budget))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(FetchError::timeout(url, self.config.timeout_secs)),
        }
    }

    /// Download every image referenced by `html`. Failures are skipped.
    async fn download_images(&self, html: &str, base: &Url) -> Vec<ImageAsset> {
        let refs = collect_image_refs(html, base, self.config.max_images);
        debug!(count = refs.len(), "image references found");

        futures::stream::iter(refs)
            .map(|image| self.download_image(image))
            .buffered(IMAGE_CONCURRENCY)
            .filter_map(|asset| async move { asset })
            .collect()
            .await
    }

    async fn download_image(&self, image: ImageRef) -> Option<ImageAsset> {
        let url = match image.source {
            ImageSource::Inline(bytes) => {
                return Some(ImageAsset {
                    src: image.src,
                    bytes,
                });
            }
            ImageSource::Remote(url) => url,
        };

        if !self.allow_private_hosts && is_ssrf_target(&url) {
            debug!(%url, "skipping image on private host");
            return None;
        }

        let timeout = Duration::from_secs(self.config.image_timeout_secs);
        let response = match self.client.get(url.as_str()).timeout(timeout).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!(%url, status = %r.status(), "image download failed");
                return None;
            }
            Err(e) => {
                warn!(%url, error = %e, "image download failed");
                return None;
            }
        };

        match response.bytes().await {
            Ok(bytes) if !bytes.is_empty() => Some(ImageAsset {
                src: image.src,
                bytes: bytes.to_vec(),
            }),
            Ok(_) => None,
            Err(e) => {
                warn!(%url, error = %e, "image body read failed");
                None
            }
        }
    }
}

fn settle(config: &FetchConfig) -> Duration {
    Duration::from_millis(config.settle_ms)
}

/// Build the HTTP client used for plain rendering and image downloads.
pub fn build_client(config: &FetchConfig) -> Result<Client, ScoutError> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| ScoutError::Network(format!("failed to build HTTP client: {e}")))
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
pub fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_fetcher() -> PageFetcher {
        let config = FetchConfig {
            renderer: RendererKind::Http,
            timeout_secs: 5,
            image_timeout_secs: 5,
            ..FetchConfig::default()
        };
        let client = build_client(&config).unwrap();
        let renderer = Box::new(HttpRenderer::new(client.clone()));
        PageFetcher::with_renderer(config, client, renderer, true)
    }

    #[test]
    fn test_ssrf_protection_blocks_file() {
        let url = Url::parse("file:///etc/passwd").unwrap();
        assert!(is_ssrf_target(&url));
    }

    #[test]
    fn test_ssrf_protection_blocks_private_ip() {
        for raw in ["http://192.168.1.1/admin", "http://10.0.0.1/", "http://127.0.0.1:8080/", "http://[::1]/"] {
            let url = Url::parse(raw).unwrap();
            assert!(is_ssrf_target(&url), "{raw} should be blocked");
        }
    }

    #[test]
    fn test_ssrf_protection_allows_public() {
        let url = Url::parse("https://fund.example/portfolio").unwrap();
        assert!(!is_ssrf_target(&url));
        let url = Url::parse("http://localhost:3000/api").unwrap();
        assert!(is_ssrf_target(&url));
    }

    #[tokio::test]
    async fn blocks_private_targets_by_default() {
        let config = FetchConfig {
            renderer: RendererKind::Http,
            ..FetchConfig::default()
        };
        let client = build_client(&config).unwrap();
        let renderer = Box::new(HttpRenderer::new(client.clone()));
        let fetcher = PageFetcher::with_renderer(config, client, renderer, false);

        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Blocked { .. }));
    }

    #[tokio::test]
    async fn fetches_page_and_images() {
        let server = MockServer::start().await;
        let page = r#"<html><body><div class="portfolio">
            <img src="/logos/acme.png" alt="Acme">
            <img src="/logos/missing.png" alt="Missing">
            <img src="data:image/png;base64,UE5HIQ==" alt="Inline">
        </div></body></html>"#;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/logos/acme.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"acme-bytes".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/logos/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let result = test_fetcher().fetch(&url).await.unwrap();

        assert!(result.html.contains("portfolio"));
        assert_eq!(result.content_hash.len(), 64);
        assert_eq!(result.images.len(), 2);
        assert_eq!(result.images[0].bytes, b"acme-bytes");
        assert!(result.images[0].src.ends_with("/logos/acme.png"));
        assert_eq!(result.images[1].bytes, b"PNG!");
    }

    #[tokio::test]
    async fn retries_once_on_server_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>ok</body></html>"))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let result = test_fetcher().fetch(&url).await.unwrap();
        assert!(result.html.contains("ok"));
    }

    #[tokio::test]
    async fn gives_up_after_second_network_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let err = test_fetcher().fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
    }

    #[tokio::test]
    async fn blocked_status_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let err = test_fetcher().fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Blocked { .. }));
    }

    #[tokio::test]
    async fn slow_page_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html></html>")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let config = FetchConfig {
            renderer: RendererKind::Http,
            timeout_secs: 1,
            ..FetchConfig::default()
        };
        let client = build_client(&config).unwrap();
        let renderer = Box::new(HttpRenderer::new(client.clone()));
        let fetcher = PageFetcher::with_renderer(config, client, renderer, true);

        let url = Url::parse(&server.uri()).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout { secs: 1, .. }));
    }
}
