//! Portfolio-page discovery.
//!
//! Fund landing pages rarely list the portfolio themselves; they link to it.
//! Before extracting, we look for same-site links whose label or path
//! mentions the portfolio and analyse those pages instead.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));

/// Words that mark a link as leading to the portfolio listing.
const PORTFOLIO_KEYWORDS: &[&str] = &["portfolio", "investments", "companies"];

/// Find up to `max` same-host links that look like portfolio pages, in DOM order.
///
/// The landing page itself is never returned; callers fall back to it when
/// the result is empty.
pub fn discover_portfolio_pages(html: &str, base: &Url, max: usize) -> Vec<Url> {
    let doc = Html::parse_document(html);
    let base_key = normalize_url(base);
    let mut pages: Vec<Url> = Vec::new();

    for el in doc.select(&LINK_SEL) {
        if pages.len() >= max {
            break;
        }
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        if href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:") {
            continue;
        }

        let label = el.text().collect::<String>().to_lowercase();
        let href_lower = href.to_lowercase();
        if !PORTFOLIO_KEYWORDS
            .iter()
            .any(|k| label.contains(k) || href_lower.contains(k))
        {
            continue;
        }

        let Ok(mut resolved) = base.join(href) else {
            continue;
        };
        resolved.set_fragment(None);
        if resolved.host_str() != base.host_str() {
            continue;
        }

        let key = normalize_url(&resolved);
        if key == base_key || pages.iter().any(|p| normalize_url(p) == key) {
            continue;
        }
        pages.push(resolved);
    }

    pages
}

/// Normalize a URL for deduplication (strip fragment and trailing slash).
pub(crate) fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    let mut s = normalized.to_string();
    if s.ends_with('/') && s.matches('/').count() > 3 {
        s.pop();
    }
    s
}
