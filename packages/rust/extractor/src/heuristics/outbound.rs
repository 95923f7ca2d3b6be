//! Outbound links as a last resort.
//!
//! Portfolio cards often link to the company's own site. Any anchor leaving
//! the fund's host is treated as a weak hint.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use super::{CandidateHeuristic, Proposal, element_text, image_label, in_site_chrome};

const CONFIDENCE: f32 = 0.5;

static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));
static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("static selector"));

/// Hosts that are never portfolio companies.
const SOCIAL_HOSTS: &[&str] = &[
    "twitter.com", "x.com", "linkedin.com", "facebook.com", "instagram.com", "youtube.com",
    "medium.com", "github.com", "google.com", "apple.com",
];

/// Labels anchors that point away from the fund's site.
pub struct OutboundAnchorHeuristic;

impl CandidateHeuristic for OutboundAnchorHeuristic {
    fn propose(&self, doc: &Html, page_url: &Url) -> Vec<Proposal> {
        let own_host = page_url.host_str().map(strip_www);
        let mut proposals = Vec::new();

        for a in doc.select(&LINK_SEL) {
            if in_site_chrome(&a) {
                continue;
            }
            let Some(target) = a.value().attr("href").and_then(|h| page_url.join(h).ok()) else {
                continue;
            };
            if !matches!(target.scheme(), "http" | "https") {
                continue;
            }
            let Some(host) = target.host_str().map(strip_www) else {
                continue;
            };
            if Some(host) == own_host || SOCIAL_HOSTS.iter().any(|s| host == *s || host.ends_with(&format!(".{s}"))) {
                continue;
            }

            let text = element_text(&a);
            let label = if text.is_empty() {
                a.select(&IMG_SEL)
                    .find_map(|img| image_label(&img))
                    .or_else(|| a.value().attr("aria-label").map(|l| l.trim().to_string()))
            } else {
                Some(text)
            };
            if let Some(label) = label.filter(|l| !l.is_empty()) {
                proposals.push(Proposal::new(label, CONFIDENCE));
            }
        }

        proposals
    }

    fn name(&self) -> &str {
        "outbound-anchors"
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_external_links_only() {
        let doc = Html::parse_document(
            r#"<main>
                <a href="/about">About</a>
                <a href="https://www.fund.example/team">Team</a>
                <a href="https://acme.io">Acme</a>
                <a href="https://beta.example"><img alt="Beta"></a>
                <a href="https://gamma.example" aria-label="Gamma"></a>
                <a href="https://linkedin.com/company/fund">LinkedIn</a>
                <a href="mailto:hi@fund.example">Mail</a>
            </main>
            <footer><a href="https://partner.example">Partner</a></footer>"#,
        );
        let url = Url::parse("https://fund.example/").unwrap();
        let names: Vec<_> = OutboundAnchorHeuristic.propose(&doc, &url).into_iter().map(|p| p.text).collect();
        assert_eq!(names, vec!["Acme", "Beta", "Gamma"]);
    }
}
