//! Explicit portfolio container.
//!
//! Matches elements whose `class` or `id` mentions the portfolio and reads
//! labels from inside them. This is the most reliable signal when present.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{CandidateHeuristic, Proposal, element_text, image_label, in_site_chrome};

const KEYWORDS: &[&str] = &["portfolio", "companies", "investments", "holdings"];

const TEXT_CONFIDENCE: f32 = 0.9;
const ALT_CONFIDENCE: f32 = 0.8;

static CONTAINER_SEL: LazyLock<Selector> = LazyLock::new(|| {
    let parts: Vec<String> = KEYWORDS
        .iter()
        .flat_map(|k| [format!("[class*='{k}']"), format!("[id*='{k}']")])
        .collect();
    Selector::parse(&parts.join(", ")).expect("static selector")
});

static LABEL_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a, h2, h3, h4, h5, h6, li, figcaption, img, [class*='name'], [class*='title']")
        .expect("static selector")
});

static LEAF_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p, span, div").expect("static selector"));

/// Reads names from elements marked as the portfolio section.
pub struct PortfolioContainerHeuristic;

impl CandidateHeuristic for PortfolioContainerHeuristic {
    fn propose(&self, doc: &Html, _page_url: &Url) -> Vec<Proposal> {
        let mut proposals = Vec::new();

        for container in doc.select(&CONTAINER_SEL) {
            if !is_container_tag(&container) || in_site_chrome(&container) || has_matching_ancestor(&container) {
                continue;
            }

            let before = proposals.len();
            for label in container.select(&LABEL_SEL) {
                if label.value().name() == "img" {
                    if let Some(alt) = image_label(&label) {
                        proposals.push(Proposal::new(alt, ALT_CONFIDENCE));
                    }
                    continue;
                }
                if label.value().name() == "li" && has_nested_label(&label) {
                    continue;
                }
                let text = element_text(&label);
                if !text.is_empty() {
                    proposals.push(Proposal::new(text, TEXT_CONFIDENCE));
                }
            }

            // plain text blocks carry the names when no label markup exists
            if proposals.len() == before {
                proposals.extend(
                    container
                        .select(&LEAF_SEL)
                        .filter(is_text_leaf)
                        .map(|leaf| element_text(&leaf))
                        .filter(|text| !text.is_empty())
                        .map(|text| Proposal::new(text, TEXT_CONFIDENCE)),
                );
            }
        }

        proposals
    }

    fn name(&self) -> &str {
        "portfolio-container"
    }
}

fn is_container_tag(el: &ElementRef<'_>) -> bool {
    !matches!(el.value().name(), "a" | "body" | "html" | "img" | "meta" | "link" | "script")
}

/// Nested matches are read through their outermost container.
fn has_matching_ancestor(el: &ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| is_container_tag(&a) && CONTAINER_SEL.matches(&a))
}

/// List items are only read directly when they hold bare text.
fn has_nested_label(el: &ElementRef<'_>) -> bool {
    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(|d| LABEL_SEL.matches(&d))
}

fn is_text_leaf(el: &ElementRef<'_>) -> bool {
    !el.children().any(|c| c.value().is_element())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn propose(html: &str) -> Vec<Proposal> {
        let doc = Html::parse_document(html);
        let url = Url::parse("https://fund.example/").unwrap();
        PortfolioContainerHeuristic.propose(&doc, &url)
    }

    #[test]
    fn reads_text_and_alt_labels() {
        let props = propose(
            r#"<section class="portfolio-grid">
                <div class="card"><h3>Acme</h3></div>
                <div class="card"><img src="b.png" alt="Beta Corp logo"></div>
            </section>"#,
        );
        assert_eq!(
            props,
            vec![Proposal::new("Acme", 0.9), Proposal::new("Beta Corp logo", 0.8)]
        );
    }

    #[test]
    fn nested_containers_are_read_once() {
        let props = propose(
            r#"<div id="portfolio"><ul class="portfolio-list"><li><a href="/a">Acme</a></li></ul></div>"#,
        );
        assert_eq!(props, vec![Proposal::new("Acme", 0.9)]);
    }

    #[test]
    fn bare_list_items_are_labels() {
        let props = propose(
            r#"<ul class="companies"><li>Acme</li><li><a href="/b">Beta</a></li></ul>"#,
        );
        assert_eq!(props, vec![Proposal::new("Acme", 0.9), Proposal::new("Beta", 0.9)]);
    }

    #[test]
    fn plain_div_children_are_read() {
        let props = propose(
            r#"<main><div class="portfolio"><div>Acme</div><div>Beta Corp</div><div>Gamma</div></div></main>"#,
        );
        assert_eq!(
            props,
            vec![
                Proposal::new("Acme", 0.9),
                Proposal::new("Beta Corp", 0.9),
                Proposal::new("Gamma", 0.9)
            ]
        );
    }

    #[test]
    fn paragraphs_and_spans_are_read() {
        let props = propose(
            r#"<section id="portfolio"><p>Acme</p><p>Beta Corp</p><span>Gamma</span></section>"#,
        );
        let texts: Vec<_> = props.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["Acme", "Beta Corp", "Gamma"]);
    }

    #[test]
    fn leaf_fallback_skips_wrappers() {
        let props = propose(
            r#"<div class="investments"><div class="row"><p>Acme</p><div>Beta</div></div></div>"#,
        );
        let texts: Vec<_> = props.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["Acme", "Beta"]);
    }

    #[test]
    fn ignores_body_class_and_navigation() {
        let props = propose(
            r#"<html><body class="page-portfolio">
                <nav><ul class="portfolio-menu"><li><a href="/x">Hidden</a></li></ul></nav>
                <p>Nothing here</p>
            </body></html>"#,
        );
        assert!(props.is_empty());
    }
}
