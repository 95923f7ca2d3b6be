//! Inline SVG logos that spell the name in `<text>` elements.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use super::{CandidateHeuristic, Proposal, element_text, in_site_chrome};

const CONFIDENCE: f32 = 0.55;

static SVG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("svg").expect("static selector"));
static TEXT_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("text").expect("static selector"));

/// Joins the `<text>` content of each inline SVG.
pub struct SvgTextHeuristic;

impl CandidateHeuristic for SvgTextHeuristic {
    fn propose(&self, doc: &Html, _page_url: &Url) -> Vec<Proposal> {
        let mut proposals = Vec::new();
        for svg in doc.select(&SVG_SEL) {
            if in_site_chrome(&svg) {
                continue;
            }
            let joined = svg
                .select(&TEXT_SEL)
                .map(|t| element_text(&t))
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if !joined.is_empty() {
                proposals.push(Proposal::new(joined, CONFIDENCE));
            }
        }
        proposals
    }

    fn name(&self) -> &str {
        "svg-text"
    }
}
