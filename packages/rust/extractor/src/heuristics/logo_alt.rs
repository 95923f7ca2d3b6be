//! Logo images anywhere outside site chrome.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use super::{CandidateHeuristic, Proposal, image_label, in_site_chrome};

const CONFIDENCE: f32 = 0.6;

static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("static selector"));

/// Reads `alt`/`title`/`aria-label` of every content image.
pub struct LogoAltHeuristic;

impl CandidateHeuristic for LogoAltHeuristic {
    fn propose(&self, doc: &Html, _page_url: &Url) -> Vec<Proposal> {
        doc.select(&IMG_SEL)
            .filter(|img| !in_site_chrome(img))
            .filter_map(|img| image_label(&img))
            .map(|label| Proposal::new(label, CONFIDENCE))
            .collect()
    }

    fn name(&self) -> &str {
        "logo-alt"
    }
}
