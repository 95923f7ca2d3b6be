//! Repeated sibling blocks.
//!
//! Portfolio grids are usually a run of identical cards. Without any naming
//! hint on the container, the largest group of siblings sharing a tag and
//! class list is a good stand-in.

use std::collections::HashMap;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{CandidateHeuristic, Proposal, element_text, image_label, in_site_chrome};

const CONFIDENCE: f32 = 0.7;

static ALL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body, body *").expect("static selector"));

static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h2, h3, h4, h5, h6, [class*='name'], [class*='title'], figcaption, strong")
        .expect("static selector")
});

static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("static selector"));

/// Finds the largest run of look-alike sibling elements.
pub struct RepeatedBlockHeuristic {
    /// Smallest group that counts as a grid.
    pub min_repeat: usize,
}

impl Default for RepeatedBlockHeuristic {
    fn default() -> Self {
        Self { min_repeat: 4 }
    }
}

impl CandidateHeuristic for RepeatedBlockHeuristic {
    fn propose(&self, doc: &Html, _page_url: &Url) -> Vec<Proposal> {
        let mut best: Vec<ElementRef<'_>> = Vec::new();

        for parent in doc.select(&ALL_SEL) {
            if in_site_chrome(&parent) || matches!(parent.value().name(), "nav" | "header" | "footer") {
                continue;
            }

            let mut groups: HashMap<String, Vec<ElementRef<'_>>> = HashMap::new();
            let mut order: Vec<String> = Vec::new();
            for child in parent.children().filter_map(ElementRef::wrap) {
                if matches!(child.value().name(), "script" | "style" | "br") {
                    continue;
                }
                let key = block_key(&child);
                if !groups.contains_key(&key) {
                    order.push(key.clone());
                }
                groups.entry(key).or_default().push(child);
            }

            for key in order {
                let group = &groups[&key];
                if group.len() >= self.min_repeat && group.len() > best.len() {
                    best = group.clone();
                }
            }
        }

        best.iter().filter_map(block_label).map(|l| Proposal::new(l, CONFIDENCE)).collect()
    }

    fn name(&self) -> &str {
        "repeated-blocks"
    }
}

/// Tag plus sorted class list.
fn block_key(el: &ElementRef<'_>) -> String {
    let mut classes: Vec<&str> = el.value().classes().collect();
    classes.sort_unstable();
    format!("{}.{}", el.value().name(), classes.join("."))
}

/// The single label a card carries: a title element, then an image label,
/// then the card's own text.
fn block_label(block: &ElementRef<'_>) -> Option<String> {
    if let Some(title) = block.select(&TITLE_SEL).map(|t| element_text(&t)).find(|t| !t.is_empty()) {
        return Some(title);
    }
    if block.value().name() == "img" {
        return image_label(block);
    }
    if let Some(alt) = block.select(&IMG_SEL).find_map(|img| image_label(&img)) {
        return Some(alt);
    }
    let text = element_text(block);
    (!text.is_empty()).then_some(text)
}
