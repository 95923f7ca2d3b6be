//! Candidate heuristics and the registry that runs them.
//!
//! Each heuristic looks at the parsed page in its own way and proposes
//! names in DOM order. The registry tries them in priority order; the first
//! one that finds a convincing number of names wins.

mod container;
mod logo_alt;
mod outbound;
mod repeated;
mod svg_text;

use std::collections::HashSet;

use scraper::{ElementRef, Html};
use tracing::debug;
use url::Url;

use portfolioscout_shared::{PortfolioCandidate, SourceLocation};

use crate::filter::NameFilter;

pub use container::PortfolioContainerHeuristic;
pub use logo_alt::LogoAltHeuristic;
pub use outbound::OutboundAnchorHeuristic;
pub use repeated::RepeatedBlockHeuristic;
pub use svg_text::SvgTextHeuristic;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A raw name proposed by a heuristic, before filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub text: String,
    pub confidence: f32,
}

impl Proposal {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// One strategy for locating portfolio company names in a page.
pub trait CandidateHeuristic: Send + Sync {
    /// Propose raw names in DOM order.
    fn propose(&self, doc: &Html, page_url: &Url) -> Vec<Proposal>;

    /// Human-readable heuristic name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds heuristics in priority order.
pub struct HeuristicRegistry {
    heuristics: Vec<Box<dyn CandidateHeuristic>>,
}

impl HeuristicRegistry {
    /// Create a registry with all built-in heuristics, most specific first.
    pub fn new() -> Self {
        Self {
            heuristics: vec![
                Box::new(PortfolioContainerHeuristic),
                Box::new(RepeatedBlockHeuristic::default()),
                Box::new(LogoAltHeuristic),
                Box::new(SvgTextHeuristic),
                Box::new(OutboundAnchorHeuristic),
            ],
        }
    }

    /// An empty registry, for callers that bring their own heuristics.
    pub fn empty() -> Self {
        Self {
            heuristics: Vec::new(),
        }
    }

    /// Append a heuristic at the lowest priority.
    pub fn with(mut self, heuristic: Box<dyn CandidateHeuristic>) -> Self {
        self.heuristics.push(heuristic);
        self
    }

    /// Run heuristics in order and return the accepted candidates of the winner.
    ///
    /// A heuristic wins outright once it yields at least `min_section`
    /// distinct names. Otherwise the one with the most distinct names wins,
    /// earliest on ties.
    pub fn run(
        &self,
        doc: &Html,
        page_url: &Url,
        filter: &NameFilter,
        min_section: usize,
    ) -> Vec<PortfolioCandidate> {
        let mut best: Option<(usize, Vec<PortfolioCandidate>)> = None;

        for heuristic in &self.heuristics {
            let accepted: Vec<PortfolioCandidate> = heuristic
                .propose(doc, page_url)
                .into_iter()
                .filter_map(|p| {
                    filter.clean(&p.text).map(|name| {
                        PortfolioCandidate::new(name, SourceLocation::Text, p.confidence, heuristic.name())
                    })
                })
                .collect();

            let distinct = accepted
                .iter()
                .map(PortfolioCandidate::canonical_name)
                .collect::<HashSet<_>>()
                .len();
            debug!(heuristic = heuristic.name(), distinct, "heuristic evaluated");

            if distinct >= min_section.max(1) {
                return accepted;
            }
            if distinct > best.as_ref().map_or(0, |(n, _)| *n) {
                best = Some((distinct, accepted));
            }
        }

        best.map(|(_, accepted)| accepted).unwrap_or_default()
    }
}

impl Default for HeuristicRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Shared DOM helpers
// ---------------------------------------------------------------------------

/// Visible text of an element with whitespace collapsed.
pub(crate) fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// The label an image carries: `alt`, then `title`, then `aria-label`.
pub(crate) fn image_label(el: &ElementRef<'_>) -> Option<String> {
    ["alt", "title", "aria-label"]
        .iter()
        .filter_map(|attr| el.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(String::from)
}

/// Whether the element sits inside site chrome (nav, header, footer).
pub(crate) fn in_site_chrome(el: &ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| matches!(a.value().name(), "nav" | "header" | "footer"))
}
