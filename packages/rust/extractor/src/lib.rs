//! Company-name extraction from fetched fund pages.
//!
//! This crate provides:
//! - [`heuristics`]: the ordered [`CandidateHeuristic`] registry that reads names from the DOM
//! - [`NameFilter`]: noise rejection applied to every proposed name
//! - [`ocr`]: the [`OcrEngine`] fallback for image-only logo walls
//! - [`Extractor`]: ties them together and deduplicates the result

pub mod filter;
pub mod heuristics;
pub mod ocr;

use std::collections::{HashMap, HashSet};

use scraper::Html;
use tracing::{debug, info, instrument, warn};
use url::Url;

use portfolioscout_shared::{
    ExtractConfig, FetchResult, PortfolioCandidate, SourceLocation, sha256_hex,
};

pub use filter::NameFilter;
pub use heuristics::{CandidateHeuristic, HeuristicRegistry, Proposal};
pub use ocr::{OcrEngine, OcrError, TesseractOcr};

/// Heuristic label carried by OCR-derived candidates.
pub const OCR_HEURISTIC: &str = "ocr";

/// Extracts portfolio-company candidates from a fetched page.
pub struct Extractor {
    config: ExtractConfig,
    registry: HeuristicRegistry,
    filter: NameFilter,
    ocr: Option<Box<dyn OcrEngine>>,
}

impl Extractor {
    /// Built-in heuristics, plus Tesseract when OCR is enabled.
    pub fn new(config: ExtractConfig) -> Self {
        let ocr: Option<Box<dyn OcrEngine>> = if config.ocr_enabled {
            Some(Box::new(TesseractOcr::from_config(&config)))
        } else {
            None
        };
        Self {
            filter: NameFilter::new(&config.extra_stopwords),
            registry: HeuristicRegistry::new(),
            config,
            ocr,
        }
    }

    pub fn with_registry(mut self, registry: HeuristicRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_ocr(mut self, engine: Box<dyn OcrEngine>) -> Self {
        self.ocr = Some(engine);
        self
    }

    pub fn without_ocr(mut self) -> Self {
        self.ocr = None;
        self
    }

    /// Extract deduplicated candidates in page order.
    ///
    /// An empty result is valid; it means nothing on the page looked like a
    /// portfolio.
    #[instrument(skip_all, fields(url = %page.final_url))]
    pub async fn extract(&self, page: &FetchResult) -> Vec<PortfolioCandidate> {
        let mut candidates = self.text_candidates(page);

        let distinct_text = distinct_names(&candidates);
        debug!(distinct_text, threshold = self.config.ocr_threshold, "text extraction finished");

        if distinct_text < self.config.ocr_threshold {
            if let Some(engine) = &self.ocr {
                candidates.extend(self.ocr_candidates(engine.as_ref(), page).await);
            }
        }

        let candidates = dedupe_candidates(candidates);
        info!(
            candidates = candidates.len(),
            content_hash = %page.content_hash,
            "extraction complete"
        );
        candidates
    }

    fn text_candidates(&self, page: &FetchResult) -> Vec<PortfolioCandidate> {
        let page_url = match Url::parse(&page.final_url).or_else(|_| Url::parse(&page.url)) {
            Ok(u) => u,
            Err(e) => {
                warn!(url = %page.url, error = %e, "unparseable page URL, skipping DOM heuristics");
                return Vec::new();
            }
        };

        let doc = Html::parse_document(&page.html);
        self.registry
            .run(&doc, &page_url, &self.filter, self.config.min_section_candidates)
    }

    async fn ocr_candidates(&self, engine: &dyn OcrEngine, page: &FetchResult) -> Vec<PortfolioCandidate> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut found = Vec::new();

        for image in &page.images {
            if !seen.insert(sha256_hex(&image.bytes)) {
                continue;
            }

            match engine.recognize(&image.bytes).await {
                Ok(text) => {
                    let name = text.lines().find_map(|line| self.filter.clean(line));
                    debug!(src = %image.src, name = ?name, "OCR result");
                    if let Some(name) = name {
                        found.push(PortfolioCandidate::new(
                            name,
                            SourceLocation::Image,
                            self.config.ocr_confidence,
                            OCR_HEURISTIC,
                        ));
                    }
                }
                Err(OcrError::Unavailable(reason)) => {
                    warn!(engine = engine.name(), %reason, "OCR unavailable, skipping image fallback");
                    break;
                }
                Err(e) => {
                    warn!(src = %image.src, error = %e, "OCR failed for image");
                }
            }
        }

        info!(images = page.images.len(), recognized = found.len(), "OCR fallback finished");
        found
    }
}

/// Collapse candidates sharing a canonical name.
///
/// The survivor sits at the position of the earliest occurrence and carries
/// the highest-confidence variant (first one on ties).
pub fn dedupe_candidates(candidates: Vec<PortfolioCandidate>) -> Vec<PortfolioCandidate> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<PortfolioCandidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match slots.get(candidate.canonical_name()) {
            Some(&idx) => {
                if candidate.confidence() > out[idx].confidence() {
                    out[idx] = candidate;
                }
            }
            None => {
                slots.insert(candidate.canonical_name().to_string(), out.len());
                out.push(candidate);
            }
        }
    }

    out
}

fn distinct_names(candidates: &[PortfolioCandidate]) -> usize {
    candidates
        .iter()
        .map(PortfolioCandidate::canonical_name)
        .collect::<HashSet<_>>()
        .len()
}
