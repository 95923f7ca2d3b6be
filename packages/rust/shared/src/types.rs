//! Core domain types for portfolio extraction and enrichment.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Canonical names
// ---------------------------------------------------------------------------

/// Fold a company name into its dedup key: lowercase, single spaces, trimmed.
pub fn canonical_name(name: &str) -> String {
    name.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Slug form of a name, used to match it against URLs (`Beta Corp` → `beta-corp`).
pub fn name_slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one analysis run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// FetchResult
// ---------------------------------------------------------------------------

/// An image referenced by the page, downloaded for OCR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    /// Resolved URL, or `data:` for inline images.
    pub src: String,
    /// Raw encoded bytes (PNG, JPEG, ...).
    pub bytes: Vec<u8>,
}

/// A rendered page plus the images it references.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// URL that was requested.
    pub url: String,
    /// URL after redirects / client-side navigation.
    pub final_url: String,
    /// Rendered HTML (after script execution when a browser was used).
    pub html: String,
    /// Images in DOM order.
    pub images: Vec<ImageAsset>,
    /// When the page was fetched.
    pub fetched_at: DateTime<Utc>,
    /// SHA-256 of `html`.
    pub content_hash: String,
}

impl FetchResult {
    /// Build a result for already-rendered HTML, computing its hash.
    pub fn new(url: impl Into<String>, final_url: impl Into<String>, html: String) -> Self {
        let content_hash = sha256_hex(html.as_bytes());
        Self {
            url: url.into(),
            final_url: final_url.into(),
            html,
            images: Vec::new(),
            fetched_at: Utc::now(),
            content_hash,
        }
    }
}

/// Compute SHA-256 of some bytes as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// PortfolioCandidate
// ---------------------------------------------------------------------------

/// Where a candidate name was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLocation {
    Text,
    Image,
}

/// An unverified company name pulled from a fund page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioCandidate {
    raw_text: String,
    canonical_name: String,
    source_location: SourceLocation,
    confidence: f32,
    heuristic: String,
}

impl PortfolioCandidate {
    /// Create a candidate; confidence is clamped into `[0, 1]`.
    pub fn new(
        raw_text: impl Into<String>,
        source_location: SourceLocation,
        confidence: f32,
        heuristic: impl Into<String>,
    ) -> Self {
        let raw_text = raw_text.into();
        Self {
            canonical_name: canonical_name(&raw_text),
            raw_text,
            source_location,
            confidence: clamp_confidence(confidence),
            heuristic: heuristic.into(),
        }
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn canonical_name(&self) -> &str {
        &self.canonical_name
    }

    pub fn source_location(&self) -> SourceLocation {
        self.source_location
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Name of the heuristic (or `ocr`) that produced this candidate.
    pub fn heuristic(&self) -> &str {
        &self.heuristic
    }
}

/// Clamp a confidence score into `[0, 1]`, mapping NaN to 0.
pub fn clamp_confidence(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

/// Funding stage, ordered from earliest to latest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingStage {
    PreSeed,
    Seed,
    SeriesA,
    SeriesB,
    SeriesC,
    SeriesD,
    SeriesE,
    Growth,
    Ipo,
    Acquired,
}

impl FundingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreSeed => "Pre-Seed",
            Self::Seed => "Seed",
            Self::SeriesA => "Series A",
            Self::SeriesB => "Series B",
            Self::SeriesC => "Series C",
            Self::SeriesD => "Series D",
            Self::SeriesE => "Series E",
            Self::Growth => "Growth",
            Self::Ipo => "IPO",
            Self::Acquired => "Acquired",
        }
    }
}

impl fmt::Display for FundingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured facts recovered for one company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyFacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_stage: Option<FundingStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_amount_usd: Option<u64>,
}

impl CompanyFacts {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Outcome of looking one candidate up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    /// The candidate name that was searched for.
    pub query_name: String,
    /// Whether a plausible result page was found and parsed.
    pub matched: bool,
    /// The page the facts came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub facts: CompanyFacts,
}

impl EnrichmentResult {
    /// A lookup that found nothing.
    pub fn unmatched(query_name: impl Into<String>) -> Self {
        Self {
            query_name: query_name.into(),
            matched: false,
            source_url: None,
            facts: CompanyFacts::default(),
        }
    }

    /// A lookup that found a page.
    pub fn matched(query_name: impl Into<String>, source_url: impl Into<String>, facts: CompanyFacts) -> Self {
        Self {
            query_name: query_name.into(),
            matched: true,
            source_url: Some(source_url.into()),
            facts,
        }
    }
}

// ---------------------------------------------------------------------------
// CompanyRecord
// ---------------------------------------------------------------------------

/// One distinct portfolio company in the final output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    /// Dedup key (case/whitespace-folded).
    pub canonical_name: String,
    /// Name as it appeared on the fund site.
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_stage: Option<FundingStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_amount_usd: Option<u64>,
    /// Page the facts came from, if enrichment matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Highest extraction confidence across merged candidates.
    pub extraction_confidence: f32,
    pub source_location: SourceLocation,
    /// Whether enrichment found anything.
    pub matched: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_name_folds_case_and_whitespace() {
        assert_eq!(canonical_name("  Beta\t Corp \n"), "beta corp");
        assert_eq!(canonical_name("ACME"), canonical_name("acme"));
        assert_eq!(canonical_name(""), "");
    }

    #[test]
    fn name_slug_matches_url_style() {
        assert_eq!(name_slug("Beta Corp"), "beta-corp");
        assert_eq!(name_slug("Acme.io"), "acme-io");
        assert_eq!(name_slug("  Déjà Vu  "), "déjà-vu");
    }

    #[test]
    fn candidate_clamps_confidence() {
        let high = PortfolioCandidate::new("Acme", SourceLocation::Text, 1.7, "test");
        assert_eq!(high.confidence(), 1.0);
        let nan = PortfolioCandidate::new("Acme", SourceLocation::Text, f32::NAN, "test");
        assert_eq!(nan.confidence(), 0.0);
        assert_eq!(high.canonical_name(), "acme");
    }

    #[test]
    fn funding_stage_orders_and_displays() {
        assert_eq!(FundingStage::SeriesA.to_string(), "Series A");
        assert_eq!(FundingStage::Ipo.to_string(), "IPO");
        assert!(FundingStage::Seed < FundingStage::SeriesB);
        assert!(FundingStage::SeriesE < FundingStage::Acquired);
    }

    #[test]
    fn fetch_result_hashes_html() {
        let result = FetchResult::new("https://a.example", "https://a.example/", "hello world".into());
        assert_eq!(
            result.content_hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert!(result.images.is_empty());
    }

    #[test]
    fn record_serialization_skips_missing_facts() {
        let record = CompanyRecord {
            canonical_name: "acme".into(),
            display_name: "Acme".into(),
            description: None,
            category: Some("SaaS".into()),
            funding_stage: Some(FundingStage::SeriesB),
            country: None,
            funding_amount_usd: None,
            source_url: None,
            extraction_confidence: 0.9,
            source_location: SourceLocation::Text,
            matched: true,
        };
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(!json.contains("description"));
        assert!(json.contains(r#""funding_stage":"series_b""#));
        let parsed: CompanyRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, record);
    }
}
