//! Structured facts from a company profile page.
//!
//! Profile pages differ wildly, so everything here is keyword-driven and
//! best-effort. A page that yields nothing still counts as a match; the
//! caller decides that from the search hit, not from the facts.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use portfolioscout_shared::{CompanyFacts, FundingStage};

/// Upper bound on description length, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 300;

/// Paragraphs shorter than this are not used as descriptions.
const MIN_PARAGRAPH_CHARS: usize = 40;

/// Plausible check sizes, in USD.
const MIN_AMOUNT_USD: u64 = 10_000;
const MAX_AMOUNT_USD: u64 = 100_000_000;

static META_DESCRIPTION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[name='description']").expect("static selector"));
static OG_DESCRIPTION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[property='og:description']").expect("static selector"));
static PARAGRAPH_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("static selector"));

/// Category labels and the keywords that signal them, in tie-break order.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("AI", &["artificial intelligence", "machine learning", "ai", "computer vision", "generative", "llm"]),
    ("SaaS", &["saas", "software as a service", "software-as-a-service", "b2b software", "cloud platform", "subscription software"]),
    ("FoodTech/F&B", &["food", "foodtech", "f&b", "restaurant", "restaurants", "kitchen", "kitchens", "grocery", "groceries"]),
    ("Fintech", &["fintech", "payments", "payment", "banking", "lending", "buy now, pay later", "bnpl", "insurtech", "wallet"]),
    ("HealthTech", &["healthtech", "health", "healthcare", "medical", "clinic", "clinics", "telemedicine", "patients"]),
    ("E-commerce", &["e-commerce", "ecommerce", "marketplace", "online store", "retailers", "shopping"]),
    ("Logistics", &["logistics", "delivery", "shipping", "freight", "last-mile", "fleet"]),
    ("EdTech", &["edtech", "education", "learning", "students", "tutoring"]),
    ("PropTech", &["proptech", "real estate", "property", "rental", "mortgage"]),
    ("Mobility", &["mobility", "ride-hailing", "transportation", "vehicles", "scooters"]),
    ("Cybersecurity", &["cybersecurity", "cyber security", "security", "threat detection"]),
];

/// Country labels and the keywords that signal them.
const COUNTRIES: &[(&str, &[&str])] = &[
    ("UAE", &["united arab emirates", "uae", "dubai", "abu dhabi"]),
    ("Saudi Arabia", &["saudi arabia", "ksa", "riyadh", "jeddah"]),
    ("Egypt", &["egypt", "cairo", "alexandria"]),
    ("Jordan", &["jordan", "amman"]),
    ("Qatar", &["qatar", "doha"]),
    ("Kuwait", &["kuwait"]),
    ("Bahrain", &["bahrain", "manama"]),
    ("Oman", &["oman", "muscat"]),
    ("Lebanon", &["lebanon", "beirut"]),
    ("Morocco", &["morocco", "casablanca"]),
    ("Pakistan", &["pakistan", "karachi", "lahore"]),
    ("Turkey", &["turkey", "türkiye", "istanbul"]),
    ("India", &["india", "bangalore", "bengaluru", "mumbai"]),
    ("USA", &["united states", "usa", "san francisco", "new york"]),
    ("UK", &["united kingdom", "uk", "london"]),
];

static CATEGORY_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> =
    LazyLock::new(|| CATEGORIES.iter().map(|(label, kws)| (*label, keyword_regex(kws))).collect());

static COUNTRY_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> =
    LazyLock::new(|| COUNTRIES.iter().map(|(label, kws)| (*label, keyword_regex(kws))).collect());

static PRE_SEED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bpre[- ]?seed\b").expect("static regex"));

static STAGE_PATTERNS: LazyLock<Vec<(FundingStage, Regex)>> = LazyLock::new(|| {
    [
        (FundingStage::Seed, r"\bseed\b"),
        (FundingStage::SeriesA, r"\bseries[- ]a\b"),
        (FundingStage::SeriesB, r"\bseries[- ]b\b"),
        (FundingStage::SeriesC, r"\bseries[- ]c\b"),
        (FundingStage::SeriesD, r"\bseries[- ]d\b"),
        (FundingStage::SeriesE, r"\bseries[- ]e\b"),
        (FundingStage::Growth, r"\bgrowth (?:equity|round|stage)\b|\blate[- ]stage\b"),
        (FundingStage::Ipo, r"\bipo\b|\bwent public\b|\bpublicly traded\b"),
        (FundingStage::Acquired, r"\bacquired by\b|\bwas acquired\b"),
    ]
    .into_iter()
    .map(|(stage, pattern)| (stage, Regex::new(&format!("(?i){pattern}")).expect("static regex")))
    .collect()
});

static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:us\$|\$|usd\s?)\s?(\d[\d,]*(?:\.\d+)?)\s*(billion|million|thousand|bn|mn|b|m|k)?\b")
        .expect("static regex")
});

fn keyword_regex(keywords: &[&str]) -> Regex {
    let alternatives: Vec<String> = keywords.iter().map(|k| regex::escape(k)).collect();
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|"))).expect("static regex")
}

/// Parse a profile page into typed facts.
pub fn parse_facts(html: &str) -> CompanyFacts {
    let doc = Html::parse_document(html);
    let description = extract_description(&doc);
    let text = visible_text(&doc);

    let category = description
        .as_deref()
        .and_then(detect_category)
        .or_else(|| detect_category(&text));

    CompanyFacts {
        description,
        category: category.map(String::from),
        funding_stage: detect_stage(&text),
        country: detect_country(&text).map(String::from),
        funding_amount_usd: detect_amount(&text),
    }
}

/// `meta[name=description]`, then `og:description`, then the first
/// substantial paragraph.
pub fn extract_description(doc: &Html) -> Option<String> {
    let from_meta = [&*META_DESCRIPTION_SEL, &*OG_DESCRIPTION_SEL]
        .into_iter()
        .filter_map(|sel| doc.select(sel).next())
        .filter_map(|el| el.value().attr("content"))
        .map(collapse)
        .find(|s| !s.is_empty());

    from_meta
        .or_else(|| {
            doc.select(&PARAGRAPH_SEL)
                .map(|p| collapse(&p.text().collect::<String>()))
                .find(|p| p.chars().count() >= MIN_PARAGRAPH_CHARS)
        })
        .map(|d| truncate(&d, MAX_DESCRIPTION_CHARS))
}

/// The category with the most keyword hits, earliest in the taxonomy on ties.
pub fn detect_category(text: &str) -> Option<&'static str> {
    let mut best: Option<(usize, &'static str)> = None;
    for (label, pattern) in CATEGORY_PATTERNS.iter() {
        let hits = pattern.find_iter(text).count();
        if hits > 0 && best.is_none_or(|(n, _)| hits > n) {
            best = Some((hits, *label));
        }
    }
    best.map(|(_, label)| label)
}

/// The most advanced funding stage mentioned.
pub fn detect_stage(text: &str) -> Option<FundingStage> {
    let pre_seed = PRE_SEED.is_match(text).then_some(FundingStage::PreSeed);
    let without_pre_seed = PRE_SEED.replace_all(text, " ");
    STAGE_PATTERNS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(&without_pre_seed))
        .map(|(stage, _)| *stage)
        .chain(pre_seed)
        .max()
}

/// The country mentioned earliest in the text.
pub fn detect_country(text: &str) -> Option<&'static str> {
    COUNTRY_PATTERNS
        .iter()
        .filter_map(|(label, pattern)| pattern.find(text).map(|m| (m.start(), *label)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, label)| label)
}

/// The first dollar amount within the plausible check range.
pub fn detect_amount(text: &str) -> Option<u64> {
    AMOUNT.captures_iter(text).find_map(|caps| {
        let number: f64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
        let multiplier = match caps.get(2).map(|m| m.as_str().to_lowercase()).as_deref() {
            Some("k" | "thousand") => 1e3,
            Some("m" | "mn" | "million") => 1e6,
            Some("b" | "bn" | "billion") => 1e9,
            _ => 1.0,
        };
        let amount = (number * multiplier).round() as u64;
        (MIN_AMOUNT_USD..=MAX_AMOUNT_USD).contains(&amount).then_some(amount)
    })
}

/// Page text outside `script`, `style` and `noscript`, whitespace collapsed.
fn visible_text(doc: &Html) -> String {
    let parts: Vec<&str> = doc
        .root_element()
        .descendants()
        .filter(|node| {
            node.parent()
                .and_then(ElementRef::wrap)
                .is_none_or(|p| !matches!(p.value().name(), "script" | "style" | "noscript" | "title"))
        })
        .filter_map(|node| node.value().as_text().map(|t| &**t))
        .collect();
    collapse(&parts.join(" "))
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut at a word boundary so the result, ellipsis included, fits in `max` chars.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max.saturating_sub(3)).collect();
    let cut = match cut.rfind(' ') {
        Some(idx) if idx > 0 => &cut[..idx],
        _ => cut.as_str(),
    };
    format!("{}...", cut.trim_end_matches([',', '.', ';', ':']))
}
