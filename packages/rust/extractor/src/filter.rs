//! Name cleanup and noise rejection.
//!
//! Every raw string a heuristic or OCR proposes goes through [`NameFilter::clean`]
//! before it becomes a candidate.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static LOGO_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blogos?\b").expect("static regex"));

/// Decoration stripped from both ends of a name.
const DECORATION: &[char] = &[
    ' ', '$', '•', '-', '–', '—', '·', '|', '→', '●', '*', '›', '»', ':', ',', '/', '\u{a0}',
];

/// Characters that mark a string as markup or layout noise.
const MARKUP_CHARS: &[char] = &['<', '>', '{', '}', '[', ']', '|'];

const MIN_NAME_CHARS: usize = 2;
const MAX_NAME_CHARS: usize = 60;
const MAX_NAME_WORDS: usize = 5;

/// Navigation labels, UI chrome and portfolio filter chips.
const STOPWORDS: &[&str] = &[
    "home", "team", "our team", "contact", "contact us", "about", "about us", "blog", "news",
    "press", "services", "portfolio", "our portfolio", "portfolio companies", "companies",
    "investments", "email", "english", "arabic", "en", "ar", "career", "careers", "jobs",
    "subscribe", "loading", "apply", "login", "log in", "sign in", "sign up", "follow",
    "follow us", "menu", "search", "read more", "learn more", "view all", "see all", "more",
    "back", "next", "previous", "privacy policy", "terms", "cookies", "accept", "close",
    "twitter", "linkedin", "facebook", "instagram", "youtube", "medium", "github", "all",
    "active", "exited", "sector", "stage", "status", "filter", "website", "visit website",
];

/// Rejects strings that are unlikely to be company names.
#[derive(Debug, Clone)]
pub struct NameFilter {
    stopwords: HashSet<String>,
}

impl NameFilter {
    /// Built-in stoplist plus `extra` words (case-insensitive).
    pub fn new(extra: &[String]) -> Self {
        let stopwords = STOPWORDS
            .iter()
            .map(|w| w.to_string())
            .chain(extra.iter().map(|w| w.trim().to_lowercase()))
            .collect();
        Self { stopwords }
    }

    /// Normalize `raw` and return it if it plausibly names a company.
    pub fn clean(&self, raw: &str) -> Option<String> {
        let collapsed = collapse_whitespace(raw);
        let without_logo = LOGO_WORD.replace_all(&collapsed, " ");
        let name = collapse_whitespace(&without_logo)
            .trim_matches(DECORATION)
            .to_string();

        if self.is_plausible(&name) { Some(name) } else { None }
    }

    fn is_plausible(&self, name: &str) -> bool {
        let len = name.chars().count();
        if !(MIN_NAME_CHARS..=MAX_NAME_CHARS).contains(&len) {
            return false;
        }
        if self.stopwords.contains(&name.to_lowercase()) {
            return false;
        }
        if !name.chars().any(char::is_alphabetic) {
            return false;
        }
        if name.split_whitespace().count() > MAX_NAME_WORDS {
            return false;
        }
        if name.contains(MARKUP_CHARS) {
            return false;
        }
        let lower = name.to_lowercase();
        !(lower.contains('@') || lower.contains('©') || lower.starts_with("http") || lower.starts_with("www."))
    }
}

impl Default for NameFilter {
    fn default() -> Self {
        Self::new(&[])
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
