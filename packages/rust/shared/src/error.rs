//! Error types for PortfolioScout.
//!
//! Library crates use these `thiserror` enums directly.
//! The CLI wraps them with `color-eyre` for rich diagnostics.
//!
//! The taxonomy mirrors the pipeline stages:
//! - [`FetchError`]: page unreachable; aborts the analysis of that URL.
//! - [`ExtractionError`]: nothing that looks like a portfolio; reported, not fatal.
//! - [`EnrichmentError`]: contained per candidate, always turned into `matched = false`.
//! - [`AnalysisError`]: what the `analyze` entry point hands back to callers.

use std::path::PathBuf;

/// General error type for setup, configuration and I/O.
#[derive(Debug, thiserror::Error)]
pub enum ScoutError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network client could not be built or a browser could not be launched.
    #[error("network error: {0}")]
    Network(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScoutError>;

impl ScoutError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Stage errors
// ---------------------------------------------------------------------------

/// A page (or image) could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The request did not complete within its time budget.
    #[error("timed out after {secs}s fetching {url}")]
    Timeout { url: String, secs: u64 },

    /// Transport failure or unexpected HTTP status.
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    /// The site refused us (401/403/429/451) or the target is not allowed.
    #[error("blocked fetching {url}: {reason}")]
    Blocked { url: String, reason: String },
}

impl FetchError {
    /// Create a network error for `url`.
    pub fn network(url: impl std::fmt::Display, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.to_string(),
            message: message.into(),
        }
    }

    /// Create a blocked error for `url`.
    pub fn blocked(url: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::Blocked {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error for `url`.
    pub fn timeout(url: impl std::fmt::Display, secs: u64) -> Self {
        Self::Timeout {
            url: url.to_string(),
            secs,
        }
    }

    /// Whether a single retry is worthwhile.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

/// The extractor found nothing that looks like a portfolio company.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("no portfolio companies detected")]
    NoCandidatesFound,
}

/// Why a single enrichment lookup came back empty.
///
/// Never surfaced to callers: the resolver logs it and records `matched = false`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnrichmentError {
    #[error("search failed: {0}")]
    Search(String),

    #[error("no plausible search result for {0:?}")]
    NoMatch(String),

    #[error("result page fetch failed: {0}")]
    Fetch(String),

    #[error("lookup timed out after {0}s")]
    Timeout(u64),
}

/// Error returned by the `analyze` entry point.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The fund site itself could not be fetched. Fatal.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The site was fetched but no candidates were detected. Not fatal for callers.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The pipeline could not be set up (bad config, no HTTP client, ...).
    #[error(transparent)]
    Setup(#[from] ScoutError),
}

impl AnalysisError {
    /// True when the site was reachable but showed no portfolio.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::Extraction(ExtractionError::NoCandidatesFound))
    }
}
