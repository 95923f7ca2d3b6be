//! Shared types, error model, and configuration for PortfolioScout.
//!
//! This crate is the foundation depended on by all other PortfolioScout crates.
//! It provides:
//! - The error taxonomy ([`ScoutError`], [`FetchError`], [`ExtractionError`],
//!   [`EnrichmentError`], [`AnalysisError`])
//! - Domain types ([`FetchResult`], [`PortfolioCandidate`], [`EnrichmentResult`],
//!   [`CompanyRecord`])
//! - Configuration ([`AppConfig`], [`AnalysisConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AnalysisConfig, AppConfig, ExtractConfig, FetchConfig, RendererKind, ResolveConfig,
    TEXT_CONFIDENCE_FLOOR, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{
    AnalysisError, EnrichmentError, ExtractionError, FetchError, Result, ScoutError,
};
pub use types::{
    CompanyFacts, CompanyRecord, EnrichmentResult, FetchResult, FundingStage, ImageAsset,
    PortfolioCandidate, RunId, SourceLocation, canonical_name, clamp_confidence, name_slug,
    sha256_hex,
};
