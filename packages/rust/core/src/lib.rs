//! Core pipeline orchestration for PortfolioScout.
//!
//! This crate ties together fetching, extraction and enrichment into the
//! end-to-end [`analyze`] workflow, then merges and summarizes the result.

pub mod aggregator;
pub mod pipeline;
pub mod summary;

pub use aggregator::aggregate;
pub use pipeline::{AnalysisReport, Analyzer, ProgressReporter, SilentProgress, analyze};
pub use summary::{CategoryGroup, CountryCount, PortfolioSummary, StageCount, summarize};
