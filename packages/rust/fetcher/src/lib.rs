//! Page fetching for fund websites.
//!
//! This crate provides:
//! - [`renderer`]: the [`PageRenderer`] trait with headless-Chromium and plain-HTTP engines
//! - [`PageFetcher`]: renders a page, retries once on transient failure, downloads its images
//! - [`discover_portfolio_pages`]: finds the portfolio listing linked from a landing page

pub mod discovery;
pub mod engine;
pub mod images;
pub mod renderer;

pub use discovery::discover_portfolio_pages;
pub use engine::{PageFetcher, build_client, is_ssrf_target};
pub use images::{ImageRef, ImageSource, collect_image_refs, decode_data_uri};
pub use renderer::{ChromiumRenderer, HttpRenderer, PageRenderer, RenderedPage, find_chromium};
