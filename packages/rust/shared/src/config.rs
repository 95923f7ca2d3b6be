//! Application configuration for PortfolioScout.
//!
//! User config lives at `~/.portfolioscout/portfolioscout.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoutError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "portfolioscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".portfolioscout";

/// Lowest confidence any text-derived candidate can carry.
/// OCR-derived candidates must score strictly below this.
pub const TEXT_CONFIDENCE_FLOOR: f32 = 0.5;

// ---------------------------------------------------------------------------
// Config structs (matching portfolioscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Page fetching.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Candidate extraction and OCR fallback.
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Search-based enrichment.
    #[serde(default)]
    pub resolve: ResolveConfig,
}

/// How pages are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Headless Chromium when available, plain HTTP otherwise.
    Auto,
    /// Always use headless Chromium; fail if it is missing.
    Chromium,
    /// Plain HTTP GET, no script execution.
    Http,
}

impl std::str::FromStr for RendererKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "chromium" => Ok(Self::Chromium),
            "http" => Ok(Self::Http),
            other => Err(format!("unknown renderer '{other}' (expected auto, chromium or http)")),
        }
    }
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Renderer selection.
    #[serde(default = "default_renderer")]
    pub renderer: RendererKind,

    /// Time budget for rendering one page.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// How long to let client-side scripts build the DOM after load.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Maximum images downloaded per page for OCR.
    #[serde(default = "default_max_images")]
    pub max_images: usize,

    /// Time budget per image download.
    #[serde(default = "default_image_timeout")]
    pub image_timeout_secs: u64,

    /// Maximum portfolio pages followed from the landing page.
    #[serde(default = "default_max_portfolio_pages")]
    pub max_portfolio_pages: usize,

    /// User-Agent sent with plain HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            renderer: default_renderer(),
            timeout_secs: default_fetch_timeout(),
            settle_ms: default_settle_ms(),
            max_images: default_max_images(),
            image_timeout_secs: default_image_timeout(),
            max_portfolio_pages: default_max_portfolio_pages(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_renderer() -> RendererKind {
    RendererKind::Auto
}
fn default_fetch_timeout() -> u64 {
    60
}
fn default_settle_ms() -> u64 {
    2000
}
fn default_max_images() -> usize {
    40
}
fn default_image_timeout() -> u64 {
    10
}
fn default_max_portfolio_pages() -> usize {
    3
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into()
}

/// `[extract]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// OCR runs when fewer distinct text candidates than this were found.
    #[serde(default = "default_ocr_threshold")]
    pub ocr_threshold: usize,

    /// Set to false to never run OCR.
    #[serde(default = "default_true")]
    pub ocr_enabled: bool,

    /// Confidence given to OCR-derived candidates.
    #[serde(default = "default_ocr_confidence")]
    pub ocr_confidence: f32,

    /// Time budget per OCR invocation.
    #[serde(default = "default_ocr_timeout")]
    pub ocr_timeout_secs: u64,

    /// Tesseract executable.
    #[serde(default = "default_tesseract_cmd")]
    pub tesseract_cmd: String,

    /// Tesseract language pack.
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,

    /// A heuristic wins outright once it yields this many names.
    #[serde(default = "default_min_section_candidates")]
    pub min_section_candidates: usize,

    /// Extra words rejected as candidate names (case-insensitive).
    #[serde(default)]
    pub extra_stopwords: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            ocr_threshold: default_ocr_threshold(),
            ocr_enabled: true,
            ocr_confidence: default_ocr_confidence(),
            ocr_timeout_secs: default_ocr_timeout(),
            tesseract_cmd: default_tesseract_cmd(),
            ocr_language: default_ocr_language(),
            min_section_candidates: default_min_section_candidates(),
            extra_stopwords: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_ocr_threshold() -> usize {
    3
}
fn default_ocr_confidence() -> f32 {
    0.35
}
fn default_ocr_timeout() -> u64 {
    15
}
fn default_tesseract_cmd() -> String {
    "tesseract".into()
}
fn default_ocr_language() -> String {
    "eng".into()
}
fn default_min_section_candidates() -> usize {
    2
}

/// `[resolve]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Maximum concurrent lookups.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Minimum spacing between outgoing search requests.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Per-request timeout.
    #[serde(default = "default_resolve_timeout")]
    pub timeout_secs: u64,

    /// Search query; `{name}` is replaced with the candidate name.
    #[serde(default = "default_query_template")]
    pub query_template: String,

    /// Hits requested per search.
    #[serde(default = "default_search_results")]
    pub search_results: usize,

    /// Hosts whose pages score higher during result selection.
    #[serde(default = "default_preferred_domains")]
    pub preferred_domains: Vec<String>,

    /// DuckDuckGo HTML endpoint.
    #[serde(default = "default_search_url")]
    pub search_url: String,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            delay_ms: default_delay_ms(),
            timeout_secs: default_resolve_timeout(),
            query_template: default_query_template(),
            search_results: default_search_results(),
            preferred_domains: default_preferred_domains(),
            search_url: default_search_url(),
        }
    }
}

fn default_workers() -> usize {
    4
}
fn default_delay_ms() -> u64 {
    3000
}
fn default_resolve_timeout() -> u64 {
    10
}
fn default_query_template() -> String {
    r#"site:crunchbase.com "{name}""#.into()
}
fn default_search_results() -> usize {
    5
}
fn default_preferred_domains() -> Vec<String> {
    vec!["crunchbase.com".into()]
}
fn default_search_url() -> String {
    "https://html.duckduckgo.com/html/".into()
}

impl AppConfig {
    /// Reject settings the pipeline cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.resolve.workers == 0 {
            return Err(ScoutError::config("resolve.workers must be at least 1"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ScoutError::config("fetch.timeout_secs must be at least 1"));
        }
        let ocr = self.extract.ocr_confidence;
        if !(0.0..TEXT_CONFIDENCE_FLOOR).contains(&ocr) {
            return Err(ScoutError::config(format!(
                "extract.ocr_confidence must be in [0, {TEXT_CONFIDENCE_FLOOR}), got {ocr}"
            )));
        }
        if !self.resolve.query_template.contains("{name}") {
            return Err(ScoutError::config(
                "resolve.query_template must contain the {name} placeholder",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Analysis config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration for one analysis: merged from config file + CLI flags.
#[derive(Debug, Clone, Default)]
pub struct AnalysisConfig {
    pub fetch: FetchConfig,
    pub extract: ExtractConfig,
    pub resolve: ResolveConfig,
    /// Allow localhost/private targets (integration tests with mock servers).
    pub allow_private_hosts: bool,
}

impl From<&AppConfig> for AnalysisConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            fetch: config.fetch.clone(),
            extract: config.extract.clone(),
            resolve: config.resolve.clone(),
            allow_private_hosts: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.portfolioscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| ScoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.portfolioscout/portfolioscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load and validate the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ScoutError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| ScoutError::config(format!("failed to parse {}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ScoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ScoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ScoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
