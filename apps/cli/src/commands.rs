//! CLI command definitions, routing, and tracing setup.

use std::io::{BufRead, Write};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use portfolioscout_core::{AnalysisReport, Analyzer, ProgressReporter};
use portfolioscout_shared::{
    AnalysisConfig, AppConfig, CompanyRecord, RendererKind, init_config, load_config,
};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// PortfolioScout: list a VC fund's portfolio companies and enrich them.
#[derive(Parser)]
#[command(
    name = "portfolioscout",
    version,
    about = "Extract a venture fund's portfolio from its website and enrich each company.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Page rendering engine.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum RendererArg {
    Auto,
    Chromium,
    Http,
}

impl From<RendererArg> for RendererKind {
    fn from(arg: RendererArg) -> Self {
        match arg {
            RendererArg::Auto => RendererKind::Auto,
            RendererArg::Chromium => RendererKind::Chromium,
            RendererArg::Http => RendererKind::Http,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Analyze a fund website.
    Analyze {
        /// Fund website URL (prompted for when omitted).
        url: Option<String>,

        /// Output format.
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Rendering engine (overrides config).
        #[arg(long)]
        renderer: Option<RendererArg>,

        /// Concurrent enrichment lookups (overrides config).
        #[arg(short, long)]
        workers: Option<usize>,

        /// Disable the OCR fallback for logo-only portfolios.
        #[arg(long)]
        no_ocr: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "portfolioscout=info",
        1 => "portfolioscout=debug",
        _ => "portfolioscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Analyze {
            url,
            format,
            renderer,
            workers,
            no_ocr,
        } => cmd_analyze(url, format, renderer, workers, no_ocr).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// analyze
// ---------------------------------------------------------------------------

async fn cmd_analyze(
    url: Option<String>,
    format: OutputFormat,
    renderer: Option<RendererArg>,
    workers: Option<usize>,
    no_ocr: bool,
) -> Result<()> {
    let app_config = load_config()?;
    let mut config = AnalysisConfig::from(&app_config);
    if let Some(renderer) = renderer {
        config.fetch.renderer = renderer.into();
    }
    if let Some(workers) = workers {
        if workers == 0 {
            return Err(eyre!("--workers must be at least 1"));
        }
        config.resolve.workers = workers;
    }
    if no_ocr {
        config.extract.ocr_enabled = false;
    }

    let raw = match url {
        Some(u) => u,
        None => prompt_for_url()?,
    };
    let fund_url = parse_fund_url(&raw)?;

    let analyzer = Analyzer::new(config).await?;
    info!(url = %fund_url, renderer = analyzer.renderer_name(), "analysis requested");

    let progress = CliProgress::new();
    let outcome = analyzer.run(&fund_url, &progress).await;
    progress.spinner.finish_and_clear();

    let report = match outcome {
        Ok(report) => report,
        Err(e) if e.is_empty_result() => {
            println!("No portfolio detected at {fund_url}.");
            println!("The site was reachable but no company names could be extracted.");
            return Ok(());
        }
        Err(e) => return Err(eyre!("analysis failed: {e}")),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }
    Ok(())
}

fn prompt_for_url() -> Result<String> {
    eprint!("Fund website URL: ");
    std::io::stderr().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let line = line.trim().to_string();
    if line.is_empty() {
        return Err(eyre!("no URL given"));
    }
    Ok(line)
}

/// Accept bare domains by assuming HTTPS.
fn parse_fund_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };
    let url = Url::parse(&candidate).map_err(|e| eyre!("invalid URL '{raw}': {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(eyre!("unsupported URL scheme '{}'", url.scheme()));
    }
    Ok(url)
}

// ---------------------------------------------------------------------------
// Text output
// ---------------------------------------------------------------------------

fn print_report(report: &AnalysisReport) {
    let summary = &report.summary;
    println!();
    println!("Portfolio of {}", report.fund_url);
    println!(
        "  {} companies, {} enriched, {:.1}s",
        summary.total,
        summary.matched,
        report.elapsed.as_secs_f64()
    );
    println!();

    let width = report
        .records
        .iter()
        .map(|r| r.display_name.chars().count())
        .max()
        .unwrap_or(0);

    for (i, record) in report.records.iter().enumerate() {
        println!("{:>3}. {:<width$}  {}", i + 1, record.display_name, facts_line(record));
        if let Some(desc) = &record.description {
            println!("     {:<width$}  {desc}", "");
        }
    }

    println!();
    if !summary.categories.is_empty() {
        let parts: Vec<String> = summary
            .categories
            .iter()
            .map(|g| format!("{} ({})", g.category, g.companies.len()))
            .collect();
        println!("  Categories:    {}", parts.join(", "));
    }
    if !summary.stages.is_empty() {
        let parts: Vec<String> = summary
            .stages
            .iter()
            .map(|s| format!("{} ({})", s.stage, s.count))
            .collect();
        println!("  Stages:        {}", parts.join(", "));
    }
    if !summary.top_countries.is_empty() {
        let parts: Vec<String> = summary
            .top_countries
            .iter()
            .map(|c| format!("{} ({})", c.country, c.count))
            .collect();
        println!("  Top countries: {}", parts.join(", "));
    }
    if let Some(avg) = summary.average_funding_usd {
        println!("  Average check: {}", format_usd(avg));
    }

    let unmatched = summary.unmatched();
    if unmatched > 0 {
        println!();
        println!(
            "  {unmatched} {} no enrichment data.",
            if unmatched == 1 { "company has" } else { "companies have" }
        );
    }
    println!();
}

/// One-line fact summary for a record, or a marker when unmatched.
fn facts_line(record: &CompanyRecord) -> String {
    if !record.matched {
        return "[no enrichment data]".to_string();
    }
    let mut parts: Vec<String> = Vec::new();
    if let Some(category) = &record.category {
        parts.push(category.clone());
    }
    if let Some(stage) = record.funding_stage {
        parts.push(stage.to_string());
    }
    if let Some(country) = &record.country {
        parts.push(country.clone());
    }
    if let Some(amount) = record.funding_amount_usd {
        parts.push(format_usd(amount));
    }
    if parts.is_empty() {
        "[matched, no facts]".to_string()
    } else {
        parts.join(" · ")
    }
}

fn format_usd(amount: u64) -> String {
    let value = amount as f64;
    if amount >= 1_000_000_000 {
        format!("${:.1}B", value / 1e9)
    } else if amount >= 1_000_000 {
        format!("${:.1}M", value / 1e6)
    } else if amount >= 1_000 {
        format!("${:.0}K", value / 1e3)
    } else {
        format!("${amount}")
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("static template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_fetched(&self, url: &str, current: usize, total: usize) {
        self.spinner.set_message(format!("Fetched [{current}/{total}] {url}"));
    }

    fn candidates_found(&self, count: usize) {
        self.spinner.set_message(format!("Found {count} candidate companies"));
    }

    fn done(&self, _report: &AnalysisReport) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
