//! PortfolioScout CLI: portfolio extraction and enrichment for VC fund sites.
//!
//! Finds the companies a fund lists on its website, looks each one up on
//! the public web, and prints a portfolio summary.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
