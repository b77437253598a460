//! Navigator CLI: lead enrichment from the command line.
//!
//! Imports prospect lists, enriches them with contact details and an
//! org-hierarchy estimate, and drafts outreach emails.

mod commands;
mod rows;

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
