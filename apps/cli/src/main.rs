//! RosterSync CLI — spreadsheet-to-website team roster synchronization.
//!
//! Reads the team sheet, validates and assembles the roster, downloads member
//! images, and publishes the databag to the website repository via a pull
//! request.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets commonly arrive via a local .env during development.
    dotenvy::dotenv().ok();
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
