//! Harvester CLI — citation collection and export aggregation for the
//! ComBase browser.
//!
//! Extracts source citations from saved result pages and merges the
//! downloaded Excel exports into one combined workbook.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
