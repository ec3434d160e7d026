//! gnucash-clean - strip private transactions from a GnuCash ledger.

mod cli;
mod config;
mod ledger;
mod logger;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, clean::clean_ledger};
use config::CleanConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = CleanConfig::from_cli(&cli)?;
    clean_ledger(&config).map(|_| ())
}
