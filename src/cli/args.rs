//! Command-line interface definitions.

use crate::config::DEFAULT_LEVEL;
use clap::{ColorChoice, Parser};
use std::path::PathBuf;

/// Strip transactions from a GnuCash ledger, keeping accounts, commodities
/// and scheduled transactions.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Gzip-compressed GnuCash file to sanitize
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output base path; `.xml` and `.gnucash` are appended
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// Fail instead of warning when the transaction counter or book guid is missing
    #[arg(long)]
    pub strict: bool,

    /// Gzip compression level for the `.gnucash` output
    #[arg(short, long, default_value_t = DEFAULT_LEVEL, value_parser = clap::value_parser!(u32).range(0..=9))]
    pub level: u32,

    /// Enable verbose output for debugging
    #[arg(short, long)]
    pub verbose: bool,

    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_positionals() {
        let cli = Cli::try_parse_from(["gnucash-clean", "book.gnucash", "out/shared"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("book.gnucash"));
        assert_eq!(cli.output, PathBuf::from("out/shared"));
        assert_eq!(cli.level, DEFAULT_LEVEL);
        assert!(!cli.strict);
    }

    #[test]
    fn test_parse_options() {
        let cli = Cli::try_parse_from([
            "gnucash-clean",
            "--strict",
            "-l",
            "1",
            "-v",
            "in.gnucash",
            "out",
        ])
        .unwrap();
        assert!(cli.strict);
        assert!(cli.verbose);
        assert_eq!(cli.level, 1);
    }

    #[test]
    fn test_level_out_of_range() {
        assert!(Cli::try_parse_from(["gnucash-clean", "-l", "10", "in", "out"]).is_err());
    }

    #[test]
    fn test_output_required() {
        assert!(Cli::try_parse_from(["gnucash-clean", "in.gnucash"]).is_err());
    }
}
