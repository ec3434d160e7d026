//! Run configuration built from command-line arguments.
//!
//! The tool reads no config file and no environment variables: every setting
//! comes from [`Cli`] and is validated here before the pipeline starts.

mod error;

pub use error::{ConfigDiagnostics, ConfigError};

use crate::cli::Cli;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Compression level used for `.gnucash` output unless overridden.
pub const DEFAULT_LEVEL: u32 = 9;

/// How the sanitizer treats a missing transaction counter or book guid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SanitizeMode {
    /// Log the anomaly and keep going.
    #[default]
    Lenient,
    /// Abort with a structure error.
    Strict,
}

impl SanitizeMode {
    pub const fn is_strict(self) -> bool {
        matches!(self, Self::Strict)
    }
}

/// Settings for a single clean run.
#[derive(Debug, Clone)]
pub struct CleanConfig {
    /// Gzip-compressed ledger to read
    pub input: PathBuf,
    /// Output base path; `.xml` and `.gnucash` are appended
    pub output: PathBuf,
    pub mode: SanitizeMode,
    /// Gzip level (0-9) for the `.gnucash` artifact
    pub level: u32,
}

impl CleanConfig {
    /// Build and validate the configuration from parsed arguments.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = Self {
            input: cli.input.clone(),
            output: cli.output.clone(),
            mode: if cli.strict {
                SanitizeMode::Strict
            } else {
                SanitizeMode::Lenient
            },
            level: cli.level,
        };
        config.validate()?;
        Ok(config)
    }

    /// Collects all argument problems and reports them at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        if !self.input.exists() {
            diag.error("input", format!("`{}` does not exist", self.input.display()));
        } else if !self.input.is_file() {
            diag.error("input", format!("`{}` is not a file", self.input.display()));
        }

        if self.output.as_os_str().is_empty() {
            diag.error("output", "output base path is empty");
        } else if self.output.is_dir() {
            diag.error_with_hint(
                "output",
                format!("`{}` is a directory", self.output.display()),
                "pass a base name without extension, e.g. `shared/ledger`",
            );
        }

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

/// Append `.ext` to `base` without touching an existing extension.
pub fn with_suffix(base: &Path, ext: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}
