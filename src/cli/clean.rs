//! The clean command: load, sanitize, write.

use crate::config::CleanConfig;
use crate::ledger::{LedgerFile, SanitizeReport, Serializer};
use crate::{debug, log};
use anyhow::Result;
use std::path::Path;

/// Run the whole pipeline for `config`. Nothing is written unless every
/// earlier stage succeeded.
pub fn clean_ledger(config: &CleanConfig) -> Result<SanitizeReport> {
    log!("input"; "{}", resolved(&config.input).display());
    log!("output"; "{}", resolved(&config.output).display());

    let mut serializer = Serializer::new(config.level);
    let mut ledger = LedgerFile::load(&config.input, &mut serializer)?;
    debug!("load"; "{} namespace prefixes registered", ledger.namespaces.len());

    let report = ledger.sanitize(config.mode)?;
    debug!(
        "clean";
        "counter reset: {}, new guid: {}",
        report.counter_reset,
        report.id_replaced
    );
    let written = serializer.write(&ledger.root, &config.output)?;
    debug!("write"; "{}", written.xml.display());
    debug!("write"; "{}", written.gnucash.display());

    log!(
        "done";
        "{} transactions removed, {} schedules disabled",
        report.transactions_removed,
        report.schedules_disabled
    );
    Ok(report)
}

fn resolved(path: &Path) -> std::path::PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
