//! Error types for reading, checking and writing ledgers.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures of a clean run.
#[derive(Debug, Error)]
pub enum CleanError {
    #[error("cannot read ledger `{0}`")]
    Read(PathBuf, #[source] ReadFault),

    #[error("malformed ledger: {0}")]
    Structure(String),

    #[error("cannot write `{0}`")]
    Write(PathBuf, #[source] io::Error),
}

/// Why an input document could not be loaded.
#[derive(Debug, Error)]
pub enum ReadFault {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("XML syntax error at byte {position}")]
    Syntax {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("invalid attribute")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("invalid escape sequence")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("document is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("{0}")]
    Malformed(String),
}
