//! Namespace declaration scanning.
//!
//! [`extract_namespaces`] streams the decompressed document and records every
//! `xmlns`/`xmlns:prefix` declaration without building a tree.

use super::error::{CleanError, ReadFault};
use super::tree::decode_value;
use flate2::read::GzDecoder;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::PrefixDeclaration;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Ordered prefix → URI mapping. The empty prefix is the default namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceMap {
    entries: Vec<(String, String)>,
}

impl NamespaceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `prefix` to `uri`. A redeclared prefix keeps its position and takes the new URI.
    pub fn insert(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        let prefix = prefix.into();
        let uri = uri.into();
        match self.entries.iter_mut().find(|(p, _)| *p == prefix) {
            Some(entry) => entry.1 = uri,
            None => self.entries.push((prefix, uri)),
        }
    }

    pub fn uri(&self, prefix: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    /// First prefix bound to `uri`.
    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, u)| u == uri)
            .map(|(prefix, _)| prefix.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Collect the namespace declarations of a gzip-compressed document.
pub fn extract_namespaces(path: &Path) -> Result<NamespaceMap, CleanError> {
    let read = || -> Result<NamespaceMap, ReadFault> {
        let file = File::open(path)?;
        scan_namespaces(BufReader::new(GzDecoder::new(file)))
    };
    read().map_err(|e| CleanError::Read(path.to_path_buf(), e))
}

/// Incremental scan of an uncompressed XML stream.
///
/// The whole document is read so that syntax errors past the last
/// declaration are still reported.
pub fn scan_namespaces<R: BufRead>(input: R) -> Result<NamespaceMap, ReadFault> {
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::new();
    let mut namespaces = NamespaceMap::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|source| ReadFault::Syntax {
                position: reader.error_position() as u64,
                source,
            })?;
        match event {
            Event::Start(ref elem) | Event::Empty(ref elem) => {
                collect_declarations(elem, &mut namespaces)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(namespaces)
}

fn collect_declarations(elem: &BytesStart<'_>, namespaces: &mut NamespaceMap) -> Result<(), ReadFault> {
    for attr in elem.attributes() {
        let attr = attr?;
        let prefix = match attr.key.as_namespace_binding() {
            Some(PrefixDeclaration::Default) => String::new(),
            Some(PrefixDeclaration::Named(prefix)) => std::str::from_utf8(prefix)?.to_owned(),
            None => continue,
        };
        namespaces.insert(prefix, decode_value(&attr.value)?);
    }
    Ok(())
}
