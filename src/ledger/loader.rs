//! Loading a compressed ledger into memory.

use super::error::{CleanError, ReadFault};
use super::name::LedgerNames;
use super::namespace::{NamespaceMap, extract_namespaces};
use super::sanitize::{SanitizeReport, Sanitizer};
use super::serialize::Serializer;
use super::tree::{self, Element};
use crate::config::SanitizeMode;
use crate::debug;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// A parsed ledger with its book located.
#[derive(Debug, Clone)]
pub struct LedgerFile {
    pub root: Element,
    pub names: LedgerNames,
    pub namespaces: NamespaceMap,
}

impl LedgerFile {
    /// Read `path`, registering its namespace prefixes with `serializer`.
    pub fn load(path: &Path, serializer: &mut Serializer) -> Result<Self, CleanError> {
        let namespaces = extract_namespaces(path)?;
        for (prefix, uri) in namespaces.iter() {
            serializer.register_namespace(prefix, uri);
        }

        let root = read_tree(path).map_err(|e| CleanError::Read(path.to_path_buf(), e))?;
        debug!("load"; "parsed <{}> with {} namespaces", root.name.local, namespaces.len());
        Self::from_parts(root, namespaces)
    }

    /// Resolve ledger names and check that the root holds a book.
    pub fn from_parts(root: Element, namespaces: NamespaceMap) -> Result<Self, CleanError> {
        let names = LedgerNames::resolve(&namespaces)?;
        if root.child(&names.book).is_none() {
            return Err(CleanError::Structure(format!(
                "no book element {} under <{}>",
                names.book, root.name.local
            )));
        }
        Ok(Self {
            root,
            names,
            namespaces,
        })
    }

    /// Run all sanitizing passes over the book.
    pub fn sanitize(&mut self, mode: SanitizeMode) -> Result<SanitizeReport, CleanError> {
        let Self { root, names, .. } = self;
        let book = root
            .child_mut(&names.book)
            .ok_or_else(|| CleanError::Structure(format!("no book element {}", names.book)))?;
        Sanitizer::new(names, mode).run(book)
    }
}

fn read_tree(path: &Path) -> Result<Element, ReadFault> {
    let file = File::open(path)?;
    tree::parse(BufReader::new(GzDecoder::new(file)))
}
