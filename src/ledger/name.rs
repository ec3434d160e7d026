//! Namespace-qualified names used to locate ledger elements.
//!
//! Names are resolved once per document against the document's own prefix
//! declarations, so lookups compare `(uri, local)` pairs instead of prefixed
//! strings.

use super::error::CleanError;
use super::namespace::NamespaceMap;
use std::fmt;

/// GnuCash namespace URIs. All but `gnc` are fallbacks for undeclared prefixes.
pub const GNC_URI: &str = "http://www.gnucash.org/XML/gnc";
pub const BOOK_URI: &str = "http://www.gnucash.org/XML/book";
pub const CD_URI: &str = "http://www.gnucash.org/XML/cd";
pub const SX_URI: &str = "http://www.gnucash.org/XML/sx";

/// An element or attribute name with its namespace resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedName {
    pub uri: Option<String>,
    pub local: String,
}

impl ExpandedName {
    pub fn new(uri: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            local: local.into(),
        }
    }

    /// A name outside any namespace (plain attributes like `type`).
    pub fn unqualified(local: impl Into<String>) -> Self {
        Self {
            uri: None,
            local: local.into(),
        }
    }
}

/// Clark notation: `{uri}local`.
impl fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.uri {
            Some(uri) => write!(f, "{{{uri}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Every name the sanitizer looks up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerNames {
    pub book: ExpandedName,
    pub transaction: ExpandedName,
    pub count_data: ExpandedName,
    /// `cd:type` on count-data nodes
    pub count_type: ExpandedName,
    pub book_id: ExpandedName,
    /// plain `type` on the book id
    pub id_type: ExpandedName,
    pub schedxaction: ExpandedName,
    pub sx_enabled: ExpandedName,
}

impl LedgerNames {
    /// Resolve the `gnc`, `book`, `cd` and `sx` prefixes against `namespaces`.
    ///
    /// `gnc` must be declared by the document; the others fall back to the
    /// standard GnuCash URIs.
    pub fn resolve(namespaces: &NamespaceMap) -> Result<Self, CleanError> {
        let gnc = namespaces.uri("gnc").ok_or_else(|| {
            CleanError::Structure("namespace prefix `gnc` is not declared".into())
        })?;
        let uri = |prefix: &str, fallback: &str| -> String {
            namespaces.uri(prefix).unwrap_or(fallback).to_owned()
        };
        let book = uri("book", BOOK_URI);
        let cd = uri("cd", CD_URI);
        let sx = uri("sx", SX_URI);

        Ok(Self {
            book: ExpandedName::new(gnc, "book"),
            transaction: ExpandedName::new(gnc, "transaction"),
            count_data: ExpandedName::new(gnc, "count-data"),
            count_type: ExpandedName::new(cd, "type"),
            book_id: ExpandedName::new(book, "id"),
            id_type: ExpandedName::unqualified("type"),
            schedxaction: ExpandedName::new(gnc, "schedxaction"),
            sx_enabled: ExpandedName::new(sx, "enabled"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_clark_notation() {
        assert_eq!(ExpandedName::new(GNC_URI, "book").to_string(), format!("{{{GNC_URI}}}book"));
        assert_eq!(ExpandedName::unqualified("type").to_string(), "type");
    }

    #[test]
    fn test_resolve_uses_document_prefixes() {
        let mut ns = NamespaceMap::new();
        ns.insert("gnc", "urn:custom:gnc");
        ns.insert("sx", SX_URI);

        let names = LedgerNames::resolve(&ns).unwrap();
        assert_eq!(names.book, ExpandedName::new("urn:custom:gnc", "book"));
        assert_eq!(names.sx_enabled, ExpandedName::new(SX_URI, "enabled"));
        // undeclared prefixes fall back to the standard URIs
        assert_eq!(names.count_type, ExpandedName::new(CD_URI, "type"));
        assert_eq!(names.id_type.uri, None);
    }

    #[test]
    fn test_resolve_requires_gnc_prefix() {
        let mut ns = NamespaceMap::new();
        ns.insert("g", GNC_URI);

        let err = LedgerNames::resolve(&ns).unwrap_err();
        assert!(matches!(err, CleanError::Structure(msg) if msg.contains("`gnc`")));
    }
}
