//! Writing the sanitized tree as `.xml` and `.gnucash`.

use super::error::CleanError;
use super::name::ExpandedName;
use super::namespace::NamespaceMap;
use super::tree::{Element, Node};
use crate::config::with_suffix;
use crate::debug;
use flate2::{Compression, write::GzEncoder};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Paths of the two artifacts produced by [`Serializer::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Written {
    pub xml: PathBuf,
    pub gnucash: PathBuf,
}

/// Serializer configured with the prefixes found in the input document.
#[derive(Debug, Clone)]
pub struct Serializer {
    namespaces: NamespaceMap,
    level: Compression,
}

/// Prefix assignment for one document.
struct Prefixes {
    /// Declarations emitted on the root element, in order
    declarations: Vec<(String, String)>,
    by_uri: HashMap<String, String>,
    /// Attribute prefixes; never empty, since the default namespace does not
    /// apply to attributes
    attr_by_uri: HashMap<String, String>,
}

impl Prefixes {
    fn qualify(&self, name: &ExpandedName) -> String {
        qualified(&self.by_uri, name)
    }

    fn qualify_attribute(&self, name: &ExpandedName) -> String {
        qualified(&self.attr_by_uri, name)
    }
}

fn qualified(prefixes: &HashMap<String, String>, name: &ExpandedName) -> String {
    match name.uri.as_ref().and_then(|uri| prefixes.get(uri)) {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{}", name.local),
        _ => name.local.clone(),
    }
}

impl Serializer {
    pub fn new(level: u32) -> Self {
        Self {
            namespaces: NamespaceMap::new(),
            level: Compression::new(level),
        }
    }

    /// Make `prefix` the output prefix for `uri`.
    pub fn register_namespace(&mut self, prefix: &str, uri: &str) {
        debug!("load"; "register xmlns:{} = {}", prefix, uri);
        self.namespaces.insert(prefix, uri);
    }

    /// Write `<base>.xml` and `<base>.gnucash` with identical content.
    pub fn write(&self, root: &Element, base: &Path) -> Result<Written, CleanError> {
        let written = Written {
            xml: with_suffix(base, "xml"),
            gnucash: with_suffix(base, "gnucash"),
        };
        let bytes = self
            .render(root)
            .map_err(|e| CleanError::Write(written.xml.clone(), e))?;

        fs::write(&written.xml, &bytes).map_err(|e| CleanError::Write(written.xml.clone(), e))?;
        self.write_gzip(&written.gnucash, &bytes)
            .map_err(|e| CleanError::Write(written.gnucash.clone(), e))?;

        Ok(written)
    }

    fn write_gzip(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let file = File::create(path)?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), self.level);
        encoder.write_all(bytes)?;
        encoder.finish()?.flush()
    }

    /// Render the document: XML declaration, then the root element with every
    /// namespace it uses declared on it.
    pub fn render(&self, root: &Element) -> io::Result<Vec<u8>> {
        let prefixes = self.assign_prefixes(root);
        let mut writer = Writer::new(Vec::new());

        emit(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)),
        )?;
        writer.get_mut().push(b'\n');
        write_element(&mut writer, root, &prefixes, true)?;
        writer.get_mut().push(b'\n');

        Ok(writer.into_inner())
    }

    /// Registered prefixes for used URIs in registration order, then
    /// generated `nsN` prefixes for anything unregistered.
    ///
    /// A URI used on attributes whose element prefix is the default namespace
    /// gets a second declaration: another registered prefix if there is one,
    /// a generated one otherwise.
    fn assign_prefixes(&self, root: &Element) -> Prefixes {
        let mut used = Vec::new();
        let mut on_attributes = Vec::new();
        collect_uris(root, &mut used, &mut on_attributes);

        let mut declarations: Vec<(String, String)> = self
            .namespaces
            .iter()
            .filter(|(_, uri)| used.iter().any(|u| u == uri))
            .filter(|(prefix, uri)| self.namespaces.prefix_for(uri) == Some(*prefix))
            .map(|(prefix, uri)| (prefix.to_owned(), uri.to_owned()))
            .collect();

        let mut generated = 0;
        for uri in used {
            if self.namespaces.prefix_for(&uri).is_none() {
                let prefix = self.fresh_prefix(&mut generated);
                debug!("write"; "no registered prefix for {}, using {}", uri, prefix);
                declarations.push((prefix, uri));
            }
        }

        let by_uri: HashMap<String, String> = declarations
            .iter()
            .map(|(prefix, uri)| (uri.clone(), prefix.clone()))
            .collect();

        let mut attr_by_uri = HashMap::new();
        for uri in on_attributes {
            let prefix = match by_uri.get(&uri) {
                Some(prefix) if !prefix.is_empty() => prefix.clone(),
                _ => {
                    let prefix = self
                        .namespaces
                        .iter()
                        .find(|(prefix, bound)| !prefix.is_empty() && *bound == uri)
                        .map(|(prefix, _)| prefix.to_owned())
                        .unwrap_or_else(|| self.fresh_prefix(&mut generated));
                    debug!("write"; "attributes in {} use prefix {}", uri, prefix);
                    declarations.push((prefix.clone(), uri.clone()));
                    prefix
                }
            };
            attr_by_uri.insert(uri, prefix);
        }

        Prefixes {
            declarations,
            by_uri,
            attr_by_uri,
        }
    }

    /// Next `nsN` not taken by a registered prefix.
    fn fresh_prefix(&self, generated: &mut usize) -> String {
        loop {
            let prefix = format!("ns{generated}");
            *generated += 1;
            if self.namespaces.uri(&prefix).is_none() {
                return prefix;
            }
        }
    }
}

fn collect_uris(elem: &Element, used: &mut Vec<String>, on_attributes: &mut Vec<String>) {
    note_uri(&elem.name, used);
    for attr in &elem.attributes {
        note_uri(&attr.name, used);
        note_uri(&attr.name, on_attributes);
    }
    for child in elem.elements() {
        collect_uris(child, used, on_attributes);
    }
}

fn note_uri(name: &ExpandedName, seen: &mut Vec<String>) {
    if let Some(uri) = &name.uri
        && !seen.contains(uri)
    {
        seen.push(uri.clone());
    }
}

fn write_element<W: Write>(
    writer: &mut Writer<W>,
    elem: &Element,
    prefixes: &Prefixes,
    is_root: bool,
) -> io::Result<()> {
    let name = prefixes.qualify(&elem.name);
    let mut start = BytesStart::new(name.as_str());

    if is_root {
        for (prefix, uri) in &prefixes.declarations {
            let key = if prefix.is_empty() {
                "xmlns".to_owned()
            } else {
                format!("xmlns:{prefix}")
            };
            start.push_attribute((key.as_str(), uri.as_str()));
        }
    }
    for attr in &elem.attributes {
        let key = prefixes.qualify_attribute(&attr.name);
        start.push_attribute((key.as_str(), attr.value.as_str()));
    }

    if elem.children.is_empty() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    for child in &elem.children {
        match child {
            Node::Element(child) => write_element(writer, child, prefixes, false)?,
            Node::Text(text) => emit(writer, Event::Text(BytesText::new(text)))?,
        }
    }
    emit(writer, Event::End(BytesEnd::new(name.as_str())))
}

#[inline]
fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> io::Result<()> {
    writer.write_event(event).map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::tree::{Attribute, parse};
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    const DOC: &str = r#"<gnc-v2 xmlns:gnc="urn:gnc" xmlns:cd="urn:cd"><gnc:count-data cd:type="book">1</gnc:count-data><gnc:note>a &amp; b</gnc:note><gnc:empty/></gnc-v2>"#;

    fn serializer() -> Serializer {
        let mut serializer = Serializer::new(9);
        serializer.register_namespace("gnc", "urn:gnc");
        serializer.register_namespace("cd", "urn:cd");
        serializer.register_namespace("unused", "urn:unused");
        serializer
    }

    #[test]
    fn test_render_uses_registered_prefixes() {
        let root = parse(DOC.as_bytes()).unwrap();
        let out = String::from_utf8(serializer().render(&root).unwrap()).unwrap();

        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n"));
        assert!(out.contains(r#"<gnc-v2 xmlns:gnc="urn:gnc" xmlns:cd="urn:cd">"#));
        assert!(out.contains(r#"<gnc:count-data cd:type="book">1</gnc:count-data>"#));
        assert!(out.contains("<gnc:note>a &amp; b</gnc:note>"));
        assert!(out.contains("<gnc:empty/>"));
        assert!(!out.contains("urn:unused"));
    }

    #[test]
    fn test_render_generates_missing_prefixes() {
        let root = parse(DOC.as_bytes()).unwrap();
        let out = String::from_utf8(Serializer::new(9).render(&root).unwrap()).unwrap();

        assert!(out.contains(r#"xmlns:ns0="urn:gnc" xmlns:ns1="urn:cd""#));
        assert!(out.contains("<ns0:count-data ns1:type=\"book\">"));
    }

    #[test]
    fn test_render_reparses_to_same_tree() {
        let root = parse(DOC.as_bytes()).unwrap();
        let out = serializer().render(&root).unwrap();
        assert_eq!(parse(out.as_slice()).unwrap(), root);
    }

    #[test]
    fn test_attribute_avoids_default_namespace() {
        let doc = r#"<r xmlns="urn:d" xmlns:d="urn:d"><x d:a="1"/></r>"#;
        let root = parse(doc.as_bytes()).unwrap();
        let mut serializer = Serializer::new(9);
        serializer.register_namespace("", "urn:d");
        serializer.register_namespace("d", "urn:d");

        let out = serializer.render(&root).unwrap();
        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.contains(r#"<r xmlns="urn:d" xmlns:d="urn:d">"#));
        assert!(text.contains(r#"<x d:a="1"/>"#));
        assert_eq!(parse(out.as_slice()).unwrap(), root);
    }

    #[test]
    fn test_attribute_in_default_namespace_gets_generated_prefix() {
        let mut x = Element::new(ExpandedName::new("urn:d", "x"));
        x.attributes.push(Attribute {
            name: ExpandedName::new("urn:d", "a"),
            value: "1".into(),
        });
        let mut root = Element::new(ExpandedName::new("urn:d", "r"));
        root.children.push(Node::Element(x));

        let mut serializer = Serializer::new(9);
        serializer.register_namespace("", "urn:d");
        serializer.register_namespace("ns0", "urn:taken");

        let out = serializer.render(&root).unwrap();
        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.contains(r#"<r xmlns="urn:d" xmlns:ns1="urn:d">"#));
        assert!(text.contains(r#"<x ns1:a="1"/>"#));
        assert_eq!(parse(out.as_slice()).unwrap(), root);
    }

    #[test]
    fn test_write_both_artifacts() {
        let dir = TempDir::new().unwrap();
        let root = parse(DOC.as_bytes()).unwrap();
        let written = serializer().write(&root, &dir.path().join("out")).unwrap();

        assert_eq!(written.xml, dir.path().join("out.xml"));
        assert_eq!(written.gnucash, dir.path().join("out.gnucash"));

        let xml = fs::read(&written.xml).unwrap();
        let mut unzipped = Vec::new();
        GzDecoder::new(File::open(&written.gnucash).unwrap())
            .read_to_end(&mut unzipped)
            .unwrap();
        assert_eq!(xml, unzipped);
    }

    #[test]
    fn test_write_unwritable_target() {
        let dir = TempDir::new().unwrap();
        let root = parse(DOC.as_bytes()).unwrap();
        let base = dir.path().join("missing").join("out");

        let err = serializer().write(&root, &base).unwrap_err();
        assert!(matches!(err, CleanError::Write(path, _) if path == with_suffix(&base, "xml")));
    }
}
