//! In-memory element tree.
//!
//! Element and attribute names are resolved to [`ExpandedName`]s while
//! parsing; `xmlns` declarations are not kept as attributes, the serializer
//! re-emits them on the root element. Comments, processing instructions and
//! the doctype are dropped. CDATA sections become text.

use super::error::ReadFault;
use super::name::ExpandedName;
use quick_xml::NsReader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: ExpandedName,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: ExpandedName,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: ExpandedName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &ExpandedName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == *name)
            .map(|attr| attr.value.as_str())
    }

    /// Text before the first child element.
    pub fn text(&self) -> Option<&str> {
        match self.children.first() {
            Some(Node::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Replace the text before the first child element.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = Node::Text(text.into());
        match self.children.first_mut() {
            Some(first @ Node::Text(_)) => *first = text,
            _ => self.children.insert(0, text),
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(elem) => Some(elem),
            Node::Text(_) => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(elem) => Some(elem),
            Node::Text(_) => None,
        })
    }

    /// Direct children named `name`.
    pub fn children_named<'a, 'n>(
        &'a self,
        name: &'n ExpandedName,
    ) -> impl Iterator<Item = &'a Element> + use<'a, 'n> {
        self.elements().filter(move |elem| elem.name == *name)
    }

    pub fn children_named_mut<'a, 'n>(
        &'a mut self,
        name: &'n ExpandedName,
    ) -> impl Iterator<Item = &'a mut Element> + use<'a, 'n> {
        self.elements_mut().filter(move |elem| elem.name == *name)
    }

    pub fn child(&self, name: &ExpandedName) -> Option<&Element> {
        self.elements().find(|elem| elem.name == *name)
    }

    pub fn child_mut(&mut self, name: &ExpandedName) -> Option<&mut Element> {
        self.elements_mut().find(|elem| elem.name == *name)
    }

    /// Detach every direct child named `name` and return how many were removed.
    ///
    /// Matching positions are collected first and removed back to front. A
    /// whitespace-only text node following a removed element goes with it so
    /// the remaining indentation stays even.
    pub fn remove_children_named(&mut self, name: &ExpandedName) -> usize {
        let positions: Vec<usize> = self
            .children
            .iter()
            .enumerate()
            .filter_map(|(i, node)| match node {
                Node::Element(elem) if elem.name == *name => Some(i),
                _ => None,
            })
            .collect();

        for &i in positions.iter().rev() {
            if matches!(self.children.get(i + 1), Some(Node::Text(t)) if t.trim().is_empty()) {
                self.children.remove(i + 1);
            }
            self.children.remove(i);
        }
        positions.len()
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.children.last_mut() {
            Some(Node::Text(last)) => last.push_str(text),
            _ => self.children.push(Node::Text(text.to_owned())),
        }
    }
}

/// Decode a raw attribute value or text run: UTF-8 check, then entity expansion.
pub(crate) fn decode_value(raw: &[u8]) -> Result<String, ReadFault> {
    let raw = std::str::from_utf8(raw)?;
    Ok(unescape(raw)?.into_owned())
}

/// Parse an uncompressed XML stream into its root element.
pub fn parse<R: BufRead>(input: R) -> Result<Element, ReadFault> {
    let mut reader = NsReader::from_reader(input);
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|source| ReadFault::Syntax {
                position: reader.error_position() as u64,
                source,
            })?;

        match event {
            Event::Start(ref start) => {
                let elem = open_element(&reader, start)?;
                stack.push(elem);
            }
            Event::Empty(ref start) => {
                let elem = open_element(&reader, start)?;
                attach(elem, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let elem = stack
                    .pop()
                    .ok_or_else(|| ReadFault::Malformed("unbalanced end tag".into()))?;
                attach(elem, &mut stack, &mut root)?;
            }
            Event::Text(ref text) => {
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(&decode_value(text)?);
                }
            }
            Event::GeneralRef(ref entity) => {
                if let Some(parent) = stack.last_mut() {
                    let raw = std::str::from_utf8(entity)?;
                    parent.push_text(&unescape(&format!("&{raw};"))?);
                }
            }
            Event::CData(ref data) => {
                if let Some(parent) = stack.last_mut() {
                    parent.push_text(std::str::from_utf8(data)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(ReadFault::Malformed(format!(
            "unexpected end of document inside <{}>",
            stack.last().map(|e| e.name.local.as_str()).unwrap_or_default()
        )));
    }
    root.ok_or_else(|| ReadFault::Malformed("document has no root element".into()))
}

fn attach(
    elem: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
) -> Result<(), ReadFault> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(elem)),
        None if root.is_none() => *root = Some(elem),
        None => {
            return Err(ReadFault::Malformed(
                "document has more than one root element".into(),
            ));
        }
    }
    Ok(())
}

fn open_element<R>(reader: &NsReader<R>, start: &BytesStart<'_>) -> Result<Element, ReadFault> {
    let (resolved, local) = reader.resolve_element(start.name());
    let name = ExpandedName {
        uri: bound_uri(resolved)?,
        local: std::str::from_utf8(local.as_ref())?.to_owned(),
    };

    let mut elem = Element::new(name);
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let (resolved, local) = reader.resolve_attribute(attr.key);
        elem.attributes.push(Attribute {
            name: ExpandedName {
                uri: bound_uri(resolved)?,
                local: std::str::from_utf8(local.as_ref())?.to_owned(),
            },
            value: decode_value(&attr.value)?,
        });
    }
    Ok(elem)
}

fn bound_uri(resolved: ResolveResult<'_>) -> Result<Option<String>, ReadFault> {
    match resolved {
        ResolveResult::Bound(Namespace(uri)) => Ok(Some(std::str::from_utf8(uri)?.to_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(ReadFault::Malformed(format!(
            "undeclared namespace prefix `{}`",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}
