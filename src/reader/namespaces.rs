//! In-scope namespace bindings
//!
//! A flat stack of (prefix, URI) pairs. Each element start records the
//! stack height and restores it when the element closes, so lookup walks
//! from the innermost declaration outwards.

use crate::core::strings::{Atom, NameTable};

pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Atoms the reader compares against on the hot path
#[derive(Debug, Clone)]
pub struct WellKnown {
    pub empty: Atom,
    pub xml: Atom,
    pub xmlns: Atom,
    pub xml_namespace: Atom,
    pub xmlns_namespace: Atom,
    /// Qualified names, so they match whether or not prefixes are split
    pub xml_space: Atom,
    pub xml_lang: Atom,
}

impl WellKnown {
    pub fn new(table: &NameTable) -> Self {
        WellKnown {
            empty: table.empty(),
            xml: table.add("xml"),
            xmlns: table.add("xmlns"),
            xml_namespace: table.add(XML_NAMESPACE),
            xmlns_namespace: table.add(XMLNS_NAMESPACE),
            xml_space: table.add("xml:space"),
            xml_lang: table.add("xml:lang"),
        }
    }
}

#[derive(Debug)]
pub struct NamespaceManager {
    bindings: Vec<(Atom, Atom)>,
    known: WellKnown,
}

impl NamespaceManager {
    pub fn new(known: WellKnown) -> Self {
        NamespaceManager {
            bindings: Vec::new(),
            known,
        }
    }

    /// Current stack height, to be restored with `pop_to`
    #[inline]
    pub fn mark(&self) -> usize {
        self.bindings.len()
    }

    pub fn pop_to(&mut self, mark: usize) {
        self.bindings.truncate(mark);
    }

    /// Bind `prefix` (empty for the default namespace) to `uri`
    pub fn declare(&mut self, prefix: Atom, uri: Atom) {
        self.bindings.push((prefix, uri));
    }

    /// Resolve an interned prefix
    pub fn lookup(&self, prefix: &Atom) -> Option<&Atom> {
        if prefix.ptr_eq(&self.known.xml) {
            return Some(&self.known.xml_namespace);
        }
        if prefix.ptr_eq(&self.known.xmlns) {
            return Some(&self.known.xmlns_namespace);
        }
        let found = self
            .bindings
            .iter()
            .rev()
            .find(|(p, _)| p.ptr_eq(prefix))
            .map(|(_, uri)| uri);
        match found {
            Some(uri) => Some(uri),
            None if prefix.is_empty() => Some(&self.known.empty),
            None => None,
        }
    }

    /// Resolve a prefix given as text
    pub fn lookup_str(&self, prefix: &str) -> Option<&str> {
        match prefix {
            "xml" => return Some(XML_NAMESPACE),
            "xmlns" => return Some(XMLNS_NAMESPACE),
            _ => {}
        }
        let found = self
            .bindings
            .iter()
            .rev()
            .find(|(p, _)| p.as_str() == prefix)
            .map(|(_, uri)| uri.as_str());
        match found {
            Some(uri) => Some(uri),
            None if prefix.is_empty() => Some(""),
            None => None,
        }
    }
}
