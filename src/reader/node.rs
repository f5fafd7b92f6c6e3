//! Node records
//!
//! One `NodeData` per depth level plus one per attribute of the current
//! element. Values either own their text or point into the character
//! buffer; a buffer slice is only valid while the buffer version matches.

use std::borrow::Cow;

use super::{NodeType, XmlSpace};
use crate::core::strings::Atom;

/// Text of a node
#[derive(Debug, Clone, Default)]
pub enum NodeValue {
    #[default]
    Empty,
    Owned(String),
    /// `len` bytes at `start` in the buffer, valid while its version is `version`
    Slice { version: u64, start: usize, len: usize },
}

impl NodeValue {
    /// Resolve against the character buffer
    pub fn as_str<'a>(&'a self, chars: &'a [u8], version: u64) -> Cow<'a, str> {
        match self {
            NodeValue::Empty => Cow::Borrowed(""),
            NodeValue::Owned(s) => Cow::Borrowed(s.as_str()),
            NodeValue::Slice { version: v, start, len } => {
                match chars.get(*start..start + len) {
                    Some(bytes) if *v == version => String::from_utf8_lossy(bytes),
                    _ => Cow::Borrowed(""),
                }
            }
        }
    }

    /// Replace a buffer slice with an owned copy
    pub fn materialize(&mut self, chars: &[u8], version: u64) {
        if let NodeValue::Slice { .. } = self {
            let owned = self.as_str(chars, version).into_owned();
            *self = NodeValue::Owned(owned);
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            NodeValue::Empty => true,
            NodeValue::Owned(s) => s.is_empty(),
            NodeValue::Slice { len, .. } => *len == 0,
        }
    }
}

/// State of one node slot
#[derive(Debug, Clone)]
pub struct NodeData {
    pub node_type: NodeType,
    pub local_name: Atom,
    pub prefix: Atom,
    pub namespace_uri: Atom,
    pub name: Atom,
    pub value: NodeValue,
    pub depth: usize,
    pub is_empty_element: bool,
    pub line: usize,
    pub column: usize,
    pub quote_char: char,
    /// Literal runs and expanded references of an attribute value, in
    /// order; empty when the value had no references
    pub chunks: Vec<String>,
}

impl NodeData {
    pub fn new(empty: &Atom) -> Self {
        NodeData {
            node_type: NodeType::None,
            local_name: empty.clone(),
            prefix: empty.clone(),
            namespace_uri: empty.clone(),
            name: empty.clone(),
            value: NodeValue::Empty,
            depth: 0,
            is_empty_element: false,
            line: 0,
            column: 0,
            quote_char: '"',
            chunks: Vec::new(),
        }
    }

    /// Reset to a nameless node of the given type
    pub fn reset(&mut self, node_type: NodeType, empty: &Atom, depth: usize) {
        self.node_type = node_type;
        self.local_name = empty.clone();
        self.prefix = empty.clone();
        self.namespace_uri = empty.clone();
        self.name = empty.clone();
        self.value = NodeValue::Empty;
        self.depth = depth;
        self.is_empty_element = false;
        self.quote_char = '"';
        self.chunks.clear();
    }

    #[inline]
    pub fn set_position(&mut self, line: usize, column: usize) {
        self.line = line;
        self.column = column;
    }
}

/// Scope data pushed for every element start
#[derive(Debug, Clone)]
pub struct ElementScope {
    pub xml_space: XmlSpace,
    pub xml_lang: Atom,
    /// Namespace binding count to restore on exit
    pub namespace_mark: usize,
}
