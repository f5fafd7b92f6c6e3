//! Streaming XML text reader
//!
//! `XmlTextReader` pulls bytes from any `Read` source, decodes them into a
//! character buffer and tokenizes one node per `read` call. Node records
//! live in a stack indexed by depth; the attributes of the current element
//! sit in the slots right after it.
//!
//! The tokenizer itself is split by concern:
//! - `content`: document/element content, text, comments, CDATA, PIs,
//!   the XML declaration
//! - `markup`: start tags, attributes, namespaces, end tags
//! - `incremental`: `read_chars` and `read_value_chunk`

use std::borrow::Cow;
use std::collections::HashSet;
use std::io::Read;

use tracing::{debug, trace};

use super::contract::XmlReader;
use super::incremental::IncrementalRead;
use super::namespaces::{NamespaceManager, WellKnown};
use super::node::{ElementScope, NodeData, NodeValue};
use super::{NodeType, ReadState, XmlSpace};
use crate::core::buffer::BufferBuilder;
use crate::core::state::ParsingState;
use crate::core::strings::NameTable;
use crate::error::{Result, XmlError, XmlErrorKind};
use crate::settings::ReaderSettings;

/// What the next `read` call has to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ParsingFunction {
    /// Detect the encoding and look for the XML declaration
    Initial,
    DocumentContent,
    ElementContent,
    /// Leave the scope of the end tag just reported
    PopElementContext,
    /// Leave the scope of the empty element just reported
    PopEmptyElementContext,
    /// Iterating the pieces of an attribute value
    InReadAttributeValue,
    /// `read_chars` is consuming the current element
    InIncrementalRead,
    Eof,
    Error,
    Closed,
}

/// Which record the accessors report on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Cursor {
    Node,
    /// Attribute `n` of the current element
    Attribute(usize),
    /// Piece `chunk` of attribute `attr`'s value
    AttributeValue { attr: usize, chunk: usize },
}

/// Non-validating pull parser over a byte source
pub struct XmlTextReader<R> {
    pub(super) ps: ParsingState<R>,
    pub(super) settings: ReaderSettings,
    pub(super) name_table: NameTable,
    pub(super) known: WellKnown,
    pub(super) namespaces: NamespaceManager,

    /// `nodes[index]` is the current node, attributes follow it
    pub(super) nodes: Vec<NodeData>,
    pub(super) index: usize,
    pub(super) attr_count: usize,
    /// The element just reported has content; descend on the next read
    pub(super) enter_pending: bool,
    pub(super) cursor: Cursor,
    /// Record for the attribute value piece under the cursor
    pub(super) chunk_node: NodeData,
    pub(super) scopes: Vec<ElementScope>,

    pub(super) parsing_function: ParsingFunction,
    /// Function to resume after attribute value iteration
    pub(super) next_function: ParsingFunction,
    pub(super) read_state: ReadState,
    pub(super) error: Option<XmlError>,

    pub(super) root_seen: bool,
    pub(super) root_closed: bool,

    /// Accumulates values spanning buffer refills
    pub(super) builder: BufferBuilder,
    /// Attribute identities for duplicate detection on large elements
    pub(super) attr_keys: HashSet<(usize, usize)>,
    /// Byte offset already handed out by `read_value_chunk`
    pub(super) value_offset: usize,
    pub(super) incremental: IncrementalRead,
}

impl<R: Read> XmlTextReader<R> {
    pub fn new(source: R) -> Self {
        Self::with_settings(source, ReaderSettings::default())
    }

    pub fn with_settings(source: R, mut settings: ReaderSettings) -> Self {
        let name_table = settings.name_table.take().unwrap_or_default();
        let known = WellKnown::new(&name_table);
        let mut ps = ParsingState::new(source, settings.buffer_size);
        ps.set_max_chars(settings.max_characters_in_document);

        debug!(
            conformance = ?settings.conformance_level,
            whitespace = ?settings.whitespace_handling,
            namespaces = settings.namespaces,
            buffer_size = settings.buffer_size,
            "created reader"
        );

        XmlTextReader {
            ps,
            namespaces: NamespaceManager::new(known.clone()),
            nodes: vec![NodeData::new(&known.empty)],
            index: 0,
            attr_count: 0,
            enter_pending: false,
            cursor: Cursor::Node,
            chunk_node: NodeData::new(&known.empty),
            scopes: Vec::new(),
            parsing_function: ParsingFunction::Initial,
            next_function: ParsingFunction::Initial,
            read_state: ReadState::Initial,
            error: None,
            root_seen: false,
            root_closed: false,
            builder: BufferBuilder::new(),
            attr_keys: HashSet::new(),
            value_offset: 0,
            incremental: IncrementalRead::default(),
            settings,
            name_table,
            known,
        }
    }

    /// Table every name and namespace URI of this reader is interned in
    pub fn name_table(&self) -> &NameTable {
        &self.name_table
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    /// Name of the detected input encoding
    pub fn encoding(&self) -> &'static str {
        self.ps.encoding().map_or("UTF-8", |e| e.name())
    }

    // ========================================================================
    // Read Loop
    // ========================================================================

    fn read_next(&mut self) -> Result<bool> {
        self.read_state = ReadState::Interactive;
        self.reset_cursor();
        self.attr_count = 0;
        self.enter_element();

        loop {
            let produced = match self.parsing_function {
                ParsingFunction::Initial => self.parse_initial()?,
                ParsingFunction::DocumentContent => self.parse_document_content()?,
                ParsingFunction::ElementContent => self.parse_element_content()?,
                ParsingFunction::PopElementContext | ParsingFunction::PopEmptyElementContext => {
                    self.pop_element_scope();
                    if self.index == 0 {
                        self.root_closed = true;
                    }
                    self.parsing_function = self.content_function();
                    false
                }
                ParsingFunction::InReadAttributeValue => {
                    self.parsing_function = self.next_function;
                    false
                }
                ParsingFunction::InIncrementalRead => {
                    self.finish_incremental_read()?;
                    true
                }
                ParsingFunction::Eof => {
                    self.on_eof();
                    return Ok(false);
                }
                ParsingFunction::Error => return Err(self.stored_error()),
                ParsingFunction::Closed => {
                    return Err(XmlError::without_position(XmlErrorKind::ReaderClosed))
                }
            };
            if produced {
                self.trace_node();
                return Ok(true);
            }
        }
    }

    /// Content parser for the current depth
    pub(super) fn content_function(&self) -> ParsingFunction {
        if self.index > 0 {
            ParsingFunction::ElementContent
        } else {
            ParsingFunction::DocumentContent
        }
    }

    /// Descend into the element reported by the previous read
    pub(super) fn enter_element(&mut self) {
        if self.enter_pending {
            self.enter_pending = false;
            self.index += 1;
        }
    }

    fn pop_element_scope(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            self.namespaces.pop_to(scope.namespace_mark);
        }
    }

    fn on_eof(&mut self) {
        self.read_state = ReadState::EndOfFile;
        self.parsing_function = ParsingFunction::Eof;
        self.index = 0;
        self.attr_count = 0;
        let empty = self.known.empty.clone();
        self.nodes[0].reset(NodeType::None, &empty, 0);
        debug!(lines = self.ps.line_no, "end of document");
    }

    fn trace_node(&self) {
        let node = &self.nodes[self.index];
        trace!(
            node_type = %node.node_type,
            name = %node.name,
            depth = node.depth,
            line = node.line,
            column = node.column,
            "read node"
        );
    }

    /// Record a fatal error; every later read reports it again
    pub(super) fn fail(&mut self, err: XmlError) -> XmlError {
        debug!(error = %err, "fatal parse error");
        self.read_state = ReadState::Error;
        self.parsing_function = ParsingFunction::Error;
        self.error = Some(err.clone());
        err
    }

    fn stored_error(&self) -> XmlError {
        self.error
            .clone()
            .unwrap_or_else(|| XmlError::without_position(XmlErrorKind::UnexpectedEof("document")))
    }

    /// Fail fast on a closed or broken reader
    pub(super) fn check_usable(&self) -> Result<()> {
        match self.read_state {
            ReadState::Closed => Err(XmlError::without_position(XmlErrorKind::ReaderClosed)),
            ReadState::Error => Err(self.stored_error()),
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Buffer Access
    // ========================================================================

    /// Refill the buffer, copying out values that point into it first
    pub(super) fn read_data(&mut self) -> Result<usize> {
        if self.ps.shift_pending() {
            self.materialize_values();
        }
        match self.ps.read_data() {
            Ok(n) => Ok(n),
            Err(kind) => Err(self.err_at(kind, self.ps.used)),
        }
    }

    fn materialize_values(&mut self) {
        let version = self.ps.version();
        let chars = &self.ps.chars;
        for node in self.nodes.iter_mut() {
            node.value.materialize(chars, version);
        }
        self.chunk_node.value.materialize(chars, version);
    }

    /// Make sure `n` bytes are available at `pos`; false at end of input
    pub(super) fn ensure(&mut self, n: usize) -> Result<bool> {
        while self.ps.used - self.ps.pos < n {
            if self.read_data()? == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether the unconsumed input starts with `literal`
    pub(super) fn starts_with_ahead(&mut self, literal: &[u8]) -> Result<bool> {
        self.ensure(literal.len())?;
        Ok(self.ps.window().starts_with(literal))
    }

    /// Offset of `needle` at or after `from`, relative to `pos`
    pub(super) fn find_ahead(&mut self, mut from: usize, needle: &[u8]) -> Result<Option<usize>> {
        loop {
            let window = self.ps.window();
            if let Some(off) = crate::core::scanner::find_seq(window, from, needle) {
                return Ok(Some(off));
            }
            from = from.max((window.len() + 1).saturating_sub(needle.len()));
            if self.read_data()? == 0 {
                return Ok(None);
            }
        }
    }

    /// Skip whitespace starting `off` bytes past `pos`, tracking lines
    pub(super) fn skip_whitespace_ahead(&mut self, mut off: usize) -> Result<usize> {
        loop {
            if !self.ensure(off + 1)? {
                return Ok(off);
            }
            let p = self.ps.pos + off;
            match self.ps.chars[p] {
                b' ' | b'\t' => off += 1,
                b'\n' => {
                    off += 1;
                    self.ps.on_new_line(self.ps.pos + off);
                }
                b'\r' => {
                    self.ensure(off + 2)?;
                    let p = self.ps.pos + off;
                    off += if p + 1 < self.ps.used && self.ps.chars[p + 1] == b'\n' { 2 } else { 1 };
                    self.ps.on_new_line(self.ps.pos + off);
                }
                _ => return Ok(off),
            }
        }
    }

    // ========================================================================
    // Errors
    // ========================================================================

    /// Error positioned at buffer offset `p` on the current line
    pub(super) fn err_at(&self, kind: XmlErrorKind, p: usize) -> XmlError {
        XmlError::new(kind, self.ps.line_no, self.ps.column_at(p))
    }

    /// Error positioned at the next unconsumed character
    pub(super) fn err(&self, kind: XmlErrorKind) -> XmlError {
        self.err_at(kind, self.ps.pos)
    }

    /// Printable form of the character at buffer offset `p`
    pub(super) fn token_at(&self, p: usize) -> String {
        match self.ps.chars.get(p..self.ps.used) {
            Some(rest) if !rest.is_empty() => crate::core::unicode::decode_utf8(rest)
                .map(|(ch, _)| ch.to_string())
                .unwrap_or_else(|| format!("{:#04x}", rest[0])),
            _ => "EOF".to_string(),
        }
    }

    /// Elements still open, outermost first
    pub(super) fn unclosed_error(&self) -> XmlError {
        let names = self.nodes[..self.index]
            .iter()
            .map(|n| n.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        self.err_at(XmlErrorKind::UnclosedElements(names), self.ps.used)
    }

    // ========================================================================
    // Node Slots
    // ========================================================================

    /// Node slot `i`, allocating it on first use
    pub(super) fn node_slot(&mut self, i: usize) -> &mut NodeData {
        while self.nodes.len() <= i {
            self.nodes.push(NodeData::new(&self.known.empty));
        }
        &mut self.nodes[i]
    }

    /// Make the current slot a nameless node carrying `value`
    pub(super) fn set_value_node(
        &mut self,
        node_type: NodeType,
        value: NodeValue,
        line: usize,
        column: usize,
    ) {
        let empty = self.known.empty.clone();
        let depth = self.index;
        let node = self.node_slot(depth);
        node.reset(node_type, &empty, depth);
        node.value = value;
        node.set_position(line, column);
    }

    /// Record under the cursor
    fn current(&self) -> &NodeData {
        match self.cursor {
            Cursor::Node => &self.nodes[self.index],
            Cursor::Attribute(i) => &self.nodes[self.index + 1 + i],
            Cursor::AttributeValue { .. } => &self.chunk_node,
        }
    }

    fn attributes(&self) -> &[NodeData] {
        let first = self.index + 1;
        &self.nodes[first..first + self.attribute_count()]
    }

    fn value_of<'a>(&'a self, node: &'a NodeData) -> Cow<'a, str> {
        node.value.as_str(&self.ps.chars, self.ps.version())
    }

    fn reset_cursor(&mut self) {
        self.leave_attribute_value();
        self.cursor = Cursor::Node;
        self.value_offset = 0;
    }

    fn leave_attribute_value(&mut self) {
        if self.parsing_function == ParsingFunction::InReadAttributeValue {
            self.parsing_function = self.next_function;
        }
    }

    fn move_to_attribute_slot(&mut self, i: usize) -> bool {
        if i >= self.attribute_count() {
            return false;
        }
        self.leave_attribute_value();
        self.cursor = Cursor::Attribute(i);
        self.value_offset = 0;
        true
    }

    /// Point the chunk record at piece `chunk` of attribute `attr`
    fn load_chunk(&mut self, attr: usize, chunk: usize) {
        let slot = self.index + 1 + attr;
        let empty = self.known.empty.clone();
        let value = {
            let node = &self.nodes[slot];
            if node.chunks.is_empty() {
                self.value_of(node).into_owned()
            } else {
                node.chunks[chunk].clone()
            }
        };
        let (depth, line, column) = {
            let node = &self.nodes[slot];
            (node.depth + 1, node.line, node.column)
        };
        self.chunk_node.reset(NodeType::Text, &empty, depth);
        self.chunk_node.value = NodeValue::Owned(value);
        self.chunk_node.set_position(line, column);
    }

    /// Number of pieces `read_attribute_value` steps through
    fn chunk_count(&self, attr: usize) -> usize {
        let node = &self.nodes[self.index + 1 + attr];
        if !node.chunks.is_empty() {
            node.chunks.len()
        } else if node.value.is_empty() {
            0
        } else {
            1
        }
    }
}

impl<R: Read> XmlReader for XmlTextReader<R> {
    fn read(&mut self) -> Result<bool> {
        match self.read_state {
            ReadState::Closed => {
                return Err(XmlError::without_position(XmlErrorKind::ReaderClosed))
            }
            ReadState::Error => return Err(self.stored_error()),
            ReadState::EndOfFile => return Ok(false),
            ReadState::Initial | ReadState::Interactive => {}
        }
        match self.read_next() {
            Ok(more) => Ok(more),
            Err(err) => Err(self.fail(err)),
        }
    }

    fn node_type(&self) -> NodeType {
        self.current().node_type
    }

    fn name(&self) -> &str {
        self.current().name.as_str()
    }

    fn local_name(&self) -> &str {
        self.current().local_name.as_str()
    }

    fn prefix(&self) -> &str {
        self.current().prefix.as_str()
    }

    fn namespace_uri(&self) -> &str {
        self.current().namespace_uri.as_str()
    }

    fn value(&self) -> Cow<'_, str> {
        self.value_of(self.current())
    }

    fn depth(&self) -> usize {
        self.current().depth
    }

    fn is_empty_element(&self) -> bool {
        self.cursor == Cursor::Node && self.nodes[self.index].is_empty_element
    }

    fn is_default(&self) -> bool {
        false
    }

    fn quote_char(&self) -> char {
        self.current().quote_char
    }

    fn eof(&self) -> bool {
        self.read_state == ReadState::EndOfFile
    }

    fn read_state(&self) -> ReadState {
        self.read_state
    }

    fn attribute_count(&self) -> usize {
        match self.nodes[self.index].node_type {
            NodeType::Element | NodeType::XmlDeclaration => self.attr_count,
            _ => 0,
        }
    }

    fn get_attribute(&self, name: &str) -> Option<Cow<'_, str>> {
        self.attributes()
            .iter()
            .find(|a| a.name == name)
            .map(|a| self.value_of(a))
    }

    fn get_attribute_at(&self, index: usize) -> Option<Cow<'_, str>> {
        self.attributes().get(index).map(|a| self.value_of(a))
    }

    fn get_attribute_ns(&self, local_name: &str, namespace_uri: &str) -> Option<Cow<'_, str>> {
        self.attributes()
            .iter()
            .find(|a| a.local_name == local_name && a.namespace_uri == namespace_uri)
            .map(|a| self.value_of(a))
    }

    fn move_to_attribute(&mut self, name: &str) -> bool {
        match self.attributes().iter().position(|a| a.name == name) {
            Some(i) => self.move_to_attribute_slot(i),
            None => false,
        }
    }

    fn move_to_attribute_at(&mut self, index: usize) -> bool {
        self.move_to_attribute_slot(index)
    }

    fn move_to_first_attribute(&mut self) -> bool {
        self.move_to_attribute_slot(0)
    }

    fn move_to_next_attribute(&mut self) -> bool {
        match self.cursor {
            Cursor::Node => self.move_to_attribute_slot(0),
            Cursor::Attribute(i) | Cursor::AttributeValue { attr: i, .. } => {
                self.move_to_attribute_slot(i + 1)
            }
        }
    }

    fn move_to_element(&mut self) -> bool {
        if self.cursor == Cursor::Node {
            return false;
        }
        self.reset_cursor();
        true
    }

    fn read_attribute_value(&mut self) -> bool {
        let (attr, chunk) = match self.cursor {
            Cursor::Node => return false,
            Cursor::Attribute(attr) => (attr, 0),
            Cursor::AttributeValue { attr, chunk } => (attr, chunk + 1),
        };
        if chunk >= self.chunk_count(attr) {
            return false;
        }
        if self.parsing_function != ParsingFunction::InReadAttributeValue {
            self.next_function = self.parsing_function;
            self.parsing_function = ParsingFunction::InReadAttributeValue;
        }
        self.load_chunk(attr, chunk);
        self.cursor = Cursor::AttributeValue { attr, chunk };
        self.value_offset = 0;
        true
    }

    fn lookup_namespace(&self, prefix: &str) -> Option<&str> {
        self.namespaces.lookup_str(prefix)
    }

    fn xml_space(&self) -> XmlSpace {
        self.scopes.last().map_or(XmlSpace::None, |s| s.xml_space)
    }

    fn xml_lang(&self) -> &str {
        self.scopes.last().map_or("", |s| s.xml_lang.as_str())
    }

    fn line_number(&self) -> usize {
        self.current().line
    }

    fn line_position(&self) -> usize {
        self.current().column
    }

    fn close(&mut self) {
        if self.read_state == ReadState::Closed {
            return;
        }
        self.read_state = ReadState::Closed;
        self.parsing_function = ParsingFunction::Closed;
        self.cursor = Cursor::Node;
        self.index = 0;
        self.attr_count = 0;
        self.enter_pending = false;
        self.scopes.clear();
        self.nodes.truncate(1);
        let empty = self.known.empty.clone();
        self.nodes[0].reset(NodeType::None, &empty, 0);
        self.builder.clear();
        debug!("reader closed");
    }
}
