//! Markup Tokenizer
//!
//! Start tags with their attributes, end tags, and the scope bookkeeping
//! that comes with them: `xml:space`, `xml:lang`, namespace declarations
//! and prefix resolution, duplicate attribute detection.
//!
//! A start tag is pulled into the buffer in full before it is parsed, so
//! attribute values can be rewritten in place and left as buffer slices.

use std::io::Read;

use super::content::{invalid_char_at, line_break_len, Compactor};
use super::namespaces::{XMLNS_NAMESPACE, XML_NAMESPACE};
use super::node::{ElementScope, NodeData, NodeValue};
use super::text_reader::{ParsingFunction, XmlTextReader};
use super::{NodeType, XmlSpace};
use crate::core::entities::{parse_reference, Reference};
use crate::core::scanner::{scan_name, NameScan, TagEndScan};
use crate::core::strings::Atom;
use crate::core::unicode::{decode_utf8, is_name_char};
use crate::error::{Result, XmlError, XmlErrorKind};

/// Attribute count up to which duplicates are found by pairwise comparison
const MAX_ATTRIBUTES_PAIRWISE: usize = 250;

impl<R: Read> XmlTextReader<R> {
    // ========================================================================
    // Start Tags
    // ========================================================================

    pub(super) fn parse_element(&mut self) -> Result<bool> {
        let (line, column) = (self.ps.line_no, self.ps.column());
        let close = self.find_tag_end()?;
        let base = self.ps.pos;
        let end = base + close;

        let (name_end, prefix, local_name, name) = self.parse_qname(base + 1, end)?;
        let empty = self.known.empty.clone();
        let depth = self.index;
        let node = self.node_slot(depth);
        node.reset(NodeType::Element, &empty, depth);
        node.name = name;
        node.local_name = local_name;
        node.prefix = prefix;
        node.set_position(line, column);
        self.attr_count = 0;

        let mut i = name_end;
        let is_empty = loop {
            let ws_start = i;
            i = self.skip_tag_whitespace(i, end);
            match self.ps.chars[i] {
                b'>' => {
                    i += 1;
                    break false;
                }
                b'/' => {
                    if self.ps.chars[i + 1] == b'>' {
                        i += 2;
                        break true;
                    }
                    return Err(self.err_at(
                        XmlErrorKind::UnexpectedToken { expected: ">", found: self.token_at(i + 1) },
                        i + 1,
                    ));
                }
                _ if i == name_end => {
                    return Err(self.err_at(XmlErrorKind::BadNameChar(self.code_point_at(i)), i));
                }
                _ if i == ws_start => {
                    return Err(self.err_at(XmlErrorKind::ExpectingWhitespace(self.token_at(i)), i));
                }
                _ => i = self.parse_attribute(i, end)?,
            }
        };
        self.ps.pos = i;
        self.finish_element(is_empty)
    }

    /// Offset of the `>` closing the start tag at `pos`, relative to `pos`
    pub(super) fn find_tag_end(&mut self) -> Result<usize> {
        let mut scan = TagEndScan::new(1);
        loop {
            if let Some(off) = scan.find(self.ps.window()) {
                return Ok(off);
            }
            if self.read_data()? == 0 {
                let kind = if scan.in_quote() {
                    XmlErrorKind::UnclosedQuote
                } else {
                    XmlErrorKind::UnexpectedEof("start tag")
                };
                return Err(self.err(kind));
            }
        }
    }

    /// Scan and intern a name inside a buffered tag ending at `end`
    ///
    /// Returns (name end, prefix, local name, qualified name).
    fn parse_qname(&mut self, start: usize, end: usize) -> Result<(usize, Atom, Atom, Atom)> {
        let (name_end, colon) = match scan_name(&self.ps.chars[..=end], start, self.settings.namespaces) {
            NameScan::Complete { end, colon } => (end, colon),
            NameScan::BadStart { at, ch } => {
                return Err(self.err_at(XmlErrorKind::BadStartNameChar(ch), at))
            }
            NameScan::BadChar { at, ch } => {
                return Err(self.err_at(XmlErrorKind::BadNameChar(ch), at))
            }
            NameScan::Truncated => {
                return Err(self.err_at(XmlErrorKind::UnexpectedEof("name"), end))
            }
        };
        let table = &self.name_table;
        let chars = &self.ps.chars;
        let name = table.add_bytes(&chars[start..name_end]);
        let (prefix, local_name) = match colon {
            Some(c) => (
                table.add_bytes(&chars[start..c]),
                table.add_bytes(&chars[c + 1..name_end]),
            ),
            None => (self.known.empty.clone(), name.clone()),
        };
        Ok((name_end, prefix, local_name, name))
    }

    /// Parse one `name="value"` pair starting at `start`; returns the
    /// offset just past the closing quote
    fn parse_attribute(&mut self, start: usize, end: usize) -> Result<usize> {
        let (line, column) = (self.ps.line_no, self.ps.column_at(start));
        let (name_end, prefix, local_name, name) = self.parse_qname(start, end)?;

        let mut j = self.skip_tag_whitespace(name_end, end);
        if self.ps.chars[j] != b'=' {
            return Err(self.err_at(
                XmlErrorKind::UnexpectedToken { expected: "=", found: self.token_at(j) },
                j,
            ));
        }
        j = self.skip_tag_whitespace(j + 1, end);
        let quote = self.ps.chars[j];
        if quote != b'"' && quote != b'\'' {
            return Err(self.err_at(
                XmlErrorKind::UnexpectedToken { expected: "\"", found: self.token_at(j) },
                j,
            ));
        }

        let check = self.settings.check_characters;
        let value_start = j + 1;
        let mut c = Compactor::new(value_start);
        // literal runs and expanded references, filled once a reference shows up
        let mut chunks: Vec<String> = Vec::new();
        let mut literal_start = value_start;

        loop {
            if c.read >= end {
                return Err(self.err_at(XmlErrorKind::UnclosedQuote, j));
            }
            let b = self.ps.chars[c.read];
            match b {
                _ if b == quote => break,
                b'<' => return Err(self.err_at(XmlErrorKind::LessThanInAttributeValue, c.read)),
                b'&' => match parse_reference(&self.ps.chars[c.read..end], true) {
                    Ok(Reference::Char { ch, len }) => {
                        if c.write > literal_start {
                            chunks.push(
                                String::from_utf8_lossy(&self.ps.chars[literal_start..c.write])
                                    .into_owned(),
                            );
                        }
                        let mut utf8 = [0u8; 4];
                        c.replace(&mut self.ps.chars, len, ch.encode_utf8(&mut utf8).as_bytes());
                        chunks.push(ch.to_string());
                        literal_start = c.write;
                    }
                    Ok(Reference::Unexpanded { name, .. }) => {
                        return Err(self.err_at(XmlErrorKind::UndeclaredEntity(name), c.read));
                    }
                    Ok(Reference::Incomplete) => {
                        return Err(self.err_at(XmlErrorKind::ErrorParsingEntityName, c.read));
                    }
                    Err(kind) => return Err(self.err_at(kind, c.read)),
                },
                b'\t' => c.replace(&mut self.ps.chars, 1, b" "),
                b'\r' | b'\n' => {
                    let len = line_break_len(&self.ps.chars, c.read, end, true).unwrap_or(1);
                    c.line_break(&mut self.ps, len, b' ');
                }
                _ => {
                    if check {
                        if let Some(cp) = invalid_char_at(&self.ps.chars, c.read, end) {
                            return Err(self.err_at(XmlErrorKind::InvalidCharacter(cp), c.read));
                        }
                    }
                    c.copy(&mut self.ps.chars);
                }
            }
        }
        if !chunks.is_empty() && c.write > literal_start {
            chunks.push(String::from_utf8_lossy(&self.ps.chars[literal_start..c.write]).into_owned());
        }
        c.finish(&mut self.ps);

        let version = self.ps.version();
        let empty = self.known.empty.clone();
        let depth = self.index + 1;
        let slot = self.index + 1 + self.attr_count;
        let attr = self.node_slot(slot);
        attr.reset(NodeType::Attribute, &empty, depth);
        attr.name = name;
        attr.local_name = local_name;
        attr.prefix = prefix;
        attr.value = NodeValue::Slice {
            version,
            start: value_start,
            len: c.write - value_start,
        };
        attr.quote_char = quote as char;
        attr.chunks = chunks;
        attr.set_position(line, column);
        self.attr_count += 1;
        Ok(c.read + 1)
    }

    /// Skip whitespace inside a buffered tag, tracking line breaks
    pub(super) fn skip_tag_whitespace(&mut self, mut i: usize, end: usize) -> usize {
        while i < end {
            match self.ps.chars[i] {
                b' ' | b'\t' => i += 1,
                b'\n' | b'\r' => {
                    i += line_break_len(&self.ps.chars, i, end, true).unwrap_or(1);
                    self.ps.on_new_line(i);
                }
                _ => break,
            }
        }
        i
    }

    // ========================================================================
    // Element Scope
    // ========================================================================

    /// Open the element's scope and decide what the next read does
    fn finish_element(&mut self, is_empty: bool) -> Result<bool> {
        self.check_duplicate_attributes(false)?;

        let parent = self.scopes.last();
        let mut scope = ElementScope {
            xml_space: parent.map_or(XmlSpace::None, |s| s.xml_space),
            xml_lang: parent.map_or_else(|| self.known.empty.clone(), |s| s.xml_lang.clone()),
            namespace_mark: self.namespaces.mark(),
        };
        let first = self.index + 1;
        for slot in first..first + self.attr_count {
            self.scan_special_attribute(slot, &mut scope)?;
        }
        self.scopes.push(scope);

        if self.settings.namespaces {
            self.resolve_namespaces()?;
            self.check_duplicate_attributes(true)?;
        }

        if is_empty {
            self.nodes[self.index].is_empty_element = true;
            self.parsing_function = ParsingFunction::PopEmptyElementContext;
        } else {
            self.enter_pending = true;
            self.parsing_function = ParsingFunction::ElementContent;
        }
        Ok(true)
    }

    fn value_string(&self, slot: usize) -> String {
        self.nodes[slot]
            .value
            .as_str(&self.ps.chars, self.ps.version())
            .into_owned()
    }

    /// Apply `xml:space`, `xml:lang` and namespace declarations
    fn scan_special_attribute(&mut self, slot: usize, scope: &mut ElementScope) -> Result<()> {
        let name = &self.nodes[slot].name;
        if name.ptr_eq(&self.known.xml_space) {
            let value = self.value_string(slot);
            scope.xml_space = match value.as_str() {
                "preserve" => XmlSpace::Preserve,
                "default" => XmlSpace::Default,
                _ => {
                    let node = &self.nodes[slot];
                    return Err(XmlError::new(
                        XmlErrorKind::InvalidXmlSpace(value),
                        node.line,
                        node.column,
                    ));
                }
            };
        } else if name.ptr_eq(&self.known.xml_lang) {
            scope.xml_lang = self.name_table.add(&self.value_string(slot));
        } else if self.settings.namespaces {
            self.declare_namespace(slot)?;
        }
        Ok(())
    }

    /// Record `xmlns` / `xmlns:p` declarations
    fn declare_namespace(&mut self, slot: usize) -> Result<()> {
        let node = &self.nodes[slot];
        let prefixed = node.prefix.ptr_eq(&self.known.xmlns);
        let default = node.prefix.is_empty() && node.local_name.ptr_eq(&self.known.xmlns);
        if !prefixed && !default {
            return Ok(());
        }
        let (line, column) = (node.line, node.column);
        let declared = if prefixed {
            node.local_name.clone()
        } else {
            self.known.empty.clone()
        };
        let uri = self.value_string(slot);
        let fail = |kind: XmlErrorKind| -> Result<()> { Err(XmlError::new(kind, line, column)) };

        if prefixed {
            if declared.ptr_eq(&self.known.xmlns) {
                return fail(XmlErrorKind::XmlnsPrefixReserved);
            }
            if declared.ptr_eq(&self.known.xml) {
                if uri != XML_NAMESPACE {
                    return fail(XmlErrorKind::XmlPrefixReserved(XML_NAMESPACE));
                }
                return Ok(());
            }
            if uri.is_empty() {
                return fail(XmlErrorKind::EmptyNamespaceWithPrefix);
            }
        }
        if uri == XML_NAMESPACE {
            return fail(XmlErrorKind::XmlPrefixReserved(XML_NAMESPACE));
        }
        if uri == XMLNS_NAMESPACE {
            return fail(XmlErrorKind::XmlnsPrefixReserved);
        }
        let uri = self.name_table.add(&uri);
        self.namespaces.declare(declared, uri);
        Ok(())
    }

    /// Fill in namespace URIs of the element and its attributes
    fn resolve_namespaces(&mut self) -> Result<()> {
        let element = &self.nodes[self.index];
        if element.prefix.ptr_eq(&self.known.xmlns) {
            return Err(XmlError::new(
                XmlErrorKind::XmlnsPrefixReserved,
                element.line,
                element.column,
            ));
        }
        let uri = self.lookup_prefix(self.index)?;
        self.nodes[self.index].namespace_uri = uri;

        for slot in self.index + 1..=self.index + self.attr_count {
            let node = &self.nodes[slot];
            let uri = if !node.prefix.is_empty() {
                self.lookup_prefix(slot)?
            } else if node.local_name.ptr_eq(&self.known.xmlns) {
                self.known.xmlns_namespace.clone()
            } else {
                // unprefixed attributes are in no namespace
                self.known.empty.clone()
            };
            self.nodes[slot].namespace_uri = uri;
        }
        Ok(())
    }

    fn lookup_prefix(&self, slot: usize) -> Result<Atom> {
        let node = &self.nodes[slot];
        match self.namespaces.lookup(&node.prefix) {
            Some(uri) => Ok(uri.clone()),
            None => Err(XmlError::new(
                XmlErrorKind::UndeclaredPrefix(node.prefix.to_string()),
                node.line,
                node.column,
            )),
        }
    }

    /// Reject two attributes with the same qualified or expanded name
    fn check_duplicate_attributes(&mut self, by_namespace: bool) -> Result<()> {
        let count = self.attr_count;
        if count < 2 {
            return Ok(());
        }
        let key = |node: &NodeData| {
            if by_namespace {
                (node.local_name.addr(), node.namespace_uri.addr())
            } else {
                (node.name.addr(), 0)
            }
        };
        let first = self.index + 1;
        let attrs = &self.nodes[first..first + count];
        let duplicate = if count <= MAX_ATTRIBUTES_PAIRWISE {
            (1..count).find(|&k| {
                let this = key(&attrs[k]);
                attrs[..k].iter().any(|a| key(a) == this)
            })
        } else {
            let seen = &mut self.attr_keys;
            seen.clear();
            attrs.iter().position(|a| !seen.insert(key(a)))
        };
        match duplicate {
            Some(k) => {
                let node = &attrs[k];
                Err(XmlError::new(
                    XmlErrorKind::DuplicateAttribute(node.name.to_string()),
                    node.line,
                    node.column,
                ))
            }
            None => Ok(()),
        }
    }

    // ========================================================================
    // End Tags
    // ========================================================================

    /// `</name>` closing the innermost open element
    pub(super) fn parse_end_element(&mut self) -> Result<bool> {
        let (line, column) = (self.ps.line_no, self.ps.column());
        let Some(open) = self.index.checked_sub(1) else {
            return Err(self.err(XmlErrorKind::UnexpectedEndTag));
        };
        let open_name = self.nodes[open].name.clone();
        let len = open_name.len();
        self.ensure(2 + len + 1)?;

        // byte comparison against the open tag, no interning
        let window = self.ps.window();
        let matches = window.get(2..2 + len) == Some(open_name.as_bytes())
            && !window
                .get(2 + len..)
                .and_then(decode_utf8)
                .is_some_and(|(ch, _)| is_name_char(ch));
        if !matches {
            let (end, _) = self.scan_name_ahead(2, false)?;
            let found = String::from_utf8_lossy(&self.ps.window()[2..end]).into_owned();
            let node = &self.nodes[open];
            let kind = XmlErrorKind::TagMismatch {
                open: open_name.to_string(),
                open_line: node.line,
                open_column: node.column,
                found,
            };
            return Err(self.err_at(kind, self.ps.pos + 2));
        }

        let off = self.skip_whitespace_ahead(2 + len)?;
        if !self.ensure(off + 1)? {
            return Err(self.err_at(XmlErrorKind::UnexpectedEof("end tag"), self.ps.used));
        }
        let p = self.ps.pos + off;
        if self.ps.chars[p] != b'>' {
            return Err(self.err_at(
                XmlErrorKind::UnexpectedToken { expected: ">", found: self.token_at(p) },
                p,
            ));
        }
        self.ps.pos = p + 1;

        self.index = open;
        let node = &mut self.nodes[open];
        node.node_type = NodeType::EndElement;
        node.is_empty_element = false;
        node.value = NodeValue::Empty;
        node.set_position(line, column);
        self.parsing_function = ParsingFunction::PopElementContext;
        Ok(true)
    }
}
