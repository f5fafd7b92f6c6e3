//! Content Tokenizer
//!
//! Document and element content dispatch plus the character-data
//! constructs: text runs, comments, CDATA sections, processing
//! instructions and the XML declaration.
//!
//! Values are rewritten in place: entity references are expanded and line
//! endings normalized by compacting the buffer behind a read cursor. A run
//! that reaches the end of the buffer is flushed into the `BufferBuilder`
//! before the refill, so a value spanning refills is never rescanned.

use std::io::Read;

use super::node::NodeValue;
use super::text_reader::{ParsingFunction, XmlTextReader};
use super::{NodeType, XmlSpace};
use crate::core::encoding::check_declared_encoding;
use crate::core::entities::{parse_reference, Reference};
use crate::core::scanner::{find_byte, scan_name, NameScan};
use crate::core::state::ParsingState;
use crate::core::unicode::{decode_utf8, find_invalid_char, is_continuation, is_whitespace};
use crate::error::{Result, XmlError, XmlErrorKind};
use crate::settings::{ConformanceLevel, WhitespaceHandling};

/// Constructs sharing the delimited-value routine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimited {
    Comment,
    CData,
    Pi,
}

impl Delimited {
    fn terminator(self) -> &'static [u8] {
        match self {
            Delimited::Comment => b"-->",
            Delimited::CData => b"]]>",
            Delimited::Pi => b"?>",
        }
    }

    fn what(self) -> &'static str {
        match self {
            Delimited::Comment => "comment",
            Delimited::CData => "CDATA section",
            Delimited::Pi => "processing instruction",
        }
    }
}

/// Pseudo-attribute expected next in the XML declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclStage {
    Version,
    Encoding,
    Standalone,
    Done,
}

/// In-place rewrite of one buffer segment
///
/// `read` walks the original characters, `write` trails it with the
/// rewritten ones. `original` counts source characters since the later of
/// `start` and the last line break, for column rebasing.
pub(super) struct Compactor {
    pub start: usize,
    pub read: usize,
    pub write: usize,
    pub original: usize,
}

impl Compactor {
    pub fn new(start: usize) -> Self {
        Compactor {
            start,
            read: start,
            write: start,
            original: 0,
        }
    }

    #[inline]
    pub fn copy(&mut self, chars: &mut [u8]) {
        let b = chars[self.read];
        if self.write != self.read {
            chars[self.write] = b;
        }
        if !is_continuation(b) {
            self.original += 1;
        }
        self.read += 1;
        self.write += 1;
    }

    /// Replace `consumed` ASCII source bytes with `with`
    pub fn replace(&mut self, chars: &mut [u8], consumed: usize, with: &[u8]) {
        chars[self.write..self.write + with.len()].copy_from_slice(with);
        self.write += with.len();
        self.read += consumed;
        self.original += consumed;
    }

    /// Replace a line break of `consumed` bytes with the single byte `with`
    pub fn line_break<R: Read>(&mut self, ps: &mut ParsingState<R>, consumed: usize, with: u8) {
        ps.chars[self.write] = with;
        self.write += 1;
        self.read += consumed;
        self.original = 0;
        ps.on_new_line(self.read);
    }

    /// Keep columns exact for whatever follows on the current line
    pub fn finish<R: Read>(&self, ps: &mut ParsingState<R>) {
        if self.write != self.read {
            ps.rebase_columns(self.start, self.read, self.original);
        }
    }
}

/// Length of the line break at `p`, or `None` when a `\r` ends the window
#[inline]
pub(super) fn line_break_len(chars: &[u8], p: usize, used: usize, eof: bool) -> Option<usize> {
    if chars[p] == b'\n' {
        return Some(1);
    }
    if p + 1 < used {
        Some(if chars[p + 1] == b'\n' { 2 } else { 1 })
    } else if eof {
        Some(1)
    } else {
        None
    }
}

/// Code point of a character outside the XML `Char` production at `p`
#[inline]
pub(super) fn invalid_char_at(chars: &[u8], p: usize, used: usize) -> Option<u32> {
    let b = chars[p];
    if b >= 0x20 && b != 0xEF {
        return None;
    }
    find_invalid_char(&chars[p..used.min(p + 3)])
        .filter(|&(at, _)| at == 0)
        .map(|(_, cp)| cp)
}

impl<R: Read> XmlTextReader<R> {
    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Detect the encoding and report the XML declaration if there is one
    pub(super) fn parse_initial(&mut self) -> Result<bool> {
        self.ps.append_mode = true;
        self.ensure(6)?;
        let window = self.ps.window();
        let is_declaration = window.starts_with(b"<?xml")
            && window.get(5).is_some_and(|&b| is_whitespace(b) || b == b'?');

        let produced = if is_declaration {
            if self.settings.conformance_level == ConformanceLevel::Fragment {
                return Err(self.err(XmlErrorKind::XmlDeclarationNotFirst));
            }
            self.parse_xml_declaration()?;
            true
        } else {
            false
        };
        self.ps.append_mode = false;
        self.parsing_function = ParsingFunction::DocumentContent;
        Ok(produced)
    }

    /// Top level: prolog, the root element and anything after it
    pub(super) fn parse_document_content(&mut self) -> Result<bool> {
        if self.ps.pos >= self.ps.used && self.read_data()? == 0 {
            if self.settings.conformance_level == ConformanceLevel::Document && !self.root_seen {
                return Err(self.err(XmlErrorKind::RootElementMissing));
            }
            self.parsing_function = ParsingFunction::Eof;
            return Ok(false);
        }
        if self.ps.chars[self.ps.pos] != b'<' {
            return self.parse_text();
        }
        if !self.ensure(2)? {
            return Err(self.err(XmlErrorKind::UnexpectedEof("markup")));
        }
        match self.ps.chars[self.ps.pos + 1] {
            b'?' => self.parse_pi(),
            b'!' => self.parse_bang(true),
            b'/' => Err(self.err(XmlErrorKind::UnexpectedEndTag)),
            _ => {
                if self.root_closed && self.settings.conformance_level == ConformanceLevel::Document {
                    return Err(self.err(XmlErrorKind::MultipleRoots));
                }
                self.root_seen = true;
                self.parse_element()
            }
        }
    }

    /// Inside an element
    pub(super) fn parse_element_content(&mut self) -> Result<bool> {
        if self.ps.pos >= self.ps.used && self.read_data()? == 0 {
            return Err(self.unclosed_error());
        }
        if self.ps.chars[self.ps.pos] != b'<' {
            return self.parse_text();
        }
        if !self.ensure(2)? {
            return Err(self.err(XmlErrorKind::UnexpectedEof("markup")));
        }
        match self.ps.chars[self.ps.pos + 1] {
            b'/' => self.parse_end_element(),
            b'?' => self.parse_pi(),
            b'!' => self.parse_bang(false),
            _ => self.parse_element(),
        }
    }

    /// `<!` introduces a comment, a CDATA section or a DOCTYPE
    fn parse_bang(&mut self, top_level: bool) -> Result<bool> {
        if self.starts_with_ahead(b"<!--")? {
            return self.parse_comment();
        }
        if self.starts_with_ahead(b"<![CDATA[")? {
            if top_level && self.settings.conformance_level == ConformanceLevel::Document {
                return Err(self.err(XmlErrorKind::InvalidRootData));
            }
            return self.parse_cdata();
        }
        if self.starts_with_ahead(b"<!DOCTYPE")? {
            return Err(self.err(XmlErrorKind::DtdProhibited));
        }
        let p = self.ps.pos + 2;
        if p >= self.ps.used {
            return Err(self.err_at(XmlErrorKind::UnexpectedEof("markup"), p));
        }
        Err(self.err_at(
            XmlErrorKind::UnexpectedToken {
                expected: "--",
                found: self.token_at(p),
            },
            p,
        ))
    }

    // ========================================================================
    // Text
    // ========================================================================

    /// Character data up to the next `<`
    pub(super) fn parse_text(&mut self) -> Result<bool> {
        let line = self.ps.line_no;
        let column = self.ps.column();
        let check = self.settings.check_characters;
        // OR of every character except tab and line breaks
        let mut bits = 0u8;
        let mut spilled = false;
        self.builder.clear();

        let value = loop {
            let mut c = Compactor::new(self.ps.pos);
            let used = self.ps.used;
            let eof = self.ps.is_eof;

            let done = loop {
                if c.read >= used {
                    break eof;
                }
                let b = self.ps.chars[c.read];
                match b {
                    b'<' => break true,
                    b'&' => match parse_reference(&self.ps.chars[c.read..used], eof) {
                        Ok(Reference::Char { ch, len }) => {
                            let mut utf8 = [0u8; 4];
                            let expanded = ch.encode_utf8(&mut utf8).as_bytes();
                            for &e in expanded {
                                if !matches!(e, b'\t' | b'\n' | b'\r') {
                                    bits |= e;
                                }
                            }
                            c.replace(&mut self.ps.chars, len, expanded);
                        }
                        Ok(Reference::Unexpanded { name, .. }) => {
                            return Err(self.err_at(XmlErrorKind::UndeclaredEntity(name), c.read));
                        }
                        Ok(Reference::Incomplete) => break false,
                        Err(kind) => return Err(self.err_at(kind, c.read)),
                    },
                    b'\r' | b'\n' => match line_break_len(&self.ps.chars, c.read, used, eof) {
                        Some(len) => c.line_break(&mut self.ps, len, b'\n'),
                        None => break false,
                    },
                    b']' => {
                        let rest = &self.ps.chars[c.read..used];
                        if rest.starts_with(b"]]>") {
                            return Err(self.err_at(XmlErrorKind::CdataEndInText, c.read));
                        }
                        if rest.len() < 3 && !eof && b"]]>".starts_with(rest) {
                            break false;
                        }
                        bits |= b;
                        c.copy(&mut self.ps.chars);
                    }
                    _ => {
                        if check {
                            if let Some(cp) = invalid_char_at(&self.ps.chars, c.read, used) {
                                return Err(self.err_at(XmlErrorKind::InvalidCharacter(cp), c.read));
                            }
                        }
                        if b != b'\t' {
                            bits |= b;
                        }
                        c.copy(&mut self.ps.chars);
                    }
                }
            };

            c.finish(&mut self.ps);
            self.ps.pos = c.read;
            if done {
                if !spilled {
                    break NodeValue::Slice {
                        version: self.ps.version(),
                        start: c.start,
                        len: c.write - c.start,
                    };
                }
                let run = String::from_utf8_lossy(&self.ps.chars[c.start..c.write]);
                self.builder.append(&run);
                break NodeValue::Owned(self.builder.take());
            }
            if c.write > c.start {
                let run = String::from_utf8_lossy(&self.ps.chars[c.start..c.write]);
                self.builder.append(&run);
                spilled = true;
            }
            self.read_data()?;
        };

        let whitespace = bits <= 0x20;
        if !whitespace
            && self.index == 0
            && self.settings.conformance_level == ConformanceLevel::Document
        {
            return Err(XmlError::new(XmlErrorKind::InvalidRootData, line, column));
        }

        let node_type = if !whitespace {
            NodeType::Text
        } else if self.current_xml_space() == XmlSpace::Preserve {
            NodeType::SignificantWhitespace
        } else {
            NodeType::Whitespace
        };
        let report = match (node_type, self.settings.whitespace_handling) {
            (NodeType::Text, _) => true,
            (NodeType::Whitespace, handling) => handling == WhitespaceHandling::All,
            (_, handling) => handling != WhitespaceHandling::None,
        };
        if !report {
            return Ok(false);
        }
        self.set_value_node(node_type, value, line, column);
        Ok(true)
    }

    fn current_xml_space(&self) -> XmlSpace {
        self.scopes.last().map_or(XmlSpace::None, |s| s.xml_space)
    }

    // ========================================================================
    // Comments, CDATA, Processing Instructions
    // ========================================================================

    fn parse_comment(&mut self) -> Result<bool> {
        let (line, column) = (self.ps.line_no, self.ps.column());
        self.ps.pos += 4;
        let value = self.parse_delimited(Delimited::Comment)?;
        if self.settings.ignore_comments {
            return Ok(false);
        }
        self.set_value_node(NodeType::Comment, value, line, column);
        Ok(true)
    }

    fn parse_cdata(&mut self) -> Result<bool> {
        let (line, column) = (self.ps.line_no, self.ps.column());
        self.ps.pos += 9;
        let value = self.parse_delimited(Delimited::CData)?;
        self.set_value_node(NodeType::CDATA, value, line, column);
        Ok(true)
    }

    pub(super) fn parse_pi(&mut self) -> Result<bool> {
        let (line, column) = (self.ps.line_no, self.ps.column());
        let (end, _) = self.scan_name_ahead(2, false)?;
        let target_start = self.ps.pos + 2;
        let target = &self.ps.chars[target_start..self.ps.pos + end];
        if target.eq_ignore_ascii_case(b"xml") {
            let kind = if target == b"xml" {
                XmlErrorKind::XmlDeclarationNotFirst
            } else {
                XmlErrorKind::InvalidPiName(String::from_utf8_lossy(target).into_owned())
            };
            return Err(self.err_at(kind, target_start));
        }
        let name = self.name_table.add_bytes(target);

        let off = self.skip_whitespace_ahead(end)?;
        self.ps.pos += off;
        let value = if off == end {
            self.ensure(2)?;
            if !self.ps.window().starts_with(b"?>") {
                let kind = if self.ps.pos >= self.ps.used {
                    XmlErrorKind::UnexpectedEof("processing instruction")
                } else {
                    XmlErrorKind::BadNameChar(self.code_point_at(self.ps.pos))
                };
                return Err(self.err(kind));
            }
            self.ps.pos += 2;
            NodeValue::Empty
        } else {
            self.parse_delimited(Delimited::Pi)?
        };

        if self.settings.ignore_processing_instructions {
            return Ok(false);
        }
        self.set_value_node(NodeType::ProcessingInstruction, value, line, column);
        let node = &mut self.nodes[self.index];
        node.local_name = name.clone();
        node.name = name;
        Ok(true)
    }

    /// Value up to the construct's terminator, which is consumed
    fn parse_delimited(&mut self, kind: Delimited) -> Result<NodeValue> {
        let check = self.settings.check_characters;
        let terminator = kind.terminator();
        let mut spilled = false;
        self.builder.clear();

        loop {
            let mut c = Compactor::new(self.ps.pos);
            let used = self.ps.used;
            let eof = self.ps.is_eof;

            let after = loop {
                if c.read >= used {
                    break None;
                }
                let b = self.ps.chars[c.read];
                if b == terminator[0] {
                    let rest = &self.ps.chars[c.read..used];
                    if rest.starts_with(terminator) {
                        break Some(c.read + terminator.len());
                    }
                    if rest.len() < terminator.len() && terminator.starts_with(rest) {
                        break None;
                    }
                    if kind == Delimited::Comment && rest.starts_with(b"--") {
                        return Err(self.err_at(XmlErrorKind::InvalidCommentChars, c.read));
                    }
                    c.copy(&mut self.ps.chars);
                    continue;
                }
                match b {
                    b'\r' | b'\n' => match line_break_len(&self.ps.chars, c.read, used, eof) {
                        Some(len) => c.line_break(&mut self.ps, len, b'\n'),
                        None => break None,
                    },
                    _ => {
                        if check {
                            if let Some(cp) = invalid_char_at(&self.ps.chars, c.read, used) {
                                return Err(self.err_at(XmlErrorKind::InvalidCharacter(cp), c.read));
                            }
                        }
                        c.copy(&mut self.ps.chars);
                    }
                }
            };

            c.finish(&mut self.ps);
            self.ps.pos = c.read;
            if let Some(after) = after {
                let value = if spilled {
                    let run = String::from_utf8_lossy(&self.ps.chars[c.start..c.write]);
                    self.builder.append(&run);
                    NodeValue::Owned(self.builder.take())
                } else {
                    NodeValue::Slice {
                        version: self.ps.version(),
                        start: c.start,
                        len: c.write - c.start,
                    }
                };
                self.ps.pos = after;
                return Ok(value);
            }
            if eof {
                return Err(self.err_at(XmlErrorKind::UnexpectedEof(kind.what()), c.read));
            }
            if c.write > c.start {
                let run = String::from_utf8_lossy(&self.ps.chars[c.start..c.write]);
                self.builder.append(&run);
                spilled = true;
            }
            self.read_data()?;
        }
    }

    // ========================================================================
    // XML Declaration
    // ========================================================================

    /// `<?xml version="1.0" encoding="..." standalone="..."?>`
    ///
    /// Runs in append mode, so buffer offsets stay put while the whole
    /// declaration is pulled in.
    fn parse_xml_declaration(&mut self) -> Result<()> {
        let (line, column) = (self.ps.line_no, self.ps.column());
        let Some(close) = self.find_ahead(5, b"?>")? else {
            return Err(self.err_at(
                XmlErrorKind::UnexpectedEof("XML declaration"),
                self.ps.used,
            ));
        };
        let base = self.ps.pos;
        let end = base + close;
        let empty = self.known.empty.clone();
        let mut stage = DeclStage::Version;
        let mut inner = None;
        let mut i = base + 5;
        self.attr_count = 0;

        loop {
            let ws_start = i;
            i = self.skip_tag_whitespace(i, end);
            if i == end {
                break;
            }
            if i == ws_start {
                return Err(self.err_at(XmlErrorKind::ExpectingWhitespace(self.token_at(i)), i));
            }
            let (attr_line, attr_column) = (self.ps.line_no, self.ps.column_at(i));
            let name_end = i + self.ps.chars[i..end]
                .iter()
                .take_while(|b| b.is_ascii_alphabetic())
                .count();
            let name = &self.ps.chars[i..name_end];
            let next = match (name, stage) {
                (b"version", DeclStage::Version) => DeclStage::Encoding,
                (b"encoding", DeclStage::Encoding) => DeclStage::Standalone,
                (b"standalone", DeclStage::Encoding | DeclStage::Standalone) => DeclStage::Done,
                (b"encoding" | b"standalone", DeclStage::Version) => {
                    return Err(self.err_at(XmlErrorKind::VersionMissing, i));
                }
                _ => return Err(self.err_at(XmlErrorKind::InvalidXmlDeclaration, i)),
            };
            let name = self.name_table.add_bytes(name);

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
            let Some(close_quote) = find_byte(&self.ps.chars[..end], j + 1, quote) else {
                return Err(self.err_at(XmlErrorKind::UnclosedQuote, j));
            };
            let text = &self.ps.chars[j + 1..close_quote];
            // `next` tells which pseudo-attribute was just read
            let invalid = match next {
                DeclStage::Encoding if text != b"1.0" => Some(XmlErrorKind::InvalidVersionNumber(
                    String::from_utf8_lossy(text).into_owned(),
                )),
                DeclStage::Standalone => {
                    check_declared_encoding(&String::from_utf8_lossy(text)).err()
                }
                DeclStage::Done if text != b"yes" && text != b"no" => {
                    Some(XmlErrorKind::InvalidStandalone)
                }
                _ => None,
            };
            if let Some(kind) = invalid {
                return Err(self.err_at(kind, j + 1));
            }

            let version = self.ps.version();
            let slot = self.index + 1 + self.attr_count;
            let attr = self.node_slot(slot);
            attr.reset(NodeType::Attribute, &empty, 1);
            attr.local_name = name.clone();
            attr.name = name;
            attr.value = NodeValue::Slice {
                version,
                start: j + 1,
                len: close_quote - j - 1,
            };
            attr.quote_char = quote as char;
            attr.set_position(attr_line, attr_column);
            self.attr_count += 1;

            inner = Some((inner.map_or(i, |(s, _)| s), close_quote + 1));
            stage = next;
            i = close_quote + 1;
        }

        if stage == DeclStage::Version {
            return Err(self.err_at(XmlErrorKind::VersionMissing, i));
        }
        let (inner_start, inner_end) = inner.unwrap_or((end, end));
        let version = self.ps.version();
        let xml = self.known.xml.clone();
        let node = self.node_slot(self.index);
        node.reset(NodeType::XmlDeclaration, &empty, 0);
        node.local_name = xml.clone();
        node.name = xml;
        node.value = NodeValue::Slice {
            version,
            start: inner_start,
            len: inner_end - inner_start,
        };
        node.set_position(line, column);
        self.ps.pos = end + 2;
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Scan a name starting `off` bytes past `pos`, refilling as needed
    ///
    /// Returns the end offset and the colon offset, both relative to `pos`.
    pub(super) fn scan_name_ahead(
        &mut self,
        off: usize,
        qualified: bool,
    ) -> Result<(usize, Option<usize>)> {
        loop {
            match scan_name(self.ps.window(), off, qualified) {
                NameScan::Complete { end, colon } => return Ok((end, colon)),
                NameScan::Truncated => {
                    if self.read_data()? == 0 {
                        return Err(self.err_at(XmlErrorKind::UnexpectedEof("name"), self.ps.used));
                    }
                }
                NameScan::BadStart { at, ch } => {
                    let p = self.ps.pos + at;
                    if p >= self.ps.used {
                        return Err(self.err_at(XmlErrorKind::UnexpectedEof("name"), p));
                    }
                    return Err(self.err_at(XmlErrorKind::BadStartNameChar(ch), p));
                }
                NameScan::BadChar { at, ch } => {
                    return Err(self.err_at(XmlErrorKind::BadNameChar(ch), self.ps.pos + at));
                }
            }
        }
    }

    pub(super) fn code_point_at(&self, p: usize) -> u32 {
        self.ps
            .chars
            .get(p..self.ps.used)
            .and_then(decode_utf8)
            .map_or(0, |(ch, _)| ch as u32)
    }
}
