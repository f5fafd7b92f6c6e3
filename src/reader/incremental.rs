//! Incremental Reads
//!
//! - `read_chars`: stream the raw inner markup of the current element
//!   into a caller buffer, stopping at its matching end tag
//! - `read_value_chunk`: hand out the current node's value piece by piece
//!
//! The raw reader never builds nodes. It copies whole constructs (a text
//! run, a comment, a start tag with its quoted values) so a `</` inside
//! any of them is never mistaken for the end of the element. Nested
//! elements with the same name are counted to find the matching end tag.

use std::collections::VecDeque;
use std::io::Read;

use memchr::memchr;

use super::contract::XmlReader;
use super::text_reader::{Cursor, ParsingFunction, XmlTextReader};
use super::NodeType;
use crate::core::scanner::{scan_name, NameScan};
use crate::core::strings::Atom;
use crate::core::unicode::is_whitespace;
use crate::error::{Result, XmlErrorKind};

/// State of an in-progress `read_chars`
#[derive(Debug, Default)]
pub(super) struct IncrementalRead {
    /// Element whose content is being read
    name: Option<Atom>,
    /// Open elements inside it that share its name
    depth: usize,
    /// Characters copied but not yet handed out
    pending: VecDeque<char>,
}

impl<R: Read> XmlTextReader<R> {
    /// Read the raw content of the current element
    ///
    /// Markup inside the element is returned as written, with line endings
    /// normalized. Returns 0 once the matching end tag is reached, leaving
    /// the reader on that `EndElement`. On an empty element the reader
    /// advances and 0 is returned; on any other node nothing happens.
    pub fn read_chars(&mut self, buf: &mut [char]) -> Result<usize> {
        self.check_usable()?;
        if self.parsing_function != ParsingFunction::InIncrementalRead {
            let node = &self.nodes[self.index];
            if self.cursor != Cursor::Node || node.node_type != NodeType::Element {
                return Ok(0);
            }
            if node.is_empty_element {
                self.read()?;
                return Ok(0);
            }
            self.incremental = IncrementalRead {
                name: Some(node.name.clone()),
                ..Default::default()
            };
            self.parsing_function = ParsingFunction::InIncrementalRead;
        }
        match self.incremental_read(buf) {
            Ok(n) => Ok(n),
            Err(err) => Err(self.fail(err)),
        }
    }

    fn incremental_read(&mut self, buf: &mut [char]) -> Result<usize> {
        let mut count = 0;
        while count < buf.len() {
            if let Some(ch) = self.incremental.pending.pop_front() {
                buf[count] = ch;
                count += 1;
                continue;
            }
            if self.parsing_function != ParsingFunction::InIncrementalRead
                || !self.next_raw_unit()?
            {
                break;
            }
        }
        Ok(count)
    }

    /// Drop the rest of the element so `read` lands on its end tag
    pub(super) fn finish_incremental_read(&mut self) -> Result<()> {
        while self.parsing_function == ParsingFunction::InIncrementalRead {
            self.incremental.pending.clear();
            if !self.next_raw_unit()? {
                break;
            }
        }
        self.incremental.pending.clear();
        Ok(())
    }

    /// Copy the next text run or markup construct into `pending`
    ///
    /// Returns false once the end tag of the element being read has been
    /// parsed.
    fn next_raw_unit(&mut self) -> Result<bool> {
        if self.ps.pos >= self.ps.used && self.read_data()? == 0 {
            self.enter_element();
            return Err(self.unclosed_error());
        }

        let window = self.ps.window();
        if window[0] != b'<' {
            let mut len = memchr(b'<', window).unwrap_or(window.len());
            // hold back a trailing \r until the byte after it is known
            if len == window.len() && window[len - 1] == b'\r' && !self.ps.is_eof {
                len -= 1;
                if len == 0 {
                    self.read_data()?;
                    return Ok(true);
                }
            }
            self.take_raw(len);
            return Ok(true);
        }

        if !self.ensure(2)? {
            return Err(self.err_at(XmlErrorKind::UnexpectedEof("markup"), self.ps.used));
        }
        let name = self
            .incremental
            .name
            .clone()
            .unwrap_or_else(|| self.known.empty.clone());
        let len = match self.ps.chars[self.ps.pos + 1] {
            b'/' => {
                let close = self.expect_ahead(2, b">", "end tag")?;
                let tag = &self.ps.window()[2..close];
                let name_len = tag.iter().rposition(|&b| !is_whitespace(b)).map_or(0, |i| i + 1);
                if &tag[..name_len] == name.as_bytes() {
                    if self.incremental.depth == 0 {
                        self.enter_element();
                        self.parse_end_element()?;
                        return Ok(false);
                    }
                    self.incremental.depth -= 1;
                }
                close + 1
            }
            b'!' => {
                if self.starts_with_ahead(b"<!--")? {
                    self.expect_ahead(4, b"-->", "comment")? + 3
                } else if self.starts_with_ahead(b"<![CDATA[")? {
                    self.expect_ahead(9, b"]]>", "CDATA section")? + 3
                } else {
                    self.expect_ahead(2, b">", "markup")? + 1
                }
            }
            b'?' => self.expect_ahead(2, b"?>", "processing instruction")? + 2,
            _ => {
                let close = self.find_tag_end()?;
                let window = self.ps.window();
                if let NameScan::Complete { end, .. } = scan_name(window, 1, false) {
                    if &window[1..end] == name.as_bytes() && window[close - 1] != b'/' {
                        self.incremental.depth += 1;
                    }
                }
                close + 1
            }
        };
        self.take_raw(len);
        Ok(true)
    }

    fn expect_ahead(&mut self, from: usize, needle: &[u8], what: &'static str) -> Result<usize> {
        match self.find_ahead(from, needle)? {
            Some(off) => Ok(off),
            None => Err(self.err_at(XmlErrorKind::UnexpectedEof(what), self.ps.used)),
        }
    }

    /// Move `len` bytes at `pos` into `pending`, normalizing line endings
    fn take_raw(&mut self, len: usize) {
        let start = self.ps.pos;
        let end = start + len;
        let text = String::from_utf8_lossy(&self.ps.chars[start..end]);
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\r' if chars.peek() == Some(&'\n') => {}
                '\r' => self.incremental.pending.push_back('\n'),
                _ => self.incremental.pending.push_back(ch),
            }
        }
        self.ps.track_lines(start, end);
        self.ps.pos = end;
    }

    /// Copy the next piece of the current node's value into `buf`
    ///
    /// Successive calls continue where the previous one stopped and return
    /// 0 once the value is exhausted. Reading or moving the cursor starts
    /// over.
    pub fn read_value_chunk(&mut self, buf: &mut [char]) -> Result<usize> {
        self.check_usable()?;
        if !self.node_type().has_value() {
            return Err(self.invalid_node_error("ReadValueChunk"));
        }
        let (count, consumed) = {
            let value = self.value();
            let rest = value.get(self.value_offset..).unwrap_or("");
            let mut count = 0;
            let mut consumed = 0;
            for (slot, ch) in buf.iter_mut().zip(rest.chars()) {
                *slot = ch;
                count += 1;
                consumed += ch.len_utf8();
            }
            (count, consumed)
        };
        self.value_offset += consumed;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ReadState;

    fn drain(r: &mut XmlTextReader<&[u8]>, size: usize) -> String {
        let mut buf = vec!['\0'; size];
        let mut out = String::new();
        loop {
            let n = r.read_chars(&mut buf).unwrap();
            if n == 0 {
                return out;
            }
            out.extend(&buf[..n]);
        }
    }

    #[test]
    fn test_read_chars_raw_content() {
        let xml = "<root><a x='1'>text<!-- </a> --><![CDATA[</a>]]><b y='/>'/></a>tail</root>";
        let mut r = XmlTextReader::new(xml.as_bytes());
        r.read().unwrap();
        r.read().unwrap();
        assert_eq!(r.name(), "a");
        assert_eq!(drain(&mut r, 3), "text<!-- </a> --><![CDATA[</a>]]><b y='/>'/>");
        assert_eq!(r.node_type(), NodeType::EndElement);
        assert_eq!(r.name(), "a");
        assert_eq!(r.depth(), 1);
        r.read().unwrap();
        assert_eq!(r.value(), "tail");
    }

    #[test]
    fn test_read_chars_nested_same_name() {
        let xml = "<a><a>in</a><a/>\r\nx</a>";
        let mut r = XmlTextReader::new(xml.as_bytes());
        r.read().unwrap();
        assert_eq!(drain(&mut r, 64), "<a>in</a><a/>\nx");
        assert_eq!(r.node_type(), NodeType::EndElement);
        assert_eq!(r.depth(), 0);
        assert!(!r.read().unwrap());
    }

    #[test]
    fn test_read_chars_on_empty_element() {
        let mut r = XmlTextReader::new("<r><e/><f/></r>".as_bytes());
        r.read().unwrap();
        r.read().unwrap();
        let mut buf = ['\0'; 8];
        assert_eq!(r.read_chars(&mut buf).unwrap(), 0);
        assert_eq!(r.name(), "f");
    }

    #[test]
    fn test_read_after_partial_read_chars() {
        let mut r = XmlTextReader::new("<r><a>0123456789</a><b/></r>".as_bytes());
        r.read().unwrap();
        r.read().unwrap();
        let mut buf = ['\0'; 4];
        assert_eq!(r.read_chars(&mut buf).unwrap(), 4);
        assert!(r.read().unwrap());
        assert_eq!(r.node_type(), NodeType::EndElement);
        assert_eq!(r.name(), "a");
        r.read().unwrap();
        assert_eq!(r.name(), "b");
    }

    #[test]
    fn test_read_chars_unclosed() {
        let mut r = XmlTextReader::new("<a>text".as_bytes());
        r.read().unwrap();
        let mut buf = ['\0'; 16];
        let err = loop {
            match r.read_chars(&mut buf) {
                Ok(0) => panic!("expected an error"),
                Ok(_) => continue,
                Err(err) => break err,
            }
        };
        assert!(matches!(err.kind(), XmlErrorKind::UnclosedElements(names) if names == "a"));
        assert_eq!(r.read_state(), ReadState::Error);
    }

    #[test]
    fn test_read_value_chunk() {
        let mut r = XmlTextReader::new("<a>héllo wörld</a>".as_bytes());
        r.read().unwrap();
        let mut buf = ['\0'; 4];
        assert!(r.read_value_chunk(&mut buf).is_err());
        r.read().unwrap();
        let mut out = String::new();
        loop {
            let n = r.read_value_chunk(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend(&buf[..n]);
        }
        assert_eq!(out, "héllo wörld");
    }
}
