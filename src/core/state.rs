//! Parsing State (character buffer cursor)
//!
//! Owns the byte source, the UTF-8 decoder and the character window the
//! tokenizer indexes into. The window holds validated UTF-8 so the
//! tokenizer can scan it byte-wise with memchr.
//!
//! Buffer policy on refill:
//! - append mode (while the XML declaration is parsed): grow, never shift
//! - normal mode: shift the unconsumed tail to the front once half the
//!   buffer is consumed, otherwise double the buffer
//!
//! A shift moves data, so it bumps `version`; values that borrow from the
//! window must be materialized by the owner before `read_data` shifts.

use std::cell::Cell;
use std::io::{ErrorKind, Read};

use encoding_rs::{Decoder, DecoderResult, UTF_8};
use memchr::memchr2;
use tracing::debug;

use super::encoding::XmlEncoding;
use super::unicode::count_chars;
use crate::error::XmlErrorKind;

/// Smallest accepted character buffer
pub const MIN_BUFFER_SIZE: usize = 64;

/// Free space below which a refill makes room first (fits any UTF-8 sequence)
const MIN_FREE: usize = 16;

/// Size of the raw byte staging buffer
const RAW_BUFFER_SIZE: usize = 4096;

/// Character buffer, decoder and line bookkeeping for one document
pub struct ParsingState<R> {
    source: R,
    decoder: Decoder,
    raw: Vec<u8>,
    raw_pos: usize,
    raw_len: usize,
    source_done: bool,
    encoding: Option<XmlEncoding>,

    /// Decoded UTF-8 window; bytes past `used` are scratch
    pub chars: Vec<u8>,
    /// Next unconsumed byte
    pub pos: usize,
    /// End of decoded data
    pub used: usize,
    /// No more data will be decoded
    pub is_eof: bool,
    /// Never shift the buffer while set
    pub append_mode: bool,

    /// 1-based current line
    pub line_no: usize,
    /// Buffer offset where the current line starts
    pub line_start: usize,
    /// Characters of the current line that are no longer counted from the buffer
    col_base: isize,
    /// (line, offset, column) of the last column lookup
    col_cache: Cell<(usize, usize, usize)>,

    version: u64,
    total_chars: u64,
    max_chars: u64,
}

impl<R: Read> ParsingState<R> {
    /// Create a parsing state with the given initial buffer size
    pub fn new(source: R, buffer_size: usize) -> Self {
        let size = buffer_size.max(MIN_BUFFER_SIZE);
        ParsingState {
            source,
            decoder: UTF_8.new_decoder_without_bom_handling(),
            raw: vec![0u8; RAW_BUFFER_SIZE.max(size)],
            raw_pos: 0,
            raw_len: 0,
            source_done: false,
            encoding: None,
            chars: vec![0u8; size],
            pos: 0,
            used: 0,
            is_eof: false,
            append_mode: true,
            line_no: 1,
            line_start: 0,
            col_base: 0,
            col_cache: Cell::new((0, 0, 0)),
            version: 0,
            total_chars: 0,
            max_chars: 0,
        }
    }

    /// Limit the number of decoded characters (0 means unlimited)
    pub fn set_max_chars(&mut self, max: u64) {
        self.max_chars = max;
    }

    /// Detected input encoding, once the first refill has happened
    pub fn encoding(&self) -> Option<XmlEncoding> {
        self.encoding
    }

    /// Incremented whenever buffered data moves
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Unconsumed decoded data
    #[inline]
    pub fn window(&self) -> &[u8] {
        &self.chars[self.pos..self.used]
    }

    /// Whether the next `read_data` call will move buffered data
    pub fn shift_pending(&self) -> bool {
        !self.is_eof && self.chars.len() - self.used < MIN_FREE && self.can_shift()
    }

    fn can_shift(&self) -> bool {
        !self.append_mode
            && self.pos > 0
            && (self.pos >= self.chars.len() / 2 || self.pos == self.used)
    }

    // ========================================================================
    // Refill
    // ========================================================================

    /// Decode more input into the buffer
    ///
    /// Returns the number of bytes appended, 0 once the input is exhausted.
    pub fn read_data(&mut self) -> Result<usize, XmlErrorKind> {
        if self.is_eof {
            return Ok(0);
        }
        if self.encoding.is_none() {
            self.encoding = Some(self.detect_encoding()?);
        }
        self.make_room();

        loop {
            if self.raw_pos < self.raw_len || self.source_done {
                let last = self.source_done;
                let (result, read, written) = self.decoder.decode_to_utf8_without_replacement(
                    &self.raw[self.raw_pos..self.raw_len],
                    &mut self.chars[self.used..],
                    last,
                );
                self.raw_pos += read;
                let start = self.used;
                self.used += written;

                if let DecoderResult::Malformed(_, _) = result {
                    return Err(XmlErrorKind::InvalidByteSequence("UTF-8"));
                }
                if last && matches!(result, DecoderResult::InputEmpty) {
                    self.is_eof = true;
                    debug!(total = self.total_chars, "input exhausted");
                }
                if written > 0 {
                    self.account(start)?;
                    return Ok(written);
                }
                if self.is_eof {
                    return Ok(0);
                }
                if self.raw_pos < self.raw_len {
                    continue;
                }
            }
            self.fill_raw()?;
        }
    }

    fn detect_encoding(&mut self) -> Result<XmlEncoding, XmlErrorKind> {
        while self.raw_len < 4 && !self.source_done {
            self.fill_raw()?;
        }
        let encoding = XmlEncoding::detect(&self.raw[..self.raw_len]);
        debug!(encoding = encoding.name(), "detected input encoding");
        if !encoding.is_supported() {
            return Err(XmlErrorKind::UnsupportedEncoding(encoding.name().to_string()));
        }
        self.raw_pos = encoding.bom_len();
        Ok(encoding)
    }

    fn fill_raw(&mut self) -> Result<(), XmlErrorKind> {
        if self.raw_pos == self.raw_len {
            self.raw_pos = 0;
            self.raw_len = 0;
        }
        loop {
            match self.source.read(&mut self.raw[self.raw_len..]) {
                Ok(0) => {
                    self.source_done = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.raw_len += n;
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn account(&mut self, start: usize) -> Result<(), XmlErrorKind> {
        if self.max_chars == 0 {
            return Ok(());
        }
        self.total_chars += count_chars(&self.chars[start..self.used]) as u64;
        if self.total_chars > self.max_chars {
            return Err(XmlErrorKind::LimitExceeded("MaxCharactersInDocument"));
        }
        Ok(())
    }

    fn make_room(&mut self) {
        if self.chars.len() - self.used >= MIN_FREE {
            return;
        }
        if self.can_shift() {
            self.shift();
        }
        if self.chars.len() - self.used < MIN_FREE {
            let new_len = self.chars.len() * 2;
            debug!(from = self.chars.len(), to = new_len, "growing character buffer");
            self.chars.resize(new_len, 0);
        }
    }

    fn shift(&mut self) {
        let discard = self.pos;
        if self.line_start < discard {
            self.col_base += count_chars(&self.chars[self.line_start..discard]) as isize;
            self.line_start = 0;
        } else {
            self.line_start -= discard;
        }
        self.chars.copy_within(discard..self.used, 0);
        self.used -= discard;
        self.pos = 0;
        self.version += 1;
        self.col_cache.set((0, 0, 0));
        debug!(discarded = discard, kept = self.used, "shifted character buffer");
    }

    // ========================================================================
    // Line Tracking
    // ========================================================================

    /// A line break ended just before `next_line_start`
    #[inline]
    pub fn on_new_line(&mut self, next_line_start: usize) {
        self.line_no += 1;
        self.line_start = next_line_start;
        self.col_base = 0;
    }

    /// Advance line bookkeeping over `[from, to)`
    ///
    /// `\r\n` counts as one break; callers never split the pair across calls.
    pub fn track_lines(&mut self, from: usize, to: usize) {
        let mut i = from;
        while i < to {
            let Some(off) = memchr2(b'\n', b'\r', &self.chars[i..to]) else {
                break;
            };
            let at = i + off;
            let next = if self.chars[at] == b'\r' && at + 1 < to && self.chars[at + 1] == b'\n' {
                at + 2
            } else {
                at + 1
            };
            self.on_new_line(next);
            i = next;
        }
    }

    /// 1-based column of buffer offset `p` on the current line
    pub fn column_at(&self, p: usize) -> usize {
        let (line, cached_pos, cached_col) = self.col_cache.get();
        let col = if line == self.line_no && cached_pos >= self.line_start && cached_pos <= p {
            cached_col + count_chars(&self.chars[cached_pos..p])
        } else {
            let from = self.line_start.min(p);
            let counted = count_chars(&self.chars[from..p]) as isize;
            (counted + self.col_base + 1).max(1) as usize
        };
        self.col_cache.set((self.line_no, p, col));
        col
    }

    /// Column of the next unconsumed character
    #[inline]
    pub fn column(&self) -> usize {
        self.column_at(self.pos)
    }

    /// Record that `[from, to)` held `original` characters before it was
    /// rewritten in place, so later columns on this line stay exact
    pub fn rebase_columns(&mut self, from: usize, to: usize, original: usize) {
        let from = from.max(self.line_start);
        if from >= to {
            return;
        }
        let now = count_chars(&self.chars[from..to]);
        self.col_base += original as isize - now as isize;
        self.col_cache.set((0, 0, 0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Source that hands out at most `step` bytes per read
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn drain<R: Read>(ps: &mut ParsingState<R>) -> Vec<u8> {
        let mut out = Vec::new();
        while ps.read_data().unwrap() > 0 {
            out.extend_from_slice(ps.window());
            ps.pos = ps.used;
        }
        out
    }

    #[test]
    fn test_reads_everything() {
        let mut ps = ParsingState::new(Cursor::new(b"<root>text</root>".to_vec()), 64);
        assert_eq!(drain(&mut ps), b"<root>text</root>");
        assert!(ps.is_eof);
        assert_eq!(ps.read_data().unwrap(), 0);
    }

    #[test]
    fn test_skips_bom() {
        let mut ps = ParsingState::new(Cursor::new(b"\xEF\xBB\xBF<a/>".to_vec()), 64);
        assert_eq!(drain(&mut ps), b"<a/>");
        assert_eq!(ps.encoding(), Some(XmlEncoding::Utf8Bom));
    }

    #[test]
    fn test_rejects_utf16() {
        let mut ps = ParsingState::new(Cursor::new(vec![0xFF, 0xFE, b'<', 0x00]), 64);
        assert!(matches!(
            ps.read_data(),
            Err(XmlErrorKind::UnsupportedEncoding(name)) if name == "UTF-16LE"
        ));
    }

    #[test]
    fn test_multibyte_split_across_reads() {
        let text = "<a>héllo wörld 中文</a>";
        let mut ps = ParsingState::new(Trickle { data: text.as_bytes(), step: 1 }, 64);
        assert_eq!(drain(&mut ps), text.as_bytes());
    }

    #[test]
    fn test_malformed_input() {
        let mut ps = ParsingState::new(Cursor::new(b"<a>\xFF</a>".to_vec()), 64);
        let mut result = Ok(1);
        while let Ok(n) = result {
            if n == 0 {
                break;
            }
            ps.pos = ps.used;
            result = ps.read_data();
        }
        assert!(matches!(result, Err(XmlErrorKind::InvalidByteSequence(_))));
    }

    #[test]
    fn test_truncated_sequence_at_eof() {
        let mut ps = ParsingState::new(Cursor::new(b"<a>\xE4\xB8".to_vec()), 64);
        let mut saw_error = false;
        for _ in 0..4 {
            match ps.read_data() {
                Ok(0) => break,
                Ok(_) => ps.pos = ps.used,
                Err(XmlErrorKind::InvalidByteSequence(_)) => {
                    saw_error = true;
                    break;
                }
                Err(e) => panic!("unexpected error {e}"),
            }
        }
        assert!(saw_error);
    }

    #[test]
    fn test_shift_keeps_unconsumed_tail() {
        let data = "x".repeat(200);
        let mut ps = ParsingState::new(Trickle { data: data.as_bytes(), step: 40 }, 64);
        ps.append_mode = false;
        let mut collected = Vec::new();
        while ps.read_data().unwrap() > 0 {
            // consume all but the last byte
            if ps.used - ps.pos > 1 {
                collected.extend_from_slice(&ps.chars[ps.pos..ps.used - 1]);
                ps.pos = ps.used - 1;
            }
        }
        collected.extend_from_slice(ps.window());
        assert_eq!(collected, data.as_bytes());
        assert!(ps.version() > 0);
        assert_eq!(ps.chars.len(), 64);
    }

    #[test]
    fn test_append_mode_grows() {
        let data = "y".repeat(300);
        let mut ps = ParsingState::new(Cursor::new(data.clone().into_bytes()), 64);
        while ps.read_data().unwrap() > 0 {}
        assert_eq!(ps.window(), data.as_bytes());
        assert_eq!(ps.version(), 0);
        assert!(ps.chars.len() >= 300);
    }

    #[test]
    fn test_column_tracking() {
        let mut ps = ParsingState::new(Cursor::new("ab\r\ncé\nxyz".as_bytes().to_vec()), 64);
        while ps.read_data().unwrap() > 0 {}
        assert_eq!(ps.column_at(1), 2);
        ps.track_lines(0, ps.used);
        assert_eq!(ps.line_no, 3);
        let z = ps.used - 1;
        assert_eq!(ps.column_at(z), 3);
    }

    #[test]
    fn test_column_survives_shift() {
        let data = format!("{}<", "a".repeat(100));
        let mut ps = ParsingState::new(Trickle { data: data.as_bytes(), step: 30 }, 64);
        ps.append_mode = false;
        loop {
            ps.pos = ps.used;
            if ps.read_data().unwrap() == 0 {
                break;
            }
        }
        // every byte was on line 1; the last one is column 101
        assert_eq!(ps.column_at(ps.used - 1), 101);
    }

    #[test]
    fn test_rebase_columns() {
        let mut ps = ParsingState::new(Cursor::new(b"&amp;x".to_vec()), 64);
        while ps.read_data().unwrap() > 0 {}
        // "&amp;" rewritten in place to "&"
        ps.chars[0] = b'&';
        ps.chars[1] = b'x';
        ps.rebase_columns(0, 6, 6);
        assert_eq!(ps.column_at(6), 7);
    }

    #[test]
    fn test_character_limit() {
        let mut ps = ParsingState::new(Cursor::new(vec![b'a'; 100]), 64);
        ps.set_max_chars(10);
        assert!(matches!(ps.read_data(), Err(XmlErrorKind::LimitExceeded(_))));
    }
}
