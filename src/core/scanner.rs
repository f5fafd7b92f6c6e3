//! Buffer scanning using memchr
//!
//! Stateless helpers that search a window of the character buffer. The
//! reader keeps positions relative to the start of the construct it is
//! parsing, so every search here can be resumed after a refill.
//!
//! memchr uses SIMD when available:
//! - SSE2 (default x86_64)
//! - AVX2 (runtime detection)
//! - NEON (aarch64)

use memchr::{memchr, memchr3, memmem};

use super::unicode::{decode_utf8, is_name_char, is_name_start_char};

/// Resumable search for the `>` that closes a start tag
#[derive(Debug, Clone, Copy, Default)]
pub struct TagEndScan {
    /// Offset where the next search starts
    pub offset: usize,
    /// Quote character we are inside of, if any
    quote: Option<u8>,
}

impl TagEndScan {
    pub fn new(offset: usize) -> Self {
        TagEndScan { offset, quote: None }
    }

    /// Whether the scan stopped inside a quoted value
    pub fn in_quote(&self) -> bool {
        self.quote.is_some()
    }

    /// Find tag end while handling quotes properly
    ///
    /// Returns the offset of the first `>` outside a quoted value. When the
    /// window is exhausted the scan state is kept so the caller can refill
    /// and call again with a longer window.
    pub fn find(&mut self, window: &[u8]) -> Option<usize> {
        while self.offset < window.len() {
            let rest = &window[self.offset..];
            match self.quote {
                Some(q) => match memchr(q, rest) {
                    Some(i) => {
                        self.offset += i + 1;
                        self.quote = None;
                    }
                    None => {
                        self.offset = window.len();
                    }
                },
                None => match memchr3(b'>', b'"', b'\'', rest) {
                    Some(i) => {
                        let b = rest[i];
                        if b == b'>' {
                            self.offset += i;
                            return Some(self.offset);
                        }
                        self.quote = Some(b);
                        self.offset += i + 1;
                    }
                    None => {
                        self.offset = window.len();
                    }
                },
            }
        }
        None
    }
}

/// Find a byte sequence at or after `from`
#[inline]
pub fn find_seq(window: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    window
        .get(from..)
        .and_then(|rest| memmem::find(rest, needle))
        .map(|i| from + i)
}

/// Find the next occurrence of a byte at or after `from`
#[inline]
pub fn find_byte(window: &[u8], from: usize, byte: u8) -> Option<usize> {
    window.get(from..).and_then(|rest| memchr(byte, rest)).map(|i| from + i)
}

/// Result of scanning a (possibly qualified) XML name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameScan {
    /// Name ends before `end`; `colon` is the offset of the prefix separator
    Complete { end: usize, colon: Option<usize> },
    /// Name runs up to the end of the window
    Truncated,
    /// The character at `at` cannot appear here
    BadStart { at: usize, ch: u32 },
    BadChar { at: usize, ch: u32 },
}

/// Scan an XML name starting at `start`
///
/// With `qualified` set the name must be a QName: at most one colon, not at
/// either end. Otherwise a colon is an ordinary name character.
pub fn scan_name(window: &[u8], start: usize, qualified: bool) -> NameScan {
    let mut pos = start;
    let mut colon = None;
    let mut at_start = true;

    loop {
        let Some(&b) = window.get(pos) else {
            return NameScan::Truncated;
        };
        let (ch, len) = if b < 0x80 {
            (b as char, 1)
        } else {
            match decode_utf8(&window[pos..]) {
                Some(decoded) => decoded,
                None => return NameScan::Truncated,
            }
        };

        if at_start {
            if !is_name_start_char(ch) || (qualified && ch == ':') {
                return NameScan::BadStart { at: pos, ch: ch as u32 };
            }
            at_start = false;
        } else if qualified && ch == ':' {
            if colon.is_some() {
                return NameScan::BadChar { at: pos, ch: ':' as u32 };
            }
            colon = Some(pos);
            at_start = true;
        } else if !is_name_char(ch) {
            return NameScan::Complete { end: pos, colon };
        }
        pos += len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tag_end_quoted() {
        let mut scan = TagEndScan::new(0);
        assert_eq!(scan.find(b"<a attr=\">test\">content"), Some(15));
    }

    #[test]
    fn test_find_tag_end_resumes_inside_quote() {
        let doc = b"<a x='1>2' y=\"'\">";
        let mut scan = TagEndScan::new(1);
        assert_eq!(scan.find(&doc[..7]), None);
        assert_eq!(scan.find(&doc[..12]), None);
        assert_eq!(scan.find(doc), Some(16));
    }

    #[test]
    fn test_find_seq() {
        assert_eq!(find_seq(b"abc-->", 0, b"-->"), Some(3));
        assert_eq!(find_seq(b"abc-->", 4, b"-->"), None);
        assert_eq!(find_seq(b"ab", 5, b"-->"), None);
    }

    #[test]
    fn test_scan_name() {
        assert_eq!(
            scan_name(b"element-name>", 0, true),
            NameScan::Complete { end: 12, colon: None }
        );
        assert_eq!(
            scan_name(b"p:local ", 0, true),
            NameScan::Complete { end: 7, colon: Some(1) }
        );
        assert_eq!(scan_name(b"abc", 0, true), NameScan::Truncated);
        assert_eq!(scan_name(b"1abc ", 0, true), NameScan::BadStart { at: 0, ch: '1' as u32 });
        assert_eq!(scan_name(b"a:b:c ", 0, true), NameScan::BadChar { at: 3, ch: ':' as u32 });
        assert_eq!(
            scan_name(b"a:b:c ", 0, false),
            NameScan::Complete { end: 5, colon: None }
        );
        assert_eq!(scan_name(b"a:>", 0, true), NameScan::BadStart { at: 2, ch: '>' as u32 });
    }

    #[test]
    fn test_scan_unicode_name() {
        let doc = "données=".as_bytes();
        assert_eq!(
            scan_name(doc, 0, true),
            NameScan::Complete { end: doc.len() - 1, colon: None }
        );
    }
}
