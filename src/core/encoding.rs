//! XML Encoding Detection
//!
//! Sniffs the byte order mark or the leading byte pattern of a document.
//! Only UTF-8 is decoded; every other recognizable signature is reported by
//! name so the reader can reject it.

use encoding_rs::{Encoding, UTF_8};

use crate::error::XmlErrorKind;

/// Encoding signature found at the start of the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEncoding {
    /// No signature; assumed UTF-8
    Utf8,
    /// UTF-8 with a byte order mark
    Utf8Bom,
    Utf16Be,
    Utf16Le,
    Ucs4Be,
    Ucs4Le,
    Ucs4Unusual,
    Ebcdic,
}

impl XmlEncoding {
    /// Detect encoding from byte order mark or initial bytes
    ///
    /// Needs up to four bytes; shorter input is treated as UTF-8.
    pub fn detect(input: &[u8]) -> Self {
        match input {
            [0xEF, 0xBB, 0xBF, ..] => XmlEncoding::Utf8Bom,
            [0x00, 0x00, 0xFE, 0xFF, ..] | [0x00, 0x00, 0x00, b'<', ..] => XmlEncoding::Ucs4Be,
            [0xFF, 0xFE, 0x00, 0x00, ..] | [b'<', 0x00, 0x00, 0x00, ..] => XmlEncoding::Ucs4Le,
            [0x00, 0x00, 0xFF, 0xFE, ..]
            | [0xFE, 0xFF, 0x00, 0x00, ..]
            | [0x00, 0x00, b'<', 0x00, ..]
            | [0x00, b'<', 0x00, 0x00, ..] => XmlEncoding::Ucs4Unusual,
            [0xFE, 0xFF, ..] | [0x00, b'<', 0x00, b'?', ..] => XmlEncoding::Utf16Be,
            [0xFF, 0xFE, ..] | [b'<', 0x00, b'?', 0x00, ..] => XmlEncoding::Utf16Le,
            [0x4C, 0x6F, 0xA7, 0x94, ..] => XmlEncoding::Ebcdic,
            _ => XmlEncoding::Utf8,
        }
    }

    /// Length of the byte order mark to skip
    pub fn bom_len(self) -> usize {
        match self {
            XmlEncoding::Utf8Bom => 3,
            _ => 0,
        }
    }

    /// Whether the reader can decode this encoding
    pub fn is_supported(self) -> bool {
        matches!(self, XmlEncoding::Utf8 | XmlEncoding::Utf8Bom)
    }

    pub fn name(self) -> &'static str {
        match self {
            XmlEncoding::Utf8 | XmlEncoding::Utf8Bom => "UTF-8",
            XmlEncoding::Utf16Be => "UTF-16BE",
            XmlEncoding::Utf16Le => "UTF-16LE",
            XmlEncoding::Ucs4Be => "UCS-4BE",
            XmlEncoding::Ucs4Le => "UCS-4LE",
            XmlEncoding::Ucs4Unusual => "UCS-4 (unusual octet order)",
            XmlEncoding::Ebcdic => "EBCDIC",
        }
    }

    /// The decoder for this encoding, if supported
    pub fn encoding(self) -> Option<&'static Encoding> {
        self.is_supported().then_some(UTF_8)
    }
}

/// Check the `encoding` pseudo-attribute of an XML declaration
///
/// Labels are resolved with the WHATWG label table, so `utf8` and `UTF-8`
/// are both accepted.
pub fn check_declared_encoding(label: &str) -> Result<&'static Encoding, XmlErrorKind> {
    match Encoding::for_label(label.as_bytes()) {
        Some(enc) if enc == UTF_8 => Ok(enc),
        _ => Err(XmlErrorKind::UnsupportedEncoding(label.to_string())),
    }
}
