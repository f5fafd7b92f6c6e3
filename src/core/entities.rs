//! XML Character and Entity References
//!
//! Recognizes a reference starting at `&` in the character buffer:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! Any other named reference is reported as unexpanded; without a DTD the
//! caller treats it as an undeclared entity. A reference cut off by the end
//! of the buffer asks for more data instead of failing.

use super::unicode::{
    combine_surrogates, decode_utf8, is_name_char, is_name_start_char, is_xml_char,
    split_surrogates,
};
use crate::error::XmlErrorKind;

/// Outcome of scanning one reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Decoded character and the number of bytes the reference occupied
    Char { ch: char, len: usize },
    /// Well-formed named reference that is not one of the predefined five
    Unexpanded { name: String, len: usize },
    /// The buffer ends before the reference does
    Incomplete,
}

/// Resolve one of the predefined entities
#[inline]
pub fn predefined_entity(name: &[u8]) -> Option<char> {
    match name {
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"amp" => Some('&'),
        b"quot" => Some('"'),
        b"apos" => Some('\''),
        _ => None,
    }
}

/// Parse a reference at the start of `input` (which begins with `&`)
///
/// `eof` tells whether more input can follow `input`; when it cannot, a
/// truncated reference is an error rather than `Incomplete`.
pub fn parse_reference(input: &[u8], eof: bool) -> Result<Reference, XmlErrorKind> {
    debug_assert_eq!(input.first(), Some(&b'&'));
    match input.get(1) {
        None if eof => Err(XmlErrorKind::ErrorParsingEntityName),
        None => Ok(Reference::Incomplete),
        Some(b'#') => parse_char_reference(input, eof),
        Some(_) => parse_entity_reference(input, eof),
    }
}

fn parse_char_reference(input: &[u8], eof: bool) -> Result<Reference, XmlErrorKind> {
    let hex = match input.get(2) {
        Some(b'x') => true,
        Some(_) => false,
        None if eof => return Err(XmlErrorKind::InvalidNumericReference(false)),
        None => return Ok(Reference::Incomplete),
    };
    let digits_start = if hex { 3 } else { 2 };
    let mut pos = digits_start;
    let mut value: u32 = 0;

    loop {
        let Some(&b) = input.get(pos) else {
            return if eof {
                Err(XmlErrorKind::InvalidNumericReference(hex))
            } else {
                Ok(Reference::Incomplete)
            };
        };
        let digit = match b {
            b'0'..=b'9' => (b - b'0') as u32,
            b'a'..=b'f' if hex => (b - b'a' + 10) as u32,
            b'A'..=b'F' if hex => (b - b'A' + 10) as u32,
            b';' if pos > digits_start => break,
            _ => return Err(XmlErrorKind::InvalidNumericReference(hex)),
        };
        let radix = if hex { 16 } else { 10 };
        // Saturate well above the Unicode range so overflow stays invalid
        value = value.saturating_mul(radix).saturating_add(digit).min(0x0100_0000);
        pos += 1;
    }

    let ch = check_char_reference(value)?;
    Ok(Reference::Char { ch, len: pos + 1 })
}

/// Validate a numeric reference value
///
/// Supplementary-plane values are split into a UTF-16 pair and only
/// accepted when both halves land in the proper surrogate ranges.
pub fn check_char_reference(value: u32) -> Result<char, XmlErrorKind> {
    if value > 0xFFFF {
        if value > 0x10FFFF {
            return Err(XmlErrorKind::InvalidCharacterReference(value));
        }
        let (high, low) = split_surrogates(value);
        return combine_surrogates(high, low)
            .ok_or(XmlErrorKind::InvalidSurrogatePair { high, low });
    }
    if !is_xml_char(value) {
        return Err(XmlErrorKind::InvalidCharacterReference(value));
    }
    char::from_u32(value).ok_or(XmlErrorKind::InvalidCharacterReference(value))
}

fn parse_entity_reference(input: &[u8], eof: bool) -> Result<Reference, XmlErrorKind> {
    let mut pos = 1;
    loop {
        let Some(&b) = input.get(pos) else {
            return if eof {
                Err(XmlErrorKind::ErrorParsingEntityName)
            } else {
                Ok(Reference::Incomplete)
            };
        };
        if b == b';' && pos > 1 {
            break;
        }
        let (ch, len) = match decode_utf8(&input[pos..]) {
            Some(decoded) => decoded,
            None if eof => return Err(XmlErrorKind::ErrorParsingEntityName),
            None => return Ok(Reference::Incomplete),
        };
        let valid = if pos == 1 {
            is_name_start_char(ch)
        } else {
            is_name_char(ch)
        };
        if !valid {
            return Err(XmlErrorKind::ErrorParsingEntityName);
        }
        pos += len;
    }

    let name = &input[1..pos];
    let len = pos + 1;
    Ok(match predefined_entity(name) {
        Some(ch) => Reference::Char { ch, len },
        None => Reference::Unexpanded {
            name: String::from_utf8_lossy(name).into_owned(),
            len,
        },
    })
}
