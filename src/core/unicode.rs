//! XML Character Classes
//!
//! Character class predicates for the XML 1.0 (Fifth Edition) `Char`,
//! `NameStartChar` and `NameChar` productions, plus the UTF-8 and UTF-16
//! surrogate helpers the reader needs when it works on raw buffer bytes.

/// Check if a code point matches the XML `Char` production
#[inline]
pub fn is_xml_char(cp: u32) -> bool {
    matches!(cp,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

/// Check if a byte is XML whitespace (space, tab, line feed, carriage return)
#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Check if a character may start an XML name
#[inline]
pub fn is_name_start_char(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_alphabetic() || c == '_' || c == ':';
    }
    matches!(c as u32,
        0xC0..=0xD6 | 0xD8..=0xF6 | 0xF8..=0x2FF |
        0x370..=0x37D | 0x37F..=0x1FFF | 0x200C..=0x200D |
        0x2070..=0x218F | 0x2C00..=0x2FEF | 0x3001..=0xD7FF |
        0xF900..=0xFDCF | 0xFDF0..=0xFFFD | 0x10000..=0xEFFFF
    )
}

/// Check if a character may appear inside an XML name
#[inline]
pub fn is_name_char(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-' | '.');
    }
    is_name_start_char(c) || matches!(c as u32, 0xB7 | 0x300..=0x36F | 0x203F..=0x2040)
}

/// Decode the character starting at `bytes[0]`
///
/// Returns the character and its encoded length, or `None` when the slice is
/// empty or ends in the middle of a sequence.
#[inline]
pub fn decode_utf8(bytes: &[u8]) -> Option<(char, usize)> {
    let first = *bytes.first()?;
    let len = match first {
        0x00..=0x7F => return Some((first as char, 1)),
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    };
    let seq = bytes.get(..len)?;
    let s = std::str::from_utf8(seq).ok()?;
    s.chars().next().map(|c| (c, len))
}

/// Count the characters in a UTF-8 byte slice
#[inline]
pub fn count_chars(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| !is_continuation(b)).count()
}

/// Check if a byte continues a multi-byte UTF-8 sequence
#[inline]
pub fn is_continuation(b: u8) -> bool {
    b & 0xC0 == 0x80
}

/// Find the first character in a UTF-8 run that is not an XML `Char`
///
/// Only control characters and U+FFFE/U+FFFF can fail the check once the
/// input has been decoded, so this works on bytes without decoding.
pub fn find_invalid_char(bytes: &[u8]) -> Option<(usize, u32)> {
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r') {
            return Some((i, b as u32));
        }
        if b == 0xEF && i + 2 < bytes.len() && bytes[i + 1] == 0xBF && bytes[i + 2] >= 0xBE {
            let cp = 0xFFFE + (bytes[i + 2] - 0xBE) as u32;
            return Some((i, cp));
        }
        i += 1;
    }
    None
}

// ============================================================================
// Surrogates
// ============================================================================

pub const SURROGATE_HIGH_START: u16 = 0xD800;
pub const SURROGATE_HIGH_END: u16 = 0xDBFF;
pub const SURROGATE_LOW_START: u16 = 0xDC00;
pub const SURROGATE_LOW_END: u16 = 0xDFFF;

#[inline]
pub fn is_high_surrogate(unit: u16) -> bool {
    (SURROGATE_HIGH_START..=SURROGATE_HIGH_END).contains(&unit)
}

#[inline]
pub fn is_low_surrogate(unit: u16) -> bool {
    (SURROGATE_LOW_START..=SURROGATE_LOW_END).contains(&unit)
}

/// Split a supplementary-plane code point into its UTF-16 surrogate pair
#[inline]
pub fn split_surrogates(cp: u32) -> (u16, u16) {
    let v = cp.wrapping_sub(0x10000);
    let high = SURROGATE_HIGH_START as u32 + ((v >> 10) & 0x3FF);
    let low = SURROGATE_LOW_START as u32 + (v & 0x3FF);
    (high as u16, low as u16)
}

/// Combine a well-formed surrogate pair into a character
#[inline]
pub fn combine_surrogates(high: u16, low: u16) -> Option<char> {
    if !is_high_surrogate(high) || !is_low_surrogate(low) {
        return None;
    }
    let cp = 0x10000 + (((high - SURROGATE_HIGH_START) as u32) << 10) + (low - SURROGATE_LOW_START) as u32;
    char::from_u32(cp)
}
