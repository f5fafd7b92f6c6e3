//! Core XML parsing primitives
//!
//! The building blocks the pull reader is made of:
//! - State: character buffer, refills, UTF-8 decoding, line tracking
//! - Scanner: memchr-based searches over the buffer window
//! - Entities: character and predefined entity references
//! - Strings: the name table that atomizes names
//! - Buffer: segmented accumulator for values spanning refills
//! - Encoding: byte order mark and signature detection
//! - Unicode: XML character classes

pub mod buffer;
pub mod encoding;
pub mod entities;
pub mod scanner;
pub mod state;
pub mod strings;
pub mod unicode;
