//! xmlpull - Non-validating streaming XML pull reader
//!
//! Reads a UTF-8 byte stream one node at a time through a forward-only
//! cursor, without building a tree:
//!
//! ```
//! use xmlpull::{NodeType, XmlReader, XmlTextReader};
//!
//! let mut reader = XmlTextReader::new("<a x='1'>hi</a>".as_bytes());
//! while reader.read()? {
//!     if reader.node_type() == NodeType::Text {
//!         assert_eq!(reader.value(), "hi");
//!     }
//! }
//! # Ok::<(), xmlpull::XmlError>(())
//! ```
//!
//! Layers:
//! - `core`: character buffer, decoding, scanning, entities, name table
//! - `reader`: the `XmlReader` contract and the `XmlTextReader` tokenizer

pub mod core;
pub mod reader;

mod error;
mod settings;

pub use crate::core::strings::{Atom, NameTable};
pub use error::{Result, XmlError, XmlErrorKind};
pub use reader::{
    NodeType, ReadState, XmlReader, XmlSpace, XmlTextReader, XMLNS_NAMESPACE, XML_NAMESPACE,
};
pub use settings::{ConformanceLevel, ReaderSettings, WhitespaceHandling};
