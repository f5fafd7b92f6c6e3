//! Reader configuration

use crate::core::strings::NameTable;

/// How much of the document the reader accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConformanceLevel {
    /// A single root element; the XML declaration may only appear first
    #[default]
    Document,
    /// Any sequence of elements and text at the top level
    Fragment,
}

/// Which whitespace nodes are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhitespaceHandling {
    /// Report `Whitespace` and `SignificantWhitespace`
    #[default]
    All,
    /// Report `SignificantWhitespace` only
    Significant,
    /// Report no whitespace nodes
    None,
}

/// Options for `XmlTextReader`
#[derive(Debug, Clone)]
pub struct ReaderSettings {
    pub conformance_level: ConformanceLevel,
    pub whitespace_handling: WhitespaceHandling,
    /// Parse comments but do not report them
    pub ignore_comments: bool,
    /// Parse processing instructions but do not report them
    pub ignore_processing_instructions: bool,
    /// Reject characters outside the XML `Char` production
    pub check_characters: bool,
    /// Resolve prefixes against in-scope namespace declarations
    pub namespaces: bool,
    /// Initial character buffer size in bytes
    pub buffer_size: usize,
    /// Upper bound on decoded characters, 0 for no limit
    pub max_characters_in_document: u64,
    /// Share an existing name table instead of creating one
    pub name_table: Option<NameTable>,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        ReaderSettings {
            conformance_level: ConformanceLevel::Document,
            whitespace_handling: WhitespaceHandling::All,
            ignore_comments: false,
            ignore_processing_instructions: false,
            check_characters: true,
            namespaces: true,
            buffer_size: 4096,
            max_characters_in_document: 0,
            name_table: None,
        }
    }
}

impl ReaderSettings {
    pub fn fragment() -> Self {
        ReaderSettings {
            conformance_level: ConformanceLevel::Fragment,
            ..Default::default()
        }
    }
}
