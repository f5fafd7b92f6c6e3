//! XML Pull Reader
//!
//! - XmlReader: the node-cursor contract and the helpers layered on it
//! - XmlTextReader: the streaming tokenizer implementing the contract
//! - Node: per-depth node records and lazily materialized values
//! - Namespaces: the in-scope prefix bindings

mod content;
mod contract;
mod incremental;
mod markup;
mod namespaces;
mod node;
mod text_reader;

pub use contract::XmlReader;
pub use namespaces::{XMLNS_NAMESPACE, XML_NAMESPACE};
pub use text_reader::XmlTextReader;

/// Type of the node the reader is positioned on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeType {
    #[default]
    None,
    Element,
    Attribute,
    Text,
    CDATA,
    EntityReference,
    ProcessingInstruction,
    Comment,
    Document,
    DocumentType,
    Whitespace,
    SignificantWhitespace,
    EndElement,
    EndEntity,
    XmlDeclaration,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::None => "None",
            NodeType::Element => "Element",
            NodeType::Attribute => "Attribute",
            NodeType::Text => "Text",
            NodeType::CDATA => "CDATA",
            NodeType::EntityReference => "EntityReference",
            NodeType::ProcessingInstruction => "ProcessingInstruction",
            NodeType::Comment => "Comment",
            NodeType::Document => "Document",
            NodeType::DocumentType => "DocumentType",
            NodeType::Whitespace => "Whitespace",
            NodeType::SignificantWhitespace => "SignificantWhitespace",
            NodeType::EndElement => "EndElement",
            NodeType::EndEntity => "EndEntity",
            NodeType::XmlDeclaration => "XmlDeclaration",
        }
    }

    /// Whether nodes of this type carry a value
    pub fn has_value(self) -> bool {
        matches!(
            self,
            NodeType::Attribute
                | NodeType::Text
                | NodeType::CDATA
                | NodeType::ProcessingInstruction
                | NodeType::Comment
                | NodeType::DocumentType
                | NodeType::Whitespace
                | NodeType::SignificantWhitespace
                | NodeType::XmlDeclaration
        )
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    /// `read` has not been called yet
    Initial,
    /// Positioned on a node
    Interactive,
    /// A fatal error occurred; the reader cannot continue
    Error,
    /// The end of the document was reached
    EndOfFile,
    /// `close` was called
    Closed,
}

/// Value of the innermost `xml:space` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XmlSpace {
    #[default]
    None,
    Default,
    Preserve,
}
