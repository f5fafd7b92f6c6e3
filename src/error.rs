//! Reader Errors
//!
//! Every well-formedness violation is fatal. The error carries the kind of
//! violation, the offending token or character, and the 1-based line and
//! column at the point of failure.

use std::fmt;
use std::sync::Arc;

/// Result alias used throughout the crate
pub type Result<T, E = XmlError> = std::result::Result<T, E>;

/// A fatal reader error with source position
#[derive(Debug, Clone, thiserror::Error)]
pub struct XmlError {
    kind: XmlErrorKind,
    line: usize,
    column: usize,
}

impl XmlError {
    /// Create an error at the given 1-based position
    pub fn new(kind: XmlErrorKind, line: usize, column: usize) -> Self {
        XmlError { kind, line, column }
    }

    /// Create an error that has no meaningful source position
    pub fn without_position(kind: XmlErrorKind) -> Self {
        XmlError {
            kind,
            line: 0,
            column: 0,
        }
    }

    /// The kind of violation
    pub fn kind(&self) -> &XmlErrorKind {
        &self.kind
    }

    /// 1-based line number, 0 when unknown
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based column, 0 when unknown
    pub fn column(&self) -> usize {
        self.column
    }

    /// Stable identifier of the message resource
    pub fn resource_id(&self) -> &'static str {
        self.kind.resource_id()
    }
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{} Line {}, position {}.", self.kind, self.line, self.column)
        }
    }
}

/// Hexadecimal rendering of a character value, e.g. `0x1F`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hex(pub u32);

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Printable form of a possibly invisible character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Printable(pub u32);

impl fmt::Display for Printable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match char::from_u32(self.0) {
            Some(c) if !c.is_control() => write!(f, "{c}"),
            _ => write!(f, " "),
        }
    }
}

fn radix_name(hex: bool) -> &'static str {
    if hex {
        "hexadecimal"
    } else {
        "decimal"
    }
}

/// What went wrong
#[derive(Debug, Clone, thiserror::Error)]
pub enum XmlErrorKind {
    // ------------------------------------------------------------------
    // Malformed markup
    // ------------------------------------------------------------------
    #[error("Unexpected end of file while parsing {0} has occurred.")]
    UnexpectedEof(&'static str),

    #[error("Unexpected end of file has occurred. The following elements are not closed: {0}.")]
    UnclosedElements(String),

    #[error("'{found}' is an unexpected token. The expected token is '{expected}'.")]
    UnexpectedToken { expected: &'static str, found: String },

    #[error("Name cannot begin with the '{}' character, hexadecimal value {}.", Printable(*.0), Hex(*.0))]
    BadStartNameChar(u32),

    #[error("The '{}' character, hexadecimal value {}, cannot be included in a name.", Printable(*.0), Hex(*.0))]
    BadNameChar(u32),

    #[error("'{0}' is an unexpected token. Expecting white space.")]
    ExpectingWhitespace(String),

    #[error("'<', hexadecimal value 0x3C, is an invalid attribute character.")]
    LessThanInAttributeValue,

    #[error("There is an unclosed literal string.")]
    UnclosedQuote,

    #[error("An XML comment cannot contain '--', and '-' cannot be the last character.")]
    InvalidCommentChars,

    #[error("' ]]> ' is not allowed in character data.")]
    CdataEndInText,

    #[error("An error occurred while parsing EntityName.")]
    ErrorParsingEntityName,

    // ------------------------------------------------------------------
    // Structural mismatch
    // ------------------------------------------------------------------
    #[error("The '{open}' start tag on line {open_line} position {open_column} does not match the end tag of '{found}'.")]
    TagMismatch {
        open: String,
        open_line: usize,
        open_column: usize,
        found: String,
    },

    #[error("Unexpected end tag.")]
    UnexpectedEndTag,

    #[error("There are multiple root elements.")]
    MultipleRoots,

    #[error("Root element is missing.")]
    RootElementMissing,

    #[error("Data at the root level is invalid.")]
    InvalidRootData,

    #[error("Unexpected XML declaration. The XML declaration must be the first node in the document, and no white space characters are allowed to appear before it.")]
    XmlDeclarationNotFirst,

    // ------------------------------------------------------------------
    // Invalid character data
    // ------------------------------------------------------------------
    #[error("'{}', hexadecimal value {}, is an invalid character.", Printable(*.0), Hex(*.0))]
    InvalidCharacter(u32),

    #[error("Invalid surrogate pair: high {}, low {}.", Hex(*.high as u32), Hex(*.low as u32))]
    InvalidSurrogatePair { high: u16, low: u16 },

    #[error("'{}', hexadecimal value {}, is an invalid character reference.", Printable(*.0), Hex(*.0))]
    InvalidCharacterReference(u32),

    #[error("Invalid syntax for a {} numeric entity reference.", radix_name(*.0))]
    InvalidNumericReference(bool),

    #[error("Invalid byte sequence in the {0} input stream.")]
    InvalidByteSequence(&'static str),

    // ------------------------------------------------------------------
    // Unsupported constructs
    // ------------------------------------------------------------------
    #[error("Reference to undeclared entity '{0}'.")]
    UndeclaredEntity(String),

    #[error("DTD is prohibited in this XML document.")]
    DtdProhibited,

    #[error("System does not support '{0}' encoding.")]
    UnsupportedEncoding(String),

    #[error("Version number '{0}' is invalid.")]
    InvalidVersionNumber(String),

    #[error("Syntax for an XML declaration is invalid.")]
    InvalidXmlDeclaration,

    #[error("Version attribute is required in the XML declaration.")]
    VersionMissing,

    #[error("The standalone attribute must have the value 'yes' or 'no'.")]
    InvalidStandalone,

    // ------------------------------------------------------------------
    // Duplicate attribute / reserved names / namespaces
    // ------------------------------------------------------------------
    #[error("'{0}' is a duplicate attribute name.")]
    DuplicateAttribute(String),

    #[error("'{0}' is an invalid name for processing instructions.")]
    InvalidPiName(String),

    #[error("'{0}' is an invalid xml:space value.")]
    InvalidXmlSpace(String),

    #[error("Prefix \"xmlns\" is reserved for use by XML.")]
    XmlnsPrefixReserved,

    #[error("Prefix \"xml\" is reserved for use by XML and can be mapped only to namespace name \"{0}\".")]
    XmlPrefixReserved(&'static str),

    #[error("Cannot use a prefix with an empty namespace.")]
    EmptyNamespaceWithPrefix,

    #[error("'{0}' is an undeclared prefix.")]
    UndeclaredPrefix(String),

    // ------------------------------------------------------------------
    // Environment and API
    // ------------------------------------------------------------------
    #[error("An I/O error occurred while reading the input: {0}")]
    Io(Arc<std::io::Error>),

    #[error("The input document has exceeded a limit set by {0}.")]
    LimitExceeded(&'static str),

    #[error("The '{method}' method cannot be called on a node of type '{node_type}'.")]
    InvalidNodeType {
        method: &'static str,
        node_type: &'static str,
    },

    #[error("Element '{0}' was not found.")]
    ElementNotFound(String),

    #[error("ReadElementString could only read simple content; found a '{0}' node.")]
    UnexpectedNodeInSimpleContent(&'static str),

    #[error("The reader has been closed.")]
    ReaderClosed,
}

impl XmlErrorKind {
    /// Stable identifier of the message resource for this kind
    pub fn resource_id(&self) -> &'static str {
        match self {
            XmlErrorKind::UnexpectedEof(_) => "Xml_UnexpectedEOF",
            XmlErrorKind::UnclosedElements(_) => "Xml_UnexpectedEOFInElementContent",
            XmlErrorKind::UnexpectedToken { .. } => "Xml_UnexpectedTokenEx",
            XmlErrorKind::BadStartNameChar(_) => "Xml_BadStartNameChar",
            XmlErrorKind::BadNameChar(_) => "Xml_BadNameChar",
            XmlErrorKind::ExpectingWhitespace(_) => "Xml_ExpectingWhiteSpace",
            XmlErrorKind::LessThanInAttributeValue => "Xml_BadAttributeChar",
            XmlErrorKind::UnclosedQuote => "Xml_UnclosedQuote",
            XmlErrorKind::InvalidCommentChars => "Xml_InvalidCommentChars",
            XmlErrorKind::CdataEndInText => "Xml_CDATAEndInText",
            XmlErrorKind::ErrorParsingEntityName => "Xml_ErrorParsingEntityName",
            XmlErrorKind::TagMismatch { .. } => "Xml_TagMismatchEx",
            XmlErrorKind::UnexpectedEndTag => "Xml_UnexpectedEndTag",
            XmlErrorKind::MultipleRoots => "Xml_MultipleRoots",
            XmlErrorKind::RootElementMissing => "Xml_MissingRoot",
            XmlErrorKind::InvalidRootData => "Xml_InvalidRootData",
            XmlErrorKind::XmlDeclarationNotFirst => "Xml_XmlDeclNotFirst",
            XmlErrorKind::InvalidCharacter(_) => "Xml_InvalidCharacter",
            XmlErrorKind::InvalidSurrogatePair { .. } => "Xml_InvalidSurrogatePairWithArgs",
            XmlErrorKind::InvalidCharacterReference(_) => "Xml_InvalidCharRef",
            XmlErrorKind::InvalidNumericReference(true) => "Xml_BadHexEntity",
            XmlErrorKind::InvalidNumericReference(false) => "Xml_BadDecimalEntity",
            XmlErrorKind::InvalidByteSequence(_) => "Xml_InvalidCharInThisEncoding",
            XmlErrorKind::UndeclaredEntity(_) => "Xml_UndeclaredEntity",
            XmlErrorKind::DtdProhibited => "Xml_DtdIsProhibitedEx",
            XmlErrorKind::UnsupportedEncoding(_) => "Xml_UnknownEncoding",
            XmlErrorKind::InvalidVersionNumber(_) => "Xml_InvalidVersionNumber",
            XmlErrorKind::InvalidXmlDeclaration => "Xml_InvalidXmlDecl",
            XmlErrorKind::VersionMissing => "Xml_XmlDeclNoVersion",
            XmlErrorKind::InvalidStandalone => "Xml_InvalidXmlDecl",
            XmlErrorKind::DuplicateAttribute(_) => "Xml_DupAttributeName",
            XmlErrorKind::InvalidPiName(_) => "Xml_InvalidPIName",
            XmlErrorKind::InvalidXmlSpace(_) => "Xml_InvalidXmlSpace",
            XmlErrorKind::XmlnsPrefixReserved => "Xml_XmlnsPrefix",
            XmlErrorKind::XmlPrefixReserved(_) => "Xml_XmlPrefix",
            XmlErrorKind::EmptyNamespaceWithPrefix => "Xml_BadNamespaceDecl",
            XmlErrorKind::UndeclaredPrefix(_) => "Xml_UnknownNs",
            XmlErrorKind::Io(_) => "Xml_IOError",
            XmlErrorKind::LimitExceeded(_) => "Xml_LimitExceeded",
            XmlErrorKind::InvalidNodeType { .. } => "Xml_InvalidReadElementContentAs",
            XmlErrorKind::ElementNotFound(_) => "Xml_ElementNotFound",
            XmlErrorKind::UnexpectedNodeInSimpleContent(_) => "Xml_UnexpectedNodeInSimpleContent",
            XmlErrorKind::ReaderClosed => "Xml_ReaderClosed",
        }
    }
}

impl From<std::io::Error> for XmlErrorKind {
    fn from(err: std::io::Error) -> Self {
        XmlErrorKind::Io(Arc::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_position() {
        let err = XmlError::new(XmlErrorKind::DuplicateAttribute("x".into()), 1, 11);
        assert_eq!(
            err.to_string(),
            "'x' is a duplicate attribute name. Line 1, position 11."
        );
        assert_eq!(err.resource_id(), "Xml_DupAttributeName");
    }

    #[test]
    fn test_invalid_character_renders_hex() {
        let err = XmlErrorKind::InvalidCharacter(0x1);
        assert_eq!(err.to_string(), "' ', hexadecimal value 0x01, is an invalid character.");

        let err = XmlErrorKind::InvalidCharacterReference(0xFFFE);
        assert!(err.to_string().contains("0xFFFE"));
    }

    #[test]
    fn test_without_position() {
        let err = XmlError::without_position(XmlErrorKind::ReaderClosed);
        assert_eq!(err.line(), 0);
        assert_eq!(err.to_string(), "The reader has been closed.");
    }
}
