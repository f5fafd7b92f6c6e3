//! Node-Cursor Contract
//!
//! `XmlReader` is the pull API: `read` advances to the next node and the
//! accessors inspect it. The provided methods (content navigation, simple
//! element reading, subtree skipping) use nothing but the required
//! primitives, so any implementation gets them for free.

use std::borrow::Cow;

use super::{NodeType, ReadState, XmlSpace};
use crate::error::{Result, XmlError, XmlErrorKind};

/// Forward-only XML node cursor
pub trait XmlReader {
    // ========================================================================
    // Primitives
    // ========================================================================

    /// Advance to the next node; `Ok(false)` at the end of the document
    fn read(&mut self) -> Result<bool>;

    fn node_type(&self) -> NodeType;

    /// Qualified name (`prefix:local` or `local`)
    fn name(&self) -> &str;

    fn local_name(&self) -> &str;

    fn prefix(&self) -> &str;

    fn namespace_uri(&self) -> &str;

    /// Text value of the current node, empty for nodes without one
    fn value(&self) -> Cow<'_, str>;

    fn depth(&self) -> usize;

    /// `<a/>` as opposed to `<a></a>`
    fn is_empty_element(&self) -> bool;

    /// Whether the attribute came from a DTD default
    fn is_default(&self) -> bool;

    /// Quote character of the current attribute value
    fn quote_char(&self) -> char;

    fn eof(&self) -> bool;

    fn read_state(&self) -> ReadState;

    fn attribute_count(&self) -> usize;

    /// Value of the attribute with the given qualified name
    fn get_attribute(&self, name: &str) -> Option<Cow<'_, str>>;

    fn get_attribute_at(&self, index: usize) -> Option<Cow<'_, str>>;

    fn get_attribute_ns(&self, local_name: &str, namespace_uri: &str) -> Option<Cow<'_, str>>;

    fn move_to_attribute(&mut self, name: &str) -> bool;

    fn move_to_attribute_at(&mut self, index: usize) -> bool;

    fn move_to_first_attribute(&mut self) -> bool;

    fn move_to_next_attribute(&mut self) -> bool;

    /// Move from an attribute back to its element
    fn move_to_element(&mut self) -> bool;

    /// Step through the pieces of the current attribute's value
    fn read_attribute_value(&mut self) -> bool;

    /// Namespace URI bound to `prefix` in the current scope
    fn lookup_namespace(&self, prefix: &str) -> Option<&str>;

    fn xml_space(&self) -> XmlSpace;

    fn xml_lang(&self) -> &str;

    /// 1-based line of the current node
    fn line_number(&self) -> usize;

    /// 1-based column of the current node
    fn line_position(&self) -> usize;

    /// Release the input; every later `read` fails
    fn close(&mut self);

    // ========================================================================
    // Provided helpers
    // ========================================================================

    fn has_attributes(&self) -> bool {
        self.attribute_count() > 0
    }

    fn has_value(&self) -> bool {
        self.node_type().has_value()
    }

    /// Build an error positioned at the current node
    fn error_here(&self, kind: XmlErrorKind) -> XmlError {
        XmlError::new(kind, self.line_number(), self.line_position())
    }

    /// Error for a helper called on a node type it does not accept
    fn invalid_node_error(&self, method: &'static str) -> XmlError {
        self.error_here(XmlErrorKind::InvalidNodeType {
            method,
            node_type: self.node_type().as_str(),
        })
    }

    /// Skip to the next content node (element, end tag, text, CDATA)
    ///
    /// Comments, processing instructions, whitespace and the XML
    /// declaration are passed over. On an attribute, moves to its element.
    fn move_to_content(&mut self) -> Result<NodeType> {
        loop {
            match self.node_type() {
                NodeType::Attribute => {
                    self.move_to_element();
                    return Ok(self.node_type());
                }
                nt @ (NodeType::Element
                | NodeType::EndElement
                | NodeType::Text
                | NodeType::CDATA
                | NodeType::EntityReference
                | NodeType::EndEntity) => return Ok(nt),
                _ => {}
            }
            if !self.read()? {
                return Ok(self.node_type());
            }
        }
    }

    fn is_start_element(&mut self) -> Result<bool> {
        Ok(self.move_to_content()? == NodeType::Element)
    }

    fn is_start_element_named(&mut self, name: &str) -> Result<bool> {
        Ok(self.move_to_content()? == NodeType::Element && self.name() == name)
    }

    /// Check for an element start and read past it
    fn read_start_element(&mut self) -> Result<()> {
        if self.move_to_content()? != NodeType::Element {
            return Err(self.invalid_node_error("ReadStartElement"));
        }
        self.read()?;
        Ok(())
    }

    fn read_start_element_named(&mut self, name: &str) -> Result<()> {
        if self.move_to_content()? != NodeType::Element {
            return Err(self.invalid_node_error("ReadStartElement"));
        }
        if self.name() != name {
            return Err(self.error_here(XmlErrorKind::ElementNotFound(name.to_string())));
        }
        self.read()?;
        Ok(())
    }

    /// Check for an end tag and read past it
    fn read_end_element(&mut self) -> Result<()> {
        if self.move_to_content()? != NodeType::EndElement {
            return Err(self.invalid_node_error("ReadEndElement"));
        }
        self.read()?;
        Ok(())
    }

    /// Concatenate the text content at the cursor
    ///
    /// On an element, reads into it first. Text, CDATA and whitespace are
    /// collected; comments and processing instructions are skipped; any
    /// other node stops the scan and stays current.
    fn read_string(&mut self) -> Result<String> {
        if self.read_state() != ReadState::Interactive {
            return Ok(String::new());
        }
        self.move_to_element();
        if self.node_type() == NodeType::Element {
            if self.is_empty_element() || !self.read()? {
                return Ok(String::new());
            }
            if self.node_type() == NodeType::EndElement {
                return Ok(String::new());
            }
        }

        let mut result = String::new();
        loop {
            match self.node_type() {
                NodeType::Text
                | NodeType::CDATA
                | NodeType::Whitespace
                | NodeType::SignificantWhitespace => result.push_str(&self.value()),
                NodeType::Comment | NodeType::ProcessingInstruction => {}
                _ => break,
            }
            if !self.read()? {
                break;
            }
        }
        Ok(result)
    }

    /// Read a text-only element and return its content
    fn read_element_string(&mut self) -> Result<String> {
        if self.move_to_content()? != NodeType::Element {
            return Err(self.invalid_node_error("ReadElementString"));
        }
        if self.is_empty_element() {
            self.read()?;
            return Ok(String::new());
        }

        self.read()?;
        // read_string would descend into a child element
        if self.node_type() == NodeType::Element {
            return Err(self.error_here(XmlErrorKind::UnexpectedNodeInSimpleContent("Element")));
        }
        let result = self.read_string()?;
        if self.node_type() != NodeType::EndElement {
            let found = self.node_type().as_str();
            return Err(self.error_here(XmlErrorKind::UnexpectedNodeInSimpleContent(found)));
        }
        self.read()?;
        Ok(result)
    }

    fn read_element_string_named(&mut self, name: &str) -> Result<String> {
        if self.move_to_content()? != NodeType::Element {
            return Err(self.invalid_node_error("ReadElementString"));
        }
        if self.name() != name {
            return Err(self.error_here(XmlErrorKind::ElementNotFound(name.to_string())));
        }
        self.read_element_string()
    }

    /// Read forward to the next element with the given name
    fn read_to_following(&mut self, name: &str) -> Result<bool> {
        while self.read()? {
            if self.node_type() == NodeType::Element && self.name() == name {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Read forward to a descendant of the current element with the given name
    fn read_to_descendant(&mut self, name: &str) -> Result<bool> {
        let mut parent_depth = self.depth() as isize;
        if self.node_type() != NodeType::Element {
            if self.read_state() != ReadState::Initial {
                return Ok(false);
            }
            parent_depth = -1;
        } else if self.is_empty_element() {
            return Ok(false);
        }

        while self.read()? && self.depth() as isize > parent_depth {
            if self.node_type() == NodeType::Element && self.name() == name {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Skip to the next sibling element with the given name
    fn read_to_next_sibling(&mut self, name: &str) -> Result<bool> {
        loop {
            if self.read_state() != ReadState::Interactive {
                return Ok(false);
            }
            self.skip()?;
            let nt = self.node_type();
            if nt == NodeType::Element && self.name() == name {
                return Ok(true);
            }
            if nt == NodeType::EndElement || self.eof() {
                return Ok(false);
            }
        }
    }

    /// Skip the current node and, for an element, its whole subtree
    fn skip(&mut self) -> Result<()> {
        if self.read_state() != ReadState::Interactive {
            return Ok(());
        }
        self.move_to_element();
        if self.node_type() == NodeType::Element && !self.is_empty_element() {
            let depth = self.depth();
            while self.read()? && depth < self.depth() {}
            if self.node_type() == NodeType::EndElement {
                self.read()?;
            }
        } else {
            self.read()?;
        }
        Ok(())
    }
}
