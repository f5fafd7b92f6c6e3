//! Reader behavior through the public API

use xmlpull::{
    ConformanceLevel, NodeType, ReadState, ReaderSettings, WhitespaceHandling, XmlError,
    XmlErrorKind, XmlReader, XmlSpace, XmlTextReader, XMLNS_NAMESPACE,
};

fn reader(xml: &str) -> XmlTextReader<&[u8]> {
    XmlTextReader::new(xml.as_bytes())
}

fn reader_with(xml: &str, settings: ReaderSettings) -> XmlTextReader<&[u8]> {
    XmlTextReader::with_settings(xml.as_bytes(), settings)
}

/// Node types, names and values until the end of input
fn nodes(r: &mut XmlTextReader<&[u8]>) -> Vec<(NodeType, String, String)> {
    let mut out = Vec::new();
    while r.read().unwrap() {
        out.push((r.node_type(), r.name().to_string(), r.value().into_owned()));
    }
    out
}

fn types(xml: &str, settings: ReaderSettings) -> Vec<NodeType> {
    let mut r = reader_with(xml, settings);
    nodes(&mut r).into_iter().map(|(t, _, _)| t).collect()
}

/// Read until the first error
fn first_error(xml: &str) -> XmlError {
    first_error_with(xml, ReaderSettings::default())
}

fn first_error_with(xml: &str, settings: ReaderSettings) -> XmlError {
    let mut r = reader_with(xml, settings);
    loop {
        match r.read() {
            Ok(true) => continue,
            Ok(false) => panic!("document was accepted: {xml}"),
            Err(err) => return err,
        }
    }
}

// ============================================================================
// Node Stream
// ============================================================================

#[test]
fn test_node_count() {
    let xml = "<?xml version=\"1.0\"?><r a=\"1\"><!--c--><?pi d?>text<![CDATA[x]]><e/></r>";
    let mut r = reader(xml);
    let got: Vec<NodeType> = nodes(&mut r).into_iter().map(|(t, _, _)| t).collect();
    assert_eq!(
        got,
        [
            NodeType::XmlDeclaration,
            NodeType::Element,
            NodeType::Comment,
            NodeType::ProcessingInstruction,
            NodeType::Text,
            NodeType::CDATA,
            NodeType::Element,
            NodeType::EndElement,
        ]
    );
    assert!(r.eof());
    assert_eq!(r.read_state(), ReadState::EndOfFile);
    assert_eq!(r.node_type(), NodeType::None);
}

#[test]
fn test_end_element_depth_matches_start() {
    let xml = "<a><b><c>t</c><c/></b><d>x</d></a>";
    let mut r = reader(xml);
    let mut open = Vec::new();
    while r.read().unwrap() {
        match r.node_type() {
            NodeType::Element if !r.is_empty_element() => {
                open.push((r.name().to_string(), r.depth()))
            }
            NodeType::EndElement => {
                let (name, depth) = open.pop().unwrap();
                assert_eq!(name, r.name());
                assert_eq!(depth, r.depth());
            }
            NodeType::Text => assert_eq!(r.depth(), open.len()),
            _ => {}
        }
    }
    assert!(open.is_empty());
}

#[test]
fn test_element_names_are_interned() {
    let mut r = reader("<item><item/><item/></item>");
    let mut addrs = Vec::new();
    while r.read().unwrap() {
        addrs.push(r.name().as_ptr());
    }
    assert_eq!(addrs.len(), 4);
    assert!(addrs.iter().all(|&p| p == addrs[0]));
    let atom = r.name_table().get("item").unwrap();
    assert_eq!(atom.as_ptr(), addrs[0]);
}

#[test]
fn test_shared_name_table() {
    let table = xmlpull::NameTable::new();
    let first = table.add("shared");
    let settings = ReaderSettings {
        name_table: Some(table.clone()),
        ..Default::default()
    };
    let mut r = reader_with("<shared/>", settings);
    r.read().unwrap();
    assert_eq!(r.name().as_ptr(), first.as_ptr());
}

// ============================================================================
// Text and References
// ============================================================================

#[test]
fn test_entity_expansion() {
    let mut r = reader("<a>a &amp; b</a>");
    r.read().unwrap();
    r.read().unwrap();
    assert_eq!(r.node_type(), NodeType::Text);
    assert_eq!(r.value(), "a & b");

    for xml in ["<a>&#65;</a>", "<a>&#x41;</a>"] {
        let mut r = reader(xml);
        r.read().unwrap();
        r.read().unwrap();
        assert_eq!(r.value(), "A");
    }

    let mut r = reader("<a>&lt;&gt;&quot;&apos;&#x1F600;</a>");
    r.read().unwrap();
    r.read().unwrap();
    assert_eq!(r.value(), "<>\"'\u{1F600}");
}

#[test]
fn test_undeclared_entity() {
    let err = first_error("<a>&foo;</a>");
    assert!(matches!(err.kind(), XmlErrorKind::UndeclaredEntity(name) if name == "foo"));
    assert_eq!(err.line(), 1);
}

#[test]
fn test_invalid_character_reference() {
    let err = first_error("<a>&#0;</a>");
    assert!(matches!(err.kind(), XmlErrorKind::InvalidCharacterReference(0)));
    let err = first_error("<a>&#xD800;</a>");
    assert!(matches!(err.kind(), XmlErrorKind::InvalidCharacterReference(0xD800)));
}

#[test]
fn test_invalid_character_in_content() {
    let err = first_error("<a>x\u{1}</a>");
    assert!(matches!(err.kind(), XmlErrorKind::InvalidCharacter(1)));
    assert!(err.to_string().contains("0x01"));

    let settings = ReaderSettings {
        check_characters: false,
        ..Default::default()
    };
    let mut r = reader_with("<a>x\u{1}</a>", settings);
    r.read().unwrap();
    r.read().unwrap();
    assert_eq!(r.value(), "x\u{1}");
}

#[test]
fn test_line_endings_normalized() {
    let mut r = reader("<a>one\r\ntwo\rthree</a>");
    r.read().unwrap();
    r.read().unwrap();
    assert_eq!(r.value(), "one\ntwo\nthree");
}

#[test]
fn test_cdata_end_in_text() {
    let err = first_error("<a>x]]>y</a>");
    assert!(matches!(err.kind(), XmlErrorKind::CdataEndInText));
}

#[test]
fn test_cdata_passthrough() {
    let mut r = reader("<a><![CDATA[<b>&amp;]]></a>");
    r.read().unwrap();
    r.read().unwrap();
    assert_eq!(r.node_type(), NodeType::CDATA);
    assert_eq!(r.value(), "<b>&amp;");
    assert_eq!(r.depth(), 1);
}

// ============================================================================
// Whitespace
// ============================================================================

#[test]
fn test_whitespace_classification() {
    let mut r = reader("<a>   </a>");
    r.read().unwrap();
    r.read().unwrap();
    assert_eq!(r.node_type(), NodeType::Whitespace);
    assert_eq!(r.value(), "   ");

    let mut r = reader("<a xml:space=\"preserve\">   </a>");
    r.read().unwrap();
    r.read().unwrap();
    assert_eq!(r.node_type(), NodeType::SignificantWhitespace);
    assert_eq!(r.xml_space(), XmlSpace::Preserve);
}

#[test]
fn test_whitespace_handling() {
    let xml = "<a> <b xml:space='preserve'> </b>\n</a>";
    let significant = ReaderSettings {
        whitespace_handling: WhitespaceHandling::Significant,
        ..Default::default()
    };
    assert_eq!(
        types(xml, significant),
        [
            NodeType::Element,
            NodeType::Element,
            NodeType::SignificantWhitespace,
            NodeType::EndElement,
            NodeType::EndElement,
        ]
    );

    let none = ReaderSettings {
        whitespace_handling: WhitespaceHandling::None,
        ..Default::default()
    };
    assert_eq!(
        types(xml, none),
        [
            NodeType::Element,
            NodeType::Element,
            NodeType::EndElement,
            NodeType::EndElement,
        ]
    );
}

#[test]
fn test_xml_space_without_namespaces() {
    let settings = ReaderSettings {
        namespaces: false,
        ..Default::default()
    };
    let mut r = reader_with("<a xml:space='preserve' xml:lang='de'> </a>", settings);
    r.read().unwrap();
    r.read().unwrap();
    assert_eq!(r.node_type(), NodeType::SignificantWhitespace);
    assert_eq!(r.xml_lang(), "de");
}

#[test]
fn test_invalid_xml_space() {
    let err = first_error("<a xml:space='keep'/>");
    assert!(matches!(err.kind(), XmlErrorKind::InvalidXmlSpace(v) if v == "keep"));
}

#[test]
fn test_xml_lang_inherited() {
    let mut r = reader("<a xml:lang='en'><b>t</b></a>");
    r.read().unwrap();
    r.read().unwrap();
    assert_eq!(r.name(), "b");
    assert_eq!(r.xml_lang(), "en");
}

// ============================================================================
// Positions
// ============================================================================

#[test]
fn test_line_and_column() {
    let mut r = reader("<a>\n<b/></a>");
    assert!(r.read_to_following("b").unwrap());
    assert_eq!(r.line_number(), 2);
    assert_eq!(r.line_position(), 1);
}

#[test]
fn test_attribute_position() {
    let mut r = reader("<a\n  x='1'/>");
    r.read().unwrap();
    assert_eq!((r.line_number(), r.line_position()), (1, 1));
    r.move_to_first_attribute();
    assert_eq!((r.line_number(), r.line_position()), (2, 3));
}

#[test]
fn test_text_position_after_reference() {
    let mut r = reader("<a>&amp;&amp;<b/></a>");
    r.read().unwrap();
    r.read().unwrap();
    assert_eq!(r.value(), "&&");
    r.read().unwrap();
    assert_eq!(r.name(), "b");
    assert_eq!(r.line_position(), 14);
}

// ============================================================================
// Attributes
// ============================================================================

#[test]
fn test_duplicate_attribute() {
    let err = first_error("<a x=\"1\" x=\"2\"/>");
    assert!(matches!(err.kind(), XmlErrorKind::DuplicateAttribute(name) if name == "x"));
    assert!(err.to_string().contains("'x'"));
}

#[test]
fn test_duplicate_attribute_many() {
    let mut xml = String::from("<a");
    for i in 0..300 {
        xml.push_str(&format!(" a{i}='{i}'"));
    }
    xml.push_str(" a17='again'/>");
    let err = first_error(&xml);
    assert!(matches!(err.kind(), XmlErrorKind::DuplicateAttribute(name) if name == "a17"));
}

#[test]
fn test_many_attributes_accepted() {
    let mut xml = String::from("<a");
    for i in 0..300 {
        xml.push_str(&format!(" a{i}='{i}'"));
    }
    xml.push_str("/>");
    let mut r = reader(&xml);
    r.read().unwrap();
    assert_eq!(r.attribute_count(), 300);
    assert_eq!(r.get_attribute("a299").as_deref(), Some("299"));
}

#[test]
fn test_attribute_value_normalization() {
    let mut r = reader("<a v='&lt;&#x20;&quot;' w='1\t2\n3'/>");
    r.read().unwrap();
    assert_eq!(r.get_attribute("v").as_deref(), Some("< \""));
    assert_eq!(r.get_attribute_at(1).as_deref(), Some("1 2 3"));
    assert_eq!(r.get_attribute("missing"), None);
}

#[test]
fn test_attribute_errors() {
    let err = first_error("<a x='<'/>");
    assert!(matches!(err.kind(), XmlErrorKind::LessThanInAttributeValue));
    let err = first_error("<a x='1'y='2'/>");
    assert!(matches!(err.kind(), XmlErrorKind::ExpectingWhitespace(_)));
    let err = first_error("<a x='1");
    assert!(matches!(
        err.kind(),
        XmlErrorKind::UnclosedQuote | XmlErrorKind::UnexpectedEof(_)
    ));
}

// ============================================================================
// Structure
// ============================================================================

#[test]
fn test_tag_mismatch() {
    let err = first_error("<a>\n<b></a></b>");
    match err.kind() {
        XmlErrorKind::TagMismatch {
            open,
            open_line,
            found,
            ..
        } => {
            assert_eq!(open, "b");
            assert_eq!(*open_line, 2);
            assert_eq!(found, "a");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.to_string().contains("'b'"));
}

#[test]
fn test_unclosed_elements() {
    let err = first_error("<a><b>text");
    assert!(matches!(err.kind(), XmlErrorKind::UnclosedElements(names) if names == "a, b"));
}

#[test]
fn test_document_rules() {
    let err = first_error("<a/><b/>");
    assert!(matches!(err.kind(), XmlErrorKind::MultipleRoots));
    let err = first_error("<a/>text");
    assert!(matches!(err.kind(), XmlErrorKind::InvalidRootData));
    let err = first_error("text<a/>");
    assert!(matches!(err.kind(), XmlErrorKind::InvalidRootData));
    let err = first_error("<!-- only -->");
    assert!(matches!(err.kind(), XmlErrorKind::RootElementMissing));
    let err = first_error("</a>");
    assert!(matches!(err.kind(), XmlErrorKind::UnexpectedEndTag));

    // whitespace and misc after the root are fine
    let got = types("<a/>\n<!--c-->\n", ReaderSettings::default());
    assert_eq!(
        got,
        [
            NodeType::Element,
            NodeType::Whitespace,
            NodeType::Comment,
            NodeType::Whitespace,
        ]
    );
}

#[test]
fn test_fragment_mode() {
    let settings = ReaderSettings {
        conformance_level: ConformanceLevel::Fragment,
        ..Default::default()
    };
    let mut r = reader_with("text<a/><b>x</b>", settings);
    let got = nodes(&mut r);
    assert_eq!(got.len(), 5);
    assert_eq!(got[0], (NodeType::Text, String::new(), "text".to_string()));
    assert_eq!(got[1].1, "a");
    assert_eq!(got[2].1, "b");

    let err = first_error_with("<?xml version='1.0'?><a/>", ReaderSettings::fragment());
    assert!(matches!(err.kind(), XmlErrorKind::XmlDeclarationNotFirst));
}

#[test]
fn test_dtd_prohibited() {
    let err = first_error("<!DOCTYPE a><a/>");
    assert!(matches!(err.kind(), XmlErrorKind::DtdProhibited));
}

// ============================================================================
// Comments and Processing Instructions
// ============================================================================

#[test]
fn test_comment_and_pi() {
    let mut r = reader("<a><!-- note --><?xml-stylesheet href='x'?></a>");
    r.read().unwrap();
    r.read().unwrap();
    assert_eq!(r.node_type(), NodeType::Comment);
    assert_eq!(r.value(), " note ");
    r.read().unwrap();
    assert_eq!(r.node_type(), NodeType::ProcessingInstruction);
    assert_eq!(r.name(), "xml-stylesheet");
    assert_eq!(r.value(), "href='x'");
}

#[test]
fn test_comment_and_pi_errors() {
    let err = first_error("<a><!-- a--b --></a>");
    assert!(matches!(err.kind(), XmlErrorKind::InvalidCommentChars));
    let err = first_error("<a><?XML x?></a>");
    assert!(matches!(err.kind(), XmlErrorKind::InvalidPiName(name) if name == "XML"));
    let err = first_error("<a><?xml version='1.0'?></a>");
    assert!(matches!(err.kind(), XmlErrorKind::XmlDeclarationNotFirst));
    let err = first_error("<a><!-- open");
    assert!(matches!(err.kind(), XmlErrorKind::UnexpectedEof(_)));
}

#[test]
fn test_ignore_comments_and_pis() {
    let settings = ReaderSettings {
        ignore_comments: true,
        ignore_processing_instructions: true,
        ..Default::default()
    };
    assert_eq!(
        types("<a><!--c--><?p?>t</a>", settings),
        [NodeType::Element, NodeType::Text, NodeType::EndElement]
    );
}

// ============================================================================
// XML Declaration and Encoding
// ============================================================================

#[test]
fn test_xml_declaration() {
    let mut r = reader("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?><a/>");
    r.read().unwrap();
    assert_eq!(r.node_type(), NodeType::XmlDeclaration);
    assert_eq!(r.name(), "xml");
    assert_eq!(r.value(), "version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"");
    assert_eq!(r.attribute_count(), 3);
    assert_eq!(r.get_attribute("encoding").as_deref(), Some("UTF-8"));
    assert!(r.move_to_attribute("standalone"));
    assert_eq!(r.value(), "yes");
    r.read().unwrap();
    assert_eq!(r.name(), "a");
    assert_eq!(r.encoding(), "UTF-8");
}

#[test]
fn test_xml_declaration_errors() {
    let err = first_error("<?xml version='2.0'?><a/>");
    assert!(matches!(err.kind(), XmlErrorKind::InvalidVersionNumber(v) if v == "2.0"));
    let err = first_error("<?xml encoding='UTF-8'?><a/>");
    assert!(matches!(err.kind(), XmlErrorKind::VersionMissing));
    let err = first_error("<?xml version='1.0' standalone='maybe'?><a/>");
    assert!(matches!(err.kind(), XmlErrorKind::InvalidStandalone));
    let err = first_error("<?xml version='1.0' encoding='ISO-8859-1'?><a/>");
    assert!(matches!(err.kind(), XmlErrorKind::UnsupportedEncoding(e) if e == "ISO-8859-1"));
    let err = first_error(" <?xml version='1.0'?><a/>");
    assert!(matches!(err.kind(), XmlErrorKind::XmlDeclarationNotFirst));
}

#[test]
fn test_byte_order_mark_skipped() {
    let bytes = b"\xEF\xBB\xBF<a>x</a>";
    let mut r = XmlTextReader::new(&bytes[..]);
    r.read().unwrap();
    assert_eq!(r.name(), "a");
    assert_eq!(r.line_position(), 1);
}

#[test]
fn test_utf16_rejected() {
    let bytes = b"\xFF\xFE<\x00a\x00/\x00>\x00";
    let mut r = XmlTextReader::new(&bytes[..]);
    let err = r.read().unwrap_err();
    assert!(matches!(err.kind(), XmlErrorKind::UnsupportedEncoding(e) if e == "UTF-16LE"));
}

#[test]
fn test_malformed_utf8() {
    let bytes = b"<a>\xC3\x28</a>";
    let mut r = XmlTextReader::new(&bytes[..]);
    let err = loop {
        match r.read() {
            Ok(true) => continue,
            Ok(false) => panic!("accepted malformed input"),
            Err(err) => break err,
        }
    };
    assert!(matches!(err.kind(), XmlErrorKind::InvalidByteSequence(_)));
}

// ============================================================================
// Namespaces
// ============================================================================

#[test]
fn test_namespace_resolution() {
    let xml = "<p:a xmlns:p='urn:p' p:x='1' y='2'><b xmlns='urn:d'><c/></b></p:a>";
    let mut r = reader(xml);
    r.read().unwrap();
    assert_eq!(r.name(), "p:a");
    assert_eq!(r.prefix(), "p");
    assert_eq!(r.local_name(), "a");
    assert_eq!(r.namespace_uri(), "urn:p");
    assert_eq!(r.lookup_namespace("p"), Some("urn:p"));
    assert_eq!(r.get_attribute_ns("x", "urn:p").as_deref(), Some("1"));
    assert_eq!(r.get_attribute_ns("y", "").as_deref(), Some("2"));

    assert!(r.move_to_attribute("xmlns:p"));
    assert_eq!(r.namespace_uri(), XMLNS_NAMESPACE);
    r.move_to_element();

    r.read().unwrap();
    assert_eq!(r.namespace_uri(), "urn:d");
    r.read().unwrap();
    assert_eq!(r.name(), "c");
    assert_eq!(r.namespace_uri(), "urn:d");
    r.read().unwrap();
    r.read().unwrap();
    assert_eq!(r.node_type(), NodeType::EndElement);
    assert_eq!(r.namespace_uri(), "urn:p");
}

#[test]
fn test_namespace_errors() {
    let err = first_error("<q:a/>");
    assert!(matches!(err.kind(), XmlErrorKind::UndeclaredPrefix(p) if p == "q"));
    let err = first_error("<a xmlns:p=''/>");
    assert!(matches!(err.kind(), XmlErrorKind::EmptyNamespaceWithPrefix));
    let err = first_error("<a xmlns:xmlns='urn:x'/>");
    assert!(matches!(err.kind(), XmlErrorKind::XmlnsPrefixReserved));
    let err = first_error("<a xmlns:p='urn:1' xmlns:q='urn:1' p:x='1' q:x='2'/>");
    assert!(matches!(err.kind(), XmlErrorKind::DuplicateAttribute(_)));
}

#[test]
fn test_namespaces_disabled() {
    let settings = ReaderSettings {
        namespaces: false,
        ..Default::default()
    };
    let mut r = reader_with("<q:a xmlns:p=''/>", settings);
    r.read().unwrap();
    assert_eq!(r.name(), "q:a");
    assert_eq!(r.namespace_uri(), "");
}

// ============================================================================
// Contract Helpers
// ============================================================================

#[test]
fn test_move_to_content() {
    let mut r = reader("<?xml version='1.0'?>\n<!--c-->\n<?p?><r/>");
    assert_eq!(r.move_to_content().unwrap(), NodeType::Element);
    assert_eq!(r.name(), "r");
    assert!(r.is_start_element_named("r").unwrap());
}

#[test]
fn test_read_element_string() {
    let mut r = reader("<r><n>hello</n><m>x<!--c-->y</m><e/></r>");
    r.read_start_element_named("r").unwrap();
    assert_eq!(r.read_element_string_named("n").unwrap(), "hello");
    assert_eq!(r.name(), "m");
    assert_eq!(r.read_element_string().unwrap(), "xy");
    assert_eq!(r.read_element_string().unwrap(), "");
    r.read_end_element().unwrap();
    assert!(r.eof());
}

#[test]
fn test_read_element_string_errors() {
    let mut r = reader("<r><n><c/></n></r>");
    r.read().unwrap();
    let err = r.read_element_string_named("x").unwrap_err();
    assert!(matches!(err.kind(), XmlErrorKind::ElementNotFound(n) if n == "x"));
    r.read().unwrap();
    let err = r.read_element_string().unwrap_err();
    assert!(matches!(err.kind(), XmlErrorKind::UnexpectedNodeInSimpleContent(_)));
}

#[test]
fn test_read_element_string_rejects_child_element() {
    let mut r = reader("<r><n><c>inner</c></n><z/></r>");
    r.read().unwrap();
    r.read().unwrap();
    assert_eq!(r.name(), "n");
    let err = r.read_element_string().unwrap_err();
    assert!(matches!(
        err.kind(),
        XmlErrorKind::UnexpectedNodeInSimpleContent(found) if *found == "Element"
    ));
    assert_eq!(r.node_type(), NodeType::Element);
    assert_eq!(r.name(), "c");

    let mut r = reader("<n>text<c>inner</c></n>");
    let err = r.read_element_string().unwrap_err();
    assert!(matches!(err.kind(), XmlErrorKind::UnexpectedNodeInSimpleContent(_)));
    assert_eq!(r.name(), "c");
}

#[test]
fn test_read_string() {
    let mut r = reader("<r>a<![CDATA[b]]><?p?>c<x/>d</r>");
    r.read().unwrap();
    assert_eq!(r.read_string().unwrap(), "abc");
    assert_eq!(r.name(), "x");
}

#[test]
fn test_read_to_descendant_and_skip() {
    let mut r = reader("<r><a><b/><c>t</c></a><t id='1'/><d/></r>");
    assert!(r.read_to_descendant("a").unwrap());
    assert_eq!(r.depth(), 1);
    r.skip().unwrap();
    assert_eq!(r.name(), "t");
    assert_eq!(r.get_attribute("id").as_deref(), Some("1"));
    assert!(!r.read_to_descendant("b").unwrap());
}

#[test]
fn test_read_to_next_sibling() {
    let mut r = reader("<r><a/><b><a/></b><a i='2'/></r>");
    r.read().unwrap();
    r.read().unwrap();
    assert!(r.read_to_next_sibling("a").unwrap());
    assert_eq!(r.get_attribute("i").as_deref(), Some("2"));
    assert_eq!(r.depth(), 1);
    assert!(!r.read_to_next_sibling("a").unwrap());
}

#[test]
fn test_read_to_following_missing() {
    let mut r = reader("<r><a/></r>");
    assert!(!r.read_to_following("z").unwrap());
    assert!(r.eof());
}

// ============================================================================
// Limits and Lifecycle
// ============================================================================

#[test]
fn test_max_characters_in_document() {
    let settings = ReaderSettings {
        max_characters_in_document: 10,
        ..Default::default()
    };
    let err = first_error_with("<a>0123456789</a>", settings);
    assert!(matches!(err.kind(), XmlErrorKind::LimitExceeded(_)));
}

#[test]
fn test_io_error_is_reported() {
    struct Failing;
    impl std::io::Read for Failing {
        fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"))
        }
    }
    let mut r = XmlTextReader::new(Failing);
    let err = r.read().unwrap_err();
    assert!(matches!(err.kind(), XmlErrorKind::Io(_)));
    assert_eq!(r.read_state(), ReadState::Error);
}

#[test]
fn test_errors_carry_position() {
    let err = first_error("<a>\n  <b></c></a>");
    assert_eq!(err.line(), 2);
    assert!(err.column() > 0);
    assert!(err.to_string().ends_with(&format!(
        "Line {}, position {}.",
        err.line(),
        err.column()
    )));
    assert_eq!(err.resource_id(), "Xml_TagMismatchEx");
}
