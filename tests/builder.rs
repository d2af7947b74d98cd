//! End-to-end builder tests: construction, navigation, editing, queries
//! and subtree import through the public API.

#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use rstest::rstest;

use xmlbuilder::{Error, NodeKind, OutputProperties, QueryError, QueryValue, ResultKind, XPathNode, XmlBuilder};

const EXAMPLE_XML_DOC_START: &str = "<Projects>\
    <java-xmlbuilder language=\"Java\" scm=\"SVN\">\
    <Location type=\"URL\">http://code.google.com/p/java-xmlbuilder/</Location>\
    </java-xmlbuilder>\
    <JetS3t language=\"Java\" scm=\"CVS\">\
    <Location type=\"URL\">http://jets3t.s3.amazonaws.com/index.html</Location>";

const EXAMPLE_XML_DOC_END: &str = "</JetS3t></Projects>";

fn example_xml_doc() -> String {
    format!("{EXAMPLE_XML_DOC_START}{EXAMPLE_XML_DOC_END}")
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn test_document_creation_in_one_chain() {
    let builder = XmlBuilder::create("Projects", None)
        .unwrap()
        .element("java-xmlbuilder", None)
        .unwrap()
        .attribute("language", "Java")
        .unwrap()
        .attribute("scm", "SVN")
        .unwrap()
        .element("Location", None)
        .unwrap()
        .attribute("type", "URL")
        .unwrap()
        .text("http://code.google.com/p/java-xmlbuilder/")
        .unwrap()
        .up()
        .up()
        .element("JetS3t", None)
        .unwrap()
        .attribute("language", "Java")
        .unwrap()
        .attribute("scm", "CVS")
        .unwrap()
        .element("Location", None)
        .unwrap()
        .attribute("type", "URL")
        .unwrap()
        .text("http://jets3t.s3.amazonaws.com/index.html")
        .unwrap();

    let props = OutputProperties::from_pairs([
        ("method", "xml"),
        ("indent", "no"),
        ("omit-xml-declaration", "yes"),
    ])
    .unwrap();
    let mut out = Vec::new();
    builder.to_writer(&mut out, &props).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), example_xml_doc());
}

#[test]
fn test_document_creation_in_segments() {
    let projects = XmlBuilder::create("Projects", None).unwrap();
    projects
        .element("java-xmlbuilder", None)
        .unwrap()
        .attribute("language", "Java")
        .unwrap()
        .attribute("scm", "SVN")
        .unwrap()
        .element("Location", None)
        .unwrap()
        .attribute("type", "URL")
        .unwrap()
        .text("http://code.google.com/p/java-xmlbuilder/")
        .unwrap();
    let jets3t = projects
        .element("JetS3t", None)
        .unwrap()
        .attribute("language", "Java")
        .unwrap()
        .attribute("scm", "CVS")
        .unwrap();
    jets3t
        .element("Location", None)
        .unwrap()
        .attribute("type", "URL")
        .unwrap()
        .text("http://jets3t.s3.amazonaws.com/index.html")
        .unwrap();

    assert_eq!(projects.as_string().unwrap(), example_xml_doc());
}

#[test]
fn test_parse_from_reader_and_bytes() {
    let xml = example_xml_doc();
    let from_reader = XmlBuilder::parse_reader(xml.as_bytes()).unwrap();
    let from_bytes = XmlBuilder::parse_bytes(xml.as_bytes()).unwrap();
    assert_eq!(from_reader.as_string().unwrap(), xml);
    assert_eq!(from_bytes.as_string().unwrap(), xml);
}

#[test]
fn test_parse_rejects_malformed_input() {
    let err = XmlBuilder::parse("<Projects><Unclosed></Projects>").unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

#[rstest]
#[case(1, "ElemDepth3")]
#[case(3, "ElemDepth1")]
#[case(4, "ElemDepth1")]
#[case(100, "ElemDepth1")]
fn test_traversal_during_build(#[case] steps: usize, #[case] expected: &str) {
    let builder = XmlBuilder::create("ElemDepth1", None)
        .unwrap()
        .element("ElemDepth2", None)
        .unwrap()
        .element("ElemDepth3", None)
        .unwrap()
        .element("ElemDepth4", None)
        .unwrap();
    assert_eq!(builder.up_n(steps).name().as_deref(), Some(expected));
}

#[test]
fn test_add_elements_in_loop() {
    let builder = XmlBuilder::create("DocRoot", None).unwrap();
    let parent = builder.element("Parent", None).unwrap();
    for i in 1..=10 {
        parent
            .element(&format!("IntegerValue{i}"), None)
            .unwrap()
            .text(&i.to_string())
            .unwrap();
    }
    let parent = parent.up_n(0);
    assert_eq!(parent.name().as_deref(), Some("Parent"));
    assert_eq!(builder.name().as_deref(), Some("DocRoot"));

    let doc = builder.doc();
    let root_children: Vec<_> = doc.children(builder.node_id()).collect();
    assert_eq!(root_children, vec![parent.node_id()]);

    let items: Vec<_> = doc.children(parent.node_id()).collect();
    assert_eq!(items.len(), 10);
    assert_eq!(doc.qualified_name(items[0]).as_deref(), Some("IntegerValue1"));
    assert_eq!(doc.text_content(items[0]), "1");
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[test]
fn test_parse_and_find() {
    let builder = XmlBuilder::parse(&example_xml_doc()).unwrap();
    assert_eq!(builder.root().name().as_deref(), Some("Projects"));
    assert_eq!(builder.name().as_deref(), Some("Projects"));

    let location = builder.find_element("//Location", None).unwrap();
    assert_eq!(location.name().as_deref(), Some("Location"));
    assert_eq!(
        location.text_content(),
        "http://code.google.com/p/java-xmlbuilder/"
    );

    let location = location.find_element("//JetS3t/Location", None).unwrap();
    assert_eq!(
        location.text_content(),
        "http://jets3t.s3.amazonaws.com/index.html"
    );

    let cvs = location.find_element("//*[@scm = 'CVS']", None).unwrap();
    assert_eq!(cvs.name().as_deref(), Some("JetS3t"));

    let err = cvs.find_element("//@language", None).unwrap_err();
    assert!(matches!(err, Error::Query(QueryError::NotAnElement { .. })));
    assert!(err.to_string().contains("does not resolve to an Element"));
}

#[test]
fn test_typed_queries() {
    let builder = XmlBuilder::parse(&example_xml_doc()).unwrap();

    let location = builder
        .query("//JetS3t/Location/.", ResultKind::String, None)
        .unwrap();
    assert_eq!(
        location.as_str(),
        Some("http://jets3t.s3.amazonaws.com/index.html")
    );

    let count = builder
        .query("count(/Projects/*)", ResultKind::String, None)
        .unwrap();
    assert_eq!(count.as_str(), Some("2"));
    let count = builder
        .query("count(/Projects/*)", ResultKind::Number, None)
        .unwrap();
    assert_eq!(count.as_number(), Some(2.0));

    let nodes = builder
        .query("/Projects/*", ResultKind::NodeSet, None)
        .unwrap();
    let nodes = nodes.as_node_set().unwrap();
    assert_eq!(nodes.len(), 2);
    let XPathNode::Tree(second) = nodes[1] else {
        panic!("expected an element, got {:?}", nodes[1]);
    };
    assert_eq!(builder.doc().qualified_name(second).as_deref(), Some("JetS3t"));

    let attrs = builder
        .query("//@scm", ResultKind::NodeSet, None)
        .unwrap();
    assert!(attrs.as_node_set().unwrap().iter().all(|n| n.is_attribute()));
}

#[test]
fn test_query_empty_results_use_conversion_defaults() {
    let builder = XmlBuilder::parse(&example_xml_doc()).unwrap();
    assert_eq!(
        builder.query("//WrongName", ResultKind::Node, None).unwrap(),
        QueryValue::Node(None)
    );
    assert_eq!(
        builder.query("//WrongName", ResultKind::String, None).unwrap(),
        QueryValue::String(String::new())
    );
    assert!(builder
        .query("//WrongName", ResultKind::Number, None)
        .unwrap()
        .as_number()
        .unwrap()
        .is_nan());
    assert_eq!(
        builder.query("//WrongName", ResultKind::Boolean, None).unwrap(),
        QueryValue::Boolean(false)
    );
}

#[test]
fn test_amend_found_location() {
    let builder = XmlBuilder::parse(&example_xml_doc()).unwrap();
    let jets3t = builder.find_element("//JetS3t", None).unwrap();
    assert_eq!(jets3t.name().as_deref(), Some("JetS3t"));

    let location2 = jets3t
        .element("Location2", None)
        .unwrap()
        .attribute("type", "Testing")
        .unwrap();
    assert_eq!(location2.name().as_deref(), Some("Location2"));
    assert_eq!(location2.up(), jets3t);
    assert_eq!(location2.root(), builder.root());

    let props = OutputProperties::from_pairs([("omit-xml-declaration", "yes")]).unwrap();
    let xml = location2.as_string_with(&props).unwrap();
    assert_ne!(xml, example_xml_doc());
    assert!(xml.contains("<Location2 type=\"Testing\"/>"));
    assert_eq!(
        xml,
        format!("{EXAMPLE_XML_DOC_START}<Location2 type=\"Testing\"/>{EXAMPLE_XML_DOC_END}")
    );
}

#[test]
fn test_relative_query_from_cursor() {
    let builder = XmlBuilder::parse("<template_objects><report_objects/></template_objects>").unwrap();
    let node = builder.find_element("report_objects", None).unwrap();
    assert_eq!(node.name().as_deref(), Some("report_objects"));
    assert_eq!(
        node.element_as_string(&OutputProperties::new()).unwrap(),
        "<report_objects/>"
    );
}

// ---------------------------------------------------------------------------
// Whitespace
// ---------------------------------------------------------------------------

fn indented_props() -> OutputProperties {
    OutputProperties::from_pairs([
        ("indent", "yes"),
        ("{http://xml.apache.org/xslt}indent-amount", "2"),
    ])
    .unwrap()
}

#[test]
fn test_amend_document_with_whitespace_nodes() {
    let indented = XmlBuilder::parse(&example_xml_doc())
        .unwrap()
        .as_string_with(&indented_props())
        .unwrap();
    let builder = XmlBuilder::parse(&indented).unwrap();
    builder
        .find_element("//JetS3t", None)
        .unwrap()
        .element("AnotherLocation", None)
        .unwrap()
        .attribute("type", "Testing")
        .unwrap();
    let amended = builder.as_string_with(&indented_props()).unwrap();
    assert!(amended.contains("<AnotherLocation type=\"Testing\"/>"));
}

#[test]
fn test_strip_whitespace_nodes_from_document() {
    let indented = XmlBuilder::parse(&example_xml_doc())
        .unwrap()
        .as_string_with(&indented_props())
        .unwrap();
    let builder = XmlBuilder::parse(&indented).unwrap();
    assert!(builder.as_string().unwrap().contains('\n'));
    assert!(builder.as_string().unwrap().contains("  "));

    let builder = builder.strip_whitespace_only_text();
    assert!(!builder.as_string().unwrap().contains('\n'));
    assert!(!builder.as_string().unwrap().contains("  "));
    assert_eq!(builder.as_string().unwrap(), example_xml_doc());

    let nodes = builder.doc().node_count();
    let again = builder.strip_whitespace_only_text();
    assert_eq!(again.as_string().unwrap(), example_xml_doc());
    assert_eq!(again.doc().node_count(), nodes);
}

#[test]
fn test_strip_whitespace_keeps_cdata() {
    let builder = XmlBuilder::parse("<r>\n  <a><![CDATA[   ]]></a>\n  <b> x </b>\n</r>")
        .unwrap()
        .strip_whitespace_only_text();
    assert_eq!(
        builder.as_string().unwrap(),
        "<r><a><![CDATA[   ]]></a><b> x </b></r>"
    );
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

#[test]
fn test_text_nodes() {
    let builder = XmlBuilder::create("TestDocument", None)
        .unwrap()
        .element("TextElement", None)
        .unwrap()
        .text("Initial")
        .unwrap();

    let text_element = builder.find_element("//TextElement", None).unwrap();
    assert_eq!(text_element.text_content(), "Initial");

    text_element.text("Appended").unwrap();
    assert_eq!(text_element.text_content(), "InitialAppended");

    text_element.text_replace("Replacement").unwrap();
    assert_eq!(text_element.text_content(), "Replacement");

    for replace in [false, true] {
        let err = text_element.set_text(None, replace).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(err.to_string(), "Illegal null text value");
    }
    assert_eq!(text_element.text_content(), "Replacement");
}

#[test]
fn test_cdata_nodes() {
    let text = "Text data -- left as it is";
    let text_for_bytes = "Byte data is automatically base64-encoded";

    let builder = XmlBuilder::create("TestCDataNodes", None)
        .unwrap()
        .element("CDataTextElem", None)
        .unwrap()
        .cdata(text)
        .unwrap()
        .up()
        .element("CDataBytesElem", None)
        .unwrap()
        .cdata(text_for_bytes.as_bytes())
        .unwrap();

    let text_elem = builder.find_element("//CDataTextElem", None).unwrap();
    let doc = text_elem.doc();
    let first = doc.first_child(text_elem.node_id()).unwrap();
    assert_eq!(
        doc.node(first).kind,
        NodeKind::CData {
            content: text.to_owned()
        }
    );
    drop(doc);

    let bytes_elem = builder.find_element("//CDataBytesElem", None).unwrap();
    let doc = bytes_elem.doc();
    let first = doc.first_child(bytes_elem.node_id()).unwrap();
    let NodeKind::CData { content } = &doc.node(first).kind else {
        panic!("expected a CDATA section");
    };
    assert_eq!(content, "Qnl0ZSBkYXRhIGlzIGF1dG9tYXRpY2FsbHkgYmFzZTY0LWVuY29kZWQ=");
    let decoded = xmlbuilder::encoding::decode_base64(content).unwrap();
    assert_eq!(String::from_utf8(decoded).unwrap(), text_for_bytes);
}

#[test]
fn test_processing_instruction_nodes() {
    let builder = XmlBuilder::create("TestDocument", None)
        .unwrap()
        .instruction("test", "data")
        .unwrap();
    assert_eq!(
        builder.as_string().unwrap(),
        "<TestDocument><?test data?></TestDocument>"
    );

    let builder = XmlBuilder::create("TestDocument3", None)
        .unwrap()
        .document()
        .instruction("test", "data")
        .unwrap();
    assert_eq!(builder.as_string().unwrap().trim(), "<TestDocument3/><?test data?>");

    let builder = XmlBuilder::create("TestDocument3", None)
        .unwrap()
        .insert_instruction("test", "data")
        .unwrap();
    assert_eq!(builder.as_string().unwrap(), "<?test data?>\n<TestDocument3/>");

    let builder = XmlBuilder::create("TestDocument4", None)
        .unwrap()
        .element("ChildElem", None)
        .unwrap()
        .root()
        .insert_instruction("test", "data")
        .unwrap();
    assert_eq!(
        builder.as_string().unwrap(),
        "<?test data?>\n<TestDocument4><ChildElem/></TestDocument4>"
    );
}

#[test]
fn test_comments_and_references() {
    let builder = XmlBuilder::create("Doc", None)
        .unwrap()
        .comment("first")
        .unwrap()
        .element("Item", None)
        .unwrap()
        .reference("copy")
        .unwrap()
        .root();
    builder.document().comment("trailing").unwrap();
    assert_eq!(
        builder.as_string().unwrap(),
        "<Doc><!--first--><Item>&copy;</Item></Doc><!--trailing-->"
    );
    let comments = builder
        .query("count(//comment())", ResultKind::Number, None)
        .unwrap();
    assert_eq!(comments.as_number(), Some(2.0));
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

#[test]
fn test_import() {
    let importer = XmlBuilder::create("Importer", None)
        .unwrap()
        .element("Imported", None)
        .unwrap()
        .element("Element", None)
        .unwrap()
        .element("Goes", None)
        .unwrap()
        .attribute("are-we-there-yet", "almost")
        .unwrap()
        .element("Here", None)
        .unwrap();
    let importee = XmlBuilder::create("Importee", None)
        .unwrap()
        .element("Importee", None)
        .unwrap()
        .attribute("awating-my", "new-home")
        .unwrap()
        .element("IsEntireSubtree", None)
        .unwrap()
        .element("Included", None)
        .unwrap();
    let before = importee.as_string().unwrap();

    importer.import_subtree(&importee).unwrap();
    assert_eq!(importer.name().as_deref(), Some("Here"));
    for expression in ["//Importee", "//IsEntireSubtree", "//Included"] {
        importer.find_element(expression, None).unwrap();
    }
    assert_eq!(importee.as_string().unwrap(), before);

    let invalid = XmlBuilder::create("InvalidImporter", None)
        .unwrap()
        .text("BadBadBad")
        .unwrap();
    assert!(matches!(
        invalid.import_subtree(&importee),
        Err(Error::InvalidState(_))
    ));
}

#[test]
fn test_import_keeps_namespaces_and_mixed_content() {
    let source = XmlBuilder::parse(
        "<s:Source xmlns:s=\"urn:s\"><!--note--><?pi x?><s:Item><![CDATA[raw]]>&ent;</s:Item></s:Source>",
    )
    .unwrap();
    let target = XmlBuilder::create("Target", None).unwrap();
    target.import_subtree(&source).unwrap();
    assert_eq!(
        target.as_string().unwrap(),
        "<Target><s:Source xmlns:s=\"urn:s\"><!--note--><?pi x?>\
         <s:Item><![CDATA[raw]]>&ent;</s:Item></s:Source></Target>"
    );
}
