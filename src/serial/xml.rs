//! XML serializer.
//!
//! Writes a `Document`, or any subtree of it, as XML text.
//!
//! Namespace fixup happens here and only here: an element whose namespace
//! is not bound to its prefix in the output written so far gets the
//! missing `xmlns` attribute, and an element in no namespace beneath a
//! default namespace gets `xmlns=""`. The tree itself is never changed.

use std::io::Write;

use tracing::debug;

use super::OutputProperties;
use crate::encoding;
use crate::error::Result;
use crate::tree::{Document, NodeId, NodeKind, XML_NAMESPACE};
use crate::util::qname::is_whitespace_only;

/// Serializes a whole document.
///
/// Unless omitted, the XML declaration comes first with no line break
/// after it. Top-level nodes before the root element are each followed by
/// a newline; nodes after it follow directly.
///
/// # Examples
///
/// ```
/// use xmlbuilder::{Document, OutputProperties};
/// use xmlbuilder::serial::serialize_document;
///
/// let doc = Document::parse_str("<root><child>Hello</child></root>").unwrap();
/// let xml = serialize_document(&doc, &OutputProperties::new().omit_xml_declaration(true));
/// assert_eq!(xml, "<root><child>Hello</child></root>");
/// ```
#[must_use]
pub fn serialize_document(doc: &Document, props: &OutputProperties) -> String {
    let mut serializer = Serializer::new(doc, props);
    if !props.omit_xml_declaration {
        serializer.write_declaration();
    }
    serializer.write_document_children();
    debug!(
        indent = props.indent,
        encoding = %props.encoding,
        omit_declaration = props.omit_xml_declaration,
        len = serializer.out.len(),
        "serialized document"
    );
    serializer.out
}

/// Serializes the subtree rooted at `id` without any declaration.
/// Namespace bindings inherited from outside the subtree are re-declared
/// where the subtree uses them.
#[must_use]
pub fn serialize_subtree(doc: &Document, id: NodeId, props: &OutputProperties) -> String {
    let mut serializer = Serializer::new(doc, props);
    if let NodeKind::Document = doc.node(id).kind {
        serializer.write_document_children();
    } else {
        serializer.write_node(id, 0, false);
    }
    debug!(
        subtree = id.into_raw(),
        indent = props.indent,
        len = serializer.out.len(),
        "serialized subtree"
    );
    serializer.out
}

/// Serializes a whole document and encodes it in the configured charset.
///
/// # Errors
///
/// Returns [`Error::Configuration`](crate::Error::Configuration) if the
/// encoding label is unknown.
pub fn serialize_to_bytes(doc: &Document, props: &OutputProperties) -> Result<Vec<u8>> {
    encoding::encode_output(&serialize_document(doc, props), &props.encoding)
}

/// Serializes a whole document into `writer`, encoded in the configured
/// charset.
///
/// # Errors
///
/// Returns [`Error::Configuration`](crate::Error::Configuration) for an
/// unknown encoding and [`Error::Io`](crate::Error::Io) if writing fails.
pub fn write_document<W: Write>(
    doc: &Document,
    props: &OutputProperties,
    mut writer: W,
) -> Result<()> {
    let bytes = serialize_to_bytes(doc, props)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

struct Serializer<'a> {
    doc: &'a Document,
    props: &'a OutputProperties,
    out: String,
    /// Bindings written so far, one frame per open element.
    scopes: Vec<Vec<(String, String)>>,
}

impl<'a> Serializer<'a> {
    fn new(doc: &'a Document, props: &'a OutputProperties) -> Self {
        Self {
            doc,
            props,
            out: String::new(),
            scopes: vec![vec![("xml".to_owned(), XML_NAMESPACE.to_owned())]],
        }
    }

    fn write_declaration(&mut self) {
        self.out.push_str("<?xml version=\"");
        self.out.push_str(&self.props.version);
        self.out.push_str("\" encoding=\"");
        self.out.push_str(&self.props.encoding);
        self.out.push('"');
        if let Some(standalone) = self.props.standalone.or(self.doc.standalone) {
            self.out.push_str(" standalone=\"");
            self.out.push_str(if standalone { "yes" } else { "no" });
            self.out.push('"');
        }
        self.out.push_str("?>");
    }

    fn write_document_children(&mut self) {
        let mut before_root = true;
        for child in self.doc.children(self.doc.root()) {
            let is_element = self.doc.is_element(child);
            self.write_node(child, 0, false);
            if before_root && !is_element {
                self.out.push('\n');
            }
            before_root &= !is_element;
        }
    }

    fn resolve(&self, prefix: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(bound, _)| bound == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    fn declared_here(&self, prefix: &str) -> bool {
        self.scopes
            .last()
            .is_some_and(|frame| frame.iter().any(|(bound, _)| bound == prefix))
    }

    fn push_indent(&mut self, depth: usize) {
        let width = self.props.effective_indent_amount() * depth;
        self.out.push_str(&" ".repeat(width));
    }

    /// Returns `true` if the element has element children and nothing
    /// but whitespace text besides, so indenting it changes no content.
    fn is_element_only(&self, id: NodeId) -> bool {
        let mut has_element_child = false;
        for child in self.doc.children(id) {
            match &self.doc.node(child).kind {
                NodeKind::Element { .. } => has_element_child = true,
                NodeKind::Text { content } => {
                    if !is_whitespace_only(content) {
                        return false;
                    }
                }
                NodeKind::CData { .. } | NodeKind::EntityRef { .. } => return false,
                _ => {}
            }
        }
        has_element_child
    }

    fn write_node(&mut self, id: NodeId, depth: usize, parent_is_element_only: bool) {
        let doc = self.doc;
        let pretty = self.props.indent && parent_is_element_only;
        match &doc.node(id).kind {
            NodeKind::Element {
                name,
                prefix,
                namespace,
                attributes,
                namespaces,
            } => {
                if pretty {
                    self.push_indent(depth);
                }
                let qname = match prefix {
                    Some(prefix) => format!("{prefix}:{name}"),
                    None => name.clone(),
                };
                self.out.push('<');
                self.out.push_str(&qname);

                self.scopes.push(Vec::new());
                for decl in namespaces {
                    self.write_namespace(&decl.prefix, &decl.uri);
                }
                let prefix = prefix.as_deref().unwrap_or("");
                match namespace {
                    Some(uri)
                        if self.resolve(prefix) != Some(uri.as_str())
                            && !self.declared_here(prefix) =>
                    {
                        self.write_namespace(prefix, uri);
                    }
                    None if prefix.is_empty()
                        && !self.declared_here("")
                        && self.resolve("").is_some_and(|uri| !uri.is_empty()) =>
                    {
                        self.write_namespace("", "");
                    }
                    _ => {}
                }
                for attr in attributes {
                    self.out.push(' ');
                    self.out.push_str(&attr.name);
                    self.out.push_str("=\"");
                    write_escaped_attr(&mut self.out, &attr.value);
                    self.out.push('"');
                }

                if doc.first_child(id).is_none() {
                    self.out.push_str("/>");
                } else {
                    self.out.push('>');
                    let element_only = self.props.indent && self.is_element_only(id);
                    if element_only {
                        self.out.push('\n');
                    }
                    for child in doc.children(id) {
                        if element_only {
                            if let NodeKind::Text { .. } = doc.node(child).kind {
                                continue;
                            }
                        }
                        self.write_node(child, depth + 1, element_only);
                    }
                    if element_only {
                        self.push_indent(depth);
                    }
                    self.out.push_str("</");
                    self.out.push_str(&qname);
                    self.out.push('>');
                }
                self.scopes.pop();
            }
            NodeKind::Text { content } => write_escaped_text(&mut self.out, content),
            NodeKind::CData { content } => {
                if pretty {
                    self.push_indent(depth);
                }
                self.out.push_str("<![CDATA[");
                self.out.push_str(content);
                self.out.push_str("]]>");
            }
            NodeKind::Comment { content } => {
                if pretty {
                    self.push_indent(depth);
                }
                self.out.push_str("<!--");
                self.out.push_str(content);
                self.out.push_str("-->");
            }
            NodeKind::ProcessingInstruction { target, data } => {
                if pretty {
                    self.push_indent(depth);
                }
                self.out.push_str("<?");
                self.out.push_str(target);
                if let Some(data) = data {
                    self.out.push(' ');
                    self.out.push_str(data);
                }
                self.out.push_str("?>");
            }
            NodeKind::EntityRef { name } => {
                self.out.push('&');
                self.out.push_str(name);
                self.out.push(';');
            }
            NodeKind::Document => {}
        }
        if pretty {
            self.out.push('\n');
        }
    }

    /// Writes an `xmlns` attribute and records the binding for the
    /// element being written.
    fn write_namespace(&mut self, prefix: &str, uri: &str) {
        self.out.push_str(" xmlns");
        if !prefix.is_empty() {
            self.out.push(':');
            self.out.push_str(prefix);
        }
        self.out.push_str("=\"");
        write_escaped_attr(&mut self.out, uri);
        self.out.push('"');
        if let Some(frame) = self.scopes.last_mut() {
            frame.push((prefix.to_owned(), uri.to_owned()));
        }
    }
}

/// Escapes character data. `\r` is written as a reference so that it
/// survives line-end normalization on reparse.
fn write_escaped_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
}

/// Escapes an attribute value for a double-quoted attribute. Whitespace
/// other than the space character is written as references so that
/// attribute value normalization leaves it intact.
fn write_escaped_attr(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn compact() -> OutputProperties {
        OutputProperties::new().omit_xml_declaration(true)
    }

    fn roundtrip(input: &str) -> String {
        let doc = Document::parse_str(input).unwrap();
        serialize_document(&doc, &compact())
    }

    #[test]
    fn test_serialize_empty_element() {
        assert_eq!(roundtrip("<root></root>"), "<root/>");
    }

    #[test]
    fn test_serialize_declaration() {
        let doc = Document::parse_str("<root/>").unwrap();
        assert_eq!(
            serialize_document(&doc, &OutputProperties::new()),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><root/>"
        );
    }

    #[test]
    fn test_serialize_standalone_from_document() {
        let mut doc = Document::parse_str("<RootNode><InnerNode/></RootNode>").unwrap();
        doc.set_standalone(true);
        assert_eq!(
            serialize_document(&doc, &OutputProperties::new()),
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <RootNode><InnerNode/></RootNode>"
        );
    }

    #[test]
    fn test_serialize_escaping() {
        let mut doc = Document::with_root("r", None).unwrap();
        let root = doc.root_element().unwrap();
        doc.set_attribute(root, "a", "\"x\" & <y>\n").unwrap();
        doc.append_text(root, Some("1 < 2 & 3 > 2"), false).unwrap();
        assert_eq!(
            serialize_document(&doc, &compact()),
            "<r a=\"&quot;x&quot; &amp; &lt;y&gt;&#10;\">1 &lt; 2 &amp; 3 &gt; 2</r>"
        );
    }

    #[test]
    fn test_serialize_prolog_and_epilog() {
        assert_eq!(
            roundtrip("<?before?><!--c--><root/><?after data?>"),
            "<?before?>\n<!--c-->\n<root/><?after data?>"
        );
    }

    #[test]
    fn test_serialize_cdata_and_entity_reference() {
        assert_eq!(
            roundtrip("<root><![CDATA[<raw>]]>&custom;</root>"),
            "<root><![CDATA[<raw>]]>&custom;</root>"
        );
    }

    #[test]
    fn test_declarations_precede_attributes() {
        let mut doc = Document::with_root("r", None).unwrap();
        let root = doc.root_element().unwrap();
        doc.set_attribute(root, "id", "1").unwrap();
        doc.declare_namespace(root, "p", "urn:p").unwrap();
        assert_eq!(
            serialize_document(&doc, &compact()),
            "<r xmlns:p=\"urn:p\" id=\"1\"/>"
        );
    }

    #[test]
    fn test_namespace_fixup_adds_missing_declaration() {
        let mut doc = Document::with_root("r", Some("urn:a")).unwrap();
        let root = doc.root_element().unwrap();
        let child = doc
            .create_element("InsertedYetAgain", Some("urn:custom2".to_owned()))
            .unwrap();
        doc.append_child(root, child);
        let same = doc.create_element("Same", Some("urn:a".to_owned())).unwrap();
        doc.append_child(root, same);
        assert_eq!(
            serialize_document(&doc, &compact()),
            "<r xmlns=\"urn:a\"><InsertedYetAgain xmlns=\"urn:custom2\"/><Same/></r>"
        );
    }

    #[test]
    fn test_namespace_fixup_undeclares_default() {
        let mut doc = Document::with_root("r", Some("urn:a")).unwrap();
        let root = doc.root_element().unwrap();
        let plain = doc.create_element("plain", None).unwrap();
        doc.append_child(root, plain);
        assert_eq!(
            serialize_document(&doc, &compact()),
            "<r xmlns=\"urn:a\"><plain xmlns=\"\"/></r>"
        );
    }

    #[test]
    fn test_subtree_redeclares_inherited_namespace() {
        let doc = Document::parse_str("<p:r xmlns:p=\"urn:p\"><p:c>x</p:c></p:r>").unwrap();
        let root = doc.root_element().unwrap();
        let child = doc.first_child(root).unwrap();
        assert_eq!(
            serialize_subtree(&doc, child, &compact()),
            "<p:c xmlns:p=\"urn:p\">x</p:c>"
        );
    }

    #[test]
    fn test_serialize_pretty_print() {
        let doc = Document::parse_str("<a><b><c>text</c></b><d/></a>").unwrap();
        let xml = serialize_document(&doc, &compact().indent(true));
        assert_eq!(xml, "<a>\n  <b>\n    <c>text</c>\n  </b>\n  <d/>\n</a>");
    }

    #[test]
    fn test_serialize_pretty_print_zero_width() {
        let doc = Document::parse_str("<a><b/></a>").unwrap();
        let xml = serialize_document(&doc, &compact().indent(true).indent_amount(0));
        assert_eq!(xml, "<a>\n<b/>\n</a>");
    }

    #[test]
    fn test_serialize_pretty_print_mixed_content_untouched() {
        let doc = Document::parse_str("<a>text<b/>more</a>").unwrap();
        let xml = serialize_document(&doc, &compact().indent(true));
        assert_eq!(xml, "<a>text<b/>more</a>");
    }

    #[test]
    fn test_pretty_print_keeps_non_breaking_space() {
        let doc = Document::parse_str("<a><b/>\u{a0}</a>").unwrap();
        let xml = serialize_document(&doc, &compact().indent(true));
        assert_eq!(xml, "<a><b/>\u{a0}</a>");
    }

    #[test]
    fn test_pretty_print_replaces_existing_whitespace() {
        let doc = Document::parse_str("<a>\n      <b/>\n</a>").unwrap();
        let xml = serialize_document(&doc, &compact().indent(true));
        assert_eq!(xml, "<a>\n  <b/>\n</a>");
    }

    #[test]
    fn test_serialize_to_bytes_transcodes() {
        let doc = Document::parse_str("<r>é</r>").unwrap();
        let props = OutputProperties::new().encoding("ISO-8859-1");
        let bytes = serialize_to_bytes(&doc, &props).unwrap();
        assert!(bytes.ends_with(b"<r>\xE9</r>"));
        assert!(bytes.starts_with(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>"));
    }

    #[test]
    fn test_write_document_unknown_encoding() {
        let doc = Document::parse_str("<r/>").unwrap();
        let props = OutputProperties::new().encoding("bogus");
        let mut sink = Vec::new();
        assert!(write_document(&doc, &props, &mut sink).is_err());
        assert!(sink.is_empty());
    }
}
