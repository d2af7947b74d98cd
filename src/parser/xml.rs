//! Core XML 1.0 parser.
//!
//! Hand-rolled recursive descent over [`ParserInput`], building a
//! namespace-resolved [`Document`]. See <https://www.w3.org/TR/xml/>.

use tracing::debug;

use crate::error::{Error, ParseError};
use crate::tree::{Document, NodeId, NodeKind};
use crate::util::qname::{split_qname, QName};

use super::input::{
    parse_cdata_content, parse_comment_content, parse_pi_content, parse_xml_decl,
    NamespaceScopes, ParserInput, Reference,
};

pub(crate) struct XmlParser<'a> {
    input: ParserInput<'a>,
    doc: Document,
    scopes: NamespaceScopes,
}

impl<'a> XmlParser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: ParserInput::new(input),
            doc: Document::new(),
            scopes: NamespaceScopes::new(),
        }
    }

    /// Parses the entire document.
    ///
    /// Whitespace outside the root element is not kept.
    pub fn parse(mut self) -> Result<Document, ParseError> {
        if self.at_xml_declaration() {
            let decl = parse_xml_decl(&mut self.input)?;
            self.doc.version = Some(decl.version);
            self.doc.encoding = decl.encoding;
            self.doc.standalone = decl.standalone;
        } else if self.input.skip_whitespace() && self.at_xml_declaration() {
            return Err(self
                .input
                .fatal("XML declaration must be at the start of the document"));
        }

        let document = self.doc.root();
        self.parse_misc(document)?;

        if self.input.looking_at(b"<!DOCTYPE") {
            self.skip_doctype()?;
            self.parse_misc(document)?;
        }

        if self.input.peek() == Some(b'<')
            && self.input.peek_at(1).is_some_and(|b| b != b'!' && b != b'?')
        {
            self.parse_element(document)?;
        } else {
            return Err(self.input.fatal("missing root element"));
        }

        self.parse_misc(document)?;
        if !self.input.at_end() {
            return Err(self.input.fatal("content after document element"));
        }

        debug!(
            nodes = self.doc.node_count(),
            standalone = ?self.doc.standalone,
            "parsed document"
        );
        Ok(self.doc)
    }

    fn at_xml_declaration(&self) -> bool {
        self.input.looking_at(b"<?xml")
            && matches!(self.input.peek_at(5), Some(b' ' | b'\t' | b'\r' | b'\n'))
    }

    /// Converts a tree rejection into a parse error at the current position.
    fn tree_error(&self, err: &Error) -> ParseError {
        self.input.fatal(err.to_string())
    }

    // --- Misc (comments, PIs, whitespace) ---

    fn parse_misc(&mut self, parent: NodeId) -> Result<(), ParseError> {
        loop {
            self.input.skip_whitespace();
            if self.input.looking_at(b"<!--") {
                self.parse_comment(parent)?;
            } else if self.input.looking_at(b"<?") {
                self.parse_processing_instruction(parent)?;
            } else {
                return Ok(());
            }
        }
    }

    // --- DOCTYPE ---

    /// Consumes a document type declaration, internal subset included.
    /// Nothing from it is retained.
    fn skip_doctype(&mut self) -> Result<(), ParseError> {
        self.input.expect_str(b"<!DOCTYPE")?;
        self.input.skip_whitespace_required()?;
        let mut brackets = 0u32;
        let mut quote: Option<u8> = None;
        loop {
            let b = self
                .input
                .next_byte()
                .map_err(|_| self.input.fatal("unexpected end of input in DOCTYPE"))?;
            match (quote, b) {
                (Some(q), _) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'[') => brackets += 1,
                (None, b']') => brackets = brackets.saturating_sub(1),
                (None, b'>') if brackets == 0 => return Ok(()),
                _ => {}
            }
        }
    }

    // --- Elements ---
    // See XML 1.0 §3.1: [39] element

    fn parse_element(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        self.input.increment_depth()?;
        self.input.expect_byte(b'<')?;
        let name = self.input.parse_name()?;
        if !QName::parse(&name).is_valid() {
            return Err(self.input.fatal(format!("invalid element name '{name}'")));
        }

        let mut attributes: Vec<(String, String)> = Vec::new();
        loop {
            let had_ws = self.input.skip_whitespace();
            if self.input.peek() == Some(b'>') || self.input.looking_at(b"/>") {
                break;
            }
            if !had_ws {
                return Err(self.input.fatal("whitespace required between attributes"));
            }
            let (attr_name, value) = self.parse_attribute()?;
            if attributes.iter().any(|(existing, _)| *existing == attr_name) {
                return Err(self
                    .input
                    .fatal(format!("duplicate attribute: '{attr_name}'")));
            }
            attributes.push((attr_name, value));
        }

        // --- Namespace processing (Namespaces in XML 1.0 §3) ---
        self.scopes.push_scope();
        for (attr_name, value) in &attributes {
            if attr_name == "xmlns" {
                self.scopes.bind("", value);
            } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
                if prefix.is_empty() || value.is_empty() {
                    return Err(self
                        .input
                        .fatal(format!("invalid namespace declaration '{attr_name}'")));
                }
                self.scopes.bind(prefix, value);
            }
        }

        let (prefix, _) = split_qname(&name);
        if prefix == Some("xmlns") {
            return Err(self
                .input
                .fatal("elements must not have the prefix 'xmlns'"));
        }
        // An unbound prefix is kept verbatim with no namespace.
        let namespace = self.scopes.resolve(prefix.unwrap_or("")).map(str::to_owned);

        let element = self
            .doc
            .create_element(&name, namespace)
            .map_err(|e| self.tree_error(&e))?;
        for (attr_name, value) in &attributes {
            self.doc
                .set_attribute(element, attr_name, value)
                .map_err(|e| self.tree_error(&e))?;
        }
        self.doc.append_child(parent, element);

        if self.input.looking_at(b"/>") {
            self.input.advance(2);
        } else {
            self.input.expect_byte(b'>')?;
            self.parse_content(element)?;
            self.input.expect_str(b"</")?;
            let end = self.input.parse_name()?;
            if end != name {
                return Err(self.input.fatal(format!(
                    "mismatched end tag: expected </{name}>, found </{end}>"
                )));
            }
            self.input.skip_whitespace();
            self.input.expect_byte(b'>')?;
        }

        self.scopes.pop_scope();
        self.input.decrement_depth();
        Ok(element)
    }

    // --- Content ---
    // See XML 1.0 §3.1: [43] content

    fn parse_content(&mut self, parent: NodeId) -> Result<(), ParseError> {
        loop {
            if self.input.at_end() {
                return Err(self
                    .input
                    .fatal("unexpected end of input in element content"));
            }
            if self.input.looking_at(b"</") {
                return Ok(());
            }

            if self.input.looking_at(b"<![CDATA[") {
                let content = parse_cdata_content(&mut self.input)?;
                let cdata = self.doc.create_node(NodeKind::CData { content });
                self.doc.append_child(parent, cdata);
            } else if self.input.looking_at(b"<!--") {
                self.parse_comment(parent)?;
            } else if self.input.looking_at(b"<?") {
                self.parse_processing_instruction(parent)?;
            } else if self.input.peek() == Some(b'<') {
                self.parse_element(parent)?;
            } else if self.input.peek() == Some(b'&') {
                match self.input.parse_reference()? {
                    Reference::Text(text) => self.append_text(parent, &text)?,
                    Reference::Entity(name) => {
                        let reference = self.doc.create_node(NodeKind::EntityRef { name });
                        self.doc.append_child(parent, reference);
                    }
                }
            } else {
                self.parse_char_data(parent)?;
            }
        }
    }

    // --- Character Data ---
    // See XML 1.0 §2.4: [14] CharData

    fn parse_char_data(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let mut text = String::new();
        while let Some(b) = self.input.peek() {
            if b == b'<' || b == b'&' {
                break;
            }
            if self.input.looking_at(b"]]>") {
                return Err(self
                    .input
                    .fatal("']]>' not allowed in character data"));
            }
            text.push(self.input.next_char()?);
        }
        self.append_text(parent, &text)
    }

    /// Appends character data, merging with a preceding text node so that
    /// references inside a run of text yield a single node.
    fn append_text(&mut self, parent: NodeId, text: &str) -> Result<(), ParseError> {
        if text.is_empty() {
            return Ok(());
        }
        self.doc
            .append_text(parent, Some(text), false)
            .map_err(|e| self.tree_error(&e))
    }

    // --- Attributes ---
    // See XML 1.0 §3.1: [41] Attribute

    fn parse_attribute(&mut self) -> Result<(String, String), ParseError> {
        let name = self.input.parse_name()?;
        self.input.skip_whitespace();
        self.input.expect_byte(b'=')?;
        self.input.skip_whitespace();
        let value = self.input.parse_attribute_value()?;
        Ok((name, value))
    }

    fn parse_comment(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let content = parse_comment_content(&mut self.input)?;
        let comment = self.doc.create_node(NodeKind::Comment { content });
        self.doc.append_child(parent, comment);
        Ok(())
    }

    fn parse_processing_instruction(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let (target, data) = parse_pi_content(&mut self.input)?;
        let pi = self
            .doc
            .create_node(NodeKind::ProcessingInstruction { target, data });
        self.doc.append_child(parent, pi);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tree::XML_NAMESPACE;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> Document {
        Document::parse_str(input).unwrap_or_else(|e| panic!("parse failed: {e}"))
    }

    fn parse_err(input: &str) -> ParseError {
        Document::parse_str(input).unwrap_err()
    }

    #[test]
    fn test_parse_empty_element() {
        let doc = parse("<root/>");
        let root = doc.root_element().unwrap();
        assert_eq!(doc.local_name(root), Some("root"));
        assert_eq!(doc.first_child(root), None);
    }

    #[test]
    fn test_parse_nested_elements_and_text() {
        let doc = parse("<a><b>Hello, <c/>world!</b></a>");
        let a = doc.root_element().unwrap();
        let b = doc.first_child(a).unwrap();
        assert_eq!(doc.local_name(b), Some("b"));
        assert_eq!(doc.text_content(b), "Hello, world!");
        assert_eq!(doc.children(b).count(), 3);
    }

    #[test]
    fn test_parse_attributes() {
        let doc = parse("<div id=\"main\" class='big'/>");
        let root = doc.root_element().unwrap();
        assert_eq!(doc.attribute(root, "id"), Some("main"));
        assert_eq!(doc.attribute(root, "class"), Some("big"));
    }

    #[test]
    fn test_parse_xml_declaration() {
        let doc = parse(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><root/>"#);
        assert_eq!(doc.version.as_deref(), Some("1.0"));
        assert_eq!(doc.encoding.as_deref(), Some("UTF-8"));
        assert_eq!(doc.standalone, Some(true));
    }

    #[test]
    fn test_parse_prolog_and_epilog() {
        let doc = parse("<?test data?>\n<!-- c -->\n<root/>\n<?after?>");
        let kinds: Vec<&str> = doc
            .children(doc.root())
            .map(|id| doc.node(id).kind.label())
            .collect();
        assert_eq!(
            kinds,
            vec!["processing-instruction", "comment", "element", "processing-instruction"]
        );
    }

    #[test]
    fn test_parse_cdata_and_comment() {
        let doc = parse("<root><![CDATA[<raw> & ]]><!-- note --></root>");
        let root = doc.root_element().unwrap();
        let cdata = doc.first_child(root).unwrap();
        assert_eq!(doc.node_text(cdata), Some("<raw> & "));
        let comment = doc.last_child(root).unwrap();
        assert_eq!(doc.node_text(comment), Some(" note "));
    }

    #[test]
    fn test_references_merge_into_one_text_node() {
        let doc = parse("<root>a &amp; b &#65;</root>");
        let root = doc.root_element().unwrap();
        assert_eq!(doc.children(root).count(), 1);
        assert_eq!(doc.text_content(root), "a & b A");
    }

    #[test]
    fn test_unknown_entity_becomes_reference_node() {
        let doc = parse("<root>x&custom;y</root>");
        let root = doc.root_element().unwrap();
        let kinds: Vec<NodeKind> = doc
            .children(root)
            .map(|id| doc.node(id).kind.clone())
            .collect();
        assert_eq!(
            kinds[1],
            NodeKind::EntityRef {
                name: "custom".to_owned()
            }
        );
        assert_eq!(kinds.len(), 3);
    }

    #[test]
    fn test_doctype_is_skipped() {
        let doc = parse("<!DOCTYPE root [<!ENTITY e \"]>\">]><root/>");
        assert_eq!(doc.children(doc.root()).count(), 1);
    }

    #[test]
    fn test_default_namespace_inherited() {
        let doc = parse("<root xmlns=\"urn:a\"><child/><plain xmlns=\"\"/></root>");
        let root = doc.root_element().unwrap();
        assert_eq!(doc.node_namespace(root), Some("urn:a"));
        let mut children = doc.children(root);
        assert_eq!(doc.node_namespace(children.next().unwrap()), Some("urn:a"));
        assert_eq!(doc.node_namespace(children.next().unwrap()), None);
        assert_eq!(doc.namespace_decls(root)[0].uri, "urn:a");
    }

    #[test]
    fn test_prefixed_namespace() {
        let doc = parse("<ns:root xmlns:ns=\"urn:ns\" ns:attr=\"1\" xml:lang=\"en\"/>");
        let root = doc.root_element().unwrap();
        assert_eq!(doc.node_prefix(root), Some("ns"));
        assert_eq!(doc.node_namespace(root), Some("urn:ns"));
        assert_eq!(doc.attribute(root, "ns:attr"), Some("1"));
        assert_eq!(doc.attribute(root, "xml:lang"), Some("en"));
        assert_eq!(doc.attributes(root).len(), 2);
        assert_eq!(doc.lookup_namespace_uri(root, Some("xml")), Some(XML_NAMESPACE));
    }

    #[test]
    fn test_unbound_prefix_is_kept_without_namespace() {
        let doc = parse("<undeclared:root/>");
        let root = doc.root_element().unwrap();
        assert_eq!(doc.node_prefix(root), Some("undeclared"));
        assert_eq!(doc.node_namespace(root), None);
    }

    #[test]
    fn test_whitespace_inside_root_is_kept() {
        let doc = parse("<root>\n  <a/>\n</root>");
        let root = doc.root_element().unwrap();
        assert_eq!(doc.children(root).count(), 3);
    }

    #[test]
    fn test_errors() {
        assert!(parse_err("<a></b>").message.contains("mismatched end tag"));
        assert!(parse_err("<a>").message.contains("unexpected end of input"));
        assert!(parse_err("").message.contains("missing root element"));
        assert!(parse_err("<a/><b/>").message.contains("content after document element"));
        assert!(parse_err("<a x='1' x='2'/>").message.contains("duplicate attribute"));
        assert!(parse_err("<a>]]></a>").message.contains("]]>"));
        assert!(parse_err(" <?xml version=\"1.0\"?><a/>")
            .message
            .contains("start of the document"));
    }

    #[test]
    fn test_error_location() {
        let err = parse_err("<root>\n  <child>\n</root>");
        assert_eq!(err.location.line, 3);
    }
}
