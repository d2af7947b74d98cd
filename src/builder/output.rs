//! Serialization entry points on the cursor.

use std::io::Write;

use super::XmlBuilder;
use crate::error::Result;
use crate::serial::{self, OutputProperties};

impl XmlBuilder {
    /// Serializes the whole document without an XML declaration, whatever
    /// node the builder is at.
    ///
    /// # Errors
    ///
    /// Never fails with the default properties; the `Result` matches
    /// [`as_string_with`](Self::as_string_with).
    pub fn as_string(&self) -> Result<String> {
        self.as_string_with(&OutputProperties::new().omit_xml_declaration(true))
    }

    /// Serializes the whole document with the given properties.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`](crate::Error::Configuration) if
    /// `props` names an unknown encoding.
    pub fn as_string_with(&self, props: &OutputProperties) -> Result<String> {
        crate::encoding::lookup(&props.encoding)?;
        Ok(serial::serialize_document(&self.doc.borrow(), props))
    }

    /// Serializes only the current node and its descendants. No declaration
    /// is written. Namespaces the subtree inherits are declared on it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`](crate::Error::Configuration) if
    /// `props` names an unknown encoding.
    pub fn element_as_string(&self, props: &OutputProperties) -> Result<String> {
        crate::encoding::lookup(&props.encoding)?;
        Ok(serial::serialize_subtree(&self.doc.borrow(), self.node, props))
    }

    /// Writes the whole document to `writer`, encoded in the charset
    /// `props` names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`](crate::Error::Configuration) for an
    /// unknown encoding and [`Error::Io`](crate::Error::Io) if writing
    /// fails.
    pub fn to_writer<W: Write>(&self, writer: W, props: &OutputProperties) -> Result<()> {
        serial::write_document(&self.doc.borrow(), props, writer)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_as_string_is_whole_document() {
        let child = XmlBuilder::create("Root", None)
            .unwrap()
            .element("Child", None)
            .unwrap();
        assert_eq!(child.as_string().unwrap(), "<Root><Child/></Root>");
    }

    #[test]
    fn test_element_as_string() {
        let my = XmlBuilder::create("Root", None)
            .unwrap()
            .element("My", None)
            .unwrap()
            .text("Test")
            .unwrap();
        assert_eq!(
            my.element_as_string(&OutputProperties::new()).unwrap(),
            "<My>Test</My>"
        );
    }

    #[test]
    fn test_as_string_with_declaration() {
        let b = XmlBuilder::create("r", None).unwrap();
        assert_eq!(
            b.as_string_with(&OutputProperties::new()).unwrap(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><r/>"
        );
    }

    #[test]
    fn test_unknown_encoding_is_configuration_error() {
        let b = XmlBuilder::create("r", None).unwrap();
        let props = OutputProperties::new().encoding("klingon");
        assert!(matches!(
            b.as_string_with(&props),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            b.to_writer(Vec::new(), &props),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_to_writer_standalone() {
        let b = XmlBuilder::parse("<RootNode><InnerNode/></RootNode>")
            .unwrap()
            .set_standalone(true);
        let props =
            OutputProperties::from_pairs([("version", "1.0"), ("method", "xml"), ("standalone", "yes")])
                .unwrap();
        let mut out = Vec::new();
        b.to_writer(&mut out, &props).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?><RootNode><InnerNode/></RootNode>"
        );
    }
}
