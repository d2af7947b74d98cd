//! XML 1.0 parser.
//!
//! A hand-rolled recursive descent parser producing a namespace-resolved
//! [`Document`]. Element namespaces are resolved while parsing and every
//! `xmlns` attribute is recorded as a declaration on its element.
//!
//! The parser keeps what a builder needs and no more:
//!
//! - the XML declaration's version, encoding and standalone flag;
//! - comments, processing instructions and CDATA sections, in and around
//!   the root element;
//! - references to entities other than the five built-ins, as entity
//!   reference nodes.
//!
//! Whitespace outside the root element and the document type declaration
//! are discarded. No external resource is ever fetched.

pub(crate) mod input;
mod xml;

use std::io::Read;

use crate::encoding;
use crate::error::{ParseError, Result};
use crate::tree::Document;

/// Parses an XML string into a [`Document`]. A leading byte order mark is
/// ignored.
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not well-formed.
///
/// # Examples
///
/// ```
/// use xmlbuilder::parser::parse_str;
///
/// let doc = parse_str("<root><child/></root>").unwrap();
/// assert_eq!(doc.node_count(), 3);
/// ```
pub fn parse_str(input: &str) -> Result<Document, ParseError> {
    let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
    xml::XmlParser::new(input).parse()
}

/// Parses raw bytes, choosing the charset from a byte order mark or the
/// XML declaration (UTF-8 otherwise).
///
/// # Errors
///
/// Returns [`ParseError`] if the charset is unknown, the bytes do not
/// decode, or the text is not well-formed.
pub fn parse_bytes(input: &[u8]) -> Result<Document, ParseError> {
    let text = encoding::decode_to_utf8(input)?;
    parse_str(&text)
}

/// Reads `reader` to the end and parses the bytes as [`parse_bytes`] does.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) if reading fails and
/// [`Error::Parse`](crate::Error::Parse) if parsing does.
pub fn parse_reader<R: Read>(mut reader: R) -> Result<Document> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(parse_bytes(&bytes)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_parse_str_ignores_bom() {
        let doc = parse_str("\u{FEFF}<root/>").unwrap();
        assert!(doc.root_element().is_some());
    }

    #[test]
    fn test_parse_bytes_utf16_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<r>é</r>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let doc = parse_bytes(&bytes).unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.text_content(root), "é");
    }

    #[test]
    fn test_parse_bytes_declared_latin1() {
        let bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><r>\xE9</r>";
        let doc = parse_bytes(bytes).unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.text_content(root), "é");
        assert_eq!(doc.encoding.as_deref(), Some("ISO-8859-1"));
    }

    #[test]
    fn test_parse_reader() {
        let doc = parse_reader(&b"<Projects><Project/></Projects>"[..]).unwrap();
        assert_eq!(doc.node_count(), 3);
    }

    #[test]
    fn test_parse_reader_reports_parse_error() {
        let err = parse_reader(&b"<Projects>"[..]).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
