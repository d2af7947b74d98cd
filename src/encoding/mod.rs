//! Byte-level encodings.
//!
//! Three concerns live here:
//!
//! - base64 encoding of binary payloads stored as CDATA sections,
//! - charset detection and transcoding of parser input (BOM sniffing, then
//!   the XML declaration's `encoding=` pseudo-attribute),
//! - transcoding serialized output into the configured charset.
//!
//! Charset work is delegated to `encoding_rs`; base64 to the `base64` crate.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use encoding_rs::Encoding;

use crate::error::{Error, ParseError, Result, SourceLocation};

/// Encodes a binary payload as standard, padded base64.
#[must_use]
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes base64 text, ignoring surrounding whitespace.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `text` is not valid base64.
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text.trim())
        .map_err(|e| Error::InvalidArgument(format!("invalid base64 payload: {e}")))
}

/// Looks up an encoding by its IANA label (case-insensitive).
///
/// # Errors
///
/// Returns [`Error::Configuration`] for labels `encoding_rs` does not know.
pub fn lookup(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| Error::configuration(format!("unsupported encoding: {label}")))
}

/// Encodes serialized text into the charset named by `label`.
///
/// Characters the target charset cannot represent are written as numeric
/// character references. UTF-16 labels produce UTF-8, as `encoding_rs`
/// only decodes UTF-16.
///
/// # Errors
///
/// Returns [`Error::Configuration`] for unknown labels.
pub fn encode_output(text: &str, label: &str) -> Result<Vec<u8>> {
    let encoding = lookup(label)?;
    let (bytes, _used, _unmappable) = encoding.encode(text);
    Ok(bytes.into_owned())
}

/// Detects the encoding of an XML byte stream by inspecting the Byte Order Mark.
///
/// Returns the encoding and the number of BOM bytes to skip. Without a BOM
/// the XML default, UTF-8, is assumed.
#[must_use]
pub fn detect_encoding(bytes: &[u8]) -> (&'static Encoding, usize) {
    match Encoding::for_bom(bytes) {
        Some((encoding, skip)) => (encoding, skip),
        None => (encoding_rs::UTF_8, 0),
    }
}

fn decode_error(message: impl Into<String>) -> ParseError {
    ParseError::new(message, SourceLocation::default())
}

fn transcode(bytes: &[u8], encoding: &'static Encoding) -> Result<String, ParseError> {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(decode_error(format!(
            "malformed byte sequence for encoding {}",
            encoding.name()
        )));
    }
    Ok(text.into_owned())
}

/// Decodes raw XML bytes into a UTF-8 string.
///
/// A BOM decides first. Without one the bytes are read as UTF-8 unless the
/// XML declaration names another charset, which is then used to re-decode.
///
/// # Errors
///
/// Returns `ParseError` if the declared charset is unknown or the bytes are
/// malformed for the chosen charset.
pub fn decode_to_utf8(bytes: &[u8]) -> Result<String, ParseError> {
    let (bom_encoding, skip) = detect_encoding(bytes);
    let content = &bytes[skip..];

    if skip > 0 {
        return transcode(content, bom_encoding);
    }

    match declared_encoding(content) {
        Some(label) => {
            let encoding = Encoding::for_label(label.as_bytes())
                .ok_or_else(|| decode_error(format!("unsupported encoding '{label}'")))?;
            transcode(content, encoding)
        }
        None => std::str::from_utf8(content)
            .map(str::to_owned)
            .map_err(|e| decode_error(format!("input is not valid UTF-8: {e}"))),
    }
}

/// Reads the `encoding` pseudo-attribute of a leading XML declaration,
/// treating the bytes as ASCII.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let scan = &bytes[..bytes.len().min(200)];
    if !scan.starts_with(b"<?xml") {
        return None;
    }
    let decl_end = scan.windows(2).position(|w| w == b"?>")?;
    let decl = &scan[..decl_end];

    let needle = b"encoding";
    let pos = decl.windows(needle.len()).position(|w| w == needle)?;
    let rest = decl[pos + needle.len()..].trim_ascii_start();
    let rest = rest.strip_prefix(b"=")?.trim_ascii_start();

    let (&quote, rest) = rest.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let end = rest.iter().position(|&b| b == quote)?;
    let label = &rest[..end];
    label
        .is_ascii()
        .then(|| String::from_utf8_lossy(label).into_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_base64() {
        assert_eq!(encode_base64(b"Hello"), "SGVsbG8=");
        assert_eq!(encode_base64(b""), "");
    }

    #[test]
    fn test_decode_base64_round_trip() {
        let bytes = [0u8, 255, 16, 32];
        assert_eq!(decode_base64(&encode_base64(&bytes)).unwrap(), bytes);
        assert!(matches!(
            decode_base64("not base64!"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_detect_bom() {
        let (enc, skip) = detect_encoding(b"\xEF\xBB\xBFhello");
        assert_eq!(enc, encoding_rs::UTF_8);
        assert_eq!(skip, 3);

        let (enc, skip) = detect_encoding(b"\xFF\xFE<\x00");
        assert_eq!(enc, encoding_rs::UTF_16LE);
        assert_eq!(skip, 2);

        let (enc, skip) = detect_encoding(b"<root/>");
        assert_eq!(enc, encoding_rs::UTF_8);
        assert_eq!(skip, 0);
    }

    #[test]
    fn test_decode_utf8_with_bom() {
        assert_eq!(decode_to_utf8(b"\xEF\xBB\xBF<a/>").unwrap(), "<a/>");
    }

    #[test]
    fn test_decode_declared_latin1() {
        let xml = b"<?xml version=\"1.0\" encoding='ISO-8859-1'?><a>caf\xE9</a>";
        let text = decode_to_utf8(xml).unwrap();
        assert!(text.ends_with("<a>caf\u{e9}</a>"));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let err = decode_to_utf8(b"<a>\xFF</a>").unwrap_err();
        assert!(err.message.contains("not valid UTF-8"));
    }

    #[test]
    fn test_decode_unknown_declared_encoding() {
        let err = decode_to_utf8(b"<?xml version=\"1.0\" encoding=\"bogus\"?><a/>").unwrap_err();
        assert!(err.message.contains("bogus"));
    }

    #[test]
    fn test_encode_output_latin1() {
        assert_eq!(encode_output("caf\u{e9}", "ISO-8859-1").unwrap(), b"caf\xE9");
    }

    #[test]
    fn test_encode_output_unmappable_uses_char_refs() {
        let bytes = encode_output("\u{4e2d}", "US-ASCII").unwrap();
        assert_eq!(bytes, b"&#20013;");
    }

    #[test]
    fn test_lookup_unknown_label() {
        assert!(matches!(lookup("no-such-charset"), Err(Error::Configuration(_))));
    }
}
