//! Low-level input handling for the XML parser.
//!
//! [`ParserInput`] wraps the raw byte stream, tracks the position (line,
//! column, byte offset) and provides the parsing primitives the grammar
//! is built from: peeking, advancing, name parsing and reference
//! resolution.
//!
//! # Security
//!
//! - **Depth limit**: deeply nested elements fail instead of overflowing
//!   the stack.
//! - **Reference limit**: caps the number of references per document.
//! - **Name length limit**: rejects huge names before allocating them.
//!
//! No external entity is ever loaded.

use crate::error::{ParseError, SourceLocation};
use crate::tree::XML_NAMESPACE;
use crate::util::qname::{is_name_char, is_name_start_char};

/// Default maximum element nesting depth.
pub(crate) const DEFAULT_MAX_DEPTH: u32 = 256;

/// Default maximum length (in bytes) of an element or attribute name.
pub(crate) const DEFAULT_MAX_NAME_LENGTH: usize = 50_000;

/// Default maximum number of references per document.
pub(crate) const DEFAULT_MAX_REFERENCES: u32 = 1_000_000;

/// Returns `true` if `c` is a valid `Char` per XML 1.0 §2.2 `[2]`.
pub(crate) fn is_xml_char(c: char) -> bool {
    matches!(c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x0001_0000..=0x0010_FFFF
    )
}

/// What a `&...;` reference stood for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reference {
    /// A built-in entity or character reference, already expanded.
    Text(String),
    /// Any other entity. Nothing declares it, so it is kept by name.
    Entity(String),
}

pub(crate) struct ParserInput<'a> {
    input: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    depth: u32,
    max_depth: u32,
    max_name_length: usize,
    references: u32,
    max_references: u32,
}

impl<'a> ParserInput<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            references: 0,
            max_references: DEFAULT_MAX_REFERENCES,
        }
    }

    #[cfg(test)]
    pub fn set_max_depth(&mut self, max: u32) {
        self.max_depth = max;
    }

    #[cfg(test)]
    pub fn set_max_name_length(&mut self, max: usize) {
        self.max_name_length = max;
    }

    // -- Depth tracking --

    /// Increments the nesting depth. Returns an error if the limit is exceeded.
    pub fn increment_depth(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(self.fatal(format!(
                "maximum nesting depth exceeded ({})",
                self.max_depth
            )));
        }
        Ok(())
    }

    pub fn decrement_depth(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // -- Position queries --

    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            byte_offset: self.pos,
        }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    // -- Peek operations --

    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    /// Returns the character at the current position without consuming it.
    pub fn peek_char(&self) -> Option<char> {
        let remaining = self.input.get(self.pos..)?;
        let len = utf8_len(*remaining.first()?).min(remaining.len());
        std::str::from_utf8(&remaining[..len])
            .ok()
            .and_then(|s| s.chars().next())
    }

    // -- Advance operations --

    /// Advances the position by `count` bytes, updating line/column.
    pub fn advance(&mut self, count: usize) {
        for _ in 0..count {
            if let Some(&b) = self.input.get(self.pos) {
                if b == b'\n' {
                    self.line += 1;
                    self.column = 1;
                } else if b & 0xC0 != 0x80 {
                    self.column += 1;
                }
                self.pos += 1;
            }
        }
    }

    /// Advances by one UTF-8 character, updating line/column.
    pub fn advance_char(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += ch.len_utf8();
    }

    pub fn next_byte(&mut self) -> Result<u8, ParseError> {
        let b = self
            .peek()
            .ok_or_else(|| self.fatal("unexpected end of input"))?;
        self.advance(1);
        Ok(b)
    }

    /// Consumes and returns the next character with `\r\n` normalization
    /// (XML 1.0 §2.11) and character validation (XML 1.0 §2.2).
    pub fn next_char(&mut self) -> Result<char, ParseError> {
        let ch = self
            .peek_char()
            .ok_or_else(|| self.fatal("unexpected end of input"))?;
        self.advance_char(ch);
        if ch == '\r' {
            if self.peek() == Some(b'\n') {
                self.advance(1);
            }
            return Ok('\n');
        }
        if !is_xml_char(ch) {
            return Err(self.fatal(format!("invalid XML character: U+{:04X}", ch as u32)));
        }
        Ok(ch)
    }

    // -- Expect operations --

    pub fn expect_byte(&mut self, expected: u8) -> Result<(), ParseError> {
        let b = self.next_byte()?;
        if b != expected {
            return Err(self.fatal(format!(
                "expected '{}', found '{}'",
                expected as char, b as char
            )));
        }
        Ok(())
    }

    pub fn expect_str(&mut self, expected: &[u8]) -> Result<(), ParseError> {
        for &b in expected {
            self.expect_byte(b)?;
        }
        Ok(())
    }

    pub fn looking_at(&self, s: &[u8]) -> bool {
        self.input
            .get(self.pos..)
            .is_some_and(|rest| rest.starts_with(s))
    }

    // -- Whitespace --

    /// Skips whitespace characters. Returns `true` if any were consumed.
    pub fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while let Some(b' ' | b'\t' | b'\r' | b'\n') = self.peek() {
            self.advance(1);
        }
        self.pos > start
    }

    pub fn skip_whitespace_required(&mut self) -> Result<(), ParseError> {
        if !self.skip_whitespace() {
            return Err(self.fatal("whitespace required"));
        }
        Ok(())
    }

    /// Consumes ASCII bytes while `pred` holds and returns them.
    pub fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii() && pred(b) {
                self.advance(1);
            } else {
                break;
            }
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    // -- Name parsing (XML 1.0 §2.3) --

    /// Parses an XML `Name`, colons included. `QName` structure is checked
    /// by the caller.
    pub fn parse_name(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let first = self
            .peek_char()
            .ok_or_else(|| self.fatal("expected name, found end of input"))?;
        if !(first == ':' || is_name_start_char(first)) {
            return Err(self.fatal(format!("invalid name start character: '{first}'")));
        }
        self.advance_char(first);

        while let Some(ch) = self.peek_char() {
            if ch == ':' || is_name_char(ch) {
                self.advance_char(ch);
            } else {
                break;
            }
        }

        let len = self.pos - start;
        if len > self.max_name_length {
            return Err(self.fatal(format!(
                "name length ({len}) exceeds maximum ({})",
                self.max_name_length
            )));
        }

        std::str::from_utf8(&self.input[start..self.pos])
            .map(str::to_owned)
            .map_err(|_| self.fatal("invalid UTF-8 in name"))
    }

    // -- Reference parsing (XML 1.0 §4.1) --

    /// Parses an entity or character reference (`&...;`).
    ///
    /// The five built-in entities and character references expand to
    /// text; any other entity name is handed back unexpanded.
    pub fn parse_reference(&mut self) -> Result<Reference, ParseError> {
        self.references += 1;
        if self.references > self.max_references {
            return Err(self.fatal(format!(
                "reference limit exceeded ({})",
                self.max_references
            )));
        }

        self.expect_byte(b'&')?;

        if self.peek() == Some(b'#') {
            self.advance(1);
            let value = if self.peek() == Some(b'x') {
                self.advance(1);
                let hex = self.take_while(|b| b.is_ascii_hexdigit());
                if hex.is_empty() {
                    return Err(self.fatal("empty hex character reference"));
                }
                u32::from_str_radix(&hex, 16)
                    .map_err(|_| self.fatal("invalid hex character reference"))?
            } else {
                let dec = self.take_while(|b| b.is_ascii_digit());
                if dec.is_empty() {
                    return Err(self.fatal("empty decimal character reference"));
                }
                dec.parse::<u32>()
                    .map_err(|_| self.fatal("invalid decimal character reference"))?
            };
            self.expect_byte(b';')?;

            let ch = char::from_u32(value)
                .filter(|&c| is_xml_char(c))
                .ok_or_else(|| {
                    self.fatal(format!(
                        "character reference &#x{value:X}; does not refer to a valid XML character"
                    ))
                })?;
            return Ok(Reference::Text(ch.to_string()));
        }

        let name = self.parse_name()?;
        self.expect_byte(b';')?;
        let expanded = match name.as_str() {
            "amp" => "&",
            "lt" => "<",
            "gt" => ">",
            "apos" => "'",
            "quot" => "\"",
            _ => return Ok(Reference::Entity(name)),
        };
        Ok(Reference::Text(expanded.to_owned()))
    }

    // -- Attribute value parsing (XML 1.0 §3.3.3) --

    /// Parses a quoted attribute value, resolving references and
    /// normalizing whitespace characters to spaces.
    pub fn parse_attribute_value(&mut self) -> Result<String, ParseError> {
        let quote = self.next_byte()?;
        if quote != b'"' && quote != b'\'' {
            return Err(self.fatal("attribute value must be quoted"));
        }

        let mut value = String::new();
        loop {
            let b = self
                .peek()
                .ok_or_else(|| self.fatal("unexpected end of input in attribute value"))?;
            if b == quote {
                self.advance(1);
                break;
            }
            match b {
                b'&' => match self.parse_reference()? {
                    Reference::Text(text) => value.push_str(&text),
                    Reference::Entity(name) => {
                        return Err(self.fatal(format!(
                            "undeclared entity '&{name};' in attribute value"
                        )));
                    }
                },
                b'<' => return Err(self.fatal("'<' not allowed in attribute values")),
                _ => match self.next_char()? {
                    '\n' | '\t' => value.push(' '),
                    ch => value.push(ch),
                },
            }
        }

        Ok(value)
    }

    /// Parses a quoted value without reference resolution.
    pub fn parse_quoted_value(&mut self) -> Result<String, ParseError> {
        let quote = self.next_byte()?;
        if quote != b'"' && quote != b'\'' {
            return Err(self.fatal("expected quoted value"));
        }
        let start = self.pos;
        while !self.at_end() && self.peek() != Some(quote) {
            self.advance(1);
        }
        let value = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.fatal("invalid UTF-8 in quoted value"))?
            .to_owned();
        self.expect_byte(quote)?;
        Ok(value)
    }

    /// Creates a fatal `ParseError` at the current location.
    pub fn fatal(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.location())
    }
}

fn utf8_len(first: u8) -> usize {
    match first {
        0xF0..=0xFF => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}

// -------------------------------------------------------------------------
// Namespace scopes
// -------------------------------------------------------------------------

/// Namespace bindings in scope while parsing.
///
/// One frame per open element; resolution walks the frames from the
/// innermost outwards.
pub(crate) struct NamespaceScopes {
    stack: Vec<Vec<(String, String)>>,
}

impl NamespaceScopes {
    /// Creates the scope stack with the `xml` prefix pre-bound.
    pub fn new() -> Self {
        Self {
            stack: vec![vec![("xml".to_owned(), XML_NAMESPACE.to_owned())]],
        }
    }

    pub fn push_scope(&mut self) {
        self.stack.push(Vec::new());
    }

    pub fn pop_scope(&mut self) {
        self.stack.pop();
    }

    /// Binds `prefix` in the innermost scope. `""` is the default namespace.
    pub fn bind(&mut self, prefix: &str, uri: &str) {
        if let Some(frame) = self.stack.last_mut() {
            frame.push((prefix.to_owned(), uri.to_owned()));
        }
    }

    /// Resolves a prefix, `""` for the default namespace. A binding to the
    /// empty URI (`xmlns=""`) undeclares and resolves to `None`.
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.stack
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(bound, _)| bound == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }
}

// -------------------------------------------------------------------------
// Markup helpers
// -------------------------------------------------------------------------

/// Parses a comment (`<!-- ... -->`), returning its text.
///
/// See XML 1.0 §2.5 production `[15]`.
pub(crate) fn parse_comment_content(input: &mut ParserInput<'_>) -> Result<String, ParseError> {
    input.expect_str(b"<!--")?;
    let mut content = String::new();

    loop {
        if input.at_end() {
            return Err(input.fatal("unexpected end of input in comment"));
        }
        if input.looking_at(b"-->") {
            input.advance(3);
            break;
        }
        if input.looking_at(b"--") {
            return Err(input.fatal("'--' not allowed inside comments"));
        }
        content.push(input.next_char()?);
    }

    Ok(content)
}

/// Parses a CDATA section (`<![CDATA[ ... ]]>`), returning its text.
///
/// See XML 1.0 §2.7 production `[18]`.
pub(crate) fn parse_cdata_content(input: &mut ParserInput<'_>) -> Result<String, ParseError> {
    input.expect_str(b"<![CDATA[")?;
    let mut content = String::new();

    loop {
        if input.at_end() {
            return Err(input.fatal("unexpected end of input in CDATA section"));
        }
        if input.looking_at(b"]]>") {
            input.advance(3);
            break;
        }
        content.push(input.next_char()?);
    }

    Ok(content)
}

/// Parses a processing instruction (`<?target data?>`), returning
/// `(target, optional_data)`.
///
/// See XML 1.0 §2.6 production `[16]`.
pub(crate) fn parse_pi_content(
    input: &mut ParserInput<'_>,
) -> Result<(String, Option<String>), ParseError> {
    input.expect_str(b"<?")?;
    let target = input.parse_name()?;

    if target.eq_ignore_ascii_case("xml") {
        return Err(input.fatal("PI target 'xml' is reserved"));
    }
    if target.contains(':') {
        return Err(input.fatal("PI target must not contain a colon"));
    }

    if !input.skip_whitespace() {
        input.expect_str(b"?>")?;
        return Ok((target, None));
    }

    let mut data = String::new();
    loop {
        if input.at_end() {
            return Err(input.fatal("unexpected end of input in processing instruction"));
        }
        if input.looking_at(b"?>") {
            input.advance(2);
            break;
        }
        data.push(input.next_char()?);
    }

    Ok((target, Some(data).filter(|d| !d.is_empty())))
}

/// Parsed XML declaration data.
#[derive(Debug, Clone)]
pub(crate) struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<bool>,
}

/// Parses an XML declaration (`<?xml version="1.0" ...?>`).
///
/// See XML 1.0 §2.8 production `[23]`.
pub(crate) fn parse_xml_decl(input: &mut ParserInput<'_>) -> Result<XmlDeclaration, ParseError> {
    input.expect_str(b"<?xml")?;
    input.skip_whitespace_required()?;

    input.expect_str(b"version")?;
    let version = parse_pseudo_attribute_value(input)?;
    if !is_valid_version_num(&version) {
        return Err(input.fatal(format!("invalid version number: '{version}'")));
    }

    let had_ws = input.skip_whitespace();
    let encoding = if input.looking_at(b"encoding") {
        if !had_ws {
            return Err(input.fatal("whitespace required before encoding"));
        }
        input.expect_str(b"encoding")?;
        let enc = parse_pseudo_attribute_value(input)?;
        if !is_valid_encoding_name(&enc) {
            return Err(input.fatal(format!("invalid encoding name: '{enc}'")));
        }
        Some(enc)
    } else {
        None
    };

    // Without an encoding, the whitespace consumed above already separates
    // version from standalone.
    let had_ws2 = input.skip_whitespace() || (encoding.is_none() && had_ws);
    let standalone = if input.looking_at(b"standalone") {
        if !had_ws2 {
            return Err(input.fatal("whitespace required before standalone"));
        }
        input.expect_str(b"standalone")?;
        match parse_pseudo_attribute_value(input)?.as_str() {
            "yes" => Some(true),
            "no" => Some(false),
            _ => return Err(input.fatal("standalone must be 'yes' or 'no'")),
        }
    } else {
        None
    };

    input.skip_whitespace();
    input.expect_str(b"?>")?;

    Ok(XmlDeclaration {
        version,
        encoding,
        standalone,
    })
}

fn parse_pseudo_attribute_value(input: &mut ParserInput<'_>) -> Result<String, ParseError> {
    input.skip_whitespace();
    input.expect_byte(b'=')?;
    input.skip_whitespace();
    input.parse_quoted_value()
}

/// `VersionNum ::= '1.' [0-9]+`
fn is_valid_version_num(s: &str) -> bool {
    s.strip_prefix("1.")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

/// `EncName ::= [A-Za-z] ([A-Za-z0-9._] | '-')*`
fn is_valid_encoding_name(s: &str) -> bool {
    let mut bytes = s.bytes();
    bytes.next().is_some_and(|b| b.is_ascii_alphabetic())
        && bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}
