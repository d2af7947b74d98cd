//! `QName` (qualified name) handling.
//!
//! A `QName` is a name of the form `prefix:localname` or just `localname`.
//! Elements created through the builder keep their prefix verbatim, so the
//! split here never consults a namespace scope.
//!
//! See <https://www.w3.org/TR/xml-names/#NT-QName>

use std::fmt;

/// Splits a `QName` into its prefix and local name parts.
///
/// Returns `(Some(prefix), localname)` if the name contains a colon,
/// or `(None, localname)` if it does not. Only the first colon splits.
#[must_use]
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.find(':') {
        Some(pos) => (Some(&qname[..pos]), &qname[pos + 1..]),
        None => (None, qname),
    }
}

/// A borrowed qualified name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QName<'a> {
    /// The prefix, if the name had one.
    pub prefix: Option<&'a str>,
    /// The local part.
    pub local: &'a str,
}

impl<'a> QName<'a> {
    /// Splits `qname` on its first colon.
    #[must_use]
    pub fn parse(qname: &'a str) -> Self {
        let (prefix, local) = split_qname(qname);
        Self { prefix, local }
    }

    /// Checks that both parts are well-formed XML names.
    ///
    /// An empty prefix (`:local`) is rejected, as is a missing local part.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.prefix.map_or(true, is_ncname) && is_ncname(self.local)
    }
}

impl fmt::Display for QName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => f.write_str(self.local),
        }
    }
}

/// Joins an optional prefix and a local name into `prefix:local` form.
#[must_use]
pub fn qualified_name(prefix: Option<&str>, local: &str) -> String {
    QName { prefix, local }.to_string()
}

/// Returns `true` if `c` may start an XML name (colon excluded).
#[must_use]
pub fn is_name_start_char(c: char) -> bool {
    matches!(c,
        'A'..='Z' | 'a'..='z' | '_'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}' | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}'
    )
}

/// Returns `true` if `c` may appear after the first character of a name.
#[must_use]
pub fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}'
            | '\u{0300}'..='\u{036F}' | '\u{203F}'..='\u{2040}'
        )
}

/// Returns `true` for the four XML whitespace characters (`S` production).
#[must_use]
pub fn is_xml_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Returns `true` if `s` holds XML whitespace and nothing else. Other
/// Unicode spaces such as U+00A0 count as content.
#[must_use]
pub fn is_whitespace_only(s: &str) -> bool {
    s.chars().all(is_xml_whitespace)
}

/// Returns `true` if `s` is a non-colonized XML name.
#[must_use]
pub fn is_ncname(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(is_name_start_char) && chars.all(is_name_char)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_only_is_xml_whitespace() {
        assert!(is_whitespace_only(" \t\r\n"));
        assert!(is_whitespace_only(""));
        assert!(!is_whitespace_only("\u{a0}"));
        assert!(!is_whitespace_only(" \u{2003} "));
    }

    #[test]
    fn test_split_qname_with_prefix() {
        assert_eq!(split_qname("xml:lang"), (Some("xml"), "lang"));
    }

    #[test]
    fn test_split_qname_without_prefix() {
        assert_eq!(split_qname("div"), (None, "div"));
    }

    #[test]
    fn test_split_qname_colon_at_start() {
        assert_eq!(split_qname(":local"), (Some(""), "local"));
    }

    #[test]
    fn test_split_qname_multiple_colons() {
        assert_eq!(split_qname("a:b:c"), (Some("a"), "b:c"));
    }

    #[test]
    fn test_qname_display_round_trips() {
        assert_eq!(QName::parse("custom:Inserted").to_string(), "custom:Inserted");
        assert_eq!(qualified_name(None, "Root"), "Root");
        assert_eq!(qualified_name(Some("p"), "Root"), "p:Root");
    }

    #[test]
    fn test_qname_validity() {
        assert!(QName::parse("java-xmlbuilder").is_valid());
        assert!(QName::parse("undefined-prefix:Elem").is_valid());
        assert!(!QName::parse("").is_valid());
        assert!(!QName::parse("1abc").is_valid());
        assert!(!QName::parse(":local").is_valid());
        assert!(!QName::parse("a b").is_valid());
    }
}
