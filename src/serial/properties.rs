//! Serializer configuration.

use crate::encoding;
use crate::error::{Error, Result};

/// The property key some serializers use for the indentation width.
pub const XSLT_INDENT_AMOUNT: &str = "{http://xml.apache.org/xslt}indent-amount";

/// Indentation width used when indenting is switched on with
/// [`OutputProperties::indent`] and no width is given.
pub const DEFAULT_INDENT_AMOUNT: usize = 2;

/// Options controlling serialized output.
///
/// The defaults produce compact output preceded by an XML declaration for
/// version `1.0` in `UTF-8`.
///
/// # Examples
///
/// ```
/// use xmlbuilder::OutputProperties;
///
/// let props = OutputProperties::new()
///     .indent(true)
///     .indent_amount(4)
///     .omit_xml_declaration(true);
/// assert_eq!(props.effective_indent_amount(), 4);
///
/// let parsed = OutputProperties::from_pairs([
///     ("indent", "yes"),
///     ("{http://xml.apache.org/xslt}indent-amount", "4"),
///     ("omit-xml-declaration", "yes"),
/// ])
/// .unwrap();
/// assert_eq!(parsed, props);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputProperties {
    /// Place element-only content on indented lines.
    pub indent: bool,
    /// Spaces per nesting level. `None` means the default for how
    /// indenting was requested.
    pub indent_amount: Option<usize>,
    /// Leave out the `<?xml ...?>` declaration.
    pub omit_xml_declaration: bool,
    /// Output charset label, also written into the declaration.
    pub encoding: String,
    /// Version written into the declaration.
    pub version: String,
    /// Standalone flag for the declaration. `None` defers to the document.
    pub standalone: Option<bool>,
}

impl Default for OutputProperties {
    fn default() -> Self {
        Self {
            indent: false,
            indent_amount: None,
            omit_xml_declaration: false,
            encoding: "UTF-8".to_owned(),
            version: "1.0".to_owned(),
            standalone: None,
        }
    }
}

impl OutputProperties {
    /// Creates the default properties.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns indentation of element-only content on or off.
    #[must_use]
    pub fn indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the number of spaces per nesting level.
    #[must_use]
    pub fn indent_amount(mut self, amount: usize) -> Self {
        self.indent_amount = Some(amount);
        self
    }

    /// Leaves the `<?xml ...?>` declaration out of the output.
    #[must_use]
    pub fn omit_xml_declaration(mut self, omit: bool) -> Self {
        self.omit_xml_declaration = omit;
        self
    }

    /// Sets the output charset. The label is checked when output is
    /// encoded.
    #[must_use]
    pub fn encoding(mut self, label: &str) -> Self {
        label.clone_into(&mut self.encoding);
        self
    }

    /// Sets the version written in the XML declaration.
    #[must_use]
    pub fn version(mut self, version: &str) -> Self {
        version.clone_into(&mut self.version);
        self
    }

    /// Writes `standalone="yes"` or `"no"` in the declaration.
    #[must_use]
    pub fn standalone(mut self, standalone: bool) -> Self {
        self.standalone = Some(standalone);
        self
    }

    /// Spaces per level actually used when indenting.
    #[must_use]
    pub fn effective_indent_amount(&self) -> usize {
        self.indent_amount.unwrap_or(DEFAULT_INDENT_AMOUNT)
    }

    /// Builds properties from string keys and values.
    ///
    /// Recognized keys are `method`, `indent`, `indent-amount` (or
    /// [`XSLT_INDENT_AMOUNT`]), `omit-xml-declaration`, `encoding`,
    /// `version` and `standalone`. Unknown keys are ignored. Indenting
    /// switched on here without a width uses a width of 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for a method other than `xml`, a
    /// boolean that is not `yes`/`no`, a non-numeric indent width or an
    /// unknown encoding.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut props = Self::new();
        for (key, value) in pairs {
            props.set(key.as_ref(), value.as_ref())?;
        }
        if props.indent && props.indent_amount.is_none() {
            props.indent_amount = Some(0);
        }
        Ok(props)
    }

    /// Applies one string-keyed property.
    ///
    /// # Errors
    ///
    /// See [`from_pairs`](Self::from_pairs).
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "method" => {
                if value != "xml" {
                    return Err(Error::configuration(format!(
                        "unsupported output method '{value}'"
                    )));
                }
            }
            "indent" => self.indent = parse_yes_no(key, value)?,
            "indent-amount" | XSLT_INDENT_AMOUNT => {
                let amount = value.trim().parse().map_err(|_| {
                    Error::configuration(format!("invalid value '{value}' for {key}"))
                })?;
                self.indent_amount = Some(amount);
            }
            "omit-xml-declaration" => self.omit_xml_declaration = parse_yes_no(key, value)?,
            "encoding" => {
                encoding::lookup(value)?;
                value.clone_into(&mut self.encoding);
            }
            "version" => value.clone_into(&mut self.version),
            "standalone" => self.standalone = Some(parse_yes_no(key, value)?),
            _ => {}
        }
        Ok(())
    }
}

fn parse_yes_no(key: &str, value: &str) -> Result<bool> {
    match value {
        "yes" => Ok(true),
        "no" => Ok(false),
        _ => Err(Error::configuration(format!(
            "invalid value '{value}' for {key}, expected 'yes' or 'no'"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let props = OutputProperties::default();
        assert!(!props.indent);
        assert!(!props.omit_xml_declaration);
        assert_eq!(props.encoding, "UTF-8");
        assert_eq!(props.version, "1.0");
        assert_eq!(props.standalone, None);
        assert_eq!(props.effective_indent_amount(), DEFAULT_INDENT_AMOUNT);
    }

    #[test]
    fn test_indent_from_pairs_defaults_to_zero_width() {
        let props = OutputProperties::from_pairs([("indent", "yes")]).unwrap();
        assert!(props.indent);
        assert_eq!(props.effective_indent_amount(), 0);
    }

    #[rstest]
    #[case("indent-amount")]
    #[case(XSLT_INDENT_AMOUNT)]
    fn test_indent_amount_keys(#[case] key: &str) {
        let props = OutputProperties::from_pairs([("indent", "yes"), (key, "3")]).unwrap();
        assert_eq!(props.indent_amount, Some(3));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let props = OutputProperties::from_pairs([("media-type", "text/xml")]).unwrap();
        assert_eq!(props, OutputProperties::default());
    }

    #[test]
    fn test_encoding_and_standalone() {
        let props = OutputProperties::from_pairs([
            ("method", "xml"),
            ("encoding", "ISO-8859-1"),
            ("standalone", "no"),
            ("version", "1.1"),
        ])
        .unwrap();
        assert_eq!(props.encoding, "ISO-8859-1");
        assert_eq!(props.standalone, Some(false));
        assert_eq!(props.version, "1.1");
    }

    #[rstest]
    #[case("method", "html")]
    #[case("indent", "true")]
    #[case("omit-xml-declaration", "1")]
    #[case("indent-amount", "wide")]
    #[case("encoding", "no-such-charset")]
    #[case("standalone", "maybe")]
    fn test_invalid_values(#[case] key: &str, #[case] value: &str) {
        let err = OutputProperties::from_pairs([(key, value)]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "{key}={value}: {err}");
    }
}
