//! `XPath` 1.0 value type system.
//!
//! The four core data types (boolean, number, string, node-set), the node
//! handle used inside node-sets, the result shapes a caller may request,
//! and the evaluator's error type.

use std::fmt;

use thiserror::Error;

use crate::tree::NodeId;

// ---------------------------------------------------------------------------
// XPathNode
// ---------------------------------------------------------------------------

/// A member of a node-set.
///
/// Attributes are not arena nodes, so they are addressed through their
/// owning element and their position in its attribute list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XPathNode {
    /// A node stored in the document arena.
    Tree(NodeId),
    /// The `index`-th attribute of the element `owner`.
    Attribute {
        /// The element carrying the attribute.
        owner: NodeId,
        /// Position in the owner's attribute list.
        index: usize,
    },
}

impl XPathNode {
    /// Returns the arena node if this is not an attribute.
    #[must_use]
    pub fn as_tree(self) -> Option<NodeId> {
        match self {
            Self::Tree(id) => Some(id),
            Self::Attribute { .. } => None,
        }
    }

    /// Returns `true` for attribute nodes.
    #[must_use]
    pub fn is_attribute(self) -> bool {
        matches!(self, Self::Attribute { .. })
    }
}

impl From<NodeId> for XPathNode {
    fn from(id: NodeId) -> Self {
        Self::Tree(id)
    }
}

// ---------------------------------------------------------------------------
// XPathValue
// ---------------------------------------------------------------------------

/// An `XPath` 1.0 value.
///
/// See <https://www.w3.org/TR/xpath-10/#section-Data-Model>.
#[derive(Debug, Clone)]
pub enum XPathValue {
    /// A boolean value.
    Boolean(bool),

    /// An IEEE 754 double, NaN and signed infinities included.
    Number(f64),

    /// A string.
    String(String),

    /// Nodes in document order, without duplicates.
    NodeSet(Vec<XPathNode>),
}

impl XPathValue {
    /// Converts this value to a boolean per `XPath` 1.0 section 4.3.
    #[must_use]
    pub fn to_boolean(&self) -> bool {
        match self {
            Self::Boolean(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::NodeSet(nodes) => !nodes.is_empty(),
        }
    }

    /// Returns a human-readable name for the type of this value.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::NodeSet(_) => "node-set",
        }
    }

    /// Returns the inner node-set, if this is one.
    #[must_use]
    pub fn as_node_set(&self) -> Option<&[XPathNode]> {
        match self {
            Self::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }
}

impl fmt::Display for XPathValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => f.write_str(&format_xpath_number(*n)),
            Self::String(s) => f.write_str(s),
            Self::NodeSet(nodes) => write!(f, "<node-set of {} nodes>", nodes.len()),
        }
    }
}

// ---------------------------------------------------------------------------
// Requested result shapes
// ---------------------------------------------------------------------------

/// The shape a caller asks an expression's result to be converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
    /// `string()` conversion; an empty node-set gives `""`.
    String,
    /// `number()` conversion; an empty node-set gives NaN.
    Number,
    /// `boolean()` conversion.
    Boolean,
    /// The node-set itself.
    NodeSet,
    /// The first node of the node-set, if any.
    Node,
}

/// A result converted to a requested [`ResultKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// A string result.
    String(String),
    /// A number result.
    Number(f64),
    /// A boolean result.
    Boolean(bool),
    /// A node-set in document order.
    NodeSet(Vec<XPathNode>),
    /// A single node; `None` when nothing matched.
    Node(Option<XPathNode>),
}

impl QueryValue {
    /// Returns the string payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number payload.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean payload.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the node-set payload.
    #[must_use]
    pub fn as_node_set(&self) -> Option<&[XPathNode]> {
        match self {
            Self::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    /// Returns the single-node payload. The outer `Option` is `None` when
    /// this is not a `Node` result.
    #[must_use]
    pub fn as_node(&self) -> Option<Option<XPathNode>> {
        match self {
            Self::Node(node) => Some(*node),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Number formatting and parsing
// ---------------------------------------------------------------------------

/// Formats an `f64` per the `XPath` number-to-string rules.
///
/// NaN is `"NaN"`, infinities are `"Infinity"`/`"-Infinity"`, negative
/// zero is `"0"` and integral values have no decimal point.
#[must_use]
pub fn format_xpath_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n.is_infinite() {
        return if n.is_sign_positive() {
            "Infinity".to_owned()
        } else {
            "-Infinity".to_owned()
        };
    }
    if n == 0.0 {
        return "0".to_owned();
    }
    #[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
    if n.fract() == 0.0 && n.abs() < 1e18 {
        return format!("{}", n as i64);
    }
    format!("{n}")
}

/// Parses a string into an `XPath` number. Surrounding whitespace is
/// ignored; anything unparseable is NaN.
#[must_use]
pub fn parse_xpath_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty()
        || !trimmed
            .bytes()
            .all(|b| b.is_ascii_digit() || b == b'.' || b == b'-')
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

// ---------------------------------------------------------------------------
// XPathError
// ---------------------------------------------------------------------------

/// An error raised while parsing or evaluating an `XPath` expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XPathError {
    /// The expression text is not valid `XPath` 1.0.
    #[error("invalid XPath expression at position {position}: {message}")]
    Syntax {
        /// What went wrong.
        message: String,
        /// Byte offset (lexer) or token index (parser) of the failure.
        position: usize,
    },

    /// An operand had the wrong type, e.g. `count('a')`.
    #[error("type error: expected {expected}, found {found}")]
    TypeError {
        /// The type that was expected.
        expected: String,
        /// The type that was actually found.
        found: String,
    },

    /// A `$name` reference with no binding.
    #[error("undefined variable: ${name}")]
    UndefinedVariable {
        /// The variable name without `$`.
        name: String,
    },

    /// A call to a function outside the core library.
    #[error("undefined function: {name}()")]
    UndefinedFunction {
        /// The function name.
        name: String,
    },

    /// A core function called with the wrong number of arguments.
    #[error("invalid argument count for {function}(): expected {expected}, found {found}")]
    InvalidArgCount {
        /// The function name.
        function: String,
        /// The number of arguments expected.
        expected: usize,
        /// The number of arguments supplied.
        found: usize,
    },

    /// A name test used a prefix (possibly the empty one, as in `:name`)
    /// that no namespace context binds.
    #[error("namespace prefix \"{prefix}\" is not bound in the namespace context")]
    UnresolvedPrefix {
        /// The unbound prefix.
        prefix: String,
    },
}

impl XPathError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
            position,
        }
    }

    pub(crate) fn type_error(expected: &str, found: &XPathValue) -> Self {
        Self::TypeError {
            expected: expected.to_owned(),
            found: found.type_name().to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_boolean() {
        assert!(XPathValue::Boolean(true).to_boolean());
        assert!(!XPathValue::Number(0.0).to_boolean());
        assert!(!XPathValue::Number(f64::NAN).to_boolean());
        assert!(XPathValue::Number(-1.5).to_boolean());
        assert!(!XPathValue::String(String::new()).to_boolean());
        assert!(XPathValue::String("false".to_owned()).to_boolean());
        assert!(!XPathValue::NodeSet(Vec::new()).to_boolean());
    }

    #[test]
    fn test_format_xpath_number() {
        assert_eq!(format_xpath_number(2.0), "2");
        assert_eq!(format_xpath_number(-0.0), "0");
        assert_eq!(format_xpath_number(1.5), "1.5");
        assert_eq!(format_xpath_number(f64::NAN), "NaN");
        assert_eq!(format_xpath_number(f64::INFINITY), "Infinity");
        assert_eq!(format_xpath_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_parse_xpath_number() {
        assert!((parse_xpath_number(" 42 ") - 42.0).abs() < f64::EPSILON);
        assert!((parse_xpath_number("-.5") + 0.5).abs() < f64::EPSILON);
        assert!(parse_xpath_number("").is_nan());
        assert!(parse_xpath_number("1e3").is_nan());
        assert!(parse_xpath_number("inf").is_nan());
        assert!(parse_xpath_number("abc").is_nan());
    }

    #[test]
    fn test_query_value_accessors() {
        assert_eq!(QueryValue::String("2".to_owned()).as_str(), Some("2"));
        assert_eq!(QueryValue::Node(None).as_node(), Some(None));
        assert_eq!(QueryValue::Boolean(true).as_number(), None);
    }

    #[test]
    fn test_xpath_error_display() {
        let err = XPathError::UnresolvedPrefix {
            prefix: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "namespace prefix \"\" is not bound in the namespace context"
        );
        let err = XPathError::syntax(3, "unexpected character '#'");
        assert_eq!(
            err.to_string(),
            "invalid XPath expression at position 3: unexpected character '#'"
        );
    }
}
