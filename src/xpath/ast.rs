//! Abstract syntax tree types for `XPath` 1.0 expressions.
//!
//! The AST follows the grammar at
//! <https://www.w3.org/TR/xpath-10/#section-Basics>. Location paths are
//! made of [`Step`]s, each with an [`Axis`], a [`NodeTest`] and zero or
//! more predicates.

use std::fmt;

/// An `XPath` 1.0 expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A numeric literal (e.g., `42`, `3.14`).
    Number(f64),

    /// A string literal (e.g., `"hello"` or `'world'`).
    String(String),

    /// A variable reference; the name excludes the leading `$`.
    Variable(String),

    /// A binary operation (e.g., `a + b`, `x = y`, `p and q`).
    BinaryOp {
        /// The operator.
        op: BinaryOp,
        /// The left-hand operand.
        left: Box<Expr>,
        /// The right-hand operand.
        right: Box<Expr>,
    },

    /// Unary negation (e.g., `-x`).
    UnaryNeg(Box<Expr>),

    /// A function call (e.g., `contains(name, 'foo')`).
    FunctionCall {
        /// The function name.
        name: String,
        /// The argument expressions.
        args: Vec<Expr>,
    },

    /// A relative location path, evaluated from the context node.
    Path {
        /// The steps, evaluated left to right.
        steps: Vec<Step>,
    },

    /// An absolute location path. Empty `steps` is the bare `/`.
    RootPath {
        /// The steps following the initial `/`.
        steps: Vec<Step>,
    },

    /// A primary expression filtered by predicates (e.g., `$nodes[1]`).
    Filter {
        /// The primary expression being filtered.
        expr: Box<Expr>,
        /// The predicate expressions.
        predicates: Vec<Expr>,
    },

    /// A filter expression continued by a relative path
    /// (e.g., `(//a | //b)/c`).
    FilterPath {
        /// The node-set producing expression.
        base: Box<Expr>,
        /// The steps applied to every node of `base`.
        steps: Vec<Step>,
    },

    /// A union of two node-sets (e.g., `a | b`).
    Union(Box<Expr>, Box<Expr>),
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Addition (`+`).
    Add,
    /// Subtraction (`-`).
    Sub,
    /// Multiplication (`*`).
    Mul,
    /// Division (`div`).
    Div,
    /// Modulo (`mod`).
    Mod,
    /// Equality (`=`).
    Eq,
    /// Inequality (`!=`).
    Neq,
    /// Less than (`<`).
    Lt,
    /// Less than or equal (`<=`).
    Lte,
    /// Greater than (`>`).
    Gt,
    /// Greater than or equal (`>=`).
    Gte,
    /// Logical and (`and`).
    And,
    /// Logical or (`or`).
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::And => "and",
            Self::Or => "or",
        })
    }
}

/// A single step in a location path, e.g. `child::p[@class='intro']`.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// The axis along which to select nodes.
    pub axis: Axis,
    /// The test applied to each candidate node.
    pub node_test: NodeTest,
    /// Predicates that further filter the selected nodes.
    pub predicates: Vec<Expr>,
}

impl Step {
    /// The `descendant-or-self::node()` step that `//` abbreviates.
    #[must_use]
    pub fn descendant_or_self() -> Self {
        Self {
            axis: Axis::DescendantOrSelf,
            node_test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

/// An `XPath` axis. `XPath` 1.0 defines 13.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Direct children.
    Child,
    /// All descendants.
    Descendant,
    /// The parent (the owner element, for an attribute).
    Parent,
    /// All ancestors up to and including the document node.
    Ancestor,
    /// Siblings after this node.
    FollowingSibling,
    /// Siblings before this node.
    PrecedingSibling,
    /// All nodes after this one in document order, descendants excluded.
    Following,
    /// All nodes before this one in document order, ancestors excluded.
    Preceding,
    /// Attributes of the context element.
    Attribute,
    /// Namespace nodes. Never materialized, so always empty.
    Namespace,
    /// The context node itself.
    Self_,
    /// The context node and its descendants.
    DescendantOrSelf,
    /// The context node and its ancestors.
    AncestorOrSelf,
}

impl Axis {
    /// Returns the axis name as it appears in `XPath` syntax.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Child => "child",
            Self::Descendant => "descendant",
            Self::Parent => "parent",
            Self::Ancestor => "ancestor",
            Self::FollowingSibling => "following-sibling",
            Self::PrecedingSibling => "preceding-sibling",
            Self::Following => "following",
            Self::Preceding => "preceding",
            Self::Attribute => "attribute",
            Self::Namespace => "namespace",
            Self::Self_ => "self",
            Self::DescendantOrSelf => "descendant-or-self",
            Self::AncestorOrSelf => "ancestor-or-self",
        }
    }

    /// Parses an axis name; `None` if it is not one of the 13.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "child" => Some(Self::Child),
            "descendant" => Some(Self::Descendant),
            "parent" => Some(Self::Parent),
            "ancestor" => Some(Self::Ancestor),
            "following-sibling" => Some(Self::FollowingSibling),
            "preceding-sibling" => Some(Self::PrecedingSibling),
            "following" => Some(Self::Following),
            "preceding" => Some(Self::Preceding),
            "attribute" => Some(Self::Attribute),
            "namespace" => Some(Self::Namespace),
            "self" => Some(Self::Self_),
            "descendant-or-self" => Some(Self::DescendantOrSelf),
            "ancestor-or-self" => Some(Self::AncestorOrSelf),
            _ => None,
        }
    }

    /// Reverse axes number their context positions backwards from the
    /// context node.
    #[must_use]
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Self::Ancestor | Self::AncestorOrSelf | Self::Preceding | Self::PrecedingSibling
        )
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node test in a location step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// A name test. A `Some("")` prefix is the `:local` form, which looks
    /// up the empty prefix in the namespace context.
    Name {
        /// The prefix, if the test was written `prefix:local` or `:local`.
        prefix: Option<String>,
        /// The local name.
        local: String,
    },

    /// The `*` wildcard.
    Wildcard,

    /// `prefix:*`, any local name in the namespace bound to the prefix.
    PrefixWildcard(String),

    /// `node()`.
    Node,

    /// `text()`. Matches text and CDATA nodes.
    Text,

    /// `comment()`.
    Comment,

    /// `processing-instruction()`, optionally restricted to one target.
    ProcessingInstruction(Option<String>),
}

impl fmt::Display for NodeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name {
                prefix: Some(prefix),
                local,
            } => write!(f, "{prefix}:{local}"),
            Self::Name { prefix: None, local } => f.write_str(local),
            Self::Wildcard => f.write_str("*"),
            Self::PrefixWildcard(prefix) => write!(f, "{prefix}:*"),
            Self::Node => f.write_str("node()"),
            Self::Text => f.write_str("text()"),
            Self::Comment => f.write_str("comment()"),
            Self::ProcessingInstruction(None) => f.write_str("processing-instruction()"),
            Self::ProcessingInstruction(Some(name)) => {
                write!(f, "processing-instruction('{name}')")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_roundtrip() {
        let axes = [
            Axis::Child,
            Axis::Descendant,
            Axis::Parent,
            Axis::Ancestor,
            Axis::FollowingSibling,
            Axis::PrecedingSibling,
            Axis::Following,
            Axis::Preceding,
            Axis::Attribute,
            Axis::Namespace,
            Axis::Self_,
            Axis::DescendantOrSelf,
            Axis::AncestorOrSelf,
        ];
        for axis in axes {
            assert_eq!(Axis::parse(axis.as_str()), Some(axis));
        }
        assert_eq!(Axis::parse("children"), None);
    }

    #[test]
    fn test_node_test_display() {
        let test = NodeTest::Name {
            prefix: Some(String::new()),
            local: "After".to_string(),
        };
        assert_eq!(test.to_string(), ":After");
        let test = NodeTest::Name {
            prefix: None,
            local: "Location".to_string(),
        };
        assert_eq!(test.to_string(), "Location");
        assert_eq!(NodeTest::PrefixWildcard("p".to_string()).to_string(), "p:*");
        assert_eq!(
            NodeTest::ProcessingInstruction(Some("test".to_string())).to_string(),
            "processing-instruction('test')"
        );
    }

    #[test]
    fn test_reverse_axes() {
        assert!(Axis::Ancestor.is_reverse());
        assert!(Axis::PrecedingSibling.is_reverse());
        assert!(!Axis::Child.is_reverse());
        assert!(!Axis::Following.is_reverse());
    }
}
