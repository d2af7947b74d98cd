//! Error types for document construction, parsing, querying and output.
//!
//! Every failure surfaces synchronously at the offending call as one
//! [`Error`] variant:
//!
//! - [`Error::Parse`]: malformed markup handed to the parser.
//! - [`Error::Configuration`]: parser, serializer or evaluator setup failure
//!   (unknown output method, unsupported encoding, bad property value).
//! - [`Error::Query`]: expression syntax or evaluation failure, or a
//!   `find` whose result is not a single element.
//! - [`Error::InvalidArgument`]: a required value was absent.
//! - [`Error::InvalidState`]: a structural precondition was violated.
//!
//! Operations validate before they mutate, so an `Err` never leaves the
//! tree half-edited.

use std::fmt;

use thiserror::Error;

use crate::xpath::XPathError;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The input could not be parsed as well-formed XML.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A parser, serializer or evaluator could not be configured.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An `XPath` expression failed or did not produce the required shape.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A required argument was absent.
    #[error("{0}")]
    InvalidArgument(String),

    /// The tree is not in a state that permits the requested operation.
    #[error("{0}")]
    InvalidState(String),

    /// Writing serialized output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }
}

/// Failure of a query issued through a cursor.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    /// The expression could not be parsed or evaluated.
    #[error("XPath expression \"{expression}\" failed: {source}")]
    Expression {
        /// The expression text as supplied by the caller.
        expression: String,
        /// The underlying evaluator failure.
        #[source]
        source: XPathError,
    },

    /// The expression evaluated to nothing, or to something other than an
    /// element, where an element was required.
    #[error("XPath expression \"{expression}\" does not resolve to an Element in context {context}: {found}")]
    NotAnElement {
        /// The expression text as supplied by the caller.
        expression: String,
        /// Qualified name of the context node, in angle brackets.
        context: String,
        /// Short description of what was found instead.
        found: String,
    },
}

/// Source location within an XML document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
    /// 0-based byte offset from the start of the input.
    pub byte_offset: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The error type returned when XML parsing fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at {location}: {message}")]
pub struct ParseError {
    /// The primary error message.
    pub message: String,
    /// Where in the source the error occurred.
    pub location: SourceLocation,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}
