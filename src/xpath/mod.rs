//! `XPath` 1.0 query language implementation.
//!
//! Expressions are tokenized by [`lexer`], parsed into an [`ast::Expr`] by
//! [`parser`] and evaluated against a [`Document`] by [`eval`].
//!
//! # Quick Start
//!
//! ```
//! use xmlbuilder::Document;
//! use xmlbuilder::xpath::{evaluate_as, ResultKind};
//!
//! let doc = Document::parse_str("<root><a>1</a><b>2</b></root>").unwrap();
//! let root = doc.root_element().unwrap();
//! let result = evaluate_as(&doc, root, "count(*)", None, ResultKind::Number).unwrap();
//! assert_eq!(result.as_number(), Some(2.0));
//! ```
//!
//! # Known Limitations
//!
//! - The `namespace::` axis is always empty; namespace nodes are not
//!   materialized.
//! - `id()` always returns an empty node-set, as no DTD is retained.

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod types;

use std::collections::HashMap;

pub use eval::XPathContext;
pub use types::{QueryValue, ResultKind, XPathError, XPathNode, XPathValue};

use crate::tree::{Document, NodeId};

/// Maps name-test prefixes to namespace URIs during evaluation.
///
/// The empty prefix is looked up for `:local` name tests. Returning
/// `Some("")` means "no namespace".
pub trait NamespaceResolver {
    /// Returns the URI bound to `prefix`, if any.
    fn resolve_prefix(&self, prefix: &str) -> Option<&str>;
}

impl NamespaceResolver for HashMap<String, String> {
    fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        self.get(prefix).map(String::as_str)
    }
}

/// Evaluates an `XPath` 1.0 expression with `context_node` as the context.
///
/// To evaluate the same expression repeatedly, parse it once with
/// [`parser::parse`] and use [`XPathContext::evaluate`].
///
/// # Errors
///
/// Returns [`XPathError`] if the expression is malformed or evaluation fails.
pub fn evaluate(
    doc: &Document,
    context_node: NodeId,
    expression: &str,
    resolver: Option<&dyn NamespaceResolver>,
) -> Result<XPathValue, XPathError> {
    let expr = parser::parse(expression)?;
    context(doc, context_node, resolver).evaluate(&expr)
}

/// Evaluates an expression and converts the result to `kind`.
///
/// # Errors
///
/// Returns [`XPathError`] if the expression is malformed, evaluation fails,
/// or a node-set is requested for a result that is not one.
pub fn evaluate_as(
    doc: &Document,
    context_node: NodeId,
    expression: &str,
    resolver: Option<&dyn NamespaceResolver>,
    kind: ResultKind,
) -> Result<QueryValue, XPathError> {
    let expr = parser::parse(expression)?;
    context(doc, context_node, resolver).evaluate_as(&expr, kind)
}

fn context<'a>(
    doc: &'a Document,
    context_node: NodeId,
    resolver: Option<&'a dyn NamespaceResolver>,
) -> XPathContext<'a> {
    let ctx = XPathContext::new(doc, context_node);
    match resolver {
        Some(resolver) => ctx.with_resolver(resolver),
        None => ctx,
    }
}
