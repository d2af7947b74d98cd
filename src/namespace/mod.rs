//! Prefix to namespace URI mappings for namespace-aware queries.
//!
//! A [`NamespaceContext`] is usually built from a document's own
//! declarations and then extended with aliases, so that queries can name
//! default-namespace elements (`:local`) or use prefixes of their own
//! choosing.

use std::collections::HashMap;

use tracing::debug;

use crate::tree::Document;
use crate::xpath::NamespaceResolver;

/// A mutable prefix to URI mapping. The empty prefix is the default
/// namespace.
///
/// # Examples
///
/// ```
/// use xmlbuilder::{Document, NamespaceContext};
///
/// let doc = Document::parse_str(r#"<a xmlns="urn:default" xmlns:p="urn:p"/>"#).unwrap();
/// let mut ctx = NamespaceContext::build(&doc);
/// assert_eq!(ctx.namespace_uri(""), Some("urn:default"));
/// ctx.add_namespace("alias", "urn:p");
/// assert_eq!(ctx.namespace_uri("alias"), Some("urn:p"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceContext {
    bindings: HashMap<String, String>,
}

impl NamespaceContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects every namespace declaration in `doc`, in document order.
    /// A later declaration of the same prefix replaces an earlier one.
    #[must_use]
    pub fn build(doc: &Document) -> Self {
        let mut ctx = Self::new();
        for id in doc.descendants(doc.root()) {
            for decl in doc.namespace_decls(id) {
                ctx.bindings.insert(decl.prefix.clone(), decl.uri.clone());
            }
        }
        debug!(bindings = ctx.bindings.len(), "built namespace context");
        ctx
    }

    /// Binds `prefix` to `uri`, replacing any existing binding. Nothing is
    /// checked against a document.
    pub fn add_namespace(&mut self, prefix: &str, uri: &str) -> &mut Self {
        self.bindings.insert(prefix.to_owned(), uri.to_owned());
        self
    }

    /// Removes the binding for `prefix`, returning its URI.
    pub fn remove_namespace(&mut self, prefix: &str) -> Option<String> {
        self.bindings.remove(prefix)
    }

    /// Returns the URI bound to `prefix`.
    #[must_use]
    pub fn namespace_uri(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    /// Returns every prefix bound to `uri`, sorted.
    #[must_use]
    pub fn prefixes(&self, uri: &str) -> Vec<&str> {
        let mut prefixes: Vec<&str> = self
            .bindings
            .iter()
            .filter(|(_, bound)| *bound == uri)
            .map(|(prefix, _)| prefix.as_str())
            .collect();
        prefixes.sort_unstable();
        prefixes
    }

    /// Iterates over `(prefix, uri)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl NamespaceResolver for NamespaceContext {
    fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        self.namespace_uri(prefix)
    }
}

impl<P: Into<String>, U: Into<String>> FromIterator<(P, U)> for NamespaceContext {
    fn from_iter<I: IntoIterator<Item = (P, U)>>(iter: I) -> Self {
        Self {
            bindings: iter
                .into_iter()
                .map(|(prefix, uri)| (prefix.into(), uri.into()))
                .collect(),
        }
    }
}
