//! XPath queries issued from a cursor.
//!
//! The current node is the context node, so relative expressions resolve
//! against it. Namespaced name tests resolve through the optional
//! [`NamespaceContext`]; without one only unprefixed tests work.

use tracing::trace;

use super::XmlBuilder;
use crate::error::{QueryError, Result};
use crate::namespace::NamespaceContext;
use crate::tree::{Document, NodeId, NodeKind};
use crate::xpath::{
    self, NamespaceResolver, QueryValue, ResultKind, XPathError, XPathNode, XPathValue,
};

impl XmlBuilder {
    /// Finds the first element matching `expression` and returns a builder
    /// positioned at it.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Expression`] if the expression is malformed or
    /// uses a prefix the supplied context cannot resolve.
    /// [`QueryError::NotAnElement`] covers everything else: nothing
    /// selected, a non-element node selected first, a non-node result, and
    /// a namespaced name test issued without any context.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlbuilder::{NamespaceContext, XmlBuilder};
    ///
    /// let root = XmlBuilder::parse("<a xmlns='urn:a'><b/></a>")?;
    /// let ctx = root.namespace_context();
    /// let b = root.find_element("//:b", Some(&ctx))?;
    /// assert_eq!(b.name().as_deref(), Some("b"));
    /// assert!(root.find_element("//b", Some(&ctx)).is_err());
    /// # Ok::<(), xmlbuilder::Error>(())
    /// ```
    pub fn find_element(
        &self,
        expression: &str,
        context: Option<&NamespaceContext>,
    ) -> Result<Self> {
        let doc = self.doc.borrow();
        let not_an_element = |found: String| QueryError::NotAnElement {
            expression: expression.to_owned(),
            context: format!("<{}>", context_name(&doc, self.node)),
            found,
        };
        let value = match xpath::evaluate(&doc, self.node, expression, resolver(context)) {
            Ok(value) => value,
            Err(XPathError::UnresolvedPrefix { prefix }) if context.is_none() => {
                let found = format!("no namespace context for prefix \"{prefix}\"");
                return Err(not_an_element(found).into());
            }
            Err(source) => return Err(expression_error(expression, source).into()),
        };
        let nodes = match value {
            XPathValue::NodeSet(nodes) => nodes,
            other => {
                let found = format!("{} result {other}", other.type_name());
                return Err(not_an_element(found).into());
            }
        };
        match nodes.first() {
            Some(&XPathNode::Tree(id)) if doc.is_element(id) => {
                trace!(expression = %expression, node = id.into_raw(), "found element");
                Ok(self.at(id))
            }
            Some(&node) => Err(not_an_element(describe(&doc, node)).into()),
            None => Err(not_an_element("no matching node".to_owned()).into()),
        }
    }

    /// Evaluates `expression` against the current node and converts the
    /// result to `kind`.
    ///
    /// Empty results follow XPath conversion rules: an empty string for
    /// [`ResultKind::String`], `NaN` for [`ResultKind::Number`], `false`
    /// for [`ResultKind::Boolean`] and `None` for [`ResultKind::Node`].
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Expression`] for malformed expressions,
    /// unresolvable prefixes, and node kinds requested from a result that
    /// is not a node-set.
    pub fn query(
        &self,
        expression: &str,
        kind: ResultKind,
        context: Option<&NamespaceContext>,
    ) -> Result<QueryValue> {
        let doc = self.doc.borrow();
        xpath::evaluate_as(&doc, self.node, expression, resolver(context), kind)
            .map_err(|source| expression_error(expression, source).into())
    }

    /// Collects every namespace declared anywhere in the document into a
    /// context suitable for [`find_element`](Self::find_element) and
    /// [`query`](Self::query).
    #[must_use]
    pub fn namespace_context(&self) -> NamespaceContext {
        NamespaceContext::build(&self.doc.borrow())
    }
}

fn resolver(context: Option<&NamespaceContext>) -> Option<&dyn NamespaceResolver> {
    context.map(|ctx| ctx as &dyn NamespaceResolver)
}

fn expression_error(expression: &str, source: XPathError) -> QueryError {
    QueryError::Expression {
        expression: expression.to_owned(),
        source,
    }
}

fn context_name(doc: &Document, id: NodeId) -> String {
    doc.qualified_name(id)
        .unwrap_or_else(|| doc.node(id).kind.label().to_owned())
}

fn describe(doc: &Document, node: XPathNode) -> String {
    match node {
        XPathNode::Attribute { owner, index } => match doc.attributes(owner).get(index) {
            Some(attr) => format!("attribute {}=\"{}\"", attr.name, attr.value),
            None => "attribute".to_owned(),
        },
        XPathNode::Tree(id) => match &doc.node(id).kind {
            NodeKind::Text { content } | NodeKind::CData { content } => {
                format!("{} \"{content}\"", doc.node(id).kind.label())
            }
            other => other.label().to_owned(),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn projects() -> XmlBuilder {
        XmlBuilder::parse(
            "<Projects>\
             <java-xmlbuilder language=\"Java\" scm=\"SVN\"><Location type=\"URL\">one</Location></java-xmlbuilder>\
             <JetS3t language=\"Java\" scm=\"CVS\"><Location type=\"URL\">two</Location></JetS3t>\
             </Projects>",
        )
        .unwrap()
    }

    #[test]
    fn test_find_element_first_match() {
        let b = projects().find_element("//Location", None).unwrap();
        assert_eq!(b.text_content(), "one");
    }

    #[test]
    fn test_find_element_relative_to_cursor() {
        let jets3t = projects().find_element("//*[@scm='CVS']", None).unwrap();
        let location = jets3t.find_element("Location", None).unwrap();
        assert_eq!(location.text_content(), "two");
    }

    #[test]
    fn test_find_element_rejects_attribute() {
        let err = projects().find_element("//@language", None).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("does not resolve to an Element"), "{message}");
        assert!(message.contains("<Projects>"), "{message}");
        assert!(message.contains("language=\"Java\""), "{message}");
    }

    #[test]
    fn test_find_element_rejects_empty_and_scalar_results() {
        for expression in ["//WrongName", "count(//Location)", "//Location/text()"] {
            let err = projects().find_element(expression, None).unwrap_err();
            assert!(
                matches!(err, Error::Query(QueryError::NotAnElement { .. })),
                "{expression}: {err}"
            );
        }
    }

    #[test]
    fn test_find_element_prefix_without_context() {
        let b = projects();
        let err = b.find_element("//:Location", None).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, Error::Query(QueryError::NotAnElement { .. })));
        assert!(message.contains("does not resolve to an Element"), "{message}");
        assert!(message.contains("prefix \"\""), "{message}");

        let ctx = NamespaceContext::new();
        let err = b.find_element("//p:Location", Some(&ctx)).unwrap_err();
        assert!(matches!(err, Error::Query(QueryError::Expression { .. })));
    }

    #[test]
    fn test_find_element_syntax_error() {
        let err = projects().find_element("//[", None).unwrap_err();
        assert!(matches!(err, Error::Query(QueryError::Expression { .. })));
    }

    #[test]
    fn test_query_empty_results() {
        let b = projects();
        assert_eq!(
            b.query("//WrongName", ResultKind::String, None).unwrap(),
            QueryValue::String(String::new())
        );
        assert!(b
            .query("//WrongName", ResultKind::Number, None)
            .unwrap()
            .as_number()
            .unwrap()
            .is_nan());
        assert_eq!(
            b.query("//WrongName", ResultKind::Node, None).unwrap(),
            QueryValue::Node(None)
        );
    }

    #[test]
    fn test_query_count() {
        let b = projects();
        assert_eq!(
            b.query("count(/Projects/*)", ResultKind::Number, None)
                .unwrap()
                .as_number(),
            Some(2.0)
        );
        assert_eq!(
            b.query("count(/Projects/*)", ResultKind::String, None)
                .unwrap()
                .as_str(),
            Some("2")
        );
    }
}
