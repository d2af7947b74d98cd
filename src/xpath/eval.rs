//! `XPath` 1.0 expression evaluator.
//!
//! Walks an [`Expr`] AST (produced by [`super::parser::parse`]) against a
//! [`Document`], producing an [`XPathValue`].
//!
//! # Evaluation Context
//!
//! Per `XPath` 1.0 section 1, an expression is evaluated with a context
//! node, a context position and size, variable bindings, a function
//! library and a set of namespace declarations. [`XPathContext`] holds the
//! static parts; the node, position and size travel with each call.
//!
//! # Namespaces
//!
//! Prefixed name tests, including the empty-prefix `:local` form, are
//! resolved through the [`NamespaceResolver`] given to
//! [`XPathContext::with_resolver`]. Unprefixed name tests match only nodes
//! in no namespace.
//!
//! # Attributes
//!
//! Attribute nodes are members of node-sets like any other node, addressed
//! as [`XPathNode::Attribute`]. Their parent is the owning element.

use std::cell::OnceCell;
use std::collections::HashMap;

use super::ast::{Axis, BinaryOp, Expr, NodeTest, Step};
use super::types::{
    parse_xpath_number, QueryValue, ResultKind, XPathError, XPathNode, XPathValue,
};
use super::NamespaceResolver;
use crate::tree::{Attribute, Document, NodeId, NodeKind, XML_NAMESPACE};

/// The context node, position and size an expression is evaluated with.
#[derive(Debug, Clone, Copy)]
struct Focus {
    node: XPathNode,
    position: usize,
    size: usize,
}

impl Focus {
    fn single(node: XPathNode) -> Self {
        Self {
            node,
            position: 1,
            size: 1,
        }
    }
}

/// A node test with its prefix already resolved to a namespace URI.
enum ResolvedTest<'t> {
    Name {
        namespace: Option<String>,
        local: &'t str,
    },
    AnyName,
    AnyInNamespace(Option<String>),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<&'t str>),
}

/// Evaluation context for an `XPath` 1.0 expression.
///
/// # Examples
///
/// ```
/// use xmlbuilder::Document;
/// use xmlbuilder::xpath::{parser::parse, XPathContext, XPathValue};
///
/// let doc = Document::parse_str("<root><a/><b/></root>").unwrap();
/// let root = doc.root_element().unwrap();
/// let expr = parse("count(*)").unwrap();
/// let value = XPathContext::new(&doc, root).evaluate(&expr).unwrap();
/// assert!(matches!(value, XPathValue::Number(n) if n == 2.0));
/// ```
pub struct XPathContext<'a> {
    doc: &'a Document,
    context_node: NodeId,
    resolver: Option<&'a dyn NamespaceResolver>,
    variables: HashMap<String, XPathValue>,
    /// Document order ranks, computed on first sort.
    order: OnceCell<Vec<usize>>,
}

impl<'a> XPathContext<'a> {
    /// Creates a context with `context_node` as the context node, at
    /// position 1 of a singleton node-set. No prefixes are bound.
    #[must_use]
    pub fn new(doc: &'a Document, context_node: NodeId) -> Self {
        Self {
            doc,
            context_node,
            resolver: None,
            variables: HashMap::new(),
            order: OnceCell::new(),
        }
    }

    /// Resolves name-test prefixes through `resolver`.
    #[must_use]
    pub fn with_resolver(mut self, resolver: &'a dyn NamespaceResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Binds `$name` to `value`.
    pub fn set_variable(&mut self, name: &str, value: XPathValue) {
        self.variables.insert(name.to_owned(), value);
    }

    /// Evaluates an expression against the context node.
    ///
    /// # Errors
    ///
    /// Returns [`XPathError`] if evaluation fails, e.g. for an unbound
    /// prefix, an unknown function or a type mismatch.
    pub fn evaluate(&self, expr: &Expr) -> Result<XPathValue, XPathError> {
        self.eval_expr(expr, Focus::single(self.context_node.into()))
    }

    /// Evaluates an expression and converts the result to `kind`.
    ///
    /// # Errors
    ///
    /// Besides evaluation errors, returns [`XPathError::TypeError`] when a
    /// node-set or node is requested and the result is not a node-set.
    pub fn evaluate_as(&self, expr: &Expr, kind: ResultKind) -> Result<QueryValue, XPathError> {
        let value = self.evaluate(expr)?;
        Ok(match kind {
            ResultKind::String => QueryValue::String(self.value_to_string(&value)),
            ResultKind::Number => QueryValue::Number(self.value_to_number(&value)),
            ResultKind::Boolean => QueryValue::Boolean(value.to_boolean()),
            ResultKind::NodeSet => QueryValue::NodeSet(into_node_set(value)?),
            ResultKind::Node => QueryValue::Node(into_node_set(value)?.first().copied()),
        })
    }

    /// Computes the string-value of a node per `XPath` 1.0 section 5.
    #[must_use]
    pub fn string_value(&self, node: XPathNode) -> String {
        match node {
            XPathNode::Tree(id) => match &self.doc.node(id).kind {
                NodeKind::Document | NodeKind::Element { .. } => self.doc.text_content(id),
                NodeKind::Text { content }
                | NodeKind::CData { content }
                | NodeKind::Comment { content } => content.clone(),
                NodeKind::ProcessingInstruction { data, .. } => {
                    data.clone().unwrap_or_default()
                }
                NodeKind::EntityRef { .. } => String::new(),
            },
            XPathNode::Attribute { owner, index } => self
                .attribute_at(owner, index)
                .map(|attr| attr.value.clone())
                .unwrap_or_default(),
        }
    }

    // -----------------------------------------------------------------------
    // Expression dispatch
    // -----------------------------------------------------------------------

    fn eval_expr(&self, expr: &Expr, focus: Focus) -> Result<XPathValue, XPathError> {
        match expr {
            Expr::Number(n) => Ok(XPathValue::Number(*n)),
            Expr::String(s) => Ok(XPathValue::String(s.clone())),
            Expr::Variable(name) => {
                self.variables
                    .get(name)
                    .cloned()
                    .ok_or_else(|| XPathError::UndefinedVariable {
                        name: name.clone(),
                    })
            }
            Expr::BinaryOp { op, left, right } => self.eval_binary_op(*op, left, right, focus),
            Expr::UnaryNeg(inner) => {
                let value = self.eval_expr(inner, focus)?;
                Ok(XPathValue::Number(-self.value_to_number(&value)))
            }
            Expr::FunctionCall { name, args } => self.eval_function(name, args, focus),
            Expr::Path { steps } => self.eval_steps(vec![focus.node], steps).map(XPathValue::NodeSet),
            Expr::RootPath { steps } => self
                .eval_steps(vec![self.doc.root().into()], steps)
                .map(XPathValue::NodeSet),
            Expr::Filter { expr, predicates } => {
                let mut nodes = into_node_set(self.eval_expr(expr, focus)?)?;
                for predicate in predicates {
                    nodes = self.apply_predicate(nodes, predicate)?;
                }
                Ok(XPathValue::NodeSet(nodes))
            }
            Expr::FilterPath { base, steps } => {
                let nodes = into_node_set(self.eval_expr(base, focus)?)?;
                self.eval_steps(nodes, steps).map(XPathValue::NodeSet)
            }
            Expr::Union(left, right) => {
                let mut nodes = into_node_set(self.eval_expr(left, focus)?)?;
                nodes.extend(into_node_set(self.eval_expr(right, focus)?)?);
                self.sort_document_order(&mut nodes);
                Ok(XPathValue::NodeSet(nodes))
            }
        }
    }

    fn eval_binary_op(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        focus: Focus,
    ) -> Result<XPathValue, XPathError> {
        match op {
            BinaryOp::And => {
                if !self.eval_expr(left, focus)?.to_boolean() {
                    return Ok(XPathValue::Boolean(false));
                }
                Ok(XPathValue::Boolean(self.eval_expr(right, focus)?.to_boolean()))
            }
            BinaryOp::Or => {
                if self.eval_expr(left, focus)?.to_boolean() {
                    return Ok(XPathValue::Boolean(true));
                }
                Ok(XPathValue::Boolean(self.eval_expr(right, focus)?.to_boolean()))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let l = self.value_to_number(&self.eval_expr(left, focus)?);
                let r = self.value_to_number(&self.eval_expr(right, focus)?);
                Ok(XPathValue::Number(match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                    _ => l % r,
                }))
            }
            BinaryOp::Eq | BinaryOp::Neq => {
                let lv = self.eval_expr(left, focus)?;
                let rv = self.eval_expr(right, focus)?;
                let equal = self.compare_equality(&lv, &rv, op == BinaryOp::Neq);
                Ok(XPathValue::Boolean(equal))
            }
            BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => {
                let lv = self.eval_expr(left, focus)?;
                let rv = self.eval_expr(right, focus)?;
                Ok(XPathValue::Boolean(self.compare_relational(op, &lv, &rv)))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Location paths
    // -----------------------------------------------------------------------

    fn eval_steps(
        &self,
        mut nodes: Vec<XPathNode>,
        steps: &[Step],
    ) -> Result<Vec<XPathNode>, XPathError> {
        for step in steps {
            nodes = self.apply_step(&nodes, step)?;
        }
        Ok(nodes)
    }

    /// Applies one step to every input node. Predicates see positions in
    /// axis order; the merged result is in document order without
    /// duplicates.
    fn apply_step(&self, input: &[XPathNode], step: &Step) -> Result<Vec<XPathNode>, XPathError> {
        let test = self.resolve_test(&step.node_test)?;
        let mut result = Vec::new();
        for &node in input {
            let mut selected: Vec<XPathNode> = self
                .expand_axis(node, step.axis)
                .into_iter()
                .filter(|&candidate| self.matches(candidate, &test, step.axis))
                .collect();
            for predicate in &step.predicates {
                selected = self.apply_predicate(selected, predicate)?;
            }
            result.extend(selected);
        }
        self.sort_document_order(&mut result);
        Ok(result)
    }

    /// Keeps nodes for which `predicate` holds. A numeric predicate is
    /// compared with the context position.
    fn apply_predicate(
        &self,
        nodes: Vec<XPathNode>,
        predicate: &Expr,
    ) -> Result<Vec<XPathNode>, XPathError> {
        let size = nodes.len();
        let mut kept = Vec::with_capacity(size);
        for (i, node) in nodes.into_iter().enumerate() {
            let focus = Focus {
                node,
                position: i + 1,
                size,
            };
            let keep = match self.eval_expr(predicate, focus)? {
                #[allow(clippy::float_cmp, clippy::cast_precision_loss)]
                XPathValue::Number(n) => n == (i + 1) as f64,
                other => other.to_boolean(),
            };
            if keep {
                kept.push(node);
            }
        }
        Ok(kept)
    }

    // -----------------------------------------------------------------------
    // Axes
    // -----------------------------------------------------------------------

    /// Returns the nodes along `axis` from `node`, in axis order.
    fn expand_axis(&self, node: XPathNode, axis: Axis) -> Vec<XPathNode> {
        match node {
            XPathNode::Tree(id) => self.tree_axis(id, axis),
            XPathNode::Attribute { owner, .. } => match axis {
                Axis::Self_ | Axis::DescendantOrSelf => vec![node],
                Axis::Parent => vec![owner.into()],
                Axis::Ancestor => self.tree_axis(owner, Axis::AncestorOrSelf),
                Axis::AncestorOrSelf => {
                    let mut result = vec![node];
                    result.extend(self.tree_axis(owner, Axis::AncestorOrSelf));
                    result
                }
                Axis::Following => {
                    let mut result: Vec<XPathNode> =
                        self.doc.descendants(owner).map(XPathNode::from).collect();
                    result.extend(self.following_nodes(owner));
                    result
                }
                Axis::Preceding => self.preceding_nodes(owner),
                _ => Vec::new(),
            },
        }
    }

    fn tree_axis(&self, id: NodeId, axis: Axis) -> Vec<XPathNode> {
        let doc = self.doc;
        match axis {
            Axis::Child => doc.children(id).map(XPathNode::from).collect(),
            Axis::Descendant => doc.descendants(id).map(XPathNode::from).collect(),
            Axis::DescendantOrSelf => std::iter::once(id)
                .chain(doc.descendants(id))
                .map(XPathNode::from)
                .collect(),
            Axis::Parent => doc.parent(id).map(XPathNode::from).into_iter().collect(),
            Axis::Ancestor => doc.ancestors(id).skip(1).map(XPathNode::from).collect(),
            Axis::AncestorOrSelf => doc.ancestors(id).map(XPathNode::from).collect(),
            Axis::FollowingSibling => {
                std::iter::successors(doc.next_sibling(id), |&s| doc.next_sibling(s))
                    .map(XPathNode::from)
                    .collect()
            }
            Axis::PrecedingSibling => {
                std::iter::successors(doc.prev_sibling(id), |&s| doc.prev_sibling(s))
                    .map(XPathNode::from)
                    .collect()
            }
            Axis::Following => self.following_nodes(id),
            Axis::Preceding => self.preceding_nodes(id),
            Axis::Attribute => (0..doc.attributes(id).len())
                .map(|index| XPathNode::Attribute { owner: id, index })
                .collect(),
            Axis::Namespace => Vec::new(),
            Axis::Self_ => vec![id.into()],
        }
    }

    /// Nodes after `id` in document order, descendants excluded.
    fn following_nodes(&self, id: NodeId) -> Vec<XPathNode> {
        let doc = self.doc;
        let mut result = Vec::new();
        for ancestor in doc.ancestors(id) {
            let mut sibling = doc.next_sibling(ancestor);
            while let Some(s) = sibling {
                result.push(s.into());
                result.extend(doc.descendants(s).map(XPathNode::from));
                sibling = doc.next_sibling(s);
            }
        }
        result
    }

    /// Nodes before `id` in reverse document order, ancestors excluded.
    fn preceding_nodes(&self, id: NodeId) -> Vec<XPathNode> {
        let doc = self.doc;
        let mut result = Vec::new();
        for ancestor in doc.ancestors(id) {
            let mut sibling = doc.prev_sibling(ancestor);
            while let Some(s) = sibling {
                let subtree: Vec<NodeId> = doc.descendants(s).collect();
                result.extend(subtree.into_iter().rev().map(XPathNode::from));
                result.push(s.into());
                sibling = doc.prev_sibling(s);
            }
        }
        result
    }

    // -----------------------------------------------------------------------
    // Node tests
    // -----------------------------------------------------------------------

    fn resolve_test<'t>(&self, test: &'t NodeTest) -> Result<ResolvedTest<'t>, XPathError> {
        Ok(match test {
            NodeTest::Name {
                prefix: None,
                local,
            } => ResolvedTest::Name {
                namespace: None,
                local,
            },
            NodeTest::Name {
                prefix: Some(prefix),
                local,
            } => ResolvedTest::Name {
                namespace: self.resolve_prefix(prefix)?,
                local,
            },
            NodeTest::Wildcard => ResolvedTest::AnyName,
            NodeTest::PrefixWildcard(prefix) => {
                ResolvedTest::AnyInNamespace(self.resolve_prefix(prefix)?)
            }
            NodeTest::Node => ResolvedTest::Node,
            NodeTest::Text => ResolvedTest::Text,
            NodeTest::Comment => ResolvedTest::Comment,
            NodeTest::ProcessingInstruction(target) => {
                ResolvedTest::ProcessingInstruction(target.as_deref())
            }
        })
    }

    /// Maps a prefix to its namespace URI. A URI of `""` means no namespace.
    fn resolve_prefix(&self, prefix: &str) -> Result<Option<String>, XPathError> {
        if prefix == "xml" {
            return Ok(Some(XML_NAMESPACE.to_owned()));
        }
        let uri = self
            .resolver
            .and_then(|resolver| resolver.resolve_prefix(prefix))
            .ok_or_else(|| XPathError::UnresolvedPrefix {
                prefix: prefix.to_owned(),
            })?;
        Ok((!uri.is_empty()).then(|| uri.to_owned()))
    }

    fn matches(&self, node: XPathNode, test: &ResolvedTest<'_>, axis: Axis) -> bool {
        let principal = |node| self.expanded_name(node, axis == Axis::Attribute);
        match test {
            ResolvedTest::Node => true,
            ResolvedTest::Name { namespace, local } => principal(node)
                .is_some_and(|(ns, name)| name == *local && ns == namespace.as_deref()),
            ResolvedTest::AnyName => principal(node).is_some(),
            ResolvedTest::AnyInNamespace(namespace) => {
                principal(node).is_some_and(|(ns, _)| ns == namespace.as_deref())
            }
            ResolvedTest::Text => self.tree_kind(node).is_some_and(|kind| {
                matches!(kind, NodeKind::Text { .. } | NodeKind::CData { .. })
            }),
            ResolvedTest::Comment => self
                .tree_kind(node)
                .is_some_and(|kind| matches!(kind, NodeKind::Comment { .. })),
            ResolvedTest::ProcessingInstruction(expected) => {
                self.tree_kind(node).is_some_and(|kind| match kind {
                    NodeKind::ProcessingInstruction { target, .. } => {
                        expected.map_or(true, |name| target == name)
                    }
                    _ => false,
                })
            }
        }
    }

    fn tree_kind(&self, node: XPathNode) -> Option<&'a NodeKind> {
        node.as_tree().map(|id| &self.doc.node(id).kind)
    }

    /// The (namespace, local name) pair of a node of the axis' principal
    /// type: attributes on the attribute axis, elements elsewhere.
    fn expanded_name(
        &self,
        node: XPathNode,
        attribute_axis: bool,
    ) -> Option<(Option<&'a str>, &'a str)> {
        match node {
            XPathNode::Tree(id) if !attribute_axis => match &self.doc.node(id).kind {
                NodeKind::Element {
                    name, namespace, ..
                } => Some((namespace.as_deref(), name.as_str())),
                _ => None,
            },
            XPathNode::Attribute { owner, index } if attribute_axis => {
                let attr = self.attribute_at(owner, index)?;
                Some((self.attribute_namespace(owner, attr), attr.local_name()))
            }
            _ => None,
        }
    }

    fn attribute_at(&self, owner: NodeId, index: usize) -> Option<&'a Attribute> {
        self.doc.attributes(owner).get(index)
    }

    /// Unprefixed attributes are in no namespace.
    fn attribute_namespace(&self, owner: NodeId, attr: &Attribute) -> Option<&'a str> {
        attr.prefix()
            .and_then(|prefix| self.doc.lookup_namespace_uri(owner, Some(prefix)))
    }

    fn sort_document_order(&self, nodes: &mut Vec<XPathNode>) {
        let ranks = self.order.get_or_init(|| self.doc.document_order());
        let key = |node: &XPathNode| match *node {
            XPathNode::Tree(id) => (ranks[id.as_index()], 0, id.into_raw()),
            XPathNode::Attribute { owner, index } => {
                (ranks[owner.as_index()], index + 1, owner.into_raw())
            }
        };
        nodes.sort_by_key(key);
        nodes.dedup();
    }

    // -----------------------------------------------------------------------
    // Functions
    // -----------------------------------------------------------------------

    fn eval_function(
        &self,
        name: &str,
        args: &[Expr],
        focus: Focus,
    ) -> Result<XPathValue, XPathError> {
        match name {
            // Node-set functions
            "last" => {
                check_arg_count(name, args, 0)?;
                Ok(XPathValue::Number(count_to_number(focus.size)))
            }
            "position" => {
                check_arg_count(name, args, 0)?;
                Ok(XPathValue::Number(count_to_number(focus.position)))
            }
            "count" => {
                check_arg_count(name, args, 1)?;
                let nodes = into_node_set(self.eval_expr(&args[0], focus)?)?;
                Ok(XPathValue::Number(count_to_number(nodes.len())))
            }
            "local-name" | "name" | "namespace-uri" => self.fn_node_name(name, args, focus),
            "id" => {
                // No DTD information is kept, so no attribute is of type ID.
                check_arg_count(name, args, 1)?;
                self.eval_expr(&args[0], focus)?;
                Ok(XPathValue::NodeSet(Vec::new()))
            }

            // String functions
            "string" => Ok(XPathValue::String(self.optional_string_arg(name, args, focus)?)),
            "concat" => {
                if args.len() < 2 {
                    return Err(XPathError::InvalidArgCount {
                        function: name.to_owned(),
                        expected: 2,
                        found: args.len(),
                    });
                }
                let mut result = String::new();
                for arg in args {
                    result.push_str(&self.value_to_string(&self.eval_expr(arg, focus)?));
                }
                Ok(XPathValue::String(result))
            }
            "starts-with" => {
                let [s, prefix] = self.string_args::<2>(name, args, focus)?;
                Ok(XPathValue::Boolean(s.starts_with(prefix.as_str())))
            }
            "contains" => {
                let [s, sub] = self.string_args::<2>(name, args, focus)?;
                Ok(XPathValue::Boolean(s.contains(sub.as_str())))
            }
            "substring-before" => {
                let [s, sub] = self.string_args::<2>(name, args, focus)?;
                let result = s.find(sub.as_str()).map_or("", |pos| &s[..pos]);
                Ok(XPathValue::String(result.to_owned()))
            }
            "substring-after" => {
                let [s, sub] = self.string_args::<2>(name, args, focus)?;
                let result = s
                    .find(sub.as_str())
                    .map_or("", |pos| &s[pos + sub.len()..]);
                Ok(XPathValue::String(result.to_owned()))
            }
            "substring" => self.fn_substring(args, focus),
            "string-length" => {
                let s = self.optional_string_arg(name, args, focus)?;
                Ok(XPathValue::Number(count_to_number(s.chars().count())))
            }
            "normalize-space" => {
                let s = self.optional_string_arg(name, args, focus)?;
                Ok(XPathValue::String(
                    s.split_ascii_whitespace().collect::<Vec<_>>().join(" "),
                ))
            }
            "translate" => {
                let [s, from, to] = self.string_args::<3>(name, args, focus)?;
                let from: Vec<char> = from.chars().collect();
                let to: Vec<char> = to.chars().collect();
                let result = s
                    .chars()
                    .filter_map(|c| match from.iter().position(|&f| f == c) {
                        Some(pos) => to.get(pos).copied(),
                        None => Some(c),
                    })
                    .collect();
                Ok(XPathValue::String(result))
            }

            // Boolean functions
            "boolean" => {
                check_arg_count(name, args, 1)?;
                Ok(XPathValue::Boolean(self.eval_expr(&args[0], focus)?.to_boolean()))
            }
            "not" => {
                check_arg_count(name, args, 1)?;
                Ok(XPathValue::Boolean(!self.eval_expr(&args[0], focus)?.to_boolean()))
            }
            "true" | "false" => {
                check_arg_count(name, args, 0)?;
                Ok(XPathValue::Boolean(name == "true"))
            }
            "lang" => {
                let [target] = self.string_args::<1>(name, args, focus)?;
                Ok(XPathValue::Boolean(self.in_language(focus.node, &target)))
            }

            // Number functions
            "number" => {
                if args.is_empty() {
                    let value = self.string_value(focus.node);
                    return Ok(XPathValue::Number(parse_xpath_number(&value)));
                }
                check_arg_count(name, args, 1)?;
                let value = self.eval_expr(&args[0], focus)?;
                Ok(XPathValue::Number(self.value_to_number(&value)))
            }
            "sum" => {
                check_arg_count(name, args, 1)?;
                let nodes = into_node_set(self.eval_expr(&args[0], focus)?)?;
                let total = nodes
                    .iter()
                    .map(|&node| parse_xpath_number(&self.string_value(node)))
                    .sum();
                Ok(XPathValue::Number(total))
            }
            "floor" | "ceiling" | "round" => {
                check_arg_count(name, args, 1)?;
                let n = self.value_to_number(&self.eval_expr(&args[0], focus)?);
                Ok(XPathValue::Number(match name {
                    "floor" => n.floor(),
                    "ceiling" => n.ceil(),
                    _ => xpath_round(n),
                }))
            }

            _ => Err(XPathError::UndefinedFunction {
                name: name.to_owned(),
            }),
        }
    }

    /// `local-name()`, `name()` and `namespace-uri()`, with an optional
    /// node-set argument defaulting to the context node.
    fn fn_node_name(
        &self,
        function: &str,
        args: &[Expr],
        focus: Focus,
    ) -> Result<XPathValue, XPathError> {
        let node = match args {
            [] => Some(focus.node),
            [arg] => into_node_set(self.eval_expr(arg, focus)?)?.first().copied(),
            _ => {
                return Err(XPathError::InvalidArgCount {
                    function: function.to_owned(),
                    expected: 1,
                    found: args.len(),
                })
            }
        };
        let Some(node) = node else {
            return Ok(XPathValue::String(String::new()));
        };

        let result = match node {
            XPathNode::Tree(id) => match function {
                "local-name" => self.doc.local_name(id).unwrap_or_default().to_owned(),
                "name" => self.doc.qualified_name(id).unwrap_or_default(),
                _ => self.doc.node_namespace(id).unwrap_or_default().to_owned(),
            },
            XPathNode::Attribute { owner, index } => {
                let Some(attr) = self.attribute_at(owner, index) else {
                    return Ok(XPathValue::String(String::new()));
                };
                match function {
                    "local-name" => attr.local_name().to_owned(),
                    "name" => attr.name.clone(),
                    _ => self
                        .attribute_namespace(owner, attr)
                        .unwrap_or_default()
                        .to_owned(),
                }
            }
        };
        Ok(XPathValue::String(result))
    }

    /// `substring(string, number, number?)` per section 4.2: 1-based, with
    /// both numeric arguments rounded.
    fn fn_substring(&self, args: &[Expr], focus: Focus) -> Result<XPathValue, XPathError> {
        if !(2..=3).contains(&args.len()) {
            return Err(XPathError::InvalidArgCount {
                function: "substring".to_owned(),
                expected: 2,
                found: args.len(),
            });
        }
        let s = self.value_to_string(&self.eval_expr(&args[0], focus)?);
        let start = xpath_round(self.value_to_number(&self.eval_expr(&args[1], focus)?));
        let chars: Vec<char> = s.chars().collect();
        let str_len = count_to_number(chars.len());
        let end = match args.get(2) {
            Some(len) => start + xpath_round(self.value_to_number(&self.eval_expr(len, focus)?)),
            None => str_len + 1.0,
        };
        if start.is_nan() || end.is_nan() {
            return Ok(XPathValue::String(String::new()));
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let first = (start - 1.0).max(0.0) as usize;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let last = (end - 1.0).min(str_len).max(0.0) as usize;
        if first >= last || first >= chars.len() {
            return Ok(XPathValue::String(String::new()));
        }
        Ok(XPathValue::String(chars[first..last].iter().collect()))
    }

    /// `lang()` looks for the nearest `xml:lang` on the node or its
    /// ancestors and matches it case-insensitively, sublanguages included.
    fn in_language(&self, node: XPathNode, target: &str) -> bool {
        let start = match node {
            XPathNode::Tree(id) => id,
            XPathNode::Attribute { owner, .. } => owner,
        };
        let Some(lang) = self
            .doc
            .ancestors(start)
            .find_map(|id| self.doc.attribute(id, "xml:lang"))
        else {
            return false;
        };
        let lang = lang.to_lowercase();
        let target = target.to_lowercase();
        lang == target || lang.starts_with(&format!("{target}-"))
    }

    fn optional_string_arg(
        &self,
        function: &str,
        args: &[Expr],
        focus: Focus,
    ) -> Result<String, XPathError> {
        match args {
            [] => Ok(self.string_value(focus.node)),
            [arg] => Ok(self.value_to_string(&self.eval_expr(arg, focus)?)),
            _ => Err(XPathError::InvalidArgCount {
                function: function.to_owned(),
                expected: 1,
                found: args.len(),
            }),
        }
    }

    fn string_args<const N: usize>(
        &self,
        function: &str,
        args: &[Expr],
        focus: Focus,
    ) -> Result<[String; N], XPathError> {
        check_arg_count(function, args, N)?;
        let mut values: [String; N] = std::array::from_fn(|_| String::new());
        for (slot, arg) in values.iter_mut().zip(args) {
            *slot = self.value_to_string(&self.eval_expr(arg, focus)?);
        }
        Ok(values)
    }

    // -----------------------------------------------------------------------
    // Conversions and comparisons
    // -----------------------------------------------------------------------

    /// Converts a value to a number per `XPath` 1.0 section 4.4.
    fn value_to_number(&self, value: &XPathValue) -> f64 {
        match value {
            XPathValue::Number(n) => *n,
            XPathValue::Boolean(b) => f64::from(u8::from(*b)),
            XPathValue::String(s) => parse_xpath_number(s),
            XPathValue::NodeSet(_) => parse_xpath_number(&self.value_to_string(value)),
        }
    }

    /// Converts a value to a string per `XPath` 1.0 section 4.2. A node-set
    /// converts through its first node.
    fn value_to_string(&self, value: &XPathValue) -> String {
        match value {
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map(|&node| self.string_value(node))
                .unwrap_or_default(),
            other => other.to_string(),
        }
    }

    /// Equality per `XPath` 1.0 section 3.4. With `negate`, tests `!=`,
    /// which is existential over node-sets rather than the negation of `=`.
    #[allow(clippy::float_cmp)]
    fn compare_equality(&self, lhs: &XPathValue, rhs: &XPathValue, negate: bool) -> bool {
        match (lhs, rhs) {
            (XPathValue::NodeSet(lns), XPathValue::NodeSet(rns)) => {
                let right: Vec<String> = rns.iter().map(|&n| self.string_value(n)).collect();
                lns.iter().any(|&ln| {
                    let lsv = self.string_value(ln);
                    right.iter().any(|rsv| (lsv == *rsv) != negate)
                })
            }
            (XPathValue::NodeSet(ns), XPathValue::Boolean(b))
            | (XPathValue::Boolean(b), XPathValue::NodeSet(ns)) => {
                (!ns.is_empty() == *b) != negate
            }
            (XPathValue::NodeSet(ns), XPathValue::Number(n))
            | (XPathValue::Number(n), XPathValue::NodeSet(ns)) => ns
                .iter()
                .any(|&node| (parse_xpath_number(&self.string_value(node)) == *n) != negate),
            (XPathValue::NodeSet(ns), XPathValue::String(s))
            | (XPathValue::String(s), XPathValue::NodeSet(ns)) => ns
                .iter()
                .any(|&node| (self.string_value(node) == *s) != negate),
            (XPathValue::Boolean(_), _) | (_, XPathValue::Boolean(_)) => {
                (lhs.to_boolean() == rhs.to_boolean()) != negate
            }
            (XPathValue::Number(_), _) | (_, XPathValue::Number(_)) => {
                (self.value_to_number(lhs) == self.value_to_number(rhs)) != negate
            }
            _ => (self.value_to_string(lhs) == self.value_to_string(rhs)) != negate,
        }
    }

    /// Relational comparison per `XPath` 1.0 section 3.4; everything is
    /// compared as numbers.
    fn compare_relational(&self, op: BinaryOp, lhs: &XPathValue, rhs: &XPathValue) -> bool {
        let cmp = |a: f64, b: f64| match op {
            BinaryOp::Lt => a < b,
            BinaryOp::Lte => a <= b,
            BinaryOp::Gt => a > b,
            _ => a >= b,
        };
        let numbers = |value: &XPathValue| -> Vec<f64> {
            match value {
                XPathValue::NodeSet(nodes) => nodes
                    .iter()
                    .map(|&node| parse_xpath_number(&self.string_value(node)))
                    .collect(),
                other => vec![self.value_to_number(other)],
            }
        };

        match (lhs, rhs) {
            (XPathValue::NodeSet(_), XPathValue::Boolean(_))
            | (XPathValue::Boolean(_), XPathValue::NodeSet(_)) => cmp(
                f64::from(u8::from(lhs.to_boolean())),
                f64::from(u8::from(rhs.to_boolean())),
            ),
            _ => {
                let right = numbers(rhs);
                numbers(lhs)
                    .into_iter()
                    .any(|l| right.iter().any(|&r| cmp(l, r)))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn into_node_set(value: XPathValue) -> Result<Vec<XPathNode>, XPathError> {
    match value {
        XPathValue::NodeSet(nodes) => Ok(nodes),
        other => Err(XPathError::type_error("node-set", &other)),
    }
}

#[allow(clippy::cast_precision_loss)]
fn count_to_number(n: usize) -> f64 {
    n as f64
}

/// Rounds half toward positive infinity: `round(0.5)` is 1 and
/// `round(-0.5)` is 0, per `XPath` 1.0 section 4.4.
fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        return n;
    }
    (n + 0.5).floor()
}

fn check_arg_count(name: &str, args: &[Expr], expected: usize) -> Result<(), XPathError> {
    if args.len() != expected {
        return Err(XPathError::InvalidArgCount {
            function: name.to_owned(),
            expected,
            found: args.len(),
        });
    }
    Ok(())
}
