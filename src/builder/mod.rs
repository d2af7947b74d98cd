//! Cursor-style document construction.
//!
//! An [`XmlBuilder`] is a cheap handle pairing a shared [`Document`] with
//! one node of it. Every editing method works on that node and hands back
//! a builder for the node it describes: `element` returns a builder at the
//! new child, `attribute` returns the same position, and so on. Earlier
//! builders stay valid, so several positions in one document can be kept
//! around and edited in any order.
//!
//! ```
//! use xmlbuilder::XmlBuilder;
//!
//! let xml = XmlBuilder::create("Projects", None)?
//!     .element("java-xmlbuilder", None)?
//!     .attribute("language", "Java")?
//!     .element("Location", None)?
//!     .attribute("type", "URL")?
//!     .text("http://code.google.com/p/java-xmlbuilder/")?
//!     .root()
//!     .as_string()?;
//! assert_eq!(
//!     xml,
//!     "<Projects><java-xmlbuilder language=\"Java\"><Location type=\"URL\">\
//!      http://code.google.com/p/java-xmlbuilder/</Location></java-xmlbuilder></Projects>"
//! );
//! # Ok::<(), xmlbuilder::Error>(())
//! ```
//!
//! The document lives behind `Rc<RefCell<_>>`. Builders are therefore
//! neither `Send` nor `Sync`, and holding the guard returned by
//! [`XmlBuilder::doc`] across an edit panics like any other double borrow.

mod import;
mod output;
mod query;

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::io::Read;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::tree::{Document, EncodedData, NodeId, NodeKind};
use crate::util::qname::{is_ncname, split_qname};

/// A position in a shared, mutable XML document.
#[derive(Clone)]
pub struct XmlBuilder {
    doc: Rc<RefCell<Document>>,
    node: NodeId,
}

impl XmlBuilder {
    // --- Construction ---

    /// Creates a document with a single root element and returns a builder
    /// positioned at it.
    ///
    /// With a namespace URI the root is placed in that namespace and the
    /// binding is declared on it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `name` is not a valid XML name.
    pub fn create(name: &str, namespace: Option<&str>) -> Result<Self> {
        Self::from_document(Document::with_root(name, namespace)?)
    }

    /// Parses XML text and returns a builder at its root element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the text is not well-formed.
    pub fn parse(input: &str) -> Result<Self> {
        Self::from_document(crate::parser::parse_str(input)?)
    }

    /// Parses raw XML bytes in whatever charset a byte order mark or the
    /// XML declaration names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the bytes cannot be decoded or parsed.
    pub fn parse_bytes(input: &[u8]) -> Result<Self> {
        Self::from_document(crate::parser::parse_bytes(input)?)
    }

    /// Reads and parses a whole XML source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if reading fails and [`Error::Parse`] if the
    /// content is malformed.
    pub fn parse_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_document(crate::parser::parse_reader(reader)?)
    }

    /// Wraps an existing document, positioned at its root element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the document has no root element.
    pub fn from_document(doc: Document) -> Result<Self> {
        let node = doc
            .root_element()
            .ok_or_else(|| Error::invalid_state("document has no root element"))?;
        Ok(Self {
            doc: Rc::new(RefCell::new(doc)),
            node,
        })
    }

    fn at(&self, node: NodeId) -> Self {
        Self {
            doc: Rc::clone(&self.doc),
            node,
        }
    }

    // --- Navigation ---

    /// Moves to the parent element. At the root element this stays put.
    #[must_use]
    pub fn up(&self) -> Self {
        self.up_n(1)
    }

    /// Moves `steps` ancestors up, stopping at the root element instead of
    /// failing when there are fewer ancestors. From the document node this
    /// lands on the root element.
    #[must_use]
    pub fn up_n(&self, steps: usize) -> Self {
        let doc = self.doc.borrow();
        if !doc.is_element(self.node) {
            return self.at(doc.root_element().unwrap_or(self.node));
        }
        let mut node = self.node;
        for _ in 0..steps {
            match doc.parent(node) {
                Some(parent) if doc.is_element(parent) => node = parent,
                _ => break,
            }
        }
        self.at(node)
    }

    /// Moves to the root element.
    #[must_use]
    pub fn root(&self) -> Self {
        let doc = self.doc.borrow();
        self.at(doc.root_element().unwrap_or(self.node))
    }

    /// Moves to the document node, the container of the root element and
    /// any top-level comments and processing instructions.
    #[must_use]
    pub fn document(&self) -> Self {
        let doc = self.doc.borrow();
        self.at(doc.root())
    }

    // --- Structure ---

    /// Appends a child element and returns a builder at it.
    ///
    /// Without a namespace URI the element takes the namespace bound to its
    /// prefix (or the default namespace) where it is inserted. A prefix
    /// that is not bound anywhere is kept as written, with no namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an invalid name and
    /// [`Error::InvalidState`] if the current node cannot hold elements:
    /// it is not an element, or it is the document node and the document
    /// already has a root element.
    pub fn element(&self, name: &str, namespace: Option<&str>) -> Result<Self> {
        let mut doc = self.doc.borrow_mut();
        match doc.node(self.node).kind {
            NodeKind::Element { .. } => {}
            NodeKind::Document if doc.root_element().is_none() => {}
            NodeKind::Document => {
                return Err(Error::invalid_state("document already has a root element"));
            }
            ref other => {
                return Err(Error::invalid_state(format!(
                    "cannot append an element to a {} node",
                    other.label()
                )));
            }
        }
        let namespace = resolve_namespace(&doc, self.node, name, namespace);
        let child = doc.create_element(name, namespace)?;
        doc.append_child(self.node, child);
        trace!(name = %name, parent = self.node.into_raw(), "appended element");
        Ok(self.at(child))
    }

    /// Inserts a sibling element immediately before the current element and
    /// returns a builder at it. The namespace is resolved from the current
    /// element's scope when not given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] at the root element or the document
    /// node, which have no sibling slot to insert into, and
    /// [`Error::InvalidArgument`] for an invalid name.
    pub fn element_before(&self, name: &str, namespace: Option<&str>) -> Result<Self> {
        let mut doc = self.doc.borrow_mut();
        let has_element_parent = doc
            .parent(self.node)
            .is_some_and(|parent| doc.is_element(parent));
        if !doc.is_element(self.node) || !has_element_parent {
            return Err(Error::invalid_state(
                "cannot insert an element before the root element or the document node",
            ));
        }
        let namespace = resolve_namespace(&doc, self.node, name, namespace);
        let sibling = doc.create_element(name, namespace)?;
        doc.insert_before(self.node, sibling)?;
        trace!(name = %name, before = self.node.into_raw(), "inserted element");
        Ok(self.at(sibling))
    }

    /// Sets an attribute on the current element. Setting an existing name
    /// replaces its value. `xmlns` and `xmlns:p` names declare namespaces.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the current node is not an
    /// element and [`Error::InvalidArgument`] for an invalid name.
    pub fn attribute(&self, name: &str, value: &str) -> Result<Self> {
        self.doc.borrow_mut().set_attribute(self.node, name, value)?;
        trace!(name = %name, element = self.node.into_raw(), "set attribute");
        Ok(self.clone())
    }

    /// Declares a namespace on the current element. The empty prefix
    /// declares the default namespace.
    ///
    /// Existing elements keep their namespaces; the binding applies to
    /// elements created afterwards and to queries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a prefix that is not a valid
    /// name and [`Error::InvalidState`] if the current node is not an
    /// element.
    pub fn namespace(&self, prefix: &str, uri: &str) -> Result<Self> {
        if !prefix.is_empty() && !is_ncname(prefix) {
            return Err(Error::InvalidArgument(format!(
                "Invalid namespace prefix \"{prefix}\""
            )));
        }
        self.doc
            .borrow_mut()
            .declare_namespace(self.node, prefix, uri)?;
        trace!(prefix = %prefix, uri = %uri, "declared namespace");
        Ok(self.clone())
    }

    /// Declares several namespaces on the current element, in order.
    ///
    /// # Errors
    ///
    /// As [`namespace`](Self::namespace). Bindings before the failing one
    /// stay declared.
    pub fn namespaces<I, P, U>(&self, bindings: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, U)>,
        P: AsRef<str>,
        U: AsRef<str>,
    {
        for (prefix, uri) in bindings {
            self.namespace(prefix.as_ref(), uri.as_ref())?;
        }
        Ok(self.clone())
    }

    // --- Content ---

    /// Appends text to the current element, merging with a text node that
    /// is already last.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the current node is not an
    /// element.
    pub fn text(&self, value: &str) -> Result<Self> {
        self.set_text(Some(value), false)
    }

    /// Replaces every text child of the current element with `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the current node is not an
    /// element.
    pub fn text_replace(&self, value: &str) -> Result<Self> {
        self.set_text(Some(value), true)
    }

    /// The general form of [`text`](Self::text) and
    /// [`text_replace`](Self::text_replace) for values that may be absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] with the message
    /// `Illegal null text value` when `value` is `None`, before anything is
    /// changed, and [`Error::InvalidState`] if the current node is not an
    /// element.
    pub fn set_text(&self, value: Option<&str>, replace: bool) -> Result<Self> {
        self.doc
            .borrow_mut()
            .append_text(self.node, value, replace)?;
        trace!(element = self.node.into_raw(), replace, "set text");
        Ok(self.clone())
    }

    /// Appends a CDATA section. Byte payloads are stored base64 encoded,
    /// strings as written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the current node is not an
    /// element.
    pub fn cdata<'d>(&self, data: impl Into<EncodedData<'d>>) -> Result<Self> {
        self.doc
            .borrow_mut()
            .append_encoded_data(self.node, data.into())?;
        trace!(element = self.node.into_raw(), "appended cdata");
        Ok(self.clone())
    }

    /// Appends a comment to the current element or, at the document node,
    /// after the existing top-level nodes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the text contains `--` or ends
    /// with `-`, and [`Error::InvalidState`] at a node that cannot hold
    /// children.
    pub fn comment(&self, text: &str) -> Result<Self> {
        if text.contains("--") || text.ends_with('-') {
            return Err(Error::InvalidArgument(format!(
                "Invalid comment text \"{text}\""
            )));
        }
        self.append_leaf(NodeKind::Comment {
            content: text.to_owned(),
        })?;
        Ok(self.clone())
    }

    /// Appends an unexpanded entity reference, written out as `&name;`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an invalid entity name and
    /// [`Error::InvalidState`] if the current node is not an element.
    pub fn reference(&self, name: &str) -> Result<Self> {
        if !is_ncname(name) {
            return Err(Error::InvalidArgument(format!(
                "Invalid entity name \"{name}\""
            )));
        }
        if !self.doc.borrow().is_element(self.node) {
            return Err(Error::invalid_state(
                "entity references can only be added to elements",
            ));
        }
        self.append_leaf(NodeKind::EntityRef {
            name: name.to_owned(),
        })?;
        Ok(self.clone())
    }

    /// Appends a processing instruction as the last child of the current
    /// node. At the document node it follows the root element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an invalid target or data
    /// containing `?>`, and [`Error::InvalidState`] at a node that cannot
    /// hold children.
    pub fn instruction(&self, target: &str, data: &str) -> Result<Self> {
        let pi = processing_instruction(target, data)?;
        self.append_leaf(pi)?;
        Ok(self.clone())
    }

    /// Inserts a processing instruction as the first child of the document
    /// node, ahead of the root element, wherever this builder is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an invalid target or data
    /// containing `?>`.
    pub fn insert_instruction(&self, target: &str, data: &str) -> Result<Self> {
        let pi = processing_instruction(target, data)?;
        let mut doc = self.doc.borrow_mut();
        let id = doc.create_node(pi);
        let document = doc.root();
        doc.prepend_child(document, id);
        trace!(target = %target, "inserted document instruction");
        Ok(self.clone())
    }

    fn append_leaf(&self, kind: NodeKind) -> Result<NodeId> {
        let mut doc = self.doc.borrow_mut();
        if !matches!(
            doc.node(self.node).kind,
            NodeKind::Element { .. } | NodeKind::Document
        ) {
            return Err(Error::invalid_state(format!(
                "cannot append a {} to a {} node",
                kind.label(),
                doc.node(self.node).kind.label()
            )));
        }
        let label = kind.label();
        let id = doc.create_node(kind);
        doc.append_child(self.node, id);
        trace!(kind = label, parent = self.node.into_raw(), "appended node");
        Ok(id)
    }

    /// Removes every whitespace-only text node below the current node.
    /// CDATA sections are never removed.
    #[must_use]
    pub fn strip_whitespace_only_text(&self) -> Self {
        let removed = self
            .doc
            .borrow_mut()
            .strip_whitespace_only_text(self.node);
        debug!(removed, "stripped whitespace-only text");
        self.clone()
    }

    /// Marks the document standalone (or not) for serialization.
    #[must_use]
    pub fn set_standalone(&self, standalone: bool) -> Self {
        self.doc.borrow_mut().set_standalone(standalone);
        self.clone()
    }

    // --- Inspection ---

    /// The current node's id in the shared document.
    #[must_use]
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// Returns `true` when positioned at the document node.
    #[must_use]
    pub fn is_document(&self) -> bool {
        matches!(self.doc.borrow().node(self.node).kind, NodeKind::Document)
    }

    /// Qualified name of the current element.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        let doc = self.doc.borrow();
        doc.is_element(self.node)
            .then(|| doc.qualified_name(self.node))
            .flatten()
    }

    /// Local name of the current element.
    #[must_use]
    pub fn local_name(&self) -> Option<String> {
        let doc = self.doc.borrow();
        doc.is_element(self.node)
            .then(|| doc.local_name(self.node).map(str::to_owned))
            .flatten()
    }

    /// Namespace URI of the current element.
    #[must_use]
    pub fn namespace_uri(&self) -> Option<String> {
        self.doc
            .borrow()
            .node_namespace(self.node)
            .map(str::to_owned)
    }

    /// Value of an attribute of the current element, by qualified name.
    #[must_use]
    pub fn attribute_value(&self, name: &str) -> Option<String> {
        self.doc
            .borrow()
            .attribute(self.node, name)
            .map(str::to_owned)
    }

    /// Concatenated text and CDATA content below the current node.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.doc.borrow().text_content(self.node)
    }

    /// Borrows the shared document.
    ///
    /// # Panics
    ///
    /// Panics if a builder over the same document is mid-edit, which can
    /// only happen from inside another borrow.
    #[must_use]
    pub fn doc(&self) -> Ref<'_, Document> {
        self.doc.borrow()
    }

    /// Mutably borrows the shared document.
    ///
    /// Nodes are never freed, so builders stay valid whatever is done
    /// through this guard, though a detached node no longer appears in
    /// output or queries.
    ///
    /// # Panics
    ///
    /// Panics if the document is already borrowed.
    #[must_use]
    pub fn doc_mut(&self) -> RefMut<'_, Document> {
        self.doc.borrow_mut()
    }

    /// Returns `true` if both builders share one document.
    #[must_use]
    pub fn same_document(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.doc, &other.doc)
    }

    /// Takes the document out of the builder. Other builders over the same
    /// document keep their own copy alive, so the document is cloned when
    /// any are left.
    #[must_use]
    pub fn into_document(self) -> Document {
        let shared = match Rc::try_unwrap(self.doc) {
            Ok(cell) => return cell.into_inner(),
            Err(shared) => shared,
        };
        let doc = Document::clone(&shared.borrow());
        doc
    }
}

impl PartialEq for XmlBuilder {
    fn eq(&self, other: &Self) -> bool {
        self.same_document(other) && self.node == other.node
    }
}

impl Eq for XmlBuilder {}

impl fmt::Debug for XmlBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let doc = self.doc.borrow();
        let kind = &doc.node(self.node).kind;
        f.debug_struct("XmlBuilder")
            .field("node", &self.node)
            .field("kind", &kind.label())
            .field("name", &doc.qualified_name(self.node))
            .finish()
    }
}

/// Picks the namespace for a new element: the explicit URI, or whatever
/// its prefix (the default namespace when unprefixed) is bound to at
/// `scope`.
fn resolve_namespace(
    doc: &Document,
    scope: NodeId,
    name: &str,
    namespace: Option<&str>,
) -> Option<String> {
    match namespace {
        Some(uri) => Some(uri.to_owned()),
        None => doc
            .lookup_namespace_uri(scope, split_qname(name).0)
            .map(str::to_owned),
    }
}

fn processing_instruction(target: &str, data: &str) -> Result<NodeKind> {
    if !is_ncname(target) || target.eq_ignore_ascii_case("xml") {
        return Err(Error::InvalidArgument(format!(
            "Invalid processing instruction target \"{target}\""
        )));
    }
    if data.contains("?>") {
        return Err(Error::InvalidArgument(
            "Processing instruction data must not contain \"?>\"".to_owned(),
        ));
    }
    Ok(NodeKind::ProcessingInstruction {
        target: target.to_owned(),
        data: (!data.is_empty()).then(|| data.to_owned()),
    })
}
