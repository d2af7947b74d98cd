//! Arena-based XML document tree.
//!
//! All nodes live in a contiguous `Vec<NodeData>` owned by the `Document`
//! and are referenced by `NodeId`, a newtype over `NonZeroU32`. Navigation
//! links (parent, first\_child, last\_child, next\_sibling, prev\_sibling)
//! are arena indices, so cloning or reparenting never invalidates a handle
//! held elsewhere.
//!
//! Nodes are never freed individually. Detaching a node makes it
//! unreachable but keeps its slot, which is what lets cursors hold plain
//! `NodeId`s across arbitrary edits.

mod node;

pub use node::NodeKind;

use std::num::NonZeroU32;

use tracing::debug;

use crate::encoding;
use crate::error::{Error, ParseError, Result};
use crate::util::qname::{is_ncname, is_whitespace_only, qualified_name, split_qname, QName};

/// The namespace URI permanently bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// A typed index into the document's node arena.
///
/// `Option<NodeId>` has the same size as `NodeId` thanks to the niche.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    #[allow(clippy::expect_used, clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::new(index as u32).expect("NodeId index must be non-zero"))
    }

    pub(crate) fn as_index(self) -> usize {
        self.0.get() as usize
    }

    /// Returns the raw, always non-zero arena index.
    #[must_use]
    pub fn into_raw(self) -> u32 {
        self.0.get()
    }
}

/// Storage for a single node in the document arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is and its payload.
    pub kind: NodeKind,
    /// Parent node. The document node and detached nodes have none.
    pub parent: Option<NodeId>,
    /// First child node.
    pub first_child: Option<NodeId>,
    /// Last child node (for O(1) append).
    pub last_child: Option<NodeId>,
    /// Next sibling.
    pub next_sibling: Option<NodeId>,
    /// Previous sibling.
    pub prev_sibling: Option<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
        }
    }
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The qualified name exactly as supplied, e.g. `xml:lang`.
    pub name: String,
    /// The unescaped value.
    pub value: String,
}

impl Attribute {
    /// The prefix part of the name, if any.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        split_qname(&self.name).0
    }

    /// The local part of the name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        split_qname(&self.name).1
    }
}

/// A namespace binding declared on an element.
///
/// The empty prefix stands for the default namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    /// Bound prefix, `""` for the default namespace.
    pub prefix: String,
    /// Namespace URI. Empty undeclares the default namespace.
    pub uri: String,
}

/// Payload accepted by [`Document::append_encoded_data`].
///
/// Byte payloads are base64 encoded before storage; text is stored as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedData<'a> {
    /// Raw bytes, stored base64 encoded.
    Bytes(&'a [u8]),
    /// Literal character data.
    Text(&'a str),
}

impl<'a> From<&'a [u8]> for EncodedData<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for EncodedData<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for EncodedData<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a> From<&'a str> for EncodedData<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(text)
    }
}

impl<'a> From<&'a String> for EncodedData<'a> {
    fn from(text: &'a String) -> Self {
        Self::Text(text)
    }
}

/// An XML document.
///
/// The `Document` owns all nodes in an arena. Navigation goes through
/// `&Document`, edits through `&mut Document`.
///
/// # Examples
///
/// ```
/// use xmlbuilder::Document;
///
/// let doc = Document::with_root("Projects", None).unwrap();
/// let root = doc.root_element().unwrap();
/// assert_eq!(doc.local_name(root), Some("Projects"));
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    /// The node arena. Index 0 is unused (placeholder for `NonZeroU32`).
    nodes: Vec<NodeData>,
    /// The document node id (not the root element).
    root: NodeId,
    /// XML version from the XML declaration (e.g., "1.0").
    pub version: Option<String>,
    /// Encoding from the XML declaration (e.g., "UTF-8").
    pub encoding: Option<String>,
    /// Standalone flag from the XML declaration or set by the caller.
    pub standalone: Option<bool>,
}

impl Document {
    /// Creates a new document holding only the document node.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(64);
        // Index 0: placeholder (NodeId uses NonZeroU32)
        nodes.push(NodeData::new(NodeKind::Document));
        nodes.push(NodeData::new(NodeKind::Document));
        Self {
            nodes,
            root: NodeId::from_index(1),
            version: None,
            encoding: None,
            standalone: None,
        }
    }

    /// Creates a document with a single, empty root element.
    ///
    /// With a namespace URI, the root is placed in that namespace and the
    /// binding for its prefix (or the default namespace) is declared on it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `name` is not a valid XML name.
    pub fn with_root(name: &str, namespace: Option<&str>) -> Result<Self> {
        let mut doc = Self::new();
        let element = doc.create_element(name, namespace.map(str::to_owned))?;
        if let Some(uri) = namespace {
            let prefix = split_qname(name).0.unwrap_or_default().to_owned();
            doc.declare_namespace(element, &prefix, uri)?;
        }
        let root = doc.root;
        doc.append_child(root, element);
        debug!(root = %name, namespace = ?namespace, "created document");
        Ok(doc)
    }

    /// Parses an XML string into a `Document`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the input is not well-formed XML.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlbuilder::Document;
    ///
    /// let doc = Document::parse_str("<root><child/></root>").unwrap();
    /// assert!(doc.root_element().is_some());
    /// ```
    pub fn parse_str(input: &str) -> Result<Self, ParseError> {
        crate::parser::parse_str(input)
    }

    /// Parses XML from raw bytes, detecting the encoding from a BOM or the
    /// XML declaration and transcoding to UTF-8 first.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the encoding cannot be determined, the bytes
    /// cannot be transcoded, or the resulting XML is not well-formed.
    pub fn parse_bytes(input: &[u8]) -> Result<Self, ParseError> {
        crate::parser::parse_bytes(input)
    }

    /// Returns the document node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the single top-level element, if there is one.
    #[must_use]
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root)
            .find(|&id| self.node(id).kind.is_element())
    }

    /// Returns the `NodeData` for the given node.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not allocated by this document.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Returns `true` if `id` is an element.
    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        self.node(id).kind.is_element()
    }

    /// Returns the local name of an element or the target of a PI.
    #[must_use]
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. }
            | NodeKind::ProcessingInstruction { target: name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the qualified name (`prefix:local`) of an element, or the
    /// target of a PI.
    #[must_use]
    pub fn qualified_name(&self, id: NodeId) -> Option<String> {
        match &self.node(id).kind {
            NodeKind::Element { name, prefix, .. } => {
                Some(qualified_name(prefix.as_deref(), name))
            }
            NodeKind::ProcessingInstruction { target, .. } => Some(target.clone()),
            _ => None,
        }
    }

    /// Returns the stored prefix of an element.
    #[must_use]
    pub fn node_prefix(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { prefix, .. } => prefix.as_deref(),
            _ => None,
        }
    }

    /// Returns the namespace URI of an element node, if any.
    #[must_use]
    pub fn node_namespace(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { namespace, .. } => namespace.as_deref(),
            _ => None,
        }
    }

    /// Returns the text of a text, CDATA, comment or PI node.
    #[must_use]
    pub fn node_text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Text { content }
            | NodeKind::Comment { content }
            | NodeKind::CData { content } => Some(content),
            NodeKind::ProcessingInstruction { data, .. } => data.as_deref(),
            _ => None,
        }
    }

    /// Returns the concatenated text of a node and all its descendants.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut result = String::new();
        self.collect_text(id, &mut result);
        result
    }

    fn collect_text(&self, id: NodeId, buf: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text { content } | NodeKind::CData { content } => {
                buf.push_str(content);
            }
            NodeKind::Element { .. } | NodeKind::Document => {
                for child in self.children(id) {
                    self.collect_text(child, buf);
                }
            }
            _ => {}
        }
    }

    /// Returns the attributes of an element node, empty for anything else.
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.node(id).kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Returns the value of an attribute by qualified name.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Returns the namespace declarations stored on an element.
    #[must_use]
    pub fn namespace_decls(&self, id: NodeId) -> &[NamespaceDecl] {
        match &self.node(id).kind {
            NodeKind::Element { namespaces, .. } => namespaces,
            _ => &[],
        }
    }

    /// Resolves `prefix` (`None` for the default namespace) in the scope of
    /// `id`.
    ///
    /// Walks from `id` up through its ancestors. At each element an
    /// explicit declaration wins, then the element's own prefix binding.
    /// An empty default declaration (`xmlns=""`) resolves to `None`.
    #[must_use]
    pub fn lookup_namespace_uri(&self, id: NodeId, prefix: Option<&str>) -> Option<&str> {
        let prefix = prefix.unwrap_or_default();
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        for ancestor in self.ancestors(id) {
            let NodeKind::Element {
                prefix: own_prefix,
                namespace,
                namespaces,
                ..
            } = &self.node(ancestor).kind
            else {
                continue;
            };
            if let Some(decl) = namespaces.iter().find(|d| d.prefix == prefix) {
                return (!decl.uri.is_empty()).then_some(decl.uri.as_str());
            }
            if let Some(uri) = namespace {
                if own_prefix.as_deref().unwrap_or_default() == prefix {
                    return Some(uri);
                }
            }
        }
        None
    }

    // --- Navigation ---

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child
    }

    /// Returns the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).last_child
    }

    /// Returns the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling
    }

    /// Returns the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev_sibling
    }

    /// Returns an iterator over the children of a node.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.node(id).first_child,
        }
    }

    /// Returns an iterator over a node and its ancestors (walking up to root).
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: Some(id),
        }
    }

    /// Returns an iterator over all descendants of a node (depth-first),
    /// excluding the node itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            root: id,
            next: self.first_child(id),
        }
    }

    /// Ranks every attached node by its position in document order.
    ///
    /// Arena indices do not reflect document order once nodes are inserted
    /// before existing siblings, so callers that need ordering use these
    /// ranks. The result is indexed by arena index; detached nodes rank
    /// `usize::MAX`.
    #[must_use]
    pub fn document_order(&self) -> Vec<usize> {
        let mut ranks = vec![usize::MAX; self.nodes.len()];
        ranks[self.root.as_index()] = 0;
        for (rank, id) in self.descendants(self.root).enumerate() {
            ranks[id.as_index()] = rank + 1;
        }
        ranks
    }

    // --- Structural mutation ---

    /// Allocates a new, detached node in the arena and returns its `NodeId`.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let index = self.nodes.len();
        self.nodes.push(NodeData::new(kind));
        NodeId::from_index(index)
    }

    /// Allocates a detached element from a qualified name.
    ///
    /// The prefix is stored verbatim; nothing checks that it is declared.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `name` is not a valid XML name.
    pub fn create_element(&mut self, name: &str, namespace: Option<String>) -> Result<NodeId> {
        let qname = QName::parse(name);
        if !qname.is_valid() {
            return Err(Error::InvalidArgument(format!(
                "Invalid element name \"{name}\""
            )));
        }
        Ok(self.create_node(NodeKind::Element {
            name: qname.local.to_owned(),
            prefix: qname.prefix.map(str::to_owned),
            namespace: namespace.filter(|uri| !uri.is_empty()),
            attributes: Vec::new(),
            namespaces: Vec::new(),
        }))
    }

    /// Appends a child node to the end of a parent's child list.
    ///
    /// `child` must be detached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.node(child).parent.is_none(),
            "child already has a parent; detach it first"
        );

        self.node_mut(child).parent = Some(parent);

        if let Some(last) = self.node(parent).last_child {
            self.node_mut(last).next_sibling = Some(child);
            self.node_mut(child).prev_sibling = Some(last);
            self.node_mut(parent).last_child = Some(child);
        } else {
            self.node_mut(parent).first_child = Some(child);
            self.node_mut(parent).last_child = Some(child);
        }
    }

    /// Inserts `new_child` immediately before `reference` in the parent's
    /// child list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if `reference` has no parent.
    pub fn insert_before(&mut self, reference: NodeId, new_child: NodeId) -> Result<()> {
        let parent = self
            .node(reference)
            .parent
            .ok_or_else(|| Error::invalid_state("cannot insert before a node without a parent"))?;
        self.link_before(parent, reference, new_child);
        Ok(())
    }

    /// Prepends a child node as the first child of a parent.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        match self.first_child(parent) {
            Some(first) => self.link_before(parent, first, child),
            None => self.append_child(parent, child),
        }
    }

    fn link_before(&mut self, parent: NodeId, reference: NodeId, new_child: NodeId) {
        debug_assert!(
            self.node(new_child).parent.is_none(),
            "new_child already has a parent; detach it first"
        );
        self.node_mut(new_child).parent = Some(parent);

        if let Some(prev) = self.node(reference).prev_sibling {
            self.node_mut(prev).next_sibling = Some(new_child);
            self.node_mut(new_child).prev_sibling = Some(prev);
        } else {
            self.node_mut(parent).first_child = Some(new_child);
        }

        self.node_mut(new_child).next_sibling = Some(reference);
        self.node_mut(reference).prev_sibling = Some(new_child);
    }

    /// Detaches a node from its parent. It stays allocated but unreachable.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };

        let prev = self.node(id).prev_sibling;
        let next = self.node(id).next_sibling;

        match prev {
            Some(p) => self.node_mut(p).next_sibling = next,
            None => self.node_mut(parent).first_child = next,
        }

        match next {
            Some(n) => self.node_mut(n).prev_sibling = prev,
            None => self.node_mut(parent).last_child = prev,
        }

        self.node_mut(id).parent = None;
        self.node_mut(id).prev_sibling = None;
        self.node_mut(id).next_sibling = None;
    }

    /// Returns the total number of nodes in the arena, detached ones included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1 // subtract placeholder at index 0
    }

    // --- Element content ---

    fn element_parts_mut(
        &mut self,
        id: NodeId,
    ) -> Result<(&mut Vec<Attribute>, &mut Vec<NamespaceDecl>)> {
        match &mut self.node_mut(id).kind {
            NodeKind::Element {
                attributes,
                namespaces,
                ..
            } => Ok((attributes, namespaces)),
            other => Err(Error::invalid_state(format!(
                "cannot modify a {} node as an element",
                other.label()
            ))),
        }
    }

    /// Sets an attribute on an element. An existing attribute with the same
    /// name keeps its position and takes the new value.
    ///
    /// `xmlns` and `xmlns:p` names are recorded as namespace declarations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if `id` is not an element and
    /// [`Error::InvalidArgument`] if `name` is not a valid XML name or an
    /// `xmlns:` name carries an invalid prefix.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        if name == "xmlns" {
            return self.declare_namespace(id, "", value);
        }
        if let Some(prefix) = name.strip_prefix("xmlns:") {
            if !is_ncname(prefix) {
                return Err(Error::InvalidArgument(format!(
                    "Invalid namespace prefix \"{prefix}\""
                )));
            }
            return self.declare_namespace(id, prefix, value);
        }
        if !QName::parse(name).is_valid() {
            return Err(Error::InvalidArgument(format!(
                "Invalid attribute name \"{name}\""
            )));
        }
        let (attributes, _) = self.element_parts_mut(id)?;
        match attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => value.clone_into(&mut existing.value),
            None => attributes.push(Attribute {
                name: name.to_owned(),
                value: value.to_owned(),
            }),
        }
        Ok(())
    }

    /// Declares a namespace binding on an element, replacing any binding
    /// already declared there for the same prefix. `""` is the default
    /// namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if `id` is not an element.
    pub fn declare_namespace(&mut self, id: NodeId, prefix: &str, uri: &str) -> Result<()> {
        let (_, namespaces) = self.element_parts_mut(id)?;
        match namespaces.iter_mut().find(|d| d.prefix == prefix) {
            Some(existing) => uri.clone_into(&mut existing.uri),
            None => namespaces.push(NamespaceDecl {
                prefix: prefix.to_owned(),
                uri: uri.to_owned(),
            }),
        }
        Ok(())
    }

    /// Adds character data to an element.
    ///
    /// With `replace`, every existing Text child is removed first. Otherwise
    /// the value is merged into a Text last child, or appended as a new
    /// Text node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an absent value and
    /// [`Error::InvalidState`] if `id` is not an element. Both checks run
    /// before anything is changed.
    pub fn append_text(&mut self, id: NodeId, value: Option<&str>, replace: bool) -> Result<()> {
        let value =
            value.ok_or_else(|| Error::InvalidArgument("Illegal null text value".to_owned()))?;
        self.element_parts_mut(id)?;

        if replace {
            let texts: Vec<NodeId> = self
                .children(id)
                .filter(|&child| self.node(child).kind.is_text())
                .collect();
            for text in texts {
                self.detach(text);
            }
        }

        if let Some(last) = self.last_child(id) {
            if let NodeKind::Text { content } = &mut self.node_mut(last).kind {
                content.push_str(value);
                return Ok(());
            }
        }
        let text = self.create_node(NodeKind::Text {
            content: value.to_owned(),
        });
        self.append_child(id, text);
        Ok(())
    }

    /// Appends a CDATA section to an element. Bytes are base64 encoded
    /// first; text is stored verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if `id` is not an element.
    pub fn append_encoded_data(&mut self, id: NodeId, data: EncodedData<'_>) -> Result<NodeId> {
        self.element_parts_mut(id)?;
        let content = match data {
            EncodedData::Bytes(bytes) => encoding::encode_base64(bytes),
            EncodedData::Text(text) => text.to_owned(),
        };
        let cdata = self.create_node(NodeKind::CData { content });
        self.append_child(id, cdata);
        Ok(cdata)
    }

    /// Removes every whitespace-only Text node below `id`, at any depth.
    ///
    /// CDATA sections, comments and other node kinds are left alone.
    /// Returns the number of nodes removed.
    pub fn strip_whitespace_only_text(&mut self, id: NodeId) -> usize {
        let doomed: Vec<NodeId> = self
            .descendants(id)
            .filter(|&node| match &self.node(node).kind {
                NodeKind::Text { content } => is_whitespace_only(content),
                _ => false,
            })
            .collect();
        for &node in &doomed {
            self.detach(node);
        }
        debug!(
            subtree = id.into_raw(),
            removed = doomed.len(),
            "stripped whitespace-only text"
        );
        doomed.len()
    }

    // --- Subtree copying ---

    /// Captures the subtree rooted at `id` in preorder.
    ///
    /// Each entry holds a node's kind and the snapshot index of its parent
    /// (`None` for the subtree root).
    #[must_use]
    pub fn snapshot(&self, id: NodeId) -> Vec<(NodeKind, Option<usize>)> {
        let mut out = Vec::new();
        self.snapshot_into(id, None, &mut out);
        out
    }

    fn snapshot_into(
        &self,
        id: NodeId,
        parent: Option<usize>,
        out: &mut Vec<(NodeKind, Option<usize>)>,
    ) {
        let index = out.len();
        out.push((self.node(id).kind.clone(), parent));
        for child in self.children(id) {
            self.snapshot_into(child, Some(index), out);
        }
    }

    /// Rebuilds a snapshot as the last child of `parent`, returning the new
    /// subtree root.
    pub fn graft(&mut self, parent: NodeId, snapshot: Vec<(NodeKind, Option<usize>)>) -> Option<NodeId> {
        let mut created: Vec<NodeId> = Vec::with_capacity(snapshot.len());
        for (kind, source_parent) in snapshot {
            let id = self.create_node(kind);
            let target = match source_parent {
                Some(index) => created[index],
                None => parent,
            };
            self.append_child(target, id);
            created.push(id);
        }
        created.first().copied()
    }

    /// Deep-copies `source_node` from another document and appends the copy
    /// as the last child of `parent`. Attributes and declarations are copied
    /// verbatim. The source document is untouched.
    pub fn import_subtree(
        &mut self,
        parent: NodeId,
        source: &Document,
        source_node: NodeId,
    ) -> Option<NodeId> {
        let snapshot = source.snapshot(source_node);
        let copied = snapshot.len();
        let imported = self.graft(parent, snapshot);
        debug!(parent = parent.into_raw(), copied, "imported subtree");
        imported
    }

    /// Marks the document as standalone (or not) for serialization.
    pub fn set_standalone(&mut self, standalone: bool) {
        self.standalone = Some(standalone);
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

// --- Iterators ---

/// Iterator over the children of a node.
pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).next_sibling;
        Some(current)
    }
}

/// Iterator over a node and its ancestors.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).parent;
        Some(current)
    }
}

/// Depth-first iterator over all descendants of a node.
pub struct Descendants<'a> {
    doc: &'a Document,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        if let Some(child) = self.doc.first_child(current) {
            self.next = Some(child);
            return Some(current);
        }

        if let Some(sibling) = self.doc.next_sibling(current) {
            self.next = Some(sibling);
            return Some(current);
        }

        // Walk up to find an ancestor with a next sibling
        let mut ancestor = self.doc.parent(current);
        while let Some(anc) = ancestor {
            if anc == self.root {
                break;
            }
            if let Some(sibling) = self.doc.next_sibling(anc) {
                self.next = Some(sibling);
                return Some(current);
            }
            ancestor = self.doc.parent(anc);
        }

        self.next = None;
        Some(current)
    }
}
