//! Node type definitions.
//!
//! The `NodeKind` enum represents every node type a builder document can
//! hold. Each variant carries its node-type-specific payload; navigation
//! links live in `NodeData`.

use super::{Attribute, NamespaceDecl};

/// The kind of an XML node and its associated data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document node, the conceptual container of the root element and
    /// any document-level instructions or comments. Exactly one per
    /// `Document`.
    Document,

    /// An element node, e.g. `<p:item id="1">`.
    Element {
        /// The local part of the qualified name.
        name: String,
        /// Namespace prefix, kept verbatim even when it resolves to nothing.
        prefix: Option<String>,
        /// Namespace URI the element belongs to, if any.
        namespace: Option<String>,
        /// Attributes in insertion order. Names are unique per element.
        attributes: Vec<Attribute>,
        /// Namespace bindings declared on this element (not inherited copies).
        namespaces: Vec<NamespaceDecl>,
    },

    /// Character data.
    Text {
        /// The unescaped text.
        content: String,
    },

    /// A CDATA section. Never treated as strippable whitespace.
    CData {
        /// The literal section content.
        content: String,
    },

    /// A comment, e.g. `<!-- note -->`.
    Comment {
        /// The comment text without delimiters.
        content: String,
    },

    /// A processing instruction, e.g. `<?target data?>`.
    ProcessingInstruction {
        /// The PI target.
        target: String,
        /// The PI data, if any.
        data: Option<String>,
    },

    /// An unexpanded entity reference such as `&nbsp;`.
    EntityRef {
        /// The entity name without `&` and `;`.
        name: String,
    },
}

impl NodeKind {
    /// Returns `true` for element nodes.
    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element { .. })
    }

    /// Returns `true` for text nodes (CDATA sections excluded).
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }

    /// Short lowercase label used in diagnostics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Element { .. } => "element",
            Self::Text { .. } => "text",
            Self::CData { .. } => "cdata",
            Self::Comment { .. } => "comment",
            Self::ProcessingInstruction { .. } => "processing-instruction",
            Self::EntityRef { .. } => "entity-reference",
        }
    }
}
