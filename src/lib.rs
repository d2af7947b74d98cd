//! # xmlbuilder
//!
//! Cursor-style construction, in-place editing and namespace-aware `XPath`
//! querying of XML documents.
//!
//! An [`XmlBuilder`] always points at one node of a shared, arena-backed
//! [`Document`]. Edits go through the builder and hand back builders for
//! the nodes they create, so documents read top to bottom in code the way
//! they read as markup.
//!
//! ## Quick Start
//!
//! ```
//! use xmlbuilder::{OutputProperties, XmlBuilder};
//!
//! let builder = XmlBuilder::create("Projects", None)?
//!     .element("java-xmlbuilder", None)?
//!     .attribute("language", "Java")?
//!     .attribute("scm", "SVN")?
//!     .element("Location", None)?
//!     .attribute("type", "URL")?
//!     .text("http://code.google.com/p/java-xmlbuilder/")?
//!     .root();
//!
//! let location = builder.find_element("//Location", None)?;
//! assert_eq!(location.attribute_value("type").as_deref(), Some("URL"));
//!
//! let props = OutputProperties::new().indent(true).omit_xml_declaration(true);
//! println!("{}", builder.as_string_with(&props)?);
//! # Ok::<(), xmlbuilder::Error>(())
//! ```
//!
//! ## Namespaces
//!
//! Elements created without a namespace URI inherit the one bound to their
//! prefix where they are inserted. Queries see namespaces through a
//! [`NamespaceContext`], typically built from the document and then given
//! extra aliases; `:local` selects an element in the context's default
//! namespace.

pub mod builder;
pub mod encoding;
pub mod error;
pub mod namespace;
pub mod parser;
pub mod serial;
pub mod tree;
pub mod util;
pub mod xpath;

pub use builder::XmlBuilder;
pub use error::{Error, ParseError, QueryError, Result};
pub use namespace::NamespaceContext;
pub use serial::OutputProperties;
pub use tree::{Attribute, Document, EncodedData, NodeId, NodeKind};
pub use xpath::{QueryValue, ResultKind, XPathNode};
