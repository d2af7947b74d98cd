//! XML serialization.
//!
//! Turns a `Document`, or a subtree of it, back into XML text under the
//! control of [`OutputProperties`], and encodes that text into the
//! configured charset for byte and writer output.

mod properties;
pub mod xml;

pub use properties::{OutputProperties, DEFAULT_INDENT_AMOUNT, XSLT_INDENT_AMOUNT};
pub use xml::{serialize_document, serialize_subtree, serialize_to_bytes, write_document};
