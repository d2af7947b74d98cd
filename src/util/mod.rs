//! Utility modules.
//!
//! Contains `QName` splitting and XML name character classes.

pub mod qname;
