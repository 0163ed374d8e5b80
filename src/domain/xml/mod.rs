//! Namespace-aware XML tree used for signature and manifest documents.

pub mod document;
pub mod namespaces;

pub use document::{Attribute, NodeId, XmlDocument};
pub use namespaces::NamespaceTable;
