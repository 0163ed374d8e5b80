//! Canonical form of the `ds:SignatureValue` element.
//!
//! This is a pragmatic normalization rather than full Canonical XML: the
//! element is rendered with every in-scope namespace declaration it
//! inherits, then runs of whitespace are collapsed to a single space and
//! whitespace between tags is dropped. The bytes feed the message imprint
//! of the time-stamp request.

use crate::domain::crypto::Sha256Digest;
use crate::domain::xml::{NodeId, XmlDocument};
use crate::infra::error::{TimestampingError, TimestampingResult};
use quick_xml::escape::escape;

/// Canonical bytes of `element`.
pub fn canonicalize(doc: &XmlDocument, element: NodeId) -> TimestampingResult<Vec<u8>> {
    let qname = doc.qname(element).ok_or_else(|| {
        TimestampingError::ValidationError("canonicalization target is not an element".into())
    })?;

    let mut out = String::new();
    out.push('<');
    out.push_str(qname);
    for (prefix, uri) in doc.in_scope_namespaces(element) {
        if prefix.is_empty() {
            out.push_str(" xmlns=\"");
        } else {
            out.push_str(" xmlns:");
            out.push_str(&prefix);
            out.push_str("=\"");
        }
        out.push_str(&escape(uri.as_str()));
        out.push('"');
    }
    for attr in doc.attributes(element) {
        if attr.name == "xmlns" || attr.name.starts_with("xmlns:") {
            continue;
        }
        out.push(' ');
        out.push_str(&attr.name);
        out.push_str("=\"");
        out.push_str(&escape(attr.value.as_str()));
        out.push('"');
    }
    out.push('>');
    for child in doc.children(element) {
        out.push_str(&doc.serialize_node(*child));
    }
    out.push_str("</");
    out.push_str(qname);
    out.push('>');

    let canonical = normalize_whitespace(&out);
    log::debug!("Canonical {qname}: {} bytes", canonical.len());
    Ok(canonical.into_bytes())
}

/// SHA-256 of the canonical bytes of `element`.
pub fn digest(doc: &XmlDocument, element: NodeId) -> TimestampingResult<Sha256Digest> {
    Ok(Sha256Digest::compute(&canonicalize(doc, element)?))
}

/// Collapse whitespace runs to one space, then drop the space left between
/// adjacent tags.
fn normalize_whitespace(input: &str) -> String {
    let mut collapsed = String::with_capacity(input.len());
    let mut in_run = false;
    for c in input.chars() {
        if c.is_whitespace() {
            if !in_run {
                collapsed.push(' ');
                in_run = true;
            }
        } else {
            in_run = false;
            collapsed.push(c);
        }
    }
    collapsed.replace("> <", "><")
}
