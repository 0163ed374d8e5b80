//! Fixed prefix → namespace URI lookup table.
//!
//! The table is immutable configuration passed to the path resolver and the
//! validator; there is no process-wide mutable registry.

use crate::domain::constants::{ASIC_NS, MANIFEST_NS, XADES_NS, XMLDSIG_NS, XZEP_NS};

/// Immutable mapping from conventional prefixes to namespace URIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceTable {
    entries: &'static [(&'static str, &'static str)],
    /// Prefixes expected to be bound on a signature root element
    expected_on_signature: &'static [&'static str],
}

impl NamespaceTable {
    /// Prefixes used by ASiC-E XAdES signatures and the ODF manifest.
    pub const XADES: NamespaceTable = NamespaceTable {
        entries: &[
            ("ds", XMLDSIG_NS),
            ("xades", XADES_NS),
            ("asic", ASIC_NS),
            ("xzep", XZEP_NS),
            ("manifest", MANIFEST_NS),
        ],
        expected_on_signature: &["ds", "xades", "xzep"],
    };

    /// URI bound to `prefix`, if the table knows it.
    #[must_use]
    pub fn uri(&self, prefix: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(known, _)| *known == prefix)
            .map(|(_, uri)| *uri)
    }

    /// `(prefix, uri)` pairs a signature root should have in scope.
    pub fn signature_bindings(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.expected_on_signature
            .iter()
            .filter_map(|prefix| self.uri(prefix).map(|uri| (*prefix, uri)))
    }
}

impl Default for NamespaceTable {
    fn default() -> Self {
        Self::XADES
    }
}
