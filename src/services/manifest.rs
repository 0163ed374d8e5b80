//! Manifest digest update service.
//!
//! Rewrites the digest recorded for the signature member in
//! `META-INF/manifest.xml`. Everything outside the replaced digest text is
//! emitted exactly as read.

use crate::domain::crypto::Sha256Digest;
use crate::domain::types::SignaturePath;
use crate::domain::xml::{NodeId, XmlDocument};
use crate::infra::error::{TimestampingError, TimestampingResult};

const FILE_ENTRY: &str = "file-entry";
const FULL_PATH: &str = "full-path";
const DIGEST_VALUE: &str = "DigestValue";

/// What happened to the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestOutcome {
    /// The signature entry's digest now matches the new signature bytes
    DigestUpdated,
    /// No `file-entry` names the signature member; manifest left as is
    NoMatchingEntry,
    /// The signature entry carries no digest element; manifest left as is
    NoDigestElement,
}

/// Updated manifest text together with the outcome.
#[derive(Debug, Clone)]
pub struct ManifestUpdate {
    pub manifest: String,
    pub outcome: ManifestOutcome,
}

/// Replace the digest of `signature_path`'s manifest entry with the
/// base64 SHA-256 of `new_signature_bytes`.
///
/// No entry or digest element is ever invented: when either is missing the
/// input text is returned unchanged and the outcome says why.
pub fn update_manifest(
    manifest_xml: &str,
    new_signature_bytes: &[u8],
    signature_path: SignaturePath,
) -> TimestampingResult<ManifestUpdate> {
    let mut doc = XmlDocument::parse(manifest_xml).map_err(|e| match e {
        TimestampingError::XmlParseError(message) => TimestampingError::ManifestParseError(message),
        other => other,
    })?;

    let Some(entry) = find_entry(&doc, signature_path.as_str()) else {
        log::warn!("Manifest has no entry for {signature_path}; leaving it unchanged");
        return Ok(unchanged(manifest_xml, ManifestOutcome::NoMatchingEntry));
    };

    let Some(digest_node) = doc
        .child_elements(entry)
        .find(|child| doc.local_name(*child) == Some(DIGEST_VALUE))
    else {
        log::warn!("Manifest entry for {signature_path} has no {DIGEST_VALUE}; leaving it unchanged");
        return Ok(unchanged(manifest_xml, ManifestOutcome::NoDigestElement));
    };

    let digest = Sha256Digest::compute(new_signature_bytes).to_base64();
    log::debug!("Manifest digest for {signature_path} set to {digest}");
    doc.replace_text(digest_node, &digest);

    Ok(ManifestUpdate {
        manifest: doc.serialize(),
        outcome: ManifestOutcome::DigestUpdated,
    })
}

fn unchanged(manifest_xml: &str, outcome: ManifestOutcome) -> ManifestUpdate {
    ManifestUpdate {
        manifest: manifest_xml.to_string(),
        outcome,
    }
}

/// First `file-entry` whose `full-path` attribute (any prefix) equals `path`.
fn find_entry(doc: &XmlDocument, path: &str) -> Option<NodeId> {
    let root = doc.root_element()?;
    doc.descendant_elements(root).into_iter().find(|candidate| {
        doc.local_name(*candidate) == Some(FILE_ENTRY)
            && doc.attributes(*candidate).iter().any(|attr| {
                let local = attr.name.rsplit(':').next().unwrap_or(&attr.name);
                local == FULL_PATH && attr.value == path
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature_path() -> SignaturePath {
        SignaturePath::recognize("META-INF/signatures.xml").unwrap()
    }

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0">
  <manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.etsi.asic-e+zip"/>
  <manifest:file-entry manifest:full-path="document.txt" manifest:media-type="text/plain">
    <DigestValue>AAAA</DigestValue>
  </manifest:file-entry>
  <manifest:file-entry manifest:full-path="META-INF/signatures.xml" manifest:media-type="text/xml">
    <DigestValue Algorithm="sha256">stale==</DigestValue>
  </manifest:file-entry>
</manifest:manifest>
"#;

    #[test]
    fn replaces_only_the_signature_digest() {
        let update = update_manifest(MANIFEST, b"abc", signature_path()).unwrap();
        assert_eq!(update.outcome, ManifestOutcome::DigestUpdated);
        let expected = MANIFEST.replace(
            "stale==",
            "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0=",
        );
        assert_eq!(update.manifest, expected);
    }

    #[test]
    fn missing_entry_leaves_manifest_untouched() {
        let manifest = MANIFEST.replace("META-INF/signatures.xml", "META-INF/other.xml");
        let update = update_manifest(&manifest, b"abc", signature_path()).unwrap();
        assert_eq!(update.outcome, ManifestOutcome::NoMatchingEntry);
        assert_eq!(update.manifest, manifest);
    }

    #[test]
    fn entry_without_digest_is_left_alone() {
        let manifest = r#"<m:manifest xmlns:m="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0"><m:file-entry m:full-path="META-INF/signatures.xml"/></m:manifest>"#;
        let update = update_manifest(manifest, b"abc", signature_path()).unwrap();
        assert_eq!(update.outcome, ManifestOutcome::NoDigestElement);
        assert_eq!(update.manifest, manifest);
    }

    #[test]
    fn malformed_manifest_is_a_manifest_error() {
        let err = update_manifest("<manifest:manifest>", b"abc", signature_path()).unwrap_err();
        assert!(matches!(err, TimestampingError::ManifestParseError(_)));
    }
}
