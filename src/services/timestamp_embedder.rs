//! Timestamp embedding service.
//!
//! Adds `UnsignedProperties/UnsignedSignatureProperties/SignatureTimeStamp/
//! EncapsulatedTimeStamp` under `QualifyingProperties`, reusing whichever of
//! those containers already exist. New elements take the prefix the
//! document already uses for `QualifyingProperties`.

use crate::domain::constants::XADES_NS;
use crate::domain::xades::{ReextensionPolicy, QUALIFYING_PROPERTIES_PATH};
use crate::domain::xml::{NamespaceTable, NodeId, XmlDocument};
use crate::infra::error::{TimestampingError, TimestampingResult};
use crate::services::signature_model::{count_signature_timestamps, extract_signature_root};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const SIGNED_PROPERTIES: &str = "SignedProperties";
const UNSIGNED_PROPERTIES: &str = "UnsignedProperties";
const UNSIGNED_SIGNATURE_PROPERTIES: &str = "UnsignedSignatureProperties";
const SIGNATURE_TIMESTAMP: &str = "SignatureTimeStamp";
const ENCAPSULATED_TIMESTAMP: &str = "EncapsulatedTimeStamp";

/// Embed a base64-encoded `TimeStampToken`, returning the new
/// `SignatureTimeStamp` element.
///
/// With [`ReextensionPolicy::Reject`] a signature that already carries a
/// `SignatureTimeStamp` fails with `AlreadyTimestamped` and the document is
/// left untouched; with `Append` a further sibling is added.
pub fn extend(
    doc: &mut XmlDocument,
    token_base64: &str,
    policy: ReextensionPolicy,
    table: &NamespaceTable,
) -> TimestampingResult<NodeId> {
    let token = token_base64.trim();
    if token.is_empty() || STANDARD.decode(token).is_err() {
        return Err(TimestampingError::ValidationError(
            "time-stamp token is not valid base64".into(),
        ));
    }

    let root = extract_signature_root(doc).ok_or_else(|| {
        TimestampingError::SignatureNotFound("no ds:Signature element in document".into())
    })?;
    let qualifying = doc
        .find_element(root, QUALIFYING_PROPERTIES_PATH, table)
        .ok_or(TimestampingError::QualifyingPropertiesMissing)?;

    let existing = count_signature_timestamps(doc);
    if existing > 0 {
        match policy {
            ReextensionPolicy::Reject => {
                return Err(TimestampingError::AlreadyTimestamped(existing));
            }
            ReextensionPolicy::Append => {
                log::info!("Signature already has {existing} timestamp(s); appending another");
            }
        }
    }

    let prefix = doc
        .prefix(qualifying)
        .map(|p| format!("{p}:"))
        .unwrap_or_default();

    let unsigned = match first_child(doc, qualifying, UNSIGNED_PROPERTIES) {
        Some(id) => id,
        None => {
            let id = doc.create_element(&format!("{prefix}{UNSIGNED_PROPERTIES}"));
            match doc
                .children_named(qualifying, XADES_NS, SIGNED_PROPERTIES)
                .last()
                .copied()
            {
                Some(signed) => doc.insert_after(signed, id)?,
                None => doc.append_child(qualifying, id),
            }
            log::debug!("Created {prefix}{UNSIGNED_PROPERTIES}");
            id
        }
    };

    let unsigned_signature = match first_child(doc, unsigned, UNSIGNED_SIGNATURE_PROPERTIES) {
        Some(id) => id,
        None => {
            let id = doc.create_element(&format!("{prefix}{UNSIGNED_SIGNATURE_PROPERTIES}"));
            // Schema order puts the signature properties ahead of any data object properties
            let first = doc.child_elements(unsigned).next();
            match first {
                Some(first) => doc.insert_before(first, id)?,
                None => doc.append_child(unsigned, id),
            }
            log::debug!("Created {prefix}{UNSIGNED_SIGNATURE_PROPERTIES}");
            id
        }
    };

    let timestamp = doc.create_element(&format!("{prefix}{SIGNATURE_TIMESTAMP}"));
    let encapsulated = doc.create_element(&format!("{prefix}{ENCAPSULATED_TIMESTAMP}"));
    doc.append_text(encapsulated, token);
    doc.append_child(timestamp, encapsulated);
    doc.append_child(unsigned_signature, timestamp);

    log::info!("Embedded SignatureTimeStamp ({} base64 chars)", token.len());
    Ok(timestamp)
}

fn first_child(doc: &XmlDocument, parent: NodeId, local: &str) -> Option<NodeId> {
    doc.children_named(parent, XADES_NS, local).first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signature_model::fixtures::BES_SIGNATURE;

    const TOKEN: &str = "MAMCAQA=";

    fn extended(text: &str, policy: ReextensionPolicy) -> TimestampingResult<XmlDocument> {
        let mut doc = XmlDocument::parse(text)?;
        extend(&mut doc, TOKEN, policy, &NamespaceTable::XADES)?;
        Ok(doc)
    }

    #[test]
    fn creates_unsigned_properties_after_signed_properties() {
        let doc = extended(BES_SIGNATURE, ReextensionPolicy::Append).unwrap();
        let expected = BES_SIGNATURE.replace(
            "</xades:SignedProperties>",
            "</xades:SignedProperties><xades:UnsignedProperties><xades:UnsignedSignatureProperties>\
             <xades:SignatureTimeStamp><xades:EncapsulatedTimeStamp>MAMCAQA=</xades:EncapsulatedTimeStamp>\
             </xades:SignatureTimeStamp></xades:UnsignedSignatureProperties></xades:UnsignedProperties>",
        );
        assert_eq!(doc.serialize(), expected);
    }

    #[test]
    fn second_extension_appends_sibling_timestamp() {
        let once = extended(BES_SIGNATURE, ReextensionPolicy::Append).unwrap();
        let twice = extended(&once.serialize(), ReextensionPolicy::Append).unwrap();
        assert_eq!(count_signature_timestamps(&twice), 2);

        let table = NamespaceTable::XADES;
        let root = extract_signature_root(&twice).unwrap();
        let usp = twice
            .find_element(
                root,
                "ds:Object/xades:QualifyingProperties/xades:UnsignedProperties/xades:UnsignedSignatureProperties",
                &table,
            )
            .unwrap();
        assert_eq!(twice.children_named(usp, XADES_NS, SIGNATURE_TIMESTAMP).len(), 2);
        let qualifying = twice.find_element(root, QUALIFYING_PROPERTIES_PATH, &table).unwrap();
        assert_eq!(twice.children_named(qualifying, XADES_NS, UNSIGNED_PROPERTIES).len(), 1);
    }

    #[test]
    fn reject_policy_leaves_document_untouched() {
        let once = extended(BES_SIGNATURE, ReextensionPolicy::Append).unwrap();
        let text = once.serialize();
        let mut doc = XmlDocument::parse(&text).unwrap();
        let err = extend(&mut doc, TOKEN, ReextensionPolicy::Reject, &NamespaceTable::XADES)
            .unwrap_err();
        assert!(matches!(err, TimestampingError::AlreadyTimestamped(1)));
        assert_eq!(doc.serialize(), text);
    }

    #[test]
    fn existing_unsigned_properties_are_reused() {
        let text = BES_SIGNATURE.replace(
            "</xades:SignedProperties>",
            "</xades:SignedProperties><xades:UnsignedProperties><xades:UnsignedDataObjectProperties/></xades:UnsignedProperties>",
        );
        let doc = extended(&text, ReextensionPolicy::Append).unwrap();
        assert!(doc.serialize().contains(
            "<xades:UnsignedProperties><xades:UnsignedSignatureProperties><xades:SignatureTimeStamp>"
        ));
        assert!(doc
            .serialize()
            .contains("</xades:UnsignedSignatureProperties><xades:UnsignedDataObjectProperties/>"));
    }

    #[test]
    fn default_namespace_prefix_is_followed() {
        let text = BES_SIGNATURE
            .replace("<xades:QualifyingProperties ", "<QualifyingProperties xmlns=\"http://uri.etsi.org/01903/v1.3.2#\" ")
            .replace("</xades:QualifyingProperties>", "</QualifyingProperties>");
        let doc = extended(&text, ReextensionPolicy::Append).unwrap();
        assert!(doc
            .serialize()
            .contains("</xades:SignedProperties><UnsignedProperties><UnsignedSignatureProperties>"));
        assert_eq!(count_signature_timestamps(&doc), 1);
    }

    #[test]
    fn missing_qualifying_properties_is_reported() {
        let text = BES_SIGNATURE
            .replace("xades:QualifyingProperties", "xades:Other");
        let err = extended(&text, ReextensionPolicy::Append).unwrap_err();
        assert!(matches!(err, TimestampingError::QualifyingPropertiesMissing));
    }

    #[test]
    fn invalid_token_is_refused() {
        let mut doc = XmlDocument::parse(BES_SIGNATURE).unwrap();
        let err = extend(&mut doc, "not base64!", ReextensionPolicy::Append, &NamespaceTable::XADES)
            .unwrap_err();
        assert!(matches!(err, TimestampingError::ValidationError(_)));
    }
}
