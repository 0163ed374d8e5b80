//! XAdES signature document model service.
//!
//! Locates the `ds:Signature` element (directly or inside an
//! `XAdESSignatures` wrapper), validates that it has the shape of a
//! XAdES-BES signature, and drives a signature through its lifecycle.

use crate::domain::constants::{XADES_NS, XMLDSIG_NS};
use crate::domain::xades::{
    ReextensionPolicy, SignatureState, ValidationReport, REQUIRED_SIGNATURE_PATHS,
};
use crate::domain::xml::{NamespaceTable, NodeId, XmlDocument};
use crate::infra::error::{TimestampingError, TimestampingResult};
use crate::services::timestamp_embedder;

const SIGNATURE: &str = "Signature";
const WRAPPER: &str = "XAdESSignatures";
const SIGNATURE_TIMESTAMP: &str = "SignatureTimeStamp";

/// Parse signature XML text.
pub fn parse(text: &str) -> TimestampingResult<XmlDocument> {
    XmlDocument::parse(text)
}

/// The `ds:Signature` element of the document.
///
/// Returns the root when it is a dsig `Signature`, the first dsig
/// `Signature` child when the root is an `XAdESSignatures` wrapper (matched
/// by local name only), and `None` otherwise.
#[must_use]
pub fn extract_signature_root(doc: &XmlDocument) -> Option<NodeId> {
    let root = doc.root_element()?;
    if is_dsig_signature(doc, root) {
        return Some(root);
    }
    if doc.local_name(root) == Some(WRAPPER) {
        return doc
            .child_elements(root)
            .find(|child| is_dsig_signature(doc, *child));
    }
    None
}

fn is_dsig_signature(doc: &XmlDocument, id: NodeId) -> bool {
    doc.local_name(id) == Some(SIGNATURE) && doc.namespace_uri(id).as_deref() == Some(XMLDSIG_NS)
}

/// Check that the document holds a structurally complete XAdES-BES signature.
///
/// Never fails: every problem found is collected into the report. A missing
/// signature root is the only finding reported when it occurs.
#[must_use]
pub fn validate(doc: &XmlDocument, table: &NamespaceTable) -> ValidationReport {
    let Some(root) = extract_signature_root(doc) else {
        return ValidationReport::from_findings(
            vec!["Root ds:Signature element not found".to_string()],
            Vec::new(),
        );
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for path in REQUIRED_SIGNATURE_PATHS {
        if doc.find_element(root, path, table).is_none() {
            errors.push(format!("Missing required element {path}"));
        }
    }

    let scope = doc.in_scope_namespaces(root);
    for (prefix, uri) in table.signature_bindings() {
        match scope.get(prefix) {
            None => warnings.push(format!(
                "Namespace prefix '{prefix}' is not declared on the signature root"
            )),
            Some(bound) if bound != uri => errors.push(format!(
                "Namespace prefix '{prefix}' is bound to '{bound}' instead of '{uri}'"
            )),
            Some(_) => {}
        }
    }

    ValidationReport::from_findings(errors, warnings)
}

/// Serialize the (possibly modified) document.
#[must_use]
pub fn serialize(doc: &XmlDocument) -> String {
    doc.serialize()
}

/// Number of `xades:SignatureTimeStamp` elements under the signature root.
#[must_use]
pub fn count_signature_timestamps(doc: &XmlDocument) -> usize {
    let Some(root) = extract_signature_root(doc) else {
        return 0;
    };
    doc.descendant_elements(root)
        .into_iter()
        .filter(|id| {
            doc.local_name(*id) == Some(SIGNATURE_TIMESTAMP)
                && doc.namespace_uri(*id).as_deref() == Some(XADES_NS)
        })
        .count()
}

/// A signature document together with its lifecycle state.
///
/// State only moves forward: `Unvalidated` → `Validated` (BES shape
/// confirmed) → `Timestamped` (at least one timestamp embedded by this
/// value). Validating again after a mutation requires parsing afresh.
#[derive(Debug, Clone)]
pub struct XadesSignature {
    document: XmlDocument,
    state: SignatureState,
    table: NamespaceTable,
}

impl XadesSignature {
    pub fn parse(text: &str, table: NamespaceTable) -> TimestampingResult<Self> {
        Ok(Self {
            document: parse(text)?,
            state: SignatureState::Unvalidated,
            table,
        })
    }

    #[must_use]
    pub fn state(&self) -> SignatureState {
        self.state
    }

    #[must_use]
    pub fn document(&self) -> &XmlDocument {
        &self.document
    }

    /// Run structural validation; a passing report moves an unvalidated
    /// signature to `Validated`.
    pub fn validate(&mut self) -> ValidationReport {
        let report = validate(&self.document, &self.table);
        if report.valid && self.state == SignatureState::Unvalidated {
            self.state = SignatureState::Validated;
        }
        report
    }

    /// Validate and turn a failing report into `StructureInvalid`.
    pub fn require_valid(&mut self) -> TimestampingResult<ValidationReport> {
        let report = self.validate();
        if !report.valid {
            return Err(TimestampingError::StructureInvalid(report.errors));
        }
        for warning in &report.warnings {
            log::warn!("{warning}");
        }
        Ok(report)
    }

    /// The `ds:SignatureValue` element whose canonical bytes get timestamped.
    pub fn signature_value(&self) -> TimestampingResult<NodeId> {
        let root = self.signature_root()?;
        self.document
            .find_element(root, "ds:SignatureValue", &self.table)
            .ok_or_else(|| {
                TimestampingError::StructureInvalid(vec![
                    "Missing required element ds:SignatureValue".to_string(),
                ])
            })
    }

    fn signature_root(&self) -> TimestampingResult<NodeId> {
        extract_signature_root(&self.document).ok_or_else(|| {
            TimestampingError::SignatureNotFound("no ds:Signature element in document".into())
        })
    }

    /// Embed a base64 `TimeStampToken` as a new `SignatureTimeStamp`.
    ///
    /// Only a validated (or already timestamped) signature can be extended.
    pub fn extend(&mut self, token_base64: &str, policy: ReextensionPolicy) -> TimestampingResult<()> {
        if self.state == SignatureState::Unvalidated {
            return Err(TimestampingError::ValidationError(
                "signature must pass validation before it can be extended".into(),
            ));
        }
        timestamp_embedder::extend(&mut self.document, token_base64, policy, &self.table)?;
        self.state = SignatureState::Timestamped;
        Ok(())
    }

    #[must_use]
    pub fn timestamp_count(&self) -> usize {
        count_signature_timestamps(&self.document)
    }

    #[must_use]
    pub fn serialize(&self) -> String {
        serialize(&self.document)
    }
}
