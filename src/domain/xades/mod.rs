//! XAdES signature domain types: lifecycle state, validation reports and
//! the element paths every BES signature must carry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Paths, relative to the signature root, that a XAdES-BES signature must contain.
pub const REQUIRED_SIGNATURE_PATHS: &[&str] = &[
    "ds:SignedInfo",
    "ds:SignatureValue",
    "ds:KeyInfo",
    "ds:Object/xades:QualifyingProperties/xades:SignedProperties/xades:SignedSignatureProperties",
];

/// Path from the signature root to `QualifyingProperties`.
pub const QUALIFYING_PROPERTIES_PATH: &str = "ds:Object/xades:QualifyingProperties";

/// Lifecycle of one signature document. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SignatureState {
    Unvalidated,
    /// Passed structural validation as XAdES-BES
    Validated,
    /// Carries at least one signature timestamp (XAdES-T)
    Timestamped,
}

impl fmt::Display for SignatureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureState::Unvalidated => f.write_str("unvalidated"),
            SignatureState::Validated => f.write_str("XAdES-BES"),
            SignatureState::Timestamped => f.write_str("XAdES-T"),
        }
    }
}

/// What to do when a signature that already carries a timestamp is extended again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReextensionPolicy {
    /// Add another `SignatureTimeStamp` sibling
    #[default]
    Append,
    /// Fail with `AlreadyTimestamped` before touching the document
    Reject,
}

impl ReextensionPolicy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReextensionPolicy::Append => "append",
            ReextensionPolicy::Reject => "reject",
        }
    }
}

impl FromStr for ReextensionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "append" => Ok(ReextensionPolicy::Append),
            "reject" => Ok(ReextensionPolicy::Reject),
            other => Err(format!(
                "unknown re-extension policy '{other}' (expected 'append' or 'reject')"
            )),
        }
    }
}

/// Aggregated outcome of a validation pass. Never an error by itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Build a report; validity is derived from the error list.
    #[must_use]
    pub fn from_findings(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}
