//! Error types for ASiC-E timestamping operations.
//!
//! Validation-style operations return aggregated reports instead of these
//! errors; everything else fails fast with the first variant it hits.

use thiserror::Error;

/// Result type for timestamping operations
pub type TimestampingResult<T> = Result<T, TimestampingError>;

/// Comprehensive error types for the extension pipeline
#[derive(Error, Debug, miette::Diagnostic)]
pub enum TimestampingError {
    #[error("Malformed archive: {0}")]
    #[diagnostic(help("the input must be a ZIP-based ASiC-E container"))]
    MalformedArchive(String),

    #[error("Missing signature: {0}")]
    MissingSignature(String),

    #[error("Signature not found: {0}")]
    SignatureNotFound(String),

    #[error("Manifest parse error: {0}")]
    ManifestParseError(String),

    #[error("XML parse error: {0}")]
    XmlParseError(String),

    #[error("Signature structure invalid: {}", .0.join("; "))]
    StructureInvalid(Vec<String>),

    #[error("QualifyingProperties element not found under the signature")]
    #[diagnostic(help("the signature must already be a XAdES-BES signature"))]
    QualifyingPropertiesMissing,

    #[error("Signature already carries {0} SignatureTimeStamp element(s)")]
    AlreadyTimestamped(usize),

    #[error("Time-Stamp Authority unavailable: {0}")]
    TsaUnavailable(String),

    #[error("Time-Stamp Authority returned {name} (status {status}){}", format_status_message(.message))]
    TsaRejected {
        status: u32,
        name: String,
        message: Option<String>,
    },

    #[error("Time-stamp response granted but carries no TimeStampToken")]
    TokenMissing,

    #[error("ASN.1 parse error: {0}")]
    AsnParseError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

fn format_status_message(message: &Option<String>) -> String {
    match message {
        Some(text) => format!(": {text}"),
        None => String::new(),
    }
}

impl From<std::io::Error> for TimestampingError {
    fn from(error: std::io::Error) -> Self {
        TimestampingError::IoError(error.to_string())
    }
}

impl From<zip::result::ZipError> for TimestampingError {
    fn from(error: zip::result::ZipError) -> Self {
        TimestampingError::MalformedArchive(error.to_string())
    }
}

impl From<quick_xml::Error> for TimestampingError {
    fn from(error: quick_xml::Error) -> Self {
        TimestampingError::XmlParseError(error.to_string())
    }
}

impl From<reqwest::Error> for TimestampingError {
    fn from(error: reqwest::Error) -> Self {
        TimestampingError::TsaUnavailable(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = TimestampingError::MalformedArchive("not a zip".to_string());
        assert_eq!(error.to_string(), "Malformed archive: not a zip");

        let error = TimestampingError::StructureInvalid(vec![
            "Missing ds:SignedInfo".to_string(),
            "Missing ds:KeyInfo".to_string(),
        ]);
        assert_eq!(
            error.to_string(),
            "Signature structure invalid: Missing ds:SignedInfo; Missing ds:KeyInfo"
        );
    }

    #[test]
    fn test_rejection_display_includes_status_string() {
        let error = TimestampingError::TsaRejected {
            status: 2,
            name: "rejection".to_string(),
            message: Some("bad request".to_string()),
        };
        let text = error.to_string();
        assert!(text.contains("rejection"));
        assert!(text.contains("bad request"));

        let bare = TimestampingError::TsaRejected {
            status: 3,
            name: "waiting".to_string(),
            message: None,
        };
        assert_eq!(
            bare.to_string(),
            "Time-Stamp Authority returned waiting (status 3)"
        );
    }

    #[test]
    fn test_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        match TimestampingError::from(io) {
            TimestampingError::IoError(msg) => assert!(msg.contains("gone")),
            _ => panic!("Wrong error type"),
        }
    }
}
