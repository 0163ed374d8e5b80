//! Timestamp response parsing service.
//!
//! Decodes an RFC3161 `TimeStampResp`, maps the PKI status to success or a
//! `TsaRejected` error, and hands back the `TimeStampToken` as base64 DER.

use crate::domain::constants::PKCS7_SIGNED_DATA_OID;
use crate::domain::der::DerNode;
use crate::infra::error::{TimestampingError, TimestampingResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;

/// `PKIStatus` values defined by RFC 3161.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkiStatus {
    Granted,
    GrantedWithMods,
    Rejection,
    Waiting,
    RevocationWarning,
    RevocationNotification,
}

impl PkiStatus {
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(PkiStatus::Granted),
            1 => Some(PkiStatus::GrantedWithMods),
            2 => Some(PkiStatus::Rejection),
            3 => Some(PkiStatus::Waiting),
            4 => Some(PkiStatus::RevocationWarning),
            5 => Some(PkiStatus::RevocationNotification),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, PkiStatus::Granted | PkiStatus::GrantedWithMods)
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            PkiStatus::Granted => "granted",
            PkiStatus::GrantedWithMods => "grantedWithMods",
            PkiStatus::Rejection => "rejection",
            PkiStatus::Waiting => "waiting",
            PkiStatus::RevocationWarning => "revocationWarning",
            PkiStatus::RevocationNotification => "revocationNotification",
        }
    }
}

impl fmt::Display for PkiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded `TimeStampResp`.
#[derive(Debug, Clone)]
pub struct TimestampResponse {
    pub status_code: u32,
    /// First `statusString` entry, if any
    pub status_text: Option<String>,
    /// The `TimeStampToken` node, when present
    pub token: Option<DerNode>,
}

/// Decode the outer structure of a `TimeStampResp` without judging its status.
///
/// ```text
/// TimeStampResp ::= SEQUENCE {
///     status          PKIStatusInfo,
///     timeStampToken  TimeStampToken OPTIONAL }
/// PKIStatusInfo ::= SEQUENCE {
///     status          PKIStatus,
///     statusString    PKIFreeText OPTIONAL,
///     failInfo        PKIFailureInfo OPTIONAL }
/// ```
pub fn parse_response(der: &[u8]) -> TimestampingResult<TimestampResponse> {
    let response = DerNode::from_der(der)?;
    let fields = response.children().ok_or_else(|| {
        asn_error(format!("TimeStampResp must be a SEQUENCE, found {}", response.kind()))
    })?;
    let status_info = fields
        .first()
        .ok_or_else(|| asn_error("TimeStampResp is empty".into()))?;
    let status_fields = match status_info {
        DerNode::Sequence(children) => children,
        other => {
            return Err(asn_error(format!(
                "PKIStatusInfo must be a SEQUENCE, found {}",
                other.kind()
            )))
        }
    };
    let status_code = status_fields
        .first()
        .ok_or_else(|| asn_error("PKIStatusInfo has no status".into()))?
        .as_u32()?;
    let status_text = status_fields.iter().skip(1).find_map(|field| match field {
        DerNode::Sequence(texts) => texts.iter().find_map(|text| match text {
            DerNode::Utf8String(value) => Some(value.clone()),
            _ => None,
        }),
        _ => None,
    });

    let token = match fields.get(1) {
        None => None,
        Some(node @ DerNode::Sequence(_)) => Some(node.clone()),
        Some(other) => {
            return Err(asn_error(format!(
                "TimeStampToken must be a SEQUENCE, found {}",
                other.kind()
            )))
        }
    };

    Ok(TimestampResponse {
        status_code,
        status_text,
        token,
    })
}

/// Extract the base64 DER `TimeStampToken` from a successful response.
///
/// `granted` and `grantedWithMods` succeed; every other status becomes
/// `TsaRejected` with the status name and first status string.
pub fn extract_time_stamp_token(der: &[u8]) -> TimestampingResult<String> {
    let response = parse_response(der)?;
    let status = PkiStatus::from_code(response.status_code);
    match status {
        Some(status) if status.is_success() => {
            if status == PkiStatus::GrantedWithMods {
                log::warn!("Time-Stamp Authority granted the request with modifications");
            }
        }
        _ => {
            return Err(TimestampingError::TsaRejected {
                status: response.status_code,
                name: status.map_or("unknown", |s| s.name()).to_string(),
                message: response.status_text,
            })
        }
    }

    let token = response.token.ok_or(TimestampingError::TokenMissing)?;
    let token_der = token.to_der();
    log::debug!("TimeStampToken: {} bytes", token_der.len());
    Ok(STANDARD.encode(token_der))
}

/// Content-type OID of a `TimeStampToken` (a CMS `ContentInfo`) in dotted form.
pub fn timestamp_token_info(token_der: &[u8]) -> TimestampingResult<String> {
    let content_info = DerNode::from_der(token_der)?;
    let content_type = content_info
        .children()
        .and_then(|fields| fields.first())
        .ok_or_else(|| asn_error("ContentInfo must be a non-empty SEQUENCE".into()))?;
    let oid = content_type
        .oid_string()
        .ok_or_else(|| asn_error(format!("ContentInfo contentType is {}", content_type.kind())))?;
    if *content_type != DerNode::ObjectIdentifier(PKCS7_SIGNED_DATA_OID.to_vec()) {
        log::warn!("TimeStampToken content type {oid} is not signedData");
    }
    Ok(oid)
}

fn asn_error(message: String) -> TimestampingError {
    TimestampingError::AsnParseError(message)
}
