//! Timestamp request builder service.
//!
//! Service for building RFC3161 `TimeStampReq` structures from a SHA-256
//! message imprint.

use crate::domain::constants::{SHA256_ALGORITHM_OID, TS_REQ_VERSION_1};
use crate::domain::crypto::Sha256Digest;
use crate::domain::der::DerNode;

/// Service for building RFC3161 timestamp requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampRequestBuilder;

impl TimestampRequestBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// DER-encode a `TimeStampReq` for `imprint`.
    ///
    /// ```text
    /// TimeStampReq ::= SEQUENCE {
    ///     version          INTEGER { v1(1) },
    ///     messageImprint   MessageImprint,
    ///     certReq          BOOLEAN DEFAULT FALSE }
    /// ```
    ///
    /// No policy, nonce or extensions are sent. `certReq` is a plain
    /// universal BOOLEAN set to TRUE.
    #[must_use]
    pub fn build_request(&self, imprint: &Sha256Digest) -> Vec<u8> {
        let request = DerNode::Sequence(vec![
            DerNode::integer_from_u64(TS_REQ_VERSION_1),
            Self::message_imprint(imprint),
            DerNode::Boolean(true),
        ]);
        let der = request.to_der();
        log::debug!(
            "Built RFC3161 timestamp request: {} bytes for imprint {}",
            der.len(),
            imprint.to_hex()
        );
        der
    }

    /// `MessageImprint ::= SEQUENCE { hashAlgorithm AlgorithmIdentifier, hashedMessage OCTET STRING }`
    fn message_imprint(imprint: &Sha256Digest) -> DerNode {
        DerNode::Sequence(vec![
            DerNode::Sequence(vec![
                DerNode::ObjectIdentifier(SHA256_ALGORITHM_OID.to_vec()),
                DerNode::Null,
            ]),
            DerNode::OctetString(imprint.as_bytes().to_vec()),
        ])
    }
}
