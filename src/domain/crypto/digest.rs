use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::domain::constants::SHA256_DIGEST_LENGTH;

/// SHA-256 digest value.
///
/// Invariant: always exactly 32 bytes.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct Sha256Digest([u8; SHA256_DIGEST_LENGTH]);

impl Sha256Digest {
    /// Hash `data` with SHA-256.
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, DigestLengthError> {
        let array: [u8; SHA256_DIGEST_LENGTH] =
            bytes.try_into().map_err(|_| DigestLengthError {
                expected: SHA256_DIGEST_LENGTH,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; SHA256_DIGEST_LENGTH] {
        &self.0
    }

    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha256Digest({})", self.to_hex())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("digest length mismatch (expected {expected}, actual {actual})")]
pub struct DigestLengthError {
    pub expected: usize,
    pub actual: usize,
}
