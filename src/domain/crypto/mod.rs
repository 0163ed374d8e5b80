//! Cryptographic value types.

mod digest;

pub use digest::{DigestLengthError, Sha256Digest};
