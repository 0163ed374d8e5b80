//! Service layer module root.
//! Stateless operations over containers, signature documents and RFC3161 messages.

pub mod canonicalizer;
pub mod container_store;
pub mod manifest;
pub mod signature_model;
pub mod timestamp_embedder;
pub mod timestamp_parser;
pub mod timestamp_request_builder;

pub use manifest::{ManifestOutcome, ManifestUpdate};
pub use signature_model::XadesSignature;
pub use timestamp_parser::{PkiStatus, TimestampResponse};
pub use timestamp_request_builder::TimestampRequestBuilder;
