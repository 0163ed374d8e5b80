//! Adapter layer modules for external system integration.
//!
//! Provides the HTTP client that exchanges RFC3161 messages with a
//! Time-Stamp Authority.

pub mod timestamp_http_client;
