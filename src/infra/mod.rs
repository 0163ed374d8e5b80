//! Infrastructure layer for cross-cutting concerns.
//!
//! Provides configuration management and the crate error type.

pub mod config;
pub mod error;
