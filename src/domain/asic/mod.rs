//! ASiC-E container domain model.

pub mod archive;

pub use archive::{Archive, Compression, Member};
