//! Workflow pipelines orchestrating stateless services.

pub mod extend;
