//! ASiC-E Timestamper Library
//!
//! Upgrades the XAdES-BES signature inside an ASiC-E container to XAdES-T by
//! embedding an RFC 3161 signature timestamp obtained from a Time-Stamp
//! Authority. The container, the signature document and the manifest are
//! rewritten without disturbing any byte the upgrade does not need to touch.

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod pipelines;
pub mod services;

use std::path::Path;

pub use adapters::timestamp_http_client::{
    TimeStampAuthority, TimestampHttpClient, TimestampHttpConfig,
};
pub use domain::types::{SignaturePath, TsaUrl};
pub use domain::xades::{ReextensionPolicy, SignatureState, ValidationReport};
pub use infra::config::{ConfigManager, ExtenderConfiguration};
pub use infra::error::{TimestampingError, TimestampingResult};
pub use pipelines::extend::{inspect_container, ContainerReport, ExtendOutcome, ExtendWorkflow};

/// Extend the container at `input_path` and write the result to `output_path`.
///
/// The output file is only created once the whole pipeline has succeeded; it
/// is written to a temporary file next to the destination and then moved
/// into place.
pub async fn extend_container_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input_path: P,
    output_path: Q,
    config: &ExtenderConfiguration,
) -> TimestampingResult<ExtendOutcome> {
    let input_path = input_path.as_ref();
    let output_path = output_path.as_ref();
    log::info!("Extending container {}", input_path.display());

    let input = tokio::fs::read(input_path).await.map_err(|e| {
        TimestampingError::IoError(format!(
            "Failed to read input file {}: {e}",
            input_path.display()
        ))
    })?;

    let workflow = ExtendWorkflow::from_config(config)?;
    let outcome = workflow.extend_container(&input).await?;

    write_atomically(output_path, &outcome.container)?;
    log::info!("Wrote XAdES-T container to {}", output_path.display());
    Ok(outcome)
}

/// Write `bytes` to `path` via a temporary file in the same directory.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> TimestampingResult<()> {
    use std::io::Write;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        TimestampingError::IoError(format!(
            "Failed to create temporary file in {}: {e}",
            dir.display()
        ))
    })?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| {
        TimestampingError::IoError(format!("Failed to write {}: {}", path.display(), e.error))
    })?;
    Ok(())
}
