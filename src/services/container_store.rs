//! ASiC-E container store service.
//!
//! Reads a ZIP container into an [`Archive`], checks the members an ASiC-E
//! package must carry, and writes a new container with the `mimetype`
//! member first and stored.

use crate::domain::asic::{Archive, Compression, Member};
use crate::domain::constants::{ASICE_MIME_TYPE, MANIFEST_PATH, MIMETYPE_PATH, SIGNATURE_PATHS};
use crate::domain::types::SignaturePath;
use crate::domain::xades::ValidationReport;
use crate::infra::error::{TimestampingError, TimestampingResult};
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Read every member of a ZIP container into memory.
///
/// Fails with `MalformedArchive` when the bytes are not a readable ZIP or a
/// member the pipeline reads (`mimetype`, manifest, signature) uses a
/// compression method other than stored/deflated, and with
/// `MissingSignature` when no recognized signature member exists. Members
/// in any other method are kept undecoded and copied back raw.
pub fn extract(bytes: &[u8]) -> TimestampingResult<Archive> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;
    let mut members = Vec::with_capacity(zip.len());

    for index in 0..zip.len() {
        let (path, method, is_dir, comment) = {
            let file = zip.by_index_raw(index)?;
            (
                file.name().to_string(),
                file.compression(),
                file.is_dir(),
                file.comment().to_string(),
            )
        };
        let compression = match method {
            CompressionMethod::Stored => Compression::Stored,
            CompressionMethod::Deflated => Compression::Deflated,
            _ => Compression::Other,
        };

        let mut data = Vec::new();
        if !is_dir {
            if compression == Compression::Other {
                if is_read_by_pipeline(&path) {
                    return Err(TimestampingError::MalformedArchive(format!(
                        "member '{path}' uses unsupported compression method {method:?}"
                    )));
                }
                log::debug!("Member {path} uses {method:?}, copying it undecoded");
            } else {
                let mut file = zip.by_index(index)?;
                file.read_to_end(&mut data).map_err(|e| {
                    TimestampingError::MalformedArchive(format!("cannot read member '{path}': {e}"))
                })?;
            }
        }
        log::trace!("Read member {path} ({} bytes, {compression})", data.len());
        members.push(Member {
            path,
            data,
            is_dir,
            compression,
            comment,
            index: Some(index),
        });
    }

    let archive = Archive::new(members, zip.comment().to_vec()).with_source(bytes.to_vec());
    if locate_signature_path(&archive).is_err() {
        return Err(TimestampingError::MissingSignature(format!(
            "none of {} is present in the container",
            SIGNATURE_PATHS.join(", ")
        )));
    }
    log::debug!("Extracted {} member(s) from container", archive.len());
    Ok(archive)
}

fn is_read_by_pipeline(path: &str) -> bool {
    path == MIMETYPE_PATH || path == MANIFEST_PATH || SignaturePath::recognize(path).is_some()
}

fn has_file(archive: &Archive, path: &str) -> bool {
    archive.member(path).is_some_and(|member| !member.is_dir)
}

/// Path of the signature member.
///
/// When both recognized locations are present the first one in lookup order
/// wins.
pub fn locate_signature_path(archive: &Archive) -> TimestampingResult<SignaturePath> {
    let mut found = archive
        .members()
        .iter()
        .filter(|member| !member.is_dir)
        .filter_map(|member| SignaturePath::recognize(&member.path))
        .collect::<Vec<_>>();
    found.sort_by_key(|path| SIGNATURE_PATHS.iter().position(|known| *known == path.as_str()));
    found.into_iter().next().ok_or_else(|| {
        TimestampingError::SignatureNotFound(format!(
            "expected one of {}",
            SIGNATURE_PATHS.join(", ")
        ))
    })
}

/// Check the members an ASiC-E container must carry.
///
/// A missing `mimetype`, manifest or signature member is an error, as is
/// more than one signature member. Deviations `repackage` repairs on its own
/// (order, compression, content of `mimetype`) are reported as warnings.
#[must_use]
pub fn validate_structure(archive: &Archive) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    match archive.member(MIMETYPE_PATH).filter(|member| !member.is_dir) {
        None => errors.push(format!("Missing required member '{MIMETYPE_PATH}'")),
        Some(member) => {
            if archive.members().first().map(|m| m.path.as_str()) != Some(MIMETYPE_PATH) {
                warnings.push(format!("'{MIMETYPE_PATH}' is not the first member"));
            }
            if member.compression != Compression::Stored {
                warnings.push(format!(
                    "'{MIMETYPE_PATH}' is {} instead of stored",
                    member.compression
                ));
            }
            if member.data != ASICE_MIME_TYPE.as_bytes() {
                warnings.push(format!(
                    "'{MIMETYPE_PATH}' content is '{}' instead of '{ASICE_MIME_TYPE}'",
                    String::from_utf8_lossy(&member.data)
                ));
            }
        }
    }

    if !has_file(archive, MANIFEST_PATH) {
        errors.push(format!("Missing required member '{MANIFEST_PATH}'"));
    }

    let signatures: Vec<&str> = SIGNATURE_PATHS
        .iter()
        .copied()
        .filter(|path| has_file(archive, path))
        .collect();
    match signatures.as_slice() {
        [] => errors.push(format!(
            "Missing signature member (expected one of {})",
            SIGNATURE_PATHS.join(", ")
        )),
        [_] => {}
        several => errors.push(format!(
            "Exactly one signature member is allowed, found {}",
            several.join(", ")
        )),
    }

    ValidationReport::from_findings(errors, warnings)
}

/// Write a new container from `archive`, substituting the signature and
/// manifest members.
///
/// `mimetype` is always written first, stored, with the ASiC-E MIME type.
/// Directory entries are dropped. Every other member keeps its order; those
/// not substituted are copied raw from the source container (compressed
/// bytes, CRC, timestamps, permissions and comment unchanged). Substituted
/// members keep their compression method, timestamp and permissions but
/// lose any member comment. The archive comment is carried over.
pub fn repackage(
    archive: &Archive,
    signature_text: &str,
    manifest_text: &str,
    signature_path: SignaturePath,
) -> TimestampingResult<Vec<u8>> {
    if !has_file(archive, signature_path.as_str()) {
        return Err(TimestampingError::SignatureNotFound(format!(
            "'{signature_path}' is not a member of the container"
        )));
    }

    let mut source = match archive.source() {
        Some(bytes) => Some(ZipArchive::new(Cursor::new(bytes))?),
        None => None,
    };

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(MIMETYPE_PATH, options_for(Compression::Stored))
        .map_err(write_error)?;
    writer.write_all(ASICE_MIME_TYPE.as_bytes())?;

    for member in archive.members() {
        if member.is_dir || member.path == MIMETYPE_PATH {
            continue;
        }
        let replacement = if member.path == signature_path.as_str() {
            Some(signature_text)
        } else if member.path == MANIFEST_PATH {
            Some(manifest_text)
        } else {
            None
        };
        let original = source.as_mut().zip(member.index);

        match (replacement, original) {
            (None, Some((container, index))) => {
                let file = container.by_index_raw(index)?;
                writer.raw_copy_file(file).map_err(write_error)?;
                log::trace!("Copied member {} unchanged", member.path);
            }
            (replacement, original) => {
                if replacement.is_none() && member.compression == Compression::Other {
                    return Err(TimestampingError::MalformedArchive(format!(
                        "member '{}' has no source container to copy from",
                        member.path
                    )));
                }
                let mut options = options_for(member.compression);
                if let Some((container, index)) = original {
                    let file = container.by_index_raw(index)?;
                    if let Some(modified) = file.last_modified() {
                        options = options.last_modified_time(modified);
                    }
                    if let Some(mode) = file.unix_mode() {
                        options = options.unix_permissions(mode);
                    }
                }
                if !member.comment.is_empty() {
                    log::warn!("Comment on member {} is not carried over", member.path);
                }
                writer
                    .start_file(member.path.as_str(), options)
                    .map_err(write_error)?;
                writer.write_all(replacement.map_or(member.data.as_slice(), str::as_bytes))?;
            }
        }
    }

    writer.set_raw_comment(archive.comment().to_vec().into_boxed_slice());
    let bytes = writer.finish().map_err(write_error)?.into_inner();
    log::debug!("Repackaged container: {} bytes", bytes.len());
    Ok(bytes)
}

fn options_for(compression: Compression) -> SimpleFileOptions {
    let method = match compression {
        Compression::Stored => CompressionMethod::Stored,
        Compression::Deflated | Compression::Other => CompressionMethod::Deflated,
    };
    SimpleFileOptions::default().compression_method(method)
}

fn write_error(error: zip::result::ZipError) -> TimestampingError {
    TimestampingError::IoError(format!("failed to write container: {error}"))
}
