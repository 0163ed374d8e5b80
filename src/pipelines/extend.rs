//! `ExtendWorkflow`: upgrades an ASiC-E container from XAdES-BES to XAdES-T.
//!
//! Steps:
//! 1. Extract the container and check its structure (`container_store`)
//! 2. Parse and validate the signature document (`signature_model`)
//! 3. Canonicalize `ds:SignatureValue` and hash it (`canonicalizer`)
//! 4. Build the RFC3161 request (`TimestampRequestBuilder`)
//! 5. Send it to the authority (`TimeStampAuthority`)
//! 6. Extract the token from the response (`timestamp_parser`)
//! 7. Embed the token (`timestamp_embedder`) and serialize the signature
//! 8. Refresh the manifest digest and repackage the container
//!
//! The input bytes are never modified. On any failure nothing is returned
//! but the error, so callers have no partial output to write.

use crate::adapters::timestamp_http_client::{
    TimeStampAuthority, TimestampHttpClient, TimestampHttpConfig,
};
use crate::domain::constants::MANIFEST_PATH;
use crate::domain::crypto::Sha256Digest;
use crate::domain::types::SignaturePath;
use crate::domain::xades::{ReextensionPolicy, SignatureState, ValidationReport};
use crate::domain::xml::NamespaceTable;
use crate::infra::config::ExtenderConfiguration;
use crate::infra::error::{TimestampingError, TimestampingResult};
use crate::services::manifest::{self, ManifestOutcome};
use crate::services::signature_model::XadesSignature;
use crate::services::{canonicalizer, container_store, timestamp_parser, TimestampRequestBuilder};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Result of a successful extension.
#[derive(Debug, Clone)]
pub struct ExtendOutcome {
    /// The repackaged container
    pub container: Vec<u8>,
    pub signature_path: SignaturePath,
    /// SHA-256 message imprint sent to the authority
    pub imprint: Sha256Digest,
    /// Embedded token, base64 DER
    pub token_base64: String,
    pub manifest: ManifestOutcome,
    /// `SignatureTimeStamp` elements present after extension
    pub timestamp_count: usize,
    pub state: SignatureState,
    /// Non-fatal findings from structure and signature validation
    pub warnings: Vec<String>,
}

/// Combined structure and signature validation of a container.
#[derive(Debug, Clone)]
pub struct ContainerReport {
    pub structure: ValidationReport,
    pub signature: Option<ValidationReport>,
    pub signature_path: Option<SignaturePath>,
    pub timestamp_count: usize,
}

impl ContainerReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.structure.valid && self.signature.as_ref().is_some_and(|report| report.valid)
    }
}

pub struct ExtendWorkflow<A> {
    authority: A,
    policy: ReextensionPolicy,
    table: NamespaceTable,
}

impl ExtendWorkflow<TimestampHttpClient> {
    /// Workflow talking to the configured HTTP authority.
    pub fn from_config(config: &ExtenderConfiguration) -> TimestampingResult<Self> {
        let url = config.validate()?;
        let http = TimestampHttpClient::new(TimestampHttpConfig {
            url,
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
        })?;
        Ok(Self::new(http, config.reextension_policy))
    }
}

impl<A: TimeStampAuthority> ExtendWorkflow<A> {
    #[must_use]
    pub fn new(authority: A, policy: ReextensionPolicy) -> Self {
        Self {
            authority,
            policy,
            table: NamespaceTable::XADES,
        }
    }

    /// Run the full BES → T pipeline over container bytes.
    pub async fn extend_container(&self, input: &[u8]) -> TimestampingResult<ExtendOutcome> {
        // 1. Container
        let archive = container_store::extract(input)?;
        let structure = container_store::validate_structure(&archive);
        if !structure.valid {
            return Err(TimestampingError::StructureInvalid(structure.errors));
        }
        for warning in &structure.warnings {
            log::warn!("{warning}");
        }
        let signature_path = container_store::locate_signature_path(&archive)?;
        log::info!("Extending signature {signature_path}");

        // 2. Signature document
        let signature_text = member_text(&archive, signature_path.as_str())?;
        let mut signature = XadesSignature::parse(&signature_text, self.table)?;
        let report = signature.require_valid()?;

        // Reject before contacting the authority; the embedder checks again.
        let existing = signature.timestamp_count();
        if existing > 0 && self.policy == ReextensionPolicy::Reject {
            return Err(TimestampingError::AlreadyTimestamped(existing));
        }

        // 3. Canonical SignatureValue digest
        let signature_value = signature.signature_value()?;
        let imprint = canonicalizer::digest(signature.document(), signature_value)?;
        log::debug!("Message imprint: {}", imprint.to_hex());

        // 4-5. Request / response
        let request = TimestampRequestBuilder::new().build_request(&imprint);
        let response = self.authority.request_timestamp(&request).await?;

        // 6. Token
        let token_base64 = timestamp_parser::extract_time_stamp_token(&response)?;
        if let Ok(token_der) = STANDARD.decode(&token_base64) {
            match timestamp_parser::timestamp_token_info(&token_der) {
                Ok(content_type) => log::debug!("TimeStampToken content type {content_type}"),
                Err(e) => log::warn!("TimeStampToken is not a readable ContentInfo: {e}"),
            }
        }

        // 7. Embed
        signature.extend(&token_base64, self.policy)?;
        let new_signature = signature.serialize();

        // 8. Manifest + container
        let manifest_text = member_text(&archive, MANIFEST_PATH)?;
        let update =
            manifest::update_manifest(&manifest_text, new_signature.as_bytes(), signature_path)?;
        let container = container_store::repackage(
            &archive,
            &new_signature,
            &update.manifest,
            signature_path,
        )?;
        log::info!(
            "Signature upgraded to {} ({} timestamp(s))",
            signature.state(),
            signature.timestamp_count()
        );

        let mut warnings = structure.warnings;
        warnings.extend(report.warnings);
        Ok(ExtendOutcome {
            container,
            signature_path,
            imprint,
            token_base64,
            manifest: update.outcome,
            timestamp_count: signature.timestamp_count(),
            state: signature.state(),
            warnings,
        })
    }
}

/// Validate a container without contacting any authority.
///
/// Only unreadable archives are errors; everything else is reported.
pub fn inspect_container(input: &[u8]) -> TimestampingResult<ContainerReport> {
    let archive = container_store::extract(input)?;
    let structure = container_store::validate_structure(&archive);
    let signature_path = container_store::locate_signature_path(&archive).ok();

    let mut signature_report = None;
    let mut timestamp_count = 0;
    if let Some(path) = signature_path {
        let report = match member_text(&archive, path.as_str())
            .and_then(|text| XadesSignature::parse(&text, NamespaceTable::XADES))
        {
            Ok(mut signature) => {
                timestamp_count = signature.timestamp_count();
                signature.validate()
            }
            Err(e) => ValidationReport::from_findings(vec![e.to_string()], Vec::new()),
        };
        signature_report = Some(report);
    }

    Ok(ContainerReport {
        structure,
        signature: signature_report,
        signature_path,
        timestamp_count,
    })
}

fn member_text(archive: &crate::domain::asic::Archive, path: &str) -> TimestampingResult<String> {
    let member = archive.member(path).ok_or_else(|| {
        TimestampingError::MalformedArchive(format!("member '{path}' is missing"))
    })?;
    String::from_utf8(member.data.clone())
        .map_err(|_| TimestampingError::XmlParseError(format!("'{path}' is not UTF-8 text")))
}
