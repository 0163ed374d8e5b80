//! End-to-end XAdES-BES → XAdES-T extension against a mock Time-Stamp Authority.

mod common;

use asice_timestamper::domain::asic::Compression;
use asice_timestamper::domain::crypto::Sha256Digest;
use asice_timestamper::domain::xml::NamespaceTable;
use asice_timestamper::services::signature_model::{self, XadesSignature};
use asice_timestamper::services::{canonicalizer, container_store, ManifestOutcome};
use asice_timestamper::{
    extend_container_file, ExtendWorkflow, ExtenderConfiguration, ReextensionPolicy,
    SignatureState, TimestampingError,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use common::*;

fn config_for(tsa: &MockTsa) -> ExtenderConfiguration {
    ExtenderConfiguration {
        tsa_url: tsa.url.clone(),
        timeout_seconds: 5,
        ..ExtenderConfiguration::default()
    }
}

fn expected_imprint(signature: &str) -> Sha256Digest {
    let signature = XadesSignature::parse(signature, NamespaceTable::XADES).unwrap();
    let value = signature.signature_value().unwrap();
    canonicalizer::digest(signature.document(), value).unwrap()
}

#[tokio::test]
async fn granted_timestamp_is_embedded_end_to_end() {
    let tsa = spawn_mock_tsa(200, "application/timestamp-reply", granted_response());
    let input = build_container(BES_SIGNATURE);
    let workflow = ExtendWorkflow::from_config(&config_for(&tsa)).unwrap();

    let outcome = workflow.extend_container(&input).await.unwrap();
    assert_eq!(outcome.state, SignatureState::Timestamped);
    assert_eq!(outcome.manifest, ManifestOutcome::DigestUpdated);

    // Exactly one well-formed request carrying the SignatureValue imprint
    let requests = tsa.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.content_type.as_deref(), Some("application/timestamp-query"));
    assert_eq!(request.accept.as_deref(), Some("application/timestamp-reply"));
    assert_eq!(request.body.len(), 59);
    let imprint = expected_imprint(BES_SIGNATURE);
    assert_eq!(&request.body[24..56], imprint.as_bytes());
    assert_eq!(&request.body[56..], &[0x01, 0x01, 0xff]);
    assert_eq!(outcome.imprint, imprint);

    // Signature changed only by the inserted unsigned properties
    let token_b64 = STANDARD.encode(token().to_der());
    assert_eq!(outcome.token_base64, token_b64);
    let archive = container_store::extract(&outcome.container).unwrap();
    let signature = String::from_utf8(archive.member(SIGNATURE_PATH).unwrap().data.clone()).unwrap();
    let expected_signature = BES_SIGNATURE.replace(
        "</xades:SignedProperties>",
        &format!(
            "</xades:SignedProperties><xades:UnsignedProperties><xades:UnsignedSignatureProperties>\
             <xades:SignatureTimeStamp><xades:EncapsulatedTimeStamp>{token_b64}</xades:EncapsulatedTimeStamp>\
             </xades:SignatureTimeStamp></xades:UnsignedSignatureProperties></xades:UnsignedProperties>"
        ),
    );
    assert_eq!(signature, expected_signature);

    // Manifest digest matches the new signature bytes, nothing else moved
    let manifest = String::from_utf8(archive.member(MANIFEST_PATH).unwrap().data.clone()).unwrap();
    let digest = Sha256Digest::compute(signature.as_bytes()).to_base64();
    assert_eq!(manifest, MANIFEST.replace("c3RhbGU=", &digest));

    // Payload untouched, directories dropped, comment kept
    let contract = archive.member("contract.pdf").unwrap();
    assert_eq!(contract.data, CONTRACT);
    assert_eq!(contract.compression, Compression::Stored);
    assert!(archive.members().iter().all(|member| !member.is_dir));
    assert_eq!(archive.comment(), b"signed with a test tool");
}

#[tokio::test]
async fn output_starts_with_stored_mimetype() {
    let tsa = spawn_mock_tsa(200, "application/timestamp-reply", granted_response());
    let workflow = ExtendWorkflow::from_config(&config_for(&tsa)).unwrap();
    let outcome = workflow
        .extend_container(&build_container(BES_SIGNATURE))
        .await
        .unwrap();

    let bytes = &outcome.container;
    assert_eq!(&bytes[..4], b"PK\x03\x04");
    assert_eq!(u16::from_le_bytes([bytes[8], bytes[9]]), 0, "stored");
    let name_len = u16::from_le_bytes([bytes[26], bytes[27]]) as usize;
    let extra_len = u16::from_le_bytes([bytes[28], bytes[29]]) as usize;
    assert_eq!(&bytes[30..30 + name_len], b"mimetype");
    let data_start = 30 + name_len + extra_len;
    assert_eq!(
        &bytes[data_start..data_start + MIME_TYPE.len()],
        MIME_TYPE.as_bytes()
    );
}

#[tokio::test]
async fn rejection_status_fails_without_writing_output() {
    let tsa = spawn_mock_tsa(
        200,
        "application/timestamp-reply",
        rejection_response(2, "bad request"),
    );
    let dir = tempfile::TempDir::new().unwrap();
    let input_path = dir.path().join("contract.asice");
    let output_path = dir.path().join("contract-t.asice");
    let input = build_container(BES_SIGNATURE);
    std::fs::write(&input_path, &input).unwrap();

    let err = extend_container_file(&input_path, &output_path, &config_for(&tsa))
        .await
        .unwrap_err();

    match &err {
        TimestampingError::TsaRejected { status, name, message } => {
            assert_eq!(*status, 2);
            assert_eq!(name, "rejection");
            assert_eq!(message.as_deref(), Some("bad request"));
        }
        other => panic!("unexpected error: {other}"),
    }
    let text = err.to_string();
    assert!(text.contains("rejection") && text.contains("bad request"));
    assert!(!output_path.exists());
    assert_eq!(std::fs::read(&input_path).unwrap(), input);
}

#[tokio::test]
async fn http_failure_is_tsa_unavailable() {
    let tsa = spawn_mock_tsa(503, "text/plain", b"maintenance".to_vec());
    let workflow = ExtendWorkflow::from_config(&config_for(&tsa)).unwrap();
    let err = workflow
        .extend_container(&build_container(BES_SIGNATURE))
        .await
        .unwrap_err();
    assert!(matches!(err, TimestampingError::TsaUnavailable(_)));
    assert_eq!(tsa.requests().len(), 1, "no retry");
}

#[tokio::test]
async fn mislabeled_reply_is_still_parsed() {
    let tsa = spawn_mock_tsa(200, "application/octet-stream", granted_response());
    let workflow = ExtendWorkflow::from_config(&config_for(&tsa)).unwrap();
    let outcome = workflow
        .extend_container(&build_container(BES_SIGNATURE))
        .await
        .unwrap();
    assert_eq!(outcome.timestamp_count, 1);
}

#[tokio::test]
async fn second_extension_adds_sibling_timestamp() {
    let tsa = spawn_mock_tsa(200, "application/timestamp-reply", granted_response());
    let workflow = ExtendWorkflow::from_config(&config_for(&tsa)).unwrap();
    let first = workflow
        .extend_container(&build_container(BES_SIGNATURE))
        .await
        .unwrap();
    let second = workflow.extend_container(&first.container).await.unwrap();
    assert_eq!(second.timestamp_count, 2);

    let archive = container_store::extract(&second.container).unwrap();
    let text = String::from_utf8(archive.member(SIGNATURE_PATH).unwrap().data.clone()).unwrap();
    assert_eq!(text.matches("<xades:UnsignedProperties>").count(), 1);
    assert_eq!(text.matches("<xades:UnsignedSignatureProperties>").count(), 1);
    assert_eq!(text.matches("<xades:SignatureTimeStamp>").count(), 2);

    let reject = ExtendWorkflow::from_config(&ExtenderConfiguration {
        reextension_policy: ReextensionPolicy::Reject,
        ..config_for(&tsa)
    })
    .unwrap();
    let err = reject.extend_container(&second.container).await.unwrap_err();
    assert!(matches!(err, TimestampingError::AlreadyTimestamped(2)));
    assert_eq!(tsa.requests().len(), 2);
}

#[tokio::test]
async fn wrapped_signature_is_extended_in_place() {
    let wrapped = format!(
        "<asic:XAdESSignatures xmlns:asic=\"http://uri.etsi.org/02918/v1.2.1#\">{}</asic:XAdESSignatures>",
        BES_SIGNATURE.trim_start_matches("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n")
    );
    let tsa = spawn_mock_tsa(200, "application/timestamp-reply", granted_response());
    let workflow = ExtendWorkflow::from_config(&config_for(&tsa)).unwrap();
    let outcome = workflow
        .extend_container(&build_container(&wrapped))
        .await
        .unwrap();

    let archive = container_store::extract(&outcome.container).unwrap();
    let text = String::from_utf8(archive.member(SIGNATURE_PATH).unwrap().data.clone()).unwrap();
    assert!(text.starts_with("<asic:XAdESSignatures"));
    let doc = signature_model::parse(&text).unwrap();
    assert_eq!(signature_model::count_signature_timestamps(&doc), 1);
    assert!(signature_model::validate(&doc, &NamespaceTable::XADES).valid);
}

#[tokio::test]
async fn incomplete_signature_is_rejected_before_any_request() {
    let broken = BES_SIGNATURE.replace("ds:KeyInfo", "ds:Unexpected");
    let tsa = spawn_mock_tsa(200, "application/timestamp-reply", granted_response());
    let workflow = ExtendWorkflow::from_config(&config_for(&tsa)).unwrap();
    let err = workflow
        .extend_container(&build_container(&broken))
        .await
        .unwrap_err();
    match err {
        TimestampingError::StructureInvalid(errors) => {
            assert_eq!(errors, vec!["Missing required element ds:KeyInfo".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(tsa.requests().is_empty());
}
