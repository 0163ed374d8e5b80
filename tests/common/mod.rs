//! Shared fixtures for integration tests: an in-memory ASiC-E container
//! builder and a mock Time-Stamp Authority served by warp on loopback.

#![allow(dead_code)]

use asice_timestamper::domain::constants::PKCS7_SIGNED_DATA_OID;
use asice_timestamper::domain::der::DerNode;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use warp::Filter;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const SIGNATURE_PATH: &str = "META-INF/signatures.xml";
pub const MANIFEST_PATH: &str = "META-INF/manifest.xml";
pub const MIME_TYPE: &str = "application/vnd.etsi.asic-e+zip";

pub const BES_SIGNATURE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#" xmlns:xades="http://uri.etsi.org/01903/v1.3.2#" xmlns:xzep="http://www.ditec.sk/ep/signature_formats/xades_zep/v1.0" Id="Signature-1">
  <ds:SignedInfo>
    <ds:CanonicalizationMethod Algorithm="http://www.w3.org/TR/2001/REC-xml-c14n-20010315"/>
    <ds:SignatureMethod Algorithm="http://www.w3.org/2001/04/xmldsig-more#rsa-sha256"/>
    <ds:Reference URI="contract.pdf">
      <ds:DigestMethod Algorithm="http://www.w3.org/2001/04/xmlenc#sha256"/>
      <ds:DigestValue>n4bQgYhMfWWaL+qgxVrQFaO/TxsrC4Is0V1sFbDwCgg=</ds:DigestValue>
    </ds:Reference>
  </ds:SignedInfo>
  <ds:SignatureValue Id="Signature-1-SignatureValue">
    dGhpcyBpcyBub3QgYSByZWFsIHNpZ25hdHVyZSB2YWx1ZQ==
  </ds:SignatureValue>
  <ds:KeyInfo>
    <ds:X509Data><ds:X509Certificate>Y2VydGlmaWNhdGU=</ds:X509Certificate></ds:X509Data>
  </ds:KeyInfo>
  <ds:Object>
    <xades:QualifyingProperties Target="#Signature-1">
      <xades:SignedProperties Id="Signature-1-SignedProperties">
        <xades:SignedSignatureProperties>
          <xades:SigningTime>2024-05-01T10:00:00Z</xades:SigningTime>
        </xades:SignedSignatureProperties>
      </xades:SignedProperties>
    </xades:QualifyingProperties>
  </ds:Object>
</ds:Signature>
"##;

pub const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0">
    <manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.etsi.asic-e+zip"/>
    <manifest:file-entry manifest:full-path="contract.pdf" manifest:media-type="application/pdf"/>
    <manifest:file-entry manifest:full-path="META-INF/signatures.xml" manifest:media-type="text/xml">
        <DigestValue>c3RhbGU=</DigestValue>
    </manifest:file-entry>
</manifest:manifest>
"#;

pub const CONTRACT: &[u8] = b"%PDF-1.4 pretend contract body";

/// Container with `mimetype` deliberately not first, a directory entry and
/// mixed compression methods.
pub fn build_container(signature: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    writer.start_file("contract.pdf", stored).unwrap();
    writer.write_all(CONTRACT).unwrap();
    writer.add_directory("META-INF/", stored).unwrap();
    writer.start_file(MANIFEST_PATH, deflated).unwrap();
    writer.write_all(MANIFEST.as_bytes()).unwrap();
    writer.start_file(SIGNATURE_PATH, deflated).unwrap();
    writer.write_all(signature.as_bytes()).unwrap();
    writer.start_file("mimetype", deflated).unwrap();
    writer.write_all(MIME_TYPE.as_bytes()).unwrap();
    writer.set_raw_comment(b"signed with a test tool".to_vec().into_boxed_slice());
    writer.finish().unwrap().into_inner()
}

/// CMS `ContentInfo` shaped token.
pub fn token() -> DerNode {
    DerNode::Sequence(vec![
        DerNode::ObjectIdentifier(PKCS7_SIGNED_DATA_OID.to_vec()),
        DerNode::Other {
            tag: 0xa0,
            content: vec![0x30, 0x00],
        },
    ])
}

pub fn granted_response() -> Vec<u8> {
    DerNode::Sequence(vec![
        DerNode::Sequence(vec![DerNode::integer_from_u64(0)]),
        token(),
    ])
    .to_der()
}

pub fn rejection_response(status: u64, text: &str) -> Vec<u8> {
    DerNode::Sequence(vec![DerNode::Sequence(vec![
        DerNode::integer_from_u64(status),
        DerNode::Sequence(vec![DerNode::Utf8String(text.to_string())]),
    ])])
    .to_der()
}

/// Request observed by the mock authority.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub content_type: Option<String>,
    pub accept: Option<String>,
    pub body: Vec<u8>,
}

pub struct MockTsa {
    pub url: String,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockTsa {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Serve `body` with `status` and `content_type` for every POST to `/tsa`.
pub fn spawn_mock_tsa(status: u16, content_type: &'static str, body: Vec<u8>) -> MockTsa {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();

    let route = warp::path("tsa")
        .and(warp::post())
        .and(warp::header::optional::<String>("content-type"))
        .and(warp::header::optional::<String>("accept"))
        .and(warp::body::bytes())
        .map(
            move |content: Option<String>, accept: Option<String>, request: warp::hyper::body::Bytes| {
                seen.lock().unwrap().push(RecordedRequest {
                    content_type: content,
                    accept,
                    body: request.to_vec(),
                });
                warp::http::Response::builder()
                    .status(status)
                    .header("content-type", content_type)
                    .body(body.clone())
            },
        );

    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    MockTsa {
        url: format!("http://{addr}/tsa"),
        requests,
    }
}
