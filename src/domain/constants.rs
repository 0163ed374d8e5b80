//! Centralized constants for DER tags, OIDs, ASiC-E member names and XML namespaces.
//! Keep this intentionally small; only broadly reused literals should live here.

// === ASN.1 DER Constants ===

/// ASN.1 BOOLEAN tag
pub const ASN1_BOOLEAN_TAG: u8 = 0x01;

/// ASN.1 INTEGER tag
pub const ASN1_INTEGER_TAG: u8 = 0x02;

/// ASN.1 OCTET STRING tag
pub const ASN1_OCTET_STRING_TAG: u8 = 0x04;

/// ASN.1 NULL tag
pub const ASN1_NULL_TAG: u8 = 0x05;

/// ASN.1 OBJECT IDENTIFIER tag
pub const ASN1_OID_TAG: u8 = 0x06;

/// ASN.1 UTF8String tag
pub const ASN1_UTF8_STRING_TAG: u8 = 0x0c;

/// ASN.1 SEQUENCE tag (constructed)
pub const ASN1_SEQUENCE_TAG: u8 = 0x30;

/// ASN.1 SET tag (constructed)
pub const ASN1_SET_TAG: u8 = 0x31;

/// Low five bits of the identifier octet all set: high tag number form follows
pub const ASN1_HIGH_TAG_NUMBER: u8 = 0x1f;

/// DER long form length marker bit
pub const DER_LONG_FORM_BIT: u8 = 0x80;

// === RFC3161 Constants ===

/// Version 1 for RFC3161 timestamp requests
pub const TS_REQ_VERSION_1: u64 = 1;

/// SHA-256 algorithm OID (2.16.840.1.101.3.4.2.1) DER content octets
pub const SHA256_ALGORITHM_OID: &[u8] = &[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01];

/// PKCS#7 `SignedData` OID (1.2.840.113549.1.7.2) DER content octets
pub const PKCS7_SIGNED_DATA_OID: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x02];

/// SHA-256 digest length in bytes
pub const SHA256_DIGEST_LENGTH: usize = 32;

/// HTTP content type for RFC3161 requests
pub const TIMESTAMP_QUERY_CONTENT_TYPE: &str = "application/timestamp-query";

/// HTTP content type for RFC3161 responses
pub const TIMESTAMP_REPLY_CONTENT_TYPE: &str = "application/timestamp-reply";

/// Reference TSA round-trip timeout in seconds
pub const DEFAULT_TSA_TIMEOUT_SECS: u64 = 10;

// === ASiC-E Container Constants ===

/// Name of the mandatory first member
pub const MIMETYPE_PATH: &str = "mimetype";

/// Exact content of the `mimetype` member
pub const ASICE_MIME_TYPE: &str = "application/vnd.etsi.asic-e+zip";

/// Location of the OASIS manifest
pub const MANIFEST_PATH: &str = "META-INF/manifest.xml";

/// Accepted signature member locations, in lookup order
pub const SIGNATURE_PATHS: &[&str] = &["META-INF/signatures.xml", "META-INF/signature.xml"];

// === XML Namespace URIs ===

/// XML-DSig namespace
pub const XMLDSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";

/// XAdES v1.3.2 namespace
pub const XADES_NS: &str = "http://uri.etsi.org/01903/v1.3.2#";

/// ASiC namespace (wrapper `XAdESSignatures`)
pub const ASIC_NS: &str = "http://uri.etsi.org/02918/v1.2.1#";

/// Slovak eIDAS profile namespace (declared, not structurally required)
pub const XZEP_NS: &str = "http://www.ditec.sk/ep/signature_formats/xades_zep/v1.0";

/// OASIS OpenDocument manifest namespace
pub const MANIFEST_NS: &str = "urn:oasis:names:tc:opendocument:xmlns:manifest:1.0";
