//! Minimal typed DER codec.
//!
//! Covers the small grammar exchanged with a Time-Stamp Authority:
//! INTEGER, BOOLEAN, NULL, OCTET STRING, OBJECT IDENTIFIER, UTF8String,
//! SEQUENCE and SET. Any other tag is kept as an opaque node whose content
//! octets are carried verbatim, so re-encoding a decoded tree reproduces the
//! input bytes for DER input.

use crate::domain::constants::{
    ASN1_BOOLEAN_TAG, ASN1_HIGH_TAG_NUMBER, ASN1_INTEGER_TAG, ASN1_NULL_TAG, ASN1_OCTET_STRING_TAG,
    ASN1_OID_TAG, ASN1_SEQUENCE_TAG, ASN1_SET_TAG, ASN1_UTF8_STRING_TAG, DER_LONG_FORM_BIT,
};
use crate::infra::error::{TimestampingError, TimestampingResult};

/// Deepest SEQUENCE/SET nesting accepted from the wire.
const MAX_NESTING_DEPTH: usize = 64;

/// One decoded (or to-be-encoded) DER value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerNode {
    /// Two's complement big-endian content octets
    Integer(Vec<u8>),
    Boolean(bool),
    Null,
    OctetString(Vec<u8>),
    /// Encoded OID content octets (no tag/length)
    ObjectIdentifier(Vec<u8>),
    Utf8String(String),
    Sequence(Vec<DerNode>),
    Set(Vec<DerNode>),
    /// Any other tag, content carried verbatim
    Other { tag: u8, content: Vec<u8> },
}

impl DerNode {
    /// INTEGER from an unsigned value, minimally encoded.
    #[must_use]
    pub fn integer_from_u64(value: u64) -> Self {
        let bytes = value.to_be_bytes();
        let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
        let mut content = bytes[first..].to_vec();
        if content[0] & 0x80 != 0 {
            content.insert(0, 0x00);
        }
        DerNode::Integer(content)
    }

    /// Identifier octet for this node.
    #[must_use]
    pub fn tag(&self) -> u8 {
        match self {
            DerNode::Integer(_) => ASN1_INTEGER_TAG,
            DerNode::Boolean(_) => ASN1_BOOLEAN_TAG,
            DerNode::Null => ASN1_NULL_TAG,
            DerNode::OctetString(_) => ASN1_OCTET_STRING_TAG,
            DerNode::ObjectIdentifier(_) => ASN1_OID_TAG,
            DerNode::Utf8String(_) => ASN1_UTF8_STRING_TAG,
            DerNode::Sequence(_) => ASN1_SEQUENCE_TAG,
            DerNode::Set(_) => ASN1_SET_TAG,
            DerNode::Other { tag, .. } => *tag,
        }
    }

    /// Human-readable type name, used in parse errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            DerNode::Integer(_) => "INTEGER",
            DerNode::Boolean(_) => "BOOLEAN",
            DerNode::Null => "NULL",
            DerNode::OctetString(_) => "OCTET STRING",
            DerNode::ObjectIdentifier(_) => "OBJECT IDENTIFIER",
            DerNode::Utf8String(_) => "UTF8String",
            DerNode::Sequence(_) => "SEQUENCE",
            DerNode::Set(_) => "SET",
            DerNode::Other { .. } => "untyped value",
        }
    }

    /// Encode to DER bytes.
    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let content = match self {
            DerNode::Integer(bytes)
            | DerNode::OctetString(bytes)
            | DerNode::ObjectIdentifier(bytes) => bytes.clone(),
            DerNode::Boolean(value) => vec![if *value { 0xff } else { 0x00 }],
            DerNode::Null => Vec::new(),
            DerNode::Utf8String(text) => text.as_bytes().to_vec(),
            DerNode::Sequence(children) | DerNode::Set(children) => {
                let mut body = Vec::new();
                for child in children {
                    child.encode_into(&mut body);
                }
                body
            }
            DerNode::Other { content, .. } => content.clone(),
        };
        out.push(self.tag());
        encode_length(content.len(), out);
        out.extend_from_slice(&content);
    }

    /// Decode exactly one value; trailing bytes are an error.
    pub fn from_der(bytes: &[u8]) -> TimestampingResult<Self> {
        let (node, rest) = Self::decode_prefix(bytes)?;
        if !rest.is_empty() {
            return Err(TimestampingError::AsnParseError(format!(
                "{} trailing byte(s) after {}",
                rest.len(),
                node.kind()
            )));
        }
        Ok(node)
    }

    /// Decode one value from the front of `bytes`, returning the remainder.
    pub fn decode_prefix(bytes: &[u8]) -> TimestampingResult<(Self, &[u8])> {
        Self::decode_nested(bytes, 0)
    }

    fn decode_nested(bytes: &[u8], depth: usize) -> TimestampingResult<(Self, &[u8])> {
        if depth > MAX_NESTING_DEPTH {
            return Err(asn_error(&format!(
                "constructed values nested deeper than {MAX_NESTING_DEPTH} levels"
            )));
        }
        let (tag, content, rest) = read_tlv(bytes)?;
        let node = match tag {
            ASN1_INTEGER_TAG => {
                if content.is_empty() {
                    return Err(asn_error("empty INTEGER"));
                }
                DerNode::Integer(content.to_vec())
            }
            ASN1_BOOLEAN_TAG => match content {
                [0x00] => DerNode::Boolean(false),
                [0xff] => DerNode::Boolean(true),
                _ => return Err(asn_error("BOOLEAN must be one octet 0x00 or 0xFF")),
            },
            ASN1_NULL_TAG => {
                if !content.is_empty() {
                    return Err(asn_error("NULL with content"));
                }
                DerNode::Null
            }
            ASN1_OCTET_STRING_TAG => DerNode::OctetString(content.to_vec()),
            ASN1_OID_TAG => {
                if content.is_empty() {
                    return Err(asn_error("empty OBJECT IDENTIFIER"));
                }
                DerNode::ObjectIdentifier(content.to_vec())
            }
            ASN1_UTF8_STRING_TAG => DerNode::Utf8String(
                String::from_utf8(content.to_vec())
                    .map_err(|_| asn_error("UTF8String is not valid UTF-8"))?,
            ),
            ASN1_SEQUENCE_TAG => DerNode::Sequence(decode_all(content, depth + 1)?),
            ASN1_SET_TAG => DerNode::Set(decode_all(content, depth + 1)?),
            other => DerNode::Other {
                tag: other,
                content: content.to_vec(),
            },
        };
        Ok((node, rest))
    }

    /// Children of a SEQUENCE or SET.
    #[must_use]
    pub fn children(&self) -> Option<&[DerNode]> {
        match self {
            DerNode::Sequence(children) | DerNode::Set(children) => Some(children),
            _ => None,
        }
    }

    /// Value of a small non-negative INTEGER.
    pub fn as_u32(&self) -> TimestampingResult<u32> {
        let DerNode::Integer(bytes) = self else {
            return Err(asn_error(&format!("expected INTEGER, found {}", self.kind())));
        };
        if bytes.first().is_some_and(|b| b & 0x80 != 0) {
            return Err(asn_error("negative INTEGER where a status was expected"));
        }
        let significant: Vec<u8> = bytes.iter().copied().skip_while(|&b| b == 0).collect();
        if significant.len() > 4 {
            return Err(asn_error("INTEGER too large"));
        }
        Ok(significant
            .iter()
            .fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
    }

    /// Dotted-decimal rendering of an OBJECT IDENTIFIER.
    #[must_use]
    pub fn oid_string(&self) -> Option<String> {
        let DerNode::ObjectIdentifier(bytes) = self else {
            return None;
        };
        let mut arcs: Vec<u64> = Vec::new();
        let mut value: u64 = 0;
        for &byte in bytes {
            value = (value << 7) | u64::from(byte & 0x7f);
            if byte & 0x80 == 0 {
                if arcs.is_empty() {
                    let first = (value / 40).min(2);
                    arcs.push(first);
                    arcs.push(value - first * 40);
                } else {
                    arcs.push(value);
                }
                value = 0;
            }
        }
        Some(
            arcs.iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join("."),
        )
    }
}

fn asn_error(message: &str) -> TimestampingError {
    TimestampingError::AsnParseError(message.to_string())
}

fn decode_all(mut content: &[u8], depth: usize) -> TimestampingResult<Vec<DerNode>> {
    let mut nodes = Vec::new();
    while !content.is_empty() {
        let (node, rest) = DerNode::decode_nested(content, depth)?;
        nodes.push(node);
        content = rest;
    }
    Ok(nodes)
}

/// Split one TLV off the front of `data`: (tag, content, remainder).
fn read_tlv(data: &[u8]) -> TimestampingResult<(u8, &[u8], &[u8])> {
    let Some((&tag, after_tag)) = data.split_first() else {
        return Err(asn_error("unexpected end of data, expected a tag"));
    };
    if tag & ASN1_HIGH_TAG_NUMBER == ASN1_HIGH_TAG_NUMBER {
        return Err(asn_error("high tag number form is not supported"));
    }
    let (length, header) = parse_length(after_tag)?;
    let body = &after_tag[header..];
    if body.len() < length {
        return Err(asn_error(&format!(
            "length {length} exceeds the {} remaining byte(s)",
            body.len()
        )));
    }
    Ok((tag, &body[..length], &body[length..]))
}

/// Parse a DER length, returning (length, octets consumed).
fn parse_length(data: &[u8]) -> TimestampingResult<(usize, usize)> {
    let Some(&first) = data.first() else {
        return Err(asn_error("unexpected end of data, expected a length"));
    };
    if first & DER_LONG_FORM_BIT == 0 {
        return Ok((usize::from(first), 1));
    }
    let count = usize::from(first & !DER_LONG_FORM_BIT);
    if count == 0 {
        return Err(asn_error("indefinite length is not allowed in DER"));
    }
    if count > 4 || data.len() < 1 + count {
        return Err(asn_error("invalid long form length"));
    }
    let length = data[1..=count]
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
    if length < 0x80 || data[1] == 0 {
        return Err(asn_error("non-minimal length encoding"));
    }
    Ok((length, 1 + count))
}

fn encode_length(length: usize, out: &mut Vec<u8>) {
    if length < 0x80 {
        out.push(length as u8);
        return;
    }
    let bytes = length.to_be_bytes();
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    let significant = &bytes[first..];
    out.push(DER_LONG_FORM_BIT | significant.len() as u8);
    out.extend_from_slice(significant);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_short_and_long_lengths() {
        let short = DerNode::OctetString(vec![0xAA; 3]).to_der();
        assert_eq!(short, vec![0x04, 0x03, 0xAA, 0xAA, 0xAA]);

        let long = DerNode::OctetString(vec![0x00; 200]).to_der();
        assert_eq!(&long[..3], &[0x04, 0x81, 0xC8]);
        assert_eq!(long.len(), 203);

        let longer = DerNode::OctetString(vec![0x00; 300]).to_der();
        assert_eq!(&longer[..4], &[0x04, 0x82, 0x01, 0x2C]);
    }

    #[test]
    fn integer_from_u64_is_minimal() {
        assert_eq!(DerNode::integer_from_u64(1).to_der(), vec![0x02, 0x01, 0x01]);
        assert_eq!(DerNode::integer_from_u64(0).to_der(), vec![0x02, 0x01, 0x00]);
        assert_eq!(
            DerNode::integer_from_u64(0x80).to_der(),
            vec![0x02, 0x02, 0x00, 0x80]
        );
    }

    #[test]
    fn decodes_nested_sequence() {
        let bytes = [0x30, 0x06, 0x02, 0x01, 0x05, 0x01, 0x01, 0xFF];
        let node = DerNode::from_der(&bytes).unwrap();
        let children = node.children().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].as_u32().unwrap(), 5);
        assert_eq!(children[1], DerNode::Boolean(true));
    }

    #[test]
    fn opaque_nodes_reencode_verbatim() {
        // [0] EXPLICIT wrapper around an INTEGER, as found inside ContentInfo
        let bytes = [0x30, 0x07, 0xA0, 0x03, 0x02, 0x01, 0x07, 0x05, 0x00];
        let node = DerNode::from_der(&bytes).unwrap();
        assert_eq!(node.to_der(), bytes.to_vec());
    }

    #[test]
    fn rejects_truncated_and_trailing_data() {
        assert!(DerNode::from_der(&[0x30, 0x05, 0x02, 0x01]).is_err());
        assert!(DerNode::from_der(&[0x05, 0x00, 0x00]).is_err());
        assert!(DerNode::from_der(&[]).is_err());
    }

    #[test]
    fn rejects_indefinite_and_non_minimal_lengths() {
        assert!(DerNode::from_der(&[0x30, 0x80, 0x00, 0x00]).is_err());
        assert!(DerNode::from_der(&[0x04, 0x81, 0x01, 0xAA]).is_err());
    }

    /// `depth` SEQUENCEs nested inside each other, innermost empty.
    fn nested_sequences(depth: usize) -> Vec<u8> {
        let mut content_lengths = Vec::with_capacity(depth);
        let mut length = 0usize;
        for _ in 0..depth {
            content_lengths.push(length);
            let mut header = Vec::new();
            encode_length(length, &mut header);
            length += 1 + header.len();
        }
        let mut bytes = Vec::with_capacity(length);
        for content_length in content_lengths.iter().rev() {
            bytes.push(ASN1_SEQUENCE_TAG);
            encode_length(*content_length, &mut bytes);
        }
        bytes
    }

    #[test]
    fn accepts_moderate_nesting() {
        let bytes = nested_sequences(MAX_NESTING_DEPTH);
        assert_eq!(DerNode::from_der(&bytes).unwrap().to_der(), bytes);
    }

    #[test]
    fn rejects_pathological_nesting_without_overflowing() {
        let bytes = nested_sequences(100_000);
        match DerNode::from_der(&bytes) {
            Err(TimestampingError::AsnParseError(message)) => {
                assert!(message.contains("nested deeper"), "{message}");
            }
            other => panic!("expected AsnParseError, got {other:?}"),
        }
    }

    #[test]
    fn renders_sha256_oid() {
        let node = DerNode::ObjectIdentifier(
            crate::domain::constants::SHA256_ALGORITHM_OID.to_vec(),
        );
        assert_eq!(node.oid_string().as_deref(), Some("2.16.840.1.101.3.4.2.1"));
    }

    #[test]
    fn as_u32_rejects_non_integers() {
        assert!(DerNode::Null.as_u32().is_err());
        assert!(DerNode::Integer(vec![0xFF]).as_u32().is_err());
    }
}
