//! Error paths of encode and decode.

use crate::common::*;
use std::io::Cursor;
use strata_envelope::IDENTITY_LEN;

#[test]
fn encoding_an_unregistered_type_fails_before_writing() {
    let codec = bank_codec();
    let mut buf = Vec::new();
    let err = codec.encode_value(&mut buf, &3.5f32).unwrap_err();
    assert!(matches!(err, Error::UnregisteredType { ref type_name } if type_name == "f32"));
    assert!(buf.is_empty());
}

#[test]
fn unknown_identity_is_unresolvable() {
    let codec = bank_codec();
    let stranger = TypeIdentity::from_name("bank.LoanApproved");
    let mut bytes = stranger.as_bytes().to_vec();
    bytes.extend_from_slice(&[0u8; 8]);

    let err = codec.from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, Error::UnresolvableIdentity { identity } if identity == stranger));
}

#[test]
fn short_header_is_truncated() {
    let codec = bank_codec();
    let bytes = codec.to_bytes(&opened("acc-1")).unwrap();
    let err = codec.from_bytes(&bytes[..IDENTITY_LEN - 1]).unwrap_err();
    assert!(matches!(
        err,
        Error::TruncatedHeader { read, expected } if read == IDENTITY_LEN - 1 && expected == IDENTITY_LEN
    ));
}

#[test]
fn empty_stream_is_absent_value() {
    let codec = bank_codec();
    assert!(codec.from_bytes(&[]).unwrap().is_none());
}

#[test]
fn truncated_payload_surfaces_as_error() {
    let codec = bank_codec();
    let bytes = codec.to_bytes(&opened("acc-1")).unwrap();
    let err = codec.from_bytes(&bytes[..IDENTITY_LEN + 2]).unwrap_err();
    assert!(matches!(err, Error::Io(_) | Error::Serialization(_)));
    assert!(!err.is_configuration());
}

#[test]
fn decoding_as_the_wrong_type_is_a_mismatch() {
    let codec = bank_codec();
    let bytes = codec.to_bytes(&opened("acc-1")).unwrap();
    let err = codec
        .decode_value::<FundsDeposited, _>(&mut Cursor::new(bytes))
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
}

#[test]
fn producer_and_consumer_must_agree_on_contracts() {
    let producer = bank_codec();
    let consumer = EnvelopeCodec::with_builtins().unwrap();
    let bytes = producer.to_bytes(&opened("acc-1")).unwrap();
    let err = consumer.from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, Error::UnresolvableIdentity { .. }));
}

/// Record list whose single record claims a 2^46-byte metadata key
fn oversized_key_stream(registry: &ContractRegistry) -> Vec<u8> {
    let list = registry.resolve_identity_of::<Vec<EventRecord>>().unwrap();
    let body = registry.resolve_identity_of::<u64>().unwrap();
    let mut bytes = Vec::new();
    bytes.extend_from_slice(list.as_bytes());
    bytes.extend_from_slice(&1u64.to_le_bytes()); // record count
    bytes.extend_from_slice(body.as_bytes());
    bytes.extend_from_slice(&1u64.to_le_bytes()); // metadata pairs
    bytes.extend_from_slice(&(1u64 << 46).to_le_bytes()); // key length
    bytes
}

#[test]
fn oversized_length_prefix_is_an_error_not_an_allocation() {
    let registry = bank_registry();
    let bytes = oversized_key_stream(&registry);
    assert_eq!(bytes.len(), 48);

    let codec = EnvelopeCodec::new(registry);
    let err = codec.from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}

#[test]
fn oversized_length_prefix_is_an_error_in_msgpack() {
    let registry = bank_registry_msgpack();
    let list = registry.resolve_identity_of::<Vec<EventRecord>>().unwrap();
    let body = registry.resolve_identity_of::<u64>().unwrap();
    let mut bytes = Vec::new();
    bytes.extend_from_slice(list.as_bytes());
    bytes.push(0x01); // record count
    bytes.extend_from_slice(body.as_bytes());
    // carrier [metadata, body] -> metadata [[key, value]] -> str32 key of ~4 GiB
    bytes.extend_from_slice(&[0x92, 0x91, 0x92, 0xdb, 0xff, 0xff, 0xff, 0xf0]);

    let codec = EnvelopeCodec::new(registry);
    let err = codec.from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}

#[test]
fn configured_decode_limit_caps_payloads() {
    let config = EnvelopeConfig::from_toml_str("max_decode_bytes = 64").unwrap();
    let mut registry = ContractRegistry::<BincodeFormat>::from_config(&config).unwrap();
    register_contracts!(registry; AuditNote).unwrap();
    assert_eq!(registry.decode_limit(), 64);
    let codec = EnvelopeCodec::new(registry);

    let small = AuditNote {
        text: "ok".into(),
        tags: vec![],
    };
    assert!(roundtrip(&codec, &small).is::<AuditNote>());

    let large = AuditNote {
        text: "x".repeat(256),
        tags: vec![],
    };
    let bytes = codec.to_bytes(&large).unwrap();
    let err = codec.from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}
