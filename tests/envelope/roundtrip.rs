//! Envelopes decode to the value that was encoded, in both wire formats.

use crate::common::*;
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Cursor;
use strata_envelope::{Commit, FailureReport, IDENTITY_LEN};
use uuid::Uuid;

#[test]
fn fixture_contracts_roundtrip_bincode() {
    init_tracing();
    let codec = bank_codec();

    let values: Vec<Box<dyn Payload>> = vec![
        Box::new(opened("acc-1")),
        Box::new(deposited("acc-1", 1_250)),
        Box::new(AccountClosed {
            account: "acc-1".into(),
            reason: None,
        }),
        Box::new(AuditNote {
            text: "reviewed".into(),
            tags: vec!["q3".into(), "manual".into()],
        }),
        Box::new("plain text".to_string()),
        Box::new(42u64),
    ];

    for value in &values {
        let decoded = roundtrip(&codec, &**value);
        assert_eq!(&decoded, value);
    }
}

#[test]
fn fixture_contracts_roundtrip_msgpack() {
    init_tracing();
    let codec = EnvelopeCodec::new(bank_registry_msgpack());

    let value = AccountClosed {
        account: "acc-2".into(),
        reason: Some("dormant".into()),
    };
    let decoded = roundtrip(&codec, &value);
    assert_eq!(decoded.downcast_ref::<AccountClosed>(), Some(&value));
}

#[test]
fn header_is_identical_across_formats() {
    let bincode = bank_codec();
    let msgpack = EnvelopeCodec::new(bank_registry_msgpack());
    let value = deposited("acc-3", 7);

    let a = bincode.to_bytes(&value).unwrap();
    let b = msgpack.to_bytes(&value).unwrap();
    assert_eq!(a[..IDENTITY_LEN], b[..IDENTITY_LEN]);
    assert_ne!(a[IDENTITY_LEN..], b[IDENTITY_LEN..]);
}

#[test]
fn builtin_contracts_roundtrip() {
    let codec = bank_codec();

    let mut map = BTreeMap::new();
    map.insert("region".to_string(), "eu-west".to_string());
    let decoded = roundtrip(&codec, &map);
    assert_eq!(decoded.downcast_ref::<BTreeMap<String, String>>(), Some(&map));

    let report = FailureReport::new("io", "disk full");
    let decoded = roundtrip(&codec, &report);
    assert_eq!(decoded.downcast_ref::<FailureReport>(), Some(&report));
}

#[test]
fn commit_roundtrips_with_heterogeneous_events() {
    let codec = bank_codec();
    let mut commit = Commit::new(Uuid::new_v4(), 3, 1)
        .with_stamp(1_700_000_000_000_000)
        .with_event(EventRecord::new(opened("acc-4")))
        .with_event(EventRecord::new(deposited("acc-4", 10)).with_metadata("source", "atm"));
    commit.headers.insert("user", "alice");

    let decoded = codec
        .decode_value::<Commit, _>(&mut Cursor::new(codec.to_bytes(&commit).unwrap()))
        .unwrap()
        .unwrap();

    assert_eq!(decoded, commit);
    assert_eq!(decoded.events[1].body_as::<FundsDeposited>().unwrap().cents, 10);
}

#[test]
fn concatenated_envelopes_decode_in_order() {
    let codec = bank_codec();
    let mut buf = Vec::new();
    codec.encode_value(&mut buf, &opened("acc-5")).unwrap();
    codec.encode_value(&mut buf, &deposited("acc-5", 99)).unwrap();

    let mut reader = Cursor::new(buf);
    let first = codec.decode(&mut reader).unwrap().unwrap();
    let second = codec.decode(&mut reader).unwrap().unwrap();
    assert!(first.is::<AccountOpened>());
    assert!(second.is::<FundsDeposited>());
    assert!(codec.decode(&mut reader).unwrap().is_none());
}

#[test]
fn heterogeneous_records_roundtrip_msgpack() {
    let codec = EnvelopeCodec::new(bank_registry_msgpack());
    let records = vec![
        EventRecord::new(opened("acc-1")).with_metadata("k1", "v1"),
        EventRecord::new(deposited("acc-1", 500)).with_metadata("k2", "v2"),
        EventRecord::new(opened("acc-2")),
    ];

    let decoded = codec
        .decode_value::<Vec<EventRecord>, _>(&mut Cursor::new(codec.to_bytes(&records).unwrap()))
        .unwrap()
        .unwrap();

    assert_eq!(decoded, records);
    assert!(decoded[2].metadata().is_empty());
}

#[test]
fn commit_roundtrips_msgpack() {
    let codec = EnvelopeCodec::new(bank_registry_msgpack());
    let mut commit = Commit::new(Uuid::new_v4(), 9, 4)
        .with_stamp(42)
        .with_event(EventRecord::new(opened("acc-6")).with_metadata("source", "web"))
        .with_event(EventRecord::new(deposited("acc-6", -25)));
    commit.headers.insert("user", "bob");

    let decoded = codec
        .decode_value::<Commit, _>(&mut Cursor::new(codec.to_bytes(&commit).unwrap()))
        .unwrap()
        .unwrap();
    assert_eq!(decoded, commit);
}

/// Stored cents; read back through `PriceWire`, which normalizes the currency
#[derive(Debug, Clone, PartialEq, Serialize)]
struct Price {
    cents: i64,
    currency: String,
}

impl Contract for Price {
    fn contract_name() -> Cow<'static, str> {
        Cow::Borrowed("bank.Price")
    }
}

#[derive(Deserialize)]
struct PriceWire {
    cents: i64,
    currency: String,
}

impl From<PriceWire> for Price {
    fn from(wire: PriceWire) -> Self {
        Price {
            cents: wire.cents,
            currency: wire.currency.to_uppercase(),
        }
    }
}

fn decode_as_shape_for<F: WireFormat>(mut registry: ContractRegistry<F>) {
    registry.register_as::<Price, PriceWire>().unwrap();
    let codec = EnvelopeCodec::new(registry);
    let price = Price {
        cents: 999,
        currency: "usd".into(),
    };
    let normalized = Price {
        cents: 999,
        currency: "USD".into(),
    };

    let decoded = codec
        .decode_value::<Price, _>(&mut Cursor::new(codec.to_bytes(&price).unwrap()))
        .unwrap();
    assert_eq!(decoded, Some(normalized.clone()));

    let records = vec![
        EventRecord::new(price).with_metadata("k", "v"),
        EventRecord::new(opened("acc-7")),
    ];
    let decoded = codec
        .decode_value::<Vec<EventRecord>, _>(&mut Cursor::new(codec.to_bytes(&records).unwrap()))
        .unwrap()
        .unwrap();
    assert_eq!(decoded[0].body_as::<Price>(), Some(&normalized));
    assert_eq!(decoded[1].body_as::<AccountOpened>(), Some(&opened("acc-7")));
}

#[test]
fn decode_as_shape_is_used_for_envelopes_and_record_bodies() {
    decode_as_shape_for(bank_registry());
    decode_as_shape_for(bank_registry_msgpack());
}

proptest! {
    #[test]
    fn arbitrary_deposits_roundtrip(account in "[a-z0-9-]{0,24}", cents in any::<i64>()) {
        let codec = bank_codec();
        let value = deposited(&account, cents);
        let decoded = codec
            .decode_value::<FundsDeposited, _>(&mut Cursor::new(codec.to_bytes(&value).unwrap()))
            .unwrap();
        prop_assert_eq!(decoded, Some(value));
    }

    #[test]
    fn arbitrary_notes_roundtrip_msgpack(
        text in ".{0,64}",
        tags in proptest::collection::vec("[a-z]{1,8}", 0..6),
    ) {
        let codec = EnvelopeCodec::new(bank_registry_msgpack());
        let value = AuditNote { text, tags };
        let decoded = roundtrip(&codec, &value);
        prop_assert_eq!(decoded.downcast_ref::<AuditNote>(), Some(&value));
    }
}
