//! Identity stability and registration rules seen through the facade.

use crate::common::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::thread;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Impostor;

impl Contract for Impostor {
    fn contract_name() -> Cow<'static, str> {
        Cow::Borrowed("bank.Impostor")
    }
    fn contract_id() -> Option<&'static str> {
        Some(ACCOUNT_CLOSED_ID)
    }
}

#[test]
fn identities_are_stable_across_registries() {
    let a = bank_registry();
    let b = bank_registry();
    for entry in a.entries() {
        assert_eq!(b.resolve_identity(entry.type_id()), Some(entry.identity()));
    }
}

#[test]
fn registration_order_does_not_change_identities() {
    let forward = bank_registry();

    let mut reversed = ContractRegistry::empty();
    register_contracts!(reversed; u64, String, AuditNote, AccountClosed, FundsDeposited, AccountOpened)
        .unwrap();

    for ty in [
        reversed.resolve_identity_of::<AccountOpened>(),
        reversed.resolve_identity_of::<FundsDeposited>(),
        reversed.resolve_identity_of::<AuditNote>(),
    ] {
        let identity = ty.unwrap();
        let entry = forward.resolve_type(&identity).unwrap();
        assert_eq!(
            reversed.resolve_type(&identity).unwrap().type_id(),
            entry.type_id()
        );
    }
}

#[test]
fn derived_identity_is_md5_of_the_name() {
    let registry = bank_registry();
    assert_eq!(
        registry.resolve_identity_of::<AccountOpened>(),
        Some(TypeIdentity::from_name("bank.AccountOpened"))
    );
}

#[test]
fn override_identity_wins_over_the_name() {
    let registry = bank_registry();
    let identity = registry.resolve_identity_of::<AccountClosed>().unwrap();
    assert_eq!(identity.to_string(), ACCOUNT_CLOSED_ID);
    assert_ne!(identity, TypeIdentity::from_name("bank.AccountClosed"));
}

#[test]
fn colliding_override_is_rejected_and_leaves_registry_untouched() {
    let mut registry = bank_registry();
    let before = registry.len();

    let err = registry.register::<Impostor>().unwrap_err();
    assert!(err.is_configuration());
    assert!(matches!(
        err,
        Error::IdentityCollision { ref existing, ref incoming, .. }
            if existing == "bank.AccountClosed" && incoming == "bank.Impostor"
    ));
    assert_eq!(registry.len(), before);
    assert!(!registry.contains::<Impostor>());
}

#[test]
fn reregistering_is_a_noop() {
    let mut registry = bank_registry();
    let before = registry.len();
    let first = registry.resolve_identity_of::<AuditNote>();
    assert_eq!(registry.register::<AuditNote>().unwrap(), first);
    assert_eq!(registry.len(), before);
}

#[test]
fn lookups_agree_in_both_directions() {
    let registry = bank_registry();
    for entry in registry.entries() {
        let back = registry.resolve_type(&entry.identity()).unwrap();
        assert_eq!(back.type_id(), entry.type_id());
        assert_eq!(registry.resolve_identity(entry.type_id()), Some(entry.identity()));
    }
}

#[test]
fn codec_is_shared_across_threads() {
    let codec = bank_codec();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let codec = codec.clone();
            thread::spawn(move || {
                let value = deposited(&format!("acc-{}", i), i);
                let bytes = codec.to_bytes(&value).unwrap();
                let decoded = codec.from_bytes(&bytes).unwrap().unwrap();
                assert_eq!(decoded.downcast_ref::<FundsDeposited>(), Some(&value));
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}
