//! Shared fixtures for the envelope integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::io::Cursor;
use std::sync::Once;
pub use strata_envelope::{
    register_contracts, BincodeFormat, Contract, ContractBase, ContractRegistry, EnvelopeCodec,
    EnvelopeConfig, Error, EventRecord, Metadata, MetadataValue, MessagePackFormat, Payload,
    SequentialTags, TypeIdentity, WireFormat,
};

// ============================================================================
// Initialization
// ============================================================================

static TRACING: Once = Once::new();

/// Route envelope logs to the test harness output. Safe to call repeatedly.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing_subscriber::filter::LevelFilter::TRACE)
            .try_init();
    });
}

// ============================================================================
// Fixture contracts
// ============================================================================

/// Base shared by the account events
pub const ACCOUNT: ContractBase = ContractBase::named("account");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountOpened {
    pub account: String,
    pub owner: String,
}

impl Contract for AccountOpened {
    fn contract_name() -> Cow<'static, str> {
        Cow::Borrowed("bank.AccountOpened")
    }
    fn contract_base() -> ContractBase {
        ACCOUNT
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundsDeposited {
    pub account: String,
    pub cents: i64,
}

impl Contract for FundsDeposited {
    fn contract_name() -> Cow<'static, str> {
        Cow::Borrowed("bank.FundsDeposited")
    }
    fn contract_base() -> ContractBase {
        ACCOUNT
    }
}

/// Declares a fixed identity instead of hashing its name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountClosed {
    pub account: String,
    pub reason: Option<String>,
}

pub const ACCOUNT_CLOSED_ID: &str = "3f2b8c1e-7a44-4d0b-9e51-2c6f0a9d8e17";

impl Contract for AccountClosed {
    fn contract_name() -> Cow<'static, str> {
        Cow::Borrowed("bank.AccountClosed")
    }
    fn contract_id() -> Option<&'static str> {
        Some(ACCOUNT_CLOSED_ID)
    }
    fn contract_base() -> ContractBase {
        ACCOUNT
    }
}

/// Standalone contract under the root base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditNote {
    pub text: String,
    pub tags: Vec<String>,
}

impl Contract for AuditNote {
    fn contract_name() -> Cow<'static, str> {
        Cow::Borrowed("bank.AuditNote")
    }
}

/// Built-ins plus every fixture contract, bincode
pub fn bank_registry() -> ContractRegistry {
    let mut registry = ContractRegistry::new().expect("builtins register");
    register_contracts!(registry; AccountOpened, FundsDeposited, AccountClosed, AuditNote, String, u64)
        .expect("fixtures register");
    registry
}

/// Same contracts over MessagePack
pub fn bank_registry_msgpack() -> ContractRegistry<MessagePackFormat> {
    let mut registry =
        ContractRegistry::<MessagePackFormat>::bootstrap(Box::new(SequentialTags::new()), true)
            .expect("builtins register");
    register_contracts!(registry; AccountOpened, FundsDeposited, AccountClosed, AuditNote, String, u64)
        .expect("fixtures register");
    registry
}

pub fn bank_codec() -> EnvelopeCodec {
    EnvelopeCodec::new(bank_registry())
}

pub fn opened(account: &str) -> AccountOpened {
    AccountOpened {
        account: account.to_string(),
        owner: "alice".to_string(),
    }
}

pub fn deposited(account: &str, cents: i64) -> FundsDeposited {
    FundsDeposited {
        account: account.to_string(),
        cents,
    }
}

/// Encode then decode through one codec
pub fn roundtrip<F: WireFormat>(codec: &EnvelopeCodec<F>, value: &dyn Payload) -> Box<dyn Payload> {
    let bytes = codec.to_bytes(value).expect("encode");
    codec
        .decode(&mut Cursor::new(bytes))
        .expect("decode")
        .expect("non-empty stream")
}
