//! Integration tests for the envelope layer.
//!
//! These tests drive the public facade end to end: a registry bootstrapped
//! with fixture contracts, frozen into a codec, writing and reading whole
//! envelopes. Unit tests in crates/codec/src/ cover each piece in isolation.

#[path = "../common/mod.rs"]
mod common;

mod failures;
mod registry;
mod roundtrip;
