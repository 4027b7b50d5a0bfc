//! Envelope codec for Strata
//!
//! This crate writes and reads type-tagged envelopes:
//!
//! - Contract registry: type ↔ identity mapping and per-contract dispatch
//! - Envelope codec: identity header + payload, record-list unwrapping
//! - Record carriers: per-element wire shape of heterogeneous record lists
//! - Wire formats: bincode and MessagePack behind one trait
//! - Subtype model: per-base tag tables for nested (tagged) framing
//! - Configuration: `envelope.toml`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builtins; // Commit, record list, string map, failure report
pub mod carrier; // RecordCarrier, metadata flattening
pub mod config; // envelope.toml
pub mod envelope; // EnvelopeCodec
pub mod format; // WireFormat, bincode, msgpack
pub mod registry; // ContractRegistry, register_contracts!
pub mod subtype; // TagAllocator, SubtypeModel

// === Re-exports ===
pub use carrier::{flatten_metadata, inflate_metadata, MetadataPair, RecordCarrier};
pub use config::{EnvelopeConfig, CONFIG_FILE_NAME};
pub use envelope::{EnvelopeCodec, TAG_LEN};
pub use format::{BincodeFormat, MessagePackFormat, WireFormat, DEFAULT_DECODE_LIMIT};
pub use registry::{ContractEntry, ContractRegistry, DecodeFn, EncodeFn};
pub use subtype::{HashDerivedTags, SequentialTags, SubtypeModel, TagAllocator};

pub use strata_core::{Error, Result};
