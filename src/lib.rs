//! Strata envelopes - type-tagged binary framing for polymorphic values
//!
//! A value whose concrete type is only known at runtime is written as a
//! 16-byte contract identity followed by its payload; decoding reads the
//! identity back, finds the registered contract and decodes the exact
//! concrete type.
//!
//! # Quick Start
//!
//! ```ignore
//! use strata_envelope::{ContractRegistry, EnvelopeCodec, EventRecord};
//!
//! let mut registry = ContractRegistry::new()?;
//! registry.register::<OrderPlaced>()?;
//! let codec = EnvelopeCodec::new(registry);
//!
//! let bytes = codec.to_bytes(&vec![EventRecord::new(order).with_metadata("user", "alice")])?;
//! let records = codec.decode_value::<Vec<EventRecord>, _>(&mut bytes.as_slice())?;
//! ```
//!
//! # Architecture
//!
//! Core types (identities, contracts, records, errors) live in `strata-core`;
//! the registry, the codec and the wire formats live in `strata-codec`.

pub use strata_codec::*;
pub use strata_core::*;
