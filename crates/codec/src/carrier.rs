//! Record carriers
//!
//! The wire format needs one concrete type per encoded value, while a record
//! list holds bodies of varying types plus free-form metadata. Each record is
//! therefore carried as a [`RecordCarrier<T>`] typed by its own body:
//!
//! - metadata is flattened into ordered `(key, value)` string pairs. Every
//!   value is coerced to its string form first, and decodes back as text.
//!   This loss is intentional: metadata values do not round-trip their type.
//! - the body is held as `T`, so the format encodes it natively.

use serde::{Deserialize, Serialize};
use strata_core::{Contract, EventRecord, Metadata, MetadataValue};

/// One flattened metadata entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataPair {
    /// Metadata key
    pub key: String,
    /// String-coerced value
    pub value: String,
}

impl MetadataPair {
    /// Create a pair
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Flatten metadata into string pairs, preserving order
pub fn flatten_metadata(metadata: &Metadata) -> Vec<MetadataPair> {
    metadata
        .iter()
        .map(|(k, v)| MetadataPair::new(k, v.coerce_to_string()))
        .collect()
}

/// Re-inflate string pairs into metadata; values stay text
pub fn inflate_metadata(pairs: Vec<MetadataPair>) -> Metadata {
    pairs
        .into_iter()
        .map(|pair| (pair.key, MetadataValue::Text(pair.value)))
        .collect()
}

/// Wire shape of a single event record
///
/// Encoding borrows the body (`RecordCarrier<&T>`); decoding owns it. Both
/// produce the same bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordCarrier<T> {
    /// Flattened metadata
    pub metadata: Vec<MetadataPair>,
    /// Body, typed by the record's concrete body type
    pub body: T,
}

impl<'a, T: Contract> RecordCarrier<&'a T> {
    /// Borrow a record whose body is a `T`
    ///
    /// Returns None if the body is some other type.
    pub fn borrow_record(record: &'a EventRecord) -> Option<Self> {
        let body = record.body_as::<T>()?;
        Some(Self {
            metadata: flatten_metadata(record.metadata()),
            body,
        })
    }
}

impl<T: Contract> RecordCarrier<T> {
    /// Convert back into an event record
    pub fn into_record(self) -> EventRecord {
        EventRecord::from_parts(Box::new(self.body), inflate_metadata(self.metadata))
    }
}

impl<T> RecordCarrier<T> {
    /// Convert the body into its logical type
    pub fn map_body<U>(self, f: impl FnOnce(T) -> U) -> RecordCarrier<U> {
        RecordCarrier {
            metadata: self.metadata,
            body: f(self.body),
        }
    }
}
