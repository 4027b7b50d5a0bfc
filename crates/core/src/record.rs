//! Event records
//!
//! An [`EventRecord`] pairs a polymorphic body with string-keyed metadata.
//! Records are not encodable as-is: lists of them are carried through the
//! wire format one carrier per element (see `strata_codec::carrier`).

use crate::contract::{Contract, ContractKind, Payload};
use crate::metadata::{Metadata, MetadataValue};
use std::borrow::Cow;
use std::fmt;

/// Contract name of a record list
pub const EVENT_RECORD_LIST_CONTRACT: &str = "Strata.Envelope.EventRecordList";

/// Polymorphic event body plus ordered metadata
pub struct EventRecord {
    body: Box<dyn Payload>,
    metadata: Metadata,
}

impl EventRecord {
    /// Create a record with empty metadata
    pub fn new<T: Contract>(body: T) -> Self {
        Self {
            body: Box::new(body),
            metadata: Metadata::new(),
        }
    }

    /// Create a record from an already-erased body
    pub fn from_parts(body: Box<dyn Payload>, metadata: Metadata) -> Self {
        Self { body, metadata }
    }

    /// Add a metadata entry (builder pattern)
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key, value);
        self
    }

    /// The body
    pub fn body(&self) -> &dyn Payload {
        self.body.as_ref()
    }

    /// The body as a concrete type
    pub fn body_as<T: Contract>(&self) -> Option<&T> {
        self.body.as_ref().downcast_ref::<T>()
    }

    /// Metadata
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Mutable metadata
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Split into body and metadata
    pub fn into_parts(self) -> (Box<dyn Payload>, Metadata) {
        (self.body, self.metadata)
    }
}

impl Clone for EventRecord {
    fn clone(&self) -> Self {
        Self {
            body: self.body.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

impl PartialEq for EventRecord {
    fn eq(&self, other: &Self) -> bool {
        self.body.eq_payload(other.body.as_ref()) && self.metadata == other.metadata
    }
}

impl fmt::Debug for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRecord")
            .field("body", &self.body)
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl Contract for Vec<EventRecord> {
    fn contract_name() -> Cow<'static, str> {
        Cow::Borrowed(EVENT_RECORD_LIST_CONTRACT)
    }

    fn contract_kind() -> ContractKind {
        ContractKind::Sequence
    }
}
