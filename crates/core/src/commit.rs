//! Commit contract
//!
//! A commit is the unit an event stream is persisted in: a batch of event
//! records appended to one stream at one revision, plus commit-level headers.
//! The body of each record is polymorphic, so a commit is encoded with the
//! same per-element carrier scheme as a record list.

use crate::contract::Contract;
use crate::metadata::Metadata;
use crate::record::EventRecord;
use std::borrow::Cow;
use uuid::Uuid;

/// Contract name of [`Commit`]
pub const COMMIT_CONTRACT: &str = "Strata.Envelope.Commit";

/// A batch of events appended to a stream
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    /// Stream the events belong to
    pub stream_id: Uuid,
    /// Stream revision after the last event of this commit
    pub stream_revision: u64,
    /// Unique commit identifier (idempotency key)
    pub commit_id: Uuid,
    /// Commit sequence number within the stream
    pub commit_sequence: u64,
    /// Commit timestamp (microseconds since epoch)
    pub commit_stamp: u64,
    /// Commit-level headers
    pub headers: Metadata,
    /// Events, in append order
    pub events: Vec<EventRecord>,
}

impl Commit {
    /// Create an empty commit
    pub fn new(stream_id: Uuid, stream_revision: u64, commit_sequence: u64) -> Self {
        Self {
            stream_id,
            stream_revision,
            commit_id: Uuid::new_v4(),
            commit_sequence,
            commit_stamp: 0,
            headers: Metadata::new(),
            events: Vec::new(),
        }
    }

    /// Append an event (builder pattern)
    pub fn with_event(mut self, event: EventRecord) -> Self {
        self.events.push(event);
        self
    }

    /// Set the commit timestamp (builder pattern)
    pub fn with_stamp(mut self, micros: u64) -> Self {
        self.commit_stamp = micros;
        self
    }
}

impl Contract for Commit {
    fn contract_name() -> Cow<'static, str> {
        Cow::Borrowed(COMMIT_CONTRACT)
    }
}
