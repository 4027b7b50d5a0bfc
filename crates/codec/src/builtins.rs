//! Built-in contracts
//!
//! Every registry created with built-ins knows these contracts:
//!
//! | Contract | Wire shape |
//! |----------|------------|
//! | `Vec<EventRecord>` | record list: count, then `[body identity][RecordCarrier<Body>]` per record |
//! | `Commit` | `CommitHeader` followed by a record list |
//! | `BTreeMap<String, String>` | native map |
//! | `FailureReport` | native struct |

use crate::carrier::{flatten_metadata, inflate_metadata, MetadataPair};
use crate::format::WireFormat;
use crate::registry::ContractRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use strata_core::error::{Error, Result};
use strata_core::{Commit, EventRecord, FailureReport, Payload};
use uuid::Uuid;

/// Decode-as shape name of a record list
pub const RECORD_LIST_WIRE_SHAPE: &str = "Vec<RecordCarrier<_>>";

/// Decode-as shape name of a commit
pub const COMMIT_WIRE_SHAPE: &str = "CommitHeader + Vec<RecordCarrier<_>>";

pub(crate) fn register_builtins<F: WireFormat>(registry: &mut ContractRegistry<F>) -> Result<()> {
    registry.register_with::<Commit>(COMMIT_WIRE_SHAPE, encode_commit::<F>, decode_commit::<F>)?;
    registry.register::<BTreeMap<String, String>>()?;
    registry.register_with::<Vec<EventRecord>>(
        RECORD_LIST_WIRE_SHAPE,
        encode_record_list::<F>,
        decode_record_list::<F>,
    )?;
    registry.register::<FailureReport>()?;
    Ok(())
}

fn mismatch<T>(value: &dyn Payload) -> Error {
    Error::TypeMismatch {
        expected: std::any::type_name::<T>().to_string(),
        actual: value.payload_type_name().to_string(),
    }
}

fn encode_record_list<F: WireFormat>(
    registry: &ContractRegistry<F>,
    value: &dyn Payload,
    writer: &mut dyn Write,
) -> Result<()> {
    let records = value
        .downcast_ref::<Vec<EventRecord>>()
        .ok_or_else(|| mismatch::<Vec<EventRecord>>(value))?;
    registry.write_records(records, writer)
}

fn decode_record_list<F: WireFormat>(
    registry: &ContractRegistry<F>,
    reader: &mut dyn Read,
) -> Result<Box<dyn Payload>> {
    Ok(Box::new(registry.read_records(reader)?))
}

/// Everything in a commit except its events
#[derive(Debug, Serialize, Deserialize)]
struct CommitHeader {
    stream_id: Uuid,
    stream_revision: u64,
    commit_id: Uuid,
    commit_sequence: u64,
    commit_stamp: u64,
    headers: Vec<MetadataPair>,
}

fn encode_commit<F: WireFormat>(
    registry: &ContractRegistry<F>,
    value: &dyn Payload,
    writer: &mut dyn Write,
) -> Result<()> {
    let commit = value
        .downcast_ref::<Commit>()
        .ok_or_else(|| mismatch::<Commit>(value))?;
    let header = CommitHeader {
        stream_id: commit.stream_id,
        stream_revision: commit.stream_revision,
        commit_id: commit.commit_id,
        commit_sequence: commit.commit_sequence,
        commit_stamp: commit.commit_stamp,
        headers: flatten_metadata(&commit.headers),
    };
    F::encode(&mut *writer, &header)?;
    registry.write_records(&commit.events, writer)
}

fn decode_commit<F: WireFormat>(
    registry: &ContractRegistry<F>,
    reader: &mut dyn Read,
) -> Result<Box<dyn Payload>> {
    let header: CommitHeader = F::decode(&mut *reader, registry.decode_limit())?;
    let events = registry.read_records(reader)?;
    Ok(Box::new(Commit {
        stream_id: header.stream_id,
        stream_revision: header.stream_revision,
        commit_id: header.commit_id,
        commit_sequence: header.commit_sequence,
        commit_stamp: header.commit_stamp,
        headers: inflate_metadata(header.headers),
        events,
    }))
}
