//! Envelope codec
//!
//! ## Envelope Format
//!
//! ```text
//! [identity: 16 bytes][payload: bytes]
//! ```
//!
//! - **identity**: [`TypeIdentity`] of the value's contract, raw bytes
//! - **payload**: the wire format's encoding of the value, as produced by
//!   the contract's registry entry
//!
//! There is no payload length; the caller frames envelopes (one per file,
//! one per message, ...). An absent value encodes to zero bytes and an empty
//! stream decodes to `None`.
//!
//! ## Tagged Format
//!
//! ```text
//! [tag: u32 LE][payload: bytes]
//! ```
//!
//! Used for values nested in a slot typed as their base: the tag is the
//! value's subtype tag under that base.
//!
//! A stream whose payload failed mid-write is not recoverable; the header is
//! already out. Treat the whole stream as undecodable.

use crate::config::EnvelopeConfig;
use crate::format::{BincodeFormat, WireFormat};
use crate::registry::{ContractEntry, ContractRegistry, LOG_TARGET};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;
use strata_core::error::{Error, Result};
use strata_core::{downcast_payload, Contract, ContractBase, Payload, TypeIdentity, IDENTITY_LEN};
use tracing::trace;

/// Width of a tagged-envelope header
pub const TAG_LEN: usize = 4;

/// Type-tagged envelope encoder/decoder
///
/// Cheap to clone; clones share one immutable registry.
pub struct EnvelopeCodec<F: WireFormat = BincodeFormat> {
    registry: Arc<ContractRegistry<F>>,
}

impl<F: WireFormat> Clone for EnvelopeCodec<F> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl EnvelopeCodec<BincodeFormat> {
    /// Codec over bincode with only the built-in contracts
    pub fn with_builtins() -> Result<Self> {
        Ok(Self::new(ContractRegistry::new()?))
    }
}

impl<F: WireFormat> EnvelopeCodec<F> {
    /// Freeze a bootstrapped registry into a codec
    pub fn new(registry: ContractRegistry<F>) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Codec over a registry built from configuration
    pub fn from_config(config: &EnvelopeConfig) -> Result<Self> {
        Ok(Self::new(ContractRegistry::from_config(config)?))
    }

    /// The registry
    pub fn registry(&self) -> &ContractRegistry<F> {
        &self.registry
    }

    /// Encode a value behind its identity header
    ///
    /// `None` writes nothing.
    ///
    /// # Errors
    ///
    /// - [`Error::UnregisteredType`] if the value's type was never registered
    /// - wire format and I/O errors from the payload
    pub fn encode<W: Write>(&self, writer: &mut W, value: Option<&dyn Payload>) -> Result<()> {
        let Some(value) = value else {
            return Ok(());
        };
        let entry = self.entry_of(value)?;
        trace!(
            target: LOG_TARGET,
            identity = %entry.identity(),
            contract = entry.name(),
            "Encoding envelope"
        );
        writer.write_all(entry.identity().as_bytes())?;
        (entry.encode)(self.registry(), value, writer)
    }

    /// Decode one envelope
    ///
    /// Returns `None` if the stream is empty.
    ///
    /// # Errors
    ///
    /// - [`Error::TruncatedHeader`] if the stream ends inside the header
    /// - [`Error::UnresolvableIdentity`] if the header names no registered
    ///   contract
    /// - wire format and I/O errors from the payload
    pub fn decode<R: Read>(&self, reader: &mut R) -> Result<Option<Box<dyn Payload>>> {
        let mut header = [0u8; IDENTITY_LEN];
        let read = read_header(reader, &mut header)?;
        if read == 0 {
            return Ok(None);
        }
        if read < IDENTITY_LEN {
            return Err(Error::TruncatedHeader {
                read,
                expected: IDENTITY_LEN,
            });
        }

        let identity = TypeIdentity::from_bytes(header);
        let entry = self
            .registry
            .resolve_type(&identity)
            .ok_or(Error::UnresolvableIdentity { identity })?;
        trace!(
            target: LOG_TARGET,
            identity = %identity,
            contract = entry.name(),
            decode_as = entry.decode_as(),
            "Decoding envelope"
        );
        (entry.decode)(self.registry(), reader).map(Some)
    }

    /// Encode a statically typed value
    pub fn encode_value<T: Contract, W: Write>(&self, writer: &mut W, value: &T) -> Result<()> {
        self.encode(writer, Some(value as &dyn Payload))
    }

    /// Decode an envelope expected to hold a `T`
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] if the stream holds another contract, plus
    /// everything [`Self::decode`] returns.
    pub fn decode_value<T: Contract, R: Read>(&self, reader: &mut R) -> Result<Option<T>> {
        match self.decode(reader)? {
            None => Ok(None),
            Some(payload) => downcast_payload::<T>(payload).map(Some),
        }
    }

    /// Encode into a fresh buffer
    pub fn to_bytes(&self, value: &dyn Payload) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode(&mut buf, Some(value))?;
        Ok(buf)
    }

    /// Decode a complete buffer
    pub fn from_bytes(&self, bytes: &[u8]) -> Result<Option<Box<dyn Payload>>> {
        self.decode(&mut Cursor::new(bytes))
    }

    /// Encode a value behind its subtype tag under `base`
    ///
    /// # Errors
    ///
    /// [`Error::UnknownSubtype`] if the value's contract is not a subtype of
    /// `base`.
    pub fn encode_tagged<W: Write>(
        &self,
        base: ContractBase,
        writer: &mut W,
        value: &dyn Payload,
    ) -> Result<()> {
        let entry = self.entry_of(value)?;
        let tag = self
            .registry
            .subtypes()
            .tag_for(base, &entry.identity())
            .ok_or_else(|| Error::UnknownSubtype {
                base: base.to_string(),
                detail: format!("contract '{}' is not a subtype", entry.name()),
            })?;
        trace!(
            target: LOG_TARGET,
            base = %base,
            tag,
            contract = entry.name(),
            "Encoding tagged envelope"
        );
        writer.write_u32::<LittleEndian>(tag)?;
        (entry.encode)(self.registry(), value, writer)
    }

    /// Decode a value framed by [`Self::encode_tagged`]
    ///
    /// Returns `None` if the stream is empty.
    pub fn decode_tagged<R: Read>(
        &self,
        base: ContractBase,
        reader: &mut R,
    ) -> Result<Option<Box<dyn Payload>>> {
        let mut header = [0u8; TAG_LEN];
        let read = read_header(reader, &mut header)?;
        if read == 0 {
            return Ok(None);
        }
        if read < TAG_LEN {
            return Err(Error::TruncatedHeader {
                read,
                expected: TAG_LEN,
            });
        }

        let tag = Cursor::new(header).read_u32::<LittleEndian>()?;
        let identity = self
            .registry
            .subtypes()
            .identity_for(base, tag)
            .ok_or_else(|| Error::UnknownSubtype {
                base: base.to_string(),
                detail: format!("no subtype with tag {}", tag),
            })?;
        let entry = self
            .registry
            .resolve_type(&identity)
            .ok_or(Error::UnresolvableIdentity { identity })?;
        (entry.decode)(self.registry(), reader).map(Some)
    }

    fn entry_of(&self, value: &dyn Payload) -> Result<&ContractEntry<F>> {
        self.registry
            .entry_for(value.concrete_type_id())
            .ok_or_else(|| Error::UnregisteredType {
                type_name: value.payload_type_name().to_string(),
            })
    }
}

impl<F: WireFormat> std::fmt::Debug for EnvelopeCodec<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeCodec")
            .field("registry", &self.registry)
            .finish()
    }
}

/// Fill `buf` from the stream, stopping early only at end of stream
///
/// Returns the number of bytes read; 0 means the stream was empty.
fn read_header<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
