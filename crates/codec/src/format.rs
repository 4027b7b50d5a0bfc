//! Wire formats
//!
//! A [`WireFormat`] is the structured binary encoder the envelope delegates
//! payloads to. It only ever sees values whose concrete type is statically
//! known at the call site; all type tagging happens in the envelope.
//!
//! Both implementations are self-delimiting: `decode` consumes exactly the
//! bytes `encode` produced, so several encodings can follow each other on
//! one stream.
//!
//! ## Decode limit
//!
//! Streams are untrusted. Every `decode` takes a byte limit, and a length
//! prefix claiming more than what is left of it fails with
//! [`Error::Serialization`] before any buffer is sized from it.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};
use strata_core::error::{Error, Result};

/// Default cap on the bytes a single decode may consume (16 MiB)
pub const DEFAULT_DECODE_LIMIT: u64 = 16 * 1024 * 1024;

/// Structured binary encoder for statically typed values
pub trait WireFormat: Send + Sync + 'static {
    /// Format name, matched against `EnvelopeConfig::format`
    const NAME: &'static str;

    /// Write one self-delimiting encoding of `value`
    fn encode<T: Serialize + ?Sized>(writer: &mut dyn Write, value: &T) -> Result<()>;

    /// Read one encoding back, consuming at most `limit` bytes
    fn decode<T: DeserializeOwned>(reader: &mut dyn Read, limit: u64) -> Result<T>;
}

/// bincode (fixed-width little-endian integers, u64 length prefixes)
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeFormat;

impl WireFormat for BincodeFormat {
    const NAME: &'static str = "bincode";

    fn encode<T: Serialize + ?Sized>(writer: &mut dyn Write, value: &T) -> Result<()> {
        bincode::serialize_into(writer, value)?;
        Ok(())
    }

    fn decode<T: DeserializeOwned>(reader: &mut dyn Read, limit: u64) -> Result<T> {
        // Same layout as `bincode::serialize_into`, plus the limit
        Ok(bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .with_limit(limit)
            .deserialize_from(reader)?)
    }
}

/// MessagePack via rmp-serde (structs as arrays)
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagePackFormat;

impl WireFormat for MessagePackFormat {
    const NAME: &'static str = "msgpack";

    fn encode<T: Serialize + ?Sized>(mut writer: &mut dyn Write, value: &T) -> Result<()> {
        rmp_serde::encode::write(&mut writer, value).map_err(Error::serialization)
    }

    fn decode<T: DeserializeOwned>(reader: &mut dyn Read, limit: u64) -> Result<T> {
        // rmp-serde sizes string and binary buffers straight from the
        // prefix, so the value is copied out under the limit first.
        let mut copy = BoundedValue::new(reader, limit);
        copy.read_value()?;
        rmp_serde::from_slice(&copy.bytes).map_err(Error::serialization)
    }
}

/// Copies exactly one MessagePack value off a stream
struct BoundedValue<'a> {
    reader: &'a mut dyn Read,
    bytes: Vec<u8>,
    limit: u64,
}

impl<'a> BoundedValue<'a> {
    fn new(reader: &'a mut dyn Read, limit: u64) -> Self {
        Self {
            reader,
            bytes: Vec::new(),
            limit,
        }
    }

    fn take(&mut self, len: u64) -> Result<()> {
        let used = self.bytes.len() as u64;
        if len > self.limit.saturating_sub(used) {
            return Err(Error::Serialization(format!(
                "MessagePack value exceeds the decode limit of {} bytes",
                self.limit
            )));
        }
        let start = self.bytes.len();
        self.bytes.resize(start + len as usize, 0);
        self.reader.read_exact(&mut self.bytes[start..])?;
        Ok(())
    }

    /// Big-endian length of `width` bytes
    fn length(&mut self, width: usize) -> Result<u64> {
        self.take(width as u64)?;
        let tail = &self.bytes[self.bytes.len() - width..];
        Ok(tail.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }

    fn read_value(&mut self) -> Result<()> {
        // Values still to read; containers add their element count
        let mut pending: u64 = 1;
        while pending > 0 {
            pending -= 1;
            self.take(1)?;
            let marker = self.bytes[self.bytes.len() - 1];
            match marker {
                0x00..=0x7f | 0xe0..=0xff | 0xc0 | 0xc2 | 0xc3 => {}
                0x80..=0x8f => pending = pending.saturating_add(2 * u64::from(marker & 0x0f)),
                0x90..=0x9f => pending = pending.saturating_add(u64::from(marker & 0x0f)),
                0xa0..=0xbf => self.take(u64::from(marker & 0x1f))?,
                0xc4 | 0xd9 => {
                    let len = self.length(1)?;
                    self.take(len)?;
                }
                0xc5 | 0xda => {
                    let len = self.length(2)?;
                    self.take(len)?;
                }
                0xc6 | 0xdb => {
                    let len = self.length(4)?;
                    self.take(len)?;
                }
                // ext 8/16/32: length, then type byte and data
                0xc7 => {
                    let len = self.length(1)?;
                    self.take(len + 1)?;
                }
                0xc8 => {
                    let len = self.length(2)?;
                    self.take(len + 1)?;
                }
                0xc9 => {
                    let len = self.length(4)?;
                    self.take(len + 1)?;
                }
                0xcc | 0xd0 => self.take(1)?,
                0xcd | 0xd1 => self.take(2)?,
                0xca | 0xce | 0xd2 => self.take(4)?,
                0xcb | 0xcf | 0xd3 => self.take(8)?,
                // fixext 1/2/4/8/16: type byte and data
                0xd4 => self.take(2)?,
                0xd5 => self.take(3)?,
                0xd6 => self.take(5)?,
                0xd7 => self.take(9)?,
                0xd8 => self.take(17)?,
                0xdc => {
                    let len = self.length(2)?;
                    pending = pending.saturating_add(len);
                }
                0xdd => {
                    let len = self.length(4)?;
                    pending = pending.saturating_add(len);
                }
                0xde => {
                    let len = self.length(2)?;
                    pending = pending.saturating_add(2 * len);
                }
                0xdf => {
                    let len = self.length(4)?;
                    pending = pending.saturating_add(2 * len);
                }
                0xc1 => {
                    return Err(Error::Serialization(
                        "reserved MessagePack marker 0xc1".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }
}
