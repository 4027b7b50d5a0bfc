//! Contract registry
//!
//! The registry owns the bidirectional mapping between registered types and
//! their [`TypeIdentity`], plus the dispatch table used to encode and decode
//! each contract. Dispatch entries are monomorphised function pointers built
//! once at registration; nothing is resolved by reflection at encode/decode
//! time.
//!
//! ## Registration Rules
//!
//! - An empty contract name is not eligible: registration is a silent no-op.
//! - Registering a type twice is a no-op returning the original identity.
//! - An identity override that does not parse (or parses to nil) fails with
//!   [`Error::MalformedIdentityOverride`].
//! - An identity already bound to another type fails with
//!   [`Error::IdentityCollision`].
//! - Object contracts also receive a subtype tag under their declared base;
//!   a duplicate tag fails with [`Error::DuplicateSubtypeTag`].
//!
//! A failed registration leaves the registry untouched.
//!
//! ## Concurrency
//!
//! Registration takes `&mut self`, so it is confined to bootstrap. Once the
//! registry is shared (see `EnvelopeCodec`) it is immutable and lookups need
//! no locking.

use crate::builtins;
use crate::carrier::RecordCarrier;
use crate::config::EnvelopeConfig;
use crate::format::{BincodeFormat, WireFormat, DEFAULT_DECODE_LIMIT};
use crate::subtype::{SequentialTags, SubtypeModel, TagAllocator};
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::io::{Read, Write};
use std::marker::PhantomData;
use strata_core::error::{Error, Result};
use strata_core::{
    Contract, ContractBase, ContractKind, EventRecord, Payload, TypeIdentity, IDENTITY_LEN,
};
use tracing::debug;

/// Logging target for the envelope layer
pub(crate) const LOG_TARGET: &str = "strata::envelope";

/// Upper bound on record-list preallocation, whatever the stream claims
const MAX_PREALLOCATED_RECORDS: u64 = 1024;

/// Encodes a payload of the entry's concrete type
pub type EncodeFn<F> = fn(&ContractRegistry<F>, &dyn Payload, &mut dyn Write) -> Result<()>;

/// Decodes the entry's decode-as shape and converts it to the concrete type
pub type DecodeFn<F> = fn(&ContractRegistry<F>, &mut dyn Read) -> Result<Box<dyn Payload>>;

type CarrierEncodeFn = fn(&EventRecord, &mut dyn Write) -> Result<()>;
type CarrierDecodeFn = fn(&mut dyn Read, u64) -> Result<EventRecord>;

#[derive(Clone, Copy)]
pub(crate) struct CarrierCodec {
    pub(crate) encode: CarrierEncodeFn,
    pub(crate) decode: CarrierDecodeFn,
}

/// Registry record binding a type to its identity and wire shape
pub struct ContractEntry<F: WireFormat> {
    identity: TypeIdentity,
    type_id: TypeId,
    name: Cow<'static, str>,
    decode_as: &'static str,
    kind: ContractKind,
    base: ContractBase,
    tag: Option<u32>,
    pub(crate) encode: EncodeFn<F>,
    pub(crate) decode: DecodeFn<F>,
    pub(crate) carrier: Option<CarrierCodec>,
    _format: PhantomData<fn() -> F>,
}

impl<F: WireFormat> ContractEntry<F> {
    /// Identity written in the envelope header
    pub fn identity(&self) -> TypeIdentity {
        self.identity
    }

    /// `TypeId` of the concrete type
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Contract name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the shape read off the wire
    pub fn decode_as(&self) -> &'static str {
        self.decode_as
    }

    /// Contract kind
    pub fn kind(&self) -> ContractKind {
        self.kind
    }

    /// Declared base
    pub fn base(&self) -> ContractBase {
        self.base
    }

    /// Subtype tag under [`Self::base`], if the contract is a subtype
    pub fn tag(&self) -> Option<u32> {
        self.tag
    }

    /// Whether values of this contract can be record bodies
    pub fn is_carriable(&self) -> bool {
        self.carrier.is_some()
    }
}

impl<F: WireFormat> fmt::Debug for ContractEntry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractEntry")
            .field("identity", &self.identity)
            .field("name", &self.name)
            .field("decode_as", &self.decode_as)
            .field("kind", &self.kind)
            .field("base", &self.base)
            .field("tag", &self.tag)
            .finish()
    }
}

/// Everything needed to insert one entry
struct EntrySpec<F: WireFormat> {
    type_id: TypeId,
    name: Cow<'static, str>,
    override_id: Option<&'static str>,
    kind: ContractKind,
    base: ContractBase,
    decode_as: &'static str,
    encode: EncodeFn<F>,
    decode: DecodeFn<F>,
    carrier: Option<CarrierCodec>,
    _format: PhantomData<fn() -> F>,
}

/// Bidirectional type ↔ identity mapping with per-contract dispatch
pub struct ContractRegistry<F: WireFormat = BincodeFormat> {
    entries: Vec<ContractEntry<F>>,
    by_type: FxHashMap<TypeId, usize>,
    by_identity: FxHashMap<TypeIdentity, usize>,
    subtypes: SubtypeModel,
    tags: Box<dyn TagAllocator>,
    decode_limit: u64,
    _format: PhantomData<fn() -> F>,
}

impl ContractRegistry<BincodeFormat> {
    /// Registry over bincode with the built-in contracts registered
    ///
    /// # Errors
    ///
    /// Fails only if a built-in contract cannot be registered, which
    /// indicates a broken build.
    pub fn new() -> Result<Self> {
        Self::bootstrap(Box::new(SequentialTags::new()), true)
    }

    /// Registry over bincode with no contracts
    pub fn empty() -> Self {
        Self::empty_with(Box::new(SequentialTags::new()))
    }
}

impl<F: WireFormat> ContractRegistry<F> {
    /// Registry with no contracts and the given tag strategy
    pub fn empty_with(tags: Box<dyn TagAllocator>) -> Self {
        Self {
            entries: Vec::new(),
            by_type: FxHashMap::default(),
            by_identity: FxHashMap::default(),
            subtypes: SubtypeModel::new(),
            tags,
            decode_limit: DEFAULT_DECODE_LIMIT,
            _format: PhantomData,
        }
    }

    /// Registry with the given tag strategy, optionally seeded with the
    /// built-in contracts
    pub fn bootstrap(tags: Box<dyn TagAllocator>, with_builtins: bool) -> Result<Self> {
        let mut registry = Self::empty_with(tags);
        if with_builtins {
            builtins::register_builtins(&mut registry)?;
        }
        Ok(registry)
    }

    /// Registry built from configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configured format is not `F`
    /// or the tag strategy is unknown.
    pub fn from_config(config: &EnvelopeConfig) -> Result<Self> {
        config.validate()?;
        if config.format != F::NAME {
            return Err(Error::InvalidConfig(format!(
                "configured format '{}' does not match codec format '{}'",
                config.format,
                F::NAME
            )));
        }
        let registry = Self::bootstrap(config.tag_allocator()?, config.register_builtins)?
            .with_decode_limit(config.max_decode_bytes);
        tracing::info!(
            target: LOG_TARGET,
            format = F::NAME,
            tag_strategy = registry.tag_strategy(),
            decode_limit = registry.decode_limit(),
            contracts = registry.len(),
            "Contract registry bootstrapped"
        );
        Ok(registry)
    }

    /// Register a serde contract
    ///
    /// Returns the contract's identity, or `None` if the type is not
    /// eligible (empty name). Re-registering returns the existing identity.
    ///
    /// # Errors
    ///
    /// Configuration failures only; see the module docs.
    pub fn register<T>(&mut self) -> Result<Option<TypeIdentity>>
    where
        T: Contract + Serialize + DeserializeOwned,
    {
        self.register_as::<T, T>()
    }

    /// Register a contract read off the wire as `D` and converted into `T`
    ///
    /// `D` must decode what `T` encodes.
    pub fn register_as<T, D>(&mut self) -> Result<Option<TypeIdentity>>
    where
        T: Contract + Serialize,
        D: DeserializeOwned + Into<T> + 'static,
    {
        self.insert_entry(EntrySpec {
            type_id: TypeId::of::<T>(),
            name: T::contract_name(),
            override_id: T::contract_id(),
            kind: T::contract_kind(),
            base: T::contract_base(),
            decode_as: std::any::type_name::<D>(),
            encode: encode_serde::<T, F>,
            decode: decode_serde::<T, D, F>,
            carrier: Some(CarrierCodec {
                encode: encode_carrier::<T, F>,
                decode: decode_carrier::<T, D, F>,
            }),
            _format: PhantomData,
        })
    }

    /// Register a contract with hand-written encode/decode functions
    ///
    /// For contracts the wire format cannot handle directly (polymorphic
    /// fields). Such contracts cannot be record bodies.
    pub fn register_with<T: Contract>(
        &mut self,
        decode_as: &'static str,
        encode: EncodeFn<F>,
        decode: DecodeFn<F>,
    ) -> Result<Option<TypeIdentity>> {
        self.insert_entry(EntrySpec {
            type_id: TypeId::of::<T>(),
            name: T::contract_name(),
            override_id: T::contract_id(),
            kind: T::contract_kind(),
            base: T::contract_base(),
            decode_as,
            encode,
            decode,
            carrier: None,
            _format: PhantomData,
        })
    }

    fn insert_entry(&mut self, spec: EntrySpec<F>) -> Result<Option<TypeIdentity>> {
        if spec.name.is_empty() {
            debug!(target: LOG_TARGET, "Skipping contract with empty name");
            return Ok(None);
        }
        if let Some(&idx) = self.by_type.get(&spec.type_id) {
            return Ok(Some(self.entries[idx].identity));
        }

        let identity = derive_identity(&spec.name, spec.override_id)?;

        if let Some(&idx) = self.by_identity.get(&identity) {
            return Err(Error::IdentityCollision {
                identity,
                existing: self.entries[idx].name.to_string(),
                incoming: spec.name.to_string(),
            });
        }

        let tag = if spec.kind.is_subtype_eligible() {
            let tag = self.tags.allocate(spec.base, &identity);
            self.subtypes.add_subtype(spec.base, tag, identity, &spec.name)?;
            Some(tag)
        } else {
            None
        };

        debug!(
            target: LOG_TARGET,
            identity = %identity,
            contract = %spec.name,
            decode_as = spec.decode_as,
            base = %spec.base,
            tag = ?tag,
            "Registered contract"
        );

        let idx = self.entries.len();
        self.entries.push(ContractEntry {
            identity,
            type_id: spec.type_id,
            name: spec.name,
            decode_as: spec.decode_as,
            kind: spec.kind,
            base: spec.base,
            tag,
            encode: spec.encode,
            decode: spec.decode,
            carrier: spec.carrier,
            _format: PhantomData,
        });
        self.by_type.insert(spec.type_id, idx);
        self.by_identity.insert(identity, idx);

        Ok(Some(identity))
    }

    /// Identity of a registered type
    pub fn resolve_identity(&self, type_id: TypeId) -> Option<TypeIdentity> {
        self.entry_for(type_id).map(|e| e.identity)
    }

    /// Identity of a registered `T`
    pub fn resolve_identity_of<T: 'static>(&self) -> Option<TypeIdentity> {
        self.resolve_identity(TypeId::of::<T>())
    }

    /// Entry bound to an identity
    pub fn resolve_type(&self, identity: &TypeIdentity) -> Option<&ContractEntry<F>> {
        self.by_identity.get(identity).map(|&idx| &self.entries[idx])
    }

    /// Entry of a registered type
    pub fn entry_for(&self, type_id: TypeId) -> Option<&ContractEntry<F>> {
        self.by_type.get(&type_id).map(|&idx| &self.entries[idx])
    }

    /// Whether `T` is registered
    pub fn contains<T: 'static>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    /// Entries in registration order
    pub fn entries(&self) -> impl Iterator<Item = &ContractEntry<F>> {
        self.entries.iter()
    }

    /// Number of registered contracts
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no contracts are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Subtype tag tables
    pub fn subtypes(&self) -> &SubtypeModel {
        &self.subtypes
    }

    /// Name of the tag strategy in use
    pub fn tag_strategy(&self) -> &'static str {
        self.tags.name()
    }

    /// Most bytes a single wire-format decode may consume
    pub fn decode_limit(&self) -> u64 {
        self.decode_limit
    }

    /// Cap every wire-format decode at `limit` bytes
    ///
    /// A length prefix claiming more fails the decode with
    /// [`Error::Serialization`] before anything is allocated for it.
    pub fn with_decode_limit(mut self, limit: u64) -> Self {
        self.decode_limit = limit;
        self
    }

    /// Write a record list: count, then per record the body identity and
    /// the record's carrier
    pub(crate) fn write_records(
        &self,
        records: &[EventRecord],
        writer: &mut dyn Write,
    ) -> Result<()> {
        F::encode(&mut *writer, &(records.len() as u64))?;
        for record in records {
            let body = record.body();
            let entry = self
                .entry_for(body.concrete_type_id())
                .ok_or_else(|| Error::UnregisteredType {
                    type_name: body.payload_type_name().to_string(),
                })?;
            let carrier = entry.carrier.ok_or_else(|| {
                Error::Serialization(format!(
                    "contract '{}' cannot be carried as a record body",
                    entry.name
                ))
            })?;
            writer.write_all(entry.identity.as_bytes())?;
            (carrier.encode)(record, &mut *writer)?;
        }
        Ok(())
    }

    /// Read a record list written by [`Self::write_records`]
    pub(crate) fn read_records(&self, reader: &mut dyn Read) -> Result<Vec<EventRecord>> {
        let count: u64 = F::decode(&mut *reader, self.decode_limit)?;
        let mut records = Vec::with_capacity(count.min(MAX_PREALLOCATED_RECORDS) as usize);
        for _ in 0..count {
            let mut header = [0u8; IDENTITY_LEN];
            reader.read_exact(&mut header)?;
            let identity = TypeIdentity::from_bytes(header);
            let entry = self
                .resolve_type(&identity)
                .ok_or(Error::UnresolvableIdentity { identity })?;
            let carrier = entry.carrier.ok_or_else(|| {
                Error::Serialization(format!(
                    "contract '{}' cannot be carried as a record body",
                    entry.name
                ))
            })?;
            records.push((carrier.decode)(&mut *reader, self.decode_limit)?);
        }
        Ok(records)
    }
}

impl<F: WireFormat> fmt::Debug for ContractRegistry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractRegistry")
            .field("format", &F::NAME)
            .field("tag_strategy", &self.tags.name())
            .field("decode_limit", &self.decode_limit)
            .field("entries", &self.entries)
            .finish()
    }
}

/// Identity of a contract: the override if declared, else the name hash
fn derive_identity(name: &str, override_id: Option<&'static str>) -> Result<TypeIdentity> {
    let identity = match override_id {
        Some(raw) => TypeIdentity::parse(raw).unwrap_or(TypeIdentity::NIL),
        None => TypeIdentity::from_name(name),
    };
    if identity.is_nil() {
        return Err(Error::MalformedIdentityOverride {
            contract: name.to_string(),
            value: override_id.unwrap_or_default().to_string(),
        });
    }
    Ok(identity)
}

fn encode_serde<T, F>(
    _registry: &ContractRegistry<F>,
    value: &dyn Payload,
    writer: &mut dyn Write,
) -> Result<()>
where
    T: Contract + Serialize,
    F: WireFormat,
{
    let value = value
        .downcast_ref::<T>()
        .ok_or_else(|| Error::TypeMismatch {
            expected: std::any::type_name::<T>().to_string(),
            actual: value.payload_type_name().to_string(),
        })?;
    F::encode(writer, value)
}

fn decode_serde<T, D, F>(
    registry: &ContractRegistry<F>,
    reader: &mut dyn Read,
) -> Result<Box<dyn Payload>>
where
    T: Contract,
    D: DeserializeOwned + Into<T>,
    F: WireFormat,
{
    let shape: D = F::decode(reader, registry.decode_limit())?;
    let value: T = shape.into();
    Ok(Box::new(value))
}

fn encode_carrier<T, F>(record: &EventRecord, writer: &mut dyn Write) -> Result<()>
where
    T: Contract + Serialize,
    F: WireFormat,
{
    let carrier =
        RecordCarrier::<&T>::borrow_record(record).ok_or_else(|| Error::TypeMismatch {
            expected: std::any::type_name::<T>().to_string(),
            actual: record.body().payload_type_name().to_string(),
        })?;
    F::encode(writer, &carrier)
}

fn decode_carrier<T, D, F>(reader: &mut dyn Read, limit: u64) -> Result<EventRecord>
where
    T: Contract,
    D: DeserializeOwned + Into<T>,
    F: WireFormat,
{
    let carrier: RecordCarrier<D> = F::decode(reader, limit)?;
    Ok(carrier.map_body(Into::<T>::into).into_record())
}

/// Register an explicit list of serde contracts, stopping at the first error
///
/// ```ignore
/// register_contracts!(registry; OrderPlaced, OrderShipped)?;
/// ```
#[macro_export]
macro_rules! register_contracts {
    ($registry:expr; $($ty:ty),+ $(,)?) => {{
        let registry = &mut $registry;
        let mut result: $crate::Result<()> = Ok(());
        $(
            if result.is_ok() {
                if let Err(e) = registry.register::<$ty>() {
                    result = Err(e);
                }
            }
        )+
        result
    }};
}
