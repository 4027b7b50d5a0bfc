//! Subtype model
//!
//! When a contract value sits in a slot statically typed as its base, the
//! envelope can frame it with a small integer tag instead of the full
//! 16-byte identity. Tags are scoped per [`ContractBase`]; each base has
//! its own tag namespace.
//!
//! How tags are chosen is a [`TagAllocator`] strategy:
//!
//! - [`SequentialTags`] (default): 1, 2, 3, ... per base, in registration
//!   order. Never collides, but both peers must register in the same order.
//! - [`HashDerivedTags`]: `|identity.hash_code()| / 4`. Order-independent,
//!   but two identities can map to the same tag.

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::fmt;
use strata_core::error::{Error, Result};
use strata_core::{ContractBase, TypeIdentity};

/// Strategy assigning subtype tags at registration time
pub trait TagAllocator: Send + Sync + fmt::Debug {
    /// Tag for `identity` under `base`
    ///
    /// Called once per registered subtype. A returned tag that is already
    /// taken under `base` fails the registration.
    fn allocate(&mut self, base: ContractBase, identity: &TypeIdentity) -> u32;

    /// Strategy name, as spelled in `EnvelopeConfig::tag_strategy`
    fn name(&self) -> &'static str;
}

/// Monotonic per-base counter starting at 1
#[derive(Debug, Default)]
pub struct SequentialTags {
    next: FxHashMap<ContractBase, u32>,
}

impl SequentialTags {
    /// Create a fresh counter
    pub fn new() -> Self {
        Self::default()
    }
}

impl TagAllocator for SequentialTags {
    fn allocate(&mut self, base: ContractBase, _identity: &TypeIdentity) -> u32 {
        let next = self.next.entry(base).or_insert(1);
        let tag = *next;
        *next += 1;
        tag
    }

    fn name(&self) -> &'static str {
        "sequential"
    }
}

/// Tag derived from the identity hash
#[derive(Debug, Default, Clone, Copy)]
pub struct HashDerivedTags;

impl TagAllocator for HashDerivedTags {
    fn allocate(&mut self, _base: ContractBase, identity: &TypeIdentity) -> u32 {
        identity.hash_code().unsigned_abs() / 4
    }

    fn name(&self) -> &'static str {
        "hash"
    }
}

#[derive(Debug, Default)]
struct BaseTable {
    by_tag: BTreeMap<u32, (TypeIdentity, String)>,
    by_identity: FxHashMap<TypeIdentity, u32>,
}

/// Per-base tag tables
#[derive(Debug, Default)]
pub struct SubtypeModel {
    bases: BTreeMap<ContractBase, BaseTable>,
}

impl SubtypeModel {
    /// Empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that `tag` is free under `base` without inserting
    pub fn check_free(&self, base: ContractBase, tag: u32, contract: &str) -> Result<()> {
        if let Some((_, existing)) = self.bases.get(&base).and_then(|t| t.by_tag.get(&tag)) {
            return Err(Error::DuplicateSubtypeTag {
                base: base.to_string(),
                tag,
                existing: existing.clone(),
                incoming: contract.to_string(),
            });
        }
        Ok(())
    }

    /// Record `identity` as a subtype of `base` under `tag`
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateSubtypeTag`] if the tag is already taken.
    pub fn add_subtype(
        &mut self,
        base: ContractBase,
        tag: u32,
        identity: TypeIdentity,
        contract: &str,
    ) -> Result<()> {
        self.check_free(base, tag, contract)?;
        let table = self.bases.entry(base).or_default();
        table.by_tag.insert(tag, (identity, contract.to_string()));
        table.by_identity.insert(identity, tag);
        Ok(())
    }

    /// Tag of `identity` under `base`
    pub fn tag_for(&self, base: ContractBase, identity: &TypeIdentity) -> Option<u32> {
        self.bases
            .get(&base)
            .and_then(|t| t.by_identity.get(identity).copied())
    }

    /// Identity registered under `tag` in `base`
    pub fn identity_for(&self, base: ContractBase, tag: u32) -> Option<TypeIdentity> {
        self.bases
            .get(&base)
            .and_then(|t| t.by_tag.get(&tag).map(|(id, _)| *id))
    }

    /// Bases with at least one subtype
    pub fn bases(&self) -> impl Iterator<Item = ContractBase> + '_ {
        self.bases.keys().copied()
    }

    /// Subtypes of `base` in tag order
    pub fn subtypes_of(&self, base: ContractBase) -> Vec<(u32, TypeIdentity)> {
        self.bases
            .get(&base)
            .map(|t| t.by_tag.iter().map(|(tag, (id, _))| (*tag, *id)).collect())
            .unwrap_or_default()
    }

    /// Total number of subtypes across all bases
    pub fn len(&self) -> usize {
        self.bases.values().map(|t| t.by_tag.len()).sum()
    }

    /// Whether no subtypes are recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
