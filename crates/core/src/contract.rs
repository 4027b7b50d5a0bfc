//! Contract traits
//!
//! A *contract* is a type that may travel inside an envelope. Contracts are
//! registered explicitly; nothing is discovered by scanning.
//!
//! - [`Contract`]: static description of a registrable type (name, optional
//!   identity override, kind, declared base).
//! - [`Payload`]: object-safe view of a contract value, used wherever the
//!   concrete type is only known at runtime.

use crate::error::{Error, Result};
use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Shape of a contract as far as subtype registration is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
    /// Plain value; registered as a subtype of its declared base
    Object,
    /// Enumerable of elements; encoded natively, never a subtype
    Sequence,
    /// String leaf; encoded natively, never a subtype
    Text,
}

impl ContractKind {
    /// Whether contracts of this kind join the subtype model
    pub fn is_subtype_eligible(&self) -> bool {
        matches!(self, ContractKind::Object)
    }
}

/// Named polymorphic base hierarchy
///
/// Subtype tags are scoped to a base, so independent hierarchies never share
/// a tag namespace. Contracts that declare no base land in [`ContractBase::ROOT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContractBase(&'static str);

impl ContractBase {
    /// Base of every contract that declares none
    pub const ROOT: ContractBase = ContractBase("object");

    /// A base identified by name
    pub const fn named(name: &'static str) -> Self {
        Self(name)
    }

    /// A base identified by a marker type
    pub fn of<B: ?Sized + 'static>() -> Self {
        Self(std::any::type_name::<B>())
    }

    /// Base name
    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl Default for ContractBase {
    fn default() -> Self {
        Self::ROOT
    }
}

impl fmt::Display for ContractBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A type that can be registered and carried inside an envelope
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// struct OrderPlaced { order_id: u64 }
///
/// impl Contract for OrderPlaced {
///     fn contract_name() -> Cow<'static, str> {
///         Cow::Borrowed("orders.OrderPlaced")
///     }
/// }
/// ```
pub trait Contract: Any + Clone + PartialEq + fmt::Debug + Send + Sync {
    /// Fully-qualified contract name; input to identity derivation
    ///
    /// Defaults to the compiler's type name, which is stable within a build.
    /// Override it for identities that must survive refactors or toolchain
    /// upgrades.
    fn contract_name() -> Cow<'static, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }

    /// Explicit identity override (UUID text); bypasses name hashing
    fn contract_id() -> Option<&'static str> {
        None
    }

    /// Contract kind
    fn contract_kind() -> ContractKind {
        ContractKind::Object
    }

    /// Declared polymorphic base
    fn contract_base() -> ContractBase {
        ContractBase::ROOT
    }
}

/// Runtime-typed contract value
///
/// Implemented for every [`Contract`]; callers hold `&dyn Payload` or
/// `Box<dyn Payload>` when the concrete type is not statically known.
pub trait Payload: Any + Send + Sync + fmt::Debug {
    /// Borrow as `Any` for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Convert into a boxed `Any` for owned downcasting
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;

    /// Clone into a new box
    fn clone_payload(&self) -> Box<dyn Payload>;

    /// Structural equality against another payload of any type
    fn eq_payload(&self, other: &dyn Payload) -> bool;

    /// Rust type name of the concrete value
    fn payload_type_name(&self) -> &'static str;
}

impl<T: Contract> Payload for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }

    fn clone_payload(&self) -> Box<dyn Payload> {
        Box::new(self.clone())
    }

    fn eq_payload(&self, other: &dyn Payload) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }

    fn payload_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl dyn Payload {
    /// `TypeId` of the concrete value
    pub fn concrete_type_id(&self) -> TypeId {
        self.as_any().type_id()
    }

    /// Whether the concrete value is a `T`
    pub fn is<T: Any>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Borrow the concrete value as a `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Take ownership of a boxed payload as a concrete `T`
///
/// # Errors
///
/// [`Error::TypeMismatch`] naming both types if the payload holds another
/// type.
pub fn downcast_payload<T: Contract>(payload: Box<dyn Payload>) -> Result<T> {
    let actual = payload.payload_type_name();
    payload
        .into_any()
        .downcast::<T>()
        .map(|value| *value)
        .map_err(|_| Error::TypeMismatch {
            expected: std::any::type_name::<T>().to_string(),
            actual: actual.to_string(),
        })
}

impl Clone for Box<dyn Payload> {
    fn clone(&self) -> Self {
        self.as_ref().clone_payload()
    }
}

impl PartialEq for Box<dyn Payload> {
    fn eq(&self, other: &Self) -> bool {
        self.as_ref().eq_payload(other.as_ref())
    }
}

// ============================================================================
// Built-in contract implementations for std types
// ============================================================================

macro_rules! scalar_contract {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Contract for $ty {}
        )*
    };
}

scalar_contract!(bool, i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, f32, f64, char);

impl Contract for String {
    fn contract_kind() -> ContractKind {
        ContractKind::Text
    }
}

impl<T: Contract> Contract for Vec<T> {
    fn contract_kind() -> ContractKind {
        ContractKind::Sequence
    }
}

impl<T: Contract> Contract for BTreeMap<String, T> {
    fn contract_kind() -> ContractKind {
        ContractKind::Sequence
    }
}
