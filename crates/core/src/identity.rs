//! Contract identities
//!
//! A [`TypeIdentity`] is the 128-bit discriminator written in front of every
//! envelope. It is either derived from the contract's fully-qualified name
//! (MD5 over the UTF-16LE encoding of the name) or taken from an explicit
//! override declared by the contract.
//!
//! Derivation is pure: the same name yields the same identity in every
//! process, which is what lets a producer and a consumer that registered the
//! same contracts talk to each other.

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Width of an identity on the wire
pub const IDENTITY_LEN: usize = 16;

/// Stable 128-bit discriminator of a registered contract
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeIdentity([u8; IDENTITY_LEN]);

impl TypeIdentity {
    /// The all-zero identity. Never bound to a contract.
    pub const NIL: TypeIdentity = TypeIdentity([0u8; IDENTITY_LEN]);

    /// Derive the identity of a contract name
    pub fn from_name(name: &str) -> Self {
        let mut hasher = Md5::new();
        for unit in name.encode_utf16() {
            hasher.update(unit.to_le_bytes());
        }
        let digest = hasher.finalize();

        let mut bytes = [0u8; IDENTITY_LEN];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Parse an identity override
    ///
    /// Accepts any UUID text form `uuid` understands (hyphenated, simple,
    /// braced, urn). Bytes are kept in RFC 4122 order.
    ///
    /// # Errors
    /// Returns None if the string is not a valid UUID.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(|u| Self(*u.as_bytes()))
    }

    /// Create an identity from raw header bytes
    pub const fn from_bytes(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw header bytes
    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    /// Whether this is the all-zero identity
    pub fn is_nil(&self) -> bool {
        self.0 == [0u8; IDENTITY_LEN]
    }

    /// 32-bit fold of the identity
    ///
    /// XOR of the four little-endian 32-bit words. Only used by the
    /// hash-derived subtype tag strategy.
    pub fn hash_code(&self) -> i32 {
        self.0
            .chunks_exact(4)
            .map(|w| i32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .fold(0, |acc, w| acc ^ w)
    }

    /// The identity as a UUID
    pub fn to_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.0)
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uuid().hyphenated())
    }
}

impl fmt::Debug for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeIdentity({})", self)
    }
}

impl From<[u8; IDENTITY_LEN]> for TypeIdentity {
    fn from(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<Uuid> for TypeIdentity {
    fn from(uuid: Uuid) -> Self {
        Self(*uuid.as_bytes())
    }
}
