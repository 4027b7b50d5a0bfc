//! Error types for the envelope layer
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! ## Taxonomy
//!
//! - **Configuration failures** are raised while registering contracts and
//!   indicate a bug in the registration input: [`Error::IdentityCollision`],
//!   [`Error::DuplicateSubtypeTag`], [`Error::MalformedIdentityOverride`].
//! - **Encode failures**: [`Error::UnregisteredType`].
//! - **Decode failures**: [`Error::UnresolvableIdentity`],
//!   [`Error::TruncatedHeader`], [`Error::UnknownSubtype`].
//!
//! Nothing in this crate retries.

use crate::identity::TypeIdentity;
use std::io;
use thiserror::Error;

/// Result type alias for envelope operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the envelope layer
#[derive(Debug, Error)]
pub enum Error {
    /// Two distinct types derived the same identity
    #[error("Identity collision on {identity}: '{incoming}' conflicts with registered contract '{existing}'")]
    IdentityCollision {
        /// The contested identity
        identity: TypeIdentity,
        /// Contract already bound to the identity
        existing: String,
        /// Contract that attempted to bind it
        incoming: String,
    },

    /// Two contracts under the same base received the same subtype tag
    #[error("Duplicate subtype tag {tag} under base '{base}' for contract '{incoming}' (already used by '{existing}')")]
    DuplicateSubtypeTag {
        /// Base hierarchy the tag was allocated in
        base: String,
        /// The duplicated tag
        tag: u32,
        /// Contract holding the tag
        existing: String,
        /// Contract that was refused
        incoming: String,
    },

    /// Identity override is not a well-formed, non-nil 128-bit value
    #[error("Cannot derive identity for contract '{contract}': malformed override '{value}'")]
    MalformedIdentityOverride {
        /// Contract carrying the override
        contract: String,
        /// Raw override value
        value: String,
    },

    /// Encoding was asked to handle a type that was never registered
    #[error("Unable to serialize unregistered type '{type_name}'")]
    UnregisteredType {
        /// Runtime type name of the value
        type_name: String,
    },

    /// Stream header names an identity with no registry entry
    #[error("Unable to deserialize: no contract registered for identity {identity}")]
    UnresolvableIdentity {
        /// Identity read from the stream
        identity: TypeIdentity,
    },

    /// Stream ended inside the envelope header
    #[error("Truncated envelope header: read {read} of {expected} bytes")]
    TruncatedHeader {
        /// Bytes actually read
        read: usize,
        /// Header width
        expected: usize,
    },

    /// Typed decode found a different contract on the wire
    #[error("Type mismatch: expected '{expected}', stream holds '{actual}'")]
    TypeMismatch {
        /// Type the caller asked for
        expected: String,
        /// Type the stream decoded to
        actual: String,
    },

    /// Subtype tag or type is not known under the requested base
    #[error("Unknown subtype under base '{base}': {detail}")]
    UnknownSubtype {
        /// Base hierarchy
        base: String,
        /// What was not found
        detail: String,
    },

    /// I/O error from the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error from the wire format
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid envelope configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether this error is a registration-time configuration failure.
    ///
    /// Configuration failures are never transient; the registration input
    /// has to change.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::IdentityCollision { .. }
                | Error::DuplicateSubtypeTag { .. }
                | Error::MalformedIdentityOverride { .. }
        )
    }

    /// Create a serialization error from any displayable cause.
    pub fn serialization(detail: impl std::fmt::Display) -> Self {
        Error::Serialization(detail.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        // bincode wraps stream failures; surface them as I/O so callers can
        // tell a short read from a malformed payload.
        match *e {
            bincode::ErrorKind::Io(io) => Error::Io(io),
            other => Error::Serialization(other.to_string()),
        }
    }
}
