//! Core types and traits for Strata envelopes
//!
//! This crate defines the foundational types used throughout the system:
//! - TypeIdentity: Stable 128-bit contract discriminator
//! - Contract / Payload: Static and runtime views of registrable types
//! - ContractKind / ContractBase: Subtype eligibility and base hierarchies
//! - EventRecord / Metadata: Polymorphic event body plus ordered metadata
//! - Commit / FailureReport: Built-in domain contracts
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

// Module declarations
pub mod commit;
pub mod contract;
pub mod error;
pub mod failure;
pub mod identity;
pub mod metadata;
pub mod record;

// Re-export commonly used types and traits
pub use commit::{Commit, COMMIT_CONTRACT};
pub use contract::{downcast_payload, Contract, ContractBase, ContractKind, Payload};
pub use error::{Error, Result};
pub use failure::{FailureReport, FAILURE_REPORT_CONTRACT};
pub use identity::{TypeIdentity, IDENTITY_LEN};
pub use metadata::{Metadata, MetadataValue};
pub use record::{EventRecord, EVENT_RECORD_LIST_CONTRACT};
