//! Failure reports
//!
//! Errors are not serializable, but hosts routinely persist or forward them.
//! A [`FailureReport`] is the wire-friendly snapshot of an error and its
//! source chain.

use crate::contract::Contract;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::error::Error as StdError;

/// Contract name of [`FailureReport`]
pub const FAILURE_REPORT_CONTRACT: &str = "Strata.Envelope.FailureReport";

/// Serializable snapshot of an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    /// Error category chosen by the reporter
    pub kind: String,
    /// Top-level message
    pub message: String,
    /// Messages of the source chain, outermost first
    pub causes: Vec<String>,
}

impl FailureReport {
    /// Create a report without causes
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Capture an error and its source chain
    pub fn from_error(kind: impl Into<String>, err: &(dyn StdError + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self {
            kind: kind.into(),
            message: err.to_string(),
            causes,
        }
    }
}

impl Contract for FailureReport {
    fn contract_name() -> Cow<'static, str> {
        Cow::Borrowed(FAILURE_REPORT_CONTRACT)
    }
}
