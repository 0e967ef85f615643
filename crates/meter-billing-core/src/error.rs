//! Error types for meter billing.

use crate::ids::IdError;

/// Result type for meter billing operations.
pub type Result<T> = std::result::Result<T, BillingError>;

/// Errors raised by the calculator and the ledger.
///
/// Both are local to a single operation and abort it before anything is
/// written to a store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BillingError {
    /// An input field is missing, malformed or out of range.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// The offending field (wire name).
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Meter reading not found.
    #[error("meter reading not found: {reading_id}")]
    ReadingNotFound {
        /// The reading ID that was not found.
        reading_id: String,
    },

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}

impl BillingError {
    /// Shorthand for a validation failure on `field`.
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}
