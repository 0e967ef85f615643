//! Error types for meter billing storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed (connection loss, constraint violation, ...).
    #[error("database error: {0}")]
    Database(String),

    /// A stored row could not be decoded into a domain type.
    #[error("decode error: {0}")]
    Decode(String),

    /// The targeted row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of row ("meter reading", "payment record").
        entity: &'static str,
        /// The identifier that did not resolve.
        id: String,
    },

    /// The write would break a constraint held by other rows.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    /// A missing meter reading.
    pub fn reading_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "meter reading",
            id: id.to_string(),
        }
    }

    /// A reading that still has payment records.
    pub fn payments_exist(id: impl std::fmt::Display) -> Self {
        Self::Conflict(format!(
            "meter reading {id} has payment records and cannot be deleted"
        ))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}
