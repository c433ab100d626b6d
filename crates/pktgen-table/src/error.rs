//! Error types for table operations.

use thiserror::Error;

/// Result type alias for table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Errors reported by a [`crate::TableGateway`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// An add targeted a key that already has an entry.
    #[error("Duplicate key in {table}: {key}")]
    DuplicateKey {
        /// The table name.
        table: String,
        /// The rendered key.
        key: String,
    },

    /// A read or modify targeted a key with no entry.
    #[error("Table entry not found: {table}:{key}")]
    NotFound {
        /// The table name.
        table: String,
        /// The rendered key.
        key: String,
    },

    /// The device does not expose a table with this name.
    #[error("Unknown table '{0}'")]
    UnknownTable(String),

    /// A field had the wrong type or an unusable value.
    #[error("Invalid field {table}.{field}: {message}")]
    InvalidField {
        /// The table name.
        table: String,
        /// The field name.
        field: String,
        /// Error message.
        message: String,
    },

    /// The channel to the device failed.
    #[error("Transport failure during {operation}: {message}")]
    Transport {
        /// The operation that failed (e.g., "get", "add", "modify").
        operation: String,
        /// Error message.
        message: String,
    },
}

impl TableError {
    /// Creates a duplicate key error.
    pub fn duplicate_key(table: impl Into<String>, key: impl ToString) -> Self {
        Self::DuplicateKey {
            table: table.into(),
            key: key.to_string(),
        }
    }

    /// Creates an entry not found error.
    pub fn not_found(table: impl Into<String>, key: impl ToString) -> Self {
        Self::NotFound {
            table: table.into(),
            key: key.to_string(),
        }
    }

    /// Creates an invalid field error.
    pub fn invalid_field(
        table: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            table: table.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a transport error.
    pub fn transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Returns true if the entry was absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TableError::NotFound { .. })
    }

    /// Returns true if the entry already existed.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, TableError::DuplicateKey { .. })
    }

    /// Returns true if this error indicates a transient condition
    /// that may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TableError::Transport { .. })
    }
}
