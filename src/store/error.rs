//! Store Errors
//!
//! Backend-neutral error classification for storage operations.

use std::fmt;

/// Normalised classification of a failed storage call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    UniqueViolation,
    ForeignKeyViolation,
    Other,
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageErrorKind::UniqueViolation => "unique_violation",
            StorageErrorKind::ForeignKeyViolation => "foreign_key_violation",
            StorageErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in a store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Serialization failure, deadlock or lock timeout; the unit of work
    /// rolled back and may succeed if run again
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    /// A schema constraint rejected the write
    #[error("Constraint violation ({kind}): {message}")]
    Constraint {
        kind: StorageErrorKind,
        message: String,
    },

    /// Any other backend failure (connectivity, decoding, misuse)
    #[error("Storage error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn unique_violation(message: impl Into<String>) -> Self {
        Self::Constraint {
            kind: StorageErrorKind::UniqueViolation,
            message: message.into(),
        }
    }

    pub fn foreign_key_violation(message: impl Into<String>) -> Self {
        Self::Constraint {
            kind: StorageErrorKind::ForeignKeyViolation,
            message: message.into(),
        }
    }

    /// Classify this error without exposing the backend's native error type
    pub fn kind(&self) -> StorageErrorKind {
        match self {
            StoreError::Constraint { kind, .. } => *kind,
            _ => StorageErrorKind::Other,
        }
    }

    /// Check if retrying the whole unit of work may help
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let message = db_err.message().to_string();
            match db_err.code().as_deref() {
                // serialization_failure, deadlock_detected, lock_not_available
                Some("40001") | Some("40P01") | Some("55P03") => {
                    return StoreError::Conflict(message)
                }
                Some("23505") => return StoreError::unique_violation(message),
                Some("23503") => return StoreError::foreign_key_violation(message),
                Some("23514") => {
                    return StoreError::Constraint {
                        kind: StorageErrorKind::Other,
                        message,
                    }
                }
                _ => {}
            }
        }
        StoreError::Backend(err.to_string())
    }
}
