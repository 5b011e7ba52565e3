//! Storage layer errors

use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document not found where one was required
    #[error("Document not found: {collection} with id {id}")]
    NotFound {
        /// Collection name (items, exchanges, reviews, users)
        collection: &'static str,
        /// Document ID
        id: String,
    },

    /// A document read by the transaction changed before commit
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    /// Every attempt of a transaction hit a conflict
    #[error("Transaction aborted after {attempts} conflicting attempts")]
    RetriesExhausted {
        /// How many times the body ran
        attempts: u32,
    },

    /// The transaction was already committed or rolled back
    #[error("Transaction already closed")]
    TransactionClosed,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// A thread panicked while holding the in-memory lock
    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Create a not found error
    pub fn not_found(collection: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            collection,
            id: id.to_string(),
        }
    }

    /// Create a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Whether rerunning the transaction from scratch may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                // serialization_failure / deadlock_detected: safe to retry
                match db_err.code().as_deref() {
                    Some("40001") | Some("40P01") => StoreError::Conflict(db_err.to_string()),
                    _ => StoreError::Database(db_err.to_string()),
                }
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Connection(err.to_string())
            },
            _ => StoreError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_conflict_is_retryable() {
        assert!(StoreError::conflict("exchange changed").is_conflict());
        assert!(!StoreError::RetriesExhausted { attempts: 5 }.is_conflict());
        assert!(!StoreError::Database("boom".into()).is_conflict());
    }

    #[test]
    fn test_not_found_message() {
        let err = StoreError::not_found("items", "abc");
        assert_eq!(err.to_string(), "Document not found: items with id abc");
    }
}
