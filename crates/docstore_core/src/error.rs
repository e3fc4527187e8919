//! Error types for docstore core.

use crate::record::RecordId;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in record and store operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Document codec error.
    #[error("codec error: {0}")]
    Codec(#[from] docstore_codec::CodecError),

    /// No record with this identifier exists.
    #[error("record not found: {id}")]
    NotFound {
        /// The identifier that was looked up.
        id: RecordId,
    },

    /// The stored version did not match the caller's expected version.
    #[error("version conflict on {id}: expected {expected}, stored {actual}")]
    VersionConflict {
        /// The record being written.
        id: RecordId,
        /// Version the caller expected.
        expected: u64,
        /// Version actually stored.
        actual: u64,
    },

    /// The backing store could not be reached or failed to persist.
    #[error("store unavailable: {message}")]
    StoreUnavailable {
        /// Description of the failure.
        message: String,
    },

    /// A document could not be interpreted as a record.
    #[error("invalid document: {message}")]
    InvalidDocument {
        /// What was wrong with the document.
        message: String,
    },

    /// Operation not permitted.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// The record has already been approved.
    #[error("record {id} is already approved")]
    AlreadyApproved {
        /// The record.
        id: RecordId,
    },
}

impl CoreError {
    /// Creates a not found error.
    pub fn not_found(id: RecordId) -> Self {
        Self::NotFound { id }
    }

    /// Creates a version conflict error.
    pub fn version_conflict(id: RecordId, expected: u64, actual: u64) -> Self {
        Self::VersionConflict {
            id,
            expected,
            actual,
        }
    }

    /// Creates a store unavailable error.
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Creates an invalid document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true for failures of the store itself.
    ///
    /// Replay aborts a batch on these; every other error is recorded
    /// against the entry that caused it.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_unavailability() {
        assert!(CoreError::store_unavailable("connection reset").is_store_unavailable());
        assert!(!CoreError::not_found(RecordId::new()).is_store_unavailable());
    }

    #[test]
    fn conflict_message_names_both_versions() {
        let id = RecordId::from_bytes([0; 16]);
        let msg = CoreError::version_conflict(id, 1, 2).to_string();
        assert!(msg.contains("expected 1"));
        assert!(msg.contains("stored 2"));
    }
}
