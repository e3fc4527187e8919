//! Error types for the change log.

use crate::timestamp::LogTimestamp;
use docstore_core::CoreError;
use thiserror::Error;

/// Result type for change-log operations.
pub type OplogResult<T> = Result<T, OplogError>;

/// Errors raised while reading, writing or interpreting the change log.
#[derive(Debug, Error)]
pub enum OplogError {
    /// CBOR codec error.
    #[error("codec error: {0}")]
    Codec(#[from] docstore_codec::CodecError),

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] docstore_storage::StorageError),

    /// An entry or update payload does not have the expected shape.
    #[error("malformed log entry: {message}")]
    MalformedEntry {
        /// What was wrong.
        message: String,
    },

    /// The persisted log is damaged.
    #[error("change log corrupted at offset {offset}: {message}")]
    Corrupted {
        /// Byte offset of the damaged frame.
        offset: u64,
        /// Description of the damage.
        message: String,
    },

    /// A frame's checksum did not match its contents.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Byte offset of the frame.
        offset: u64,
        /// Checksum stored in the frame.
        expected: u32,
        /// Checksum computed from the frame.
        actual: u32,
    },

    /// An append would break timestamp ordering.
    #[error("timestamp {attempted} does not follow {last}")]
    OutOfOrder {
        /// Latest timestamp already in the log.
        last: LogTimestamp,
        /// Timestamp of the rejected entry.
        attempted: LogTimestamp,
    },

    /// A namespace string was not `<database>.<collection>`.
    #[error("invalid namespace {name:?}")]
    InvalidNamespace {
        /// The rejected text.
        name: String,
    },
}

impl OplogError {
    /// Creates a malformed entry error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedEntry {
            message: message.into(),
        }
    }

    /// Creates a corruption error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::Corrupted {
            offset,
            message: message.into(),
        }
    }

    /// Returns true if the log could not be reached, as opposed to holding
    /// bad data.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_io())
    }
}

impl From<OplogError> for CoreError {
    fn from(err: OplogError) -> Self {
        if err.is_unavailable() {
            CoreError::store_unavailable(format!("change log: {err}"))
        } else {
            CoreError::invalid_operation(format!("change log: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn io_failures_map_to_unavailable() {
        let err = OplogError::from(docstore_storage::StorageError::from(io::Error::other("disk gone")));
        assert!(err.is_unavailable());
        assert!(CoreError::from(err).is_store_unavailable());

        let err = OplogError::malformed("no op");
        assert!(!err.is_unavailable());
        assert!(!CoreError::from(err).is_store_unavailable());
    }
}
