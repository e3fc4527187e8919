//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while encoding, decoding or navigating document values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to encode a value to CBOR.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode CBOR bytes.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// Float values are not representable in stored documents.
    #[error("float values are forbidden in canonical CBOR")]
    FloatForbidden,

    /// Bytes remained after the first complete CBOR item.
    #[error("{count} trailing bytes after CBOR item")]
    TrailingBytes {
        /// Number of unread bytes.
        count: usize,
    },

    /// Decoded value had an unexpected shape.
    #[error("invalid CBOR structure: {message}")]
    InvalidStructure {
        /// Description of the structural error.
        message: String,
    },

    /// Unsupported CBOR item (tags, simple values other than bool/null).
    #[error("unsupported CBOR type: {type_name}")]
    UnsupportedType {
        /// Name of the unsupported type.
        type_name: String,
    },

    /// A dotted field path was empty or had an empty segment.
    #[error("invalid field path: {path:?}")]
    InvalidPath {
        /// The offending path text.
        path: String,
    },

    /// A path walked through a value that is not a map.
    #[error("path {path:?} traverses a non-map value at segment {segment:?}")]
    NotAMap {
        /// The full path being resolved.
        path: String,
        /// The segment whose parent was not a map.
        segment: String,
    },
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Create an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    /// Create an unsupported type error.
    pub fn unsupported_type(type_name: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
        }
    }

    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath { path: path.into() }
    }
}
