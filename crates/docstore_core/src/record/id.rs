//! Record identifier.

use crate::error::{CoreError, CoreResult};
use docstore_codec::Value;
use std::fmt;
use uuid::Uuid;

/// Store-assigned identifier of a record.
///
/// Identifiers are random v4 UUIDs held as 16 raw bytes. In the document
/// form of a record they appear under `_id` as a byte string. An id never
/// changes once assigned.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId([u8; 16]);

impl RecordId {
    /// Generates a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().into_bytes())
    }

    /// Wraps raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Converts to a UUID.
    #[must_use]
    pub fn to_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.0)
    }

    /// Parses the hyphenated UUID text form, as printed by `Display`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDocument` if the text is not a UUID.
    pub fn parse(text: &str) -> CoreResult<Self> {
        Uuid::parse_str(text)
            .map(|uuid| Self(uuid.into_bytes()))
            .map_err(|e| CoreError::invalid_document(format!("bad record id {text:?}: {e}")))
    }

    /// Reads an identifier from an `_id` value.
    ///
    /// Returns `None` unless the value is a 16-byte byte string.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let bytes = value.as_bytes()?;
        <[u8; 16]>::try_from(bytes).ok().map(Self)
    }

    /// The `_id` value for this identifier.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Bytes(self.0.to_vec())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.to_uuid())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uuid())
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.into_bytes())
    }
}
