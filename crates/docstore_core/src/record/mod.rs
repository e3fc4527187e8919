//! Versioned records.
//!
//! A [`Record`] is the unit the store keeps: an immutable [`RecordId`],
//! user fields in a [`Document`], and bookkeeping the concurrency protocol
//! relies on (version, timestamps, state label).
//!
//! ## Document form
//!
//! Change-log entries carry records as flat documents. The bookkeeping
//! fields live under reserved keys next to the user fields:
//!
//! | key | meaning |
//! |---|---|
//! | `_id` | identifier, 16-byte byte string |
//! | `version` | version counter, integer |
//! | `createdAt` | creation time, ms since epoch |
//! | `modifiedAt` | last modification time, ms since epoch |
//! | `state` | state label |
//! | `blobRef` | opaque reference to an attached blob |
//!
//! A document without `version` reads as version 1, and one without
//! `state` reads as [`STATE_DRAFT`].

mod document;
mod id;

pub use document::Document;
pub use id::RecordId;

use crate::changes::FieldChanges;
use crate::error::{CoreError, CoreResult};
use crate::types::{now_millis, STATE_DRAFT};
use docstore_codec::Value;

/// Reserved key holding the identifier.
pub const KEY_ID: &str = "_id";
/// Reserved key holding the version counter.
pub const KEY_VERSION: &str = "version";
/// Reserved key holding the creation time.
pub const KEY_CREATED_AT: &str = "createdAt";
/// Reserved key holding the last modification time.
pub const KEY_MODIFIED_AT: &str = "modifiedAt";
/// Reserved key holding the state label.
pub const KEY_STATE: &str = "state";
/// Reserved key holding the blob reference.
pub const KEY_BLOB_REF: &str = "blobRef";

const RESERVED: [&str; 6] = [
    KEY_ID,
    KEY_VERSION,
    KEY_CREATED_AT,
    KEY_MODIFIED_AT,
    KEY_STATE,
    KEY_BLOB_REF,
];

/// Returns true if `name` is one of the reserved bookkeeping keys.
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// A stored record with a monotonically increasing version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Immutable identifier.
    pub id: RecordId,
    /// User fields.
    pub fields: Document,
    /// Version counter, starting at 1.
    pub version: u64,
    /// Creation time in ms since the epoch.
    pub created_at: Option<u64>,
    /// Last modification time in ms since the epoch.
    pub modified_at: Option<u64>,
    /// Free-form state label.
    pub state: String,
    /// Opaque reference into an external blob store.
    pub blob_ref: Option<String>,
}

impl Record {
    /// Creates a fresh version-1 draft with a new id, stamped now.
    #[must_use]
    pub fn new(fields: Document) -> Self {
        let now = now_millis();
        Self {
            id: RecordId::new(),
            fields,
            version: 1,
            created_at: Some(now),
            modified_at: Some(now),
            state: STATE_DRAFT.to_string(),
            blob_ref: None,
        }
    }

    /// Creates a version-1 draft with a given id and no timestamps.
    #[must_use]
    pub fn with_id(id: RecordId, fields: Document) -> Self {
        Self {
            id,
            fields,
            version: 1,
            created_at: None,
            modified_at: None,
            state: STATE_DRAFT.to_string(),
            blob_ref: None,
        }
    }

    /// Sets the blob reference.
    #[must_use]
    pub fn with_blob_ref(mut self, blob_ref: impl Into<String>) -> Self {
        self.blob_ref = Some(blob_ref.into());
        self
    }

    /// Flattens into the document form.
    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut doc = self.fields.clone();
        doc.insert(KEY_ID, self.id.to_value());
        doc.insert(KEY_VERSION, int(self.version));
        if let Some(at) = self.created_at {
            doc.insert(KEY_CREATED_AT, int(at));
        }
        if let Some(at) = self.modified_at {
            doc.insert(KEY_MODIFIED_AT, int(at));
        }
        doc.insert(KEY_STATE, self.state.as_str());
        if let Some(blob) = &self.blob_ref {
            doc.insert(KEY_BLOB_REF, blob.as_str());
        }
        doc
    }

    /// Reads a record from its document form.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDocument` if `_id` is missing or malformed, or a
    /// reserved key holds a value of the wrong type.
    pub fn from_document(mut doc: Document) -> CoreResult<Self> {
        let id = doc
            .remove(KEY_ID)
            .as_ref()
            .and_then(RecordId::from_value)
            .ok_or_else(|| CoreError::invalid_document("missing or malformed _id"))?;
        let version = match doc.remove(KEY_VERSION) {
            None => 1,
            Some(v) => uint(KEY_VERSION, &v)?,
        };
        let created_at = doc
            .remove(KEY_CREATED_AT)
            .map(|v| uint(KEY_CREATED_AT, &v))
            .transpose()?;
        let modified_at = doc
            .remove(KEY_MODIFIED_AT)
            .map(|v| uint(KEY_MODIFIED_AT, &v))
            .transpose()?;
        let state = match doc.remove(KEY_STATE) {
            None => STATE_DRAFT.to_string(),
            Some(v) => text(KEY_STATE, v)?,
        };
        let blob_ref = doc
            .remove(KEY_BLOB_REF)
            .map(|v| text(KEY_BLOB_REF, v))
            .transpose()?;

        Ok(Self {
            id,
            fields: doc,
            version,
            created_at,
            modified_at,
            state,
            blob_ref,
        })
    }

    /// Applies field changes through the document form.
    ///
    /// Reserved keys may be changed this way, which is how replayed diffs
    /// carry version and timestamp updates. The identifier may not.
    ///
    /// # Errors
    ///
    /// Fails if the changes alter or drop `_id`, leave a reserved key with
    /// the wrong type, or run a path through a non-map value. On error the
    /// record is left untouched.
    pub fn apply_changes(&mut self, changes: &FieldChanges) -> CoreResult<()> {
        if changes.touches(KEY_ID) {
            return Err(CoreError::invalid_operation("the _id field is immutable"));
        }
        let mut doc = self.to_document();
        changes.apply_to(&mut doc)?;
        *self = Self::from_document(doc)?;
        Ok(())
    }

    /// Looks up a user field or a reserved key by dotted path.
    #[must_use]
    pub fn lookup(&self, path: &docstore_codec::FieldPath) -> Option<Value> {
        self.to_document().get_path(path).cloned()
    }
}

fn int(n: u64) -> Value {
    Value::Integer(i64::try_from(n).unwrap_or(i64::MAX))
}

fn uint(key: &str, value: &Value) -> CoreResult<u64> {
    value
        .as_integer()
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| {
            CoreError::invalid_document(format!(
                "{key} must be a non-negative integer, found {}",
                value.type_name()
            ))
        })
}

fn text(key: &str, value: Value) -> CoreResult<String> {
    match value {
        Value::Text(s) => Ok(s),
        other => Err(CoreError::invalid_document(format!(
            "{key} must be text, found {}",
            other.type_name()
        ))),
    }
}
