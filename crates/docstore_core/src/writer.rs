//! Optimistic-concurrency writes.

use crate::changes::FieldChanges;
use crate::error::{CoreError, CoreResult};
use crate::record::{Document, Record, RecordId, KEY_ID, KEY_MODIFIED_AT, KEY_VERSION};
use crate::store::{DeleteOutcome, DocumentStore, InsertOutcome, UpdateOutcome};
use crate::types::now_millis;
use docstore_codec::{FieldPath, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Issues version-checked writes against a [`DocumentStore`].
///
/// Every update names the version the caller last read. The store applies
/// it only if that is still the stored version, in which case the version
/// goes up by exactly one. Otherwise nothing changes and the caller gets
/// [`CoreError::VersionConflict`]; it is up to the caller to re-read and
/// decide whether to try again.
pub struct ConcurrentWriter<S: DocumentStore + ?Sized> {
    store: Arc<S>,
}

impl<S: DocumentStore + ?Sized> ConcurrentWriter<S> {
    /// Creates a writer over a shared store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Inserts a new version-1 draft and returns it.
    ///
    /// # Errors
    ///
    /// Rejects fields using reserved keys. Propagates store failures.
    pub fn create(&self, fields: Document) -> CoreResult<Record> {
        if let Some((name, _)) = fields.iter().find(|(name, _)| crate::record::is_reserved(name)) {
            return Err(CoreError::invalid_operation(format!(
                "{name} is managed by the store"
            )));
        }
        let record = Record::new(fields);
        match self.store.insert_if_absent(record.clone())? {
            InsertOutcome::Inserted => {
                debug!(id = %record.id, "created record");
                Ok(record)
            }
            InsertOutcome::AlreadyPresent => Err(CoreError::invalid_operation(format!(
                "id collision on {}",
                record.id
            ))),
        }
    }

    /// Fetches a record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if it does not exist.
    pub fn get(&self, id: RecordId) -> CoreResult<Record> {
        self.store.get(id)?.ok_or(CoreError::NotFound { id })
    }

    /// Applies `changes` if the stored version is `expected_version`.
    ///
    /// The modification time is refreshed as part of the same write.
    /// Returns the new version.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if `changes` touch `_id` or `version`
    /// - `NotFound` if the record does not exist
    /// - `VersionConflict` if the stored version differs
    /// - `StoreUnavailable` from the store
    pub fn update(
        &self,
        id: RecordId,
        expected_version: u64,
        changes: &FieldChanges,
    ) -> CoreResult<u64> {
        let (_, after) = self.write(id, expected_version, changes)?;
        Ok(after.version)
    }

    /// Like [`update`](Self::update) but returns the records before and
    /// after the write.
    ///
    /// # Errors
    ///
    /// Same as [`update`](Self::update).
    pub fn write(
        &self,
        id: RecordId,
        expected_version: u64,
        changes: &FieldChanges,
    ) -> CoreResult<(Record, Record)> {
        let changes = stamped(changes)?;
        match self
            .store
            .conditional_update(id, expected_version, &changes)?
        {
            UpdateOutcome::Updated { before, after } => {
                debug!(%id, version = after.version, "conditional update applied");
                Ok((before, after))
            }
            UpdateOutcome::NotFound => Err(CoreError::not_found(id)),
            UpdateOutcome::VersionMismatch { actual } => {
                warn!(%id, expected = expected_version, actual, "version conflict");
                Err(CoreError::version_conflict(id, expected_version, actual))
            }
        }
    }

    /// Deletes a record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if it does not exist.
    pub fn delete(&self, id: RecordId) -> CoreResult<()> {
        match self.store.delete(id)? {
            DeleteOutcome::Deleted => Ok(()),
            DeleteOutcome::Absent => Err(CoreError::not_found(id)),
        }
    }
}

/// Validates caller changes and adds the modification time.
pub(crate) fn stamped(changes: &FieldChanges) -> CoreResult<FieldChanges> {
    for reserved in [KEY_ID, KEY_VERSION] {
        if changes.touches(reserved) {
            return Err(CoreError::invalid_operation(format!(
                "{reserved} cannot be changed by an update"
            )));
        }
    }
    let mut stamped = changes.clone();
    let now = i64::try_from(now_millis()).unwrap_or(i64::MAX);
    stamped.set(FieldPath::parse(KEY_MODIFIED_AT)?, Value::Integer(now));
    Ok(stamped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn path(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    fn writer() -> ConcurrentWriter<InMemoryStore> {
        ConcurrentWriter::new(Arc::new(InMemoryStore::new()))
    }

    #[test]
    fn create_then_update() {
        let writer = writer();
        let record = writer
            .create(Document::from_pairs([("titulo", "X")]))
            .unwrap();

        let changes = FieldChanges::new().with_set(path("titulo"), "Y");
        assert_eq!(writer.update(record.id, 1, &changes).unwrap(), 2);
        assert_eq!(writer.update(record.id, 2, &changes).unwrap(), 3);

        let stored = writer.get(record.id).unwrap();
        assert_eq!(stored.version, 3);
        assert!(stored.modified_at >= record.modified_at);
    }

    #[test]
    fn stale_version_conflicts_without_side_effects() {
        let writer = writer();
        let record = writer
            .create(Document::from_pairs([("titulo", "X")]))
            .unwrap();
        let changes = FieldChanges::new().with_set(path("titulo"), "Y");
        writer.update(record.id, 1, &changes).unwrap();
        let at_two = writer.get(record.id).unwrap();

        let err = writer
            .update(record.id, 1, &FieldChanges::new().with_set(path("titulo"), "Z"))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::VersionConflict {
                expected: 1,
                actual: 2,
                ..
            }
        ));
        assert_eq!(writer.get(record.id).unwrap(), at_two);
    }

    #[test]
    fn missing_record_is_not_found() {
        let writer = writer();
        let id = RecordId::new();
        assert!(matches!(
            writer.update(id, 1, &FieldChanges::new()),
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(writer.delete(id), Err(CoreError::NotFound { .. })));
        assert!(matches!(writer.get(id), Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn protocol_fields_are_off_limits() {
        let writer = writer();
        let record = writer.create(Document::new()).unwrap();

        let bump = FieldChanges::new().with_set(path("version"), 10i64);
        assert!(matches!(
            writer.update(record.id, 1, &bump),
            Err(CoreError::InvalidOperation { .. })
        ));
        let rename = FieldChanges::new().with_remove(path("_id"));
        assert!(writer.update(record.id, 1, &rename).is_err());
        assert!(writer
            .create(Document::from_pairs([("version", 5i64)]))
            .is_err());
        assert_eq!(writer.get(record.id).unwrap().version, 1);
    }
}
