//! The document store contract.
//!
//! [`DocumentStore`] is the seam between the replay and concurrency logic
//! and whatever actually holds records. Every method is a single
//! indivisible operation on the store; in particular
//! [`DocumentStore::conditional_update`] must check the version and write
//! in one step, never as a read followed by a write.

mod memory;

pub use memory::InMemoryStore;

use crate::changes::FieldChanges;
use crate::error::CoreResult;
use crate::record::{Record, RecordId};
use docstore_codec::{FieldPath, Value};

/// Result of [`DocumentStore::insert_if_absent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was stored.
    Inserted,
    /// A record with the same id already existed and was left alone.
    AlreadyPresent,
}

/// Result of a version-checked write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The write happened.
    Updated {
        /// The record as it was before.
        before: Record,
        /// The record as stored now.
        after: Record,
    },
    /// No record with that id.
    NotFound,
    /// The stored version differed from the expected one; nothing changed.
    VersionMismatch {
        /// Version actually stored.
        actual: u64,
    },
}

/// Result of an unconditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The target existed and was written.
    Written,
    /// No record with that id.
    TargetMissing,
}

/// Result of [`DocumentStore::delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The record was removed.
    Deleted,
    /// There was nothing to remove.
    Absent,
}

/// One row of the approval audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    /// The record acted on.
    pub record_id: RecordId,
    /// What was done.
    pub action: String,
    /// Who did it.
    pub actor: String,
    /// When, in ms since the epoch.
    pub at: u64,
}

/// Persistent collection of versioned records.
///
/// Implementations must be safe to share between threads. Returning
/// [`CoreError::StoreUnavailable`](crate::CoreError::StoreUnavailable)
/// signals that the store itself failed, as opposed to the request being
/// wrong.
pub trait DocumentStore: Send + Sync {
    /// Fetches a record.
    ///
    /// # Errors
    ///
    /// Fails only if the store is unavailable.
    fn get(&self, id: RecordId) -> CoreResult<Option<Record>>;

    /// Stores `record` unless its id is already present.
    ///
    /// # Errors
    ///
    /// Fails only if the store is unavailable.
    fn insert_if_absent(&self, record: Record) -> CoreResult<InsertOutcome>;

    /// Applies `changes` and increments the version by one, but only if
    /// the stored version equals `expected_version`.
    ///
    /// # Errors
    ///
    /// Fails if the store is unavailable or the changes cannot be applied
    /// to the stored record.
    fn conditional_update(
        &self,
        id: RecordId,
        expected_version: u64,
        changes: &FieldChanges,
    ) -> CoreResult<UpdateOutcome>;

    /// Replaces the stored record with the same id wholesale.
    ///
    /// # Errors
    ///
    /// Fails only if the store is unavailable.
    fn unconditional_replace(&self, record: Record) -> CoreResult<WriteOutcome>;

    /// Applies `changes` to the document form of the record, without any
    /// version check or version bump.
    ///
    /// # Errors
    ///
    /// Fails if the store is unavailable or the changes cannot be applied.
    fn unconditional_field_update(
        &self,
        id: RecordId,
        changes: &FieldChanges,
    ) -> CoreResult<WriteOutcome>;

    /// Removes a record.
    ///
    /// # Errors
    ///
    /// Fails only if the store is unavailable.
    fn delete(&self, id: RecordId) -> CoreResult<DeleteOutcome>;

    /// Removes every record and returns how many there were.
    ///
    /// # Errors
    ///
    /// Fails only if the store is unavailable.
    fn delete_all(&self) -> CoreResult<usize>;

    /// All records, ordered by id.
    ///
    /// # Errors
    ///
    /// Fails only if the store is unavailable.
    fn list(&self) -> CoreResult<Vec<Record>>;

    /// Records whose value at `path` equals `value`.
    ///
    /// Reserved keys such as `state` can be matched too.
    ///
    /// # Errors
    ///
    /// Fails only if the store is unavailable.
    fn find_eq(&self, path: &FieldPath, value: &Value) -> CoreResult<Vec<Record>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|record| record.lookup(path).as_ref() == Some(value))
            .collect())
    }

    /// Number of records.
    ///
    /// # Errors
    ///
    /// Fails only if the store is unavailable.
    fn count(&self) -> CoreResult<usize> {
        Ok(self.list()?.len())
    }

    /// A version-checked update and an audit append, committed together.
    ///
    /// The audit entry is recorded only if the update happens.
    ///
    /// # Errors
    ///
    /// Same as [`DocumentStore::conditional_update`].
    fn approve_with_audit(
        &self,
        id: RecordId,
        expected_version: u64,
        changes: &FieldChanges,
        audit: AuditEntry,
    ) -> CoreResult<UpdateOutcome>;

    /// The audit trail in insertion order.
    ///
    /// # Errors
    ///
    /// Fails only if the store is unavailable.
    fn audit_trail(&self) -> CoreResult<Vec<AuditEntry>>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<S> {
    fn get(&self, id: RecordId) -> CoreResult<Option<Record>> {
        (**self).get(id)
    }

    fn insert_if_absent(&self, record: Record) -> CoreResult<InsertOutcome> {
        (**self).insert_if_absent(record)
    }

    fn conditional_update(
        &self,
        id: RecordId,
        expected_version: u64,
        changes: &FieldChanges,
    ) -> CoreResult<UpdateOutcome> {
        (**self).conditional_update(id, expected_version, changes)
    }

    fn unconditional_replace(&self, record: Record) -> CoreResult<WriteOutcome> {
        (**self).unconditional_replace(record)
    }

    fn unconditional_field_update(
        &self,
        id: RecordId,
        changes: &FieldChanges,
    ) -> CoreResult<WriteOutcome> {
        (**self).unconditional_field_update(id, changes)
    }

    fn delete(&self, id: RecordId) -> CoreResult<DeleteOutcome> {
        (**self).delete(id)
    }

    fn delete_all(&self) -> CoreResult<usize> {
        (**self).delete_all()
    }

    fn list(&self) -> CoreResult<Vec<Record>> {
        (**self).list()
    }

    fn find_eq(&self, path: &FieldPath, value: &Value) -> CoreResult<Vec<Record>> {
        (**self).find_eq(path, value)
    }

    fn count(&self) -> CoreResult<usize> {
        (**self).count()
    }

    fn approve_with_audit(
        &self,
        id: RecordId,
        expected_version: u64,
        changes: &FieldChanges,
        audit: AuditEntry,
    ) -> CoreResult<UpdateOutcome> {
        (**self).approve_with_audit(id, expected_version, changes, audit)
    }

    fn audit_trail(&self) -> CoreResult<Vec<AuditEntry>> {
        (**self).audit_trail()
    }
}
