//! Reference in-memory store.

use crate::changes::FieldChanges;
use crate::error::CoreResult;
use crate::record::{Record, RecordId};
use crate::store::{
    AuditEntry, DeleteOutcome, DocumentStore, InsertOutcome, UpdateOutcome, WriteOutcome,
};
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct StoreState {
    records: BTreeMap<RecordId, Record>,
    audit: Vec<AuditEntry>,
}

/// A [`DocumentStore`] held entirely in memory.
///
/// A single `RwLock` guards records and audit trail. Writers hold the
/// write guard from the version check through the write, which is what
/// makes the conditional update indivisible.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `records`.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let records = records.into_iter().map(|r| (r.id, r)).collect();
        Self {
            state: RwLock::new(StoreState {
                records,
                audit: Vec::new(),
            }),
        }
    }

    fn checked_update(
        state: &mut StoreState,
        id: RecordId,
        expected_version: u64,
        changes: &FieldChanges,
    ) -> CoreResult<UpdateOutcome> {
        let Some(stored) = state.records.get_mut(&id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if stored.version != expected_version {
            return Ok(UpdateOutcome::VersionMismatch {
                actual: stored.version,
            });
        }

        let before = stored.clone();
        let mut after = stored.clone();
        after.apply_changes(changes)?;
        after.version = before.version + 1;
        *stored = after.clone();
        Ok(UpdateOutcome::Updated { before, after })
    }
}

impl DocumentStore for InMemoryStore {
    fn get(&self, id: RecordId) -> CoreResult<Option<Record>> {
        Ok(self.state.read().records.get(&id).cloned())
    }

    fn insert_if_absent(&self, record: Record) -> CoreResult<InsertOutcome> {
        let mut state = self.state.write();
        if state.records.contains_key(&record.id) {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        state.records.insert(record.id, record);
        Ok(InsertOutcome::Inserted)
    }

    fn conditional_update(
        &self,
        id: RecordId,
        expected_version: u64,
        changes: &FieldChanges,
    ) -> CoreResult<UpdateOutcome> {
        let mut state = self.state.write();
        Self::checked_update(&mut state, id, expected_version, changes)
    }

    fn unconditional_replace(&self, record: Record) -> CoreResult<WriteOutcome> {
        let mut state = self.state.write();
        match state.records.get_mut(&record.id) {
            Some(stored) => {
                *stored = record;
                Ok(WriteOutcome::Written)
            }
            None => Ok(WriteOutcome::TargetMissing),
        }
    }

    fn unconditional_field_update(
        &self,
        id: RecordId,
        changes: &FieldChanges,
    ) -> CoreResult<WriteOutcome> {
        let mut state = self.state.write();
        let Some(stored) = state.records.get_mut(&id) else {
            return Ok(WriteOutcome::TargetMissing);
        };
        stored.apply_changes(changes)?;
        Ok(WriteOutcome::Written)
    }

    fn delete(&self, id: RecordId) -> CoreResult<DeleteOutcome> {
        Ok(match self.state.write().records.remove(&id) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::Absent,
        })
    }

    fn delete_all(&self) -> CoreResult<usize> {
        let mut state = self.state.write();
        let count = state.records.len();
        state.records.clear();
        Ok(count)
    }

    fn list(&self) -> CoreResult<Vec<Record>> {
        Ok(self.state.read().records.values().cloned().collect())
    }

    fn count(&self) -> CoreResult<usize> {
        Ok(self.state.read().records.len())
    }

    fn approve_with_audit(
        &self,
        id: RecordId,
        expected_version: u64,
        changes: &FieldChanges,
        audit: AuditEntry,
    ) -> CoreResult<UpdateOutcome> {
        let mut state = self.state.write();
        let outcome = Self::checked_update(&mut state, id, expected_version, changes)?;
        if matches!(outcome, UpdateOutcome::Updated { .. }) {
            state.audit.push(audit);
        }
        Ok(outcome)
    }

    fn audit_trail(&self) -> CoreResult<Vec<AuditEntry>> {
        Ok(self.state.read().audit.clone())
    }
}
