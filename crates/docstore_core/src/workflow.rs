//! Approval workflow.

use crate::changes::FieldChanges;
use crate::error::{CoreError, CoreResult};
use crate::record::{Record, RecordId, KEY_STATE};
use crate::store::{AuditEntry, DocumentStore, UpdateOutcome};
use crate::types::{now_millis, ACTION_APPROVED, STATE_APPROVED};
use crate::writer::stamped;
use docstore_codec::FieldPath;
use std::sync::Arc;
use tracing::info;

/// Moves records to the approved state and keeps an audit trail.
///
/// Approval is a version-checked write: of two approvers racing on the
/// same version only one succeeds. The state change and the audit entry
/// are committed together by [`DocumentStore::approve_with_audit`].
pub struct ApprovalWorkflow<S: DocumentStore + ?Sized> {
    store: Arc<S>,
}

impl<S: DocumentStore + ?Sized> ApprovalWorkflow<S> {
    /// Creates a workflow over a shared store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Approves the record at the version currently stored.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the record does not exist
    /// - `AlreadyApproved` if it is approved already
    /// - `VersionConflict` if someone else wrote it between the read and
    ///   the approval
    pub fn approve(&self, id: RecordId, actor: &str) -> CoreResult<Record> {
        let current = self.store.get(id)?.ok_or(CoreError::NotFound { id })?;
        self.approve_at(id, current.version, actor)
    }

    /// Approves the record only if it is still at `expected_version`.
    ///
    /// # Errors
    ///
    /// Same as [`approve`](Self::approve).
    pub fn approve_at(&self, id: RecordId, expected_version: u64, actor: &str) -> CoreResult<Record> {
        let current = self.store.get(id)?.ok_or(CoreError::NotFound { id })?;
        if current.state == STATE_APPROVED {
            return Err(CoreError::AlreadyApproved { id });
        }

        let changes = stamped(
            &FieldChanges::new().with_set(FieldPath::parse(KEY_STATE)?, STATE_APPROVED),
        )?;
        let audit = AuditEntry {
            record_id: id,
            action: ACTION_APPROVED.to_string(),
            actor: actor.to_string(),
            at: now_millis(),
        };

        match self
            .store
            .approve_with_audit(id, expected_version, &changes, audit)?
        {
            UpdateOutcome::Updated { after, .. } => {
                info!(%id, actor, version = after.version, "record approved");
                Ok(after)
            }
            UpdateOutcome::NotFound => Err(CoreError::not_found(id)),
            UpdateOutcome::VersionMismatch { actual } => {
                Err(CoreError::version_conflict(id, expected_version, actual))
            }
        }
    }

    /// Audit entries for one record, oldest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn history(&self, id: RecordId) -> CoreResult<Vec<AuditEntry>> {
        Ok(self
            .store
            .audit_trail()?
            .into_iter()
            .filter(|entry| entry.record_id == id)
            .collect())
    }
}
