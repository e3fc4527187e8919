//! Change capture for document stores.

use crate::diff::{encode_changes, encode_diff};
use crate::entry::Operation;
use crate::log::ChangeLog;
use crate::namespace::Namespace;
use docstore_codec::{FieldPath, Value};
use docstore_core::{
    AuditEntry, CoreResult, DeleteOutcome, DocumentStore, FieldChanges, InsertOutcome, Record,
    RecordId, UpdateOutcome, WriteOutcome,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

/// A [`DocumentStore`] that records every successful write in a change log.
///
/// Writes go to the inner store first; the matching entry is appended
/// once the store reports success. Each write holds the journal lock until
/// its entry is appended, so log order is the order writes landed in the
/// store. The two steps are not atomic: if the append fails the write
/// stays applied and the caller sees `StoreUnavailable` (or
/// `InvalidOperation` for a log that rejected the entry).
///
/// | write | entry |
/// |---|---|
/// | insert | `Insert` with the record's document form |
/// | conditional update, approval | `Update` with a diff of before and after |
/// | field update | `Update` with the change set as a diff |
/// | replace | `Update` with the full document |
/// | delete | `Delete`, one per removed record |
pub struct JournaledStore<S: DocumentStore + ?Sized, L: ChangeLog + ?Sized> {
    store: Arc<S>,
    log: Arc<L>,
    namespace: Namespace,
    write_order: Mutex<()>,
}

impl<S: DocumentStore + ?Sized, L: ChangeLog + ?Sized> JournaledStore<S, L> {
    /// Wraps `store`, journaling into `log` under `namespace`.
    pub fn new(store: Arc<S>, log: Arc<L>, namespace: Namespace) -> Self {
        Self {
            store,
            log,
            namespace,
            write_order: Mutex::new(()),
        }
    }

    /// The wrapped store, for writes that must not be journaled.
    pub fn inner(&self) -> &Arc<S> {
        &self.store
    }

    /// The change log written to.
    pub fn log(&self) -> &Arc<L> {
        &self.log
    }

    fn journal(&self, operation: Operation) -> CoreResult<()> {
        let entry = self.log.record(&self.namespace, operation)?;
        trace!(ts = %entry.timestamp, op = entry.operation.code(), "journaled write");
        Ok(())
    }

    fn journal_update(&self, outcome: &UpdateOutcome) -> CoreResult<()> {
        if let UpdateOutcome::Updated { before, after } = outcome {
            let diff = encode_diff(&before.to_document(), &after.to_document());
            self.journal(Operation::update(after.id, diff))?;
        }
        Ok(())
    }
}

impl<S: DocumentStore + ?Sized, L: ChangeLog + ?Sized> DocumentStore for JournaledStore<S, L> {
    fn get(&self, id: RecordId) -> CoreResult<Option<Record>> {
        self.store.get(id)
    }

    fn insert_if_absent(&self, record: Record) -> CoreResult<InsertOutcome> {
        let _order = self.write_order.lock();
        let document = record.to_document();
        let outcome = self.store.insert_if_absent(record)?;
        if outcome == InsertOutcome::Inserted {
            self.journal(Operation::insert(document))?;
        }
        Ok(outcome)
    }

    fn conditional_update(
        &self,
        id: RecordId,
        expected_version: u64,
        changes: &FieldChanges,
    ) -> CoreResult<UpdateOutcome> {
        let _order = self.write_order.lock();
        let outcome = self.store.conditional_update(id, expected_version, changes)?;
        self.journal_update(&outcome)?;
        Ok(outcome)
    }

    fn unconditional_replace(&self, record: Record) -> CoreResult<WriteOutcome> {
        let _order = self.write_order.lock();
        let id = record.id;
        let document = record.to_document();
        let outcome = self.store.unconditional_replace(record)?;
        if outcome == WriteOutcome::Written {
            self.journal(Operation::update(id, document.to_value()))?;
        }
        Ok(outcome)
    }

    fn unconditional_field_update(
        &self,
        id: RecordId,
        changes: &FieldChanges,
    ) -> CoreResult<WriteOutcome> {
        let _order = self.write_order.lock();
        let outcome = self.store.unconditional_field_update(id, changes)?;
        if outcome == WriteOutcome::Written {
            self.journal(Operation::update(id, encode_changes(changes)))?;
        }
        Ok(outcome)
    }

    fn delete(&self, id: RecordId) -> CoreResult<DeleteOutcome> {
        let _order = self.write_order.lock();
        let outcome = self.store.delete(id)?;
        if outcome == DeleteOutcome::Deleted {
            self.journal(Operation::delete(id))?;
        }
        Ok(outcome)
    }

    fn delete_all(&self) -> CoreResult<usize> {
        let ids: Vec<_> = self.store.list()?.into_iter().map(|r| r.id).collect();
        let mut removed = 0;
        for id in ids {
            if self.delete(id)? == DeleteOutcome::Deleted {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn list(&self) -> CoreResult<Vec<Record>> {
        self.store.list()
    }

    fn find_eq(&self, path: &FieldPath, value: &Value) -> CoreResult<Vec<Record>> {
        self.store.find_eq(path, value)
    }

    fn count(&self) -> CoreResult<usize> {
        self.store.count()
    }

    fn approve_with_audit(
        &self,
        id: RecordId,
        expected_version: u64,
        changes: &FieldChanges,
        audit: AuditEntry,
    ) -> CoreResult<UpdateOutcome> {
        let _order = self.write_order.lock();
        let outcome = self
            .store
            .approve_with_audit(id, expected_version, changes, audit)?;
        self.journal_update(&outcome)?;
        Ok(outcome)
    }

    fn audit_trail(&self) -> CoreResult<Vec<AuditEntry>> {
        self.store.audit_trail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{InMemoryChangeLog, SortDirection};
    use docstore_core::{ApprovalWorkflow, ConcurrentWriter, Document, InMemoryStore};

    fn setup() -> (
        Arc<JournaledStore<InMemoryStore, InMemoryChangeLog>>,
        Arc<InMemoryChangeLog>,
        Namespace,
    ) {
        let ns = Namespace::parse("gestion.documentos").unwrap();
        let log = Arc::new(InMemoryChangeLog::new());
        let store = JournaledStore::new(Arc::new(InMemoryStore::new()), Arc::clone(&log), ns.clone());
        (Arc::new(store), log, ns)
    }

    fn codes(log: &InMemoryChangeLog) -> Vec<&'static str> {
        log.snapshot().iter().map(|e| e.operation.code()).collect()
    }

    #[test]
    fn writes_are_journaled_in_order() {
        let (store, log, ns) = setup();
        let writer = ConcurrentWriter::new(Arc::clone(&store));

        let record = writer.create(Document::from_pairs([("titulo", "X")])).unwrap();
        writer
            .update(
                record.id,
                1,
                &FieldChanges::new().with_set(FieldPath::parse("titulo").unwrap(), "Y"),
            )
            .unwrap();
        writer.delete(record.id).unwrap();

        assert_eq!(codes(&log), vec!["i", "u", "d"]);
        let entries = log.query(&ns, None, SortDirection::Ascending, None).unwrap();
        assert!(entries.iter().all(|e| e.operation.target_id() == Some(record.id)));
    }

    #[test]
    fn failed_writes_are_not_journaled() {
        let (store, log, _) = setup();
        let writer = ConcurrentWriter::new(Arc::clone(&store));
        let record = writer.create(Document::new()).unwrap();

        let stale = writer.update(record.id, 7, &FieldChanges::new());
        assert!(stale.is_err());
        assert_eq!(store.delete(RecordId::new()).unwrap(), DeleteOutcome::Absent);
        assert_eq!(
            store.insert_if_absent(record.clone()).unwrap(),
            InsertOutcome::AlreadyPresent
        );
        assert_eq!(codes(&log), vec!["i"]);
    }

    #[test]
    fn approval_and_wipe_are_journaled() {
        let (store, log, _) = setup();
        let writer = ConcurrentWriter::new(Arc::clone(&store));
        let a = writer.create(Document::new()).unwrap();
        writer.create(Document::new()).unwrap();

        ApprovalWorkflow::new(Arc::clone(&store)).approve(a.id, "admin").unwrap();
        assert_eq!(store.delete_all().unwrap(), 2);
        assert_eq!(codes(&log), vec!["i", "i", "u", "d", "d"]);
    }

    #[test]
    fn inner_writes_bypass_the_log() {
        let (store, log, _) = setup();
        store.inner().insert_if_absent(Record::new(Document::new())).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert!(log.snapshot().is_empty());
    }

    /// Holds the first version-1 update in the store for a while after it
    /// lands, so a second writer can catch up.
    struct LingeringStore(InMemoryStore);

    impl DocumentStore for LingeringStore {
        fn get(&self, id: RecordId) -> CoreResult<Option<Record>> {
            self.0.get(id)
        }
        fn insert_if_absent(&self, record: Record) -> CoreResult<InsertOutcome> {
            self.0.insert_if_absent(record)
        }
        fn conditional_update(
            &self,
            id: RecordId,
            expected_version: u64,
            changes: &FieldChanges,
        ) -> CoreResult<UpdateOutcome> {
            let outcome = self.0.conditional_update(id, expected_version, changes)?;
            if expected_version == 1 {
                std::thread::sleep(std::time::Duration::from_millis(200));
            }
            Ok(outcome)
        }
        fn unconditional_replace(&self, record: Record) -> CoreResult<WriteOutcome> {
            self.0.unconditional_replace(record)
        }
        fn unconditional_field_update(
            &self,
            id: RecordId,
            changes: &FieldChanges,
        ) -> CoreResult<WriteOutcome> {
            self.0.unconditional_field_update(id, changes)
        }
        fn delete(&self, id: RecordId) -> CoreResult<DeleteOutcome> {
            self.0.delete(id)
        }
        fn delete_all(&self) -> CoreResult<usize> {
            self.0.delete_all()
        }
        fn list(&self) -> CoreResult<Vec<Record>> {
            self.0.list()
        }
        fn approve_with_audit(
            &self,
            id: RecordId,
            expected_version: u64,
            changes: &FieldChanges,
            audit: AuditEntry,
        ) -> CoreResult<UpdateOutcome> {
            self.0.approve_with_audit(id, expected_version, changes, audit)
        }
        fn audit_trail(&self) -> CoreResult<Vec<AuditEntry>> {
            self.0.audit_trail()
        }
    }

    #[test]
    fn concurrent_updates_are_logged_in_store_order() {
        let ns = Namespace::parse("gestion.documentos").unwrap();
        let log = Arc::new(InMemoryChangeLog::new());
        let inner = Arc::new(LingeringStore(InMemoryStore::new()));
        let store = Arc::new(JournaledStore::new(Arc::clone(&inner), Arc::clone(&log), ns));
        let writer = Arc::new(ConcurrentWriter::new(Arc::clone(&store)));
        let record = writer.create(Document::from_pairs([("titulo", "A")])).unwrap();
        let titulo = FieldPath::parse("titulo").unwrap();

        let first = {
            let writer = Arc::clone(&writer);
            let changes = FieldChanges::new().with_set(titulo.clone(), "B");
            std::thread::spawn(move || writer.update(record.id, 1, &changes))
        };
        while inner.get(record.id).unwrap().map(|r| r.version) != Some(2) {
            std::thread::yield_now();
        }
        let second = writer
            .update(record.id, 2, &FieldChanges::new().with_set(titulo.clone(), "C"))
            .unwrap();
        assert_eq!(first.join().unwrap().unwrap(), 2);
        assert_eq!(second, 3);

        let titles: Vec<_> = log
            .snapshot()
            .iter()
            .filter_map(|entry| match &entry.operation {
                Operation::Update { update, .. } => match crate::DiffDecoder::decode(update).unwrap() {
                    crate::DecodedUpdate::FieldDiff(changes) => changes
                        .sets()
                        .find(|(path, _)| **path == titulo)
                        .map(|(_, value)| value.clone()),
                    crate::DecodedUpdate::FullReplacement(_) => None,
                },
                _ => None,
            })
            .collect();
        assert_eq!(titles, vec![Value::from("B"), Value::from("C")]);
    }
}
