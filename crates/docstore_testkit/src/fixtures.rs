//! Test fixtures and store helpers.
//!
//! Provides ready-made stores, logs and documents for the common test
//! scenarios.

use docstore_codec::{FieldPath, Value};
use docstore_core::{
    AuditEntry, CoreError, CoreResult, DeleteOutcome, Document, DocumentStore, FieldChanges,
    InMemoryStore, InsertOutcome, Record, RecordId, UpdateOutcome, WriteOutcome,
};
use docstore_oplog::{
    ChangeEntry, ChangeLogReader, FileChangeLog, InMemoryChangeLog, JournaledStore, LogTimestamp,
    Namespace, Operation,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// The namespace fixtures write under.
pub const TEST_NAMESPACE: &str = "gestion_documental.documentos";

/// Returns [`TEST_NAMESPACE`] parsed.
pub fn test_namespace() -> Namespace {
    Namespace::parse(TEST_NAMESPACE).expect("test namespace is valid")
}

/// Parses a field path, panicking on bad input.
pub fn path(raw: &str) -> FieldPath {
    FieldPath::parse(raw).expect("valid field path")
}

/// A document with a title and a nested metadata map.
pub fn sample_document(titulo: &str) -> Document {
    Document::from_pairs([
        ("titulo", Value::from(titulo)),
        (
            "metadatos",
            Value::text_map([("autor", Value::from("ana")), ("paginas", Value::Integer(3))]),
        ),
    ])
}

/// An entry at `seconds:1` in the test namespace.
pub fn entry_at(seconds: u32, operation: Operation) -> ChangeEntry {
    ChangeEntry::new(LogTimestamp::new(seconds, 1), test_namespace(), operation)
}

/// An insert of a version-1 record carrying `titulo`.
pub fn insert_op(id: RecordId, titulo: &str) -> Operation {
    Operation::insert(Record::with_id(id, Document::from_pairs([("titulo", titulo)])).to_document())
}

/// An update setting `titulo`, in diff form.
pub fn set_title_op(id: RecordId, titulo: &str) -> Operation {
    let changes = FieldChanges::new().with_set(path("titulo"), titulo);
    Operation::update(id, docstore_oplog::encode_changes(&changes))
}

/// A plain store, an in-memory log, and a journaling view over both.
pub struct JournaledFixture {
    /// The store as seen without journaling.
    pub store: Arc<InMemoryStore>,
    /// The change log.
    pub log: Arc<InMemoryChangeLog>,
    journaled: Arc<JournaledStore<InMemoryStore, InMemoryChangeLog>>,
}

impl JournaledFixture {
    /// Creates an empty fixture in [`TEST_NAMESPACE`].
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let log = Arc::new(InMemoryChangeLog::new());
        let journaled = Arc::new(JournaledStore::new(
            Arc::clone(&store),
            Arc::clone(&log),
            test_namespace(),
        ));
        Self {
            store,
            log,
            journaled,
        }
    }

    /// The journaling store.
    pub fn journaled(&self) -> Arc<JournaledStore<InMemoryStore, InMemoryChangeLog>> {
        Arc::clone(&self.journaled)
    }

    /// A reader over the fixture's log.
    pub fn reader(&self) -> ChangeLogReader<InMemoryChangeLog> {
        ChangeLogReader::new(Arc::clone(&self.log), test_namespace())
    }

    /// Everything in the log, oldest first.
    pub fn entries(&self) -> Vec<ChangeEntry> {
        self.log.snapshot()
    }
}

impl Default for JournaledFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A log file in a temporary directory, removed on drop.
pub struct TestLogFile {
    dir: TempDir,
}

impl TestLogFile {
    /// Creates the temporary directory. The file itself appears on first
    /// open.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Path of the log file.
    pub fn path(&self) -> PathBuf {
        self.dir.path().join("oplog").join("documentos.dsol")
    }

    /// Opens the log, syncing on every append.
    pub fn open(&self) -> FileChangeLog {
        FileChangeLog::open(&self.path(), true).expect("Failed to open change log")
    }
}

impl Default for TestLogFile {
    fn default() -> Self {
        Self::new()
    }
}

/// A store that fails with `StoreUnavailable` once its write budget runs
/// out.
///
/// Reads always succeed. Each write attempt, successful or not, uses one
/// unit of the budget.
pub struct FlakyStore {
    inner: InMemoryStore,
    writes_left: AtomicUsize,
}

impl FlakyStore {
    /// A store that accepts `writes` writes and then refuses every other.
    pub fn failing_after(writes: usize) -> Self {
        Self {
            inner: InMemoryStore::new(),
            writes_left: AtomicUsize::new(writes),
        }
    }

    /// Gives the store `writes` more writes.
    pub fn recover(&self, writes: usize) {
        self.writes_left.store(writes, Ordering::SeqCst);
    }

    /// The healthy store underneath.
    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    fn spend(&self) -> CoreResult<()> {
        self.writes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .map(|_| ())
            .map_err(|_| CoreError::store_unavailable("connection refused"))
    }
}

impl DocumentStore for FlakyStore {
    fn get(&self, id: RecordId) -> CoreResult<Option<Record>> {
        self.inner.get(id)
    }

    fn insert_if_absent(&self, record: Record) -> CoreResult<InsertOutcome> {
        self.spend()?;
        self.inner.insert_if_absent(record)
    }

    fn conditional_update(
        &self,
        id: RecordId,
        expected_version: u64,
        changes: &FieldChanges,
    ) -> CoreResult<UpdateOutcome> {
        self.spend()?;
        self.inner.conditional_update(id, expected_version, changes)
    }

    fn unconditional_replace(&self, record: Record) -> CoreResult<WriteOutcome> {
        self.spend()?;
        self.inner.unconditional_replace(record)
    }

    fn unconditional_field_update(
        &self,
        id: RecordId,
        changes: &FieldChanges,
    ) -> CoreResult<WriteOutcome> {
        self.spend()?;
        self.inner.unconditional_field_update(id, changes)
    }

    fn delete(&self, id: RecordId) -> CoreResult<DeleteOutcome> {
        self.spend()?;
        self.inner.delete(id)
    }

    fn delete_all(&self) -> CoreResult<usize> {
        self.spend()?;
        self.inner.delete_all()
    }

    fn list(&self) -> CoreResult<Vec<Record>> {
        self.inner.list()
    }

    fn approve_with_audit(
        &self,
        id: RecordId,
        expected_version: u64,
        changes: &FieldChanges,
        audit: AuditEntry,
    ) -> CoreResult<UpdateOutcome> {
        self.spend()?;
        self.inner
            .approve_with_audit(id, expected_version, changes, audit)
    }

    fn audit_trail(&self) -> CoreResult<Vec<AuditEntry>> {
        self.inner.audit_trail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_core::ConcurrentWriter;
    use docstore_oplog::ChangeLog;

    #[test]
    fn flaky_store_runs_out() {
        let store = Arc::new(FlakyStore::failing_after(1));
        let writer = ConcurrentWriter::new(Arc::clone(&store));
        let record = writer.create(sample_document("A")).unwrap();

        let err = writer.create(sample_document("B")).unwrap_err();
        assert!(err.is_store_unavailable());
        assert!(writer.get(record.id).is_ok());

        store.recover(1);
        assert!(writer.create(sample_document("B")).is_ok());
    }

    #[test]
    fn journaled_fixture_records_writes() {
        let fixture = JournaledFixture::new();
        let writer = ConcurrentWriter::new(fixture.journaled());
        let record = writer.create(sample_document("A")).unwrap();
        writer.delete(record.id).unwrap();

        let codes: Vec<_> = fixture.entries().iter().map(|e| e.operation.code()).collect();
        assert_eq!(codes, ["i", "d"]);
        assert_eq!(fixture.store.count().unwrap(), 0);
    }

    #[test]
    fn log_file_survives_reopen() {
        let file = TestLogFile::new();
        file.open()
            .record(&test_namespace(), insert_op(RecordId::new(), "X"))
            .unwrap();
        assert_eq!(file.open().len().unwrap(), 1);
    }
}
