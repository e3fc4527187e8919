//! End-to-end replay scenarios.

use docstore_codec::Value;
use docstore_core::{
    ApprovalWorkflow, ConcurrentWriter, CoreError, Document, DocumentStore, FieldChanges,
    InMemoryStore, RecordId, STATE_APPROVED,
};
use docstore_oplog::{ChangeLog, ChangeLogReader, JournaledStore, Operation};
use docstore_replay::{DisasterDrill, ReplayEngine, ReplayError, Session, SkipReason};
use docstore_testkit::{
    document_strategy, entry_at, field_changes_strategy, insert_op, path, sample_document,
    set_title_op, test_namespace, FlakyStore, JournaledFixture, TestLogFile,
};
use proptest::prelude::*;
use std::sync::Arc;

fn engine() -> ReplayEngine<InMemoryStore> {
    ReplayEngine::new(Arc::new(InMemoryStore::new()))
}

#[test]
fn insert_update_delete_leaves_nothing() {
    let id = RecordId::new();
    let batch = [
        entry_at(1, insert_op(id, "X")),
        entry_at(2, set_title_op(id, "Y")),
        entry_at(3, Operation::delete(id)),
    ];

    let engine = engine();
    let result = engine.replay(&batch).unwrap();
    assert_eq!(result.applied(), 3);
    assert!(result.is_clean());
    assert_eq!(engine.store().count().unwrap(), 0);

    let engine = self::engine();
    engine.replay(&batch[..2]).unwrap();
    let records = engine.store().list().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].fields.get("titulo"), Some(&Value::from("Y")));
}

#[test]
fn entries_apply_in_log_order() {
    let id = RecordId::new();
    let batch = [
        entry_at(1, insert_op(id, "A")),
        entry_at(2, set_title_op(id, "B")),
        entry_at(3, set_title_op(id, "C")),
    ];
    let engine = engine();
    let result = engine.replay(&batch).unwrap();

    let stamps: Vec<_> = result.reports().iter().map(|r| r.timestamp.seconds).collect();
    assert_eq!(stamps, [1, 2, 3]);
    let stored = engine.store().get(id).unwrap().unwrap();
    assert_eq!(stored.fields.get("titulo"), Some(&Value::from("C")));
}

#[test]
fn swapping_dependent_updates_changes_the_result() {
    let id = RecordId::new();
    let in_order = [
        entry_at(1, insert_op(id, "A")),
        entry_at(2, set_title_op(id, "B")),
        entry_at(3, set_title_op(id, "C")),
    ];
    let swapped = [in_order[0].clone(), in_order[2].clone(), in_order[1].clone()];

    let first = engine();
    first.replay(&in_order).unwrap();
    let second = engine();
    second.replay(&swapped).unwrap();

    assert_ne!(
        first.store().get(id).unwrap().unwrap().fields,
        second.store().get(id).unwrap().unwrap().fields
    );
}

#[test]
fn replaying_twice_matches_replaying_once() {
    let fixture = JournaledFixture::new();
    let writer = ConcurrentWriter::new(fixture.journaled());
    let a = writer.create(sample_document("A")).unwrap();
    let b = writer.create(sample_document("B")).unwrap();
    writer
        .update(a.id, 1, &FieldChanges::new().with_remove(path("metadatos.paginas")))
        .unwrap();
    writer.delete(b.id).unwrap();
    let entries = fixture.entries();

    let engine = engine();
    engine.replay(&entries).unwrap();
    let once = engine.store().list().unwrap();

    let second = engine.replay(&entries).unwrap();
    assert_eq!(second.failed(), 0);
    // a is still present; b was deleted, so its insert lands again and the
    // logged delete removes it once more
    assert_eq!(second.skipped_for(SkipReason::Duplicate), 1);
    assert_eq!(engine.store().list().unwrap(), once);
    assert_eq!(once, fixture.store.list().unwrap());
}

#[test]
fn unavailable_store_aborts_with_partial_result() {
    let ids: Vec<_> = (0..4).map(|_| RecordId::new()).collect();
    let batch: Vec<_> = ids
        .iter()
        .zip(1..)
        .map(|(id, s)| entry_at(s, insert_op(*id, "X")))
        .collect();

    let store = Arc::new(FlakyStore::failing_after(2));
    let engine = ReplayEngine::new(Arc::clone(&store));
    let err = engine.replay(&batch).unwrap_err();

    let partial = err.partial().expect("abort carries partial result");
    assert!(matches!(err, ReplayError::StoreUnavailable { .. }));
    assert_eq!(partial.applied(), 2);
    assert_eq!(store.inner().count().unwrap(), 2);

    store.recover(usize::MAX);
    let resumed = engine.replay(&batch[partial.processed()..]).unwrap();
    assert_eq!(resumed.applied(), 2);
    assert_eq!(store.inner().count().unwrap(), 4);
}

#[test]
fn drill_rebuilds_journaled_state() {
    let fixture = JournaledFixture::new();
    let journaled = fixture.journaled();
    let writer = ConcurrentWriter::new(Arc::clone(&journaled));
    let workflow = ApprovalWorkflow::new(Arc::clone(&journaled));

    let kept = writer.create(sample_document("Contrato")).unwrap();
    let gone = writer.create(sample_document("Borrador")).unwrap();
    writer
        .update(kept.id, 1, &FieldChanges::new().with_set(path("metadatos.autor"), "luis"))
        .unwrap();
    workflow.approve(kept.id, "admin").unwrap();
    writer.delete(gone.id).unwrap();
    let before = fixture.store.list().unwrap();

    let report = DisasterDrill::new(Arc::clone(&fixture.store), fixture.reader(), 1000)
        .run()
        .unwrap();

    assert_eq!(report.wiped, 1);
    assert_eq!(report.restored, 1);
    assert_eq!(fixture.store.list().unwrap(), before);
    let restored = fixture.store.get(kept.id).unwrap().unwrap();
    assert_eq!(restored.state, STATE_APPROVED);
    assert_eq!(restored.version, 3);
    // the drill wiped the plain store, so no deletes were journaled
    assert_eq!(fixture.log.len().unwrap(), 5);
}

#[test]
fn file_session_restores_after_reopen() {
    let file = TestLogFile::new();
    let config = docstore_core::Config::default();

    let id = {
        let session = Session::open(&file.path(), config.clone()).unwrap();
        let record = session.writer().create(sample_document("Acta")).unwrap();
        session.workflow().approve(record.id, "admin").unwrap();
        record.id
    };

    let session = Session::open(&file.path(), config).unwrap();
    let record = session.store().get(id).unwrap().unwrap();
    assert_eq!(record.state, STATE_APPROVED);
    assert_eq!(session.monitor().unwrap().len(), 2);

    let report = session.drill().unwrap();
    assert_eq!(report.restored, 1);
    assert!(report.replay.is_clean());
}

#[test]
fn stale_writer_loses_and_log_shows_one_update() {
    let fixture = JournaledFixture::new();
    let writer = ConcurrentWriter::new(fixture.journaled());
    let record = writer.create(Document::from_pairs([("titulo", "X")])).unwrap();

    let first = FieldChanges::new().with_set(path("titulo"), "Y");
    let second = FieldChanges::new().with_set(path("titulo"), "Z");
    assert_eq!(writer.update(record.id, 1, &first).unwrap(), 2);
    assert!(matches!(
        writer.update(record.id, 1, &second),
        Err(CoreError::VersionConflict { expected: 1, actual: 2, .. })
    ));

    let updates = fixture
        .reader()
        .recent(10)
        .unwrap()
        .into_iter()
        .filter(|e| e.operation.code() == "u")
        .count();
    assert_eq!(updates, 1);
}

#[test]
fn reader_recovery_skips_other_namespaces() {
    let fixture = JournaledFixture::new();
    let other = docstore_oplog::Namespace::parse("otra.coleccion").unwrap();
    fixture.log.record(&other, insert_op(RecordId::new(), "ajeno")).unwrap();
    ConcurrentWriter::new(fixture.journaled())
        .create(sample_document("propio"))
        .unwrap();

    let engine = engine().scoped_to(test_namespace());
    let result = engine.recover(&fixture.reader(), None, 20).unwrap();
    assert_eq!(result.processed(), 1);
    assert_eq!(engine.store().count().unwrap(), 1);

    let unscoped = self::engine();
    let result = unscoped
        .recover(&ChangeLogReader::new(Arc::clone(&fixture.log), other), None, 20)
        .unwrap();
    assert_eq!(result.applied(), 1);
}

proptest! {
    #[test]
    fn versions_climb_by_one_and_replay_matches(titles in prop::collection::vec("[a-z]{1,6}", 1..12)) {
        let fixture = JournaledFixture::new();
        let writer = ConcurrentWriter::new(fixture.journaled());
        let record = writer.create(Document::new()).unwrap();

        let mut version = record.version;
        for title in &titles {
            let changes = FieldChanges::new().with_set(path("titulo"), title.as_str());
            let next = writer.update(record.id, version, &changes).unwrap();
            prop_assert_eq!(next, version + 1);
            version = next;
        }

        let engine = engine();
        let result = engine.replay(&fixture.entries()).unwrap();
        prop_assert!(result.is_clean());
        prop_assert_eq!(engine.store().list().unwrap(), fixture.store.list().unwrap());
    }

    #[test]
    fn random_change_sets_replay_to_the_live_state(
        initial in document_strategy(),
        batches in prop::collection::vec(field_changes_strategy(), 1..8),
    ) {
        let fixture = JournaledFixture::new();
        let writer = ConcurrentWriter::new(fixture.journaled());
        let record = writer.create(initial).unwrap();

        let mut version = record.version;
        for changes in &batches {
            match writer.update(record.id, version, changes) {
                Ok(next) => version = next,
                // A set through a non-map field is refused and leaves the record alone.
                Err(_) => {
                    let stored = fixture.store.get(record.id).unwrap().unwrap();
                    prop_assert_eq!(stored.version, version);
                }
            }
        }

        let engine = engine();
        let result = engine.replay(&fixture.entries()).unwrap();
        prop_assert!(result.is_clean());
        prop_assert_eq!(result.applied(), version as usize);
        prop_assert_eq!(engine.store().list().unwrap(), fixture.store.list().unwrap());
    }
}

#[test]
fn journaled_store_wraps_flaky_store() {
    let store = Arc::new(FlakyStore::failing_after(0));
    let log = Arc::new(docstore_oplog::InMemoryChangeLog::new());
    let journaled = Arc::new(JournaledStore::new(Arc::clone(&store), Arc::clone(&log), test_namespace()));

    let err = ConcurrentWriter::new(journaled).create(sample_document("X")).unwrap_err();
    assert!(err.is_store_unavailable());
    assert!(log.is_empty().unwrap());
}
