//! The replay engine.

use crate::error::{RecoveryResult, ReplayError};
use crate::outcome::{EntryOutcome, EntryReport, ReplayResult, SkipReason};
use docstore_core::record::KEY_ID;
use docstore_core::{
    CoreError, CoreResult, Document, DocumentStore, InsertOutcome, Record, RecordId, WriteOutcome,
};
use docstore_codec::Value;
use docstore_oplog::{
    ChangeEntry, ChangeLog, ChangeLogReader, DecodedUpdate, DiffDecoder, LogTimestamp, Namespace,
    Operation,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Applies change-log entries to a store, in order, one at a time.
///
/// Replaying the same batch twice leaves the store as one replay does:
/// inserts of present ids are skipped, deletes of absent ids succeed,
/// and full replacements overwrite.
///
/// Diffs are not re-based: a diff captured against an older state is
/// applied to whatever the target holds now. Replaying a diff after the
/// target has moved on can therefore produce a state that never existed.
pub struct ReplayEngine<S: DocumentStore + ?Sized> {
    store: Arc<S>,
    namespace: Option<Namespace>,
}

impl<S: DocumentStore + ?Sized> ReplayEngine<S> {
    /// Creates an engine that applies entries of every namespace.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            namespace: None,
        }
    }

    /// Restricts the engine to one namespace; other entries are skipped.
    #[must_use]
    pub fn scoped_to(mut self, namespace: Namespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// The target store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Replays `entries` in order.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable`, carrying the outcomes so far, if the
    /// store fails. Every other problem is recorded against its entry and
    /// the batch continues.
    pub fn replay(&self, entries: &[ChangeEntry]) -> RecoveryResult<ReplayResult> {
        let mut result = ReplayResult::new();

        for entry in entries {
            let outcome = match self.apply(entry) {
                Ok(outcome) => outcome,
                Err(err) if err.is_store_unavailable() => {
                    warn!(ts = %entry.timestamp, error = %err, "store unavailable, aborting replay");
                    return Err(ReplayError::StoreUnavailable {
                        message: err.to_string(),
                        partial: result,
                    });
                }
                Err(err) => EntryOutcome::Failed(err.to_string()),
            };

            match &outcome {
                EntryOutcome::Failed(reason) => {
                    warn!(ts = %entry.timestamp, op = entry.operation.code(), %reason, "entry failed");
                }
                other => {
                    debug!(ts = %entry.timestamp, op = entry.operation.code(), outcome = ?other, "entry replayed");
                }
            }

            result.push(EntryReport {
                timestamp: entry.timestamp,
                op: entry.operation.code(),
                target: entry.operation.target_id(),
                outcome,
            });
        }

        info!(
            processed = result.processed(),
            applied = result.applied(),
            skipped = result.skipped(),
            failed = result.failed(),
            "replay finished"
        );
        Ok(result)
    }

    /// Reads a recovery batch from `reader` and replays it.
    ///
    /// With `since`, every later entry is replayed; without, the oldest
    /// `limit` entries.
    ///
    /// # Errors
    ///
    /// Fails if the log cannot be read, or as [`replay`](Self::replay).
    pub fn recover<L: ChangeLog + ?Sized>(
        &self,
        reader: &ChangeLogReader<L>,
        since: Option<LogTimestamp>,
        limit: usize,
    ) -> RecoveryResult<ReplayResult> {
        let entries = reader.read_since(since, limit)?;
        info!(namespace = %reader.namespace(), count = entries.len(), ?since, "recovering from change log");
        self.replay(&entries)
    }

    fn apply(&self, entry: &ChangeEntry) -> CoreResult<EntryOutcome> {
        if let Some(scope) = &self.namespace {
            if &entry.namespace != scope {
                return Ok(EntryOutcome::Skipped(SkipReason::ForeignNamespace));
            }
        }

        match &entry.operation {
            Operation::Insert { document } => self.apply_insert(document),
            Operation::Update { update, .. } => match entry.operation.target_id() {
                Some(id) => self.apply_update(id, update),
                None => Ok(EntryOutcome::Skipped(SkipReason::MissingIdentifier)),
            },
            Operation::Delete { .. } => match entry.operation.target_id() {
                Some(id) => {
                    self.store.delete(id)?;
                    Ok(EntryOutcome::Applied)
                }
                None => Ok(EntryOutcome::Skipped(SkipReason::MissingIdentifier)),
            },
        }
    }

    fn apply_insert(&self, document: &Document) -> CoreResult<EntryOutcome> {
        if document.get(KEY_ID).and_then(RecordId::from_value).is_none() {
            return Ok(EntryOutcome::Failed("insert without a valid _id".to_string()));
        }
        let record = Record::from_document(document.clone())?;
        Ok(match self.store.insert_if_absent(record)? {
            InsertOutcome::Inserted => EntryOutcome::Applied,
            InsertOutcome::AlreadyPresent => EntryOutcome::Skipped(SkipReason::Duplicate),
        })
    }

    fn apply_update(&self, id: RecordId, update: &Value) -> CoreResult<EntryOutcome> {
        let decoded = match DiffDecoder::decode(update) {
            Ok(decoded) => decoded,
            Err(err) => return Ok(EntryOutcome::Failed(err.to_string())),
        };

        let written = match decoded {
            DecodedUpdate::FullReplacement(mut document) => {
                match document.get(KEY_ID) {
                    None => {
                        document.insert(KEY_ID, id.to_value());
                    }
                    Some(existing) if RecordId::from_value(existing) == Some(id) => {}
                    Some(_) => {
                        return Err(CoreError::invalid_operation(
                            "replacement document names a different _id",
                        ))
                    }
                }
                self.store
                    .unconditional_replace(Record::from_document(document)?)?
            }
            DecodedUpdate::FieldDiff(changes) if changes.is_empty() => {
                return Ok(EntryOutcome::Skipped(SkipReason::NoOp));
            }
            DecodedUpdate::FieldDiff(changes) => {
                self.store.unconditional_field_update(id, &changes)?
            }
        };

        Ok(match written {
            WriteOutcome::Written => EntryOutcome::Applied,
            WriteOutcome::TargetMissing => EntryOutcome::Skipped(SkipReason::TargetMissing),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_codec::FieldPath;
    use docstore_core::{FieldChanges, InMemoryStore};
    use docstore_oplog::encode_changes;

    fn ns() -> Namespace {
        Namespace::parse("gestion.documentos").unwrap()
    }

    fn entry(s: u32, operation: Operation) -> ChangeEntry {
        ChangeEntry::new(LogTimestamp::new(s, 1), ns(), operation)
    }

    fn insert(id: RecordId, titulo: &str) -> Operation {
        Operation::insert(Record::with_id(id, Document::from_pairs([("titulo", titulo)])).to_document())
    }

    fn set_title(id: RecordId, titulo: &str) -> Operation {
        let changes = FieldChanges::new().with_set(FieldPath::parse("titulo").unwrap(), titulo);
        Operation::update(id, encode_changes(&changes))
    }

    fn engine() -> ReplayEngine<InMemoryStore> {
        ReplayEngine::new(Arc::new(InMemoryStore::new()))
    }

    #[test]
    fn insert_is_skipped_when_present() {
        let engine = engine();
        let id = RecordId::new();
        let batch = [entry(1, insert(id, "X")), entry(2, insert(id, "other"))];

        let result = engine.replay(&batch).unwrap();
        assert_eq!(result.applied(), 1);
        assert_eq!(result.skipped_for(SkipReason::Duplicate), 1);
        let stored = engine.store().get(id).unwrap().unwrap();
        assert_eq!(stored.fields.get("titulo"), Some(&Value::from("X")));
    }

    #[test]
    fn insert_without_id_fails_but_batch_continues() {
        let engine = engine();
        let id = RecordId::new();
        let batch = [
            entry(1, Operation::insert(Document::from_pairs([("titulo", "sin id")]))),
            entry(2, insert(id, "X")),
        ];

        let result = engine.replay(&batch).unwrap();
        assert!(matches!(result.reports()[0].outcome, EntryOutcome::Failed(_)));
        assert_eq!(result.applied(), 1);
        assert_eq!(engine.store().count().unwrap(), 1);
    }

    #[test]
    fn updates_without_identifier_or_target_are_skipped() {
        let engine = engine();
        let no_id = Operation::Update {
            selector: Document::new(),
            update: Value::text_map([("titulo", Value::from("Y"))]),
        };
        let batch = [entry(1, no_id), entry(2, set_title(RecordId::new(), "Y"))];

        let result = engine.replay(&batch).unwrap();
        assert_eq!(result.skipped_for(SkipReason::MissingIdentifier), 1);
        assert_eq!(result.skipped_for(SkipReason::TargetMissing), 1);
    }

    #[test]
    fn empty_diff_is_a_no_op() {
        let engine = engine();
        let id = RecordId::new();
        let empty = Operation::update(id, encode_changes(&FieldChanges::new()));

        let result = engine.replay(&[entry(1, insert(id, "X")), entry(2, empty)]).unwrap();
        assert_eq!(result.skipped_for(SkipReason::NoOp), 1);
        assert_eq!(engine.store().get(id).unwrap().unwrap().version, 1);
    }

    #[test]
    fn full_replacement_takes_selector_id() {
        let engine = engine();
        let id = RecordId::new();
        let replace = Operation::update(id, Value::text_map([("titulo", Value::from("Nuevo")), ("version", Value::Integer(4))]));

        let result = engine.replay(&[entry(1, insert(id, "X")), entry(2, replace)]).unwrap();
        assert_eq!(result.applied(), 2);
        let stored = engine.store().get(id).unwrap().unwrap();
        assert_eq!(stored.version, 4);
        assert_eq!(stored.fields.get("titulo"), Some(&Value::from("Nuevo")));
    }

    #[test]
    fn replacement_with_foreign_id_fails() {
        let engine = engine();
        let id = RecordId::new();
        let other = RecordId::new();
        let replace = Operation::update(id, Value::text_map([("_id", other.to_value())]));

        let result = engine.replay(&[entry(1, insert(id, "X")), entry(2, replace)]).unwrap();
        assert_eq!(result.failed(), 1);
        assert!(engine.store().get(other).unwrap().is_none());
    }

    #[test]
    fn delete_of_absent_record_counts_as_applied() {
        let engine = engine();
        let result = engine.replay(&[entry(1, Operation::delete(RecordId::new()))]).unwrap();
        assert_eq!(result.applied(), 1);

        let no_id = Operation::Delete { selector: Document::new() };
        let result = engine.replay(&[entry(2, no_id)]).unwrap();
        assert_eq!(result.skipped_for(SkipReason::MissingIdentifier), 1);
    }

    #[test]
    fn scoped_engine_skips_other_namespaces() {
        let engine = engine().scoped_to(Namespace::parse("otra.coleccion").unwrap());
        let result = engine.replay(&[entry(1, insert(RecordId::new(), "X"))]).unwrap();
        assert_eq!(result.skipped_for(SkipReason::ForeignNamespace), 1);
        assert_eq!(engine.store().count().unwrap(), 0);
    }

    #[test]
    fn malformed_diff_is_recorded() {
        let engine = engine();
        let id = RecordId::new();
        let bad = Operation::update(
            id,
            Value::text_map([
                ("$v", Value::Integer(2)),
                ("diff", Value::text_map([("smeta", Value::Integer(1))])),
            ]),
        );
        let result = engine.replay(&[entry(1, insert(id, "X")), entry(2, bad)]).unwrap();
        assert_eq!(result.failed(), 1);
        assert_eq!(result.applied(), 1);
    }

    #[test]
    fn version_one_updates_apply_and_bare_marker_is_a_no_op() {
        let engine = engine();
        let id = RecordId::new();
        let v1 = Operation::update(
            id,
            Value::text_map([
                ("$v", Value::Integer(1)),
                ("$set", Value::text_map([("titulo", Value::from("Y"))])),
            ]),
        );
        let bare = Operation::update(id, Value::text_map([("$v", Value::Integer(2))]));

        let result = engine
            .replay(&[entry(1, insert(id, "X")), entry(2, v1), entry(3, bare)])
            .unwrap();
        assert_eq!(result.applied(), 2);
        assert_eq!(result.skipped_for(SkipReason::NoOp), 1);
        let stored = engine.store().get(id).unwrap().unwrap();
        assert_eq!(stored.fields.get("titulo"), Some(&Value::from("Y")));
    }
}
