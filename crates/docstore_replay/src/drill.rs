//! Disaster-recovery drills.

use crate::engine::ReplayEngine;
use crate::error::RecoveryResult;
use crate::outcome::ReplayResult;
use docstore_core::DocumentStore;
use docstore_oplog::{ChangeLog, ChangeLogReader};
use std::sync::Arc;
use tracing::{info, warn};

/// What a drill did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrillReport {
    /// Records present before the wipe.
    pub wiped: usize,
    /// Outcome of the replay.
    pub replay: ReplayResult,
    /// Records present after the replay.
    pub restored: usize,
}

/// Wipes a store and rebuilds it from the change log.
///
/// The wipe goes straight to the store, so when the store is a
/// [`JournaledStore`](docstore_oplog::JournaledStore) pass its
/// [`inner`](docstore_oplog::JournaledStore::inner) store, or the deletes
/// land in the log being replayed.
pub struct DisasterDrill<S: DocumentStore + ?Sized, L: ChangeLog + ?Sized> {
    store: Arc<S>,
    reader: ChangeLogReader<L>,
    read_limit: usize,
}

impl<S: DocumentStore + ?Sized, L: ChangeLog + ?Sized> DisasterDrill<S, L> {
    /// Creates a drill reading at most `read_limit` entries.
    pub fn new(store: Arc<S>, reader: ChangeLogReader<L>, read_limit: usize) -> Self {
        Self {
            store,
            reader,
            read_limit,
        }
    }

    /// Runs the drill.
    ///
    /// # Errors
    ///
    /// Fails if the wipe or the log read fails, or the store becomes
    /// unavailable during replay.
    pub fn run(&self) -> RecoveryResult<DrillReport> {
        let wiped = self.store.delete_all()?;
        warn!(wiped, namespace = %self.reader.namespace(), "drill: store wiped");

        let engine = ReplayEngine::new(Arc::clone(&self.store))
            .scoped_to(self.reader.namespace().clone());
        let replay = engine.recover(&self.reader, None, self.read_limit)?;
        let restored = self.store.count()?;

        info!(wiped, restored, %replay, "drill complete");
        Ok(DrillReport {
            wiped,
            replay,
            restored,
        })
    }
}
