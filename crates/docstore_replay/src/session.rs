//! Session context.

use crate::drill::{DisasterDrill, DrillReport};
use crate::engine::ReplayEngine;
use crate::error::RecoveryResult;
use crate::outcome::ReplayResult;
use docstore_core::{ApprovalWorkflow, Config, ConcurrentWriter, DocumentStore, InMemoryStore};
use docstore_oplog::{ChangeEntry, ChangeLog, ChangeLogReader, FileChangeLog, JournaledStore, LogTimestamp, Namespace};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// The handle every operation goes through.
///
/// A session owns a store, the change log that records writes to it and
/// the configuration. Writers and workflows obtained from it journal
/// their writes; readers, replays and drills work on the plain store.
/// The log is flushed when the session is closed or dropped.
pub struct Session<S: DocumentStore + ?Sized, L: ChangeLog + ?Sized> {
    store: Arc<S>,
    log: Arc<L>,
    journaled: Arc<JournaledStore<S, L>>,
    namespace: Namespace,
    config: Config,
}

impl Session<InMemoryStore, FileChangeLog> {
    /// Opens the log file at `path` and rebuilds an in-memory store by
    /// replaying all of it.
    ///
    /// # Errors
    ///
    /// Fails if the log cannot be opened or the config names an invalid
    /// namespace.
    pub fn open(path: &Path, config: Config) -> RecoveryResult<Self> {
        let log = Arc::new(FileChangeLog::open(path, config.sync_on_append)?);
        let session = Self::new(Arc::new(InMemoryStore::new()), log, config)?;
        let restored = session.restore()?;
        info!(path = %path.display(), %restored, "session opened");
        Ok(session)
    }
}

impl<S: DocumentStore + ?Sized, L: ChangeLog + ?Sized> Session<S, L> {
    /// Creates a session over an existing store and log.
    ///
    /// # Errors
    ///
    /// Fails if the config names an invalid namespace.
    pub fn new(store: Arc<S>, log: Arc<L>, config: Config) -> RecoveryResult<Self> {
        let namespace = Namespace::try_from(&config)?;
        let journaled = Arc::new(JournaledStore::new(
            Arc::clone(&store),
            Arc::clone(&log),
            namespace.clone(),
        ));
        Ok(Self {
            store,
            log,
            journaled,
            namespace,
            config,
        })
    }

    /// The configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The namespace writes are journaled under.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The plain store. Writes made here are not journaled.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The change log.
    pub fn log(&self) -> &Arc<L> {
        &self.log
    }

    /// A writer whose writes are journaled.
    pub fn writer(&self) -> ConcurrentWriter<JournaledStore<S, L>> {
        ConcurrentWriter::new(Arc::clone(&self.journaled))
    }

    /// An approval workflow whose writes are journaled.
    pub fn workflow(&self) -> ApprovalWorkflow<JournaledStore<S, L>> {
        ApprovalWorkflow::new(Arc::clone(&self.journaled))
    }

    /// A reader over this session's namespace.
    pub fn reader(&self) -> ChangeLogReader<L> {
        ChangeLogReader::new(Arc::clone(&self.log), self.namespace.clone())
    }

    /// A replay engine targeting the plain store, scoped to the namespace.
    pub fn engine(&self) -> ReplayEngine<S> {
        ReplayEngine::new(Arc::clone(&self.store)).scoped_to(self.namespace.clone())
    }

    /// The newest entries, newest first, capped by the monitor limit.
    ///
    /// # Errors
    ///
    /// Fails if the log cannot be read.
    pub fn monitor(&self) -> RecoveryResult<Vec<ChangeEntry>> {
        Ok(self.reader().recent(self.config.monitor_limit)?)
    }

    /// Replays entries after `since`, or the oldest batch capped by the
    /// recovery batch limit.
    ///
    /// # Errors
    ///
    /// See [`ReplayEngine::recover`].
    pub fn recover(&self, since: Option<LogTimestamp>) -> RecoveryResult<ReplayResult> {
        self.engine()
            .recover(&self.reader(), since, self.config.recovery_batch_limit)
    }

    /// Replays the whole namespace, without the batch cap.
    ///
    /// # Errors
    ///
    /// See [`ReplayEngine::recover`].
    pub fn restore(&self) -> RecoveryResult<ReplayResult> {
        self.engine().recover(&self.reader(), None, usize::MAX)
    }

    /// Wipes the plain store and replays the log into it.
    ///
    /// # Errors
    ///
    /// See [`DisasterDrill::run`].
    pub fn drill(&self) -> RecoveryResult<DrillReport> {
        DisasterDrill::new(
            Arc::clone(&self.store),
            self.reader(),
            self.config.drill_read_limit,
        )
        .run()
    }

    /// Flushes the log and ends the session.
    ///
    /// # Errors
    ///
    /// Fails if the flush fails.
    pub fn close(self) -> RecoveryResult<()> {
        self.log.flush()?;
        Ok(())
    }
}

impl<S: DocumentStore + ?Sized, L: ChangeLog + ?Sized> Drop for Session<S, L> {
    fn drop(&mut self) {
        if let Err(err) = self.log.flush() {
            warn!(error = %err, "failed to flush change log on session drop");
        }
    }
}
