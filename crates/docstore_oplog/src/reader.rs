//! Ordered reads from the change log.

use crate::entry::ChangeEntry;
use crate::error::OplogResult;
use crate::log::{ChangeLog, SortDirection};
use crate::namespace::Namespace;
use crate::timestamp::LogTimestamp;
use std::sync::Arc;
use tracing::debug;

/// How a read selects entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Replay input, oldest first.
    ///
    /// With `since`, every entry after it and `limit` is ignored. Without,
    /// the oldest `limit` entries.
    Recovery {
        /// Exclusive lower bound.
        since: Option<LogTimestamp>,
        /// Cap applied when `since` is absent.
        limit: usize,
    },
    /// The newest `limit` entries, newest first.
    Monitor {
        /// Number of entries.
        limit: usize,
    },
}

/// Reads one namespace of a change log.
///
/// Results are materialized snapshots: entries appended after a read
/// returns are not reflected in it.
pub struct ChangeLogReader<L: ChangeLog + ?Sized> {
    log: Arc<L>,
    namespace: Namespace,
}

impl<L: ChangeLog + ?Sized> ChangeLogReader<L> {
    /// Creates a reader for `namespace`.
    pub fn new(log: Arc<L>, namespace: Namespace) -> Self {
        Self { log, namespace }
    }

    /// The namespace being read.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Reads according to `mode`.
    ///
    /// # Errors
    ///
    /// Propagates log failures.
    pub fn read(&self, mode: ReadMode) -> OplogResult<Vec<ChangeEntry>> {
        let entries = match mode {
            ReadMode::Recovery {
                since: Some(since),
                ..
            } => self
                .log
                .query(&self.namespace, Some(since), SortDirection::Ascending, None)?,
            ReadMode::Recovery { since: None, limit } => {
                self.log
                    .query(&self.namespace, None, SortDirection::Ascending, Some(limit))?
            }
            ReadMode::Monitor { limit } => {
                self.log
                    .query(&self.namespace, None, SortDirection::Descending, Some(limit))?
            }
        };
        debug!(namespace = %self.namespace, ?mode, count = entries.len(), "read change log");
        Ok(entries)
    }

    /// Recovery read: entries after `since`, or the oldest `max` entries.
    ///
    /// # Errors
    ///
    /// Propagates log failures.
    pub fn read_since(
        &self,
        since: Option<LogTimestamp>,
        max: usize,
    ) -> OplogResult<Vec<ChangeEntry>> {
        self.read(ReadMode::Recovery { since, limit: max })
    }

    /// Monitoring read: the newest `n` entries, newest first.
    ///
    /// # Errors
    ///
    /// Propagates log failures.
    pub fn recent(&self, n: usize) -> OplogResult<Vec<ChangeEntry>> {
        self.read(ReadMode::Monitor { limit: n })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Operation;
    use crate::log::InMemoryChangeLog;
    use docstore_core::RecordId;

    fn reader(count: u32) -> ChangeLogReader<InMemoryChangeLog> {
        let ns = Namespace::parse("db.docs").unwrap();
        let other = Namespace::parse("db.other").unwrap();
        let log = InMemoryChangeLog::new();
        for s in 1..=count {
            log.append(ChangeEntry::new(
                LogTimestamp::new(s, 1),
                ns.clone(),
                Operation::delete(RecordId::new()),
            ))
            .unwrap();
            log.append(ChangeEntry::new(
                LogTimestamp::new(s, 2),
                other.clone(),
                Operation::delete(RecordId::new()),
            ))
            .unwrap();
        }
        ChangeLogReader::new(Arc::new(log), ns)
    }

    fn seconds(entries: &[ChangeEntry]) -> Vec<u32> {
        entries.iter().map(|e| e.timestamp.seconds).collect()
    }

    #[test]
    fn since_is_exclusive_and_unbounded() {
        let reader = reader(30);
        let found = reader.read_since(Some(LogTimestamp::new(5, 1)), 3).unwrap();
        assert_eq!(found.len(), 25);
        assert_eq!(found[0].timestamp, LogTimestamp::new(6, 1));
        assert!(found.iter().all(|e| e.namespace == *reader.namespace()));
    }

    #[test]
    fn recovery_without_since_takes_oldest() {
        let reader = reader(30);
        assert_eq!(seconds(&reader.read_since(None, 4).unwrap()), vec![1, 2, 3, 4]);
    }

    #[test]
    fn monitor_takes_newest_descending() {
        let reader = reader(30);
        assert_eq!(seconds(&reader.recent(3).unwrap()), vec![30, 29, 28]);
    }

    #[test]
    fn empty_log_reads_empty() {
        let reader = reader(0);
        assert!(reader.read_since(None, 20).unwrap().is_empty());
        assert!(reader.recent(20).unwrap().is_empty());
    }
}
