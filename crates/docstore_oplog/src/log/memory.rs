//! In-memory change log.

use super::{check_order, select, ChangeLog, SortDirection};
use crate::entry::{ChangeEntry, Operation};
use crate::error::OplogResult;
use crate::namespace::Namespace;
use crate::timestamp::LogTimestamp;
use parking_lot::RwLock;

/// A [`ChangeLog`] kept in a `Vec`.
#[derive(Debug, Default)]
pub struct InMemoryChangeLog {
    entries: RwLock<Vec<ChangeEntry>>,
}

impl InMemoryChangeLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a log holding `entries`.
    ///
    /// # Errors
    ///
    /// Returns `OutOfOrder` if the timestamps are not strictly increasing.
    pub fn from_entries(entries: impl IntoIterator<Item = ChangeEntry>) -> OplogResult<Self> {
        let log = Self::new();
        for entry in entries {
            log.append(entry)?;
        }
        Ok(log)
    }

    /// A copy of every entry, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ChangeEntry> {
        self.entries.read().clone()
    }
}

impl ChangeLog for InMemoryChangeLog {
    fn append(&self, entry: ChangeEntry) -> OplogResult<()> {
        let mut entries = self.entries.write();
        check_order(entries.last(), &entry)?;
        entries.push(entry);
        Ok(())
    }

    fn record(&self, namespace: &Namespace, operation: Operation) -> OplogResult<ChangeEntry> {
        let mut entries = self.entries.write();
        let timestamp = LogTimestamp::next_after(entries.last().map(|e| e.timestamp));
        let entry = ChangeEntry::new(timestamp, namespace.clone(), operation);
        entries.push(entry.clone());
        Ok(entry)
    }

    fn query(
        &self,
        namespace: &Namespace,
        after: Option<LogTimestamp>,
        direction: SortDirection,
        limit: Option<usize>,
    ) -> OplogResult<Vec<ChangeEntry>> {
        Ok(select(&self.entries.read(), namespace, after, direction, limit))
    }

    fn latest_timestamp(&self) -> OplogResult<Option<LogTimestamp>> {
        Ok(self.entries.read().last().map(|e| e.timestamp))
    }

    fn len(&self) -> OplogResult<usize> {
        Ok(self.entries.read().len())
    }
}
