//! Change-log storage.
//!
//! [`ChangeLog`] is the append-only, timestamp-ordered record of writes.
//! Two implementations ship here:
//!
//! - [`InMemoryChangeLog`] for tests and throwaway sessions
//! - [`FileChangeLog`] persisting framed CBOR entries through a
//!   [`StorageBackend`](docstore_storage::StorageBackend)

mod file;
mod frame;
mod memory;

pub use file::FileChangeLog;
pub use frame::{compute_crc32, FRAME_MAGIC, FRAME_VERSION};
pub use memory::InMemoryChangeLog;

use crate::entry::{ChangeEntry, Operation};
use crate::error::{OplogError, OplogResult};
use crate::namespace::Namespace;
use crate::timestamp::LogTimestamp;
use std::sync::Arc;

/// Order of query results by timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Oldest first.
    Ascending,
    /// Newest first.
    Descending,
}

/// An append-only, timestamp-ordered log of writes.
///
/// # Invariants
///
/// - timestamps strictly increase across the whole log
/// - entries are never modified or removed once appended
pub trait ChangeLog: Send + Sync {
    /// Appends an entry that already carries its timestamp.
    ///
    /// # Errors
    ///
    /// Returns `OutOfOrder` unless the timestamp is greater than every
    /// timestamp already in the log.
    fn append(&self, entry: ChangeEntry) -> OplogResult<()>;

    /// Appends `operation` under the next timestamp and returns the entry.
    ///
    /// Timestamp assignment and append happen under one lock, so
    /// concurrent writers never collide.
    ///
    /// # Errors
    ///
    /// Fails if the entry cannot be persisted.
    fn record(&self, namespace: &Namespace, operation: Operation) -> OplogResult<ChangeEntry>;

    /// Entries for `namespace` with a timestamp after `after`, sorted in
    /// `direction`, truncated to `limit` after sorting.
    ///
    /// # Errors
    ///
    /// Fails if the log cannot be read.
    fn query(
        &self,
        namespace: &Namespace,
        after: Option<LogTimestamp>,
        direction: SortDirection,
        limit: Option<usize>,
    ) -> OplogResult<Vec<ChangeEntry>>;

    /// Timestamp of the newest entry in any namespace.
    ///
    /// # Errors
    ///
    /// Fails if the log cannot be read.
    fn latest_timestamp(&self) -> OplogResult<Option<LogTimestamp>>;

    /// Total number of entries in every namespace.
    ///
    /// # Errors
    ///
    /// Fails if the log cannot be read.
    fn len(&self) -> OplogResult<usize>;

    /// Returns true if the log holds no entries.
    ///
    /// # Errors
    ///
    /// Fails if the log cannot be read.
    fn is_empty(&self) -> OplogResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Makes appended entries durable.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors.
    fn flush(&self) -> OplogResult<()> {
        Ok(())
    }
}

impl<L: ChangeLog + ?Sized> ChangeLog for Arc<L> {
    fn append(&self, entry: ChangeEntry) -> OplogResult<()> {
        (**self).append(entry)
    }

    fn record(&self, namespace: &Namespace, operation: Operation) -> OplogResult<ChangeEntry> {
        (**self).record(namespace, operation)
    }

    fn query(
        &self,
        namespace: &Namespace,
        after: Option<LogTimestamp>,
        direction: SortDirection,
        limit: Option<usize>,
    ) -> OplogResult<Vec<ChangeEntry>> {
        (**self).query(namespace, after, direction, limit)
    }

    fn latest_timestamp(&self) -> OplogResult<Option<LogTimestamp>> {
        (**self).latest_timestamp()
    }

    fn len(&self) -> OplogResult<usize> {
        (**self).len()
    }

    fn flush(&self) -> OplogResult<()> {
        (**self).flush()
    }
}

/// Rejects `entry` unless it sorts after `last`.
fn check_order(last: Option<&ChangeEntry>, entry: &ChangeEntry) -> OplogResult<()> {
    match last {
        Some(last) if entry.timestamp <= last.timestamp => Err(OplogError::OutOfOrder {
            last: last.timestamp,
            attempted: entry.timestamp,
        }),
        _ => Ok(()),
    }
}

/// Query over entries already sorted ascending.
fn select(
    entries: &[ChangeEntry],
    namespace: &Namespace,
    after: Option<LogTimestamp>,
    direction: SortDirection,
    limit: Option<usize>,
) -> Vec<ChangeEntry> {
    let start = match after {
        Some(ts) => entries.partition_point(|e| e.timestamp <= ts),
        None => 0,
    };
    let matching = entries[start..]
        .iter()
        .filter(|e| &e.namespace == namespace);
    let limit = limit.unwrap_or(usize::MAX);
    match direction {
        SortDirection::Ascending => matching.take(limit).cloned().collect(),
        SortDirection::Descending => matching.rev().take(limit).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_core::RecordId;

    fn entries() -> Vec<ChangeEntry> {
        let a = Namespace::parse("db.a").unwrap();
        let b = Namespace::parse("db.b").unwrap();
        (1..=6)
            .map(|i| {
                let ns = if i % 3 == 0 { b.clone() } else { a.clone() };
                ChangeEntry::new(LogTimestamp::new(i, 1), ns, Operation::delete(RecordId::new()))
            })
            .collect()
    }

    fn seconds(found: &[ChangeEntry]) -> Vec<u32> {
        found.iter().map(|e| e.timestamp.seconds).collect()
    }

    #[test]
    fn select_filters_and_orders() {
        let all = entries();
        let a = Namespace::parse("db.a").unwrap();

        let asc = select(&all, &a, None, SortDirection::Ascending, None);
        assert_eq!(seconds(&asc), vec![1, 2, 4, 5]);

        let after = select(&all, &a, Some(LogTimestamp::new(2, 1)), SortDirection::Ascending, None);
        assert_eq!(seconds(&after), vec![4, 5]);

        let newest = select(&all, &a, None, SortDirection::Descending, Some(3));
        assert_eq!(seconds(&newest), vec![5, 4, 2]);

        let oldest = select(&all, &a, None, SortDirection::Ascending, Some(2));
        assert_eq!(seconds(&oldest), vec![1, 2]);
    }

    #[test]
    fn order_check() {
        let all = entries();
        assert!(check_order(None, &all[0]).is_ok());
        assert!(check_order(Some(&all[0]), &all[1]).is_ok());
        assert!(matches!(
            check_order(Some(&all[1]), &all[1]),
            Err(OplogError::OutOfOrder { .. })
        ));
    }
}
