//! File-backed change log.

use super::frame::{decode_frames, encode_frame};
use super::{check_order, select, ChangeLog, SortDirection};
use crate::entry::{ChangeEntry, Operation};
use crate::error::OplogResult;
use crate::namespace::Namespace;
use crate::timestamp::LogTimestamp;
use docstore_storage::{FileBackend, StorageBackend};
use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, warn};

struct LogState<B> {
    backend: B,
    entries: Vec<ChangeEntry>,
}

/// A [`ChangeLog`] persisted as framed CBOR records.
///
/// The whole log is read on open and kept in memory for queries; appends
/// go to the backend first and to the in-memory copy once written. A
/// frame cut short by a crash is truncated away on open.
pub struct FileChangeLog<B: StorageBackend = FileBackend> {
    state: Mutex<LogState<B>>,
    sync_on_append: bool,
}

impl FileChangeLog<FileBackend> {
    /// Opens or creates the log file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or holds a corrupted frame.
    pub fn open(path: &Path, sync_on_append: bool) -> OplogResult<Self> {
        Self::with_backend(FileBackend::open(path)?, sync_on_append)
    }
}

impl<B: StorageBackend> FileChangeLog<B> {
    /// Loads a log from any backend.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, bad frames, or entries out of timestamp order.
    pub fn with_backend(mut backend: B, sync_on_append: bool) -> OplogResult<Self> {
        let size = backend.size()?;
        let bytes = backend.read_at(0, usize::try_from(size).unwrap_or(usize::MAX))?;
        let decoded = decode_frames(&bytes)?;

        if decoded.valid_len < size {
            warn!(
                valid = decoded.valid_len,
                size, "truncating torn change-log tail"
            );
            backend.truncate(decoded.valid_len)?;
        }
        for pair in decoded.entries.windows(2) {
            check_order(Some(&pair[0]), &pair[1])?;
        }
        debug!(entries = decoded.entries.len(), "change log loaded");

        Ok(Self {
            state: Mutex::new(LogState {
                backend,
                entries: decoded.entries,
            }),
            sync_on_append,
        })
    }

    fn write(&self, state: &mut LogState<B>, entry: ChangeEntry) -> OplogResult<()> {
        let frame = encode_frame(&entry)?;
        state.backend.append(&frame)?;
        if self.sync_on_append {
            state.backend.sync()?;
        }
        state.entries.push(entry);
        Ok(())
    }
}

impl<B: StorageBackend> ChangeLog for FileChangeLog<B> {
    fn append(&self, entry: ChangeEntry) -> OplogResult<()> {
        let mut state = self.state.lock();
        check_order(state.entries.last(), &entry)?;
        self.write(&mut state, entry)
    }

    fn record(&self, namespace: &Namespace, operation: Operation) -> OplogResult<ChangeEntry> {
        let mut state = self.state.lock();
        let timestamp = LogTimestamp::next_after(state.entries.last().map(|e| e.timestamp));
        let entry = ChangeEntry::new(timestamp, namespace.clone(), operation);
        self.write(&mut state, entry.clone())?;
        Ok(entry)
    }

    fn query(
        &self,
        namespace: &Namespace,
        after: Option<LogTimestamp>,
        direction: SortDirection,
        limit: Option<usize>,
    ) -> OplogResult<Vec<ChangeEntry>> {
        Ok(select(&self.state.lock().entries, namespace, after, direction, limit))
    }

    fn latest_timestamp(&self) -> OplogResult<Option<LogTimestamp>> {
        Ok(self.state.lock().entries.last().map(|e| e.timestamp))
    }

    fn len(&self) -> OplogResult<usize> {
        Ok(self.state.lock().entries.len())
    }

    fn flush(&self) -> OplogResult<()> {
        let mut state = self.state.lock();
        state.backend.flush()?;
        state.backend.sync()?;
        Ok(())
    }
}
