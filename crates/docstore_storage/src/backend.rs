//! Storage backend trait definition.

use crate::error::StorageResult;

/// An append-only byte store underneath a persistent change log.
///
/// Backends never interpret the bytes they hold; framing, checksums and
/// entry encoding belong to the log built on top.
///
/// # Invariants
///
/// - `append` returns the offset the data starts at
/// - `read_at` returns exactly the bytes previously appended there
/// - after `sync` returns, appended data survives process termination
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Fails if the range extends past the current size or on I/O errors.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends data and returns the offset where it begins.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes buffered writes to the operating system.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors.
    fn flush(&mut self) -> StorageResult<()>;

    /// Forces data and metadata to durable media.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors.
    fn sync(&mut self) -> StorageResult<()>;

    /// Current size in bytes, which is the offset of the next append.
    ///
    /// # Errors
    ///
    /// Fails if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Discards everything at and after `new_size`.
    ///
    /// Used to cut a torn record off the tail of a log on reopen.
    ///
    /// # Errors
    ///
    /// Fails if `new_size` exceeds the current size or on I/O errors.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;
}
