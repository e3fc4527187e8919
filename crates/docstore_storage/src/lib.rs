//! # docstore storage
//!
//! Append-only byte backends underneath the persistent change log.
//!
//! Backends are opaque byte stores: they read, append, flush and truncate,
//! and know nothing about log framing or entry encoding.
//!
//! - [`InMemoryBackend`] - tests and throwaway sessions
//! - [`FileBackend`] - a single append-only file
//!
//! ```rust
//! use docstore_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"entry").unwrap();
//! assert_eq!(backend.read_at(offset, 5).unwrap(), b"entry");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
