//! # docstore oplog
//!
//! The change log: an append-only, timestamp-ordered record of writes,
//! and the tools to read it back.
//!
//! This crate provides:
//! - [`ChangeEntry`] and [`Operation`], with their CBOR encoding
//! - [`ChangeLog`] with in-memory and file-backed implementations
//! - [`ChangeLogReader`] for recovery and monitoring reads
//! - [`DiffDecoder`] and [`encode_diff`] for partial-update payloads
//! - [`JournaledStore`], which captures store writes into a log
//!
//! ```rust
//! use docstore_core::{ConcurrentWriter, Document, InMemoryStore};
//! use docstore_oplog::{ChangeLogReader, InMemoryChangeLog, JournaledStore, Namespace};
//! use std::sync::Arc;
//!
//! let ns = Namespace::parse("gestion.documentos").unwrap();
//! let log = Arc::new(InMemoryChangeLog::new());
//! let store = JournaledStore::new(Arc::new(InMemoryStore::new()), Arc::clone(&log), ns.clone());
//!
//! let writer = ConcurrentWriter::new(Arc::new(store));
//! writer.create(Document::from_pairs([("titulo", "Acta")])).unwrap();
//!
//! let reader = ChangeLogReader::new(log, ns);
//! assert_eq!(reader.recent(20).unwrap().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod diff;
mod entry;
mod error;
mod journal;
pub mod log;
mod namespace;
mod reader;
mod timestamp;

pub use diff::{encode_changes, encode_diff, DecodedUpdate, DiffDecoder, DiffNode};
pub use entry::{ChangeEntry, Operation};
pub use error::{OplogError, OplogResult};
pub use journal::JournaledStore;
pub use log::{ChangeLog, FileChangeLog, InMemoryChangeLog, SortDirection};
pub use namespace::Namespace;
pub use reader::{ChangeLogReader, ReadMode};
pub use timestamp::LogTimestamp;
