//! # docstore core
//!
//! Versioned records and the optimistic-concurrency write protocol.
//!
//! This crate provides:
//! - [`Record`], [`RecordId`] and [`Document`], the stored entity model
//! - [`FieldChanges`], field-level set/remove instructions
//! - [`DocumentStore`], the contract every backing store implements, and
//!   the reference [`InMemoryStore`]
//! - [`ConcurrentWriter`], version compare-and-swap updates
//! - [`ApprovalWorkflow`], approval with an atomic audit trail
//!
//! ## Example
//!
//! ```rust
//! use docstore_codec::FieldPath;
//! use docstore_core::{ConcurrentWriter, CoreError, Document, FieldChanges, InMemoryStore};
//! use std::sync::Arc;
//!
//! let writer = ConcurrentWriter::new(Arc::new(InMemoryStore::new()));
//! let record = writer.create(Document::from_pairs([("titulo", "Acta")])).unwrap();
//!
//! let rename = FieldChanges::new().with_set(FieldPath::parse("titulo").unwrap(), "Acta final");
//! assert_eq!(writer.update(record.id, 1, &rename).unwrap(), 2);
//!
//! // A writer still holding version 1 loses.
//! let err = writer.update(record.id, 1, &rename).unwrap_err();
//! assert!(matches!(err, CoreError::VersionConflict { actual: 2, .. }));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod changes;
mod config;
mod error;
pub mod record;
pub mod store;
mod types;
mod workflow;
mod writer;

pub use changes::FieldChanges;
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use record::{Document, Record, RecordId};
pub use store::{
    AuditEntry, DeleteOutcome, DocumentStore, InMemoryStore, InsertOutcome, UpdateOutcome,
    WriteOutcome,
};
pub use types::{now_millis, ACTION_APPROVED, STATE_APPROVED, STATE_DRAFT};
pub use workflow::ApprovalWorkflow;
pub use writer::ConcurrentWriter;
