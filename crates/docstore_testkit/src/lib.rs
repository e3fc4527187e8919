//! # docstore testkit
//!
//! Test utilities for docstore.
//!
//! This crate provides:
//! - Fixtures: sample documents, journaled stores, file-backed logs
//! - [`FlakyStore`], a store that goes unavailable on demand
//! - Property-based generators using proptest
//! - Contention helpers for optimistic-concurrency tests
//!
//! ## Usage
//!
//! ```rust
//! use docstore_core::ConcurrentWriter;
//! use docstore_oplog::ChangeLog;
//! use docstore_testkit::{sample_document, JournaledFixture};
//!
//! let fixture = JournaledFixture::new();
//! let writer = ConcurrentWriter::new(fixture.journaled());
//! writer.create(sample_document("Informe")).unwrap();
//! assert_eq!(fixture.log.len().unwrap(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
