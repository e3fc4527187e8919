//! # docstore replay
//!
//! Rebuilding collection state from the change log.
//!
//! This crate provides:
//! - [`ReplayEngine`], which applies entries exactly in log order
//! - [`ReplayResult`], per-entry outcomes of a replay
//! - [`DisasterDrill`], wipe-and-replay rehearsal
//! - [`Session`], the context handle tying store, log and config together
//!
//! ## Replay rules
//!
//! | entry | effect |
//! |---|---|
//! | insert, id present | skipped (duplicate) |
//! | insert, id absent | inserted as logged |
//! | update, full document | record replaced |
//! | update, diff | one combined set/remove write |
//! | update, empty diff | skipped (no-op) |
//! | update, target absent | skipped (target missing) |
//! | delete | removed; already absent also counts as applied |
//!
//! Entries that cannot be applied are recorded as failed and the replay
//! continues. Only an unavailable store stops a batch.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod drill;
mod engine;
mod error;
mod outcome;
mod session;

pub use drill::{DisasterDrill, DrillReport};
pub use engine::ReplayEngine;
pub use error::{RecoveryResult, ReplayError};
pub use outcome::{EntryOutcome, EntryReport, ReplayResult, SkipReason};
pub use session::Session;
