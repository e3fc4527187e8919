//! Error types for replay.

use crate::outcome::ReplayResult;
use thiserror::Error;

/// Result type for replay, drill and session operations.
pub type RecoveryResult<T> = Result<T, ReplayError>;

/// Errors that stop a replay or session operation.
///
/// Problems with individual entries never surface here; they are recorded
/// in the [`ReplayResult`].
#[derive(Error, Debug)]
pub enum ReplayError {
    /// The store failed mid-batch. Entries before the failing one were
    /// applied and are described by `partial`.
    #[error("store unavailable after {} entries: {message}", partial.processed())]
    StoreUnavailable {
        /// Store error text.
        message: String,
        /// Outcomes of the entries processed before the abort.
        partial: ReplayResult,
    },

    /// Store or record error outside a replay batch.
    #[error("store error: {0}")]
    Core(#[from] docstore_core::CoreError),

    /// Change-log error.
    #[error("change log error: {0}")]
    Oplog(#[from] docstore_oplog::OplogError),
}

impl ReplayError {
    /// The outcomes gathered before an abort, if this is one.
    pub fn partial(&self) -> Option<&ReplayResult> {
        match self {
            Self::StoreUnavailable { partial, .. } => Some(partial),
            _ => None,
        }
    }
}
