//! CLI command implementations.

pub mod config;
pub mod json;
pub mod log;
pub mod records;
pub mod recovery;

use docstore_core::{Config, InMemoryStore};
use docstore_oplog::FileChangeLog;
use docstore_replay::Session;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors reported by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// Bad command-line input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// File could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON input or output error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Store or record error.
    #[error(transparent)]
    Core(#[from] docstore_core::CoreError),

    /// Change-log error.
    #[error(transparent)]
    Oplog(#[from] docstore_oplog::OplogError),

    /// Replay, drill or session error.
    #[error(transparent)]
    Replay(#[from] docstore_replay::ReplayError),
}

impl CliError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// A session over the log at `path`, with the collection rebuilt from it.
pub(crate) fn open_session(
    path: &Path,
    config: Config,
) -> CliResult<Session<InMemoryStore, FileChangeLog>> {
    debug!(path = %path.display(), namespace = %config.namespace(), "opening session");
    Ok(Session::open(path, config)?)
}

/// Prints `value` as pretty JSON.
pub(crate) fn print_json(value: &impl serde::Serialize) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
