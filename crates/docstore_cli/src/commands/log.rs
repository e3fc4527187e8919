//! Log inspection commands.

use super::json::EntryView;
use super::{open_session, print_json, CliResult};
use docstore_core::{Config, DocumentStore};
use docstore_oplog::{ChangeLog, ChangeLogReader, FileChangeLog};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Log inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Log file path.
    pub path: String,
    /// File size in bytes.
    pub file_size: u64,
    /// Entries in every namespace.
    pub entry_count: usize,
    /// Entries in the configured namespace.
    pub namespace_entries: usize,
    /// Newest timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    /// Configured namespace.
    pub namespace: String,
    /// Records after replaying the log.
    pub record_count: usize,
}

/// Runs the inspect command.
pub fn inspect(path: &Path, config: Config, format: &str) -> CliResult<()> {
    if !path.exists() {
        return Err(super::CliError::invalid(format!(
            "no change log at {}",
            path.display()
        )));
    }
    let session = open_session(path, config)?;
    let log = session.log();
    let result = InspectResult {
        path: path.display().to_string(),
        file_size: std::fs::metadata(path)?.len(),
        entry_count: log.len()?,
        namespace_entries: session.reader().read_since(None, usize::MAX)?.len(),
        latest: log.latest_timestamp()?.map(|ts| ts.to_string()),
        namespace: session.namespace().to_string(),
        record_count: session.store().count()?,
    };

    match format {
        "json" => print_json(&result)?,
        _ => {
            println!("Change log: {}", result.path);
            println!("File size: {} bytes", result.file_size);
            println!("Entries: {}", result.entry_count);
            println!(
                "Entries in {}: {}",
                result.namespace, result.namespace_entries
            );
            println!(
                "Latest timestamp: {}",
                result.latest.as_deref().unwrap_or("-")
            );
            println!("Records: {}", result.record_count);
        }
    }
    Ok(())
}

/// Runs the monitor command. The log is read without rebuilding records.
pub fn monitor(path: &Path, config: Config, limit: Option<usize>, format: &str) -> CliResult<()> {
    let log = Arc::new(FileChangeLog::open(path, config.sync_on_append)?);
    let reader = ChangeLogReader::new(log, docstore_oplog::Namespace::try_from(&config)?);
    let entries = reader.recent(limit.unwrap_or(config.monitor_limit))?;
    let views: Vec<EntryView> = entries.iter().map(EntryView::from).collect();

    match format {
        "json" => print_json(&views)?,
        _ => {
            println!("{:<16} {:<4} {:<38} PAYLOAD", "TS", "OP", "TARGET");
            for view in &views {
                println!(
                    "{:<16} {:<4} {:<38} {}",
                    view.ts,
                    view.op,
                    view.target.as_deref().unwrap_or("-"),
                    view.o
                );
            }
        }
    }
    Ok(())
}
