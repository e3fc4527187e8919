//! Recovery and drill commands.

use super::json::ReplayView;
use super::{open_session, print_json, CliError, CliResult};
use docstore_core::{Config, DocumentStore, InMemoryStore};
use docstore_oplog::{FileChangeLog, LogTimestamp};
use docstore_replay::Session;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Runs the recover command.
///
/// The batch is replayed into an empty in-memory store, so the output
/// shows exactly what the batch produces.
pub fn recover(path: &Path, config: Config, since: Option<&str>, format: &str) -> CliResult<()> {
    let since = since
        .map(|raw| {
            raw.parse::<LogTimestamp>()
                .map_err(|e| CliError::invalid(format!("bad timestamp {raw:?}: {e}")))
        })
        .transpose()?;

    let log = Arc::new(FileChangeLog::open(path, config.sync_on_append)?);
    let session = Session::new(Arc::new(InMemoryStore::new()), log, config)?;
    let result = session.recover(since)?;
    let records = session.store().count()?;

    match format {
        "json" => print_json(&RecoverView {
            records,
            replay: ReplayView::from(&result),
        })?,
        _ => {
            for report in result.reports() {
                println!(
                    "{} {} {} {}",
                    report.timestamp,
                    report.op,
                    report.target.map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
                    report.outcome
                );
            }
            println!("{result}; {records} records");
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct RecoverView {
    records: usize,
    replay: ReplayView,
}

/// Drill result as printed by the CLI.
#[derive(Serialize)]
struct DrillView {
    wiped: usize,
    restored: usize,
    replay: ReplayView,
}

/// Runs the drill command.
pub fn drill(path: &Path, config: Config, format: &str) -> CliResult<()> {
    let session = open_session(path, config)?;
    let report = session.drill()?;

    match format {
        "json" => print_json(&DrillView {
            wiped: report.wiped,
            restored: report.restored,
            replay: ReplayView::from(&report.replay),
        })?,
        _ => {
            println!("Wiped: {}", report.wiped);
            println!("Replay: {}", report.replay);
            println!("Restored: {}", report.restored);
            if report.restored != report.wiped {
                println!("Warning: restored count differs from the pre-drill count");
            }
        }
    }
    Ok(())
}
