//! Record commands.
//!
//! Writes go through the session's journaling writer, so they land in the
//! change log and survive the next invocation.

use super::json::{parse_assignment, parse_value, record_json};
use super::{open_session, print_json, CliError, CliResult};
use docstore_codec::FieldPath;
use docstore_core::{Config, CoreError, Document, DocumentStore, FieldChanges, Record, RecordId};
use std::path::Path;

fn parse_id(raw: &str) -> CliResult<RecordId> {
    RecordId::parse(raw).map_err(|e| CliError::invalid(e.to_string()))
}

fn print_record(record: &Record, format: &str) -> CliResult<()> {
    match format {
        "json" => print_json(&record_json(record)),
        _ => {
            println!(
                "{} v{} [{}] {}",
                record.id,
                record.version,
                record.state,
                super::json::document_json(&record.fields)
            );
            Ok(())
        }
    }
}

fn print_records(records: &[Record], format: &str) -> CliResult<()> {
    match format {
        "json" => print_json(&records.iter().map(record_json).collect::<Vec<_>>()),
        _ => {
            for record in records {
                print_record(record, format)?;
            }
            println!("{} records", records.len());
            Ok(())
        }
    }
}

/// Runs the create command.
pub fn create(path: &Path, config: Config, fields: &[String], format: &str) -> CliResult<()> {
    let mut document = Document::new();
    for raw in fields {
        let (path, value) = parse_assignment(raw)?;
        document.set_path(&path, value)?;
    }
    let session = open_session(path, config)?;
    let record = session.writer().create(document)?;
    print_record(&record, format)?;
    session.close()?;
    Ok(())
}

/// Runs the get command.
pub fn get(path: &Path, config: Config, id: &str, format: &str) -> CliResult<()> {
    let id = parse_id(id)?;
    let session = open_session(path, config)?;
    let record = session.store().get(id)?.ok_or(CoreError::NotFound { id })?;
    print_record(&record, format)
}

/// Runs the update command.
pub fn update(
    path: &Path,
    config: Config,
    id: &str,
    expected_version: u64,
    set: &[String],
    unset: &[String],
    format: &str,
) -> CliResult<()> {
    let id = parse_id(id)?;
    let mut changes = FieldChanges::new();
    for raw in set {
        let (path, value) = parse_assignment(raw)?;
        changes.set(path, value);
    }
    for raw in unset {
        changes.remove(
            FieldPath::parse(raw).map_err(|e| CliError::invalid(format!("bad field path {raw:?}: {e}")))?,
        );
    }
    if changes.is_empty() {
        return Err(CliError::invalid("nothing to update"));
    }

    let session = open_session(path, config)?;
    let (_, after) = session.writer().write(id, expected_version, &changes)?;
    print_record(&after, format)?;
    session.close()?;
    Ok(())
}

/// Runs the approve command.
pub fn approve(path: &Path, config: Config, id: &str, actor: &str, format: &str) -> CliResult<()> {
    let id = parse_id(id)?;
    let session = open_session(path, config)?;
    let record = session.workflow().approve(id, actor)?;
    print_record(&record, format)?;
    session.close()?;
    Ok(())
}

/// Runs the delete command.
pub fn delete(path: &Path, config: Config, id: &str) -> CliResult<()> {
    let id = parse_id(id)?;
    let session = open_session(path, config)?;
    session.writer().delete(id)?;
    println!("Deleted {id}");
    session.close()?;
    Ok(())
}

/// Runs the list command.
pub fn list(path: &Path, config: Config, limit: Option<usize>, format: &str) -> CliResult<()> {
    let session = open_session(path, config)?;
    let mut records = session.store().list()?;
    records.truncate(limit.unwrap_or(usize::MAX));
    print_records(&records, format)
}

/// Runs the find command.
pub fn find(path: &Path, config: Config, field: &str, value: &str, format: &str) -> CliResult<()> {
    let field = FieldPath::parse(field)
        .map_err(|e| CliError::invalid(format!("bad field path {field:?}: {e}")))?;
    let value = parse_value(value)?;
    let session = open_session(path, config)?;
    let records = session.store().find_eq(&field, &value)?;
    print_records(&records, format)
}
