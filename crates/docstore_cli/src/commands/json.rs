//! Conversions between stored values and JSON.

use super::{CliError, CliResult};
use docstore_codec::{FieldPath, Value};
use docstore_core::record::KEY_ID;
use docstore_core::{Document, Record, RecordId};
use docstore_oplog::{ChangeEntry, Operation};
use docstore_replay::{EntryReport, ReplayResult};
use serde::Serialize;
use serde_json::{Map, Number, Value as Json};

/// Renders a value as JSON. Byte strings become `{"$binary": "<hex>"}`.
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(n) => Json::Number(Number::from(*n)),
        Value::Text(s) => Json::String(s.clone()),
        Value::Bytes(bytes) => {
            let hex: String = bytes.iter().map(|byte| format!("{byte:02x}")).collect();
            let mut object = Map::new();
            object.insert("$binary".to_string(), Json::String(hex));
            Json::Object(object)
        }
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Map(entries) => Json::Object(
            entries
                .iter()
                .map(|(key, value)| (key_text(key), to_json(value)))
                .collect(),
        ),
    }
}

fn key_text(key: &Value) -> String {
    match key {
        Value::Text(s) => s.clone(),
        Value::Integer(n) => n.to_string(),
        other => format!("<{}>", other.type_name()),
    }
}

/// Converts JSON input to a value. Non-integer numbers are rejected.
pub fn from_json(json: &Json) -> CliResult<Value> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => n
            .as_i64()
            .map(Value::Integer)
            .ok_or_else(|| CliError::invalid(format!("{n} is not a 64-bit integer")))?,
        Json::String(s) => Value::Text(s.clone()),
        Json::Array(items) => Value::Array(items.iter().map(from_json).collect::<CliResult<_>>()?),
        Json::Object(object) => {
            let entries = object
                .iter()
                .map(|(key, value)| -> CliResult<(String, Value)> { Ok((key.clone(), from_json(value)?)) })
                .collect::<CliResult<Vec<_>>>()?;
            Value::text_map(entries)
        }
    })
}

/// Parses a command-line value: JSON if it parses, a plain string
/// otherwise.
pub fn parse_value(raw: &str) -> CliResult<Value> {
    match serde_json::from_str::<Json>(raw) {
        Ok(json) => from_json(&json),
        Err(_) => Ok(Value::Text(raw.to_string())),
    }
}

/// Parses `path=value`.
pub fn parse_assignment(raw: &str) -> CliResult<(FieldPath, Value)> {
    let (path, value) = raw
        .split_once('=')
        .ok_or_else(|| CliError::invalid(format!("expected path=value, got {raw:?}")))?;
    let path = FieldPath::parse(path.trim())
        .map_err(|e| CliError::invalid(format!("bad field path {path:?}: {e}")))?;
    Ok((path, parse_value(value)?))
}

/// Renders a document, with `_id` in its UUID text form.
pub fn document_json(document: &Document) -> Json {
    Json::Object(
        document
            .iter()
            .map(|(name, value)| {
                let json = match (name, RecordId::from_value(value)) {
                    (KEY_ID, Some(id)) => Json::String(id.to_string()),
                    _ => to_json(value),
                };
                (name.to_string(), json)
            })
            .collect(),
    )
}

/// Renders a record in its stored document form.
pub fn record_json(record: &Record) -> Json {
    document_json(&record.to_document())
}

/// A change-log entry as printed by the CLI.
#[derive(Debug, Serialize)]
pub struct EntryView {
    /// `seconds:increment`.
    pub ts: String,
    /// Namespace.
    pub ns: String,
    /// Operation code.
    pub op: &'static str,
    /// Target record id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Operation payload.
    pub o: Json,
}

impl From<&ChangeEntry> for EntryView {
    fn from(entry: &ChangeEntry) -> Self {
        let o = match &entry.operation {
            Operation::Insert { document } => document_json(document),
            Operation::Update { update, .. } => to_json(update),
            Operation::Delete { selector } => document_json(selector),
        };
        Self {
            ts: entry.timestamp.to_string(),
            ns: entry.namespace.to_string(),
            op: entry.operation.code(),
            target: entry.operation.target_id().map(|id| id.to_string()),
            o,
        }
    }
}

/// One replayed entry as printed by the CLI.
#[derive(Debug, Serialize)]
pub struct ReportView {
    /// `seconds:increment`.
    pub ts: String,
    /// Operation code.
    pub op: &'static str,
    /// Target record id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Outcome text.
    pub outcome: String,
}

impl From<&EntryReport> for ReportView {
    fn from(report: &EntryReport) -> Self {
        Self {
            ts: report.timestamp.to_string(),
            op: report.op,
            target: report.target.map(|id| id.to_string()),
            outcome: report.outcome.to_string(),
        }
    }
}

/// A replay result as printed by the CLI.
#[derive(Debug, Serialize)]
pub struct ReplayView {
    /// Entries applied.
    pub applied: usize,
    /// Entries skipped.
    pub skipped: usize,
    /// Entries failed.
    pub failed: usize,
    /// Per-entry outcomes.
    pub entries: Vec<ReportView>,
}

impl From<&ReplayResult> for ReplayView {
    fn from(result: &ReplayResult) -> Self {
        Self {
            applied: result.applied(),
            skipped: result.skipped(),
            failed: result.failed(),
            entries: result.reports().iter().map(ReportView::from).collect(),
        }
    }
}
