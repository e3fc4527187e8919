//! Change-log entries.
//!
//! ## Encoding
//!
//! Entries are stored as canonical CBOR maps shaped like a classic
//! operation log:
//!
//! | key | value |
//! |---|---|
//! | `ts` | `[seconds, increment]` |
//! | `ns` | namespace text |
//! | `op` | `"i"`, `"u"` or `"d"` |
//! | `o` | inserted document, update payload or delete selector |
//! | `o2` | update selector (updates only) |

use crate::error::{OplogError, OplogResult};
use crate::namespace::Namespace;
use crate::timestamp::LogTimestamp;
use docstore_codec::{from_cbor, to_canonical_cbor, Value};
use docstore_core::record::KEY_ID;
use docstore_core::{Document, RecordId};

/// The write an entry records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// A record was inserted; `document` is its full document form.
    Insert {
        /// The inserted document.
        document: Document,
    },
    /// A record was updated.
    Update {
        /// Selector holding the target `_id`.
        selector: Document,
        /// Full replacement document or diff payload.
        update: Value,
    },
    /// A record was deleted.
    Delete {
        /// Selector holding the target `_id`.
        selector: Document,
    },
}

impl Operation {
    /// Builds an insert.
    pub fn insert(document: Document) -> Self {
        Self::Insert { document }
    }

    /// Builds an update addressed to `id`.
    pub fn update(id: RecordId, update: Value) -> Self {
        Self::Update {
            selector: selector(id),
            update,
        }
    }

    /// Builds a delete addressed to `id`.
    pub fn delete(id: RecordId) -> Self {
        Self::Delete {
            selector: selector(id),
        }
    }

    /// The one-letter code used on disk.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "i",
            Self::Update { .. } => "u",
            Self::Delete { .. } => "d",
        }
    }

    /// The `_id` the operation targets, if it carries a well-formed one.
    pub fn target_id(&self) -> Option<RecordId> {
        let doc = match self {
            Self::Insert { document } => document,
            Self::Update { selector, .. } | Self::Delete { selector } => selector,
        };
        doc.get(KEY_ID).and_then(RecordId::from_value)
    }
}

fn selector(id: RecordId) -> Document {
    Document::from_pairs([(KEY_ID, id.to_value())])
}

/// One write recorded in the change log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEntry {
    /// Position in the log.
    pub timestamp: LogTimestamp,
    /// Collection written to.
    pub namespace: Namespace,
    /// What was written.
    pub operation: Operation,
}

impl ChangeEntry {
    /// Creates an entry.
    pub fn new(timestamp: LogTimestamp, namespace: Namespace, operation: Operation) -> Self {
        Self {
            timestamp,
            namespace,
            operation,
        }
    }

    /// Converts to the stored map form.
    pub fn to_value(&self) -> Value {
        let mut pairs = vec![
            (
                "ts",
                Value::Array(vec![
                    Value::from(self.timestamp.seconds),
                    Value::from(self.timestamp.increment),
                ]),
            ),
            ("ns", Value::Text(self.namespace.to_string())),
            ("op", Value::from(self.operation.code())),
        ];
        match &self.operation {
            Operation::Insert { document } => pairs.push(("o", document.to_value())),
            Operation::Update { selector, update } => {
                pairs.push(("o", update.clone()));
                pairs.push(("o2", selector.to_value()));
            }
            Operation::Delete { selector } => pairs.push(("o", selector.to_value())),
        }
        Value::text_map(pairs)
    }

    /// Reads the stored map form.
    ///
    /// # Errors
    ///
    /// Returns `MalformedEntry` if a key is missing or has the wrong type.
    pub fn from_value(value: &Value) -> OplogResult<Self> {
        if !value.is_map() {
            return Err(OplogError::malformed("entry is not a map"));
        }
        let field = |name: &str| {
            value
                .get(name)
                .ok_or_else(|| OplogError::malformed(format!("missing {name}")))
        };

        let timestamp = match field("ts")?.as_array() {
            Some([Value::Integer(secs), Value::Integer(inc)]) => LogTimestamp::new(
                u32::try_from(*secs).map_err(|_| OplogError::malformed("ts seconds out of range"))?,
                u32::try_from(*inc).map_err(|_| OplogError::malformed("ts increment out of range"))?,
            ),
            _ => return Err(OplogError::malformed("ts must be [seconds, increment]")),
        };
        let namespace = field("ns")?
            .as_text()
            .ok_or_else(|| OplogError::malformed("ns must be text"))
            .and_then(Namespace::parse)?;
        let document = |name: &str| {
            Document::from_value(field(name)?)
                .map_err(|e| OplogError::malformed(format!("{name}: {e}")))
        };

        let operation = match field("op")?.as_text() {
            Some("i") => Operation::Insert {
                document: document("o")?,
            },
            Some("u") => Operation::Update {
                selector: match value.get("o2") {
                    Some(_) => document("o2")?,
                    None => Document::new(),
                },
                update: field("o")?.clone(),
            },
            Some("d") => Operation::Delete {
                selector: document("o")?,
            },
            other => {
                return Err(OplogError::malformed(format!(
                    "unknown op code {other:?}"
                )))
            }
        };

        Ok(Self {
            timestamp,
            namespace,
            operation,
        })
    }

    /// Encodes to canonical CBOR.
    ///
    /// # Errors
    ///
    /// Propagates codec failures.
    pub fn encode(&self) -> OplogResult<Vec<u8>> {
        Ok(to_canonical_cbor(&self.to_value())?)
    }

    /// Decodes from CBOR.
    ///
    /// # Errors
    ///
    /// Fails on invalid CBOR or a malformed entry.
    pub fn decode(bytes: &[u8]) -> OplogResult<Self> {
        Self::from_value(&from_cbor(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns() -> Namespace {
        Namespace::parse("gestion.documentos").unwrap()
    }

    #[test]
    fn update_round_trip_keeps_selector() {
        let id = RecordId::new();
        let update = Value::text_map([(
            "$set",
            Value::text_map([("titulo", Value::from("Y"))]),
        )]);
        let entry = ChangeEntry::new(LogTimestamp::new(10, 2), ns(), Operation::update(id, update));

        let decoded = ChangeEntry::decode(&entry.encode().unwrap()).unwrap();
        assert_eq!(decoded, entry);
        assert_eq!(decoded.operation.target_id(), Some(id));
        assert_eq!(decoded.operation.code(), "u");
    }

    #[test]
    fn update_without_selector_decodes_with_no_target() {
        let entry = ChangeEntry::new(
            LogTimestamp::new(3, 1),
            ns(),
            Operation::update(RecordId::new(), Value::text_map([("titulo", Value::from("Y"))])),
        );
        let mut raw = entry.to_value();
        raw.remove("o2");

        let decoded = ChangeEntry::from_value(&raw).unwrap();
        assert_eq!(decoded.operation.code(), "u");
        assert_eq!(decoded.operation.target_id(), None);
    }

    #[test]
    fn insert_without_id_still_decodes() {
        let doc = Document::from_pairs([("titulo", "X")]);
        let entry = ChangeEntry::new(LogTimestamp::new(1, 1), ns(), Operation::insert(doc));
        let decoded = ChangeEntry::decode(&entry.encode().unwrap()).unwrap();
        assert_eq!(decoded.operation.target_id(), None);
    }

    #[test]
    fn rejects_bad_shapes() {
        let base = |op: &str| {
            Value::text_map([
                ("ts", Value::Array(vec![Value::Integer(1), Value::Integer(1)])),
                ("ns", Value::from("a.b")),
                ("op", Value::from(op)),
                ("o", Value::empty_map()),
            ])
        };
        assert!(ChangeEntry::from_value(&base("d")).is_ok());
        assert!(ChangeEntry::from_value(&base("x")).is_err());
        assert!(ChangeEntry::from_value(&base("u")).is_err());

        let mut bad_ts = base("d");
        bad_ts.insert("ts", Value::Integer(5));
        assert!(ChangeEntry::from_value(&bad_ts).is_err());
        assert!(ChangeEntry::from_value(&Value::from("entry")).is_err());
    }
}
