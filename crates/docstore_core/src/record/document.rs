//! Named fields of a record.

use crate::error::{CoreError, CoreResult};
use docstore_codec::{CodecError, FieldPath, Value};
use std::collections::BTreeMap;

/// An ordered map of top-level field names to values.
///
/// Nested maps are reached through dotted [`FieldPath`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document(BTreeMap<String, Value>);

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a document from `(name, value)` pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Reads a document out of a map value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDocument` if the value is not a map or has a
    /// non-text key.
    pub fn from_value(value: &Value) -> CoreResult<Self> {
        let pairs = value.as_map().ok_or_else(|| {
            CoreError::invalid_document(format!("expected map, found {}", value.type_name()))
        })?;
        let mut fields = BTreeMap::new();
        for (key, field) in pairs {
            let name = key.as_text().ok_or_else(|| {
                CoreError::invalid_document(format!("non-text key of type {}", key.type_name()))
            })?;
            fields.insert(name.to_string(), field.clone());
        }
        Ok(Self(fields))
    }

    /// Converts to a canonical map value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::text_map(self.0.iter().map(|(k, v)| (k.clone(), v.clone())))
    }

    /// Looks up a top-level field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Sets a top-level field, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Removes a top-level field.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// Resolves a dotted path.
    #[must_use]
    pub fn get_path(&self, path: &FieldPath) -> Option<&Value> {
        match path.split_first() {
            (head, None) => self.0.get(head),
            (head, Some(rest)) => {
                let rest = FieldPath::parse(rest).ok()?;
                self.0.get(head)?.get_path(&rest)
            }
        }
    }

    /// Sets the value at a dotted path, creating intermediate maps.
    ///
    /// # Errors
    ///
    /// Fails if the path runs through an existing non-map value.
    pub fn set_path(&mut self, path: &FieldPath, value: Value) -> CoreResult<()> {
        let (head, rest) = path.split_first();
        let Some(rest) = rest else {
            self.0.insert(head.to_string(), value);
            return Ok(());
        };
        let rest = FieldPath::parse(rest)?;
        let slot = self
            .0
            .entry(head.to_string())
            .or_insert_with(Value::empty_map);
        if !slot.is_map() {
            return Err(CodecError::NotAMap {
                path: path.to_string(),
                segment: head.to_string(),
            }
            .into());
        }
        slot.set_path(&rest, value)?;
        Ok(())
    }

    /// Removes the value at a dotted path. Missing paths are ignored.
    pub fn remove_path(&mut self, path: &FieldPath) -> Option<Value> {
        match path.split_first() {
            (head, None) => self.0.remove(head),
            (head, Some(rest)) => {
                let rest = FieldPath::parse(rest).ok()?;
                self.0.get_mut(head)?.remove_path(&rest)
            }
        }
    }

    /// Returns true if a top-level field is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of top-level fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over top-level fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.to_value()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
