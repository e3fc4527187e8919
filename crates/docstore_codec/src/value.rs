//! Dynamic document value type.

use std::cmp::Ordering;

/// A dynamic field value inside a stored document.
///
/// Values mirror the subset of CBOR that docstore persists. Floats are
/// deliberately absent so that encodings stay canonical and comparable;
/// timestamps and counters are carried as integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Byte string (record identifiers, opaque blobs).
    Bytes(Vec<u8>),
    /// UTF-8 text.
    Text(String),
    /// Ordered array of values.
    Array(Vec<Value>),
    /// Map of key-value pairs, kept in canonical key order.
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Create a map value with keys in canonical order.
    pub fn map(mut pairs: Vec<(Value, Value)>) -> Self {
        pairs.sort_by(|a, b| a.0.cmp_canonical(&b.0));
        Value::Map(pairs)
    }

    /// Create a map value from text keys.
    pub fn text_map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::map(
            entries
                .into_iter()
                .map(|(k, v)| (Value::Text(k.into()), v))
                .collect(),
        )
    }

    /// Create an empty map value.
    pub fn empty_map() -> Self {
        Value::Map(Vec::new())
    }

    /// Canonical ordering of two values.
    ///
    /// Orders first by CBOR major type, then length-first within strings,
    /// byte strings and containers, which matches the bytewise order of
    /// their canonical encodings.
    pub fn cmp_canonical(&self, other: &Self) -> Ordering {
        let by_type = self.major_type().cmp(&other.major_type());
        if by_type != Ordering::Equal {
            return by_type;
        }

        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Null, Value::Bool(_)) => Ordering::Greater,
            (Value::Bool(_), Value::Null) => Ordering::Less,
            (Value::Integer(a), Value::Integer(b)) => {
                // Same sign here; negative integers encode their argument as -1 - n.
                let (arg_a, arg_b) = if *a >= 0 {
                    (a.unsigned_abs(), b.unsigned_abs())
                } else {
                    ((-1 - *a).unsigned_abs(), (-1 - *b).unsigned_abs())
                };
                encoded_uint_len(arg_a)
                    .cmp(&encoded_uint_len(arg_b))
                    .then(arg_a.cmp(&arg_b))
            }
            (Value::Bytes(a), Value::Bytes(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Value::Array(a), Value::Array(b)) => a.len().cmp(&b.len()).then_with(|| {
                a.iter()
                    .zip(b)
                    .map(|(x, y)| x.cmp_canonical(y))
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            }),
            (Value::Map(a), Value::Map(b)) => a.len().cmp(&b.len()).then_with(|| {
                a.iter()
                    .zip(b)
                    .map(|((ka, va), (kb, vb))| ka.cmp_canonical(kb).then_with(|| va.cmp_canonical(vb)))
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            }),
            _ => Ordering::Equal,
        }
    }

    fn major_type(&self) -> u8 {
        match self {
            Value::Integer(n) if *n >= 0 => 0,
            Value::Integer(_) => 1,
            Value::Bytes(_) => 2,
            Value::Text(_) => 3,
            Value::Array(_) => 4,
            Value::Map(_) => 5,
            Value::Bool(_) | Value::Null => 7,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a map.
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as bytes, if it is a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get this value as a string, if it is a text string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as an array, if it is one.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get this value as a map, if it is one.
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Iterate over the text-keyed entries of a map value.
    ///
    /// Entries with non-text keys are not part of the document model and
    /// are skipped. Yields nothing for non-map values.
    pub fn text_entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.as_map()
            .unwrap_or(&[])
            .iter()
            .filter_map(|(k, v)| k.as_text().map(|key| (key, v)))
    }

    /// Look up a text key in this map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.text_entries().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Mutable lookup of a text key in this map value.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        match self {
            Value::Map(pairs) => pairs
                .iter_mut()
                .find(|(k, _)| k.as_text() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Insert or overwrite a text key, keeping canonical order.
    ///
    /// Returns the previous value. Does nothing and returns `None` when
    /// `self` is not a map.
    pub fn insert(&mut self, key: &str, value: Value) -> Option<Value> {
        let Value::Map(pairs) = self else {
            return None;
        };
        let key_value = Value::Text(key.to_string());
        match pairs.binary_search_by(|(k, _)| k.cmp_canonical(&key_value)) {
            Ok(idx) => Some(std::mem::replace(&mut pairs[idx].1, value)),
            Err(idx) => {
                pairs.insert(idx, (key_value, value));
                None
            }
        }
    }

    /// Remove a text key from this map value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let Value::Map(pairs) = self else {
            return None;
        };
        let idx = pairs.iter().position(|(k, _)| k.as_text() == Some(key))?;
        Some(pairs.remove(idx).1)
    }
}

fn encoded_uint_len(n: u64) -> u8 {
    match n {
        0..=23 => 1,
        24..=0xFF => 2,
        0x100..=0xFFFF => 3,
        0x1_0000..=0xFFFF_FFFF => 5,
        _ => 9,
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}
