//! Canonical CBOR encoding through `ciborium`.
//!
//! Values are converted to `ciborium::value::Value` with map keys in
//! canonical order, so identical documents always produce identical bytes.
//! Decoding accepts any map order and normalizes it.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use ciborium::value::{Integer, Value as Cbor};

/// Encode a value to canonical CBOR bytes.
///
/// # Errors
///
/// Returns an error if the underlying writer fails.
pub fn to_canonical_cbor(value: &Value) -> CodecResult<Vec<u8>> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(&to_cbor(value), &mut out)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(out)
}

/// Decode a single CBOR item into a value.
///
/// # Errors
///
/// Fails on malformed input, floats, tags, and trailing bytes.
pub fn from_cbor(bytes: &[u8]) -> CodecResult<Value> {
    let mut reader = bytes;
    let raw: Cbor = ciborium::de::from_reader(&mut reader)
        .map_err(|e| CodecError::decoding_failed(e.to_string()))?;
    if !reader.is_empty() {
        return Err(CodecError::TrailingBytes {
            count: reader.len(),
        });
    }
    from_cbor_value(raw)
}

fn to_cbor(value: &Value) -> Cbor {
    match value {
        Value::Null => Cbor::Null,
        Value::Bool(b) => Cbor::Bool(*b),
        Value::Integer(n) => Cbor::Integer(Integer::from(*n)),
        Value::Bytes(b) => Cbor::Bytes(b.clone()),
        Value::Text(s) => Cbor::Text(s.clone()),
        Value::Array(items) => Cbor::Array(items.iter().map(to_cbor).collect()),
        Value::Map(pairs) => {
            let mut sorted: Vec<&(Value, Value)> = pairs.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp_canonical(&b.0));
            Cbor::Map(
                sorted
                    .into_iter()
                    .map(|(k, v)| (to_cbor(k), to_cbor(v)))
                    .collect(),
            )
        }
    }
}

fn from_cbor_value(raw: Cbor) -> CodecResult<Value> {
    match raw {
        Cbor::Null => Ok(Value::Null),
        Cbor::Bool(b) => Ok(Value::Bool(b)),
        Cbor::Integer(n) => i64::try_from(n)
            .map(Value::Integer)
            .map_err(|_| CodecError::decoding_failed("integer out of i64 range")),
        Cbor::Bytes(b) => Ok(Value::Bytes(b)),
        Cbor::Text(s) => Ok(Value::Text(s)),
        Cbor::Array(items) => items
            .into_iter()
            .map(from_cbor_value)
            .collect::<CodecResult<Vec<_>>>()
            .map(Value::Array),
        Cbor::Map(pairs) => pairs
            .into_iter()
            .map(|(k, v)| Ok((from_cbor_value(k)?, from_cbor_value(v)?)))
            .collect::<CodecResult<Vec<_>>>()
            .map(Value::map),
        Cbor::Float(_) => Err(CodecError::FloatForbidden),
        other => Err(CodecError::unsupported_type(format!("{other:?}"))),
    }
}
