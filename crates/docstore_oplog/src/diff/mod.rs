//! Update payload decoding.
//!
//! An update entry carries either a full replacement document or a diff.
//! A payload is a diff when it has a `diff` key or uses the `$set`/`$unset`
//! operators of version 1 updates. A bare `$v` marker is an empty diff;
//! anything else replaces the record.
//!
//! ## Diff grammar
//!
//! The `diff` map is read key by key:
//!
//! | key | value | meaning |
//! |---|---|---|
//! | `u` | map | set each `path: value` |
//! | `i` | map | add each `path: value` |
//! | `d` | map | remove each key |
//! | `u.<path>` | any | set `<path>` |
//! | `i<path>` | any | add `<path>` |
//! | `d<path>` | any | remove `<path>` |
//! | `s<field>` | map | nested diff under `<field>` |
//!
//! Other keys, and prefixed keys with nothing after the prefix, are
//! ignored. Inside a nested diff every path is relative to
//! the enclosing field.

mod encode;

pub use encode::{encode_changes, encode_diff};

use crate::error::{OplogError, OplogResult};
use docstore_codec::{FieldPath, Value};
use docstore_core::{Document, FieldChanges};

const MAX_DEPTH: usize = 64;

/// One parsed diff instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffNode {
    /// The entries of a `u` group.
    SetGroup(Vec<(FieldPath, Value)>),
    /// Set a single path.
    Add(FieldPath, Value),
    /// Remove a single path.
    Remove(FieldPath),
    /// A sub-diff scoped to one field.
    Nested(String, Vec<DiffNode>),
}

/// The decoded meaning of an update payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedUpdate {
    /// Replace the whole record with this document.
    FullReplacement(Document),
    /// Apply these field changes. May be empty.
    FieldDiff(FieldChanges),
}

/// Turns update payloads into field changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffDecoder;

impl DiffDecoder {
    /// Decodes an update payload.
    ///
    /// # Errors
    ///
    /// Returns `MalformedEntry` if the payload or its diff is not a map,
    /// a nested diff or legacy operator is not a map, or a key is not a
    /// valid path. A `$v` marker without `diff` or operators decodes to an
    /// empty change set.
    pub fn decode(payload: &Value) -> OplogResult<DecodedUpdate> {
        if !payload.is_map() {
            return Err(OplogError::malformed(format!(
                "update payload is {}, expected map",
                payload.type_name()
            )));
        }

        if let Some(diff) = payload.get("diff") {
            let nodes = Self::parse(diff)?;
            return Ok(DecodedUpdate::FieldDiff(flatten(&nodes, None)?));
        }

        if payload.get("$set").is_some() || payload.get("$unset").is_some() {
            let nodes = parse_legacy(payload)?;
            return Ok(DecodedUpdate::FieldDiff(flatten(&nodes, None)?));
        }

        // `$v` with nothing to apply
        if payload.get("$v").is_some() {
            return Ok(DecodedUpdate::FieldDiff(FieldChanges::new()));
        }

        Document::from_value(payload)
            .map(DecodedUpdate::FullReplacement)
            .map_err(|e| OplogError::malformed(e.to_string()))
    }

    /// Parses a `diff` map into nodes.
    ///
    /// # Errors
    ///
    /// Same as [`decode`](Self::decode).
    pub fn parse(diff: &Value) -> OplogResult<Vec<DiffNode>> {
        parse_level(diff, 0)
    }
}

fn parse_level(diff: &Value, depth: usize) -> OplogResult<Vec<DiffNode>> {
    if depth > MAX_DEPTH {
        return Err(OplogError::malformed("diff nested too deeply"));
    }
    if !diff.is_map() {
        return Err(OplogError::malformed(format!(
            "diff is {}, expected map",
            diff.type_name()
        )));
    }

    let mut nodes = Vec::new();
    for (key, value) in diff.text_entries() {
        let node = match key {
            "u" if value.is_map() => DiffNode::SetGroup(
                group(key, value)?
                    .map(|(k, v)| -> OplogResult<(FieldPath, Value)> { Ok((path(k)?, v.clone())) })
                    .collect::<OplogResult<_>>()?,
            ),
            "i" if value.is_map() => {
                for (k, v) in group(key, value)? {
                    nodes.push(DiffNode::Add(path(k)?, v.clone()));
                }
                continue;
            }
            "d" if value.is_map() => {
                for (k, _) in group(key, value)? {
                    nodes.push(DiffNode::Remove(path(k)?));
                }
                continue;
            }
            _ => {
                if let Some(field) = field_after(key, "u.") {
                    DiffNode::Add(path(field)?, value.clone())
                } else if key.starts_with("u.") {
                    continue;
                } else if let Some(field) = field_after(key, "i") {
                    DiffNode::Add(path(field)?, value.clone())
                } else if let Some(field) = field_after(key, "d") {
                    DiffNode::Remove(path(field)?)
                } else if let Some(field) = field_after(key, "s") {
                    DiffNode::Nested(field.to_string(), parse_level(value, depth + 1)?)
                } else {
                    continue;
                }
            }
        };
        nodes.push(node);
    }
    Ok(nodes)
}

fn field_after<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix).filter(|rest| !rest.is_empty())
}

fn parse_legacy(payload: &Value) -> OplogResult<Vec<DiffNode>> {
    let mut nodes = Vec::new();
    if let Some(set) = payload.get("$set") {
        nodes.push(DiffNode::SetGroup(
            group("$set", set)?
                .map(|(k, v)| -> OplogResult<(FieldPath, Value)> { Ok((path(k)?, v.clone())) })
                .collect::<OplogResult<_>>()?,
        ));
    }
    if let Some(unset) = payload.get("$unset") {
        for (k, _) in group("$unset", unset)? {
            nodes.push(DiffNode::Remove(path(k)?));
        }
    }
    Ok(nodes)
}

fn group<'a>(key: &str, value: &'a Value) -> OplogResult<impl Iterator<Item = (&'a str, &'a Value)>> {
    if !value.is_map() {
        return Err(OplogError::malformed(format!(
            "diff group {key:?} is {}, expected map",
            value.type_name()
        )));
    }
    Ok(value.text_entries())
}

fn path(raw: &str) -> OplogResult<FieldPath> {
    FieldPath::parse(raw).map_err(|e| OplogError::malformed(e.to_string()))
}

fn scoped(prefix: Option<&FieldPath>, path: &FieldPath) -> OplogResult<FieldPath> {
    match prefix {
        Some(prefix) => prefix
            .child(path.as_str())
            .map_err(|e| OplogError::malformed(e.to_string())),
        None => Ok(path.clone()),
    }
}

/// Collapses nodes into one change set, prefixing nested paths.
fn flatten(nodes: &[DiffNode], prefix: Option<&FieldPath>) -> OplogResult<FieldChanges> {
    let mut changes = FieldChanges::new();
    for node in nodes {
        match node {
            DiffNode::SetGroup(entries) => {
                for (p, v) in entries {
                    changes.set(scoped(prefix, p)?, v.clone());
                }
            }
            DiffNode::Add(p, v) => changes.set(scoped(prefix, p)?, v.clone()),
            DiffNode::Remove(p) => changes.remove(scoped(prefix, p)?),
            DiffNode::Nested(field, children) => {
                let nested = scoped(prefix, &path(field)?)?;
                changes.extend(flatten(children, Some(&nested))?);
            }
        }
    }
    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    fn diff(entries: Vec<(&str, Value)>) -> Value {
        Value::text_map([("$v", Value::Integer(2)), ("diff", Value::text_map(entries))])
    }

    fn changes(payload: &Value) -> FieldChanges {
        match DiffDecoder::decode(payload).unwrap() {
            DecodedUpdate::FieldDiff(changes) => changes,
            other => panic!("expected diff, got {other:?}"),
        }
    }

    #[test]
    fn no_marker_is_full_replacement() {
        let payload = Value::text_map([("titulo", Value::from("Y"))]);
        assert_eq!(
            DiffDecoder::decode(&payload).unwrap(),
            DecodedUpdate::FullReplacement(Document::from_pairs([("titulo", "Y")]))
        );
    }

    #[test]
    fn update_group_and_single_keys() {
        let payload = diff(vec![
            ("u", Value::text_map([("titulo", Value::from("Y")), ("meta.n", Value::Integer(2))])),
            ("u.estado", Value::from("APROBADO")),
            ("iautor", Value::from("Ana")),
            ("dviejo", Value::Bool(false)),
        ]);

        let expected = FieldChanges::new()
            .with_set(p("titulo"), "Y")
            .with_set(p("meta.n"), 2i64)
            .with_set(p("estado"), "APROBADO")
            .with_set(p("autor"), "Ana")
            .with_remove(p("viejo"));
        assert_eq!(changes(&payload), expected);
    }

    #[test]
    fn insert_and_delete_groups() {
        let payload = diff(vec![
            ("i", Value::text_map([("nuevo", Value::Integer(1))])),
            ("d", Value::text_map([("a", Value::Bool(false)), ("b", Value::Bool(false))])),
        ]);
        let expected = FieldChanges::new()
            .with_set(p("nuevo"), 1i64)
            .with_remove(p("a"))
            .with_remove(p("b"));
        assert_eq!(changes(&payload), expected);
    }

    #[test]
    fn nested_diffs_are_prefixed() {
        let payload = diff(vec![(
            "smeta",
            Value::text_map([
                ("u", Value::text_map([("owner", Value::from("bo"))])),
                ("sreview", Value::text_map([("dnote", Value::Bool(false))])),
            ]),
        )]);
        let expected = FieldChanges::new()
            .with_set(p("meta.owner"), "bo")
            .with_remove(p("meta.review.note"));
        assert_eq!(changes(&payload), expected);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let payload = diff(vec![("a", Value::Bool(true)), ("xyz", Value::Integer(1))]);
        assert!(changes(&payload).is_empty());
        assert!(changes(&diff(vec![])).is_empty());
    }

    #[test]
    fn legacy_operators() {
        let payload = Value::text_map([
            ("$set", Value::text_map([("titulo", Value::from("Z"))])),
            ("$unset", Value::text_map([("tmp", Value::from(""))])),
        ]);
        let expected = FieldChanges::new()
            .with_set(p("titulo"), "Z")
            .with_remove(p("tmp"));
        assert_eq!(changes(&payload), expected);
    }

    #[test]
    fn version_one_payloads_use_operators() {
        let payload = Value::text_map([
            ("$v", Value::Integer(1)),
            ("$set", Value::text_map([("titulo", Value::from("Y"))])),
            ("$unset", Value::text_map([("tmp", Value::Bool(true))])),
        ]);
        let expected = FieldChanges::new()
            .with_set(p("titulo"), "Y")
            .with_remove(p("tmp"));
        assert_eq!(changes(&payload), expected);
    }

    #[test]
    fn version_marker_alone_is_empty() {
        assert!(changes(&Value::text_map([("$v", Value::Integer(2))])).is_empty());
        assert!(changes(&Value::text_map([("$v", Value::Integer(1))])).is_empty());
    }

    #[test]
    fn keys_without_field_are_ignored() {
        let payload = diff(vec![
            ("u.", Value::from("x")),
            ("i", Value::Integer(1)),
            ("d", Value::Bool(false)),
            ("u", Value::from("no map")),
            ("s", Value::Integer(3)),
            ("inuevo", Value::Integer(7)),
        ]);
        assert_eq!(changes(&payload), FieldChanges::new().with_set(p("nuevo"), 7i64));
    }

    #[test]
    fn malformed_payloads() {
        assert!(DiffDecoder::decode(&Value::from("x")).is_err());
        assert!(DiffDecoder::decode(&diff(vec![("smeta", Value::Integer(1))])).is_err());
        assert!(DiffDecoder::decode(&diff(vec![("d", Value::text_map([("a..b", Value::Null)]))])).is_err());
    }

    #[test]
    fn parse_keeps_structure() {
        let raw = Value::text_map([("sa", Value::text_map([("ib", Value::Integer(1))]))]);
        assert_eq!(
            DiffDecoder::parse(&raw).unwrap(),
            vec![DiffNode::Nested("a".into(), vec![DiffNode::Add(p("b"), Value::Integer(1))])]
        );
    }
}
