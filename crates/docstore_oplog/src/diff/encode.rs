//! Diff payload encoding.

use docstore_codec::Value;
use docstore_core::{Document, FieldChanges};
use std::collections::BTreeMap;

const DIFF_VERSION: i64 = 2;

/// Encodes the difference between two documents as a diff payload.
///
/// Decoding the result and applying it to `before` yields `after`. Fields
/// that are maps on both sides are diffed recursively under `s<field>`.
pub fn encode_diff(before: &Document, after: &Document) -> Value {
    let diff = diff_level(before.iter().collect(), after.iter().collect());
    wrap(diff.unwrap_or_else(Value::empty_map))
}

/// Encodes a change set as a diff payload.
///
/// Assignments go in the `u` group and removals in the `d` group, keyed
/// by dotted path.
pub fn encode_changes(changes: &FieldChanges) -> Value {
    let mut diff = Vec::new();
    let sets: Vec<_> = changes
        .sets()
        .map(|(path, value)| (path.to_string(), value.clone()))
        .collect();
    if !sets.is_empty() {
        diff.push(("u".to_string(), Value::text_map(sets)));
    }
    let removals: Vec<_> = changes
        .removals()
        .map(|path| (path.to_string(), Value::Bool(false)))
        .collect();
    if !removals.is_empty() {
        diff.push(("d".to_string(), Value::text_map(removals)));
    }
    wrap(Value::text_map(diff))
}

fn wrap(diff: Value) -> Value {
    Value::text_map([("$v", Value::Integer(DIFF_VERSION)), ("diff", diff)])
}

fn diff_level(before: BTreeMap<&str, &Value>, after: BTreeMap<&str, &Value>) -> Option<Value> {
    let mut updated = Vec::new();
    let mut inserted = Vec::new();
    let mut nested = Vec::new();

    for (&key, &new) in &after {
        match before.get(key) {
            None => inserted.push((key, new.clone())),
            Some(&old) if old == new => {}
            Some(&old) if old.is_map() && new.is_map() => {
                if let Some(sub) = diff_level(old.text_entries().collect(), new.text_entries().collect()) {
                    nested.push((format!("s{key}"), sub));
                }
            }
            Some(_) => updated.push((key, new.clone())),
        }
    }
    let deleted: Vec<_> = before
        .keys()
        .filter(|key| !after.contains_key(*key))
        .map(|&key| (key, Value::Bool(false)))
        .collect();

    let mut diff = Vec::new();
    for (group, entries) in [("u", updated), ("i", inserted), ("d", deleted)] {
        if !entries.is_empty() {
            diff.push((group.to_string(), Value::text_map(entries)));
        }
    }
    diff.extend(nested);

    if diff.is_empty() {
        None
    } else {
        Some(Value::text_map(diff))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{DecodedUpdate, DiffDecoder};
    use docstore_codec::FieldPath;

    fn apply(before: &Document, payload: &Value) -> Document {
        let DecodedUpdate::FieldDiff(changes) = DiffDecoder::decode(payload).unwrap() else {
            panic!("encoded diff decoded as replacement");
        };
        let mut doc = before.clone();
        changes.apply_to(&mut doc).unwrap();
        doc
    }

    #[test]
    fn flat_changes() {
        let before = Document::from_pairs([("titulo", "X"), ("viejo", "v"), ("igual", "=")]);
        let after = Document::from_pairs([("titulo", "Y"), ("nuevo", "n"), ("igual", "=")]);

        let payload = encode_diff(&before, &after);
        let diff = payload.get("diff").unwrap();
        assert_eq!(diff.get("u"), Some(&Value::text_map([("titulo", Value::from("Y"))])));
        assert_eq!(diff.get("i"), Some(&Value::text_map([("nuevo", Value::from("n"))])));
        assert_eq!(diff.get("d"), Some(&Value::text_map([("viejo", Value::Bool(false))])));
        assert_eq!(apply(&before, &payload), after);
    }

    #[test]
    fn nested_maps_use_sub_diffs() {
        let meta = |owner: &str| Value::text_map([("owner", Value::from(owner)), ("n", Value::Integer(1))]);
        let before = Document::from_pairs([("meta", meta("ana"))]);
        let after = Document::from_pairs([("meta", meta("bo"))]);

        let payload = encode_diff(&before, &after);
        assert!(payload.get("diff").unwrap().get("smeta").is_some());
        assert_eq!(apply(&before, &payload), after);
    }

    #[test]
    fn identical_documents_give_empty_diff() {
        let doc = Document::from_pairs([("a", 1i64)]);
        let payload = encode_diff(&doc, &doc);
        assert_eq!(payload.get("diff"), Some(&Value::empty_map()));
        assert_eq!(apply(&doc, &payload), doc);
    }

    #[test]
    fn changes_round_trip() {
        let changes = FieldChanges::new()
            .with_set(FieldPath::parse("meta.owner").unwrap(), "bo")
            .with_remove(FieldPath::parse("tmp").unwrap());
        let DecodedUpdate::FieldDiff(decoded) = DiffDecoder::decode(&encode_changes(&changes)).unwrap() else {
            panic!("expected diff");
        };
        assert_eq!(decoded, changes);
    }
}
