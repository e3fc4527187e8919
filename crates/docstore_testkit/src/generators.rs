//! Property-based test generators using proptest.
//!
//! Strategies produce values that respect the data model: text map keys
//! without dots or `$`, no reserved record keys at the top level of user
//! documents, and nesting bounded in depth.

use docstore_codec::{FieldPath, Value};
use docstore_core::{Document, FieldChanges, RecordId};
use proptest::prelude::*;

/// Strategy for record ids.
pub fn record_id_strategy() -> impl Strategy<Value = RecordId> {
    prop::array::uniform16(any::<u8>()).prop_map(RecordId::from_bytes)
}

/// Strategy for field names: short lowercase words.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9]{0,7}").expect("Invalid regex")
}

/// Strategy for scalar values.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        "[a-zA-Z ]{0,12}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
    ]
}

/// Strategy for values nested up to three levels.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(field_name_strategy(), inner, 0..4)
                .prop_map(|entries| Value::text_map(entries)),
        ]
    })
}

/// Strategy for user documents; reserved keys never appear.
pub fn document_strategy() -> impl Strategy<Value = Document> {
    prop::collection::btree_map(field_name_strategy(), value_strategy(), 0..6).prop_map(|fields| {
        fields
            .into_iter()
            .filter(|(name, _)| !docstore_core::record::is_reserved(name))
            .collect()
    })
}

/// Strategy for one- or two-segment field paths.
pub fn field_path_strategy() -> impl Strategy<Value = FieldPath> {
    prop::collection::vec(field_name_strategy(), 1..3)
        .prop_filter("reserved top-level key", |segments| {
            !docstore_core::record::is_reserved(&segments[0])
        })
        .prop_map(|segments| FieldPath::parse(&segments.join(".")).expect("generated path is valid"))
}

/// Strategy for change sets whose sets and removals do not overlap.
pub fn field_changes_strategy() -> impl Strategy<Value = FieldChanges> {
    (
        prop::collection::btree_map(field_path_strategy(), scalar_strategy(), 0..4),
        prop::collection::btree_set(field_path_strategy(), 0..3),
    )
        .prop_map(|(sets, removals)| {
            let mut changes = FieldChanges::new();
            for path in removals {
                let conflicts = sets
                    .keys()
                    .any(|set| set.as_str().starts_with(path.as_str()) || path.as_str().starts_with(set.as_str()));
                if !conflicts {
                    changes.remove(path);
                }
            }
            for (path, value) in sets {
                changes.set(path, value);
            }
            changes
        })
}
