//! Field-level change sets.

use crate::error::CoreResult;
use crate::record::Document;
use docstore_codec::{FieldPath, Value};
use std::collections::{BTreeMap, BTreeSet};

/// A set of field assignments and removals applied as one write.
///
/// Sets are applied before removals. A path present in both ends up
/// removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldChanges {
    set: BTreeMap<FieldPath, Value>,
    remove: BTreeSet<FieldPath>,
}

impl FieldChanges {
    /// Creates an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an assignment.
    #[must_use]
    pub fn with_set(mut self, path: FieldPath, value: impl Into<Value>) -> Self {
        self.set(path, value);
        self
    }

    /// Adds a removal.
    #[must_use]
    pub fn with_remove(mut self, path: FieldPath) -> Self {
        self.remove(path);
        self
    }

    /// Records an assignment, replacing any earlier one for the same path.
    pub fn set(&mut self, path: FieldPath, value: impl Into<Value>) {
        self.set.insert(path, value.into());
    }

    /// Records a removal.
    pub fn remove(&mut self, path: FieldPath) {
        self.remove.insert(path);
    }

    /// Assignments in path order.
    pub fn sets(&self) -> impl Iterator<Item = (&FieldPath, &Value)> {
        self.set.iter()
    }

    /// Removals in path order.
    pub fn removals(&self) -> impl Iterator<Item = &FieldPath> {
        self.remove.iter()
    }

    /// Returns true if there is nothing to apply.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }

    /// Returns true if any assignment or removal targets the top-level
    /// field `name` or something nested under it.
    #[must_use]
    pub fn touches(&self, name: &str) -> bool {
        self.set
            .keys()
            .chain(self.remove.iter())
            .any(|path| path.split_first().0 == name)
    }

    /// Merges `other` into `self`; `other` wins on overlapping sets.
    pub fn extend(&mut self, other: FieldChanges) {
        self.set.extend(other.set);
        self.remove.extend(other.remove);
    }

    /// Applies the changes to a document.
    ///
    /// # Errors
    ///
    /// Fails if an assignment runs through a non-map value. The document
    /// may then hold the assignments made before the failing one.
    pub fn apply_to(&self, doc: &mut Document) -> CoreResult<()> {
        for (path, value) in &self.set {
            doc.set_path(path, value.clone())?;
        }
        for path in &self.remove {
            doc.remove_path(path);
        }
        Ok(())
    }
}
