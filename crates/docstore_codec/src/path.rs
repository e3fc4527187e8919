//! Dotted field paths into nested document maps.
//!
//! A path such as `meta.review.owner` names the `owner` key inside the
//! `review` map inside the `meta` map. Paths never index into arrays.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use std::fmt;

/// A validated, non-empty dotted path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath {
    raw: String,
}

impl FieldPath {
    /// Parses a dotted path, rejecting empty paths and empty segments.
    pub fn parse(raw: &str) -> CodecResult<Self> {
        if raw.is_empty() || raw.split('.').any(str::is_empty) {
            return Err(CodecError::invalid_path(raw));
        }
        Ok(Self {
            raw: raw.to_string(),
        })
    }

    /// Joins a prefix path and a child key.
    pub fn child(&self, key: &str) -> CodecResult<Self> {
        Self::parse(&format!("{}.{}", self.raw, key))
    }

    /// Returns the path text.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Iterates over the segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.raw.split('.')
    }

    /// Returns the first segment and the remaining path, if any.
    pub fn split_first(&self) -> (&str, Option<&str>) {
        match self.raw.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (&self.raw, None),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<&str> for FieldPath {
    type Error = CodecError;

    fn try_from(raw: &str) -> CodecResult<Self> {
        Self::parse(raw)
    }
}

impl Value {
    /// Resolves a path relative to this map value.
    pub fn get_path(&self, path: &FieldPath) -> Option<&Value> {
        path.segments()
            .try_fold(self, |current, segment| current.get(segment))
    }

    /// Sets the value at a path, creating intermediate maps as needed.
    ///
    /// Fails with [`CodecError::NotAMap`] if an existing intermediate value
    /// (or `self`) is not a map.
    pub fn set_path(&mut self, path: &FieldPath, value: Value) -> CodecResult<()> {
        let mut current = self;
        let mut segments = path.segments().peekable();
        while let Some(segment) = segments.next() {
            if !current.is_map() {
                return Err(CodecError::NotAMap {
                    path: path.to_string(),
                    segment: segment.to_string(),
                });
            }
            if segments.peek().is_none() {
                current.insert(segment, value);
                return Ok(());
            }
            if current.get(segment).is_none() {
                current.insert(segment, Value::empty_map());
            }
            current = match current.get_mut(segment) {
                Some(next) => next,
                None => return Err(CodecError::invalid_path(path.as_str())),
            };
        }
        Ok(())
    }

    /// Removes the value at a path.
    ///
    /// Missing keys and non-map intermediates are not errors: there is
    /// nothing to remove, so `None` is returned.
    pub fn remove_path(&mut self, path: &FieldPath) -> Option<Value> {
        match path.split_first() {
            (head, None) => self.remove(head),
            (head, Some(rest)) => {
                let rest = FieldPath::parse(rest).ok()?;
                self.get_mut(head)?.remove_path(&rest)
            }
        }
    }
}
