//! Collection namespaces.

use crate::error::{OplogError, OplogResult};
use std::fmt;
use std::str::FromStr;

/// A `"<database>.<collection>"` collection identifier.
///
/// The split is at the first dot, so collection names may contain dots.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Namespace {
    database: String,
    collection: String,
}

impl Namespace {
    /// Creates a namespace from its two halves.
    ///
    /// # Errors
    ///
    /// Fails if either half is empty or the database name contains a dot.
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> OplogResult<Self> {
        let database = database.into();
        let collection = collection.into();
        if database.is_empty() || collection.is_empty() || database.contains('.') {
            return Err(OplogError::InvalidNamespace {
                name: format!("{database}.{collection}"),
            });
        }
        Ok(Self {
            database,
            collection,
        })
    }

    /// Parses `"<database>.<collection>"`.
    ///
    /// # Errors
    ///
    /// Fails if there is no dot or either side is empty.
    pub fn parse(text: &str) -> OplogResult<Self> {
        let (database, collection) =
            text.split_once('.')
                .ok_or_else(|| OplogError::InvalidNamespace {
                    name: text.to_string(),
                })?;
        Self::new(database, collection)
    }

    /// The database half.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// The collection half.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

impl FromStr for Namespace {
    type Err = OplogError;

    fn from_str(s: &str) -> OplogResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&docstore_core::Config> for Namespace {
    type Error = OplogError;

    fn try_from(config: &docstore_core::Config) -> OplogResult<Self> {
        Self::new(config.database.clone(), config.collection.clone())
    }
}
