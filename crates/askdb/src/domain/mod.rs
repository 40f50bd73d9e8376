//! Domain types for schema context.
//!
//! A [`Schema`] maps database name → table name → ordered columns. Both map
//! levels keep insertion order so that serialization, the compact text
//! notation and the fallback sampler all see tables in the same order every
//! time.

mod column;
mod edge;

pub use column::{Column, KeyKind, Reference, DEFAULT_RELATIONSHIP_TYPE};
pub use edge::{ColumnRef, RelationshipEdge};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Databases that are never part of an "all databases" enumeration.
pub const SYSTEM_DATABASES: [&str; 4] =
    ["information_schema", "mysql", "performance_schema", "sys"];

/// Returns `true` if `name` is one of the server's own bookkeeping databases.
pub fn is_system_database(name: &str) -> bool {
    SYSTEM_DATABASES.contains(&name)
}

/// Tables of one database, in insertion order.
pub type DatabaseSchema = IndexMap<String, Vec<Column>>;

/// Schema snapshot across any number of databases.
///
/// Serializes transparently as the JSON object stored in the cache file:
///
/// ```json
/// { "shop": { "orders": [ { "Field": "id", "Key": "PRI" } ] } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema(IndexMap<String, DatabaseSchema>);

impl Schema {
    /// Create an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the schema holds no databases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of databases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Total number of tables across all databases.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.0.values().map(IndexMap::len).sum()
    }

    /// Database names in schema order.
    pub fn database_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate over `(database, tables)` pairs in schema order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, DatabaseSchema> {
        self.0.iter()
    }

    /// Mutable iteration over `(database, tables)` pairs.
    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, String, DatabaseSchema> {
        self.0.iter_mut()
    }

    /// Returns `true` if the schema has an entry for `database`.
    #[must_use]
    pub fn contains_database(&self, database: &str) -> bool {
        self.0.contains_key(database)
    }

    /// Tables of one database.
    #[must_use]
    pub fn database(&self, database: &str) -> Option<&DatabaseSchema> {
        self.0.get(database)
    }

    /// Mutable access to the tables of one database.
    pub fn database_mut(&mut self, database: &str) -> Option<&mut DatabaseSchema> {
        self.0.get_mut(database)
    }

    /// Insert or replace a whole database entry, returning the previous one.
    ///
    /// A replaced entry keeps its original position.
    pub fn insert_database(
        &mut self,
        database: impl Into<String>,
        tables: DatabaseSchema,
    ) -> Option<DatabaseSchema> {
        self.0.insert(database.into(), tables)
    }

    /// Remove a database entry, preserving the order of the others.
    pub fn remove_database(&mut self, database: &str) -> Option<DatabaseSchema> {
        self.0.shift_remove(database)
    }

    /// Columns of one table.
    #[must_use]
    pub fn table(&self, database: &str, table: &str) -> Option<&[Column]> {
        self.0
            .get(database)
            .and_then(|tables| tables.get(table))
            .map(Vec::as_slice)
    }

    /// Mutable access to the columns of one table.
    pub fn table_mut(&mut self, database: &str, table: &str) -> Option<&mut Vec<Column>> {
        self.0
            .get_mut(database)
            .and_then(|tables| tables.get_mut(table))
    }

    /// Columns of one table, creating empty database/table entries as needed.
    pub fn ensure_table(&mut self, database: &str, table: &str) -> &mut Vec<Column> {
        self.0
            .entry(database.to_string())
            .or_default()
            .entry(table.to_string())
            .or_default()
    }

    /// Look up a single column.
    #[must_use]
    pub fn column(&self, database: &str, table: &str, column: &str) -> Option<&Column> {
        self.table(database, table)
            .and_then(|columns| columns.iter().find(|c| c.name == column))
    }

    /// Consume the schema, returning the underlying ordered map.
    #[must_use]
    pub fn into_inner(self) -> IndexMap<String, DatabaseSchema> {
        self.0
    }
}

impl From<IndexMap<String, DatabaseSchema>> for Schema {
    fn from(map: IndexMap<String, DatabaseSchema>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, DatabaseSchema)> for Schema {
    fn from_iter<I: IntoIterator<Item = (String, DatabaseSchema)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = (&'a String, &'a DatabaseSchema);
    type IntoIter = indexmap::map::Iter<'a, String, DatabaseSchema>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Schema {
    type Item = (String, DatabaseSchema);
    type IntoIter = indexmap::map::IntoIter<String, DatabaseSchema>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
