//! Column addresses and flattened relationship edges.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::DEFAULT_RELATIONSHIP_TYPE;

/// Fully qualified address of a column: `database.table.column`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Database name.
    pub database: String,
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
}

impl ColumnRef {
    /// Build a column address.
    pub fn new(
        database: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            column: column.into(),
        }
    }

    /// Parse `database.table.column`.
    ///
    /// Returns `None` unless there are exactly three non-empty parts.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.trim().split('.');
        let database = parts.next()?.trim();
        let table = parts.next()?.trim();
        let column = parts.next()?.trim();
        if parts.next().is_some() || database.is_empty() || table.is_empty() || column.is_empty()
        {
            return None;
        }
        Some(Self::new(database, table, column))
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.table, self.column)
    }
}

/// One reference, flattened with its source column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    /// Database of the referencing column.
    pub source_database: String,
    /// Table of the referencing column.
    pub source_table: String,
    /// Referencing column.
    pub source_column: String,
    /// Database of the referenced column.
    pub target_database: String,
    /// Table of the referenced column.
    pub target_table: String,
    /// Referenced column.
    pub target_column: String,
    /// Relationship label.
    pub relationship_type: String,
}

impl RelationshipEdge {
    /// Build an edge between two columns.
    #[must_use]
    pub fn new(source: &ColumnRef, target: &ColumnRef, relationship_type: Option<&str>) -> Self {
        Self {
            source_database: source.database.clone(),
            source_table: source.table.clone(),
            source_column: source.column.clone(),
            target_database: target.database.clone(),
            target_table: target.table.clone(),
            target_column: target.column.clone(),
            relationship_type: relationship_type
                .unwrap_or(DEFAULT_RELATIONSHIP_TYPE)
                .to_string(),
        }
    }

    /// The referencing column.
    #[must_use]
    pub fn source(&self) -> ColumnRef {
        ColumnRef::new(&self.source_database, &self.source_table, &self.source_column)
    }

    /// The referenced column.
    #[must_use]
    pub fn target(&self) -> ColumnRef {
        ColumnRef::new(&self.target_database, &self.target_table, &self.target_column)
    }

    /// Check that all six identifying fields are present.
    ///
    /// # Errors
    ///
    /// Returns the names of the blank fields.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("source_database", &self.source_database),
            ("source_table", &self.source_table),
            ("source_column", &self.source_column),
            ("target_database", &self.target_database),
            ("target_table", &self.target_table),
            ("target_column", &self.target_column),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!(
                "relationship is missing required fields: {}",
                missing.join(", ")
            ))
        }
    }
}

impl fmt::Display for RelationshipEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({})",
            self.source(),
            self.target(),
            self.relationship_type
        )
    }
}
