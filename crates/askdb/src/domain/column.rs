//! Column metadata and the references layered on top of it.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::ColumnRef;

/// Relationship type assigned to a reference when none is given.
pub const DEFAULT_RELATIONSHIP_TYPE: &str = "MANY_TO_ONE";

/// Key classification of a column.
///
/// Serialized with the raw driver vocabulary: `PRI`, `MUL`, the empty string,
/// or any other driver value verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Not part of any index (`""`).
    None,
    /// Primary key (`PRI`).
    Primary,
    /// Foreign / non-unique index key (`MUL`).
    Foreign,
    /// Any other driver classification, e.g. `UNI`.
    Other(String),
}

impl KeyKind {
    /// Classify a raw driver value.
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "" => Self::None,
            "PRI" => Self::Primary,
            "MUL" => Self::Foreign,
            other => Self::Other(other.to_string()),
        }
    }

    /// The raw driver value for this classification.
    #[must_use]
    pub fn as_raw(&self) -> &str {
        match self {
            Self::None => "",
            Self::Primary => "PRI",
            Self::Foreign => "MUL",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_raw())
    }
}

impl Serialize for KeyKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_raw())
    }
}

impl<'de> Deserialize<'de> for KeyKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_raw(&raw))
    }
}

/// A relationship edge from a column to a target column.
///
/// Identified by its target triple; the relationship type is payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    /// Database holding the target table.
    pub target_database: String,
    /// Target table.
    pub target_table: String,
    /// Target column.
    pub target_column: String,
    /// Free-form relationship label, `MANY_TO_ONE` unless stated.
    #[serde(default = "default_relationship_type")]
    pub relationship_type: String,
}

fn default_relationship_type() -> String {
    DEFAULT_RELATIONSHIP_TYPE.to_string()
}

impl Reference {
    /// Reference to `target` with the default relationship type.
    #[must_use]
    pub fn new(target: &ColumnRef) -> Self {
        Self {
            target_database: target.database.clone(),
            target_table: target.table.clone(),
            target_column: target.column.clone(),
            relationship_type: default_relationship_type(),
        }
    }

    /// Set the relationship type.
    #[must_use]
    pub fn with_type(mut self, relationship_type: impl Into<String>) -> Self {
        self.relationship_type = relationship_type.into();
        self
    }

    /// The column this reference points at.
    #[must_use]
    pub fn target(&self) -> ColumnRef {
        ColumnRef::new(&self.target_database, &self.target_table, &self.target_column)
    }

    /// Returns `true` if this reference points at `target`.
    #[must_use]
    pub fn points_to(&self, target: &ColumnRef) -> bool {
        self.target_database == target.database
            && self.target_table == target.table
            && self.target_column == target.column
    }
}

/// Metadata for one column of a table.
///
/// Field names follow the cache file vocabulary (`Field`, `Type`, `Key`,
/// `References`). Any other attribute reported by the driver (`Null`,
/// `Default`, `Extra`) or given as a generic `key=value` in the compact
/// notation is kept in [`Column::extra`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unique within its table.
    #[serde(rename = "Field")]
    pub name: String,

    /// Declared SQL type, verbatim.
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,

    /// Key classification.
    #[serde(rename = "Key", default, skip_serializing_if = "Option::is_none")]
    pub key: Option<KeyKind>,

    /// Outgoing references. `None` rather than an empty list when there are none.
    #[serde(rename = "References", default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Reference>>,

    /// Remaining attributes, in the order they were seen.
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl Column {
    /// A column with only a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            key: None,
            references: None,
            extra: IndexMap::new(),
        }
    }

    /// Set the declared type.
    #[must_use]
    pub fn with_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    /// Set the key classification.
    #[must_use]
    pub fn with_key(mut self, key: KeyKind) -> Self {
        self.key = Some(key);
        self
    }

    /// Append a reference.
    #[must_use]
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.references.get_or_insert_with(Vec::new).push(reference);
        self
    }

    /// References as a slice, empty when there are none.
    #[must_use]
    pub fn references(&self) -> &[Reference] {
        self.references.as_deref().unwrap_or_default()
    }

    /// Returns `true` if the column is classified as a primary key.
    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        matches!(self.key, Some(KeyKind::Primary))
    }

    /// Copy of this column with only `Field`, `Type`, `Key` and `References`.
    #[must_use]
    pub fn essentials(&self) -> Self {
        Self {
            extra: IndexMap::new(),
            ..self.clone()
        }
    }
}
