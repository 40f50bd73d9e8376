//! MCP request parameters and response models.
//!
//! Every tool that touches a workspace takes an optional `workspace_root`;
//! without it the workspace chosen by `set_context` is used.

use crate::error::{Error, Result};
use askdb::domain::{ColumnRef, RelationshipEdge, Schema, DEFAULT_RELATIONSHIP_TYPE};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for `set_context`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SetContextParams {
    /// Directory containing `.askdb/` (or any directory below it).
    pub workspace_root: String,
}

/// Parameters for tools that only need a workspace.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkspaceParams {
    /// Workspace to use instead of the current context.
    #[serde(default)]
    pub workspace_root: Option<String>,
}

/// Parameters for `list_tables`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListTablesParams {
    /// Database to list.
    pub database: String,
    /// Workspace to use instead of the current context.
    #[serde(default)]
    pub workspace_root: Option<String>,
}

/// Parameters for `describe_table`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DescribeTableParams {
    /// Database holding the table.
    pub database: String,
    /// Table to describe.
    pub table: String,
    /// Workspace to use instead of the current context.
    #[serde(default)]
    pub workspace_root: Option<String>,
}

/// Parameters for `run_query`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunQueryParams {
    /// A `SELECT`, `SHOW` or `DESCRIBE` statement.
    pub sql: String,
    /// Database to run it against.
    pub database: String,
    /// Workspace to use instead of the current context.
    #[serde(default)]
    pub workspace_root: Option<String>,
}

/// Parameters for `cache_schema`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheSchemaParams {
    /// Introspect every database again, replacing the cache and its relationships.
    #[serde(default)]
    pub refresh: Option<bool>,
    /// Workspace to use instead of the current context.
    #[serde(default)]
    pub workspace_root: Option<String>,
}

/// Parameters for `generate_schema`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerateSchemaParams {
    /// Databases to introspect and merge into the cache.
    pub databases: Vec<String>,
    /// Workspace to use instead of the current context.
    #[serde(default)]
    pub workspace_root: Option<String>,
}

/// Parameters for `import_schema`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImportSchemaParams {
    /// A `.json` schema or compact `.txt` schema, relative to the workspace root unless absolute.
    pub file_path: String,
    /// Workspace to use instead of the current context.
    #[serde(default)]
    pub workspace_root: Option<String>,
}

/// Parameters for `get_cached_schema`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct GetCachedSchemaParams {
    /// `json` (default) or `text` for the compact notation.
    #[serde(default)]
    pub format: Option<String>,
    /// Workspace to use instead of the current context.
    #[serde(default)]
    pub workspace_root: Option<String>,
}

/// Parameters for `add_relationship` and `delete_relationship`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RelationshipParams {
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
    /// Relationship label, `MANY_TO_ONE` when omitted. Ignored by `delete_relationship`.
    #[serde(default)]
    pub relationship_type: Option<String>,
    /// Workspace to use instead of the current context.
    #[serde(default)]
    pub workspace_root: Option<String>,
}

impl RelationshipParams {
    /// The edge these parameters name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] for the first blank identifying field.
    pub fn to_edge(&self) -> Result<RelationshipEdge> {
        let fields = [
            ("source_database", &self.source_database),
            ("source_table", &self.source_table),
            ("source_column", &self.source_column),
            ("target_database", &self.target_database),
            ("target_table", &self.target_table),
            ("target_column", &self.target_column),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(Error::MissingField(*name));
        }

        let source = ColumnRef::new(
            self.source_database.trim(),
            self.source_table.trim(),
            self.source_column.trim(),
        );
        let target = ColumnRef::new(
            self.target_database.trim(),
            self.target_table.trim(),
            self.target_column.trim(),
        );
        let relationship_type = self
            .relationship_type
            .as_deref()
            .map(str::trim)
            .filter(|kind| !kind.is_empty())
            .map_or_else(|| DEFAULT_RELATIONSHIP_TYPE.to_string(), str::to_uppercase);

        Ok(RelationshipEdge::new(&source, &target, Some(&relationship_type)))
    }
}

/// Parameters for `ask`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AskParams {
    /// Question in plain language.
    pub question: String,
    /// Database to answer against; detected from the question when omitted.
    #[serde(default)]
    pub database: Option<String>,
    /// Workspace to use instead of the current context.
    #[serde(default)]
    pub workspace_root: Option<String>,
}

/// Response from the `set_context` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SetContextResponse {
    /// The workspace root that was set.
    pub workspace_root: String,

    /// The schema cache file.
    pub cache_path: String,

    /// Configured driver.
    pub driver: String,

    /// Status message.
    pub message: String,
}

/// Response from the `where_am_i` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WhereAmIResponse {
    /// The current workspace root, if set.
    pub workspace_root: Option<String>,

    /// The current schema cache file, if set.
    pub cache_path: Option<String>,

    /// Whether a context is currently set.
    pub context_set: bool,
}

/// Summary of a schema written to the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CacheSummary {
    /// Databases in the written schema.
    pub databases: Vec<String>,

    /// Tables across those databases.
    pub tables: usize,

    /// The schema cache file.
    pub cache_path: String,
}

impl CacheSummary {
    /// Summarize `schema` as written to `cache_path`.
    #[must_use]
    pub fn new(schema: &Schema, cache_path: String) -> Self {
        Self {
            databases: schema.database_names().map(str::to_string).collect(),
            tables: schema.table_count(),
            cache_path,
        }
    }
}

/// Response from `add_relationship`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipResponse {
    /// Status message.
    pub message: String,

    /// The edge as stored.
    pub relationship: RelationshipEdge,
}

/// Output of `get_cached_schema`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    /// Nested JSON document.
    Json,
    /// Compact text notation.
    Text,
}

/// Parse a schema format name; `None` means JSON.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for anything but `json` or `text`.
pub fn parse_schema_format(format: Option<&str>) -> Result<SchemaFormat> {
    match format.map(|f| f.trim().to_lowercase()).as_deref() {
        None | Some("" | "json") => Ok(SchemaFormat::Json),
        Some("text" | "txt") => Ok(SchemaFormat::Text),
        Some(_) => Err(Error::InvalidArgument {
            field: "format",
            value: format.unwrap_or_default().to_string(),
            valid_values: "json, text",
        }),
    }
}
