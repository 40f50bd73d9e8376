//! Offline driver backed by a fixed schema.

use super::{DatabaseDriver, Row};
use crate::domain::{Column, Schema};
use crate::error::{DriverError, Result};
use crate::storage::load_portable_file;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

/// Serves introspection from a [`Schema`] and queries from canned results.
///
/// Queries are matched on their text after trimming, collapsing whitespace
/// and dropping a trailing `;`. A query with no canned result fails as
/// unsupported.
#[derive(Debug, Clone, Default)]
pub struct SnapshotDriver {
    schema: Schema,
    results: HashMap<String, Vec<Row>>,
}

impl SnapshotDriver {
    /// A driver that reports exactly `schema`.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            results: HashMap::new(),
        }
    }

    /// A driver that reports the schema in a portable schema file.
    ///
    /// # Errors
    ///
    /// Returns a format error if the file cannot be loaded.
    pub async fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(load_portable_file(path).await?))
    }

    /// Register the rows returned for `sql`.
    #[must_use]
    pub fn with_result(mut self, sql: &str, rows: Vec<Row>) -> Self {
        self.results.insert(normalize_sql(sql), rows);
        self
    }
}

fn normalize_sql(sql: &str) -> String {
    let collapsed = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_end_matches(';').trim_end().to_string()
}

#[async_trait]
impl DatabaseDriver for SnapshotDriver {
    async fn list_databases(&self) -> std::result::Result<Vec<String>, DriverError> {
        Ok(self.schema.database_names().map(str::to_string).collect())
    }

    async fn list_tables(&self, database: &str) -> std::result::Result<Vec<String>, DriverError> {
        self.schema
            .database(database)
            .map(|tables| tables.keys().cloned().collect())
            .ok_or_else(|| DriverError::Query(format!("Unknown database '{database}'")))
    }

    async fn describe_table(
        &self,
        database: &str,
        table: &str,
    ) -> std::result::Result<Vec<Column>, DriverError> {
        self.schema
            .table(database, table)
            .map(<[Column]>::to_vec)
            .ok_or_else(|| DriverError::Query(format!("Table '{database}.{table}' doesn't exist")))
    }

    async fn run_query(
        &self,
        sql: &str,
        _database: &str,
    ) -> std::result::Result<Vec<Row>, DriverError> {
        self.results
            .get(&normalize_sql(sql))
            .cloned()
            .ok_or_else(|| DriverError::Unsupported(format!("no canned result for: {sql}")))
    }
}
