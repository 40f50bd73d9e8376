//! Live database introspection.
//!
//! The SQL server itself sits behind [`DatabaseDriver`], so the rest of the
//! crate never talks to a concrete client. [`SchemaIntrospector`] wraps a
//! driver and turns its failures into [`IntrospectionError`]s that name the
//! database or table that failed.
//!
//! Backends:
//!
//! - [`MySqlDriver`] (feature `mysql`, on by default)
//! - [`SnapshotDriver`]: answers from a fixed [`Schema`] and canned results

use crate::domain::{is_system_database, Column, DatabaseSchema};
use crate::error::{DriverError, Error, IntrospectionError, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;

#[cfg(feature = "mysql")]
mod mysql;
mod snapshot;

#[cfg(feature = "mysql")]
pub use mysql::{MySqlDriver, MySqlSettings};
pub use snapshot::SnapshotDriver;

/// One result row: column name to JSON value, in select-list order.
pub type Row = IndexMap<String, serde_json::Value>;

/// The external SQL server.
///
/// All calls suspend until the server answers. No call is retried.
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Every database the server reports, in the server's order.
    async fn list_databases(&self) -> std::result::Result<Vec<String>, DriverError>;

    /// Tables of one database, in the server's order.
    async fn list_tables(&self, database: &str) -> std::result::Result<Vec<String>, DriverError>;

    /// Column metadata of one table.
    async fn describe_table(
        &self,
        database: &str,
        table: &str,
    ) -> std::result::Result<Vec<Column>, DriverError>;

    /// Execute a statement against `database` and return its rows.
    async fn run_query(
        &self,
        sql: &str,
        database: &str,
    ) -> std::result::Result<Vec<Row>, DriverError>;
}

/// Reads schema metadata from a [`DatabaseDriver`].
#[derive(Clone)]
pub struct SchemaIntrospector {
    driver: Arc<dyn DatabaseDriver>,
}

impl std::fmt::Debug for SchemaIntrospector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaIntrospector").finish_non_exhaustive()
    }
}

impl SchemaIntrospector {
    /// Wrap a driver.
    pub fn new(driver: Arc<dyn DatabaseDriver>) -> Self {
        Self { driver }
    }

    /// The wrapped driver.
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn DatabaseDriver> {
        &self.driver
    }

    /// All databases, system ones included, in server order.
    ///
    /// # Errors
    ///
    /// Returns [`IntrospectionError`] if the server cannot be reached.
    pub async fn list_databases(&self) -> Result<Vec<String>> {
        self.driver
            .list_databases()
            .await
            .map_err(|e| IntrospectionError::server(e).into())
    }

    /// Databases with the server's own bookkeeping databases removed.
    ///
    /// # Errors
    ///
    /// Returns [`IntrospectionError`] if the server cannot be reached.
    pub async fn list_user_databases(&self) -> Result<Vec<String>> {
        let mut databases = self.list_databases().await?;
        databases.retain(|name| !is_system_database(name));
        Ok(databases)
    }

    /// Tables of one database.
    ///
    /// # Errors
    ///
    /// Returns [`IntrospectionError`] naming the database.
    pub async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        self.driver
            .list_tables(database)
            .await
            .map_err(|e| IntrospectionError::database(database, e).into())
    }

    /// Columns of one table with type and key populated.
    ///
    /// References are always empty: relationships come only from the cache
    /// and explicit edits, never from the live server.
    ///
    /// # Errors
    ///
    /// Returns [`IntrospectionError`] naming the table.
    pub async fn describe_table(&self, database: &str, table: &str) -> Result<Vec<Column>> {
        let mut columns = self
            .driver
            .describe_table(database, table)
            .await
            .map_err(|e| IntrospectionError::table(database, table, e))?;
        for column in &mut columns {
            column.references = None;
        }
        Ok(columns)
    }

    /// Every table of one database with its columns.
    ///
    /// Fails as a whole if any table cannot be described.
    ///
    /// # Errors
    ///
    /// Returns [`IntrospectionError`] for the first database or table that fails.
    pub async fn describe_database(&self, database: &str) -> Result<DatabaseSchema> {
        let tables = self.list_tables(database).await?;
        let mut schema = DatabaseSchema::with_capacity(tables.len());

        for table in tables {
            tracing::debug!(database, table = %table, "Describing table");
            let columns = self.describe_table(database, &table).await?;
            schema.insert(table, columns);
        }

        Ok(schema)
    }

    /// Run a statement against `database`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] if the server rejects the statement.
    pub async fn run_query(&self, sql: &str, database: &str) -> Result<Vec<Row>> {
        self.driver
            .run_query(sql, database)
            .await
            .map_err(|source| Error::Query {
                database: database.to_string(),
                source,
            })
    }
}
