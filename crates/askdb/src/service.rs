//! Schema resolution: cache first, live introspection as the fallback.
//!
//! Once a database is in the cache snapshot the cache is authoritative for
//! it. The live server is only consulted for databases the cache does not
//! know, or when the caller explicitly asks for a rebuild.

use crate::domain::{Column, ColumnRef, DatabaseSchema, RelationshipEdge, Schema};
use crate::error::{Error, Result};
use crate::format;
use crate::introspect::{Row, SchemaIntrospector};
use crate::query::ensure_read_only;
use crate::relationships::{self, ReferenceChange};
use crate::storage::{self, load_portable_file, SchemaCache};
use std::path::Path;
use std::sync::Arc;

/// Orchestrates the cache and the introspector.
#[derive(Clone)]
pub struct SchemaContextService {
    introspector: SchemaIntrospector,
    cache: Arc<dyn SchemaCache>,
}

impl std::fmt::Debug for SchemaContextService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaContextService")
            .field("cache", &self.cache.location())
            .finish_non_exhaustive()
    }
}

impl SchemaContextService {
    /// Combine an introspector with a cache backend.
    pub fn new(introspector: SchemaIntrospector, cache: Arc<dyn SchemaCache>) -> Self {
        Self { introspector, cache }
    }

    /// The live introspector.
    #[must_use]
    pub fn introspector(&self) -> &SchemaIntrospector {
        &self.introspector
    }

    /// The cache backend.
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn SchemaCache> {
        &self.cache
    }

    /// Tables of one database.
    ///
    /// With `use_cache`, a cached entry is returned as is. Otherwise the
    /// database is introspected live; the result is not written back.
    ///
    /// # Errors
    ///
    /// Returns an introspection error if the live lookup fails.
    pub async fn get_database_schema(
        &self,
        database: &str,
        use_cache: bool,
    ) -> Result<DatabaseSchema> {
        if use_cache {
            let cached = self
                .cache
                .load()
                .await
                .and_then(|mut cached| cached.remove_database(database));
            if let Some(tables) = cached {
                tracing::debug!(database, "Using cached schema for database");
                return Ok(tables);
            }
        }

        tracing::debug!(database, "Introspecting database");
        self.introspector.describe_database(database).await
    }

    /// Schema of every user database.
    ///
    /// A non-empty cache snapshot is returned as is when `use_cache` is set.
    /// Otherwise each non-system database is introspected; one that fails is
    /// logged and skipped. The aggregate is saved to the cache before it is
    /// returned; a failed save is logged and the schema still returned.
    ///
    /// # Errors
    ///
    /// Returns an introspection error if the database list cannot be read.
    pub async fn build_full_context(&self, use_cache: bool) -> Result<Schema> {
        if use_cache {
            if let Some(cached) = self.cache.load().await.filter(|s| !s.is_empty()) {
                tracing::debug!(databases = cached.len(), "Using cached schema context");
                return Ok(cached);
            }
        }

        let mut schema = Schema::new();
        for database in self.introspector.list_user_databases().await? {
            match self.introspector.describe_database(&database).await {
                Ok(tables) => {
                    schema.insert_database(database, tables);
                }
                Err(e) => {
                    tracing::warn!(database = %database, error = %e, "Skipping database");
                }
            }
        }

        if let Err(e) = self.cache.save(&schema).await {
            tracing::warn!(error = %e, "Failed to save schema cache");
        }
        Ok(schema)
    }

    /// Non-system databases, in server order.
    ///
    /// # Errors
    ///
    /// Returns an introspection error if the server cannot be reached.
    pub async fn list_user_databases(&self) -> Result<Vec<String>> {
        self.introspector.list_user_databases().await
    }

    /// Table names of one database, cache first.
    ///
    /// # Errors
    ///
    /// Returns an introspection error if the live lookup fails.
    pub async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        let tables = self.get_database_schema(database, true).await?;
        Ok(tables.into_keys().collect())
    }

    /// Columns of one table, cache first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the database has no such table.
    pub async fn describe_table(&self, database: &str, table: &str) -> Result<Vec<Column>> {
        let mut tables = self.get_database_schema(database, true).await?;
        tables.shift_remove(table).ok_or_else(|| {
            Error::NotFound(format!("Table {table} not found in database {database}"))
        })
    }

    /// Introspect the given databases and merge them into the cache.
    ///
    /// Returns just the generated part. Any database that fails aborts the
    /// whole call, since the caller asked for it by name. A failed cache
    /// write is only logged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty list, otherwise any
    /// introspection error.
    pub async fn build_context_for(&self, databases: &[String]) -> Result<Schema> {
        if databases.is_empty() {
            return Err(Error::Validation(
                "At least one database name is required".to_string(),
            ));
        }

        let mut generated = Schema::new();
        for database in databases {
            let tables = self.get_database_schema(database, false).await?;
            generated.insert_database(database.clone(), tables);
        }

        if let Err(e) = storage::update(self.cache.as_ref(), generated.clone()).await {
            tracing::warn!(error = %e, "Failed to update schema cache");
        }
        Ok(generated)
    }

    /// Build the full schema and store it.
    ///
    /// With `refresh`, every user database is introspected again and the
    /// snapshot replaced, dropping any references recorded in it. Without
    /// it, an existing non-empty snapshot is left alone.
    ///
    /// # Errors
    ///
    /// See [`Self::build_full_context`].
    pub async fn cache_full_schema(&self, refresh: bool) -> Result<Schema> {
        self.build_full_context(!refresh).await
    }

    /// Load a portable schema file and make it the cache snapshot.
    ///
    /// # Errors
    ///
    /// Returns a format error if the file cannot be parsed, or a storage
    /// error if the snapshot cannot be saved.
    pub async fn import_portable_file(&self, path: &Path) -> Result<Schema> {
        let schema = load_portable_file(path).await?;
        self.cache.save(&schema).await?;
        tracing::info!(
            path = %path.display(),
            databases = schema.len(),
            "Imported schema file into cache"
        );
        Ok(schema)
    }

    /// The cache snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if nothing is cached.
    pub async fn cached_schema(&self) -> Result<Schema> {
        self.cache
            .load()
            .await
            .ok_or_else(|| Error::NotFound("No cached schema found".to_string()))
    }

    /// The cache snapshot in compact text notation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if nothing is cached.
    pub async fn export_text(&self) -> Result<String> {
        Ok(format::encode(&self.cached_schema().await?))
    }

    /// Record an edge in the cache snapshot.
    ///
    /// Starts from an empty snapshot when nothing is cached yet. Returns the
    /// updated snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if any identifying field is blank, or a
    /// storage error if the snapshot cannot be saved.
    pub async fn add_relationship(&self, edge: &RelationshipEdge) -> Result<Schema> {
        edge.validate().map_err(Error::Validation)?;

        let mut schema = self.cache.load().await.unwrap_or_default();
        let change = relationships::add_reference(
            &mut schema,
            &edge.source(),
            &edge.target(),
            Some(&edge.relationship_type),
        );
        self.cache.save(&schema).await?;

        match change {
            ReferenceChange::Added => tracing::info!(edge = %edge, "Added relationship"),
            ReferenceChange::Updated => tracing::info!(edge = %edge, "Updated relationship"),
        }
        Ok(schema)
    }

    /// Delete an edge from the cache snapshot and return the updated snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if nothing is cached or the edge does not
    /// exist, [`Error::Validation`] if an identifying field is blank.
    pub async fn remove_relationship(
        &self,
        source: &ColumnRef,
        target: &ColumnRef,
    ) -> Result<Schema> {
        RelationshipEdge::new(source, target, None)
            .validate()
            .map_err(Error::Validation)?;

        let mut schema = self.cached_schema().await?;
        relationships::remove_reference(&mut schema, source, target)?;
        self.cache.save(&schema).await?;
        tracing::info!(source = %source, target = %target, "Removed relationship");
        Ok(schema)
    }

    /// Every edge in the cache snapshot; empty when nothing is cached.
    pub async fn list_relationships(&self) -> Vec<RelationshipEdge> {
        self.cache
            .load()
            .await
            .map(|schema| relationships::list_references(&schema))
            .unwrap_or_default()
    }

    /// Run a read-only statement against `database`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a missing database or a statement
    /// that is not read-only, [`Error::Query`] if the server rejects it.
    pub async fn run_query(&self, sql: &str, database: &str) -> Result<Vec<Row>> {
        ensure_read_only(sql)?;
        if database.trim().is_empty() {
            return Err(Error::Validation("Database name is required".to_string()));
        }
        self.introspector.run_query(sql, database).await
    }
}
