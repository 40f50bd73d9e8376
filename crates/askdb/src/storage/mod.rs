//! Persistence for the cached schema snapshot.
//!
//! The cache is a single JSON document shaped like [`Schema`]. Two backends
//! implement [`SchemaCache`]:
//!
//! - [`FileSchemaStore`]: pretty-printed JSON at a fixed path, written atomically
//! - [`InMemorySchemaStore`]: ephemeral, for tests and one-off runs
//!
//! Reads and writes are not locked against other processes. Two overlapping
//! writers race and the last one wins.

use crate::domain::Schema;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

mod file;
mod in_memory;

pub use file::{load_portable_file, FileSchemaStore};
pub use in_memory::InMemorySchemaStore;

/// Load/save access to the schema snapshot.
///
/// Implementations must be `Send + Sync` so one store can be shared between
/// the CLI, the MCP server and background tasks behind an `Arc`.
#[async_trait]
pub trait SchemaCache: Send + Sync {
    /// Read the persisted snapshot.
    ///
    /// Returns `None` when nothing has been saved yet or the stored document
    /// cannot be parsed. Callers treat both the same way and build from
    /// scratch.
    async fn load(&self) -> Option<Schema>;

    /// Persist `schema`, replacing whatever was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized or written.
    async fn save(&self, schema: &Schema) -> Result<()>;

    /// Where the snapshot lives, for backends that use a file.
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// Which [`SchemaCache`] implementation to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    /// Ephemeral snapshot held in memory.
    InMemory,
    /// JSON snapshot at the given path.
    File(PathBuf),
}

/// Build a cache backend.
#[must_use]
pub fn create_cache(backend: CacheBackend) -> Box<dyn SchemaCache> {
    match backend {
        CacheBackend::InMemory => Box::new(InMemorySchemaStore::new()),
        CacheBackend::File(path) => Box::new(FileSchemaStore::new(path)),
    }
}

/// Shallow merge at the database level.
///
/// Every database in `partial` replaces the whole entry of the same name in
/// `existing`; tables are not merged individually. Replaced databases keep
/// their position, new ones are appended.
#[must_use]
pub fn merge_into(mut existing: Schema, partial: Schema) -> Schema {
    for (database, tables) in partial {
        existing.insert_database(database, tables);
    }
    existing
}

/// Merge `partial` into the stored snapshot and persist the result.
///
/// A missing or unreadable snapshot counts as empty.
///
/// # Errors
///
/// Returns an error if the merged snapshot cannot be saved.
pub async fn update(cache: &dyn SchemaCache, partial: Schema) -> Result<Schema> {
    let existing = cache.load().await.unwrap_or_default();
    let merged = merge_into(existing, partial);
    cache.save(&merged).await?;
    tracing::info!(
        databases = merged.len(),
        tables = merged.table_count(),
        "Updated cached schema"
    );
    Ok(merged)
}
