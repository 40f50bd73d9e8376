//! JSON snapshot on disk, plus loading of portable schema files.
//!
//! Saves use the temp-file-then-rename pattern: the snapshot is written to
//! `<name>.json.tmp` next to the target and renamed over it once complete, so
//! a crash mid-write leaves the previous snapshot intact.

use super::SchemaCache;
use crate::domain::Schema;
use crate::error::{FormatError, Result};
use crate::format;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Schema cache persisted as a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct FileSchemaStore {
    path: PathBuf,
}

impl FileSchemaStore {
    /// A store backed by the file at `path`. Nothing is read until [`SchemaCache::load`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SchemaCache for FileSchemaStore {
    async fn load(&self) -> Option<Schema> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No cached schema file");
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Cannot read cached schema"
                );
                return None;
            }
        };

        match serde_json::from_str::<Schema>(&content) {
            Ok(schema) => {
                tracing::debug!(
                    path = %self.path.display(),
                    databases = schema.len(),
                    "Loaded cached schema"
                );
                Some(schema)
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring unparseable cached schema"
                );
                None
            }
        }
    }

    async fn save(&self, schema: &Schema) -> Result<()> {
        let json = serde_json::to_string_pretty(schema)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = make_temp_path(&self.path);
        if let Err(e) = write_temp_file(&temp_path, json.as_bytes()).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        tokio::fs::rename(&temp_path, &self.path).await?;

        tracing::info!(
            path = %self.path.display(),
            databases = schema.len(),
            tables = schema.table_count(),
            "Saved schema cache"
        );
        Ok(())
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// `cache.json` becomes `cache.json.tmp`; `cache` becomes `cache.tmp`.
fn make_temp_path(path: &Path) -> PathBuf {
    let mut temp_path = path.to_path_buf();
    let new_extension = match path.extension() {
        Some(ext) => {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".tmp");
            new_ext
        }
        None => std::ffi::OsString::from("tmp"),
    };
    temp_path.set_extension(new_extension);
    temp_path
}

async fn write_temp_file(temp_path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(temp_path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}

/// Load a schema from a user-supplied file in either portable format.
///
/// A `.json` file must be a JSON snapshot. Any other file is read as JSON
/// when its content starts with `{`, otherwise as compact notation.
///
/// # Errors
///
/// Returns [`FormatError`] if the file cannot be read, is not valid schema
/// JSON, or is compact text that yields no tables.
pub async fn load_portable_file(path: &Path) -> Result<Schema> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FormatError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

    let is_json_extension = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let schema = if is_json_extension || content.trim_start().starts_with('{') {
        serde_json::from_str::<Schema>(&content).map_err(|source| FormatError::InvalidJson {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        let schema = format::decode(&content);
        if schema.table_count() == 0 {
            return Err(FormatError::NoTables(path.to_path_buf()).into());
        }
        schema
    };

    tracing::debug!(
        path = %path.display(),
        databases = schema.len(),
        tables = schema.table_count(),
        "Loaded portable schema file"
    );
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Column, KeyKind};
    use crate::error::Error;
    use tempfile::TempDir;

    #[test]
    fn test_make_temp_path() {
        assert_eq!(
            make_temp_path(Path::new("/x/db_schema.json")),
            Path::new("/x/db_schema.json.tmp")
        );
        assert_eq!(make_temp_path(Path::new("cache")), Path::new("cache.tmp"));
    }

    #[tokio::test]
    async fn test_missing_file_loads_as_absent() {
        let dir = TempDir::new().unwrap();
        let store = FileSchemaStore::new(dir.path().join("db_schema.json"));
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_as_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db_schema.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(FileSchemaStore::new(&path).load().await.is_none());
    }

    #[tokio::test]
    async fn test_save_writes_pretty_json_and_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("db_schema.json");
        let store = FileSchemaStore::new(&path);

        let mut schema = Schema::new();
        schema
            .ensure_table("shop", "orders")
            .push(Column::new("id").with_key(KeyKind::Primary));
        store.save(&schema).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("{\n  \"shop\": {"));
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(store.load().await, Some(schema));
    }

    #[tokio::test]
    async fn test_portable_text_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schema.txt");
        std::fs::write(&path, "# export\nshop.orders: id(int,PK)\n").unwrap();

        let schema = load_portable_file(&path).await.unwrap();
        assert!(schema.column("shop", "orders", "id").unwrap().is_primary_key());
    }

    #[tokio::test]
    async fn test_portable_json_without_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("upload");
        std::fs::write(&path, r#"  {"shop":{"orders":[{"Field":"id","Key":"PRI"}]}}"#).unwrap();

        let schema = load_portable_file(&path).await.unwrap();
        assert_eq!(schema.table_count(), 1);
    }

    #[tokio::test]
    async fn test_portable_invalid_json_is_format_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(&path, "shop.orders: id").unwrap();

        let err = load_portable_file(&path).await.unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::InvalidJson { .. })));
    }

    #[tokio::test]
    async fn test_portable_file_without_tables_is_format_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schema.txt");
        std::fs::write(&path, "nothing useful here\n").unwrap();

        let err = load_portable_file(&path).await.unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::NoTables(_))));
    }

    #[tokio::test]
    async fn test_portable_json_with_empty_database_is_accepted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(&path, r#"{"shop":{}}"#).unwrap();

        let schema = load_portable_file(&path).await.unwrap();
        assert_eq!(schema.database_names().collect::<Vec<_>>(), vec!["shop"]);
        assert_eq!(schema.table_count(), 0);
    }

    #[tokio::test]
    async fn test_portable_missing_file_is_format_error() {
        let dir = TempDir::new().unwrap();
        let err = load_portable_file(&dir.path().join("absent.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::Unreadable { .. })));
    }
}
