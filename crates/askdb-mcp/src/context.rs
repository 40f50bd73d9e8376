//! Workspace context management for the MCP server.
//!
//! This module handles:
//! - Workspace detection (walking up to find `.askdb/`)
//! - Path canonicalization
//! - One opened [`App`] per workspace
//!
//! An [`App`] is shared as `Arc<App>`; tools clone the handle and release
//! the context lock before doing any database or model work.

use crate::error::{Error, Result};
use askdb::app::App;
use askdb::commands::init::ASKDB_DIR_NAME;
use std::collections::{HashMap, VecDeque};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Maximum number of opened workspaces kept at once.
///
/// When this limit is reached, the oldest workspace is evicted.
const MAX_CACHED_WORKSPACES: usize = 32;

/// Global context state for the MCP server.
#[derive(Debug, Default)]
pub struct Context {
    /// The current active workspace root.
    current_workspace: Option<PathBuf>,

    /// Opened workspaces (limited to [`MAX_CACHED_WORKSPACES`]).
    apps: HashMap<PathBuf, Arc<App>>,

    /// Insertion order for FIFO eviction.
    cache_order: VecDeque<PathBuf>,
}

impl Context {
    /// Create a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current workspace root.
    ///
    /// The path is canonicalized and must contain `.askdb/`. A workspace
    /// opened earlier is reused; otherwise its configuration is loaded and
    /// its driver built.
    ///
    /// # Errors
    ///
    /// Returns an error if the path doesn't exist, has no `.askdb/`
    /// directory, or its configuration cannot be loaded.
    pub async fn set_workspace(&mut self, workspace_root: &Path) -> Result<WorkspaceInfo> {
        debug!(path = %workspace_root.display(), "Setting workspace");

        let canonical = canonicalize(workspace_root)?;
        validate_path(&canonical)?;

        let askdb_dir = canonical.join(ASKDB_DIR_NAME);
        if !askdb_dir.is_dir() {
            debug!(path = %askdb_dir.display(), "No .askdb directory found");
            return Err(Error::NoAskdbDirectory(canonical.display().to_string()));
        }

        let app = if let Some(app) = self.apps.get(&canonical) {
            debug!("Using opened workspace");
            Arc::clone(app)
        } else {
            debug!("Opening workspace");
            while self.apps.len() >= MAX_CACHED_WORKSPACES {
                self.evict_oldest();
            }
            let app = Arc::new(App::from_directory(&canonical).await?);
            self.apps.insert(canonical.clone(), Arc::clone(&app));
            self.cache_order.push_back(canonical.clone());
            app
        };

        self.current_workspace = Some(canonical);
        Ok(WorkspaceInfo::from_app(&app))
    }

    /// Evict the oldest opened workspace.
    fn evict_oldest(&mut self) {
        if let Some(oldest) = self.cache_order.pop_front() {
            self.apps.remove(&oldest);
            if self.current_workspace.as_ref() == Some(&oldest) {
                self.current_workspace = None;
            }
            debug!(workspace = %oldest.display(), "Evicted workspace");
        }
    }

    /// Get the current workspace root.
    #[must_use]
    pub fn current_workspace(&self) -> Option<&PathBuf> {
        self.current_workspace.as_ref()
    }

    /// Details of the current workspace, if one is set.
    #[must_use]
    pub fn current_info(&self) -> Option<WorkspaceInfo> {
        self.current_workspace
            .as_ref()
            .and_then(|ws| self.apps.get(ws))
            .map(|app| WorkspaceInfo::from_app(app))
    }

    /// The opened workspace at `workspace_root`, or the current one.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No context is set and no workspace path is provided
    /// - The workspace path doesn't exist
    /// - The workspace exists but wasn't opened via `set_workspace()`
    pub fn app_for(&self, workspace_root: Option<&Path>) -> Result<Arc<App>> {
        let workspace = match workspace_root {
            Some(path) => canonicalize(path)?,
            None => self.current_workspace.clone().ok_or(Error::NoContext)?,
        };

        self.apps
            .get(&workspace)
            .cloned()
            .ok_or_else(|| Error::WorkspaceNotInitialized(workspace.display().to_string()))
    }

    /// Discover and set the workspace by walking up from `start`.
    ///
    /// # Errors
    ///
    /// Returns an error if no `.askdb/` directory is found in the path
    /// hierarchy, or if the workspace cannot be opened.
    pub async fn discover_and_set_workspace(&mut self, start: &Path) -> Result<WorkspaceInfo> {
        let workspace_root = discover_workspace(start)?;
        self.set_workspace(&workspace_root).await
    }

    /// Number of opened workspaces.
    #[cfg(test)]
    #[must_use]
    pub fn cache_size(&self) -> usize {
        self.apps.len()
    }
}

/// Information about an opened workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceInfo {
    /// The canonical path to the workspace root.
    pub workspace_root: PathBuf,

    /// The schema cache file.
    pub cache_path: PathBuf,

    /// Configured driver name.
    pub driver: String,
}

impl WorkspaceInfo {
    fn from_app(app: &App) -> Self {
        Self {
            workspace_root: app.root_dir().to_path_buf(),
            cache_path: app.config().cache_path(app.root_dir()),
            driver: app.config().database.driver.to_string(),
        }
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf> {
    path.canonicalize().map_err(|e| Error::WorkspaceNotFound {
        path: path.display().to_string(),
        source: Some(e),
    })
}

/// Reject paths that are relative, contain NUL bytes or still hold `..`.
fn validate_path(path: &Path) -> Result<()> {
    let invalid = |message: &str| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            message.to_string(),
        ))
    };

    if !path.is_absolute() {
        return Err(invalid("Workspace path must be absolute"));
    }
    if path.to_string_lossy().contains('\0') {
        return Err(invalid("Workspace path contains invalid characters"));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(invalid("Workspace path contains parent directory references"));
    }
    Ok(())
}

/// Discover an askdb workspace by walking up from the given directory.
///
/// Returns the canonicalized workspace root (directory containing `.askdb/`).
///
/// # Errors
///
/// Returns `Error::NoAskdbDirectory` if no `.askdb/` directory is found,
/// or `Error::WorkspaceNotFound` if the path cannot be canonicalized.
pub fn discover_workspace(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if current.join(ASKDB_DIR_NAME).is_dir() {
            return canonicalize(&current);
        }
        if !current.pop() {
            break;
        }
    }

    Err(Error::NoAskdbDirectory(start.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use askdb::commands::init;
    use tempfile::TempDir;

    async fn snapshot_workspace() -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("schema.txt"), "shop.orders: id(int,PK)\n").unwrap();
        init::init(temp.path(), Some("schema.txt")).await.unwrap();
        temp
    }

    #[test]
    fn test_discover_workspace() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".askdb")).unwrap();

        let result = discover_workspace(temp.path()).unwrap();
        assert_eq!(result, temp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_discover_workspace_not_found() {
        let temp = TempDir::new().unwrap();
        let result = discover_workspace(temp.path());
        assert!(matches!(result, Err(Error::NoAskdbDirectory(_))));
    }

    #[test]
    fn test_discover_workspace_from_nested_dir() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".askdb")).unwrap();
        let subdir = temp.path().join("src").join("nested").join("deep");
        std::fs::create_dir_all(&subdir).unwrap();

        let result = discover_workspace(&subdir).unwrap();
        assert_eq!(result, temp.path().canonicalize().unwrap());
    }

    #[tokio::test]
    async fn test_discover_and_set_workspace() {
        let temp = snapshot_workspace().await;
        let subdir = temp.path().join("reports");
        std::fs::create_dir(&subdir).unwrap();

        let mut context = Context::new();
        let info = context.discover_and_set_workspace(&subdir).await.unwrap();

        assert_eq!(info.workspace_root, temp.path().canonicalize().unwrap());
        assert_eq!(info.driver, "snapshot");
        assert!(context.app_for(None).is_ok());
    }

    #[test]
    fn test_app_for_unopened_workspace() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".askdb")).unwrap();

        let context = Context::new();
        match context.app_for(Some(temp.path())) {
            Err(Error::WorkspaceNotInitialized(_)) => {}
            other => panic!("Expected WorkspaceNotInitialized, got {other:?}"),
        }
    }

    #[test]
    fn test_app_for_nonexistent_path() {
        let context = Context::new();
        match context.app_for(Some(Path::new("/nonexistent/path/to/workspace"))) {
            Err(Error::WorkspaceNotFound { .. }) => {}
            other => panic!("Expected WorkspaceNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_app_for_without_context() {
        let context = Context::new();
        assert!(matches!(context.app_for(None), Err(Error::NoContext)));
    }

    #[test]
    fn test_validate_path_rejects_relative() {
        assert!(validate_path(Path::new("relative/path")).is_err());
    }

    #[test]
    fn test_validate_path_accepts_absolute() {
        assert!(validate_path(&std::env::temp_dir()).is_ok());
    }

    #[tokio::test]
    async fn test_reopening_reuses_workspace() {
        let temp = snapshot_workspace().await;
        let mut context = Context::new();

        context.set_workspace(temp.path()).await.unwrap();
        context.set_workspace(temp.path()).await.unwrap();

        assert_eq!(context.cache_size(), 1);
        assert_eq!(context.cache_order.len(), 1);
    }

    #[tokio::test]
    async fn test_evict_oldest() {
        let workspaces = [
            snapshot_workspace().await,
            snapshot_workspace().await,
            snapshot_workspace().await,
        ];
        let mut context = Context::new();
        for workspace in &workspaces {
            context.set_workspace(workspace.path()).await.unwrap();
        }
        assert_eq!(context.cache_size(), 3);

        context.evict_oldest();
        assert_eq!(context.cache_size(), 2);
        assert!(context.app_for(Some(workspaces[0].path())).is_err());
        assert!(context.current_workspace().is_some());

        context.evict_oldest();
        context.evict_oldest();
        assert_eq!(context.cache_size(), 0);
        assert!(context.current_workspace().is_none());

        // Evicting from an empty context is a no-op
        context.evict_oldest();
        assert_eq!(context.cache_size(), 0);
    }
}
