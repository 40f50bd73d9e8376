//! Implementation of the `init` command.
//!
//! Creates the `.askdb/` directory with a default configuration. The schema
//! cache file is not created; an absent cache simply reads as empty.

use crate::config::{AskdbConfig, DriverKind};
use crate::error::{ConfigError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Name of the askdb directory
pub const ASKDB_DIR_NAME: &str = ".askdb";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the gitignore file within .askdb
pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Maximum directory depth to traverse when searching for the workspace root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

const GITIGNORE_CONTENT: &str = "\
# Temporary files left by interrupted cache writes
*.tmp
";

/// Result of the init command
#[derive(Debug)]
pub struct InitResult {
    /// Path to the created askdb directory
    pub askdb_dir: PathBuf,
    /// Path to the created config file
    pub config_file: PathBuf,
    /// Path to the created gitignore file
    pub gitignore_file: PathBuf,
    /// Where the schema cache will be written
    pub cache_file: PathBuf,
    /// Driver written to the configuration
    pub driver: DriverKind,
}

/// Initialize a new askdb workspace in `base_dir`.
///
/// With `snapshot_file` the workspace is configured for the snapshot driver
/// serving that file; otherwise for MySQL with default connection settings.
///
/// # Errors
///
/// Returns [`ConfigError::AlreadyInitialized`] if `.askdb/` already exists,
/// or an IO error if the files cannot be written.
pub async fn init(base_dir: &Path, snapshot_file: Option<&str>) -> Result<InitResult> {
    let askdb_dir = base_dir.join(ASKDB_DIR_NAME);

    if askdb_dir.exists() {
        return Err(ConfigError::AlreadyInitialized(PathBuf::from(ASKDB_DIR_NAME)).into());
    }

    fs::create_dir_all(&askdb_dir).await?;

    let mut config = AskdbConfig::default();
    if let Some(file) = snapshot_file.map(str::trim).filter(|f| !f.is_empty()) {
        config.database.driver = DriverKind::Snapshot;
        config.database.snapshot_file = Some(file.to_string());
    }

    let config_file = askdb_dir.join(CONFIG_FILE_NAME);
    config.save(&config_file).await?;

    let gitignore_file = askdb_dir.join(GITIGNORE_FILE_NAME);
    fs::write(&gitignore_file, GITIGNORE_CONTENT).await?;

    tracing::info!(
        path = %askdb_dir.display(),
        driver = %config.database.driver,
        "Initialized askdb workspace"
    );

    Ok(InitResult {
        askdb_dir,
        config_file,
        gitignore_file,
        cache_file: config.cache_path(base_dir),
        driver: config.database.driver,
    })
}

/// Check if a directory has been initialized with askdb.
pub fn is_initialized(base_dir: &Path) -> bool {
    base_dir.join(ASKDB_DIR_NAME).exists()
}

/// Find the workspace root by searching up the directory tree.
///
/// Returns the directory containing `.askdb/`, or `None` if none is found
/// before the filesystem root or [`MAX_TRAVERSAL_DEPTH`].
pub fn find_askdb_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if current.join(ASKDB_DIR_NAME).exists() {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}
