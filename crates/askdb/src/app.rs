//! Application context for CLI and server command execution.
//!
//! [`App`] finds the workspace, loads its configuration and wires the
//! configured driver and cache into a [`SchemaContextService`].
//!
//! # Example
//!
//! ```no_run
//! use askdb::app::App;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::from_directory(Path::new(".")).await?;
//!     let databases = app.service().list_user_databases().await?;
//!     println!("{databases:?}");
//!     Ok(())
//! }
//! ```

use crate::assistant::QueryAssistant;
use crate::commands::init::{find_askdb_root, ASKDB_DIR_NAME, CONFIG_FILE_NAME};
use crate::config::{AskdbConfig, DriverKind};
use crate::error::{ConfigError, Result};
use crate::introspect::{DatabaseDriver, SchemaIntrospector, SnapshotDriver};
use crate::llm::{LanguageModel, OpenAiClient};
use crate::service::SchemaContextService;
use crate::storage::{create_cache, CacheBackend};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Application context for askdb operations.
pub struct App {
    service: SchemaContextService,
    config: AskdbConfig,
    root_dir: PathBuf,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("root_dir", &self.root_dir)
            .field("driver", &self.config.database.driver)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl App {
    /// Create an App from the given working directory.
    ///
    /// Searches up the directory tree for `.askdb/`, loads its configuration
    /// and builds the driver and schema cache it names.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No askdb workspace is found in the directory tree
    /// - Configuration cannot be loaded
    /// - The configured driver cannot be built
    pub async fn from_directory(working_dir: &Path) -> Result<Self> {
        let root_dir = find_askdb_root(working_dir).ok_or(ConfigError::NotInitialized)?;
        let config_path = root_dir.join(ASKDB_DIR_NAME).join(CONFIG_FILE_NAME);
        let config = AskdbConfig::load(&config_path).await?;

        let driver = build_driver(&config, &root_dir).await?;
        let cache = create_cache(CacheBackend::File(config.cache_path(&root_dir)));
        let service = SchemaContextService::new(SchemaIntrospector::new(driver), Arc::from(cache));

        tracing::debug!(
            root = %root_dir.display(),
            driver = %config.database.driver,
            "Opened askdb workspace"
        );

        Ok(Self {
            service,
            config,
            root_dir,
        })
    }

    /// The schema context service.
    pub fn service(&self) -> &SchemaContextService {
        &self.service
    }

    /// The loaded configuration.
    pub fn config(&self) -> &AskdbConfig {
        &self.config
    }

    /// Directory containing `.askdb/`.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Path to the `.askdb/` directory.
    pub fn askdb_dir(&self) -> PathBuf {
        self.root_dir.join(ASKDB_DIR_NAME)
    }

    /// Build a question-answering assistant using the configured model.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] if the API key variable is unset.
    pub fn assistant(&self) -> Result<QueryAssistant> {
        let api_key = self.config.llm.api_key()?;
        let model = OpenAiClient::new(&self.config.llm.api_base, api_key);
        Ok(self.assistant_with_model(Arc::new(model)))
    }

    /// Build an assistant around an already constructed model.
    pub fn assistant_with_model(&self, model: Arc<dyn LanguageModel>) -> QueryAssistant {
        QueryAssistant::new(self.service.clone(), model, self.config.assistant_settings())
    }
}

/// Build the driver named by `config`, resolving files against `root_dir`.
///
/// # Errors
///
/// Returns [`ConfigError::UnsupportedDriver`] for `mysql` in a build without
/// the `mysql` feature, or a format error if the snapshot file cannot be read.
pub async fn build_driver(
    config: &AskdbConfig,
    root_dir: &Path,
) -> Result<Arc<dyn DatabaseDriver>> {
    match config.database.driver {
        DriverKind::Mysql => mysql_driver(config),
        DriverKind::Snapshot => {
            let path = config.snapshot_path(root_dir).ok_or_else(|| {
                ConfigError::Invalid(
                    "database.snapshot-file is required for the snapshot driver".to_string(),
                )
            })?;
            Ok(Arc::new(SnapshotDriver::from_file(&path).await?))
        }
    }
}

#[cfg(feature = "mysql")]
fn mysql_driver(config: &AskdbConfig) -> Result<Arc<dyn DatabaseDriver>> {
    use crate::introspect::{MySqlDriver, MySqlSettings};

    let settings = MySqlSettings {
        host: config.database.host.clone(),
        port: config.database.port,
        user: config.database.user.clone(),
        password: config.database.password(),
    };
    Ok(Arc::new(MySqlDriver::new(&settings)))
}

#[cfg(not(feature = "mysql"))]
fn mysql_driver(config: &AskdbConfig) -> Result<Arc<dyn DatabaseDriver>> {
    Err(ConfigError::UnsupportedDriver(config.database.driver.to_string()).into())
}
