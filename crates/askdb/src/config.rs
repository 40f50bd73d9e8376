//! Workspace configuration (`.askdb/config.yaml`).
//!
//! Every key is optional; a missing key takes the default shown here.
//!
//! ```yaml
//! cache-file: .askdb/db_schema.json
//! database:
//!   driver: mysql          # or `snapshot`
//!   host: localhost
//!   port: 3306
//!   user: root
//!   password-env: DB_PASS
//!   snapshot-file: null    # schema file served by the snapshot driver
//! llm:
//!   api-base: https://api.openai.com/v1
//!   api-key-env: OPENAI_API_KEY
//!   model: gpt-4
//!   fallback-model: gpt-3.5-turbo
//!   max-tokens: 500
//! context:
//!   size-threshold: 50000
//!   large-database-tables: 15
//!   sample-tables: 3
//!   max-result-rows: 10
//! ```

use crate::assistant::AssistantSettings;
use crate::context::ContextPolicy;
use crate::error::{ConfigError, Result};
use crate::llm::DEFAULT_API_BASE;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Default location of the schema cache, relative to the workspace root.
pub const DEFAULT_CACHE_FILE: &str = ".askdb/db_schema.json";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct AskdbConfig {
    /// Schema cache path, relative to the workspace root unless absolute.
    pub cache_file: String,
    /// Where schemas and query results come from.
    pub database: DatabaseConfig,
    /// Language model settings.
    pub llm: LlmConfig,
    /// Context reduction settings.
    pub context: ContextConfig,
}

impl Default for AskdbConfig {
    fn default() -> Self {
        Self {
            cache_file: DEFAULT_CACHE_FILE.to_string(),
            database: DatabaseConfig::default(),
            llm: LlmConfig::default(),
            context: ContextConfig::default(),
        }
    }
}

/// Which [`crate::introspect::DatabaseDriver`] to use.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// A live MySQL-compatible server.
    #[default]
    Mysql,
    /// A fixed schema file, no server.
    Snapshot,
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mysql => f.write_str("mysql"),
            Self::Snapshot => f.write_str("snapshot"),
        }
    }
}

/// `database:` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct DatabaseConfig {
    /// Driver backend.
    pub driver: DriverKind,
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login user.
    pub user: String,
    /// Environment variable holding the password. Unset means no password.
    pub password_env: String,
    /// Portable schema file for the snapshot driver, relative to the workspace root.
    pub snapshot_file: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::Mysql,
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password_env: "DB_PASS".to_string(),
            snapshot_file: None,
        }
    }
}

impl DatabaseConfig {
    /// The password from [`Self::password_env`], if set.
    #[must_use]
    pub fn password(&self) -> Option<String> {
        std::env::var(&self.password_env).ok()
    }
}

/// `llm:` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct LlmConfig {
    /// Chat completions endpoint root.
    pub api_base: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Primary model.
    pub model: String,
    /// Model used after a token limit.
    pub fallback_model: String,
    /// Completion length cap.
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "gpt-4".to_string(),
            fallback_model: "gpt-3.5-turbo".to_string(),
            max_tokens: 500,
        }
    }
}

impl LlmConfig {
    /// The API key from [`Self::api_key_env`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] if the variable is unset or empty.
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnv(self.api_key_env.clone()).into())
    }
}

/// `context:` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct ContextConfig {
    /// See [`ContextPolicy::size_threshold`].
    pub size_threshold: usize,
    /// See [`ContextPolicy::large_database_tables`].
    pub large_database_tables: usize,
    /// See [`ContextPolicy::sample_tables`].
    pub sample_tables: usize,
    /// Result rows shown to the model when explaining.
    pub max_result_rows: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        let policy = ContextPolicy::default();
        Self {
            size_threshold: policy.size_threshold,
            large_database_tables: policy.large_database_tables,
            sample_tables: policy.sample_tables,
            max_result_rows: 10,
        }
    }
}

impl AskdbConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, or
    /// [`ConfigError::Invalid`] if it is not valid configuration.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Invalid(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Invalid(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Check values serde cannot check.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.cache_file.trim().is_empty() {
            return Err(ConfigError::Invalid("cache-file must not be empty".to_string()).into());
        }
        if self.database.driver == DriverKind::Snapshot && self.database.snapshot_file.is_none() {
            return Err(ConfigError::Invalid(
                "database.snapshot-file is required for the snapshot driver".to_string(),
            )
            .into());
        }
        if self.llm.model.trim().is_empty() || self.llm.fallback_model.trim().is_empty() {
            return Err(
                ConfigError::Invalid("llm model names must not be empty".to_string()).into(),
            );
        }
        Ok(())
    }

    /// Absolute cache path for a workspace rooted at `root`.
    #[must_use]
    pub fn cache_path(&self, root: &Path) -> PathBuf {
        root.join(&self.cache_file)
    }

    /// Absolute snapshot file path, if one is configured.
    #[must_use]
    pub fn snapshot_path(&self, root: &Path) -> Option<PathBuf> {
        self.database.snapshot_file.as_ref().map(|file| root.join(file))
    }

    /// Context reduction knobs from the `context:` section.
    #[must_use]
    pub fn policy(&self) -> ContextPolicy {
        ContextPolicy {
            size_threshold: self.context.size_threshold,
            large_database_tables: self.context.large_database_tables,
            sample_tables: self.context.sample_tables,
        }
    }

    /// Assistant settings from the `llm:` and `context:` sections.
    #[must_use]
    pub fn assistant_settings(&self) -> AssistantSettings {
        AssistantSettings {
            model: self.llm.model.clone(),
            fallback_model: self.llm.fallback_model.clone(),
            max_tokens: self.llm.max_tokens,
            max_result_rows: self.context.max_result_rows,
            policy: self.policy(),
        }
    }
}
