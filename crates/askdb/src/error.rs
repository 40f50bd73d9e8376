//! Error types for askdb operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The error type for askdb operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization or parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Requested table, column, edge or cache entry does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Live database could not be introspected.
    #[error(transparent)]
    Introspection(#[from] IntrospectionError),

    /// Portable schema file could not be parsed.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// The language model rejected the request for token or rate limits.
    #[error("Model limit reached: {0}")]
    ModelLimit(String),

    /// Any other language model failure.
    #[error("Language model error: {0}")]
    Llm(String),

    /// Caller input rejected before any external call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A statement failed while executing against a database.
    #[error("Query failed on database '{database}': {source}")]
    Query {
        /// Database the statement ran against.
        database: String,
        /// Driver failure.
        #[source]
        source: DriverError,
    },
}

/// Configuration and workspace errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `.askdb/` directory in the current directory or any parent.
    #[error("Not an askdb workspace (no .askdb directory found). Run 'askdb init' first.")]
    NotInitialized,

    /// `askdb init` ran in a directory that already has `.askdb/`.
    #[error("askdb is already initialized here. Found existing '{0}'")]
    AlreadyInitialized(PathBuf),

    /// The configuration file could not be parsed or written.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// A required environment variable is unset.
    #[error("Environment variable {0} is not set")]
    MissingEnv(String),

    /// The configured driver is not available in this build.
    #[error("Database driver '{0}' is not available in this build")]
    UnsupportedDriver(String),
}

/// Failure reported by a [`crate::introspect::DatabaseDriver`].
#[derive(Debug, Error)]
pub enum DriverError {
    /// The server could not be reached or refused the connection.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The server rejected the statement.
    #[error("query rejected: {0}")]
    Query(String),

    /// The driver does not support the operation.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// A live database could not be introspected.
#[derive(Debug, Error)]
#[error("Failed to introspect {target}: {source}")]
pub struct IntrospectionError {
    /// `database` or `database.table` that failed.
    pub target: String,
    /// Underlying driver failure.
    #[source]
    pub source: DriverError,
}

impl IntrospectionError {
    /// Failure while listing databases.
    #[must_use]
    pub fn server(source: DriverError) -> Self {
        Self {
            target: "server".to_string(),
            source,
        }
    }

    /// Failure scoped to one database.
    pub fn database(database: impl Into<String>, source: DriverError) -> Self {
        Self {
            target: database.into(),
            source,
        }
    }

    /// Failure scoped to one table.
    #[must_use]
    pub fn table(database: &str, table: &str, source: DriverError) -> Self {
        Self {
            target: format!("{database}.{table}"),
            source,
        }
    }
}

/// A portable schema file could not be parsed by any codec.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The file could not be read.
    #[error("Cannot read schema file {path}: {source}")]
    Unreadable {
        /// File that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The file is not valid schema JSON.
    #[error("Invalid schema JSON in {path}: {source}")]
    InvalidJson {
        /// File that failed.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The file holds no recognizable table definitions.
    #[error("No table definitions found in {0}")]
    NoTables(PathBuf),
}

/// Failure reported by a [`crate::llm::LanguageModel`].
#[derive(Debug, Error)]
pub enum LlmError {
    /// Token or rate limit; the caller may retry once with a reduced request.
    #[error("{0}")]
    ModelLimit(String),

    /// The request could not be sent or the response not read.
    #[error("request failed: {0}")]
    Request(String),

    /// The service answered with an error status.
    #[error("service returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },

    /// The service answered without any content.
    #[error("empty completion")]
    EmptyResponse,
}

impl From<LlmError> for Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::ModelLimit(message) => Self::ModelLimit(message),
            other => Self::Llm(other.to_string()),
        }
    }
}

/// A specialized Result type for askdb operations.
pub type Result<T> = std::result::Result<T, Error>;
