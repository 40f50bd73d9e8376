//! MCP tool implementations.
//!
//! Each method resolves the target workspace, releases the context lock and
//! then calls into the workspace's [`SchemaContextService`].
//!
//! [`SchemaContextService`]: askdb::service::SchemaContextService

use crate::context::Context;
use crate::error::Result;
use crate::models::{
    parse_schema_format, CacheSummary, RelationshipParams, RelationshipResponse, SchemaFormat,
    SetContextResponse, WhereAmIResponse,
};
use askdb::app::App;
use askdb::assistant::QueryAnswer;
use askdb::domain::{Column, RelationshipEdge, Schema};
use askdb::introspect::Row;
use askdb::llm::LanguageModel;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cached schema in the requested format.
#[derive(Debug, Clone)]
pub enum CachedSchema {
    /// Nested JSON document.
    Json(Schema),
    /// Compact text notation.
    Text(String),
}

/// Tool implementations for the askdb MCP server.
pub struct Tools {
    context: Arc<RwLock<Context>>,
    model: Option<Arc<dyn LanguageModel>>,
}

impl std::fmt::Debug for Tools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tools")
            .field("custom_model", &self.model.is_some())
            .finish_non_exhaustive()
    }
}

impl Tools {
    /// Create a new Tools instance with the given context.
    ///
    /// `ask` uses the model configured by each workspace.
    pub fn new(context: Arc<RwLock<Context>>) -> Self {
        Self {
            context,
            model: None,
        }
    }

    /// Use `model` for `ask` in every workspace instead of the configured one.
    #[must_use]
    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    async fn app(&self, workspace_root: Option<&str>) -> Result<Arc<App>> {
        let context = self.context.read().await;
        context.app_for(workspace_root.map(Path::new))
    }

    /// Set the workspace context.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace path is invalid or has no `.askdb/` directory.
    pub async fn set_context(&self, workspace_root: &str) -> Result<SetContextResponse> {
        let path = Path::new(workspace_root);
        let mut context = self.context.write().await;
        let info = context.set_workspace(path).await?;

        Ok(SetContextResponse {
            workspace_root: info.workspace_root.display().to_string(),
            cache_path: info.cache_path.display().to_string(),
            driver: info.driver,
            message: "Context set successfully".to_string(),
        })
    }

    /// Get current workspace information.
    ///
    /// # Errors
    ///
    /// This function does not currently return errors but returns `Result` for API consistency.
    pub async fn where_am_i(&self) -> Result<WhereAmIResponse> {
        let context = self.context.read().await;

        Ok(match context.current_info() {
            Some(info) => WhereAmIResponse {
                workspace_root: Some(info.workspace_root.display().to_string()),
                cache_path: Some(info.cache_path.display().to_string()),
                context_set: true,
            },
            None => WhereAmIResponse {
                workspace_root: None,
                cache_path: None,
                context_set: false,
            },
        })
    }

    /// Non-system databases on the server.
    ///
    /// # Errors
    ///
    /// Returns an error if no context is set or the server cannot be reached.
    pub async fn list_databases(&self, workspace_root: Option<&str>) -> Result<Vec<String>> {
        let app = self.app(workspace_root).await?;
        Ok(app.service().list_user_databases().await?)
    }

    /// Tables of one database.
    ///
    /// # Errors
    ///
    /// Returns an error if no context is set or the listing fails.
    pub async fn list_tables(
        &self,
        database: &str,
        workspace_root: Option<&str>,
    ) -> Result<Vec<String>> {
        let app = self.app(workspace_root).await?;
        Ok(app.service().list_tables(database).await?)
    }

    /// Columns of one table.
    ///
    /// # Errors
    ///
    /// Returns an error if no context is set or the table does not exist.
    pub async fn describe_table(
        &self,
        database: &str,
        table: &str,
        workspace_root: Option<&str>,
    ) -> Result<Vec<Column>> {
        let app = self.app(workspace_root).await?;
        Ok(app.service().describe_table(database, table).await?)
    }

    /// Run a read-only statement.
    ///
    /// # Errors
    ///
    /// Returns a validation error for anything but `SELECT`, `SHOW` or
    /// `DESCRIBE`, before the workspace is even looked up.
    pub async fn run_query(
        &self,
        sql: &str,
        database: &str,
        workspace_root: Option<&str>,
    ) -> Result<Vec<Row>> {
        askdb::query::ensure_read_only(sql)?;
        let app = self.app(workspace_root).await?;
        Ok(app.service().run_query(sql, database).await?)
    }

    /// Build the full schema and store it in the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if no context is set or the cache cannot be written.
    pub async fn cache_schema(
        &self,
        refresh: bool,
        workspace_root: Option<&str>,
    ) -> Result<CacheSummary> {
        let app = self.app(workspace_root).await?;
        let schema = app.service().cache_full_schema(refresh).await?;
        Ok(CacheSummary::new(&schema, cache_path(&app)))
    }

    /// Introspect the named databases and merge them into the cache.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty list or a database that cannot be introspected.
    pub async fn generate_schema(
        &self,
        databases: &[String],
        workspace_root: Option<&str>,
    ) -> Result<Schema> {
        let app = self.app(workspace_root).await?;
        Ok(app.service().build_context_for(databases).await?)
    }

    /// Replace the cache with a portable schema file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn import_schema(
        &self,
        file_path: &str,
        workspace_root: Option<&str>,
    ) -> Result<CacheSummary> {
        let app = self.app(workspace_root).await?;
        let path = resolve_in_workspace(app.root_dir(), file_path);
        let schema = app.service().import_portable_file(&path).await?;
        Ok(CacheSummary::new(&schema, cache_path(&app)))
    }

    /// The cached schema as JSON or compact text.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown format or when nothing is cached.
    pub async fn get_cached_schema(
        &self,
        format: Option<&str>,
        workspace_root: Option<&str>,
    ) -> Result<CachedSchema> {
        let format = parse_schema_format(format)?;
        let app = self.app(workspace_root).await?;
        Ok(match format {
            SchemaFormat::Json => CachedSchema::Json(app.service().cached_schema().await?),
            SchemaFormat::Text => CachedSchema::Text(app.service().export_text().await?),
        })
    }

    /// Record a relationship in the cache.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingField`] before touching the workspace if
    /// any identifying field is blank.
    pub async fn add_relationship(
        &self,
        params: &RelationshipParams,
    ) -> Result<RelationshipResponse> {
        let edge = params.to_edge()?;
        let app = self.app(params.workspace_root.as_deref()).await?;
        app.service().add_relationship(&edge).await?;

        Ok(RelationshipResponse {
            message: format!("Added relationship {edge}"),
            relationship: edge,
        })
    }

    /// Every relationship in the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if no context is set.
    pub async fn list_relationships(
        &self,
        workspace_root: Option<&str>,
    ) -> Result<Vec<RelationshipEdge>> {
        let app = self.app(workspace_root).await?;
        Ok(app.service().list_relationships().await)
    }

    /// Delete a relationship from the cache.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingField`] for a blank identifying field,
    /// or a not-found error if the edge does not exist.
    pub async fn delete_relationship(&self, params: &RelationshipParams) -> Result<String> {
        let edge = params.to_edge()?;
        let app = self.app(params.workspace_root.as_deref()).await?;
        let (source, target) = (edge.source(), edge.target());
        app.service().remove_relationship(&source, &target).await?;
        Ok(format!("Deleted relationship {source} -> {target}"))
    }

    /// Answer a question about the data.
    ///
    /// # Errors
    ///
    /// Returns an error if no context is set or no API key is configured.
    /// Failures while answering are reported inside the answer.
    pub async fn ask(
        &self,
        question: &str,
        database: Option<&str>,
        workspace_root: Option<&str>,
    ) -> Result<QueryAnswer> {
        let app = self.app(workspace_root).await?;
        let assistant = match &self.model {
            Some(model) => app.assistant_with_model(Arc::clone(model)),
            None => app.assistant()?,
        };
        Ok(assistant.answer(question, database).await)
    }
}

fn cache_path(app: &App) -> String {
    app.config().cache_path(app.root_dir()).display().to_string()
}

fn resolve_in_workspace(root: &Path, file_path: &str) -> PathBuf {
    let path = Path::new(file_path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
