//! MCP server implementation.
//!
//! This module contains the main server setup using rmcp.

use crate::context::Context;
use crate::error::Error;
use crate::models::{
    AskParams, CacheSchemaParams, DescribeTableParams, GenerateSchemaParams, GetCachedSchemaParams,
    ImportSchemaParams, ListTablesParams, RelationshipParams, RunQueryParams, SetContextParams,
    WorkspaceParams,
};
use crate::tools::{CachedSchema, Tools};
use askdb::llm::LanguageModel;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::transport::stdio;
use rmcp::{
    handler::server::ServerHandler, tool, tool_handler, tool_router, ErrorData as McpError,
    ServiceExt,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The askdb MCP server.
///
/// Provides MCP protocol handling over stdio transport.
#[derive(Clone)]
pub struct AskdbMcpServer {
    /// Shared context for workspace management.
    context: Arc<RwLock<Context>>,
    /// Tool implementations.
    tools: Arc<Tools>,
    /// Tool router for MCP dispatch.
    tool_router: ToolRouter<Self>,
}

/// Caller mistakes become `invalid_params`, everything else `internal_error`.
fn to_mcp_error(error: Error) -> McpError {
    match error {
        Error::InvalidArgument { .. }
        | Error::MissingField(_)
        | Error::Askdb(askdb::error::Error::Validation(_)) => {
            McpError::invalid_params(error.to_string(), None)
        }
        other => McpError::internal_error(other.to_string(), None),
    }
}

fn json_result<T: serde::Serialize>(
    result: crate::error::Result<T>,
) -> std::result::Result<CallToolResult, McpError> {
    match result {
        Ok(value) => Ok(CallToolResult::success(vec![Content::json(value)?])),
        Err(e) => Err(to_mcp_error(e)),
    }
}

fn text_result(result: crate::error::Result<String>) -> std::result::Result<CallToolResult, McpError> {
    match result {
        Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
        Err(e) => Err(to_mcp_error(e)),
    }
}

#[tool_router]
impl AskdbMcpServer {
    /// Set the workspace context for subsequent operations.
    #[tool(
        description = "Set the workspace root directory (containing .askdb/) for all subsequent operations. Call this first before using other tools."
    )]
    async fn set_context(
        &self,
        Parameters(params): Parameters<SetContextParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        json_result(self.tools.set_context(&params.workspace_root).await)
    }

    /// Get current workspace context information.
    #[tool(description = "Show current workspace context and schema cache path. Useful for debugging.")]
    async fn where_am_i(&self) -> std::result::Result<CallToolResult, McpError> {
        json_result(self.tools.where_am_i().await)
    }

    /// List user databases.
    #[tool(description = "List the databases on the server, excluding system databases.")]
    async fn list_databases(
        &self,
        Parameters(params): Parameters<WorkspaceParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        json_result(self.tools.list_databases(params.workspace_root.as_deref()).await)
    }

    /// List the tables of a database.
    #[tool(description = "List the tables of one database.")]
    async fn list_tables(
        &self,
        Parameters(params): Parameters<ListTablesParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        json_result(
            self.tools
                .list_tables(&params.database, params.workspace_root.as_deref())
                .await,
        )
    }

    /// Describe one table.
    #[tool(
        description = "Describe one table: column names, types, keys and any recorded references. Served from the schema cache when it knows the database."
    )]
    async fn describe_table(
        &self,
        Parameters(params): Parameters<DescribeTableParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        json_result(
            self.tools
                .describe_table(&params.database, &params.table, params.workspace_root.as_deref())
                .await,
        )
    }

    /// Run a read-only query.
    #[tool(
        description = "Run a read-only SQL statement (SELECT, SHOW or DESCRIBE) against a database and return the rows."
    )]
    async fn run_query(
        &self,
        Parameters(params): Parameters<RunQueryParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        json_result(
            self.tools
                .run_query(&params.sql, &params.database, params.workspace_root.as_deref())
                .await,
        )
    }

    /// Cache the full schema.
    #[tool(
        description = "Introspect every user database and store the schema in the cache. An existing cache is kept unless refresh is true; refreshing drops recorded relationships."
    )]
    async fn cache_schema(
        &self,
        Parameters(params): Parameters<CacheSchemaParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        json_result(
            self.tools
                .cache_schema(params.refresh.unwrap_or(false), params.workspace_root.as_deref())
                .await,
        )
    }

    /// Generate and cache the schema of some databases.
    #[tool(
        description = "Introspect the named databases, merge them into the schema cache and return the generated schema."
    )]
    async fn generate_schema(
        &self,
        Parameters(params): Parameters<GenerateSchemaParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        json_result(
            self.tools
                .generate_schema(&params.databases, params.workspace_root.as_deref())
                .await,
        )
    }

    /// Import a portable schema file.
    #[tool(
        description = "Replace the schema cache with a portable schema file: JSON (.json) or the compact text notation (.txt)."
    )]
    async fn import_schema(
        &self,
        Parameters(params): Parameters<ImportSchemaParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        json_result(
            self.tools
                .import_schema(&params.file_path, params.workspace_root.as_deref())
                .await,
        )
    }

    /// Fetch the cached schema.
    #[tool(
        description = "Return the cached schema, as JSON (format=json, default) or in the compact text notation (format=text)."
    )]
    async fn get_cached_schema(
        &self,
        Parameters(params): Parameters<GetCachedSchemaParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        match self
            .tools
            .get_cached_schema(params.format.as_deref(), params.workspace_root.as_deref())
            .await
        {
            Ok(CachedSchema::Json(schema)) => {
                Ok(CallToolResult::success(vec![Content::json(schema)?]))
            }
            Ok(CachedSchema::Text(text)) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(e) => Err(to_mcp_error(e)),
        }
    }

    /// Record a relationship.
    #[tool(
        description = "Record a relationship from a source column to a target column in the schema cache. All six database/table/column fields are required; relationship_type defaults to MANY_TO_ONE."
    )]
    async fn add_relationship(
        &self,
        Parameters(params): Parameters<RelationshipParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        json_result(self.tools.add_relationship(&params).await)
    }

    /// List relationships.
    #[tool(description = "List every relationship recorded in the schema cache.")]
    async fn list_relationships(
        &self,
        Parameters(params): Parameters<WorkspaceParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        json_result(
            self.tools
                .list_relationships(params.workspace_root.as_deref())
                .await,
        )
    }

    /// Delete a relationship.
    #[tool(
        description = "Delete the relationship between a source column and a target column from the schema cache. All six database/table/column fields are required."
    )]
    async fn delete_relationship(
        &self,
        Parameters(params): Parameters<RelationshipParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        text_result(self.tools.delete_relationship(&params).await)
    }

    /// Answer a question in plain language.
    #[tool(
        description = "Answer a question about the data: generates SQL from the schema, runs it and explains the rows. Returns the question, the SQL, the rows and the explanation."
    )]
    async fn ask(
        &self,
        Parameters(params): Parameters<AskParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        json_result(
            self.tools
                .ask(
                    &params.question,
                    params.database.as_deref(),
                    params.workspace_root.as_deref(),
                )
                .await,
        )
    }
}

impl AskdbMcpServer {
    /// Create a new askdb MCP server.
    #[must_use]
    pub fn new() -> Self {
        let context = Arc::new(RwLock::new(Context::new()));
        let tools = Tools::new(Arc::clone(&context));
        Self::with_tools(context, tools)
    }

    /// Create a server whose `ask` tool uses `model` in every workspace.
    #[must_use]
    pub fn with_model(model: Arc<dyn LanguageModel>) -> Self {
        let context = Arc::new(RwLock::new(Context::new()));
        let tools = Tools::new(Arc::clone(&context)).with_model(model);
        Self::with_tools(context, tools)
    }

    fn with_tools(context: Arc<RwLock<Context>>, tools: Tools) -> Self {
        Self {
            context,
            tools: Arc::new(tools),
            tool_router: Self::tool_router(),
        }
    }

    /// Get a reference to the context.
    #[must_use]
    pub fn context(&self) -> &Arc<RwLock<Context>> {
        &self.context
    }

    /// Use the workspace enclosing `start`, if there is one.
    ///
    /// Returns `false` when none was found; tools then wait for `set_context`.
    pub async fn discover_workspace(&self, start: &Path) -> bool {
        let mut context = self.context.write().await;
        match context.discover_and_set_workspace(start).await {
            Ok(info) => {
                tracing::info!(
                    workspace = %info.workspace_root.display(),
                    "Using discovered workspace"
                );
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "No workspace discovered at startup");
                false
            }
        }
    }

    /// Serve MCP over stdin/stdout until the client disconnects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Mcp`] if the handshake fails or the service stops abnormally.
    pub async fn run(self) -> crate::error::Result<()> {
        let service = self
            .serve(stdio())
            .await
            .map_err(|e| Error::Mcp(e.to_string()))?;
        service
            .waiting()
            .await
            .map_err(|e| Error::Mcp(e.to_string()))?;
        Ok(())
    }
}

impl Default for AskdbMcpServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_handler]
impl ServerHandler for AskdbMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "askdb-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "askdb MCP server for schema context and natural-language questions over MySQL. \
                 Call set_context first to set the workspace."
                    .into(),
            ),
        }
    }
}
