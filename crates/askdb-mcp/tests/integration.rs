//! Integration tests for askdb-mcp tools.
//!
//! These exercise the tools against real workspaces backed by the snapshot
//! driver and the file schema cache, covering:
//! - Context setup and multi-workspace switching
//! - Schema discovery and the cache lifecycle
//! - Relationship management and parameter validation
//! - Question answering with a scripted model

use askdb::config::AskdbConfig;
use askdb::domain::DEFAULT_RELATIONSHIP_TYPE;
use askdb::error::LlmError;
use askdb::llm::{CompletionRequest, LanguageModel};
use askdb_mcp::context::Context;
use askdb_mcp::error::Error;
use askdb_mcp::models::RelationshipParams;
use askdb_mcp::tools::{CachedSchema, Tools};
use async_trait::async_trait;
use rstest::rstest;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::RwLock;

const SHOP_SCHEMA: &str = "\
shop.orders: id(int,PK), customer_id(int,FK), total(decimal(10,2))
shop.customers: id(int,PK), email(varchar(255))

crm.contacts: id(int,PK), phone(varchar(32))
";

mod helpers {
    use super::*;
    use std::path::Path;

    /// Create a snapshot-driver workspace serving `schema`.
    pub async fn snapshot_workspace(schema: &str) -> TempDir {
        let temp = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(temp.path().join("schema.txt"), schema).expect("Failed to write schema");
        askdb::commands::init::init(temp.path(), Some("schema.txt"))
            .await
            .expect("init should succeed");
        temp
    }

    /// Create Tools instance with empty context.
    pub fn create_tools() -> Tools {
        Tools::new(Arc::new(RwLock::new(Context::new())))
    }

    /// Create Tools whose `ask` uses `model`.
    pub fn create_tools_with_model(model: ScriptedModel) -> Tools {
        create_tools().with_model(Arc::new(model))
    }

    /// Set the tools context to the given workspace path.
    pub async fn set_context(tools: &Tools, path: &Path) {
        tools
            .set_context(&path.display().to_string())
            .await
            .expect("set_context should succeed");
    }

    /// Parameters for `shop.orders.customer_id -> shop.customers.id`.
    pub fn orders_to_customers() -> RelationshipParams {
        RelationshipParams {
            source_database: "shop".into(),
            source_table: "orders".into(),
            source_column: "customer_id".into(),
            target_database: "shop".into(),
            target_table: "customers".into(),
            target_column: "id".into(),
            ..RelationshipParams::default()
        }
    }

    /// Replies with a fixed queue, recording what it was asked.
    #[derive(Clone, Default)]
    pub struct ScriptedModel {
        replies: Arc<Mutex<VecDeque<Result<String, LlmError>>>>,
        pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
    }

    impl ScriptedModel {
        pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.into())),
                requests: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyResponse))
        }
    }
}

use helpers::*;

// =============================================================================
// Context
// =============================================================================

#[tokio::test]
async fn test_error_no_context() {
    let tools = create_tools();

    let result = tools.list_databases(None).await;
    assert!(matches!(result, Err(Error::NoContext)), "got {result:?}");
}

#[tokio::test]
async fn test_set_context_and_where_am_i() {
    let workspace = snapshot_workspace(SHOP_SCHEMA).await;
    let tools = create_tools();

    let response = tools
        .set_context(&workspace.path().display().to_string())
        .await
        .unwrap();
    assert_eq!(response.driver, "snapshot");
    assert!(response.cache_path.ends_with("db_schema.json"));

    let here = tools.where_am_i().await.unwrap();
    assert!(here.context_set);
    assert_eq!(here.workspace_root, Some(response.workspace_root));
}

#[tokio::test]
async fn test_error_no_askdb_directory() {
    let temp = TempDir::new().unwrap();
    let tools = create_tools();

    let result = tools.set_context(&temp.path().display().to_string()).await;
    assert!(matches!(result, Err(Error::NoAskdbDirectory(_))), "got {result:?}");
}

#[tokio::test]
async fn test_error_workspace_not_found() {
    let tools = create_tools();

    let result = tools.set_context("/nonexistent/askdb/workspace").await;
    assert!(matches!(result, Err(Error::WorkspaceNotFound { .. })), "got {result:?}");
}

#[tokio::test]
async fn test_workspace_root_parameter_override() {
    let shop = snapshot_workspace(SHOP_SCHEMA).await;
    let hr = snapshot_workspace("hr.staff: id(int,PK), name(varchar(64))\n").await;
    let tools = create_tools();
    set_context(&tools, shop.path()).await;
    set_context(&tools, hr.path()).await;

    // The current context is the last one set
    assert_eq!(tools.list_databases(None).await.unwrap(), vec!["hr"]);

    let shop_root = shop.path().display().to_string();
    let databases = tools.list_databases(Some(&shop_root)).await.unwrap();
    assert_eq!(databases, vec!["shop", "crm"]);
}

#[tokio::test]
async fn test_error_workspace_not_initialized() {
    let shop = snapshot_workspace(SHOP_SCHEMA).await;
    let other = snapshot_workspace(SHOP_SCHEMA).await;
    let tools = create_tools();
    set_context(&tools, shop.path()).await;

    let other_root = other.path().display().to_string();
    let result = tools.list_databases(Some(&other_root)).await;
    assert!(matches!(result, Err(Error::WorkspaceNotInitialized(_))), "got {result:?}");
}

// =============================================================================
// Schema discovery
// =============================================================================

#[tokio::test]
async fn test_schema_discovery() {
    let workspace = snapshot_workspace(SHOP_SCHEMA).await;
    let tools = create_tools();
    set_context(&tools, workspace.path()).await;

    assert_eq!(tools.list_tables("shop", None).await.unwrap(), vec!["orders", "customers"]);

    let columns = tools.describe_table("shop", "orders", None).await.unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "customer_id", "total"]);
    assert!(columns[0].is_primary_key());
}

#[tokio::test]
async fn test_describe_missing_table() {
    let workspace = snapshot_workspace(SHOP_SCHEMA).await;
    let tools = create_tools();
    set_context(&tools, workspace.path()).await;

    let result = tools.describe_table("shop", "invoices", None).await;
    match result {
        Err(Error::Askdb(askdb::error::Error::NotFound(message))) => {
            assert_eq!(message, "Table invoices not found in database shop");
        }
        other => panic!("Expected NotFound, got {other:?}"),
    }
}

#[rstest]
#[case::delete("DELETE FROM shop.orders")]
#[case::update("UPDATE orders SET total = 0")]
#[case::drop("DROP TABLE orders")]
#[case::blank("   ")]
#[tokio::test]
async fn test_run_query_rejects_writes_before_context(#[case] sql: &str) {
    let tools = create_tools();

    let result = tools.run_query(sql, "shop", None).await;
    assert!(
        matches!(result, Err(Error::Askdb(askdb::error::Error::Validation(_)))),
        "got {result:?}"
    );
}

#[tokio::test]
async fn test_run_query_reports_driver_failure() {
    let workspace = snapshot_workspace(SHOP_SCHEMA).await;
    let tools = create_tools();
    set_context(&tools, workspace.path()).await;

    let err = tools
        .run_query("SELECT * FROM orders", "shop", None)
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("Query failed on database 'shop'"), "{err}");
}

// =============================================================================
// Schema cache
// =============================================================================

#[tokio::test]
async fn test_cache_lifecycle() {
    let workspace = snapshot_workspace(SHOP_SCHEMA).await;
    let tools = create_tools();
    set_context(&tools, workspace.path()).await;

    let missing = tools.get_cached_schema(None, None).await;
    assert!(
        matches!(missing, Err(Error::Askdb(askdb::error::Error::NotFound(_)))),
        "got {missing:?}"
    );

    let summary = tools.cache_schema(false, None).await.unwrap();
    assert_eq!(summary.databases, vec!["shop", "crm"]);
    assert_eq!(summary.tables, 3);
    assert!(workspace.path().join(".askdb/db_schema.json").exists());

    match tools.get_cached_schema(Some("json"), None).await.unwrap() {
        CachedSchema::Json(schema) => assert_eq!(schema.table_count(), 3),
        CachedSchema::Text(_) => panic!("Expected JSON"),
    }
    match tools.get_cached_schema(Some("text"), None).await.unwrap() {
        CachedSchema::Text(text) => {
            assert!(text.contains("shop.orders: id(int,PK)"), "{text}");
            assert!(text.contains("crm.contacts:"), "{text}");
        }
        CachedSchema::Json(_) => panic!("Expected text"),
    }
}

#[tokio::test]
async fn test_get_cached_schema_invalid_format() {
    let tools = create_tools();

    let result = tools.get_cached_schema(Some("yaml"), None).await;
    assert!(
        matches!(result, Err(Error::InvalidArgument { field: "format", .. })),
        "got {result:?}"
    );
}

#[tokio::test]
async fn test_generate_schema_for_subset() {
    let workspace = snapshot_workspace(SHOP_SCHEMA).await;
    let tools = create_tools();
    set_context(&tools, workspace.path()).await;

    let generated = tools.generate_schema(&["crm".to_string()], None).await.unwrap();
    assert_eq!(generated.database_names().collect::<Vec<_>>(), vec!["crm"]);

    let CachedSchema::Json(cached) = tools.get_cached_schema(None, None).await.unwrap() else {
        panic!("Expected JSON");
    };
    assert!(cached.contains_database("crm"));
    assert!(!cached.contains_database("shop"));

    let empty = tools.generate_schema(&[], None).await;
    assert!(
        matches!(empty, Err(Error::Askdb(askdb::error::Error::Validation(_)))),
        "got {empty:?}"
    );
}

#[tokio::test]
async fn test_import_schema_makes_cache_authoritative() {
    let workspace = snapshot_workspace(SHOP_SCHEMA).await;
    std::fs::write(
        workspace.path().join("hr.txt"),
        "hr.staff: id(int,PK), manager_id(int,FK,REF=hr.staff.id)\n",
    )
    .unwrap();
    let tools = create_tools();
    set_context(&tools, workspace.path()).await;

    let summary = tools.import_schema("hr.txt", None).await.unwrap();
    assert_eq!(summary.databases, vec!["hr"]);
    assert_eq!(summary.tables, 1);

    // The server knows nothing about `hr`; the cache answers
    let columns = tools.describe_table("hr", "staff", None).await.unwrap();
    assert_eq!(columns[1].references().len(), 1);

    let relationships = tools.list_relationships(None).await.unwrap();
    assert_eq!(relationships.len(), 1);
    assert_eq!(relationships[0].target_table, "staff");
}

#[tokio::test]
async fn test_import_missing_file() {
    let workspace = snapshot_workspace(SHOP_SCHEMA).await;
    let tools = create_tools();
    set_context(&tools, workspace.path()).await;

    assert!(tools.import_schema("nope.json", None).await.is_err());
}

// =============================================================================
// Relationships
// =============================================================================

#[tokio::test]
async fn test_relationship_lifecycle() {
    let workspace = snapshot_workspace(SHOP_SCHEMA).await;
    let tools = create_tools();
    set_context(&tools, workspace.path()).await;
    tools.cache_schema(false, None).await.unwrap();

    let added = tools.add_relationship(&orders_to_customers()).await.unwrap();
    assert_eq!(added.relationship.relationship_type, DEFAULT_RELATIONSHIP_TYPE);
    assert!(added.message.starts_with("Added relationship shop.orders.customer_id"));

    let relationships = tools.list_relationships(None).await.unwrap();
    assert_eq!(relationships, vec![added.relationship.clone()]);

    let columns = tools.describe_table("shop", "orders", None).await.unwrap();
    assert_eq!(columns[1].references().len(), 1);

    let message = tools.delete_relationship(&orders_to_customers()).await.unwrap();
    assert_eq!(
        message,
        "Deleted relationship shop.orders.customer_id -> shop.customers.id"
    );
    assert!(tools.list_relationships(None).await.unwrap().is_empty());

    let again = tools.delete_relationship(&orders_to_customers()).await;
    assert!(
        matches!(again, Err(Error::Askdb(askdb::error::Error::NotFound(_)))),
        "got {again:?}"
    );
}

#[tokio::test]
async fn test_add_relationship_updates_type() {
    let workspace = snapshot_workspace(SHOP_SCHEMA).await;
    let tools = create_tools();
    set_context(&tools, workspace.path()).await;

    tools.add_relationship(&orders_to_customers()).await.unwrap();
    let params = RelationshipParams {
        relationship_type: Some("one_to_one".into()),
        ..orders_to_customers()
    };
    tools.add_relationship(&params).await.unwrap();

    let relationships = tools.list_relationships(None).await.unwrap();
    assert_eq!(relationships.len(), 1);
    assert_eq!(relationships[0].relationship_type, "ONE_TO_ONE");
}

#[tokio::test]
async fn test_relationship_validation_precedes_context() {
    let tools = create_tools();
    let params = RelationshipParams {
        target_column: String::new(),
        ..orders_to_customers()
    };

    let added = tools.add_relationship(&params).await;
    assert!(matches!(added, Err(Error::MissingField("target_column"))), "got {added:?}");

    let deleted = tools.delete_relationship(&params).await;
    assert!(matches!(deleted, Err(Error::MissingField("target_column"))), "got {deleted:?}");
}

#[tokio::test]
async fn test_list_relationships_without_cache() {
    let workspace = snapshot_workspace(SHOP_SCHEMA).await;
    let tools = create_tools();
    set_context(&tools, workspace.path()).await;

    assert!(tools.list_relationships(None).await.unwrap().is_empty());
}

// =============================================================================
// Questions
// =============================================================================

#[tokio::test]
async fn test_ask_returns_model_refusal() {
    let workspace = snapshot_workspace(SHOP_SCHEMA).await;
    let model = ScriptedModel::new(vec![Ok("I cannot answer that from this schema.".into())]);
    let requests = Arc::clone(&model.requests);
    let tools = create_tools_with_model(model);
    set_context(&tools, workspace.path()).await;

    let answer = tools
        .ask("what is the meaning of life", None, None)
        .await
        .unwrap();

    assert_eq!(answer.query, "what is the meaning of life");
    assert!(answer.sql.is_none());
    assert!(answer.results.is_none());
    assert_eq!(answer.explanation, "I cannot answer that from this schema.");
    assert_eq!(requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_ask_reports_query_failure_in_answer() {
    let workspace = snapshot_workspace(SHOP_SCHEMA).await;
    let model = ScriptedModel::new(vec![Ok("SELECT COUNT(*) FROM orders".into())]);
    let requests = Arc::clone(&model.requests);
    let tools = create_tools_with_model(model);
    set_context(&tools, workspace.path()).await;

    let answer = tools
        .ask("how many orders are there", Some("shop"), None)
        .await
        .unwrap();

    assert!(answer.sql.is_none());
    assert!(
        answer.explanation.starts_with("I encountered an error:"),
        "{}",
        answer.explanation
    );

    let requests = requests.lock().unwrap();
    assert!(requests[0].system_prompt.contains("\"orders\""));
    assert_eq!(requests[0].user_text, "how many orders are there");
}

#[tokio::test]
async fn test_ask_requires_api_key() {
    let workspace = snapshot_workspace(SHOP_SCHEMA).await;
    let config_path = workspace.path().join(".askdb/config.yaml");
    let mut config = AskdbConfig::load(&config_path).await.unwrap();
    config.llm.api_key_env = "ASKDB_MCP_TEST_UNSET_API_KEY".to_string();
    config.save(&config_path).await.unwrap();

    let tools = create_tools();
    set_context(&tools, workspace.path()).await;

    let err = tools.ask("how many orders", None, None).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Environment variable ASKDB_MCP_TEST_UNSET_API_KEY is not set"
    );
}
