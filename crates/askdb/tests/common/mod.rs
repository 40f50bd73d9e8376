//! Common test utilities shared across integration tests.
#![allow(dead_code)]

use askdb::domain::{Column, ColumnRef, DatabaseSchema, KeyKind, Reference, Schema};
use askdb::error::{DriverError, LlmError};
use askdb::introspect::{DatabaseDriver, Row, SnapshotDriver};
use askdb::llm::{CompletionRequest, LanguageModel};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Run the askdb binary in the specified directory with colors off.
pub fn run_askdb_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_askdb"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("OPENAI_API_KEY")
        .output()
        .expect("Failed to execute askdb binary")
}

/// `shop` with `orders` and `customers`, plus a `crm` database and the
/// `mysql` system database.
pub fn shop_schema() -> Schema {
    let mut schema = Schema::new();
    schema.insert_database("mysql", {
        let mut tables = DatabaseSchema::new();
        tables.insert("user".into(), vec![Column::new("Host").with_type("char(255)")]);
        tables
    });
    *schema.ensure_table("shop", "orders") = vec![
        Column::new("id").with_type("int").with_key(KeyKind::Primary),
        Column::new("customer_id").with_type("int").with_key(KeyKind::Foreign),
        Column::new("total").with_type("decimal(10,2)"),
    ];
    *schema.ensure_table("shop", "customers") = vec![
        Column::new("id").with_type("int").with_key(KeyKind::Primary),
        Column::new("email").with_type("varchar(255)"),
    ];
    *schema.ensure_table("crm", "contacts") = vec![
        Column::new("id").with_type("int").with_key(KeyKind::Primary),
        Column::new("phone").with_type("varchar(32)"),
    ];
    schema
}

/// A reference from `source` to `target` with the default type.
pub fn reference(target: &str) -> Reference {
    Reference::new(&ColumnRef::parse(target).expect("valid column address"))
}

/// Build a result row from `(column, value)` pairs.
pub fn row(pairs: &[(&str, serde_json::Value)]) -> Row {
    pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
}

/// Driver that counts introspection calls before delegating.
pub struct CountingDriver {
    inner: SnapshotDriver,
    describe_calls: AtomicUsize,
}

impl CountingDriver {
    pub fn new(inner: SnapshotDriver) -> Self {
        Self {
            inner,
            describe_calls: AtomicUsize::new(0),
        }
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseDriver for CountingDriver {
    async fn list_databases(&self) -> Result<Vec<String>, DriverError> {
        self.inner.list_databases().await
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<String>, DriverError> {
        self.inner.list_tables(database).await
    }

    async fn describe_table(
        &self,
        database: &str,
        table: &str,
    ) -> Result<Vec<Column>, DriverError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.describe_table(database, table).await
    }

    async fn run_query(&self, sql: &str, database: &str) -> Result<Vec<Row>, DriverError> {
        self.inner.run_query(sql, database).await
    }
}

/// Driver whose listed database `broken` fails every call.
pub struct PartlyBrokenDriver {
    pub inner: SnapshotDriver,
}

#[async_trait]
impl DatabaseDriver for PartlyBrokenDriver {
    async fn list_databases(&self) -> Result<Vec<String>, DriverError> {
        let mut names = self.inner.list_databases().await?;
        names.push("broken".to_string());
        Ok(names)
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<String>, DriverError> {
        if database == "broken" {
            return Err(DriverError::Connection("access denied".to_string()));
        }
        self.inner.list_tables(database).await
    }

    async fn describe_table(
        &self,
        database: &str,
        table: &str,
    ) -> Result<Vec<Column>, DriverError> {
        self.inner.describe_table(database, table).await
    }

    async fn run_query(&self, sql: &str, database: &str) -> Result<Vec<Row>, DriverError> {
        self.inner.run_query(sql, database).await
    }
}

/// Language model that replays scripted replies and records every request.
#[derive(Clone, Default)]
pub struct ScriptedModel {
    replies: Arc<Mutex<VecDeque<Result<String, LlmError>>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::default(),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
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
