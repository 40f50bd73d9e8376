//! MySQL driver built on `sqlx`.
//!
//! Statements run over the text protocol (`raw_sql`) because `SHOW` and
//! `DESCRIBE` cannot be prepared. One lazily connected pool is kept per
//! database name, plus a default pool with no database selected.

use super::{DatabaseDriver, Row};
use crate::domain::Column;
use crate::error::DriverError;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column as _, Row as _, ValueRef as _};
use std::collections::HashMap;
use tokio::sync::Mutex;

const MAX_CONNECTIONS: u32 = 10;

/// Connection settings for [`MySqlDriver`].
#[derive(Debug, Clone)]
pub struct MySqlSettings {
    /// Server host name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login user.
    pub user: String,
    /// Login password, if any.
    pub password: Option<String>,
}

/// [`DatabaseDriver`] for a MySQL-compatible server.
pub struct MySqlDriver {
    options: MySqlConnectOptions,
    pools: Mutex<HashMap<String, MySqlPool>>,
}

impl std::fmt::Debug for MySqlDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlDriver").finish_non_exhaustive()
    }
}

impl MySqlDriver {
    /// Create a driver. No connection is opened until the first statement.
    #[must_use]
    pub fn new(settings: &MySqlSettings) -> Self {
        let mut options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user);
        if let Some(password) = &settings.password {
            options = options.password(password);
        }

        Self {
            options,
            pools: Mutex::new(HashMap::new()),
        }
    }

    async fn pool(&self, database: Option<&str>) -> MySqlPool {
        let key = database.unwrap_or_default();
        let mut pools = self.pools.lock().await;
        if let Some(pool) = pools.get(key) {
            return pool.clone();
        }

        let mut options = self.options.clone();
        if let Some(database) = database {
            options = options.database(database);
        }
        tracing::debug!(database = key, "Opening connection pool");
        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_lazy_with(options);
        pools.insert(key.to_string(), pool.clone());
        pool
    }

    async fn fetch(
        &self,
        sql: &str,
        database: Option<&str>,
    ) -> Result<Vec<MySqlRow>, DriverError> {
        let pool = self.pool(database).await;
        sqlx::raw_sql(sql)
            .fetch_all(&pool)
            .await
            .map_err(map_sqlx_error)
    }
}

fn map_sqlx_error(err: sqlx::Error) -> DriverError {
    match err {
        sqlx::Error::Database(db) => DriverError::Query(db.message().to_string()),
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Configuration(_) => DriverError::Connection(err.to_string()),
        other => DriverError::Query(other.to_string()),
    }
}

fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Decode one cell, trying the common scalar types before falling back to text.
fn decode_value(row: &MySqlRow, index: usize) -> Value {
    match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(_) => {}
        Err(_) => return Value::Null,
    }

    if let Ok(v) = row.try_get::<i64, _>(index) {
        return Value::from(v);
    }
    if let Ok(v) = row.try_get::<u64, _>(index) {
        return Value::from(v);
    }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number);
    }
    if let Ok(v) = row.try_get_unchecked::<String, _>(index) {
        return Value::String(v);
    }
    if let Ok(v) = row.try_get_unchecked::<Vec<u8>, _>(index) {
        return Value::String(String::from_utf8_lossy(&v).into_owned());
    }
    Value::Null
}

fn row_to_json(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .map(|column| (column.name().to_string(), decode_value(row, column.ordinal())))
        .collect()
}

fn first_text(row: &MySqlRow) -> Option<String> {
    match decode_value(row, 0) {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl DatabaseDriver for MySqlDriver {
    async fn list_databases(&self) -> Result<Vec<String>, DriverError> {
        let rows = self.fetch("SHOW DATABASES", None).await?;
        Ok(rows.iter().filter_map(first_text).collect())
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<String>, DriverError> {
        let rows = self.fetch("SHOW TABLES", Some(database)).await?;
        Ok(rows.iter().filter_map(first_text).collect())
    }

    async fn describe_table(
        &self,
        database: &str,
        table: &str,
    ) -> Result<Vec<Column>, DriverError> {
        let sql = format!("DESCRIBE {}", quote_identifier(table));
        let rows = self.fetch(&sql, Some(database)).await?;

        rows.iter()
            .map(|row| {
                let value = serde_json::to_value(row_to_json(row))
                    .map_err(|e| DriverError::Query(e.to_string()))?;
                serde_json::from_value::<Column>(value).map_err(|e| {
                    DriverError::Query(format!("unexpected DESCRIBE row for {table}: {e}"))
                })
            })
            .collect()
    }

    async fn run_query(&self, sql: &str, database: &str) -> Result<Vec<Row>, DriverError> {
        let rows = self.fetch(sql, Some(database)).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }
}
