//! SQLite adapter using sqlx.
//!
//! One shared connection (pool of size 1) so in-memory databases keep a single
//! handle. A transaction holds that connection until it ends; other statements
//! wait for it instead of joining it. Foreign keys are switched on per connection.

use crate::adapter::{
    classify_db_error, number_from_f64, render_add_column, render_create_table, transaction_finished,
    AdapterTransaction, ColumnDef, ColumnInfo, DatabaseAdapter, ExecResult, ForeignKeyDef, Row,
};
use crate::config::{DatabaseType, SqliteConfig};
use crate::error::AppError;
use crate::schema::FieldKind;
use crate::sql::SqlValue;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteQueryResult,
    SqliteRow,
};
use sqlx::{Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::sync::RwLock;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SqliteAdapter {
    config: SqliteConfig,
    pool: RwLock<Option<SqlitePool>>,
}

impl std::fmt::Debug for SqliteAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteAdapter")
            .field("path", &self.config.path)
            .finish_non_exhaustive()
    }
}

impl SqliteAdapter {
    pub fn new(config: SqliteConfig) -> Self {
        SqliteAdapter {
            config,
            pool: RwLock::new(None),
        }
    }

    /// Connected in-memory adapter; handy for tests and scratch work.
    pub async fn in_memory() -> Result<Self, AppError> {
        let adapter = SqliteAdapter::new(SqliteConfig::in_memory());
        adapter.connect().await?;
        Ok(adapter)
    }

    fn pool(&self) -> Result<SqlitePool, AppError> {
        self.pool
            .read()
            .ok()
            .and_then(|p| p.clone())
            .ok_or_else(|| AppError::AdapterConnection("sqlite adapter is not connected".into()))
    }

    async fn connect_options(&self) -> Result<SqliteConnectOptions, AppError> {
        if self.config.is_memory() {
            return Ok(SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true));
        }
        if let Some(parent) = Path::new(&self.config.path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(SqliteConnectOptions::new()
            .filename(&self.config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true))
    }
}

fn classify(err: sqlx::Error) -> AppError {
    let (missing_table, duplicate_column) = match &err {
        sqlx::Error::Database(db) => {
            let msg = db.message();
            (msg.contains("no such table"), msg.contains("duplicate column name"))
        }
        _ => (false, false),
    };
    classify_db_error(err, missing_table, duplicate_column)
}

fn bind_params<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for p in params {
        query = match p {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Integer(n) => query.bind(*n),
            SqlValue::Real(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Date(d) => query.bind(SqlValue::iso_date(d)),
            SqlValue::Timestamp(ts) => query.bind(SqlValue::iso_timestamp(ts)),
        };
    }
    query
}

fn exec_result(result: SqliteQueryResult) -> ExecResult {
    ExecResult {
        changes: result.rows_affected(),
        last_insert_id: Some(result.last_insert_rowid()),
    }
}

fn row_to_json(row: &SqliteRow) -> Row {
    use sqlx::Column;
    use sqlx::Row as _;
    let mut map = Row::new();
    for (idx, col) in row.columns().iter().enumerate() {
        map.insert(col.name().to_string(), cell_to_value(row, idx));
    }
    map
}

fn cell_to_value(row: &SqliteRow, idx: usize) -> Value {
    use sqlx::Row as _;
    use sqlx::{TypeInfo, ValueRef};
    let raw = match row.try_get_raw(idx) {
        Ok(raw) => raw,
        Err(_) => return Value::Null,
    };
    if raw.is_null() {
        return Value::Null;
    }
    let type_name = raw.type_info().name().to_uppercase();
    match type_name.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => {
            if let Ok(n) = row.try_get::<i64, _>(idx) {
                return Value::Number(n.into());
            }
        }
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
            if let Ok(f) = row.try_get::<f64, _>(idx) {
                return number_from_f64(f);
            }
        }
        "BLOB" => {
            if let Ok(bytes) = row.try_get::<Vec<u8>, _>(idx) {
                return Value::String(String::from_utf8_lossy(&bytes).into_owned());
            }
        }
        _ => {}
    }
    if let Ok(s) = row.try_get::<String, _>(idx) {
        return Value::String(s);
    }
    if let Ok(n) = row.try_get::<i64, _>(idx) {
        return Value::Number(n.into());
    }
    if let Ok(f) = row.try_get::<f64, _>(idx) {
        return number_from_f64(f);
    }
    Value::Null
}

#[async_trait]
impl DatabaseAdapter for SqliteAdapter {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    async fn connect(&self) -> Result<(), AppError> {
        if self.is_connected() {
            return Ok(());
        }
        let options = self.connect_options().await?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| AppError::AdapterConnection(format!("sqlite {}: {}", self.config.path, e)))?;
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .map_err(|e| AppError::AdapterConnection(format!("enable foreign keys: {}", e)))?;
        if let Ok(mut slot) = self.pool.write() {
            *slot = Some(pool);
        }
        tracing::info!(path = %self.config.path, "sqlite adapter connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), AppError> {
        let pool = self.pool.write().ok().and_then(|mut slot| slot.take());
        if let Some(pool) = pool {
            pool.close().await;
            tracing::info!(path = %self.config.path, "sqlite adapter disconnected");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.pool
            .read()
            .map(|p| p.as_ref().map(|pool| !pool.is_closed()).unwrap_or(false))
            .unwrap_or(false)
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, AppError> {
        tracing::debug!(sql = %sql, params = params.len(), "query");
        let pool = self.pool()?;
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&pool)
            .await
            .map_err(classify)?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ExecResult, AppError> {
        tracing::debug!(sql = %sql, params = params.len(), "execute");
        let pool = self.pool()?;
        let result = bind_params(sqlx::query(sql), params)
            .execute(&pool)
            .await
            .map_err(classify)?;
        Ok(exec_result(result))
    }

    async fn begin_transaction(&self) -> Result<Box<dyn AdapterTransaction>, AppError> {
        let tx = self.pool()?.begin().await.map_err(classify)?;
        tracing::debug!(path = %self.config.path, "transaction started");
        Ok(Box::new(SqliteTransaction { tx: Some(tx) }))
    }

    async fn table_exists(&self, table: &str) -> Result<bool, AppError> {
        let rows = self
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
                &[SqlValue::from(table)],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn get_table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, AppError> {
        let rows = self
            .query(
                "SELECT name, type, \"notnull\" FROM pragma_table_info(?)",
                &[SqlValue::from(table)],
            )
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|r| {
                let name = r.get("name")?.as_str()?.to_string();
                let column_type = r.get("type").and_then(Value::as_str).unwrap_or("").to_string();
                let not_null = r.get("notnull").and_then(Value::as_i64).unwrap_or(0) != 0;
                Some(ColumnInfo {
                    name,
                    column_type,
                    nullable: !not_null,
                })
            })
            .collect())
    }

    async fn create_table(
        &self,
        table: &str,
        columns: &[ColumnDef],
        foreign_keys: &[ForeignKeyDef],
    ) -> Result<(), AppError> {
        let sql = render_create_table(table, "TEXT", "DATETIME", columns, foreign_keys);
        tracing::info!(table, columns = columns.len(), "create table");
        self.execute(&sql, &[]).await?;
        Ok(())
    }

    async fn add_column(&self, table: &str, column: &str, column_type: &str) -> Result<(), AppError> {
        let sql = render_add_column(table, column, column_type);
        tracing::info!(table, column, column_type, "add column");
        self.execute(&sql, &[]).await?;
        Ok(())
    }

    fn map_column_type(&self, kind: FieldKind) -> &'static str {
        sqlite_column_type(kind)
    }

    async fn get_all_tables(&self) -> Result<Vec<String>, AppError> {
        let rows = self
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                &[],
            )
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|r| r.get("name").and_then(Value::as_str).map(String::from))
            .collect())
    }
}

/// Transaction holding the adapter's connection until commit or rollback.
pub struct SqliteTransaction {
    tx: Option<Transaction<'static, Sqlite>>,
}

impl SqliteTransaction {
    fn open(&mut self) -> Result<&mut Transaction<'static, Sqlite>, AppError> {
        self.tx.as_mut().ok_or_else(transaction_finished)
    }
}

#[async_trait]
impl AdapterTransaction for SqliteTransaction {
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, AppError> {
        tracing::debug!(sql = %sql, params = params.len(), "query in transaction");
        let tx = self.open()?;
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&mut **tx)
            .await
            .map_err(classify)?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ExecResult, AppError> {
        tracing::debug!(sql = %sql, params = params.len(), "execute in transaction");
        let tx = self.open()?;
        let result = bind_params(sqlx::query(sql), params)
            .execute(&mut **tx)
            .await
            .map_err(classify)?;
        Ok(exec_result(result))
    }

    async fn commit(&mut self) -> Result<(), AppError> {
        match self.tx.take() {
            Some(tx) => tx.commit().await.map_err(classify),
            None => Err(transaction_finished()),
        }
    }

    async fn rollback(&mut self) -> Result<(), AppError> {
        match self.tx.take() {
            Some(tx) => tx.rollback().await.map_err(classify),
            None => Err(transaction_finished()),
        }
    }
}

pub fn sqlite_column_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::String
        | FieldKind::Text
        | FieldKind::Email
        | FieldKind::Date
        | FieldKind::Datetime
        | FieldKind::Json
        | FieldKind::Relation => "TEXT",
        FieldKind::Integer | FieldKind::Boolean => "INTEGER",
        FieldKind::Decimal => "REAL",
    }
}
