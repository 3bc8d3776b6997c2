#![allow(dead_code)]

use async_trait::async_trait;
use dynamic_table_sdk::adapter::{
    AdapterTransaction, ColumnDef, ColumnInfo, DatabaseAdapter, ExecResult, ForeignKeyDef, Row,
};
use dynamic_table_sdk::{
    AppError, DatabaseType, DynamicTableManager, FieldKind, Record, SchemaStore, SqlValue, SqliteAdapter,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// SQLite adapter that counts the statements the manager sends through it.
///
/// Like PostgreSQL, it refuses a REFERENCES to a table that does not exist yet
/// (SQLite itself would accept it). With `racing_add_column` set, every
/// `add_column` succeeds but reports `DuplicateColumn`, as if another writer got there first.
pub struct CountingAdapter {
    inner: SqliteAdapter,
    pub queries: AtomicUsize,
    pub ddl: AtomicUsize,
    pub racing_add_column: AtomicBool,
}

impl CountingAdapter {
    pub async fn in_memory() -> Arc<Self> {
        Arc::new(CountingAdapter {
            inner: SqliteAdapter::in_memory().await.unwrap(),
            queries: AtomicUsize::new(0),
            ddl: AtomicUsize::new(0),
            racing_add_column: AtomicBool::new(false),
        })
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn ddl(&self) -> usize {
        self.ddl.load(Ordering::SeqCst)
    }

    pub fn race_add_column(&self, on: bool) {
        self.racing_add_column.store(on, Ordering::SeqCst);
    }

    async fn require_table(&self, table: &str) -> Result<(), AppError> {
        if self.inner.table_exists(table).await? {
            Ok(())
        } else {
            Err(AppError::MissingTable(format!("relation \"{}\" does not exist", table)))
        }
    }

    pub fn reset(&self) {
        self.queries.store(0, Ordering::SeqCst);
        self.ddl.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl DatabaseAdapter for CountingAdapter {
    fn database_type(&self) -> DatabaseType {
        self.inner.database_type()
    }

    async fn connect(&self) -> Result<(), AppError> {
        self.inner.connect().await
    }

    async fn disconnect(&self) -> Result<(), AppError> {
        self.inner.disconnect().await
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, AppError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ExecResult, AppError> {
        self.inner.execute(sql, params).await
    }

    async fn begin_transaction(&self) -> Result<Box<dyn AdapterTransaction>, AppError> {
        self.inner.begin_transaction().await
    }

    async fn table_exists(&self, table: &str) -> Result<bool, AppError> {
        self.inner.table_exists(table).await
    }

    async fn get_table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, AppError> {
        self.inner.get_table_columns(table).await
    }

    async fn create_table(
        &self,
        table: &str,
        columns: &[ColumnDef],
        foreign_keys: &[ForeignKeyDef],
    ) -> Result<(), AppError> {
        self.ddl.fetch_add(1, Ordering::SeqCst);
        for fk in foreign_keys.iter().filter(|fk| fk.target_table != table) {
            self.require_table(&fk.target_table).await?;
        }
        self.inner.create_table(table, columns, foreign_keys).await
    }

    async fn add_column(&self, table: &str, column: &str, column_type: &str) -> Result<(), AppError> {
        self.ddl.fetch_add(1, Ordering::SeqCst);
        if let Some(target) = column_type
            .split("REFERENCES \"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
        {
            self.require_table(target).await?;
        }
        self.inner.add_column(table, column, column_type).await?;
        if self.racing_add_column.load(Ordering::SeqCst) {
            return Err(AppError::DuplicateColumn(format!("duplicate column name: {}", column)));
        }
        Ok(())
    }

    fn map_column_type(&self, kind: FieldKind) -> &'static str {
        self.inner.map_column_type(kind)
    }

    async fn get_all_tables(&self) -> Result<Vec<String>, AppError> {
        self.inner.get_all_tables().await
    }
}

pub struct Harness {
    pub manager: DynamicTableManager,
    pub adapter: Arc<CountingAdapter>,
    pub dir: TempDir,
}

pub async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let adapter = CountingAdapter::in_memory().await;
    let store = Arc::new(SchemaStore::new(dir.path()));
    let manager = DynamicTableManager::new(adapter.clone(), store);
    Harness { manager, adapter, dir }
}

pub fn record(v: Value) -> Record {
    v.as_object().cloned().expect("record literal must be an object")
}

pub fn id_of(rec: &Record) -> String {
    rec.get("id").and_then(Value::as_str).unwrap().to_string()
}
