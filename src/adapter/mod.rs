//! Database adapter contract. The table manager talks to engines only through
//! [`DatabaseAdapter`]; SQL is authored with `?` placeholders and each adapter
//! translates, binds and classifies errors in its own dialect.

mod factory;
pub mod postgres;
pub mod sqlite;

pub use factory::{build_adapter, AdapterFactory};
pub use postgres::PostgresAdapter;
pub use sqlite::SqliteAdapter;

use crate::config::DatabaseType;
use crate::error::{AppError, ConstraintKind};
use crate::schema::FieldKind;
use crate::sql::SqlValue;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// One result row: column name to decoded value.
pub type Row = Map<String, Value>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub changes: u64,
    pub last_insert_id: Option<i64>,
}

/// Live column as reported by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub column_type: String,
    pub nullable: bool,
}

/// Column to emit in CREATE TABLE. `column_type` is already adapter-native.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: String,
    pub nullable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKeyDef {
    pub column: String,
    pub target_table: String,
    pub target_column: String,
    /// SQL text of the ON DELETE action, e.g. `SET NULL`.
    pub on_delete: String,
}

#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    fn database_type(&self) -> DatabaseType;

    async fn connect(&self) -> Result<(), AppError>;

    async fn disconnect(&self) -> Result<(), AppError>;

    fn is_connected(&self) -> bool;

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, AppError>;

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ExecResult, AppError>;

    /// Start a transaction on a connection of its own. Only statements sent
    /// through the returned handle join it; `query`/`execute` on the adapter never do.
    async fn begin_transaction(&self) -> Result<Box<dyn AdapterTransaction>, AppError>;

    async fn table_exists(&self, table: &str) -> Result<bool, AppError>;

    async fn get_table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, AppError>;

    /// CREATE TABLE IF NOT EXISTS with the adapter's own `id`, `created_at`, `updated_at` columns.
    async fn create_table(
        &self,
        table: &str,
        columns: &[ColumnDef],
        foreign_keys: &[ForeignKeyDef],
    ) -> Result<(), AppError>;

    /// ALTER TABLE ADD COLUMN. `column_type` may carry a REFERENCES clause.
    async fn add_column(&self, table: &str, column: &str, column_type: &str) -> Result<(), AppError>;

    /// Native column type for a field kind. Pure.
    fn map_column_type(&self, kind: FieldKind) -> &'static str;

    async fn get_all_tables(&self) -> Result<Vec<String>, AppError>;
}

/// An open transaction owned by one caller. Dropping it without `commit` rolls back.
#[async_trait]
pub trait AdapterTransaction: Send {
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, AppError>;

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ExecResult, AppError>;

    async fn commit(&mut self) -> Result<(), AppError>;

    async fn rollback(&mut self) -> Result<(), AppError>;
}

pub(crate) fn transaction_finished() -> AppError {
    AppError::Validation("transaction already committed or rolled back".into())
}

/// Map a raw sqlx error onto the taxonomy the manager reasons about.
/// `undefined_table` and `duplicate_column` are matched per engine by code or message.
pub(crate) fn classify_db_error(err: sqlx::Error, missing_table: bool, duplicate_column: bool) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if missing_table {
            return AppError::MissingTable(db.message().to_string());
        }
        if duplicate_column {
            return AppError::DuplicateColumn(db.message().to_string());
        }
        let kind = match db.kind() {
            sqlx::error::ErrorKind::ForeignKeyViolation => Some(ConstraintKind::ForeignKey),
            sqlx::error::ErrorKind::UniqueViolation => Some(ConstraintKind::Unique),
            sqlx::error::ErrorKind::NotNullViolation => Some(ConstraintKind::NotNull),
            sqlx::error::ErrorKind::CheckViolation => Some(ConstraintKind::Check),
            _ => None,
        };
        if let Some(kind) = kind {
            return AppError::ConstraintViolation {
                kind,
                message: db.message().to_string(),
            };
        }
    }
    AppError::Db(err)
}

pub(crate) fn number_from_f64(f: f64) -> Value {
    serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// CREATE TABLE text shared by both engines; only the id and timestamp types differ.
pub(crate) fn render_create_table(
    table: &str,
    id_type: &str,
    timestamp_type: &str,
    columns: &[ColumnDef],
    foreign_keys: &[ForeignKeyDef],
) -> String {
    use crate::sql::quoted;

    let mut defs = vec![format!("{} {} PRIMARY KEY", quoted("id"), id_type)];
    for c in columns {
        let mut def = format!("{} {}", quoted(&c.name), c.column_type);
        if !c.nullable {
            def.push_str(" NOT NULL");
        }
        defs.push(def);
    }
    for name in ["created_at", "updated_at"] {
        defs.push(format!("{} {} DEFAULT CURRENT_TIMESTAMP", quoted(name), timestamp_type));
    }
    for fk in foreign_keys {
        defs.push(format!(
            "FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
            quoted(&fk.column),
            quoted(&fk.target_table),
            quoted(&fk.target_column),
            fk.on_delete
        ));
    }
    format!("CREATE TABLE IF NOT EXISTS {} (\n  {}\n)", quoted(table), defs.join(",\n  "))
}

pub(crate) fn render_add_column(table: &str, column: &str, column_type: &str) -> String {
    use crate::sql::quoted;
    format!("ALTER TABLE {} ADD COLUMN {} {}", quoted(table), quoted(column), column_type)
}
