//! PostgreSQL adapter using a sqlx pool.

use crate::adapter::{
    classify_db_error, number_from_f64, render_add_column, render_create_table, transaction_finished,
    AdapterTransaction, ColumnDef, ColumnInfo, DatabaseAdapter, ExecResult, ForeignKeyDef, Row,
};
use crate::config::{DatabaseType, PostgresConfig};
use crate::error::AppError;
use crate::schema::FieldKind;
use crate::sql::SqlValue;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow, PgSslMode, PgTypeInfo, Postgres};
use sqlx::{Database, Transaction};
use std::sync::RwLock;
use std::time::Duration;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// A [`SqlValue`] bound with the Postgres type that matches its variant.
/// NULL goes out untyped so the server infers it from context.
#[derive(Clone, Debug)]
pub enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl From<&SqlValue> for PgBindValue {
    fn from(v: &SqlValue) -> Self {
        match v {
            SqlValue::Null => PgBindValue::Null,
            SqlValue::Bool(b) => PgBindValue::Bool(*b),
            SqlValue::Integer(n) => PgBindValue::I64(*n),
            SqlValue::Real(f) => PgBindValue::F64(*f),
            SqlValue::Text(s) => PgBindValue::String(s.clone()),
            SqlValue::Date(d) => PgBindValue::Date(*d),
            SqlValue::Timestamp(ts) => PgBindValue::Timestamp(*ts),
        }
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            PgBindValue::Null => IsNull::Yes,
            PgBindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::String(s) => {
                let s_ref: &str = s.as_str();
                <&str as Encode<Postgres>>::encode_by_ref(&s_ref, buf)?
            }
            PgBindValue::Date(d) => <NaiveDate as Encode<Postgres>>::encode_by_ref(d, buf)?,
            PgBindValue::Timestamp(ts) => <NaiveDateTime as Encode<Postgres>>::encode_by_ref(ts, buf)?,
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            PgBindValue::Null => PgTypeInfo::with_oid(Oid(0)),
            PgBindValue::Bool(_) => PgTypeInfo::with_name("BOOL"),
            PgBindValue::I64(_) => PgTypeInfo::with_name("INT8"),
            PgBindValue::F64(_) => PgTypeInfo::with_name("FLOAT8"),
            PgBindValue::String(_) => PgTypeInfo::with_name("TEXT"),
            PgBindValue::Date(_) => PgTypeInfo::with_name("DATE"),
            PgBindValue::Timestamp(_) => PgTypeInfo::with_name("TIMESTAMP"),
        })
    }
}

impl sqlx::Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}

/// Rewrite `?` placeholders to `$1, $2, ...`. Question marks inside quoted
/// literals or identifiers are left alone.
pub fn translate_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut n = 0;
    let mut in_single = false;
    let mut in_double = false;
    for c in sql.chars() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '?' if !in_single && !in_double => {
                n += 1;
                out.push('$');
                out.push_str(&n.to_string());
                continue;
            }
            _ => {}
        }
        out.push(c);
    }
    out
}

pub struct PostgresAdapter {
    config: PostgresConfig,
    pool: RwLock<Option<PgPool>>,
}

impl std::fmt::Debug for PostgresAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresAdapter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PostgresAdapter {
    pub fn new(config: PostgresConfig) -> Self {
        PostgresAdapter {
            config,
            pool: RwLock::new(None),
        }
    }

    fn pool(&self) -> Result<PgPool, AppError> {
        self.pool
            .read()
            .ok()
            .and_then(|p| p.clone())
            .ok_or_else(|| AppError::AdapterConnection("postgres adapter is not connected".into()))
    }

    fn connect_options(&self) -> PgConnectOptions {
        let ssl_mode = if self.config.ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };
        PgConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .database(&self.config.database)
            .username(&self.config.user)
            .password(&self.config.password)
            .ssl_mode(ssl_mode)
    }
}

fn classify(err: sqlx::Error) -> AppError {
    let (missing_table, duplicate_column) = match &err {
        sqlx::Error::Database(db) => {
            let code = db.code();
            let code = code.as_deref();
            (code == Some("42P01"), code == Some("42701"))
        }
        _ => (false, false),
    };
    classify_db_error(err, missing_table, duplicate_column)
}

fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    params: &[SqlValue],
) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    for p in params {
        query = query.bind(PgBindValue::from(p));
    }
    query
}

fn row_to_json(row: &PgRow) -> Row {
    use sqlx::Column;
    use sqlx::Row as _;
    let mut map = Row::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use rust_decimal::prelude::ToPrimitive;
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        return number_from_f64(n as f64);
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        return number_from_f64(n);
    }
    if let Ok(Some(d)) = row.try_get::<Option<rust_decimal::Decimal>, _>(name) {
        if d.fract().is_zero() {
            if let Some(n) = d.to_i64() {
                return Value::Number(n.into());
            }
        }
        return d.to_f64().map(number_from_f64).unwrap_or(Value::Null);
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(SqlValue::iso_timestamp(&d.naive_utc()));
    }
    if let Ok(Some(d)) = row.try_get::<Option<NaiveDateTime>, _>(name) {
        return Value::String(SqlValue::iso_timestamp(&d));
    }
    if let Ok(Some(d)) = row.try_get::<Option<NaiveDate>, _>(name) {
        return Value::String(SqlValue::iso_date(&d));
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}

#[async_trait]
impl DatabaseAdapter for PostgresAdapter {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    async fn connect(&self) -> Result<(), AppError> {
        if self.is_connected() {
            return Ok(());
        }
        let pool = PgPoolOptions::new()
            .max_connections(self.config.pool_size)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(self.connect_options())
            .await
            .map_err(|e| {
                AppError::AdapterConnection(format!(
                    "postgres {}:{}/{}: {}",
                    self.config.host, self.config.port, self.config.database, e
                ))
            })?;
        if let Ok(mut slot) = self.pool.write() {
            *slot = Some(pool);
        }
        tracing::info!(
            host = %self.config.host,
            database = %self.config.database,
            pool_size = self.config.pool_size,
            "postgres adapter connected"
        );
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), AppError> {
        let pool = self.pool.write().ok().and_then(|mut slot| slot.take());
        if let Some(pool) = pool {
            pool.close().await;
            tracing::info!(host = %self.config.host, "postgres adapter disconnected");
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
        let sql = translate_placeholders(sql);
        tracing::debug!(sql = %sql, params = params.len(), "query");
        let pool = self.pool()?;
        let rows = bind_params(sqlx::query(&sql), params)
            .fetch_all(&pool)
            .await
            .map_err(classify)?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ExecResult, AppError> {
        let sql = translate_placeholders(sql);
        tracing::debug!(sql = %sql, params = params.len(), "execute");
        let pool = self.pool()?;
        let result = bind_params(sqlx::query(&sql), params)
            .execute(&pool)
            .await
            .map_err(classify)?;
        Ok(ExecResult {
            changes: result.rows_affected(),
            last_insert_id: None,
        })
    }

    async fn begin_transaction(&self) -> Result<Box<dyn AdapterTransaction>, AppError> {
        let tx = self.pool()?.begin().await.map_err(classify)?;
        tracing::debug!(host = %self.config.host, "transaction started");
        Ok(Box::new(PgTransaction { tx: Some(tx) }))
    }

    async fn table_exists(&self, table: &str) -> Result<bool, AppError> {
        let rows = self
            .query(
                "SELECT 1 AS one FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_name::text = ?",
                &[SqlValue::from(table)],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn get_table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, AppError> {
        let rows = self
            .query(
                "SELECT column_name::text AS name, data_type::text AS column_type, is_nullable::text AS is_nullable \
                 FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name::text = ? \
                 ORDER BY ordinal_position",
                &[SqlValue::from(table)],
            )
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|r| {
                Some(ColumnInfo {
                    name: r.get("name")?.as_str()?.to_string(),
                    column_type: r.get("column_type").and_then(Value::as_str).unwrap_or("").to_string(),
                    nullable: r.get("is_nullable").and_then(Value::as_str) != Some("NO"),
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
        let sql = render_create_table(table, "VARCHAR(255)", "TIMESTAMP", columns, foreign_keys);
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
        postgres_column_type(kind)
    }

    async fn get_all_tables(&self) -> Result<Vec<String>, AppError> {
        let rows = self
            .query(
                "SELECT table_name::text AS name FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' ORDER BY table_name",
                &[],
            )
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|r| r.get("name").and_then(Value::as_str).map(String::from))
            .collect())
    }
}

/// Transaction on a pooled connection of its own.
pub struct PgTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgTransaction {
    fn open(&mut self) -> Result<&mut Transaction<'static, Postgres>, AppError> {
        self.tx.as_mut().ok_or_else(transaction_finished)
    }
}

#[async_trait]
impl AdapterTransaction for PgTransaction {
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, AppError> {
        let sql = translate_placeholders(sql);
        tracing::debug!(sql = %sql, params = params.len(), "query in transaction");
        let tx = self.open()?;
        let rows = bind_params(sqlx::query(&sql), params)
            .fetch_all(&mut **tx)
            .await
            .map_err(classify)?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ExecResult, AppError> {
        let sql = translate_placeholders(sql);
        tracing::debug!(sql = %sql, params = params.len(), "execute in transaction");
        let tx = self.open()?;
        let result = bind_params(sqlx::query(&sql), params)
            .execute(&mut **tx)
            .await
            .map_err(classify)?;
        Ok(ExecResult {
            changes: result.rows_affected(),
            last_insert_id: None,
        })
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

pub fn postgres_column_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::String | FieldKind::Email | FieldKind::Relation => "VARCHAR(255)",
        FieldKind::Text | FieldKind::Json => "TEXT",
        FieldKind::Integer => "INTEGER",
        FieldKind::Decimal => "DECIMAL",
        FieldKind::Boolean => "BOOLEAN",
        FieldKind::Date => "DATE",
        FieldKind::Datetime => "TIMESTAMP",
    }
}
