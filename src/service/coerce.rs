//! Value coercion between records and bind values, driven by the persisted field kind.

use crate::config::DatabaseType;
use crate::schema::infer::{parse_date, parse_datetime};
use crate::schema::{is_system_column, FieldDefinition, FieldKind, TableSchema};
use crate::service::Record;
use crate::sql::SqlValue;
use serde_json::Value;

/// Bind value for one written or filtered value of a field of `kind`.
pub fn to_sql_value(kind: FieldKind, value: &Value, db: DatabaseType) -> SqlValue {
    if value.is_null() {
        return SqlValue::Null;
    }
    match kind {
        FieldKind::Boolean => match truthiness(value) {
            Some(b) => bool_value(b, db),
            None => SqlValue::from_json(value),
        },
        FieldKind::Integer => match value {
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(SqlValue::Integer)
                .unwrap_or_else(|_| SqlValue::Text(s.clone())),
            Value::Bool(b) => SqlValue::Integer(*b as i64),
            other => SqlValue::from_json(other),
        },
        FieldKind::Decimal => match value {
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(SqlValue::Real)
                .unwrap_or_else(|_| SqlValue::Text(s.clone())),
            Value::Bool(b) => SqlValue::Integer(*b as i64),
            other => SqlValue::from_json(other),
        },
        FieldKind::Date => match value.as_str().and_then(parse_date) {
            Some(d) => SqlValue::Date(d),
            None => SqlValue::from_json(value),
        },
        FieldKind::Datetime => match value.as_str().and_then(parse_datetime) {
            Some(ts) => SqlValue::Timestamp(ts),
            None => SqlValue::from_json(value),
        },
        // Always serialized, so a stored string reads back as the same string.
        FieldKind::Json => SqlValue::Text(value.to_string()),
        FieldKind::Relation => match value {
            Value::Object(o) => o.get("id").map(text_of).unwrap_or(SqlValue::Null),
            other => text_of(other),
        },
        FieldKind::String | FieldKind::Text | FieldKind::Email => text_of(value),
    }
}

/// Bind value for a system column (`id`, `created_at`, `updated_at`).
pub fn system_value(column: &str, value: &Value, db: DatabaseType) -> SqlValue {
    if column == "id" {
        return text_of(value);
    }
    match value.as_str().and_then(parse_datetime) {
        // Matches the text SQLite writes for CURRENT_TIMESTAMP so comparisons line up.
        Some(ts) if db == DatabaseType::Sqlite => SqlValue::Text(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
        Some(ts) => SqlValue::Timestamp(ts),
        None => SqlValue::from_json(value),
    }
}

/// Bind value for a column that may or may not be declared in `schema`.
pub fn column_value(schema: &TableSchema, column: &str, value: &Value, db: DatabaseType) -> SqlValue {
    if is_system_column(column) {
        return system_value(column, value, db);
    }
    match field_for(schema, column) {
        Some(def) => to_sql_value(def.kind, value, db),
        None => match value {
            Value::Bool(b) => bool_value(*b, db),
            other => SqlValue::from_json(other),
        },
    }
}

fn field_for<'a>(schema: &'a TableSchema, column: &str) -> Option<&'a FieldDefinition> {
    schema
        .field(column)
        .or_else(|| schema.field_for_column(column).map(|(_, def)| def))
}

fn bool_value(b: bool, db: DatabaseType) -> SqlValue {
    match db {
        DatabaseType::Sqlite => SqlValue::Integer(b as i64),
        DatabaseType::Postgres => SqlValue::Bool(b),
    }
}

fn text_of(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn truthiness(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Turn a raw row into its logical record: relation columns renamed back to the
/// field name, booleans and JSON restored only where the schema declares them.
pub fn decode_row(schema: &TableSchema, row: Record) -> Record {
    let mut out = Record::new();
    for (column, value) in row {
        if is_system_column(&column) {
            out.insert(column, value);
            continue;
        }
        match schema.field_for_column(&column) {
            Some((name, def)) => {
                let name = name.to_string();
                out.insert(name, decode_value(def.kind, value));
            }
            None => {
                out.insert(column, value);
            }
        }
    }
    out
}

fn decode_value(kind: FieldKind, value: Value) -> Value {
    match (kind, value) {
        (FieldKind::Boolean, Value::Number(n)) => Value::Bool(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
        (FieldKind::Boolean, Value::String(s)) => match truthiness(&Value::String(s.clone())) {
            Some(b) => Value::Bool(b),
            None => Value::String(s),
        },
        (FieldKind::Json, Value::String(s)) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
        (_, v) => v,
    }
}
