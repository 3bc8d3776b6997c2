//! First-sight type inference: map a sample value to the smallest compatible kind.
//! Runs once per field; later values of another shape are coerced, never re-inferred.

use crate::schema::{is_system_column, FieldDefinition, FieldKind, TableSchema};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

/// Strings longer than this become `text` instead of `string`.
pub const MAX_STRING_LEN: usize = 255;

pub fn infer_kind(value: &Value) -> FieldKind {
    match value {
        // a null sample carries no type signal
        Value::Null => FieldKind::String,
        Value::Bool(_) => FieldKind::Boolean,
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                FieldKind::Integer
            } else if n.as_f64().map(|f| f.is_finite() && f.fract() == 0.0).unwrap_or(false) {
                FieldKind::Integer
            } else {
                FieldKind::Decimal
            }
        }
        Value::String(s) => {
            if s.contains('@') && s.contains('.') {
                FieldKind::Email
            } else if parse_datetime(s).is_some() {
                FieldKind::Datetime
            } else if s.chars().count() > MAX_STRING_LEN {
                FieldKind::Text
            } else {
                FieldKind::String
            }
        }
        Value::Array(_) | Value::Object(_) => FieldKind::Json,
    }
}

/// Build a schema from a sample record. System columns are skipped.
pub fn generate_schema_from_data(data: &Map<String, Value>) -> TableSchema {
    let mut schema = TableSchema::new();
    for (name, value) in data {
        if is_system_column(name) {
            continue;
        }
        schema.add_field(name, FieldDefinition::new(infer_kind(value)));
    }
    schema
}

/// Parse the date/time shapes clients send: RFC 3339, naive ISO timestamps, bare dates.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.len() < 8 {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    parse_timestamp_prefix(s).map(|dt| dt.date())
}

fn parse_timestamp_prefix(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inference_order() {
        assert_eq!(infer_kind(&Value::Null), FieldKind::String);
        assert_eq!(infer_kind(&json!(true)), FieldKind::Boolean);
        assert_eq!(infer_kind(&json!(42)), FieldKind::Integer);
        assert_eq!(infer_kind(&json!(-7)), FieldKind::Integer);
        assert_eq!(infer_kind(&json!(3.0)), FieldKind::Integer);
        assert_eq!(infer_kind(&json!(9.99)), FieldKind::Decimal);
        assert_eq!(infer_kind(&json!("ada@example.com")), FieldKind::Email);
        assert_eq!(infer_kind(&json!("2024-03-01T10:00:00Z")), FieldKind::Datetime);
        assert_eq!(infer_kind(&json!("2024-03-01")), FieldKind::Datetime);
        assert_eq!(infer_kind(&json!("Widget")), FieldKind::String);
        assert_eq!(infer_kind(&json!("x".repeat(256))), FieldKind::Text);
        assert_eq!(infer_kind(&json!("x".repeat(255))), FieldKind::String);
        assert_eq!(infer_kind(&json!({"a": 1})), FieldKind::Json);
        assert_eq!(infer_kind(&json!([1, 2])), FieldKind::Json);
    }

    #[test]
    fn email_wins_over_date_and_length() {
        let long_email = format!("{}@example.com", "a".repeat(300));
        assert_eq!(infer_kind(&json!(long_email)), FieldKind::Email);
    }

    #[test]
    fn generated_schema_skips_system_columns() {
        let data = json!({"id": "abc", "name": "Widget", "price": 9.99, "created_at": "2024-01-01"});
        let schema = generate_schema_from_data(data.as_object().unwrap());
        assert_eq!(schema.fields.len(), 2);
        assert_eq!(schema.field("name").unwrap().kind, FieldKind::String);
        assert_eq!(schema.field("price").unwrap().kind, FieldKind::Decimal);
        assert!(schema.fields.values().all(|f| !f.required));
    }

    #[test]
    fn parses_common_date_shapes() {
        assert!(parse_datetime("2024-03-01T10:00:00.123Z").is_some());
        assert!(parse_datetime("2024-03-01 10:00:00").is_some());
        assert!(parse_datetime("not a date").is_none());
        assert!(parse_datetime("12").is_none());
        assert_eq!(parse_date("2024-03-01T10:00:00Z"), NaiveDate::from_ymd_opt(2024, 3, 1));
    }
}
