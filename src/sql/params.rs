//! Engine-neutral bind values. The table manager derives them from field kinds;
//! each adapter binds them in its own dialect.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    /// Kind-agnostic conversion: objects and arrays become JSON text.
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Integer(i)
                } else {
                    SqlValue::Real(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => SqlValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => SqlValue::Text(v.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// ISO-8601 rendering used where dates travel as text.
    pub fn iso_date(d: &NaiveDate) -> String {
        d.format("%Y-%m-%d").to_string()
    }

    pub fn iso_timestamp(ts: &NaiveDateTime) -> String {
        ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::Integer(n)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        SqlValue::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_keeps_numbers_apart() {
        assert_eq!(SqlValue::from_json(&json!(5)), SqlValue::Integer(5));
        assert_eq!(SqlValue::from_json(&json!(5.5)), SqlValue::Real(5.5));
        assert_eq!(SqlValue::from_json(&json!(null)), SqlValue::Null);
        assert_eq!(SqlValue::from_json(&json!({"a": 1})), SqlValue::Text("{\"a\":1}".into()));
    }

    #[test]
    fn iso_rendering() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_milli_opt(10, 5, 0, 250).unwrap();
        assert_eq!(SqlValue::iso_timestamp(&ts), "2024-03-01T10:05:00.250Z");
        assert_eq!(SqlValue::iso_date(&ts.date()), "2024-03-01");
    }
}
