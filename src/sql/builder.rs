//! Builds parameterized SELECT, INSERT, UPDATE, DELETE with `?` placeholders.
//! Identifiers come from validated schema names; values are always parameters.

use crate::sql::{quoted, FilterOp, SortDirection, SqlValue};

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: SqlValue) -> &'static str {
        self.params.push(v);
        "?"
    }
}

/// One WHERE term on a physical column. `In` carries every list element in `values`.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub op: FilterOp,
    pub values: Vec<SqlValue>,
}

impl Predicate {
    pub fn new(column: impl Into<String>, op: FilterOp, value: SqlValue) -> Self {
        Predicate {
            column: column.into(),
            op,
            values: vec![value],
        }
    }

    pub fn any_of(column: impl Into<String>, values: Vec<SqlValue>) -> Self {
        Predicate {
            column: column.into(),
            op: FilterOp::In,
            values,
        }
    }
}

/// Shape of a list query after logical names were mapped to columns.
#[derive(Clone, Debug, Default)]
pub struct ListSpec {
    /// Empty selects every column.
    pub columns: Vec<String>,
    pub predicates: Vec<Predicate>,
    pub order: Vec<(String, SortDirection)>,
    pub limit: u32,
    pub offset: u32,
}

fn column_list(columns: &[String]) -> String {
    if columns.is_empty() {
        "*".to_string()
    } else {
        columns.iter().map(|c| quoted(c)).collect::<Vec<_>>().join(", ")
    }
}

fn where_clause(q: &mut QueryBuf, predicates: &[Predicate]) -> String {
    let mut parts = Vec::new();
    for p in predicates {
        let col = quoted(&p.column);
        match p.op {
            FilterOp::In => {
                if p.values.is_empty() {
                    parts.push("1 = 0".to_string());
                    continue;
                }
                let placeholders: Vec<&str> = p.values.iter().map(|v| q.push_param(v.clone())).collect();
                parts.push(format!("{} IN ({})", col, placeholders.join(", ")));
            }
            FilterOp::Eq if p.values.first().map(SqlValue::is_null).unwrap_or(true) => {
                parts.push(format!("{} IS NULL", col));
            }
            FilterOp::Ne if p.values.first().map(SqlValue::is_null).unwrap_or(true) => {
                parts.push(format!("{} IS NOT NULL", col));
            }
            op => {
                let value = p.values.first().cloned().unwrap_or(SqlValue::Null);
                let ph = q.push_param(value);
                parts.push(format!("{} {} {}", col, op.sql(), ph));
            }
        }
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT by primary key. Caller's id is the only param.
pub fn select_by_id(table: &str, columns: &[String], id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(SqlValue::Text(id.to_string()));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        column_list(columns),
        quoted(table),
        quoted("id"),
        ph
    );
    q
}

/// SELECT list with ANDed predicates, ORDER BY, LIMIT/OFFSET (always applied).
pub fn select_list(table: &str, spec: &ListSpec) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, &spec.predicates);
    let order_sql = if spec.order.is_empty() {
        String::new()
    } else {
        let parts: Vec<String> = spec
            .order
            .iter()
            .map(|(c, d)| format!("{} {}", quoted(c), d.sql()))
            .collect();
        format!(" ORDER BY {}", parts.join(", "))
    };
    q.sql = format!(
        "SELECT {} FROM {}{}{} LIMIT {} OFFSET {}",
        column_list(&spec.columns),
        quoted(table),
        where_sql,
        order_sql,
        spec.limit,
        spec.offset
    );
    q
}

pub fn count(table: &str, predicates: &[Predicate]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, predicates);
    q.sql = format!("SELECT COUNT(*) AS {} FROM {}{}", quoted("count"), quoted(table), where_sql);
    q
}

/// SELECT * FROM table WHERE column IN (?, ?, ...). Used for batch-fetching related rows.
pub fn select_by_column_in(table: &str, column: &str, values: &[SqlValue]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, &[Predicate::any_of(column, values.to_vec())]);
    q.sql = format!("SELECT * FROM {}{}", quoted(table), where_sql);
    q
}

/// INSERT one row from (column, value) pairs.
pub fn insert(table: &str, values: &[(String, SqlValue)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::with_capacity(values.len());
    let mut placeholders = Vec::with_capacity(values.len());
    for (col, v) in values {
        cols.push(quoted(col));
        placeholders.push(q.push_param(v.clone()));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quoted(table),
        cols.join(", "),
        placeholders.join(", ")
    );
    q
}

/// UPDATE by id: SET the given columns and stamp `updated_at`.
pub fn update(table: &str, id: &str, values: &[(String, SqlValue)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::with_capacity(values.len() + 1);
    for (col, v) in values {
        if col == "id" || col == "updated_at" || col == "created_at" {
            continue;
        }
        let ph = q.push_param(v.clone());
        sets.push(format!("{} = {}", quoted(col), ph));
    }
    sets.push(format!("{} = CURRENT_TIMESTAMP", quoted("updated_at")));
    let ph = q.push_param(SqlValue::Text(id.to_string()));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        quoted(table),
        sets.join(", "),
        quoted("id"),
        ph
    );
    q
}

pub fn delete(table: &str, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(SqlValue::Text(id.to_string()));
    q.sql = format!("DELETE FROM {} WHERE {} = {}", quoted(table), quoted("id"), ph);
    q
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_list_applies_filters_order_and_paging() {
        let spec = ListSpec {
            columns: vec!["id".into(), "price".into()],
            predicates: vec![
                Predicate::new("price", FilterOp::Gt, SqlValue::Integer(5)),
                Predicate::any_of("category", vec!["A".into(), "B".into()]),
            ],
            order: vec![("price".into(), SortDirection::Desc)],
            limit: 100,
            offset: 0,
        };
        let q = select_list("Product", &spec);
        assert_eq!(
            q.sql,
            "SELECT \"id\", \"price\" FROM \"Product\" WHERE \"price\" > ? AND \"category\" IN (?, ?) ORDER BY \"price\" DESC LIMIT 100 OFFSET 0"
        );
        assert_eq!(q.params, vec![SqlValue::Integer(5), "A".into(), "B".into()]);
    }

    #[test]
    fn null_equality_and_empty_in() {
        let spec = ListSpec {
            predicates: vec![
                Predicate::new("deleted", FilterOp::Eq, SqlValue::Null),
                Predicate::any_of("tag", vec![]),
            ],
            limit: 10,
            offset: 20,
            ..Default::default()
        };
        let q = select_list("T", &spec);
        assert_eq!(q.sql, "SELECT * FROM \"T\" WHERE \"deleted\" IS NULL AND 1 = 0 LIMIT 10 OFFSET 20");
        assert!(q.params.is_empty());
    }

    #[test]
    fn insert_update_delete() {
        let values = vec![("id".to_string(), SqlValue::from("a1")), ("name".to_string(), SqlValue::from("W"))];
        let q = insert("Product", &values);
        assert_eq!(q.sql, "INSERT INTO \"Product\" (\"id\", \"name\") VALUES (?, ?)");
        assert_eq!(q.params.len(), 2);

        let q = update("Product", "a1", &values);
        assert_eq!(
            q.sql,
            "UPDATE \"Product\" SET \"name\" = ?, \"updated_at\" = CURRENT_TIMESTAMP WHERE \"id\" = ?"
        );
        assert_eq!(q.params, vec![SqlValue::from("W"), SqlValue::from("a1")]);

        let q = delete("Product", "a1");
        assert_eq!(q.sql, "DELETE FROM \"Product\" WHERE \"id\" = ?");
    }

    #[test]
    fn batch_fetch_by_ids() {
        let q = select_by_column_in("User", "id", &["u1".into(), "u2".into()]);
        assert_eq!(q.sql, "SELECT * FROM \"User\" WHERE \"id\" IN (?, ?)");
        let q = count("User", &[]);
        assert_eq!(q.sql, "SELECT COUNT(*) AS \"count\" FROM \"User\"");
    }
}
