//! Structured filters and sort order at the query boundary.
//!
//! Filter document: `{ "<field>": { "eq"|"ne"|"gt"|"gte"|"lt"|"lte"|"like": v } | { "in": [..] } | <scalar> }`.
//! A bare scalar means `eq`, a bare array means `in`. All conditions are ANDed.

use crate::error::AppError;
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Like,
}

impl FilterOp {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "eq" => FilterOp::Eq,
            "ne" => FilterOp::Ne,
            "gt" => FilterOp::Gt,
            "gte" => FilterOp::Gte,
            "lt" => FilterOp::Lt,
            "lte" => FilterOp::Lte,
            "in" => FilterOp::In,
            "like" => FilterOp::Like,
            _ => return None,
        })
    }

    pub fn sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "<>",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::In => "IN",
            FilterOp::Like => "LIKE",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: FilterOp,
    /// Scalar for comparisons, array for `In`.
    pub value: Value,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Filter::default()
    }

    pub fn condition(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition(field, FilterOp::Eq, value)
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition(field, FilterOp::Gt, value)
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition(field, FilterOp::Lt, value)
    }

    pub fn is_in(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.condition(field, FilterOp::In, Value::Array(values))
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Parse a filter document. `null` is the empty filter.
    pub fn from_json(doc: &Value) -> Result<Self, AppError> {
        let obj = match doc {
            Value::Null => return Ok(Filter::new()),
            Value::Object(o) => o,
            _ => return Err(AppError::Validation("filter must be a JSON object".into())),
        };
        let mut filter = Filter::new();
        for (field, spec) in obj {
            match spec {
                Value::Object(ops) => {
                    if ops.is_empty() {
                        return Err(AppError::Validation(format!("empty filter for {}", field)));
                    }
                    for (op_name, operand) in ops {
                        let op = FilterOp::parse(op_name).ok_or_else(|| {
                            AppError::Validation(format!("unknown filter operator '{}' on {}", op_name, field))
                        })?;
                        if op == FilterOp::In && !operand.is_array() {
                            return Err(AppError::Validation(format!("'in' on {} requires an array", field)));
                        }
                        filter = filter.condition(field.clone(), op, operand.clone());
                    }
                }
                Value::Array(items) => {
                    filter = filter.is_in(field.clone(), items.clone());
                }
                scalar => {
                    filter = filter.eq(field.clone(), scalar.clone());
                }
            }
        }
        Ok(filter)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Sort {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Sort {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// `"price"`, `"-price"`, `"price:desc"`, `"price:asc"`.
    pub fn parse(s: &str) -> Result<Self, AppError> {
        let s = s.trim();
        if let Some(field) = s.strip_prefix('-') {
            return Ok(Sort::desc(field));
        }
        match s.split_once(':') {
            Some((field, dir)) => match dir.to_lowercase().as_str() {
                "asc" => Ok(Sort::asc(field)),
                "desc" => Ok(Sort::desc(field)),
                other => Err(AppError::Validation(format!("invalid sort direction: {}", other))),
            },
            None => Ok(Sort::asc(s)),
        }
    }
}
