//! Field vocabulary and the persisted schema document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Columns every table owns that never appear in `TableSchema::fields`.
pub const SYSTEM_COLUMNS: [&str; 3] = ["id", "created_at", "updated_at"];

pub fn is_system_column(name: &str) -> bool {
    SYSTEM_COLUMNS.contains(&name)
}

/// Physical column holding a relation field's foreign key.
pub fn relation_column(field: &str) -> String {
    format!("{}Id", field)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Text,
    Email,
    Integer,
    Decimal,
    Boolean,
    Date,
    Datetime,
    Json,
    Relation,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Text => "text",
            FieldKind::Email => "email",
            FieldKind::Integer => "integer",
            FieldKind::Decimal => "decimal",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::Datetime => "datetime",
            FieldKind::Json => "json",
            FieldKind::Relation => "relation",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `ON DELETE` behaviour of a relation's foreign key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CascadeRule {
    #[serde(rename = "CASCADE")]
    Cascade,
    #[default]
    #[serde(rename = "SET NULL")]
    SetNull,
    #[serde(rename = "RESTRICT")]
    Restrict,
}

impl CascadeRule {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CascadeRule::Cascade => "CASCADE",
            CascadeRule::SetNull => "SET NULL",
            CascadeRule::Restrict => "RESTRICT",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<CascadeRule>,
}

impl FieldDefinition {
    pub fn new(kind: FieldKind) -> Self {
        FieldDefinition {
            kind,
            required: false,
            target: None,
            on_delete: None,
        }
    }

    pub fn relation(target: impl Into<String>) -> Self {
        FieldDefinition {
            kind: FieldKind::Relation,
            required: false,
            target: Some(target.into()),
            on_delete: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn on_delete(mut self, rule: CascadeRule) -> Self {
        self.on_delete = Some(rule);
        self
    }

    pub fn is_relation(&self) -> bool {
        self.kind == FieldKind::Relation
    }

    pub fn cascade_rule(&self) -> CascadeRule {
        self.on_delete.unwrap_or_default()
    }
}

/// Persisted description of one resource. Fields only ever grow.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDefinition>,
}

impl TableSchema {
    pub fn new() -> Self {
        TableSchema::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, def: FieldDefinition) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }

    /// Add `name` unless it is already declared. Returns whether the field was added.
    pub fn add_field(&mut self, name: &str, def: FieldDefinition) -> bool {
        if self.fields.contains_key(name) {
            return false;
        }
        self.fields.insert(name.to_string(), def);
        true
    }

    /// Physical column name for a logical field name.
    pub fn column_for(&self, name: &str) -> String {
        match self.fields.get(name) {
            Some(def) if def.is_relation() => relation_column(name),
            _ => name.to_string(),
        }
    }

    /// Field that owns a physical column, and whether the column is a relation key.
    pub fn field_for_column(&self, column: &str) -> Option<(&str, &FieldDefinition)> {
        if let Some((name, def)) = self.fields.get_key_value(column) {
            if !def.is_relation() {
                return Some((name.as_str(), def));
            }
        }
        let logical = column.strip_suffix("Id")?;
        match self.fields.get_key_value(logical) {
            Some((name, def)) if def.is_relation() => Some((name.as_str(), def)),
            _ => None,
        }
    }

    pub fn relations(&self) -> impl Iterator<Item = (&str, &FieldDefinition)> {
        self.fields
            .iter()
            .filter(|(_, def)| def.is_relation())
            .map(|(name, def)| (name.as_str(), def))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_format_matches_schema_file() {
        let schema = TableSchema::new()
            .with_field("title", FieldDefinition::new(FieldKind::String).required())
            .with_field("author", FieldDefinition::relation("User").on_delete(CascadeRule::Cascade));
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "fields": {
                    "author": { "type": "relation", "required": false, "target": "User", "onDelete": "CASCADE" },
                    "title": { "type": "string", "required": true }
                }
            })
        );
        let back: TableSchema = serde_json::from_value(json).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn relation_defaults_to_set_null() {
        let def: FieldDefinition = serde_json::from_str(r#"{"type":"relation","target":"User"}"#).unwrap();
        assert!(!def.required);
        assert_eq!(def.cascade_rule(), CascadeRule::SetNull);
    }

    #[test]
    fn maps_relation_columns_both_ways() {
        let schema = TableSchema::new()
            .with_field("author", FieldDefinition::relation("User"))
            .with_field("name", FieldDefinition::new(FieldKind::String));
        assert_eq!(schema.column_for("author"), "authorId");
        assert_eq!(schema.column_for("name"), "name");
        assert_eq!(schema.field_for_column("authorId").map(|(n, _)| n), Some("author"));
        assert_eq!(schema.field_for_column("name").map(|(n, _)| n), Some("name"));
        assert!(schema.field_for_column("nameId").is_none());
    }

    #[test]
    fn add_field_never_retypes() {
        let mut schema = TableSchema::new().with_field("price", FieldDefinition::new(FieldKind::Decimal));
        assert!(!schema.add_field("price", FieldDefinition::new(FieldKind::String)));
        assert_eq!(schema.field("price").unwrap().kind, FieldKind::Decimal);
        assert!(schema.add_field("sku", FieldDefinition::new(FieldKind::String)));
    }
}
