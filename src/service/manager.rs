//! Dynamic table manager: schema evolution, CRUD and relation population over
//! any [`DatabaseAdapter`].

use crate::adapter::{ColumnDef, DatabaseAdapter, ForeignKeyDef};
use crate::cache::{CacheHook, NoopCache};
use crate::error::AppError;
use crate::schema::{
    generate_schema_from_data, infer_kind, is_system_column, FieldDefinition, TableSchema,
};
use crate::service::coerce::{column_value, decode_row};
use crate::service::hooks::{AfterDeleteHook, BeforeCreateHook, HookId, HookRegistry};
use crate::service::Record;
use crate::sql::{
    count, delete, insert, quoted, select_by_column_in, select_by_id, select_list, update,
    validate_identifier, Filter, FilterOp, ListSpec, Predicate, Sort, SortDirection, SqlValue,
};
use crate::store::SchemaStore;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_BULK_CREATE: usize = 100;

/// Options for [`DynamicTableManager::find_all`].
#[derive(Clone, Debug, Default)]
pub struct FindOptions {
    /// Defaults to 100; no upper bound.
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// Relation fields to resolve into records.
    pub populate: Vec<String>,
    /// Empty means `created_at, id` ascending.
    pub sort: Vec<Sort>,
    /// Empty means every column.
    pub select: Vec<String>,
    pub filter: Filter,
}

impl FindOptions {
    pub fn new() -> Self {
        FindOptions::default()
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn populate(mut self, field: impl Into<String>) -> Self {
        self.populate.push(field.into());
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
}

pub struct DynamicTableManager {
    adapter: Arc<dyn DatabaseAdapter>,
    store: Arc<SchemaStore>,
    cache: Arc<dyn CacheHook>,
    schemas: RwLock<HashMap<String, TableSchema>>,
    hooks: HookRegistry,
    ddl_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DynamicTableManager {
    pub fn new(adapter: Arc<dyn DatabaseAdapter>, store: Arc<SchemaStore>) -> Self {
        DynamicTableManager {
            adapter,
            store,
            cache: Arc::new(NoopCache),
            schemas: RwLock::new(HashMap::new()),
            hooks: HookRegistry::new(),
            ddl_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheHook>) -> Self {
        self.cache = cache;
        self
    }

    pub fn adapter(&self) -> &Arc<dyn DatabaseAdapter> {
        &self.adapter
    }

    pub fn store(&self) -> &Arc<SchemaStore> {
        &self.store
    }

    /// Replay every persisted schema against the live database and seed the cache.
    /// Returns how many resources were reconciled.
    pub async fn initialize(&self) -> Result<usize, AppError> {
        let all = self.store.load_all().await;
        let mut names: Vec<&String> = all.keys().collect();
        names.sort();
        for name in &names {
            self.create_table_from_schema(name, &all[*name]).await?;
        }
        tracing::info!(resources = names.len(), "table manager initialized");
        Ok(names.len())
    }

    // ---- schema ----

    fn cached_schema(&self, resource: &str) -> Option<TableSchema> {
        self.schemas
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(resource)
            .cloned()
    }

    fn remember_schema(&self, resource: &str, schema: TableSchema) {
        self.schemas
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(resource.to_string(), schema);
    }

    /// Cached schema, falling back to the schema store.
    pub async fn get_schema(&self, resource: &str) -> Option<TableSchema> {
        if let Some(schema) = self.cached_schema(resource) {
            return Some(schema);
        }
        self.store.load(resource).await
    }

    pub async fn schema(&self, resource: &str) -> Result<TableSchema, AppError> {
        self.get_schema(resource)
            .await
            .ok_or_else(|| AppError::SchemaNotFound(resource.to_string()))
    }

    /// Names of the resources known to this manager.
    pub fn resources(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .schemas
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn ddl_lock(&self, resource: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.ddl_locks.lock().unwrap_or_else(|p| p.into_inner());
        locks.entry(resource.to_string()).or_default().clone()
    }

    fn validate_schema(schema: &TableSchema) -> Result<(), AppError> {
        for (name, def) in &schema.fields {
            validate_identifier(name)?;
            if def.is_relation() {
                match def.target.as_deref() {
                    Some(target) => validate_identifier(target)?,
                    None => {
                        return Err(AppError::Validation(format!(
                            "relation field {} has no target",
                            name
                        )))
                    }
                }
            }
        }
        Ok(())
    }

    /// Create the table for `resource`, or add whatever columns it lacks.
    /// Fields are merged into the known schema; existing fields keep their kind.
    /// Rerunning with an unchanged schema emits no DDL.
    pub async fn create_table_from_schema(
        &self,
        resource: &str,
        schema: &TableSchema,
    ) -> Result<(), AppError> {
        validate_identifier(resource)?;
        Self::validate_schema(schema)?;
        self.ensure_relation_targets(resource, schema).await?;

        let lock = self.ddl_lock(resource);
        let _guard = lock.lock().await;
        self.apply_schema(resource, schema).await
    }

    // A missing target gets a bare table (system columns only) so the REFERENCES clause
    // resolves on every engine; its own fields and references arrive when it is applied.
    // Targets get their own lock, taken before the resource's, so mutual relations cannot deadlock.
    async fn ensure_relation_targets(&self, resource: &str, schema: &TableSchema) -> Result<(), AppError> {
        let targets: HashSet<&str> = schema
            .relations()
            .filter_map(|(_, def)| def.target.as_deref())
            .filter(|t| *t != resource)
            .collect();
        for target in targets {
            let lock = self.ddl_lock(target);
            let _guard = lock.lock().await;
            if self.adapter.table_exists(target).await? {
                continue;
            }
            tracing::info!(resource, target, "creating relation target table");
            self.adapter.create_table(target, &[], &[]).await?;
            if self.get_schema(target).await.is_none() {
                self.store.save(target, &TableSchema::new()).await?;
                self.remember_schema(target, TableSchema::new());
            }
        }
        Ok(())
    }

    // Caller holds the resource's DDL lock.
    async fn apply_schema(&self, resource: &str, schema: &TableSchema) -> Result<(), AppError> {
        let mut merged = self.get_schema(resource).await.unwrap_or_default();
        for (name, def) in &schema.fields {
            merged.add_field(name, def.clone());
        }

        if !self.adapter.table_exists(resource).await? {
            let (columns, foreign_keys) = self.column_defs(&merged);
            self.adapter.create_table(resource, &columns, &foreign_keys).await?;
        } else {
            let live: HashSet<String> = self
                .adapter
                .get_table_columns(resource)
                .await?
                .into_iter()
                .map(|c| c.name)
                .collect();
            for (name, def) in &merged.fields {
                let column = merged.column_for(name);
                if live.contains(&column) {
                    continue;
                }
                let column_type = self.added_column_type(def);
                match self.adapter.add_column(resource, &column, &column_type).await {
                    Ok(()) => {}
                    Err(AppError::DuplicateColumn(msg)) => {
                        tracing::warn!(resource, column = %column, %msg, "column added concurrently");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        self.store.save(resource, &merged).await?;
        self.remember_schema(resource, merged.clone());
        if let Err(e) = self.cache.cache_table_schema(resource, &merged).await {
            tracing::warn!(resource, error = %e, "cache schema failed");
        }
        self.invalidate(resource).await;
        Ok(())
    }

    fn column_defs(&self, schema: &TableSchema) -> (Vec<ColumnDef>, Vec<ForeignKeyDef>) {
        let mut columns = Vec::with_capacity(schema.fields.len());
        let mut foreign_keys = Vec::new();
        for (name, def) in &schema.fields {
            let column = schema.column_for(name);
            columns.push(ColumnDef {
                name: column.clone(),
                column_type: self.adapter.map_column_type(def.kind).to_string(),
                nullable: !def.required,
            });
            if let (true, Some(target)) = (def.is_relation(), def.target.as_ref()) {
                foreign_keys.push(ForeignKeyDef {
                    column,
                    target_table: target.clone(),
                    target_column: "id".into(),
                    on_delete: def.cascade_rule().as_sql().into(),
                });
            }
        }
        (columns, foreign_keys)
    }

    // Added columns are always nullable; relations carry their REFERENCES clause inline.
    fn added_column_type(&self, def: &FieldDefinition) -> String {
        let base = self.adapter.map_column_type(def.kind);
        match (def.is_relation(), def.target.as_deref()) {
            (true, Some(target)) => format!(
                "{} REFERENCES {} ({}) ON DELETE {}",
                base,
                quoted(target),
                quoted("id"),
                def.cascade_rule().as_sql()
            ),
            _ => base.to_string(),
        }
    }

    /// Make sure every key in `data` is a declared field, inferring and adding
    /// new ones. Creates the table on first sight. Returns the resulting schema.
    pub async fn ensure_fields_exist(&self, resource: &str, data: &Record) -> Result<TableSchema, AppError> {
        validate_identifier(resource)?;
        let (base, reconciled) = match self.cached_schema(resource) {
            Some(schema) => (schema, true),
            None => match self.store.load(resource).await {
                Some(schema) => (schema, false),
                None => (TableSchema::new(), false),
            },
        };

        let mut additions = TableSchema::new();
        if base.fields.is_empty() && !reconciled {
            additions = generate_schema_from_data(data);
        } else {
            for (key, value) in data {
                if is_system_column(key) || base.field(key).is_some() || base.field_for_column(key).is_some() {
                    continue;
                }
                additions.add_field(key, FieldDefinition::new(infer_kind(value)));
            }
        }

        if additions.fields.is_empty() && reconciled {
            return Ok(base);
        }
        for name in additions.fields.keys() {
            tracing::debug!(resource, field = %name, "new field");
        }
        let mut merged = base;
        for (name, def) in additions.fields {
            merged.add_field(&name, def);
        }
        self.create_table_from_schema(resource, &merged).await?;
        self.schema(resource).await
    }

    // ---- writes ----

    /// Physical (column, value) pairs for a record. A logical relation key wins
    /// over its physical `<field>Id` twin when both are present.
    fn write_values(&self, schema: &TableSchema, data: &Record) -> Vec<(String, SqlValue)> {
        let db = self.adapter.database_type();
        let mut values: BTreeMap<String, SqlValue> = BTreeMap::new();
        for (key, value) in data {
            let column = if is_system_column(key) {
                key.clone()
            } else if schema.field(key).is_some() {
                schema.column_for(key)
            } else if let Some((name, _)) = schema.field_for_column(key) {
                if data.contains_key(name) {
                    continue;
                }
                key.clone()
            } else {
                tracing::debug!(field = %key, "undeclared field skipped");
                continue;
            };
            values.insert(column, column_value(schema, key, value, db));
        }
        values.into_iter().collect()
    }

    async fn invalidate(&self, resource: &str) {
        if let Err(e) = self.cache.invalidate_table_cache(resource).await {
            tracing::warn!(resource, error = %e, "cache invalidation failed");
        }
    }

    /// Insert one record. Hooks run first, then schema evolution, then the insert.
    /// Returns the row as stored.
    pub async fn create(&self, resource: &str, data: Record) -> Result<Record, AppError> {
        self.create_inner(resource, data)
            .await
            .map_err(|e| AppError::operation("create", resource, e))
    }

    async fn prepare_create(&self, resource: &str, mut data: Record) -> Result<(String, Record), AppError> {
        validate_identifier(resource)?;
        self.hooks.run_before_create(resource, &mut data).await?;
        let id = match data.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => uuid::Uuid::new_v4().to_string(),
        };
        data.insert("id".into(), Value::String(id.clone()));
        Ok((id, data))
    }

    async fn create_inner(&self, resource: &str, data: Record) -> Result<Record, AppError> {
        let (id, data) = self.prepare_create(resource, data).await?;
        let schema = self.ensure_fields_exist(resource, &data).await?;
        let q = insert(resource, &self.write_values(&schema, &data));
        self.adapter.execute(&q.sql, &q.params).await?;
        self.invalidate(resource).await;
        tracing::debug!(resource, id = %id, "record created");
        self.read_back(resource, &schema, &id).await
    }

    async fn read_back(&self, resource: &str, schema: &TableSchema, id: &str) -> Result<Record, AppError> {
        let q = select_by_id(resource, &[], id);
        let row = self.adapter.query(&q.sql, &q.params).await?.into_iter().next();
        match row {
            Some(row) => Ok(decode_row(schema, row)),
            None => Err(AppError::RecordNotFound {
                resource: resource.to_string(),
                id: id.to_string(),
            }),
        }
    }

    /// Create up to 100 records in one transaction. Any failure rolls back all of them.
    pub async fn bulk_create(&self, resource: &str, items: Vec<Record>) -> Result<Vec<Record>, AppError> {
        if items.len() > MAX_BULK_CREATE {
            return Err(AppError::Validation(format!(
                "bulk create accepts at most {} records, got {}",
                MAX_BULK_CREATE,
                items.len()
            )));
        }
        self.bulk_create_inner(resource, items)
            .await
            .map_err(|e| AppError::operation("create", resource, e))
    }

    async fn bulk_create_inner(&self, resource: &str, items: Vec<Record>) -> Result<Vec<Record>, AppError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let mut prepared = Vec::with_capacity(items.len());
        for data in items {
            prepared.push(self.prepare_create(resource, data).await?);
        }
        // DDL stays outside the transaction so a rollback never leaves the schema ahead of the table.
        for (_, data) in &prepared {
            self.ensure_fields_exist(resource, data).await?;
        }
        let schema = self.schema(resource).await?;

        let mut tx = self.adapter.begin_transaction().await?;
        for (_, data) in &prepared {
            let q = insert(resource, &self.write_values(&schema, data));
            if let Err(e) = tx.execute(&q.sql, &q.params).await {
                if let Err(rb) = tx.rollback().await {
                    tracing::warn!(resource, error = %rb, "rollback failed");
                }
                return Err(e);
            }
        }
        tx.commit().await?;
        self.invalidate(resource).await;
        tracing::debug!(resource, count = prepared.len(), "bulk create committed");

        let ids: Vec<SqlValue> = prepared.iter().map(|(id, _)| SqlValue::from(id.as_str())).collect();
        let q = select_by_column_in(resource, "id", &ids);
        let mut by_id: HashMap<String, Record> = HashMap::new();
        for row in self.adapter.query(&q.sql, &q.params).await? {
            let rec = decode_row(&schema, row);
            if let Some(Value::String(id)) = rec.get("id") {
                by_id.insert(id.clone(), rec);
            }
        }
        Ok(prepared.iter().filter_map(|(id, _)| by_id.remove(id)).collect())
    }

    /// Update by id. New keys extend the schema like on create; stamps `updated_at`.
    pub async fn update(&self, resource: &str, id: &str, data: Record) -> Result<Record, AppError> {
        self.update_inner(resource, id, data)
            .await
            .map_err(|e| AppError::operation("update", resource, e))
    }

    async fn update_inner(&self, resource: &str, id: &str, mut data: Record) -> Result<Record, AppError> {
        validate_identifier(resource)?;
        if self.get_schema(resource).await.is_none() && !self.adapter.table_exists(resource).await? {
            return Err(AppError::MissingTable(resource.to_string()));
        }
        data.remove("id");
        let schema = self.ensure_fields_exist(resource, &data).await?;
        let q = update(resource, id, &self.write_values(&schema, &data));
        let result = self.adapter.execute(&q.sql, &q.params).await?;
        if result.changes == 0 {
            return Err(AppError::RecordNotFound {
                resource: resource.to_string(),
                id: id.to_string(),
            });
        }
        self.invalidate(resource).await;
        self.read_back(resource, &schema, id).await
    }

    /// Delete by id. Returns whether a row was removed; hooks run only then.
    pub async fn delete(&self, resource: &str, id: &str) -> Result<bool, AppError> {
        self.delete_inner(resource, id)
            .await
            .map_err(|e| AppError::operation("delete", resource, e))
    }

    async fn delete_inner(&self, resource: &str, id: &str) -> Result<bool, AppError> {
        validate_identifier(resource)?;
        let q = delete(resource, id);
        let result = self.adapter.execute(&q.sql, &q.params).await?;
        if result.changes == 0 {
            return Ok(false);
        }
        self.hooks.run_after_delete(resource, id).await?;
        self.invalidate(resource).await;
        Ok(true)
    }

    // ---- reads ----

    pub async fn find_by_id(&self, resource: &str, id: &str, populate: &[&str]) -> Result<Option<Record>, AppError> {
        validate_identifier(resource)?;
        let schema = self.get_schema(resource).await.unwrap_or_default();
        let q = select_by_id(resource, &[], id);
        let rows = match self.read_rows(resource, &q.sql, &q.params).await? {
            Some(rows) => rows,
            None => return Ok(None),
        };
        let mut records: Vec<Record> = rows.into_iter().map(|r| decode_row(&schema, r)).collect();
        let fields: Vec<String> = populate.iter().map(|s| s.to_string()).collect();
        self.populate(resource, &schema, &mut records, &fields).await?;
        Ok(records.into_iter().next())
    }

    pub async fn find_all(&self, resource: &str, opts: &FindOptions) -> Result<Vec<Record>, AppError> {
        validate_identifier(resource)?;
        let schema = self.get_schema(resource).await.unwrap_or_default();
        let spec = ListSpec {
            columns: self.projection(&schema, opts),
            predicates: self.predicates(&schema, &opts.filter)?,
            order: self.order(&schema, &opts.sort),
            limit: opts.limit.unwrap_or(DEFAULT_LIMIT),
            offset: opts.offset.unwrap_or(0),
        };
        let q = select_list(resource, &spec);
        let rows = match self.read_rows(resource, &q.sql, &q.params).await? {
            Some(rows) => rows,
            None => return Ok(Vec::new()),
        };
        let mut records: Vec<Record> = rows.into_iter().map(|r| decode_row(&schema, r)).collect();
        self.populate(resource, &schema, &mut records, &opts.populate).await?;
        Ok(records)
    }

    /// Number of rows matching `filter`; a missing table counts zero.
    pub async fn count(&self, resource: &str, filter: &Filter) -> Result<u64, AppError> {
        validate_identifier(resource)?;
        let schema = self.get_schema(resource).await.unwrap_or_default();
        let q = count(resource, &self.predicates(&schema, filter)?);
        let rows = match self.read_rows(resource, &q.sql, &q.params).await? {
            Some(rows) => rows,
            None => return Ok(0),
        };
        Ok(rows
            .first()
            .and_then(|r| r.get("count"))
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }

    /// `None` when the table does not exist yet.
    async fn read_rows(
        &self,
        resource: &str,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Option<Vec<Record>>, AppError> {
        match self.adapter.query(sql, params).await {
            Ok(rows) => Ok(Some(rows)),
            Err(e) if e.is_missing_table() => {
                tracing::debug!(resource, "read on missing table");
                Ok(None)
            }
            Err(e) => Err(AppError::operation("find", resource, e)),
        }
    }

    /// Physical column for a logical field, system column or relation key.
    fn resolve_column(schema: &TableSchema, field: &str) -> Option<String> {
        if is_system_column(field) {
            return Some(field.to_string());
        }
        if schema.field(field).is_some() {
            return Some(schema.column_for(field));
        }
        schema.field_for_column(field).map(|_| field.to_string())
    }

    fn projection(&self, schema: &TableSchema, opts: &FindOptions) -> Vec<String> {
        if opts.select.is_empty() {
            return Vec::new();
        }
        let mut columns = vec!["id".to_string()];
        let wanted = opts.select.iter().chain(opts.populate.iter());
        for field in wanted {
            if let Some(column) = Self::resolve_column(schema, field) {
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
        }
        columns
    }

    fn predicates(&self, schema: &TableSchema, filter: &Filter) -> Result<Vec<Predicate>, AppError> {
        let db = self.adapter.database_type();
        let mut out = Vec::with_capacity(filter.conditions().len());
        for cond in filter.conditions() {
            let column = match Self::resolve_column(schema, &cond.field) {
                Some(c) => c,
                None => {
                    tracing::debug!(field = %cond.field, "filter on unknown field dropped");
                    continue;
                }
            };
            let bind = |v: &Value| column_value(schema, &cond.field, v, db);
            let predicate = match cond.op {
                FilterOp::In => match &cond.value {
                    Value::Array(items) => Predicate::any_of(column, items.iter().map(bind).collect()),
                    other => {
                        return Err(AppError::Validation(format!(
                            "'in' on {} requires an array, got {}",
                            cond.field, other
                        )))
                    }
                },
                FilterOp::Like => Predicate::new(
                    column,
                    FilterOp::Like,
                    match &cond.value {
                        Value::String(s) => SqlValue::Text(s.clone()),
                        other => SqlValue::Text(other.to_string()),
                    },
                ),
                op => Predicate::new(column, op, bind(&cond.value)),
            };
            out.push(predicate);
        }
        Ok(out)
    }

    fn order(&self, schema: &TableSchema, sort: &[Sort]) -> Vec<(String, SortDirection)> {
        let order: Vec<(String, SortDirection)> = sort
            .iter()
            .filter_map(|s| Self::resolve_column(schema, &s.field).map(|c| (c, s.direction)))
            .collect();
        if order.is_empty() {
            vec![
                ("created_at".to_string(), SortDirection::Asc),
                ("id".to_string(), SortDirection::Asc),
            ]
        } else {
            order
        }
    }

    /// Replace relation ids with the referenced records: one query per relation field.
    async fn populate(
        &self,
        resource: &str,
        schema: &TableSchema,
        records: &mut [Record],
        fields: &[String],
    ) -> Result<(), AppError> {
        if records.is_empty() {
            return Ok(());
        }
        for field in fields {
            let target = match schema.field(field) {
                Some(def) if def.is_relation() => match def.target.as_deref() {
                    Some(t) => t,
                    None => continue,
                },
                _ => {
                    tracing::debug!(resource, field = %field, "populate on non-relation field ignored");
                    continue;
                }
            };
            let mut seen = HashSet::new();
            let ids: Vec<SqlValue> = records
                .iter()
                .filter_map(|r| r.get(field.as_str()).and_then(Value::as_str))
                .filter(|id| seen.insert(id.to_string()))
                .map(SqlValue::from)
                .collect();
            if ids.is_empty() {
                continue;
            }
            let q = select_by_column_in(target, "id", &ids);
            let rows = self.read_rows(target, &q.sql, &q.params).await?.unwrap_or_default();
            let target_schema = self.get_schema(target).await.unwrap_or_default();
            let by_id: HashMap<String, Record> = rows
                .into_iter()
                .map(|r| decode_row(&target_schema, r))
                .filter_map(|r| {
                    let id = r.get("id")?.as_str()?.to_string();
                    Some((id, r))
                })
                .collect();
            for rec in records.iter_mut() {
                let found = rec
                    .get(field.as_str())
                    .and_then(Value::as_str)
                    .and_then(|id| by_id.get(id))
                    .cloned();
                if let Some(found) = found {
                    rec.insert(field.clone(), Value::Object(found));
                }
            }
        }
        Ok(())
    }

    // ---- hooks ----

    pub fn on_before_create<H>(&self, resource: &str, hook: H) -> HookId
    where
        H: BeforeCreateHook + 'static,
    {
        self.hooks.on_before_create(resource, Arc::new(hook))
    }

    pub fn on_after_delete<H>(&self, resource: &str, hook: H) -> HookId
    where
        H: AfterDeleteHook + 'static,
    {
        self.hooks.on_after_delete(resource, Arc::new(hook))
    }

    pub fn unsubscribe(&self, id: HookId) -> bool {
        self.hooks.unsubscribe(id)
    }
}
