mod common;

use async_trait::async_trait;
use common::{harness, id_of, record, CountingAdapter};
use dynamic_table_sdk::{
    AppError, CacheHook, DatabaseAdapter, DynamicTableManager, Filter, FieldDefinition, FieldKind, FindOptions, SchemaStore,
    SqlValue, TableSchema,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn product_schema() -> TableSchema {
    TableSchema::new()
        .with_field("name", FieldDefinition::new(FieldKind::String).required())
        .with_field("price", FieldDefinition::new(FieldKind::Decimal))
        .with_field("inStock", FieldDefinition::new(FieldKind::Boolean))
}

#[tokio::test]
async fn create_table_from_schema_is_idempotent() {
    let h = harness().await;
    h.manager.create_table_from_schema("Product", &product_schema()).await.unwrap();
    assert_eq!(h.adapter.ddl(), 1);
    let stored = SchemaStore::new(h.dir.path()).load("Product").await.unwrap();

    h.manager.create_table_from_schema("Product", &product_schema()).await.unwrap();
    assert_eq!(h.adapter.ddl(), 1);
    assert_eq!(SchemaStore::new(h.dir.path()).load("Product").await.unwrap(), stored);
    assert_eq!(h.manager.schema("Product").await.unwrap(), product_schema());
}

#[tokio::test]
async fn schema_only_grows_and_never_retypes() {
    let h = harness().await;
    h.manager.create("Reading", record(json!({"value": 1}))).await.unwrap();
    h.manager
        .create("Reading", record(json!({"value": "high", "unit": "C"})))
        .await
        .unwrap();
    h.manager
        .create("Reading", record(json!({"note": null})))
        .await
        .unwrap();

    let schema = h.manager.schema("Reading").await.unwrap();
    assert_eq!(schema.field("value").unwrap().kind, FieldKind::Integer);
    assert_eq!(schema.field("unit").unwrap().kind, FieldKind::String);
    assert_eq!(schema.field("note").unwrap().kind, FieldKind::String);
    assert_eq!(schema.fields.len(), 3);

    // Declaring a narrower schema later does not drop or retype anything.
    let narrower = TableSchema::new().with_field("value", FieldDefinition::new(FieldKind::Json));
    h.manager.create_table_from_schema("Reading", &narrower).await.unwrap();
    let after = h.manager.schema("Reading").await.unwrap();
    assert_eq!(after, schema);
}

#[tokio::test]
async fn boolean_and_json_round_trip() {
    let h = harness().await;
    let created = h
        .manager
        .create(
            "Setting",
            record(json!({"flag": true, "meta": {"a": 1, "tags": ["x"]}, "label": "{not json"})),
        )
        .await
        .unwrap();
    let id = id_of(&created);
    let read = h.manager.find_by_id("Setting", &id, &[]).await.unwrap().unwrap();
    assert_eq!(read.get("flag"), Some(&json!(true)));
    assert_eq!(read.get("meta"), Some(&json!({"a": 1, "tags": ["x"]})));
    assert_eq!(read.get("label"), Some(&json!("{not json")));

    let off = h
        .manager
        .update("Setting", &id, record(json!({"flag": false})))
        .await
        .unwrap();
    assert_eq!(off.get("flag"), Some(&json!(false)));
}

#[tokio::test]
async fn inferred_kinds_from_first_write() {
    let h = harness().await;
    h.manager
        .create(
            "Contact",
            record(json!({
                "email": "a@example.com",
                "seen": "2024-05-01T10:00:00Z",
                "age": 30,
                "score": 4.5,
                "bio": "x".repeat(300),
            })),
        )
        .await
        .unwrap();
    let schema = h.manager.schema("Contact").await.unwrap();
    let kind = |f: &str| schema.field(f).unwrap().kind;
    assert_eq!(kind("email"), FieldKind::Email);
    assert_eq!(kind("seen"), FieldKind::Datetime);
    assert_eq!(kind("age"), FieldKind::Integer);
    assert_eq!(kind("score"), FieldKind::Decimal);
    assert_eq!(kind("bio"), FieldKind::Text);

    let rows = h
        .manager
        .find_all(
            "Contact",
            &FindOptions::new().filter(Filter::new().gt("seen", "2024-04-01T00:00:00Z")),
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn initialize_rebuilds_tables_from_persisted_schemas() {
    let h = harness().await;
    h.manager.create_table_from_schema("Product", &product_schema()).await.unwrap();
    h.manager.create("Note", record(json!({"text": "hi"}))).await.unwrap();

    // Fresh database, same schema directory.
    let adapter = CountingAdapter::in_memory().await;
    let manager = DynamicTableManager::new(adapter.clone(), Arc::new(SchemaStore::new(h.dir.path())));
    assert_eq!(manager.initialize().await.unwrap(), 2);
    assert_eq!(manager.resources(), vec!["Note".to_string(), "Product".to_string()]);

    assert_eq!(
        adapter.get_all_tables().await.unwrap(),
        vec!["Note".to_string(), "Product".to_string()]
    );
    let cols: Vec<String> = adapter
        .get_table_columns("Product")
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert!(cols.contains(&"inStock".to_string()));

    // Replaying again is a no-op for DDL.
    let before = adapter.ddl();
    manager.initialize().await.unwrap();
    assert_eq!(adapter.ddl(), before);
}

#[tokio::test]
async fn corrupt_schema_document_falls_back_to_inference() {
    let h = harness().await;
    std::fs::write(h.dir.path().join("Broken.json"), b"{ not json").unwrap();
    assert!(h.manager.get_schema("Broken").await.is_none());

    let rec = h.manager.create("Broken", record(json!({"k": "v"}))).await.unwrap();
    assert_eq!(rec.get("k"), Some(&json!("v")));
    assert_eq!(h.manager.schema("Broken").await.unwrap().fields.len(), 1);
}

#[tokio::test]
async fn concurrent_first_writes_converge() {
    let h = harness().await;
    let (a, b) = tokio::join!(
        h.manager.create("Event", record(json!({"kind": "a"}))),
        h.manager.create("Event", record(json!({"level": 3}))),
    );
    a.unwrap();
    b.unwrap();
    let schema = h.manager.schema("Event").await.unwrap();
    assert!(schema.field("kind").is_some());
    assert!(schema.field("level").is_some());
    assert_eq!(h.manager.find_all("Event", &FindOptions::new()).await.unwrap().len(), 2);
}

#[derive(Default)]
struct RecordingCache {
    invalidations: AtomicUsize,
    schemas: AtomicUsize,
}

#[async_trait]
impl CacheHook for RecordingCache {
    async fn invalidate_table_cache(&self, _resource: &str) -> Result<(), AppError> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        Err(AppError::Hook("cache offline".into()))
    }

    async fn cache_table_schema(&self, _resource: &str, _schema: &TableSchema) -> Result<(), AppError> {
        self.schemas.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn cache_failures_never_fail_writes() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = CountingAdapter::in_memory().await;
    let cache = Arc::new(RecordingCache::default());
    let manager = DynamicTableManager::new(adapter, Arc::new(SchemaStore::new(dir.path())))
        .with_cache(cache.clone());

    let rec = manager.create("Doc", record(json!({"title": "t"}))).await.unwrap();
    manager
        .update("Doc", &id_of(&rec), record(json!({"title": "u"})))
        .await
        .unwrap();
    assert!(manager.delete("Doc", &id_of(&rec)).await.unwrap());

    assert_eq!(cache.schemas.load(Ordering::SeqCst), 1);
    // schema change + create + update + delete
    assert_eq!(cache.invalidations.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn first_write_survives_rollback_of_another_transaction() {
    let h = harness().await;
    h.manager.create("Ledger", record(json!({"amount": 1}))).await.unwrap();

    let mut tx = h.adapter.begin_transaction().await.unwrap();
    tx.execute(
        "INSERT INTO \"Ledger\" (\"id\", \"amount\") VALUES (?, ?)",
        &[SqlValue::from("pending"), SqlValue::Integer(5)],
    )
    .await
    .unwrap();

    let (created, rolled_back) = tokio::join!(
        h.manager.create("Other", record(json!({"k": "v"}))),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tx.rollback().await
        },
    );
    rolled_back.unwrap();
    assert_eq!(created.unwrap().get("k"), Some(&json!("v")));

    assert!(h.adapter.table_exists("Other").await.unwrap());
    assert_eq!(h.manager.count("Other", &Filter::new()).await.unwrap(), 1);
    h.manager.create("Other", record(json!({"k": "w"}))).await.unwrap();
    assert_eq!(h.manager.count("Other", &Filter::new()).await.unwrap(), 2);
    assert_eq!(h.manager.count("Ledger", &Filter::new()).await.unwrap(), 1);
}

#[tokio::test]
async fn initialize_orders_chained_and_mutual_relations() {
    let dir = tempfile::tempdir().unwrap();
    let store = SchemaStore::new(dir.path());
    let text = || FieldDefinition::new(FieldKind::String);
    let docs = [
        ("Author", TableSchema::new().with_field("name", text()).with_field("publisher", FieldDefinition::relation("Publisher"))),
        ("Publisher", TableSchema::new().with_field("name", text()).with_field("region", FieldDefinition::relation("Region"))),
        ("Region", TableSchema::new().with_field("name", text())),
        ("Player", TableSchema::new().with_field("name", text()).with_field("team", FieldDefinition::relation("Team"))),
        ("Team", TableSchema::new().with_field("name", text()).with_field("captain", FieldDefinition::relation("Player"))),
    ];
    for (name, schema) in &docs {
        store.save(name, schema).await.unwrap();
    }

    // The counting adapter rejects references to tables that do not exist yet.
    let adapter = CountingAdapter::in_memory().await;
    let manager = DynamicTableManager::new(adapter.clone(), Arc::new(SchemaStore::new(dir.path())));
    assert_eq!(manager.initialize().await.unwrap(), 5);

    for (name, schema) in &docs {
        let cols: Vec<String> = adapter
            .get_table_columns(name)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        for field in schema.fields.keys() {
            assert!(cols.contains(&schema.column_for(field)), "{} lacks {}", name, field);
        }
        assert_eq!(&manager.schema(name).await.unwrap(), schema);
    }

    let region = manager.create("Region", record(json!({"name": "EU"}))).await.unwrap();
    let publisher = manager
        .create("Publisher", record(json!({"name": "P", "region": id_of(&region)})))
        .await
        .unwrap();
    let author = manager
        .create("Author", record(json!({"name": "A", "publisher": id_of(&publisher)})))
        .await
        .unwrap();
    let found = manager.find_by_id("Author", &id_of(&author), &["publisher"]).await.unwrap().unwrap();
    assert_eq!(found["publisher"]["name"], json!("P"));
}

#[tokio::test]
async fn column_added_by_a_racing_writer_is_tolerated() {
    let h = harness().await;
    h.manager.create("Sensor", record(json!({"name": "s1"}))).await.unwrap();

    h.adapter.race_add_column(true);
    let rec = h
        .manager
        .create("Sensor", record(json!({"name": "s2", "unit": "C"})))
        .await
        .unwrap();
    h.adapter.race_add_column(false);

    assert_eq!(rec.get("unit"), Some(&json!("C")));
    assert_eq!(h.manager.schema("Sensor").await.unwrap().field("unit").unwrap().kind, FieldKind::String);
    let persisted = SchemaStore::new(h.dir.path()).load("Sensor").await.unwrap();
    assert!(persisted.field("unit").is_some());
}

#[tokio::test]
async fn booleans_in_string_fields_read_back_as_text() {
    let h = harness().await;
    h.manager.create("Label", record(json!({"text": "plain"}))).await.unwrap();
    let rec = h.manager.create("Label", record(json!({"text": true}))).await.unwrap();
    assert_eq!(rec.get("text"), Some(&json!("true")));
}
