//! Dynamic table SDK: schema-inferring data layer over SQLite and PostgreSQL.
//!
//! Resources are created and widened from the data written to them; a
//! [`DynamicTableManager`] owns the schema cache and talks to the engine only
//! through a [`DatabaseAdapter`].

pub mod adapter;
pub mod cache;
pub mod config;
pub mod error;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use adapter::{AdapterFactory, AdapterTransaction, DatabaseAdapter, PostgresAdapter, SqliteAdapter};
pub use cache::{CacheHook, NoopCache};
pub use config::{DatabaseConfig, DatabaseType, PostgresConfig, SqliteConfig, StoreConfig};
pub use error::{AppError, ConfigError, ConstraintKind};
pub use schema::{generate_schema_from_data, CascadeRule, FieldDefinition, FieldKind, TableSchema};
pub use service::{DynamicTableManager, FindOptions, HookId, Record};
pub use sql::{Filter, FilterOp, Sort, SortDirection, SqlValue};
pub use state::AppState;
pub use store::SchemaStore;
