//! Configuration types for the adapter factory and the schema store.

use crate::error::ConfigError;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "./data/database.sqlite";
pub const DEFAULT_SCHEMA_DIR: &str = "./data/schemas";
pub const DEFAULT_POOL_SIZE: u32 = 10;

/// Engine selected by `DATABASE_TYPE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatabaseType {
    Sqlite,
    Postgres,
}

impl DatabaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::Sqlite => "sqlite",
            DatabaseType::Postgres => "postgresql",
        }
    }
}

impl std::str::FromStr for DatabaseType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(DatabaseType::Sqlite),
            "postgresql" | "postgres" | "pg" => Ok(DatabaseType::Postgres),
            other => Err(ConfigError::UnknownDatabaseType(other.to_string())),
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SqliteConfig {
    /// File path, or `:memory:` for a private in-memory database.
    pub path: String,
}

impl SqliteConfig {
    pub fn in_memory() -> Self {
        SqliteConfig {
            path: ":memory:".into(),
        }
    }

    pub fn is_memory(&self) -> bool {
        self.path == ":memory:"
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        SqliteConfig {
            path: DEFAULT_DB_PATH.into(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub ssl: bool,
    pub pool_size: u32,
}

// Keeps the password out of logs.
impl std::fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("ssl", &self.ssl)
            .field("pool_size", &self.pool_size)
            .finish_non_exhaustive()
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        PostgresConfig {
            host: "localhost".into(),
            port: 5432,
            database: "postgres".into(),
            user: "postgres".into(),
            password: String::new(),
            ssl: false,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

/// Everything the adapter factory needs to build one adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub database_type: DatabaseType,
    pub sqlite: SqliteConfig,
    pub postgres: PostgresConfig,
}

impl DatabaseConfig {
    pub fn sqlite(path: impl Into<String>) -> Self {
        DatabaseConfig {
            database_type: DatabaseType::Sqlite,
            sqlite: SqliteConfig { path: path.into() },
            postgres: PostgresConfig::default(),
        }
    }

    pub fn postgres(postgres: PostgresConfig) -> Self {
        DatabaseConfig {
            database_type: DatabaseType::Postgres,
            sqlite: SqliteConfig::default(),
            postgres,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            database_type: DatabaseType::Sqlite,
            sqlite: SqliteConfig::default(),
            postgres: PostgresConfig::default(),
        }
    }
}

/// Where schema documents live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    pub schema_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            schema_dir: PathBuf::from(DEFAULT_SCHEMA_DIR),
        }
    }
}
