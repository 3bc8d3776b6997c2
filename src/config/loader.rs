//! Load configuration from the process environment (and `.env` via dotenvy).

use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use std::path::PathBuf;

impl DatabaseConfig {
    /// Read `DATABASE_TYPE`, `DB_PATH` and `POSTGRES_*` from the environment.
    /// A `.env` file in the working directory is loaded first when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`DatabaseConfig::from_env`] with an explicit key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_type = match get("DATABASE_TYPE") {
            Some(s) => s.parse()?,
            None => DatabaseType::Sqlite,
        };

        let defaults = PostgresConfig::default();
        let port = match get("POSTGRES_PORT") {
            Some(s) => s.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                key: "POSTGRES_PORT",
                value: s,
            })?,
            None => defaults.port,
        };
        let pool_size = match get("POSTGRES_POOL_SIZE") {
            Some(s) => s.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
                key: "POSTGRES_POOL_SIZE",
                value: s,
            })?,
            None => defaults.pool_size,
        };
        let ssl = get("POSTGRES_SSL")
            .map(|s| matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "require"))
            .unwrap_or(false);

        let config = DatabaseConfig {
            database_type,
            sqlite: SqliteConfig {
                path: get("DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.into()),
            },
            postgres: PostgresConfig {
                host: get("POSTGRES_HOST").unwrap_or(defaults.host),
                port,
                database: get("POSTGRES_DB").unwrap_or(defaults.database),
                user: get("POSTGRES_USER").unwrap_or(defaults.user),
                password: lookup("POSTGRES_PASSWORD").unwrap_or_default(),
                ssl,
                pool_size,
            },
        };
        validate(&config)?;
        Ok(config)
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let schema_dir = lookup("SCHEMA_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEMA_DIR));
        StoreConfig { schema_dir }
    }
}
