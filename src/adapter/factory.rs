//! Builds and holds the one adapter per factory, lazily and resettably.

use crate::adapter::{DatabaseAdapter, PostgresAdapter, SqliteAdapter};
use crate::config::{validate, DatabaseConfig, DatabaseType};
use crate::error::{AppError, ConfigError};
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;

type ConfigSource = Box<dyn Fn() -> Result<DatabaseConfig, ConfigError> + Send + Sync>;

pub struct AdapterFactory {
    source: ConfigSource,
    adapter: Mutex<Option<Arc<dyn DatabaseAdapter>>>,
}

static GLOBAL: OnceLock<AdapterFactory> = OnceLock::new();

impl AdapterFactory {
    /// Factory that rereads the environment each time it (re)builds.
    pub fn from_env() -> Self {
        AdapterFactory {
            source: Box::new(DatabaseConfig::from_env),
            adapter: Mutex::new(None),
        }
    }

    pub fn with_config(config: DatabaseConfig) -> Self {
        AdapterFactory {
            source: Box::new(move || Ok(config.clone())),
            adapter: Mutex::new(None),
        }
    }

    /// Process-wide factory configured from the environment.
    pub fn global() -> &'static AdapterFactory {
        GLOBAL.get_or_init(AdapterFactory::from_env)
    }

    /// Return the connected adapter, building it on first call.
    pub async fn create_adapter(&self) -> Result<Arc<dyn DatabaseAdapter>, AppError> {
        let mut slot = self.adapter.lock().await;
        if let Some(adapter) = slot.as_ref() {
            return Ok(adapter.clone());
        }
        let config = (self.source)()?;
        validate(&config)?;
        let adapter = build_adapter(&config);
        adapter.connect().await?;
        tracing::info!(database_type = %config.database_type, "adapter created");
        *slot = Some(adapter.clone());
        Ok(adapter)
    }

    /// Disconnect and forget the current adapter; the next `create_adapter` rebuilds.
    pub async fn reset_adapter(&self) -> Result<(), AppError> {
        let adapter = self.adapter.lock().await.take();
        if let Some(adapter) = adapter {
            adapter.disconnect().await?;
            tracing::info!("adapter reset");
        }
        Ok(())
    }

    pub async fn has_adapter(&self) -> bool {
        self.adapter.lock().await.is_some()
    }
}

/// Unconnected adapter for the configured engine.
pub fn build_adapter(config: &DatabaseConfig) -> Arc<dyn DatabaseAdapter> {
    match config.database_type {
        DatabaseType::Sqlite => Arc::new(SqliteAdapter::new(config.sqlite.clone())),
        DatabaseType::Postgres => Arc::new(PostgresAdapter::new(config.postgres.clone())),
    }
}
