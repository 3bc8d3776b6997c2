//! Shared handles for an embedding service: one manager over one adapter and schema store.

use crate::adapter::{AdapterFactory, DatabaseAdapter};
use crate::config::StoreConfig;
use crate::error::AppError;
use crate::service::DynamicTableManager;
use crate::store::SchemaStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub adapter: Arc<dyn DatabaseAdapter>,
    pub store: Arc<SchemaStore>,
    pub manager: Arc<DynamicTableManager>,
}

impl AppState {
    /// Wire adapter, schema store and manager, then reconcile persisted schemas.
    pub async fn build(adapter: Arc<dyn DatabaseAdapter>, store_config: &StoreConfig) -> Result<Self, AppError> {
        let store = Arc::new(SchemaStore::from_config(store_config));
        let manager = Arc::new(DynamicTableManager::new(adapter.clone(), store.clone()));
        manager.initialize().await?;
        Ok(AppState {
            adapter,
            store,
            manager,
        })
    }

    /// Everything from the environment, using the given factory for the adapter.
    pub async fn from_env(factory: &AdapterFactory) -> Result<Self, AppError> {
        let adapter = factory.create_adapter().await?;
        let store_config = StoreConfig::from_env();
        Self::build(adapter, &store_config).await
    }
}
