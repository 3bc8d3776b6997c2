//! Collaborator notified after writes and schema changes. Failures are logged by
//! the caller and never fail the originating operation.

use crate::error::AppError;
use crate::schema::TableSchema;
use async_trait::async_trait;

#[async_trait]
pub trait CacheHook: Send + Sync {
    async fn invalidate_table_cache(&self, resource: &str) -> Result<(), AppError>;

    async fn cache_table_schema(&self, resource: &str, schema: &TableSchema) -> Result<(), AppError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCache;

#[async_trait]
impl CacheHook for NoopCache {
    async fn invalidate_table_cache(&self, _resource: &str) -> Result<(), AppError> {
        Ok(())
    }

    async fn cache_table_schema(&self, _resource: &str, _schema: &TableSchema) -> Result<(), AppError> {
        Ok(())
    }
}
