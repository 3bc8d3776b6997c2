//! Config validation: reject settings the factory cannot build an adapter from.

use crate::config::{DatabaseConfig, DatabaseType};
use crate::error::ConfigError;

pub fn validate(config: &DatabaseConfig) -> Result<(), ConfigError> {
    match config.database_type {
        DatabaseType::Sqlite => {
            if config.sqlite.path.trim().is_empty() {
                return Err(ConfigError::Validation("DB_PATH must not be empty".into()));
            }
        }
        DatabaseType::Postgres => {
            let pg = &config.postgres;
            if pg.host.trim().is_empty() {
                return Err(ConfigError::Validation("POSTGRES_HOST must not be empty".into()));
            }
            if pg.database.trim().is_empty() {
                return Err(ConfigError::Validation("POSTGRES_DB must not be empty".into()));
            }
            if pg.pool_size == 0 {
                return Err(ConfigError::Validation("POSTGRES_POOL_SIZE must be at least 1".into()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PostgresConfig;

    #[test]
    fn sqlite_requires_path() {
        assert!(validate(&DatabaseConfig::sqlite(":memory:")).is_ok());
        assert!(validate(&DatabaseConfig::sqlite("  ")).is_err());
    }

    #[test]
    fn postgres_requires_pool() {
        let mut pg = PostgresConfig::default();
        assert!(validate(&DatabaseConfig::postgres(pg.clone())).is_ok());
        pg.pool_size = 0;
        assert!(validate(&DatabaseConfig::postgres(pg)).is_err());
    }
}
