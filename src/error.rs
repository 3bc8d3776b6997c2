//! Typed errors for the data layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown database type: {0} (expected sqlite or postgresql)")]
    UnknownDatabaseType(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("validation: {0}")]
    Validation(String),
}

/// Which constraint an adapter reported as violated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintKind {
    ForeignKey,
    Unique,
    NotNull,
    Check,
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConstraintKind::ForeignKey => "foreign key",
            ConstraintKind::Unique => "unique",
            ConstraintKind::NotNull => "not null",
            ConstraintKind::Check => "check",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("schema not found: {0}")]
    SchemaNotFound(String),
    #[error("Record not found")]
    RecordNotFound { resource: String, id: String },
    #[error("adapter connection: {0}")]
    AdapterConnection(String),
    #[error("{kind} constraint violation: {message}")]
    ConstraintViolation { kind: ConstraintKind, message: String },
    #[error("table does not exist: {0}")]
    MissingTable(String),
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("hook: {0}")]
    Hook(String),
    #[error("Failed to {verb} record in {resource}: {source}")]
    Operation {
        verb: &'static str,
        resource: String,
        #[source]
        source: Box<AppError>,
    },
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Wrap a write-path failure with the verb and resource it happened on.
    pub fn operation(verb: &'static str, resource: &str, source: AppError) -> Self {
        AppError::Operation {
            verb,
            resource: resource.to_string(),
            source: Box::new(source),
        }
    }

    /// Innermost error beneath any `Operation` wrappers.
    pub fn root_cause(&self) -> &AppError {
        let mut current = self;
        while let AppError::Operation { source, .. } = current {
            current = source;
        }
        current
    }

    pub fn is_missing_table(&self) -> bool {
        matches!(self.root_cause(), AppError::MissingTable(_))
    }

    pub fn is_record_not_found(&self) -> bool {
        matches!(self.root_cause(), AppError::RecordNotFound { .. })
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self.root_cause(), AppError::ConstraintViolation { .. })
    }
}
