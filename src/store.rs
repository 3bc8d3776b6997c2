//! Durable schema persistence: one JSON document per resource under a directory,
//! written atomically (temp file + rename) and cached in-process after first read.

use crate::config::StoreConfig;
use crate::error::AppError;
use crate::schema::TableSchema;
use crate::sql::validate_identifier;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

const EXTENSION: &str = "json";

pub struct SchemaStore {
    dir: PathBuf,
    cache: RwLock<HashMap<String, TableSchema>>,
}

impl SchemaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SchemaStore {
            dir: dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.schema_dir.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, resource: &str) -> Result<PathBuf, AppError> {
        validate_identifier(resource)?;
        Ok(self.dir.join(format!("{}.{}", resource, EXTENSION)))
    }

    /// Overwrite the document for `resource`. Callers read-modify-write; there is no merge.
    pub async fn save(&self, resource: &str, schema: &TableSchema) -> Result<(), AppError> {
        let final_path = self.path_for(resource)?;
        let temp_path = self.dir.join(format!("{}.{}.tmp", resource, EXTENSION));
        let body = serde_json::to_vec_pretty(schema)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&temp_path, &body).await?;
        tokio::fs::rename(&temp_path, &final_path).await?;

        self.cache_put(resource, schema.clone());
        tracing::debug!(resource, fields = schema.fields.len(), "schema saved");
        Ok(())
    }

    /// Load the document for `resource`. Missing, unreadable and corrupt documents all yield `None`.
    pub async fn load(&self, resource: &str) -> Option<TableSchema> {
        if let Some(schema) = self.cache_get(resource) {
            return Some(schema);
        }
        let path = match self.path_for(resource) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(resource, error = %e, "refusing to load schema");
                return None;
            }
        };
        let schema = read_document(&path).await?;
        self.cache_put(resource, schema.clone());
        Some(schema)
    }

    /// Every readable document in the directory, keyed by resource name.
    pub async fn load_all(&self) -> HashMap<String, TableSchema> {
        let mut out = HashMap::new();
        for resource in self.list().await {
            if let Some(schema) = self.load(&resource).await {
                out.insert(resource, schema);
            }
        }
        out
    }

    /// Remove the document. Returns whether one existed.
    pub async fn delete(&self, resource: &str) -> Result<bool, AppError> {
        let path = self.path_for(resource)?;
        self.cache_remove(resource);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Resource names with a document on disk, sorted.
    pub async fn list(&self) -> Vec<String> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(e) => e,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(dir = %self.dir.display(), error = %e, "cannot list schema directory");
                }
                return Vec::new();
            }
        };
        let mut names = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                        continue;
                    }
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        if validate_identifier(stem).is_ok() {
                            names.push(stem.to_string());
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(dir = %self.dir.display(), error = %e, "schema directory read failed");
                    break;
                }
            }
        }
        names.sort();
        names
    }

    pub async fn exists(&self, resource: &str) -> bool {
        if self.cache_get(resource).is_some() {
            return true;
        }
        match self.path_for(resource) {
            Ok(path) => tokio::fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Drop the in-process copy so the next `load` reads the file again.
    pub fn evict(&self, resource: &str) {
        self.cache_remove(resource);
    }

    fn cache_get(&self, resource: &str) -> Option<TableSchema> {
        self.cache.read().ok().and_then(|c| c.get(resource).cloned())
    }

    fn cache_put(&self, resource: &str, schema: TableSchema) {
        if let Ok(mut c) = self.cache.write() {
            c.insert(resource.to_string(), schema);
        }
    }

    fn cache_remove(&self, resource: &str) {
        if let Ok(mut c) = self.cache.write() {
            c.remove(resource);
        }
    }
}

async fn read_document(path: &Path) -> Option<TableSchema> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable schema document, treating as absent");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(schema) => Some(schema),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "corrupt schema document, treating as absent");
            None
        }
    }
}
