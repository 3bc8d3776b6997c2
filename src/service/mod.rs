//! Table manager and the pieces it is built from.

pub mod coerce;
pub mod hooks;
mod manager;

pub use hooks::{AfterDeleteHook, BeforeCreateHook, HookId, HookRegistry};
pub use manager::{DynamicTableManager, FindOptions, DEFAULT_LIMIT, MAX_BULK_CREATE};

/// A record as seen by callers: column or field name to value, always with `id`.
pub type Record = serde_json::Map<String, serde_json::Value>;
