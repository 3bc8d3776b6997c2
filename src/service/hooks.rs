//! Per-manager lifecycle hooks. Subscriptions are scoped to a resource, run in
//! registration order, and can be removed with the returned [`HookId`].

use crate::error::AppError;
use crate::service::Record;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HookId(u64);

/// Runs before a record is inserted and may rewrite it.
#[async_trait]
pub trait BeforeCreateHook: Send + Sync {
    async fn before_create(&self, resource: &str, record: &mut Record) -> Result<(), AppError>;
}

/// Runs after a row was actually removed.
#[async_trait]
pub trait AfterDeleteHook: Send + Sync {
    async fn after_delete(&self, resource: &str, id: &str) -> Result<(), AppError>;
}

#[async_trait]
impl<F> BeforeCreateHook for F
where
    F: Fn(&str, &mut Record) -> Result<(), AppError> + Send + Sync,
{
    async fn before_create(&self, resource: &str, record: &mut Record) -> Result<(), AppError> {
        self(resource, record)
    }
}

#[async_trait]
impl<F> AfterDeleteHook for F
where
    F: Fn(&str, &str) -> Result<(), AppError> + Send + Sync,
{
    async fn after_delete(&self, resource: &str, id: &str) -> Result<(), AppError> {
        self(resource, id)
    }
}

type Subscriptions<H> = RwLock<HashMap<String, Vec<(HookId, Arc<H>)>>>;

#[derive(Default)]
pub struct HookRegistry {
    next_id: AtomicU64,
    before_create: Subscriptions<dyn BeforeCreateHook>,
    after_delete: Subscriptions<dyn AfterDeleteHook>,
}

fn subscribe<H: ?Sized>(subs: &Subscriptions<H>, resource: &str, id: HookId, hook: Arc<H>) {
    let mut map = subs.write().unwrap_or_else(|p| p.into_inner());
    map.entry(resource.to_string()).or_default().push((id, hook));
}

fn remove<H: ?Sized>(subs: &Subscriptions<H>, id: HookId) -> bool {
    let mut map = subs.write().unwrap_or_else(|p| p.into_inner());
    let mut removed = false;
    for list in map.values_mut() {
        let before = list.len();
        list.retain(|(hid, _)| *hid != id);
        removed |= list.len() != before;
    }
    map.retain(|_, list| !list.is_empty());
    removed
}

// Cloned out so no lock is held across an await.
fn snapshot<H: ?Sized>(subs: &Subscriptions<H>, resource: &str) -> Vec<Arc<H>> {
    let map = subs.read().unwrap_or_else(|p| p.into_inner());
    map.get(resource)
        .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
        .unwrap_or_default()
}

impl HookRegistry {
    pub fn new() -> Self {
        HookRegistry::default()
    }

    fn allocate(&self) -> HookId {
        HookId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn on_before_create(&self, resource: &str, hook: Arc<dyn BeforeCreateHook>) -> HookId {
        let id = self.allocate();
        subscribe(&self.before_create, resource, id, hook);
        id
    }

    pub fn on_after_delete(&self, resource: &str, hook: Arc<dyn AfterDeleteHook>) -> HookId {
        let id = self.allocate();
        subscribe(&self.after_delete, resource, id, hook);
        id
    }

    /// Remove a subscription of either kind. Returns whether it existed.
    pub fn unsubscribe(&self, id: HookId) -> bool {
        remove(&self.before_create, id) || remove(&self.after_delete, id)
    }

    pub async fn run_before_create(&self, resource: &str, record: &mut Record) -> Result<(), AppError> {
        for hook in snapshot(&self.before_create, resource) {
            hook.before_create(resource, record).await?;
        }
        Ok(())
    }

    pub async fn run_after_delete(&self, resource: &str, id: &str) -> Result<(), AppError> {
        for hook in snapshot(&self.after_delete, resource) {
            hook.after_delete(resource, id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[tokio::test]
    async fn before_create_hooks_run_in_order_per_resource() {
        let registry = HookRegistry::new();
        registry.on_before_create(
            "User",
            Arc::new(|_: &str, r: &mut Record| -> Result<(), AppError> {
                r.insert("step".into(), json!("first"));
                Ok(())
            }),
        );
        registry.on_before_create(
            "User",
            Arc::new(|_: &str, r: &mut Record| -> Result<(), AppError> {
                let prev = r.get("step").cloned().unwrap_or_default();
                r.insert("step".into(), json!(format!("{}+second", prev.as_str().unwrap_or(""))));
                Ok(())
            }),
        );

        let mut record = Record::new();
        registry.run_before_create("User", &mut record).await.unwrap();
        assert_eq!(record.get("step"), Some(&json!("first+second")));

        let mut other = Record::new();
        registry.run_before_create("Post", &mut other).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn unsubscribe_and_error_propagation() {
        let registry = HookRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = registry.on_after_delete(
            "User",
            Arc::new(move |_: &str, id: &str| -> Result<(), AppError> {
                sink.lock().unwrap().push(id.to_string());
                Ok(())
            }),
        );
        registry.run_after_delete("User", "u1").await.unwrap();
        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        registry.run_after_delete("User", "u2").await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["u1".to_string()]);

        registry.on_after_delete("User", Arc::new(|_: &str, _: &str| -> Result<(), AppError> { Err(AppError::Hook("nope".into())) }));
        assert!(matches!(
            registry.run_after_delete("User", "u3").await,
            Err(AppError::Hook(_))
        ));
    }
}
