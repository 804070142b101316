//! Registry store: the single owner of registry state in a process.
//!
//! Readers get an `Arc<Registry>` snapshot and never block on persistence.
//! Mutations run as read-modify-write transactions under one async mutex:
//! clone the current snapshot, apply the change, persist the whole document,
//! then publish the new snapshot. If persisting fails the published snapshot
//! is left untouched.

use std::sync::Arc;

use agentgate_core::{AgentPatch, AgentRecord, Registry, StorageError};
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use crate::backend::RegistryBackend;

/// Concurrently shared registry with a pluggable durable form.
#[derive(Debug)]
pub struct RegistryStore {
    backend: Arc<dyn RegistryBackend>,
    snapshot: RwLock<Option<Arc<Registry>>>,
    write_lock: Mutex<()>,
}

impl RegistryStore {
    /// Create a store. Nothing is read until first access.
    pub fn new(backend: Arc<dyn RegistryBackend>) -> Self {
        Self {
            backend,
            snapshot: RwLock::new(None),
            write_lock: Mutex::new(()),
        }
    }

    pub fn backend_description(&self) -> String {
        self.backend.describe()
    }

    /// Current snapshot, loading it from the backend on first use.
    ///
    /// An absent durable registry is created empty.
    pub async fn load(&self) -> Result<Arc<Registry>, StorageError> {
        if let Some(current) = self.snapshot.read().await.as_ref() {
            return Ok(Arc::clone(current));
        }
        let _guard = self.write_lock.lock().await;
        self.current_locked().await
    }

    /// Re-read the durable registry and replace the snapshot.
    pub async fn reload(&self) -> Result<Arc<Registry>, StorageError> {
        let _guard = self.write_lock.lock().await;
        let fresh = Arc::new(self.read_backend().await?);
        *self.snapshot.write().await = Some(Arc::clone(&fresh));
        Ok(fresh)
    }

    /// Replace the whole registry.
    pub async fn save(&self, registry: Registry) -> Result<(), StorageError> {
        self.transact("save", move |current| {
            *current = registry;
            Ok(((), true))
        })
        .await
    }

    pub async fn get(&self, agent_id: &str) -> Result<Option<AgentRecord>, StorageError> {
        Ok(self.load().await?.get(agent_id).cloned())
    }

    /// All records in key order.
    pub async fn list(&self) -> Result<Vec<AgentRecord>, StorageError> {
        Ok(self.load().await?.records().cloned().collect())
    }

    /// Insert or fully replace the record under its `agent_id`.
    ///
    /// The first creation time survives re-registration.
    pub async fn upsert(&self, mut record: AgentRecord) -> Result<AgentRecord, StorageError> {
        self.transact("upsert", move |registry| {
            let previous = registry.get(&record.agent_id).and_then(|r| r.created_at);
            record.touch(Utc::now(), previous);
            registry.insert(record.clone());
            Ok((record, true))
        })
        .await
    }

    /// Merge `patch` into an existing record.
    pub async fn patch(
        &self,
        agent_id: &str,
        patch: AgentPatch,
    ) -> Result<AgentRecord, StorageError> {
        self.transact("patch", move |registry| {
            let record = registry
                .get_mut(agent_id)
                .ok_or_else(|| StorageError::AgentNotFound {
                    agent_id: agent_id.to_string(),
                })?;
            let created_at = record.created_at;
            patch.apply_to(record);
            record.touch(Utc::now(), created_at);
            Ok((record.clone(), true))
        })
        .await
    }

    /// Remove a record. Returns whether anything was removed.
    pub async fn delete(&self, agent_id: &str) -> Result<bool, StorageError> {
        self.transact("delete", move |registry| {
            let removed = registry.remove(agent_id).is_some();
            Ok((removed, removed))
        })
        .await
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    async fn read_backend(&self) -> Result<Registry, StorageError> {
        match self.backend.load().await? {
            Some(registry) => Ok(registry),
            None => {
                let empty = Registry::new();
                self.backend.save(&empty).await?;
                tracing::info!(backend = %self.backend.describe(), "Created empty agent registry");
                Ok(empty)
            }
        }
    }

    /// Current snapshot; caller must hold `write_lock`.
    async fn current_locked(&self) -> Result<Arc<Registry>, StorageError> {
        if let Some(current) = self.snapshot.read().await.as_ref() {
            return Ok(Arc::clone(current));
        }
        let loaded = Arc::new(self.read_backend().await?);
        tracing::debug!(agents = loaded.len(), "Loaded agent registry");
        *self.snapshot.write().await = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Run one read-modify-write transaction.
    ///
    /// `apply` mutates a private copy and reports whether it changed
    /// anything; unchanged copies are not persisted.
    async fn transact<T, F>(&self, operation: &'static str, apply: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Registry) -> Result<(T, bool), StorageError>,
    {
        let _guard = self.write_lock.lock().await;
        let current = self.current_locked().await?;

        let mut next = (*current).clone();
        let (value, changed) = apply(&mut next)?;
        if !changed {
            return Ok(value);
        }

        if let Err(err) = self.backend.save(&next).await {
            tracing::error!(operation, error = %err, "Failed to persist agent registry");
            return Err(err);
        }

        tracing::debug!(operation, agents = next.len(), "Persisted agent registry");
        *self.snapshot.write().await = Some(Arc::new(next));
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use serde_json::json;

    fn create_test_store() -> (RegistryStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let store = RegistryStore::new(backend.clone());
        (store, backend)
    }

    #[tokio::test]
    async fn test_first_load_creates_empty_registry() {
        let (store, backend) = create_test_store();
        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(backend.persisted(), Some(Registry::new()));
    }

    #[tokio::test]
    async fn test_upsert_then_get() {
        let (store, _) = create_test_store();
        let saved = store
            .upsert(AgentRecord::new("AGENT-1", "A1").with_roles(["agent.chat.invoke"]))
            .await
            .unwrap();
        assert!(saved.created_at.is_some());
        assert_eq!(saved.created_at, saved.updated_at);

        let fetched = store.get("AGENT-1").await.unwrap().unwrap();
        assert_eq!(fetched, saved);
    }

    #[tokio::test]
    async fn test_reregister_preserves_created_at() {
        let (store, _) = create_test_store();
        let first = store.upsert(AgentRecord::new("A", "one")).await.unwrap();
        let second = store.upsert(AgentRecord::new("A", "two")).await.unwrap();
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.name, "two");
    }

    #[tokio::test]
    async fn test_patch_missing_agent() {
        let (store, backend) = create_test_store();
        store.load().await.unwrap();
        let err = store.patch("ghost", AgentPatch::default()).await.unwrap_err();
        assert_eq!(
            err,
            StorageError::AgentNotFound {
                agent_id: "ghost".to_string()
            }
        );
        assert_eq!(backend.save_count(), 1);
    }

    #[tokio::test]
    async fn test_patch_merges_fields() {
        let (store, _) = create_test_store();
        store
            .upsert(AgentRecord::new("A", "A").with_roles(["r1"]))
            .await
            .unwrap();
        let patch: AgentPatch =
            serde_json::from_value(json!({"enabled": false, "owner": "ops"})).unwrap();
        let merged = store.patch("A", patch).await.unwrap();
        assert!(!merged.enabled);
        assert!(merged.has_role("r1"));
        assert_eq!(merged.extra["owner"], "ops");
        assert_eq!(store.get("A").await.unwrap(), Some(merged));
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let (store, _) = create_test_store();
        store.upsert(AgentRecord::new("A", "A")).await.unwrap();
        assert!(store.delete("A").await.unwrap());
        assert!(!store.delete("A").await.unwrap());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_snapshot() {
        let (store, backend) = create_test_store();
        store.upsert(AgentRecord::new("A", "A")).await.unwrap();

        backend.set_fail_writes(true);
        let err = store.upsert(AgentRecord::new("B", "B")).await.unwrap_err();
        assert_eq!(err, StorageError::WriteRejected);
        assert!(store.get("B").await.unwrap().is_none());
        assert_eq!(store.list().await.unwrap().len(), 1);

        backend.set_fail_writes(false);
        store.upsert(AgentRecord::new("B", "B")).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reload_picks_up_external_changes() {
        let mut seeded = Registry::new();
        seeded.insert(AgentRecord::new("OLD", "Old"));
        let backend = Arc::new(MemoryBackend::with_registry(seeded));
        let store = RegistryStore::new(backend.clone());
        assert!(store.get("OLD").await.unwrap().is_some());

        let mut replaced = Registry::new();
        replaced.insert(AgentRecord::new("NEW", "New"));
        backend.save(&replaced).await.unwrap();

        assert!(store.get("NEW").await.unwrap().is_none());
        store.reload().await.unwrap();
        assert!(store.get("NEW").await.unwrap().is_some());
        assert!(store.get("OLD").await.unwrap().is_none());
    }
}
