//! In-process deployment backend.
//!
//! Tracks releases and namespaces in concurrent maps, records every call and
//! can be told to fail specific operations. Used by dev mode and tests.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

use crate::model::{DeploymentTarget, ValueOverride};
use crate::reconcile::backend::{BackendError, BackendResult, DeploymentBackend};

/// Backend operations, used to inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    EnsureNamespace,
    Create,
    Update,
    Delete,
    RemoveNamespace,
    Exists,
}

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    EnsureNamespace(String),
    Create(String, Vec<ValueOverride>),
    Update(String, Vec<ValueOverride>),
    Delete(String),
    RemoveNamespace(String),
    Exists(String),
}

/// A release held by the memory backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub namespace: String,
    pub values: BTreeSet<ValueOverride>,
    pub revision: u32,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    releases: DashMap<String, Release>,
    namespaces: DashSet<String>,
    failing: DashSet<BackendOp>,
    calls: Mutex<Vec<BackendCall>>,
    latency_ms: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of `op` fail until cleared.
    pub fn fail_on(&self, op: BackendOp) {
        self.failing.insert(op);
    }

    pub fn clear_failures(&self) {
        self.failing.clear();
    }

    /// Delay every mutating call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms.store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn release(&self, name: &str) -> Option<Release> {
        self.releases.get(name).map(|r| r.value().clone())
    }

    pub fn has_namespace(&self, name: &str) -> bool {
        self.namespaces.contains(name)
    }

    pub fn release_count(&self) -> usize {
        self.releases.len()
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Calls that change state (everything but `Exists`).
    pub fn mutations(&self) -> Vec<BackendCall> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, BackendCall::Exists(_)))
            .collect()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }

    async fn enter(&self, op: BackendOp, call: BackendCall) -> BackendResult<()> {
        self.record(call);

        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 && op != BackendOp::Exists {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.failing.contains(&op) {
            return Err(BackendError::Unavailable(format!("injected {:?} failure", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl DeploymentBackend for MemoryBackend {
    async fn ensure_namespace(&self, target: &DeploymentTarget) -> BackendResult<()> {
        self.enter(BackendOp::EnsureNamespace, BackendCall::EnsureNamespace(target.namespace.clone()))
            .await?;
        self.namespaces.insert(target.namespace.clone());
        Ok(())
    }

    async fn create(
        &self,
        target: &DeploymentTarget,
        overrides: &[ValueOverride],
    ) -> BackendResult<()> {
        self.enter(BackendOp::Create, BackendCall::Create(target.release.clone(), overrides.to_vec()))
            .await?;

        let values: BTreeSet<ValueOverride> = overrides.iter().cloned().collect();
        let mut entry = self.releases.entry(target.release.clone()).or_insert_with(|| Release {
            namespace: target.namespace.clone(),
            values: values.clone(),
            revision: 0,
        });
        // A repeated install with identical values is not a new revision.
        if entry.revision == 0 || entry.values != values {
            entry.values = values;
            entry.revision += 1;
        }
        Ok(())
    }

    async fn update(
        &self,
        target: &DeploymentTarget,
        overrides: &[ValueOverride],
    ) -> BackendResult<()> {
        self.enter(BackendOp::Update, BackendCall::Update(target.release.clone(), overrides.to_vec()))
            .await?;
        match self.releases.get_mut(&target.release) {
            Some(mut release) => {
                // Reused values, with each override replacing its key.
                for value in overrides {
                    release.values.retain(|v| v.key != value.key);
                    release.values.insert(value.clone());
                }
                release.revision += 1;
                Ok(())
            }
            None => Err(BackendError::Unavailable(format!(
                "release {} not found",
                target.release
            ))),
        }
    }

    async fn delete(&self, target: &DeploymentTarget) -> BackendResult<()> {
        self.enter(BackendOp::Delete, BackendCall::Delete(target.release.clone())).await?;
        self.releases.remove(&target.release);
        Ok(())
    }

    async fn remove_namespace(&self, target: &DeploymentTarget) -> BackendResult<()> {
        self.enter(BackendOp::RemoveNamespace, BackendCall::RemoveNamespace(target.namespace.clone()))
            .await?;
        self.namespaces.remove(&target.namespace);
        Ok(())
    }

    async fn exists(&self, target: &DeploymentTarget) -> BackendResult<bool> {
        self.enter(BackendOp::Exists, BackendCall::Exists(target.release.clone())).await?;
        Ok(self.releases.contains_key(&target.release))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PrefixedId;

    fn target(id: &str) -> DeploymentTarget {
        DeploymentTarget::for_id(&PrefixedId::from(id)).unwrap()
    }

    #[tokio::test]
    async fn test_create_is_upsert() {
        let backend = MemoryBackend::new();
        let t = target("lb-abc");
        let values = vec![ValueOverride::new("cpu", "2")];

        backend.create(&t, &values).await.unwrap();
        backend.create(&t, &values).await.unwrap();

        let release = backend.release("lb-abc").unwrap();
        assert_eq!(release.revision, 1);
        assert_eq!(backend.release_count(), 1);

        backend.create(&t, &[ValueOverride::new("cpu", "4")]).await.unwrap();
        assert_eq!(backend.release("lb-abc").unwrap().revision, 2);
    }

    #[tokio::test]
    async fn test_injected_failure_still_recorded() {
        let backend = MemoryBackend::new();
        backend.fail_on(BackendOp::Delete);

        assert!(backend.delete(&target("lb-abc")).await.is_err());
        assert_eq!(backend.calls(), vec![BackendCall::Delete("lb-abc".into())]);

        backend.clear_failures();
        assert!(backend.delete(&target("lb-abc")).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_replaces_overridden_keys() {
        let backend = MemoryBackend::new();
        let t = target("lb-abc");
        backend
            .create(&t, &[ValueOverride::new("cpu", "1"), ValueOverride::new("memory", "1Gi")])
            .await
            .unwrap();

        backend.update(&t, &[ValueOverride::new("cpu", "4")]).await.unwrap();

        let release = backend.release("lb-abc").unwrap();
        assert_eq!(
            release.values.into_iter().collect::<Vec<_>>(),
            vec![ValueOverride::new("cpu", "4"), ValueOverride::new("memory", "1Gi")]
        );
        assert_eq!(release.revision, 2);
    }

    #[tokio::test]
    async fn test_update_missing_release_fails() {
        let backend = MemoryBackend::new();
        assert!(backend.update(&target("lb-abc"), &[]).await.is_err());
    }
}
