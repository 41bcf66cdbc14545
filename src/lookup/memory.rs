//! In-process lookup table.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::lookup::{LoadBalancerLookup, LookupError, LookupResult};
use crate::model::{LoadBalancerSnapshot, PrefixedId, Resources};

/// Lookup backed by a concurrent map. Unknown ids are `NotFound`.
#[derive(Debug, Default)]
pub struct MemoryLookup {
    snapshots: DashMap<PrefixedId, LoadBalancerSnapshot>,
    calls: DashMap<PrefixedId, usize>,
    /// When set, every id not in the table resolves to a default snapshot.
    permissive: bool,
}

impl MemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// A lookup that answers every id. Used in dev mode.
    pub fn permissive() -> Self {
        Self { permissive: true, ..Self::default() }
    }

    pub fn insert(&self, snapshot: LoadBalancerSnapshot) {
        self.snapshots.insert(snapshot.id.clone(), snapshot);
    }

    /// Convenience for registering a load balancer with sizing.
    pub fn insert_sized(&self, id: &str, cpu: &str, memory: &str) {
        self.insert(LoadBalancerSnapshot {
            id: id.into(),
            name: id.to_string(),
            resources: Resources { cpu: cpu.to_string(), memory: memory.to_string() },
            ..Default::default()
        });
    }

    /// Number of times `id` was looked up.
    pub fn calls_for(&self, id: &PrefixedId) -> usize {
        self.calls.get(id).map(|c| *c).unwrap_or(0)
    }

    /// Total number of lookups.
    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|c| *c.value()).sum()
    }
}

#[async_trait]
impl LoadBalancerLookup for MemoryLookup {
    async fn get(&self, id: &PrefixedId) -> LookupResult<LoadBalancerSnapshot> {
        *self.calls.entry(id.clone()).or_insert(0) += 1;

        if let Some(snapshot) = self.snapshots.get(id) {
            return Ok(snapshot.clone());
        }

        if self.permissive {
            return Ok(LoadBalancerSnapshot { id: id.clone(), ..Default::default() });
        }

        Err(LookupError::NotFound(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_records_calls() {
        let lookup = MemoryLookup::new();
        lookup.insert_sized("lb-abc", "2", "1Gi");

        let snap = lookup.get(&"lb-abc".into()).await.unwrap();
        assert_eq!(snap.resources.cpu, "2");
        assert!(matches!(lookup.get(&"lb-zzz".into()).await, Err(LookupError::NotFound(_))));

        assert_eq!(lookup.calls_for(&"lb-abc".into()), 1);
        assert_eq!(lookup.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_permissive_lookup() {
        let lookup = MemoryLookup::permissive();
        let snap = lookup.get(&"lb-new".into()).await.unwrap();
        assert_eq!(snap.id.as_str(), "lb-new");
    }
}
