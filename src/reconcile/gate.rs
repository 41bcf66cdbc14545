//! Per-identifier advisory gate.
//!
//! The two channel loops can act on the same load balancer at the same time.
//! Operations for one id take that id's slot first so their effects never
//! interleave. Slots are dropped as soon as nobody holds or waits on them.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::PrefixedId;

type Slot = Arc<Mutex<()>>;

#[derive(Debug, Clone, Default)]
pub struct KeyedGate {
    slots: Arc<DashMap<PrefixedId, Slot>>,
}

impl KeyedGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`.
    pub async fn lock(&self, id: &PrefixedId) -> GateGuard {
        let slot = self
            .slots
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = slot.clone().lock_owned().await;

        GateGuard {
            slots: self.slots.clone(),
            id: id.clone(),
            slot,
            guard: Some(guard),
        }
    }

    /// Number of ids currently held or waited on.
    pub fn active(&self) -> usize {
        self.slots.len()
    }
}

/// Exclusive access to one id; released on drop.
#[derive(Debug)]
pub struct GateGuard {
    slots: Arc<DashMap<PrefixedId, Slot>>,
    id: PrefixedId,
    slot: Slot,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.guard.take();
        // Only the map and this guard still reference the slot: nobody waits.
        self.slots
            .remove_if(&self.id, |_, slot| Arc::ptr_eq(slot, &self.slot) && Arc::strong_count(slot) == 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_slot_removed_when_idle() {
        let gate = KeyedGate::new();
        {
            let _g = gate.lock(&"lb-abc".into()).await;
            assert_eq!(gate.active(), 1);
        }
        assert_eq!(gate.active(), 0);
    }

    #[tokio::test]
    async fn test_same_id_is_serialised() {
        let gate = KeyedGate::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let gate = gate.clone();
            let inside = inside.clone();
            let max_inside = max_inside.clone();
            tasks.push(tokio::spawn(async move {
                let _g = gate.lock(&"lb-abc".into()).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(gate.active(), 0);
    }

    #[tokio::test]
    async fn test_different_ids_do_not_block() {
        let gate = KeyedGate::new();
        let _a = gate.lock(&"lb-a".into()).await;
        let b = tokio::time::timeout(Duration::from_millis(100), gate.lock(&"lb-b".into())).await;
        assert!(b.is_ok());
        assert_eq!(gate.active(), 2);
    }
}
