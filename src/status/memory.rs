//! In-process status store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::model::PrefixedId;
use crate::status::{StatusError, StatusSink, StatusUpdate};

/// Records every status update in order. Can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryStatusSink {
    updates: Mutex<Vec<StatusUpdate>>,
    failing: AtomicBool,
}

impl MemoryStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.updates.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// State most recently stored for `id`.
    pub fn latest(&self, id: &PrefixedId) -> Option<String> {
        self.updates()
            .into_iter()
            .rev()
            .find(|u| u.node_id == id.as_str())
            .and_then(|u| u.data.get("state").and_then(|s| s.as_str()).map(str::to_string))
    }
}

#[async_trait]
impl StatusSink for MemoryStatusSink {
    async fn update_status(&self, update: &StatusUpdate) -> Result<(), StatusError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(StatusError::Request("injected status failure".to_string()));
        }
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(update.clone());
        Ok(())
    }
}
