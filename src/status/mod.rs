//! Load balancer status reporting.
//!
//! # Data Flow
//! ```text
//! Reconciler transition (creating → active, active → deleted)
//!     → StatusReporter (namespace, source, {"state": ...})
//!     → StatusSink::update_status
//!         - http.rs (metadata service over HTTP)
//!         - memory.rs (in-process record, dev mode and tests)
//! ```
//!
//! # Design Decisions
//! - An empty metadata endpoint disables reporting, warned about once
//! - Every transition is reported, not only the metered ones
//! - Failures are returned to the caller and never retried here

pub mod http;
pub mod memory;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MetadataConfig;
use crate::metering::LoadBalancerState;
use crate::model::PrefixedId;

pub use http::HttpStatusSink;
pub use memory::MemoryStatusSink;

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("status update request failed: {0}")]
    Request(String),

    #[error("metadata service rejected status update with status {0}")]
    Rejected(u16),
}

/// A status document attached to a node in the metadata service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub node_id: String,
    pub namespace_id: String,
    pub source: String,
    pub data: serde_json::Value,
}

/// Stores status documents.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn update_status(&self, update: &StatusUpdate) -> Result<(), StatusError>;
}

struct StatusTarget {
    sink: Arc<dyn StatusSink>,
    namespace_id: String,
    source: String,
}

/// Reports the current state of a load balancer to the metadata service.
pub struct StatusReporter {
    target: Option<StatusTarget>,
    warned: AtomicBool,
}

impl StatusReporter {
    pub fn new(
        sink: Arc<dyn StatusSink>,
        namespace_id: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            target: Some(StatusTarget {
                sink,
                namespace_id: namespace_id.into(),
                source: source.into(),
            }),
            warned: AtomicBool::new(false),
        }
    }

    pub fn disabled() -> Self {
        Self { target: None, warned: AtomicBool::new(false) }
    }

    /// Enabled when an endpoint is configured and a sink is available.
    pub fn from_config(config: &MetadataConfig, sink: Option<Arc<dyn StatusSink>>) -> Self {
        match sink {
            Some(sink) if config.enabled() => {
                Self::new(sink, config.status_namespace_id.clone(), config.source.clone())
            }
            _ => Self::disabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    /// Store `current` as the load balancer's status. Returns whether an
    /// update was sent.
    pub async fn status_changed(
        &self,
        id: &PrefixedId,
        current: LoadBalancerState,
    ) -> Result<bool, StatusError> {
        let Some(target) = &self.target else {
            if !self.warned.swap(true, Ordering::Relaxed) {
                tracing::warn!("metadata not configured");
            }
            return Ok(false);
        };

        let update = StatusUpdate {
            node_id: id.to_string(),
            namespace_id: target.namespace_id.clone(),
            source: target.source.clone(),
            data: serde_json::json!({ "state": current.as_str() }),
        };
        target.sink.update_status(&update).await?;

        tracing::debug!(loadbalancer_id = %id, state = %current, "Status updated");
        Ok(true)
    }
}

impl fmt::Debug for StatusReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusReporter")
            .field("namespace_id", &self.target.as_ref().map(|t| t.namespace_id.as_str()))
            .field("source", &self.target.as_ref().map(|t| t.source.as_str()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transition_is_stored_with_namespace_and_source() {
        let sink = Arc::new(MemoryStatusSink::new());
        let reporter = StatusReporter::new(sink.clone(), "metasns-lbstatus", "lb-operator");

        let sent = reporter
            .status_changed(&"lb-abc".into(), LoadBalancerState::Active)
            .await
            .unwrap();
        assert!(sent);

        assert_eq!(
            sink.updates(),
            vec![StatusUpdate {
                node_id: "lb-abc".into(),
                namespace_id: "metasns-lbstatus".into(),
                source: "lb-operator".into(),
                data: serde_json::json!({ "state": "active" }),
            }]
        );
    }

    #[tokio::test]
    async fn test_intermediate_states_are_reported() {
        let sink = Arc::new(MemoryStatusSink::new());
        let reporter = StatusReporter::new(sink.clone(), "metasns-lbstatus", "lb-operator");

        reporter.status_changed(&"lb-abc".into(), LoadBalancerState::Deleting).await.unwrap();
        assert_eq!(sink.latest(&"lb-abc".into()).as_deref(), Some("deleting"));
    }

    #[tokio::test]
    async fn test_unconfigured_reporter_is_noop() {
        let sink: Arc<dyn StatusSink> = Arc::new(MemoryStatusSink::new());
        let reporter = StatusReporter::from_config(&MetadataConfig::default(), Some(sink));
        assert!(!reporter.is_enabled());

        for _ in 0..2 {
            let sent = reporter
                .status_changed(&"lb-abc".into(), LoadBalancerState::Deleted)
                .await
                .unwrap();
            assert!(!sent);
        }
    }

    #[tokio::test]
    async fn test_sink_failure_is_returned() {
        let sink = Arc::new(MemoryStatusSink::new());
        sink.set_failing(true);
        let reporter = StatusReporter::new(sink.clone(), "metasns-lbstatus", "lb-operator");

        let err = reporter
            .status_changed(&"lb-abc".into(), LoadBalancerState::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, StatusError::Request(_)));
        assert!(sink.updates().is_empty());
    }
}
