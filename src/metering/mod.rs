//! Status metering.
//!
//! # Responsibilities
//! - Turn load balancer status transitions into change records
//! - Publish only transitions into `active` or `deleted`
//!
//! # Design Decisions
//! - Unconfigured metering is a no-op, warned about once
//! - Publish failures are reported to the caller, never retried here

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::MeteringConfig;
use crate::model::{ChangeMessage, FieldChange, PrefixedId};
use crate::transport::{PublishError, Publisher};

/// Event type of published status records.
pub const METADATA_UPDATE: &str = "metadata.update";
/// Field name carried by published status records.
pub const STATUS_FIELD: &str = "metadata_status";

/// Lifecycle state of a deployed load balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBalancerState {
    Creating,
    Active,
    Deleting,
    Deleted,
}

impl LoadBalancerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadBalancerState::Creating => "creating",
            LoadBalancerState::Active => "active",
            LoadBalancerState::Deleting => "deleting",
            LoadBalancerState::Deleted => "deleted",
        }
    }

    fn is_metered(&self) -> bool {
        matches!(self, LoadBalancerState::Active | LoadBalancerState::Deleted)
    }
}

impl fmt::Display for LoadBalancerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct MeteringSink {
    target: Option<(String, Arc<dyn Publisher>)>,
    warned: AtomicBool,
}

impl MeteringSink {
    pub fn new(subject: impl Into<String>, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            target: Some((subject.into(), publisher)),
            warned: AtomicBool::new(false),
        }
    }

    pub fn disabled() -> Self {
        Self { target: None, warned: AtomicBool::new(false) }
    }

    /// Enabled when a subject is configured and a publisher is available.
    pub fn from_config(config: &MeteringConfig, publisher: Option<Arc<dyn Publisher>>) -> Self {
        match publisher {
            Some(publisher) if config.enabled() => Self::new(config.subject.clone(), publisher),
            _ => Self::disabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    /// Record a status transition. Returns whether a record was published.
    pub async fn status_changed(
        &self,
        id: &PrefixedId,
        previous: LoadBalancerState,
        current: LoadBalancerState,
    ) -> Result<bool, PublishError> {
        let Some((subject, publisher)) = &self.target else {
            if !self.warned.swap(true, Ordering::Relaxed) {
                tracing::warn!("metering subject not configured");
            }
            return Ok(false);
        };

        if !current.is_metered() {
            return Ok(false);
        }

        let mut message = ChangeMessage::new(id.clone(), METADATA_UPDATE);
        message.field_changes.push(FieldChange {
            field: STATUS_FIELD.to_string(),
            previous_value: previous.to_string(),
            current_value: current.to_string(),
        });

        publisher.publish_change(subject, &message).await?;
        tracing::debug!(loadbalancer_id = %id, %previous, %current, subject = %subject, "Status change published");
        Ok(true)
    }
}

impl fmt::Debug for MeteringSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeteringSink")
            .field("subject", &self.target.as_ref().map(|(s, _)| s.as_str()))
            .finish()
    }
}
