//! Lifecycle dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Delivery<EventMessage>                 Delivery<ChangeMessage>
//!     → events.rs                            → changes.rs
//!         location filter                        location filter
//!         detach shortcut (no lookup)            delete shortcut (no lookup)
//!         classify + lookup                      classify + lookup
//!         attach → create (upsert)               create/delete/update
//!     → Outcome (logged, counted) → caller acknowledges
//! ```
//!
//! # Design Decisions
//! - Dispatch never returns an error; every failure becomes an Outcome
//! - Unfinished product behavior is a named Outcome, not a silent no-op
//! - Lookups are never retried; the message is still acknowledged

pub mod changes;
pub mod events;
pub mod outcome;

use std::sync::Arc;

use async_trait::async_trait;

use crate::classify::{Classifier, LocationFilter};
use crate::config::EventsConfig;
use crate::lookup::LoadBalancerLookup;
use crate::model::{InboundEvent, LoadBalancerRef};
use crate::observability::metrics;
use crate::reconcile::{ReconcileError, Reconciler};

pub use outcome::{Action, DropReason, Outcome};

/// Routes classified messages to reconciliation.
pub struct Dispatcher {
    classifier: Classifier,
    locations: LocationFilter,
    apply_updates: bool,
    lookup: Arc<dyn LoadBalancerLookup>,
    reconciler: Arc<Reconciler>,
}

impl Dispatcher {
    pub fn new(
        config: &EventsConfig,
        lookup: Arc<dyn LoadBalancerLookup>,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self {
            classifier: Classifier::new(config.lb_prefix.clone()),
            locations: LocationFilter::new(config.locations.clone()),
            apply_updates: config.apply_updates,
            lookup,
            reconciler,
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Classify the event and fetch the snapshot of the load balancer it
    /// resolves to. `Err` carries the drop outcome.
    async fn resolve<E: InboundEvent + Sync>(
        &self,
        message_id: &str,
        event: &E,
    ) -> Result<LoadBalancerRef, Outcome> {
        let lb = self.classifier.classify(event.subject_id(), event.associated_ids());
        if !lb.is_lb() {
            tracing::debug!(message_id, subject_id = %event.subject_id(), "Not a load balancer event");
            return Err(Outcome::Dropped(DropReason::NotLoadBalancer));
        }

        match self.lookup.get(lb.id()).await {
            Ok(snapshot) => Ok(lb.with_snapshot(snapshot)),
            Err(e) => {
                metrics::record_lookup_failure();
                tracing::error!(
                    message_id,
                    loadbalancer_id = %lb.id(),
                    error = %e,
                    "Unable to initialize load balancer"
                );
                Err(Outcome::Dropped(DropReason::LookupFailed))
            }
        }
    }

    fn failed(
        &self,
        message_id: &str,
        lb: &LoadBalancerRef,
        action: Action,
        error: &ReconcileError,
    ) -> Outcome {
        metrics::record_reconcile_failure(action.as_str());
        tracing::error!(
            message_id,
            loadbalancer_id = %lb.id(),
            action = %action,
            error = %error,
            "Unable to reconcile load balancer"
        );
        Outcome::Failed {
            id: lb.id().clone(),
            action,
            error: error.to_string(),
        }
    }

    fn filtered<E: InboundEvent>(&self, message_id: &str, event: &E) -> bool {
        if self.locations.passes(event.associated_ids()) {
            return false;
        }
        tracing::debug!(message_id, subject_id = %event.subject_id(), "Event outside configured locations");
        true
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("classifier", &self.classifier)
            .field("locations", &self.locations)
            .field("apply_updates", &self.apply_updates)
            .finish()
    }
}

/// One channel's dispatch rules.
#[async_trait]
pub trait Handle<T>: Send + Sync {
    /// Channel label for logs and metrics.
    fn channel(&self) -> &'static str;

    async fn handle(&self, message_id: &str, message: &T) -> Outcome;
}
