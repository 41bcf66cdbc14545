//! Change-notification rules.

use async_trait::async_trait;
use tracing::Instrument;

use crate::dispatch::{Action, Dispatcher, DropReason, Handle, Outcome};
use crate::model::{ChangeMessage, ChangeType, LbKind, LoadBalancerRef};
use crate::observability::tracing::{message_span, record_loadbalancer, CHANGES_CHANNEL};
use crate::reconcile::UpdateOutcome;

impl Dispatcher {
    /// Process one change notification. Never fails; the caller
    /// acknowledges whatever the outcome.
    pub async fn dispatch_change(&self, message_id: &str, change: &ChangeMessage) -> Outcome {
        let span = message_span(CHANGES_CHANNEL, message_id, change);
        self.route_change(message_id, change).instrument(span).await
    }

    async fn route_change(&self, message_id: &str, change: &ChangeMessage) -> Outcome {
        if self.filtered(message_id, change) {
            return Outcome::Dropped(DropReason::LocationFiltered);
        }

        let change_type = change.change_type();

        // A deleted load balancer can no longer be looked up.
        let lb = if change_type == ChangeType::Delete && self.classifier.is_lb(&change.subject_id) {
            LoadBalancerRef::direct(change.subject_id.clone())
        } else {
            match self.resolve(message_id, change).await {
                Ok(lb) => lb,
                Err(dropped) => return dropped,
            }
        };
        record_loadbalancer(lb.id());

        match (change_type, lb.kind()) {
            (ChangeType::Create, LbKind::DirectLb) => {
                tracing::debug!(message_id, loadbalancer_id = %lb.id(), "Creating load balancer");
                let overrides = self.reconciler.overrides_for(&lb);
                match self.reconciler.create(&lb, &overrides).await {
                    Ok(()) => Outcome::Created(lb.id().clone()),
                    Err(e) => self.failed(message_id, &lb, Action::Create, &e),
                }
            }
            (ChangeType::Delete, LbKind::DirectLb) => {
                tracing::debug!(message_id, loadbalancer_id = %lb.id(), "Deleting load balancer");
                match self.reconciler.delete(&lb).await {
                    Ok(()) => Outcome::Deleted(lb.id().clone()),
                    Err(e) => self.failed(message_id, &lb, Action::Delete, &e),
                }
            }
            _ if self.apply_updates => {
                let overrides = self.reconciler.overrides_for(&lb);
                match self.reconciler.update(&lb, &overrides).await {
                    Ok(UpdateOutcome::Updated) => Outcome::Updated(lb.id().clone()),
                    Ok(UpdateOutcome::NotDeployed) => Outcome::NotDeployed(lb.id().clone()),
                    Err(e) => self.failed(message_id, &lb, Action::Update, &e),
                }
            }
            _ => {
                tracing::info!(
                    message_id,
                    loadbalancer_id = %lb.id(),
                    event_type = %change.event_type,
                    "Update-type change recorded; deployment left unchanged"
                );
                Outcome::UpdatePending(lb.id().clone())
            }
        }
    }
}

#[async_trait]
impl Handle<ChangeMessage> for Dispatcher {
    fn channel(&self) -> &'static str {
        CHANGES_CHANNEL
    }

    async fn handle(&self, message_id: &str, message: &ChangeMessage) -> Outcome {
        self.dispatch_change(message_id, message).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{ChartConfig, EventsConfig};
    use crate::lookup::MemoryLookup;
    use crate::metering::MeteringSink;
    use crate::model::{PrefixedId, ValueOverride};
    use crate::reconcile::{BackendCall, BackendOp, MemoryBackend, OverrideBuilder, Reconciler};

    fn dispatcher(apply_updates: bool) -> (Dispatcher, Arc<MemoryLookup>, Arc<MemoryBackend>) {
        let lookup = Arc::new(MemoryLookup::new());
        let backend = Arc::new(MemoryBackend::new());
        let chart = ChartConfig {
            cpu_keys: vec!["resources.limits.cpu".to_string()],
            ..Default::default()
        };
        let reconciler = Arc::new(Reconciler::new(
            backend.clone(),
            OverrideBuilder::from_config(&chart),
            Arc::new(MeteringSink::disabled()),
        ));
        let config = EventsConfig {
            lb_prefix: "lb".to_string(),
            apply_updates,
            ..Default::default()
        };
        (Dispatcher::new(&config, lookup.clone(), reconciler), lookup, backend)
    }

    fn change(subject: &str, event_type: &str, associated: &[&str]) -> ChangeMessage {
        let mut msg = ChangeMessage::new(subject.into(), event_type);
        msg.additional_subject_ids = associated.iter().map(|s| PrefixedId::from(*s)).collect();
        msg
    }

    #[tokio::test]
    async fn test_create_direct_lb() {
        let (d, lookup, backend) = dispatcher(false);
        lookup.insert_sized("lb-abc", "2", "4Gi");

        let outcome = d.dispatch_change("m1", &change("lb-abc", "create", &[])).await;

        assert_eq!(outcome, Outcome::Created("lb-abc".into()));
        let creates = backend
            .calls()
            .into_iter()
            .filter(|c| matches!(c, BackendCall::Create(..)))
            .count();
        assert_eq!(creates, 1);
    }

    #[tokio::test]
    async fn test_delete_skips_lookup() {
        let (d, lookup, backend) = dispatcher(false);

        let outcome = d.dispatch_change("m1", &change("lb-abc", "delete", &[])).await;

        assert_eq!(outcome, Outcome::Deleted("lb-abc".into()));
        assert_eq!(lookup.total_calls(), 0);
        assert!(backend.calls().iter().any(|c| matches!(c, BackendCall::Delete(_))));
    }

    #[tokio::test]
    async fn test_create_of_associated_resource_is_update() {
        let (d, lookup, backend) = dispatcher(false);
        lookup.insert_sized("lb-abc", "1", "1Gi");

        let outcome = d
            .dispatch_change("m1", &change("ipaddr-1", "create", &["lb-abc"]))
            .await;

        assert_eq!(outcome, Outcome::UpdatePending("lb-abc".into()));
        assert!(backend.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_not_lb_dropped_without_lookup() {
        let (d, lookup, backend) = dispatcher(false);

        let outcome = d
            .dispatch_change("m1", &change("ipaddr-1", "update", &["loc-east-1"]))
            .await;

        assert_eq!(outcome, Outcome::Dropped(DropReason::NotLoadBalancer));
        assert_eq!(lookup.total_calls(), 0);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_never_creates() {
        let (d, lookup, backend) = dispatcher(true);
        lookup.insert_sized("lb-abc", "1", "1Gi");

        let outcome = d.dispatch_change("m1", &change("lb-abc", "update", &[])).await;

        assert_eq!(outcome, Outcome::NotDeployed("lb-abc".into()));
        assert!(backend.mutations().is_empty());
        assert_eq!(backend.release_count(), 0);
    }

    #[tokio::test]
    async fn test_update_upgrades_existing() {
        let (d, lookup, backend) = dispatcher(true);
        lookup.insert_sized("lb-abc", "1", "1Gi");

        d.dispatch_change("m1", &change("lb-abc", "create", &[])).await;
        let outcome = d.dispatch_change("m2", &change("lb-abc", "update", &[])).await;

        assert_eq!(outcome, Outcome::Updated("lb-abc".into()));
        assert!(backend.calls().iter().any(|c| matches!(c, BackendCall::Update(..))));
    }

    #[tokio::test]
    async fn test_update_applies_current_sizing() {
        let (d, lookup, backend) = dispatcher(true);
        lookup.insert_sized("lb-abc", "1", "1Gi");
        d.dispatch_change("m1", &change("lb-abc", "create", &[])).await;

        lookup.insert_sized("lb-abc", "4", "1Gi");
        let outcome = d.dispatch_change("m2", &change("lb-abc", "update", &[])).await;

        assert_eq!(outcome, Outcome::Updated("lb-abc".into()));
        let values = backend.release("lb-abc").unwrap().values;
        assert_eq!(
            values.into_iter().collect::<Vec<_>>(),
            vec![ValueOverride::new("resources.limits.cpu", "4")]
        );
    }

    #[tokio::test]
    async fn test_delete_failure_is_absorbed() {
        let (d, _lookup, backend) = dispatcher(false);
        backend.fail_on(BackendOp::Delete);

        let outcome = d.dispatch_change("m1", &change("lb-abc", "delete", &[])).await;

        assert!(matches!(outcome, Outcome::Failed { action: Action::Delete, .. }));
    }
}
