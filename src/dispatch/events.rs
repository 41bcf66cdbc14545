//! Domain-event rules.

use async_trait::async_trait;
use tracing::Instrument;

use crate::dispatch::{Action, Dispatcher, DropReason, Handle, Outcome};
use crate::model::{DomainEvent, EventMessage, LoadBalancerRef};
use crate::observability::tracing::{message_span, record_loadbalancer, EVENTS_CHANNEL};

impl Dispatcher {
    /// Process one domain event. Never fails; the caller acknowledges
    /// whatever the outcome.
    pub async fn dispatch_event(&self, message_id: &str, event: &EventMessage) -> Outcome {
        let span = message_span(EVENTS_CHANNEL, message_id, event);
        self.route_event(message_id, event).instrument(span).await
    }

    async fn route_event(&self, message_id: &str, event: &EventMessage) -> Outcome {
        if self.filtered(message_id, event) {
            return Outcome::Dropped(DropReason::LocationFiltered);
        }

        let kind = event.domain_event();

        // The subject of a detach is taken as the load balancer; the address
        // is already gone so there is nothing to look up.
        if kind == DomainEvent::Detached {
            let lb = LoadBalancerRef::direct(event.subject_id.clone());
            record_loadbalancer(lb.id());
            tracing::info!(
                message_id,
                loadbalancer_id = %lb.id(),
                "Address detached; deployment left unchanged"
            );
            return Outcome::DetachPending(lb.id().clone());
        }

        let lb = match self.resolve(message_id, event).await {
            Ok(lb) => lb,
            Err(dropped) => return dropped,
        };
        record_loadbalancer(lb.id());

        match kind {
            DomainEvent::Attached => {
                tracing::debug!(message_id, loadbalancer_id = %lb.id(), "Address attached, reconciling");
                let overrides = self.reconciler.overrides_for(&lb);
                match self.reconciler.create(&lb, &overrides).await {
                    Ok(()) => Outcome::Created(lb.id().clone()),
                    Err(e) => self.failed(message_id, &lb, Action::Create, &e),
                }
            }
            DomainEvent::Detached => Outcome::DetachPending(lb.id().clone()),
            DomainEvent::Other(event_type) => {
                tracing::debug!(message_id, loadbalancer_id = %lb.id(), %event_type, "Unknown event");
                Outcome::Ignored {
                    id: lb.id().clone(),
                    event_type,
                }
            }
        }
    }
}

#[async_trait]
impl Handle<EventMessage> for Dispatcher {
    fn channel(&self) -> &'static str {
        EVENTS_CHANNEL
    }

    async fn handle(&self, message_id: &str, message: &EventMessage) -> Outcome {
        self.dispatch_event(message_id, message).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::EventsConfig;
    use crate::lookup::MemoryLookup;
    use crate::metering::MeteringSink;
    use crate::model::{PrefixedId, IP_ADDRESS_ASSIGNED, IP_ADDRESS_UNASSIGNED};
    use crate::reconcile::{BackendOp, MemoryBackend, OverrideBuilder, Reconciler};

    fn dispatcher(locations: &[&str]) -> (Dispatcher, Arc<MemoryLookup>, Arc<MemoryBackend>) {
        let lookup = Arc::new(MemoryLookup::new());
        let backend = Arc::new(MemoryBackend::new());
        let reconciler = Arc::new(Reconciler::new(
            backend.clone(),
            OverrideBuilder::default(),
            Arc::new(MeteringSink::disabled()),
        ));
        let config = EventsConfig {
            lb_prefix: "lb".to_string(),
            locations: locations.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        (Dispatcher::new(&config, lookup.clone(), reconciler), lookup, backend)
    }

    fn event(subject: &str, event_type: &str, associated: &[&str]) -> EventMessage {
        EventMessage {
            subject_id: subject.into(),
            event_type: event_type.to_string(),
            additional_subject_ids: associated.iter().map(|s| PrefixedId::from(*s)).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_attach_creates_associated_lb() {
        let (d, lookup, backend) = dispatcher(&[]);
        lookup.insert_sized("lb-xyz", "2", "4Gi");

        let outcome = d
            .dispatch_event("m1", &event("ipaddr-1", IP_ADDRESS_ASSIGNED, &["lb-xyz"]))
            .await;

        assert_eq!(outcome, Outcome::Created("lb-xyz".into()));
        assert_eq!(lookup.calls_for(&"lb-xyz".into()), 1);
        assert!(backend.release("lb-xyz").is_some());
    }

    #[tokio::test]
    async fn test_detach_skips_lookup_and_backend() {
        let (d, lookup, backend) = dispatcher(&[]);

        let outcome = d
            .dispatch_event("m1", &event("lb-abc", IP_ADDRESS_UNASSIGNED, &["ipaddr-1"]))
            .await;

        assert_eq!(outcome, Outcome::DetachPending("lb-abc".into()));
        assert_eq!(lookup.total_calls(), 0);
        assert!(backend.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_drops() {
        let (d, lookup, backend) = dispatcher(&[]);

        let outcome = d
            .dispatch_event("m1", &event("ipaddr-1", IP_ADDRESS_ASSIGNED, &["lb-missing"]))
            .await;

        assert_eq!(outcome, Outcome::Dropped(DropReason::LookupFailed));
        assert_eq!(lookup.calls_for(&"lb-missing".into()), 1);
        assert!(backend.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_event_type_ignored() {
        let (d, lookup, backend) = dispatcher(&[]);
        lookup.insert_sized("lb-abc", "1", "1Gi");

        let outcome = d.dispatch_event("m1", &event("lb-abc", "ip-address.renamed", &[])).await;

        assert_eq!(outcome.label(), "ignored");
        assert!(backend.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_create_failure_is_absorbed() {
        let (d, lookup, backend) = dispatcher(&[]);
        lookup.insert_sized("lb-abc", "1", "1Gi");
        backend.fail_on(BackendOp::Create);

        let outcome = d.dispatch_event("m1", &event("lb-abc", IP_ADDRESS_ASSIGNED, &[])).await;

        assert!(matches!(outcome, Outcome::Failed { action: Action::Create, .. }));
    }

    #[tokio::test]
    async fn test_location_filter_precedes_detach() {
        let (d, lookup, _backend) = dispatcher(&["-east-1"]);

        let outcome = d
            .dispatch_event("m1", &event("lb-abc", IP_ADDRESS_UNASSIGNED, &["loc-west-1"]))
            .await;

        assert_eq!(outcome, Outcome::Dropped(DropReason::LocationFiltered));
        assert_eq!(lookup.total_calls(), 0);
    }
}
