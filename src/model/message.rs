//! Inbound message shapes for the two channels.
//!
//! Both channels carry a subject, an ordered list of associated subjects, a
//! type tag and an opaque trace context. Domain events describe something that
//! happened to a related resource (an address was attached); change
//! notifications describe create/update/delete of the resource itself.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::model::id::PrefixedId;

/// Event type emitted when an address is attached to a load balancer.
pub const IP_ADDRESS_ASSIGNED: &str = "ip-address.assigned";
/// Event type emitted when an address is detached from a load balancer.
pub const IP_ADDRESS_UNASSIGNED: &str = "ip-address.unassigned";

/// Opaque propagation token, forwarded untouched.
pub type TraceContext = BTreeMap<String, String>;

/// Common view over the two inbound message shapes.
pub trait InboundEvent {
    fn subject_id(&self) -> &PrefixedId;
    fn associated_ids(&self) -> &[PrefixedId];
    fn event_type(&self) -> &str;
    fn trace_context(&self) -> &TraceContext;
}

/// A domain event about a resource related to a load balancer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventMessage {
    pub subject_id: PrefixedId,
    pub event_type: String,
    pub additional_subject_ids: Vec<PrefixedId>,
    pub source: String,
    pub timestamp: u64,
    pub trace_context: TraceContext,
    pub data: serde_json::Value,
}

/// A single field transition carried by a change notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub previous_value: String,
    pub current_value: String,
}

/// A create/update/delete notification about a resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeMessage {
    pub subject_id: PrefixedId,
    pub event_type: String,
    pub additional_subject_ids: Vec<PrefixedId>,
    pub source: String,
    pub timestamp: u64,
    pub trace_context: TraceContext,
    pub field_changes: Vec<FieldChange>,
}

impl ChangeMessage {
    /// Build a change message stamped with the current time.
    pub fn new(subject_id: PrefixedId, event_type: impl Into<String>) -> Self {
        Self {
            subject_id,
            event_type: event_type.into(),
            timestamp: unix_now(),
            ..Default::default()
        }
    }

    pub fn change_type(&self) -> ChangeType {
        ChangeType::parse(&self.event_type)
    }
}

impl EventMessage {
    pub fn domain_event(&self) -> DomainEvent {
        DomainEvent::parse(&self.event_type)
    }
}

macro_rules! impl_inbound_event {
    ($ty:ty) => {
        impl InboundEvent for $ty {
            fn subject_id(&self) -> &PrefixedId {
                &self.subject_id
            }
            fn associated_ids(&self) -> &[PrefixedId] {
                &self.additional_subject_ids
            }
            fn event_type(&self) -> &str {
                &self.event_type
            }
            fn trace_context(&self) -> &TraceContext {
                &self.trace_context
            }
        }
    };
}

impl_inbound_event!(EventMessage);
impl_inbound_event!(ChangeMessage);

/// Change type carried by the change-notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeType {
    Create,
    Update,
    Delete,
    Other(String),
}

impl ChangeType {
    pub fn parse(s: &str) -> Self {
        match s {
            "create" => ChangeType::Create,
            "update" => ChangeType::Update,
            "delete" => ChangeType::Delete,
            other => ChangeType::Other(other.to_string()),
        }
    }
}

/// Domain event kinds this operator reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    /// An associated resource (address) was attached.
    Attached,
    /// An associated resource (address) was detached.
    Detached,
    Other(String),
}

impl DomainEvent {
    pub fn parse(s: &str) -> Self {
        match s {
            IP_ADDRESS_ASSIGNED => DomainEvent::Attached,
            IP_ADDRESS_UNASSIGNED => DomainEvent::Detached,
            other => DomainEvent::Other(other.to_string()),
        }
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_type_parse() {
        assert_eq!(ChangeType::parse("create"), ChangeType::Create);
        assert_eq!(ChangeType::parse("delete"), ChangeType::Delete);
        assert_eq!(ChangeType::parse("update"), ChangeType::Update);
        assert_eq!(ChangeType::parse("rename"), ChangeType::Other("rename".into()));
    }

    #[test]
    fn test_domain_event_parse() {
        assert_eq!(DomainEvent::parse("ip-address.assigned"), DomainEvent::Attached);
        assert_eq!(DomainEvent::parse("ip-address.unassigned"), DomainEvent::Detached);
        assert!(matches!(DomainEvent::parse("port.added"), DomainEvent::Other(_)));
    }

    #[test]
    fn test_decode_minimal_change_message() {
        let raw = r#"{"subject_id":"lb-abc","event_type":"create"}"#;
        let msg: ChangeMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.change_type(), ChangeType::Create);
        assert!(msg.associated_ids().is_empty());
        assert!(msg.trace_context().is_empty());
    }
}
