//! Load balancer references, snapshots and deployment targets.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::id::PrefixedId;

/// Maximum length of a chart release name.
pub const MAX_RELEASE_NAME_LEN: usize = 53;

/// Outcome of classifying an event subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LbKind {
    /// The subject itself is a load balancer.
    DirectLb,
    /// An associated subject is a load balancer.
    AssociatedLb,
    /// Nothing in the event is a load balancer.
    NotLb,
}

impl LbKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LbKind::DirectLb => "direct",
            LbKind::AssociatedLb => "associated",
            LbKind::NotLb => "none",
        }
    }
}

/// Sizing declared on a load balancer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    pub cpu: String,
    pub memory: String,
}

/// Declared configuration of a load balancer, as returned by the lookup backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadBalancerSnapshot {
    pub id: PrefixedId,
    pub name: String,
    pub location_id: PrefixedId,
    pub resources: Resources,
}

/// A load balancer an inbound event resolved to.
///
/// Built fresh for every message and dropped once the reconcile attempt for
/// that message is over.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadBalancerRef {
    id: PrefixedId,
    kind: LbKind,
    snapshot: Option<LoadBalancerSnapshot>,
}

impl LoadBalancerRef {
    pub fn direct(id: PrefixedId) -> Self {
        Self { id, kind: LbKind::DirectLb, snapshot: None }
    }

    pub fn associated(id: PrefixedId) -> Self {
        Self { id, kind: LbKind::AssociatedLb, snapshot: None }
    }

    /// The "not a load balancer" ref. Its id is the zero value.
    pub fn not_lb() -> Self {
        Self { id: PrefixedId::default(), kind: LbKind::NotLb, snapshot: None }
    }

    /// Attach a fetched snapshot. Ignored for `NotLb` refs.
    pub fn with_snapshot(mut self, snapshot: LoadBalancerSnapshot) -> Self {
        if self.kind != LbKind::NotLb {
            self.snapshot = Some(snapshot);
        }
        self
    }

    pub fn id(&self) -> &PrefixedId {
        &self.id
    }

    pub fn kind(&self) -> LbKind {
        self.kind
    }

    pub fn is_lb(&self) -> bool {
        self.kind != LbKind::NotLb
    }

    pub fn snapshot(&self) -> Option<&LoadBalancerSnapshot> {
        self.snapshot.as_ref()
    }
}

/// A key/value pair applied when materializing a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueOverride {
    pub key: String,
    pub value: String,
}

impl ValueOverride {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }

    /// Render as a `key=value` assignment.
    pub fn to_assignment(&self) -> String {
        format!("{}={}", self.key, self.value)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("deployment target requires a load balancer id")]
    EmptyId,

    #[error("object name '{0}' must be at most {MAX_RELEASE_NAME_LEN} characters")]
    NameTooLong(String),

    #[error("object name '{0}' is not a valid DNS-1123 label")]
    InvalidName(String),
}

/// The deployment backend's addressable unit, derived 1:1 from a load balancer id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeploymentTarget {
    pub release: String,
    pub namespace: String,
}

impl DeploymentTarget {
    pub fn for_id(id: &PrefixedId) -> Result<Self, TargetError> {
        if id.is_zero() {
            return Err(TargetError::EmptyId);
        }

        let name = id.as_str().to_ascii_lowercase();
        if name.len() > MAX_RELEASE_NAME_LEN {
            return Err(TargetError::NameTooLong(name));
        }

        let valid_chars = name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        let valid_edges = name.starts_with(|c: char| c.is_ascii_alphanumeric())
            && name.ends_with(|c: char| c.is_ascii_alphanumeric());
        if !valid_chars || !valid_edges {
            return Err(TargetError::InvalidName(name));
        }

        Ok(Self { namespace: name.clone(), release: name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_lb_never_holds_snapshot() {
        let r = LoadBalancerRef::not_lb().with_snapshot(LoadBalancerSnapshot::default());
        assert!(r.snapshot().is_none());
        assert!(r.id().is_zero());
    }

    #[test]
    fn test_direct_ref_keeps_snapshot() {
        let r = LoadBalancerRef::direct("lb-abc".into()).with_snapshot(LoadBalancerSnapshot {
            name: "edge".into(),
            ..Default::default()
        });
        assert_eq!(r.snapshot().map(|s| s.name.as_str()), Some("edge"));
    }

    #[test]
    fn test_target_from_id() {
        let t = DeploymentTarget::for_id(&"loadbal-AbC123".into()).unwrap();
        assert_eq!(t.release, "loadbal-abc123");
        assert_eq!(t.namespace, "loadbal-abc123");
    }

    #[test]
    fn test_target_rejects_bad_names() {
        assert_eq!(DeploymentTarget::for_id(&PrefixedId::default()), Err(TargetError::EmptyId));

        let long = PrefixedId::new(format!("lb-{}", "a".repeat(60)));
        assert!(matches!(DeploymentTarget::for_id(&long), Err(TargetError::NameTooLong(_))));

        assert!(matches!(
            DeploymentTarget::for_id(&"lb_abc".into()),
            Err(TargetError::InvalidName(_))
        ));
    }
}
