//! Resource classifier.

use crate::model::{LoadBalancerRef, PrefixedId};

/// Decides whether an event concerns a load balancer and recovers its id.
#[derive(Debug, Clone)]
pub struct Classifier {
    lb_prefix: String,
}

impl Classifier {
    pub fn new(lb_prefix: impl Into<String>) -> Self {
        Self { lb_prefix: lb_prefix.into() }
    }

    /// True when `id` is a load balancer id.
    pub fn is_lb(&self, id: &PrefixedId) -> bool {
        id.has_prefix(&self.lb_prefix)
    }

    /// Classify an event by its subject and associated ids.
    ///
    /// The subject wins over associated ids; among associated ids the first
    /// load balancer in delivery order wins.
    pub fn classify(&self, subject: &PrefixedId, associated: &[PrefixedId]) -> LoadBalancerRef {
        if self.is_lb(subject) {
            return LoadBalancerRef::direct(subject.clone());
        }

        match associated.iter().find(|id| self.is_lb(id)) {
            Some(id) => LoadBalancerRef::associated(id.clone()),
            None => LoadBalancerRef::not_lb(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LbKind;

    fn ids(raw: &[&str]) -> Vec<PrefixedId> {
        raw.iter().map(|s| PrefixedId::from(*s)).collect()
    }

    #[test]
    fn test_direct_subject_ignores_associated() {
        let c = Classifier::new("lb");
        for associated in [ids(&[]), ids(&["lb-other", "loc-east-1"]), ids(&["ipaddr-1"])] {
            let r = c.classify(&"lb-abc".into(), &associated);
            assert_eq!(r.kind(), LbKind::DirectLb);
            assert_eq!(r.id().as_str(), "lb-abc");
        }
    }

    #[test]
    fn test_first_associated_lb_wins() {
        let c = Classifier::new("lb");
        let r = c.classify(&"ipaddr-1".into(), &ids(&["loc-east-1", "lb-first", "lb-second"]));
        assert_eq!(r.kind(), LbKind::AssociatedLb);
        assert_eq!(r.id().as_str(), "lb-first");

        let r = c.classify(&"ipaddr-1".into(), &ids(&["lb-second", "lb-first"]));
        assert_eq!(r.id().as_str(), "lb-second");
    }

    #[test]
    fn test_no_lb_anywhere() {
        let c = Classifier::new("lb");
        let r = c.classify(&"ipaddr-1".into(), &ids(&["loc-east-1", "lbx-nope"]));
        assert_eq!(r.kind(), LbKind::NotLb);
        assert!(r.id().is_zero());

        let r = c.classify(&"ipaddr-1".into(), &[]);
        assert_eq!(r.kind(), LbKind::NotLb);
    }

    #[test]
    fn test_default_prefix() {
        let c = Classifier::new("loadbal");
        assert!(c.is_lb(&"loadbal-7c3e2a".into()));
        assert!(!c.is_lb(&"lb-7c3e2a".into()));
    }
}
