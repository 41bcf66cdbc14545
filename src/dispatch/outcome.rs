//! Dispatch outcomes.

use std::fmt;

use crate::model::PrefixedId;

/// Reconciliation action attempted for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a message caused no reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    LocationFiltered,
    NotLoadBalancer,
    LookupFailed,
}

/// What processing one message amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Dropped before any backend call.
    Dropped(DropReason),
    /// Deployment created or converged (upsert).
    Created(PrefixedId),
    /// Existing deployment upgraded.
    Updated(PrefixedId),
    /// Update requested but nothing was deployed; nothing changed.
    NotDeployed(PrefixedId),
    /// Deployment removed (or already absent).
    Deleted(PrefixedId),
    /// An address was detached. Pending product decision; no state change.
    DetachPending(PrefixedId),
    /// An update-type change. Pending product decision; no state change
    /// unless updates are enabled.
    UpdatePending(PrefixedId),
    /// Event or change type this operator does not handle.
    Ignored { id: PrefixedId, event_type: String },
    /// The reconcile attempt failed. Not retried.
    Failed {
        id: PrefixedId,
        action: Action,
        error: String,
    },
}

impl Outcome {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Dropped(DropReason::LocationFiltered) => "location_filtered",
            Outcome::Dropped(DropReason::NotLoadBalancer) => "not_load_balancer",
            Outcome::Dropped(DropReason::LookupFailed) => "lookup_failed",
            Outcome::Created(_) => "created",
            Outcome::Updated(_) => "updated",
            Outcome::NotDeployed(_) => "not_deployed",
            Outcome::Deleted(_) => "deleted",
            Outcome::DetachPending(_) => "detach_pending",
            Outcome::UpdatePending(_) => "update_pending",
            Outcome::Ignored { .. } => "ignored",
            Outcome::Failed { .. } => "failed",
        }
    }
}
