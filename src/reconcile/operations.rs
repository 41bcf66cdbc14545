//! Reconciliation operations.
//!
//! # Responsibilities
//! - create: ensure namespace, then upsert the release with overrides
//! - update: upgrade only when a release already exists, applying overrides
//! - delete: uninstall the release and drop its namespace
//! - has_deployment: existence check, always asked fresh from the backend
//!
//! # Design Decisions
//! - Each operation holds the id's gate slot for its whole duration
//! - Status and metering follow transitions only, so redelivered creates
//!   and deletes are not reported twice
//! - A failed existence check counts as a transition; a duplicate report
//!   beats a lost one
//! - The deployed gauge is the size of the set of ids this process has
//!   deployed or seen deployed, so it can never go negative

use std::sync::Arc;

use dashmap::DashSet;
use thiserror::Error;

use crate::metering::{LoadBalancerState, MeteringSink};
use crate::model::{DeploymentTarget, LoadBalancerRef, PrefixedId, TargetError, ValueOverride};
use crate::observability::metrics;
use crate::reconcile::backend::{BackendError, DeploymentBackend};
use crate::reconcile::gate::KeyedGate;
use crate::reconcile::overrides::OverrideBuilder;
use crate::status::StatusReporter;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("refusing to reconcile an event that is not about a load balancer")]
    NotLoadBalancer,

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Result of an update request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// No release exists; nothing was changed.
    NotDeployed,
}

/// Owns every mutation of deployment state.
pub struct Reconciler {
    backend: Arc<dyn DeploymentBackend>,
    overrides: OverrideBuilder,
    gate: KeyedGate,
    metering: Arc<MeteringSink>,
    status: Arc<StatusReporter>,
    deployed: DashSet<PrefixedId>,
}

impl Reconciler {
    pub fn new(
        backend: Arc<dyn DeploymentBackend>,
        overrides: OverrideBuilder,
        metering: Arc<MeteringSink>,
    ) -> Self {
        Self {
            backend,
            overrides,
            gate: KeyedGate::new(),
            metering,
            status: Arc::new(StatusReporter::disabled()),
            deployed: DashSet::new(),
        }
    }

    /// Report status transitions to the metadata service through `status`.
    pub fn with_status(mut self, status: Arc<StatusReporter>) -> Self {
        self.status = status;
        self
    }

    /// Value overrides for a create or update call, from the ref's snapshot.
    pub fn overrides_for(&self, lb: &LoadBalancerRef) -> Vec<ValueOverride> {
        self.overrides.build(lb)
    }

    pub fn gate(&self) -> &KeyedGate {
        &self.gate
    }

    /// Load balancers deployed or observed deployed by this process.
    pub fn deployed_count(&self) -> usize {
        self.deployed.len()
    }

    fn target_for(lb: &LoadBalancerRef) -> ReconcileResult<DeploymentTarget> {
        if !lb.is_lb() {
            return Err(ReconcileError::NotLoadBalancer);
        }
        Ok(DeploymentTarget::for_id(lb.id())?)
    }

    /// Existence before a mutation. `None` when the backend could not say.
    async fn existing(&self, lb: &LoadBalancerRef, target: &DeploymentTarget) -> Option<bool> {
        match self.backend.exists(target).await {
            Ok(exists) => Some(exists),
            Err(e) => {
                tracing::warn!(
                    loadbalancer_id = %lb.id(),
                    release = %target.release,
                    error = %e,
                    "Unable to check existing deployment"
                );
                None
            }
        }
    }

    /// Install or upgrade the deployment for `lb`.
    pub async fn create(
        &self,
        lb: &LoadBalancerRef,
        overrides: &[ValueOverride],
    ) -> ReconcileResult<()> {
        let target = Self::target_for(lb)?;
        let _slot = self.gate.lock(lb.id()).await;

        let fresh = self.existing(lb, &target).await != Some(true);

        self.backend.ensure_namespace(&target).await?;
        self.backend.create(&target, overrides).await?;

        tracing::info!(
            loadbalancer_id = %lb.id(),
            release = %target.release,
            overrides = overrides.len(),
            fresh,
            "Deployment reconciled"
        );

        self.track(lb.id(), true);
        if fresh {
            self.report(lb.id(), LoadBalancerState::Creating, LoadBalancerState::Active)
                .await;
        }
        Ok(())
    }

    /// Upgrade the deployment for `lb` with `overrides` if, and only if, it
    /// exists.
    pub async fn update(
        &self,
        lb: &LoadBalancerRef,
        overrides: &[ValueOverride],
    ) -> ReconcileResult<UpdateOutcome> {
        let target = Self::target_for(lb)?;
        let _slot = self.gate.lock(lb.id()).await;

        if !self.backend.exists(&target).await? {
            tracing::debug!(loadbalancer_id = %lb.id(), "No deployment to update");
            return Ok(UpdateOutcome::NotDeployed);
        }

        self.backend.update(&target, overrides).await?;
        self.track(lb.id(), true);
        tracing::info!(
            loadbalancer_id = %lb.id(),
            release = %target.release,
            overrides = overrides.len(),
            "Deployment updated"
        );
        Ok(UpdateOutcome::Updated)
    }

    /// Remove the deployment and namespace for `lb`. Absence is success.
    pub async fn delete(&self, lb: &LoadBalancerRef) -> ReconcileResult<()> {
        let target = Self::target_for(lb)?;
        let _slot = self.gate.lock(lb.id()).await;

        let existed = self.existing(lb, &target).await != Some(false);

        self.backend.delete(&target).await?;
        self.backend.remove_namespace(&target).await?;

        tracing::info!(
            loadbalancer_id = %lb.id(),
            release = %target.release,
            existed,
            "Deployment removed"
        );

        self.track(lb.id(), false);
        if existed {
            self.report(lb.id(), LoadBalancerState::Active, LoadBalancerState::Deleted)
                .await;
        }
        Ok(())
    }

    pub async fn has_deployment(&self, lb: &LoadBalancerRef) -> ReconcileResult<bool> {
        let target = Self::target_for(lb)?;
        Ok(self.backend.exists(&target).await?)
    }

    fn track(&self, id: &PrefixedId, deployed: bool) {
        if deployed {
            self.deployed.insert(id.clone());
        } else {
            self.deployed.remove(id);
        }
        metrics::set_deployed(self.deployed.len());
    }

    async fn report(&self, id: &PrefixedId, previous: LoadBalancerState, current: LoadBalancerState) {
        if let Err(e) = self.status.status_changed(id, current).await {
            tracing::warn!(loadbalancer_id = %id, error = %e, "Failed to update load balancer status");
        }
        if let Err(e) = self.metering.status_changed(id, previous, current).await {
            tracing::warn!(loadbalancer_id = %id, error = %e, "Failed to publish status change");
        }
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("overrides", &self.overrides)
            .field("active_ids", &self.gate.active())
            .field("deployed", &self.deployed.len())
            .finish()
    }
}
