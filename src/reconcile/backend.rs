//! Deployment backend contract.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{DeploymentTarget, ValueOverride};

/// Backend errors are opaque to the core; they are logged with the target.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("`{command}` exited with {status}: {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("unable to run `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    #[error("`{command}` timed out after {secs} seconds")]
    Timeout { command: String, secs: u64 },

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Materializes workloads from a packaged chart.
///
/// Implementations must make `create` an upsert and treat "already absent" as
/// success for `delete` and `remove_namespace`.
#[async_trait]
pub trait DeploymentBackend: Send + Sync {
    /// Ensure the isolated namespace for the target exists.
    async fn ensure_namespace(&self, target: &DeploymentTarget) -> BackendResult<()>;

    /// Install or upgrade the release with the given overrides.
    async fn create(&self, target: &DeploymentTarget, overrides: &[ValueOverride])
        -> BackendResult<()>;

    /// Upgrade an existing release, keeping its values and applying
    /// `overrides` on top.
    async fn update(&self, target: &DeploymentTarget, overrides: &[ValueOverride])
        -> BackendResult<()>;

    /// Remove the release.
    async fn delete(&self, target: &DeploymentTarget) -> BackendResult<()>;

    /// Remove the namespace created for the target.
    async fn remove_namespace(&self, target: &DeploymentTarget) -> BackendResult<()>;

    /// Whether a release currently exists for the target.
    async fn exists(&self, target: &DeploymentTarget) -> BackendResult<bool>;
}
