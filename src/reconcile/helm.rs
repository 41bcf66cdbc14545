//! Helm/kubectl deployment backend.
//!
//! # Responsibilities
//! - Create and delete the per load balancer namespace (kubectl)
//! - Install, upgrade, inspect and uninstall releases (helm)
//! - Bound every command with a timeout and kill it on cancellation

use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::ChartConfig;
use crate::model::{DeploymentTarget, ValueOverride};
use crate::reconcile::backend::{BackendError, BackendResult, DeploymentBackend};

const RELEASE_NOT_FOUND: &str = "release: not found";

/// Drives `helm` and `kubectl` as child processes.
#[derive(Debug, Clone)]
pub struct HelmBackend {
    helm_bin: String,
    kubectl_bin: String,
    chart_path: String,
    values_path: Option<String>,
    kube_config_path: Option<String>,
    timeout: Duration,
}

impl HelmBackend {
    pub fn new(config: &ChartConfig) -> Self {
        Self {
            helm_bin: config.helm_bin.clone(),
            kubectl_bin: config.kubectl_bin.clone(),
            chart_path: config.path.clone(),
            values_path: config.values_path.clone(),
            kube_config_path: config.kube_config_path.clone(),
            timeout: config.timeout(),
        }
    }

    fn install_args(&self, target: &DeploymentTarget, overrides: &[ValueOverride]) -> Vec<String> {
        let mut args = vec![
            "upgrade".to_string(),
            "--install".to_string(),
            target.release.clone(),
            self.chart_path.clone(),
            "--namespace".to_string(),
            target.namespace.clone(),
        ];
        if let Some(values) = &self.values_path {
            args.push("--values".to_string());
            args.push(values.clone());
        }
        push_overrides(&mut args, overrides);
        args
    }

    fn upgrade_args(&self, target: &DeploymentTarget, overrides: &[ValueOverride]) -> Vec<String> {
        let mut args = vec![
            "upgrade".to_string(),
            target.release.clone(),
            self.chart_path.clone(),
            "--namespace".to_string(),
            target.namespace.clone(),
            "--reuse-values".to_string(),
        ];
        push_overrides(&mut args, overrides);
        args
    }

    async fn run(&self, bin: &str, args: &[String]) -> BackendResult<Output> {
        let command = format!("{} {}", bin, args.first().map(String::as_str).unwrap_or_default());

        let mut cmd = Command::new(bin);
        cmd.args(args).kill_on_drop(true);
        if let Some(path) = &self.kube_config_path {
            cmd.env("KUBECONFIG", path);
        }

        tracing::debug!(command = %command, args = ?args, "Running backend command");

        match timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(BackendError::Spawn { command, reason: e.to_string() }),
            Err(_) => Err(BackendError::Timeout { command, secs: self.timeout.as_secs() }),
        }
    }

    /// Run a command and fail on a non-zero exit, unless the failure means
    /// the release is missing and `tolerate_missing` is set.
    async fn run_checked(
        &self,
        bin: &str,
        args: &[String],
        tolerate_missing: bool,
    ) -> BackendResult<bool> {
        let output = self.run(bin, args).await?;
        if output.status.success() {
            return Ok(true);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if tolerate_missing && is_release_not_found(&stderr) {
            return Ok(false);
        }

        Err(BackendError::Command {
            command: format!("{} {}", bin, args.join(" ")),
            status: output.status.to_string(),
            stderr,
        })
    }
}

fn push_overrides(args: &mut Vec<String>, overrides: &[ValueOverride]) {
    for value in overrides {
        args.push("--set".to_string());
        args.push(value.to_assignment());
    }
}

/// Helm reports a missing release as `release: not found`, either bare
/// (`status`) or wrapped (`uninstall: Release not loaded: <name>: release: not found`).
fn is_release_not_found(stderr: &str) -> bool {
    stderr.to_ascii_lowercase().contains(RELEASE_NOT_FOUND)
}

fn is_already_exists(stderr: &str) -> bool {
    stderr.contains("AlreadyExists") || stderr.to_ascii_lowercase().contains("already exists")
}

#[async_trait]
impl DeploymentBackend for HelmBackend {
    async fn ensure_namespace(&self, target: &DeploymentTarget) -> BackendResult<()> {
        let args = vec!["create".to_string(), "namespace".to_string(), target.namespace.clone()];
        let output = self.run(&self.kubectl_bin, &args).await?;
        if output.status.success() {
            tracing::info!(namespace = %target.namespace, "Namespace created");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if is_already_exists(&stderr) {
            return Ok(());
        }

        Err(BackendError::Command {
            command: format!("{} {}", self.kubectl_bin, args.join(" ")),
            status: output.status.to_string(),
            stderr,
        })
    }

    async fn create(
        &self,
        target: &DeploymentTarget,
        overrides: &[ValueOverride],
    ) -> BackendResult<()> {
        let args = self.install_args(target, overrides);
        self.run_checked(&self.helm_bin, &args, false).await?;
        Ok(())
    }

    async fn update(
        &self,
        target: &DeploymentTarget,
        overrides: &[ValueOverride],
    ) -> BackendResult<()> {
        let args = self.upgrade_args(target, overrides);
        self.run_checked(&self.helm_bin, &args, false).await?;
        Ok(())
    }

    async fn delete(&self, target: &DeploymentTarget) -> BackendResult<()> {
        let args = vec![
            "uninstall".to_string(),
            target.release.clone(),
            "--namespace".to_string(),
            target.namespace.clone(),
        ];
        if !self.run_checked(&self.helm_bin, &args, true).await? {
            tracing::debug!(release = %target.release, "Release already absent");
        }
        Ok(())
    }

    async fn remove_namespace(&self, target: &DeploymentTarget) -> BackendResult<()> {
        let args = vec![
            "delete".to_string(),
            "namespace".to_string(),
            target.namespace.clone(),
            "--ignore-not-found".to_string(),
            "--wait=false".to_string(),
        ];
        self.run_checked(&self.kubectl_bin, &args, false).await?;
        Ok(())
    }

    async fn exists(&self, target: &DeploymentTarget) -> BackendResult<bool> {
        let args = vec![
            "status".to_string(),
            target.release.clone(),
            "--namespace".to_string(),
            target.namespace.clone(),
        ];
        self.run_checked(&self.helm_bin, &args, true).await
    }
}
