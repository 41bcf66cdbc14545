//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the operator.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the load balancer operator.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct OperatorConfig {
    /// Event classification and subscription settings.
    pub events: EventsConfig,

    /// Deployment chart and backend tooling.
    pub chart: ChartConfig,

    /// Load balancer API used for snapshot lookups.
    pub api: ApiConfig,

    /// Status metering publisher.
    pub metering: MeteringConfig,

    /// Metadata service receiving load balancer status.
    pub metadata: MetadataConfig,

    /// Health and push-ingress HTTP surface.
    pub health: HealthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Event classification and subscription settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Id prefix marking a load balancer (e.g. "loadbal").
    pub lb_prefix: String,

    /// Location suffixes to filter events for. Empty means no filtering.
    pub locations: Vec<String>,

    /// Topics to subscribe to on both channels.
    pub topics: Vec<String>,

    /// Upgrade existing deployments on update-type changes instead of
    /// recording them as pending.
    pub apply_updates: bool,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            lb_prefix: "loadbal".to_string(),
            locations: Vec::new(),
            topics: Vec::new(),
            apply_updates: false,
        }
    }
}

/// Deployment chart configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Path to the packaged chart (required).
    pub path: String,

    /// Optional values file applied before overrides.
    pub values_path: Option<String>,

    /// Chart keys that receive the load balancer's CPU sizing.
    pub cpu_keys: Vec<String>,

    /// Chart keys that receive the load balancer's memory sizing.
    pub memory_keys: Vec<String>,

    /// Chart key that receives the load balancer id, if any.
    pub id_key: Option<String>,

    /// Helm binary.
    pub helm_bin: String,

    /// Kubectl binary.
    pub kubectl_bin: String,

    /// Kubeconfig path. In-cluster credentials are used when unset.
    pub kube_config_path: Option<String>,

    /// Timeout for a single backend command in seconds.
    pub timeout_secs: u64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            values_path: None,
            cpu_keys: Vec::new(),
            memory_keys: Vec::new(),
            id_key: None,
            helm_bin: "helm".to_string(),
            kubectl_bin: "kubectl".to_string(),
            kube_config_path: None,
            timeout_secs: 300,
        }
    }
}

impl ChartConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Load balancer API client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the load balancer API.
    pub endpoint: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:7608".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Metering publisher configuration. An empty subject disables metering.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MeteringConfig {
    /// Subject status transitions are published to.
    pub subject: String,

    /// Base URL of the change publisher.
    pub endpoint: String,
}

impl MeteringConfig {
    pub fn enabled(&self) -> bool {
        !self.subject.is_empty()
    }
}

/// Metadata service configuration. An empty endpoint disables status
/// reporting.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Base URL of the metadata service.
    pub endpoint: String,

    /// Status namespace the load balancer state is stored under.
    pub status_namespace_id: String,

    /// Source recorded with every status update.
    pub source: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            status_namespace_id: String::new(),
            source: "load-balancer-operator".to_string(),
        }
    }
}

impl MetadataConfig {
    pub fn enabled(&self) -> bool {
        !self.endpoint.is_empty()
    }
}

/// Health probe and push-ingress configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Bind address for /livez, /readyz and ingress.
    pub bind_address: String,

    /// Accept pushed messages on /events/{topic} and /changes/{topic}.
    pub ingress_enabled: bool,

    /// How long an ingress request waits for its message to be acknowledged.
    pub ack_timeout_secs: u64,

    /// Bound of each channel's delivery queue.
    pub queue_depth: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            ingress_enabled: true,
            ack_timeout_secs: 600,
            queue_depth: 64,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human readable output instead of JSON.
    pub pretty: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            pretty: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
