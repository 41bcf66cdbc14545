//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Required inputs present (chart path, topics)
//! - Override keys unique across cpu/memory/id keys
//! - Addresses and URLs parse
//! - A metadata endpoint comes with a status namespace
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: OperatorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::OperatorConfig;
use crate::model::id::PREFIX_SEPARATOR;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("chart path is required")]
    MissingChartPath,

    #[error("at least one event topic is required")]
    MissingTopics,

    #[error("load balancer prefix must be non-empty and must not contain '{PREFIX_SEPARATOR}'")]
    InvalidLbPrefix,

    #[error("override key '{0}' is configured more than once")]
    DuplicateOverrideKey(String),

    #[error("{field} is not a valid URL: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("metadata.status_namespace_id is required when metadata.endpoint is set")]
    MissingStatusNamespace,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &OperatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.chart.path.trim().is_empty() {
        errors.push(ValidationError::MissingChartPath);
    }

    if config.events.topics.is_empty() {
        errors.push(ValidationError::MissingTopics);
    }

    let prefix = &config.events.lb_prefix;
    if prefix.is_empty() || prefix.contains(PREFIX_SEPARATOR) {
        errors.push(ValidationError::InvalidLbPrefix);
    }

    let mut seen = HashSet::new();
    let keys = config
        .chart
        .cpu_keys
        .iter()
        .chain(config.chart.memory_keys.iter())
        .chain(config.chart.id_key.iter());
    for key in keys {
        if !seen.insert(key.as_str()) {
            errors.push(ValidationError::DuplicateOverrideKey(key.clone()));
        }
    }

    if url::Url::parse(&config.api.endpoint).is_err() {
        errors.push(ValidationError::InvalidUrl {
            field: "api.endpoint",
            value: config.api.endpoint.clone(),
        });
    }

    if config.metering.enabled() && url::Url::parse(&config.metering.endpoint).is_err() {
        errors.push(ValidationError::InvalidUrl {
            field: "metering.endpoint",
            value: config.metering.endpoint.clone(),
        });
    }

    if config.metadata.enabled() {
        if url::Url::parse(&config.metadata.endpoint).is_err() {
            errors.push(ValidationError::InvalidUrl {
                field: "metadata.endpoint",
                value: config.metadata.endpoint.clone(),
            });
        }
        if config.metadata.status_namespace_id.trim().is_empty() {
            errors.push(ValidationError::MissingStatusNamespace);
        }
    }

    if config.health.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "health.bind_address",
            value: config.health.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.api.timeout_secs == 0 {
        errors.push(ValidationError::Zero("api.timeout_secs"));
    }
    if config.chart.timeout_secs == 0 {
        errors.push(ValidationError::Zero("chart.timeout_secs"));
    }
    if config.health.queue_depth == 0 {
        errors.push(ValidationError::Zero("health.queue_depth"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
