//! Crate-level errors surfaced at startup.

use thiserror::Error;

use crate::config::ConfigError;
use crate::lookup::LookupError;
use crate::status::StatusError;
use crate::transport::PublishError;

#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unable to build lookup client: {0}")]
    Lookup(#[from] LookupError),

    #[error("unable to build metering publisher: {0}")]
    Publish(#[from] PublishError),

    #[error("unable to build metadata status client: {0}")]
    Status(#[from] StatusError),

    #[error("unable to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("{0} consumer task failed: {1}")]
    Task(&'static str, tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, OperatorError>;
