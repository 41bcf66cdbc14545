//! Outbound change publishing.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::ChangeMessage;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to publish change: {0}")]
    Request(String),

    #[error("publisher rejected change with status {0}")]
    Rejected(u16),
}

/// Publishes change messages to a subject.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish_change(&self, subject: &str, message: &ChangeMessage) -> Result<(), PublishError>;
}

/// Publishes by POSTing JSON to `{endpoint}/changes/{subject}`.
#[derive(Debug, Clone)]
pub struct HttpPublisher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPublisher {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PublishError::Request(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, subject: &str) -> String {
        format!("{}/changes/{}", self.endpoint, subject)
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish_change(&self, subject: &str, message: &ChangeMessage) -> Result<(), PublishError> {
        let response = self
            .client
            .post(self.url_for(subject))
            .json(message)
            .send()
            .await
            .map_err(|e| PublishError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}
