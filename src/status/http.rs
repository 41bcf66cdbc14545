//! Metadata service client.

use std::time::Duration;

use async_trait::async_trait;

use crate::status::{StatusError, StatusSink, StatusUpdate};

/// Stores status documents by POSTing JSON to `{endpoint}/statuses`.
#[derive(Debug, Clone)]
pub struct HttpStatusSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpStatusSink {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, StatusError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StatusError::Request(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self) -> String {
        format!("{}/statuses", self.endpoint)
    }
}

#[async_trait]
impl StatusSink for HttpStatusSink {
    async fn update_status(&self, update: &StatusUpdate) -> Result<(), StatusError> {
        let response = self
            .client
            .post(self.url())
            .json(update)
            .send()
            .await
            .map_err(|e| StatusError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StatusError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}
