//! Load balancer API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::config::ApiConfig;
use crate::lookup::{LoadBalancerLookup, LookupError, LookupResult};
use crate::model::{LoadBalancerSnapshot, PrefixedId};

/// Looks load balancers up through the load balancer API.
#[derive(Debug, Clone)]
pub struct HttpLookup {
    client: reqwest::Client,
    endpoint: String,
    timeout_secs: u64,
}

impl HttpLookup {
    pub fn new(config: &ApiConfig) -> LookupResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LookupError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn url_for(&self, id: &PrefixedId) -> String {
        format!("{}/v1/loadbalancers/{}", self.endpoint, id)
    }
}

#[async_trait]
impl LoadBalancerLookup for HttpLookup {
    async fn get(&self, id: &PrefixedId) -> LookupResult<LoadBalancerSnapshot> {
        let url = self.url_for(id);
        tracing::debug!(loadbalancer_id = %id, url = %url, "Fetching load balancer");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout(self.timeout_secs)
            } else {
                LookupError::Request(e.to_string())
            }
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(LookupError::NotFound(id.clone())),
            status if !status.is_success() => return Err(LookupError::Status(status.as_u16())),
            _ => {}
        }

        let mut snapshot: LoadBalancerSnapshot = response
            .json()
            .await
            .map_err(|e| LookupError::Decode(e.to_string()))?;

        if snapshot.id.is_zero() {
            snapshot.id = id.clone();
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_strips_trailing_slash() {
        let lookup = HttpLookup::new(&ApiConfig {
            endpoint: "http://lbapi:7608/".into(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(lookup.url_for(&"lb-abc".into()), "http://lbapi:7608/v1/loadbalancers/lb-abc");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_error() {
        let lookup = HttpLookup::new(&ApiConfig {
            endpoint: "http://127.0.0.1:9".into(),
            timeout_secs: 2,
        })
        .unwrap();

        let err = lookup.get(&"lb-abc".into()).await.unwrap_err();
        assert!(matches!(err, LookupError::Request(_) | LookupError::Timeout(_)));
    }
}
