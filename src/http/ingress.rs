//! Push ingress for both channels.
//!
//! A request is answered only once its message has been acknowledged by the
//! consumer loop, so a 202 means the attempt happened. Anything else means the
//! producer should redeliver.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::http::server::AppState;
use crate::model::{ChangeMessage, EventMessage};
use crate::transport::MemoryQueue;

/// Header carrying a producer-assigned message id. Redeliveries reuse it.
pub const X_MESSAGE_ID: &str = "x-message-id";

pub async fn post_event(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    headers: HeaderMap,
    Json(message): Json<EventMessage>,
) -> Response {
    if !state.topics.contains(&topic) {
        return unknown_topic(&topic);
    }
    enqueue(&state.events, message_id(&headers), message, state.ack_timeout).await
}

pub async fn post_change(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    headers: HeaderMap,
    Json(message): Json<ChangeMessage>,
) -> Response {
    if !state.topics.contains(&topic) {
        return unknown_topic(&topic);
    }
    enqueue(&state.changes, message_id(&headers), message, state.ack_timeout).await
}

fn message_id(headers: &HeaderMap) -> String {
    headers
        .get(X_MESSAGE_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn unknown_topic(topic: &str) -> Response {
    tracing::debug!(topic, "Rejected message for unsubscribed topic");
    (StatusCode::NOT_FOUND, Json(json!({ "error": "unknown topic", "topic": topic }))).into_response()
}

async fn enqueue<T: Send + 'static>(
    queue: &MemoryQueue<T>,
    id: String,
    message: T,
    ack_timeout: Duration,
) -> Response {
    let receipt = match queue.publish_with_id(id, message).await {
        Ok(receipt) => receipt,
        Err(e) => {
            tracing::warn!(error = %e, "Operator is not consuming");
            return unavailable();
        }
    };

    let id = receipt.id().to_string();
    if receipt.acknowledged_within(ack_timeout).await {
        (StatusCode::ACCEPTED, Json(json!({ "id": id }))).into_response()
    } else {
        tracing::warn!(message_id = %id, "Message not acknowledged");
        unavailable()
    }
}

fn unavailable() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": "not acknowledged" }))).into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_message_id_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert(X_MESSAGE_ID, HeaderValue::from_static("msg-1"));
        assert_eq!(message_id(&headers), "msg-1");
    }

    #[test]
    fn test_message_id_generated_when_absent() {
        let headers = HeaderMap::new();
        let id = message_id(&headers);
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
