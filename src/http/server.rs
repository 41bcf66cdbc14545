//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router (probes, optional push ingress)
//! - Wire up middleware (tracing, request timeout)
//! - Serve until shutdown

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::OperatorConfig;
use crate::http::health::{livez, readyz, Readiness};
use crate::http::ingress::{post_change, post_event};
use crate::lifecycle::Shutdown;
use crate::model::{ChangeMessage, EventMessage};
use crate::transport::{MemoryBus, MemoryQueue};

/// Slack on top of the ack timeout before the request itself times out.
const REQUEST_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub events: MemoryQueue<EventMessage>,
    pub changes: MemoryQueue<ChangeMessage>,
    pub topics: Arc<HashSet<String>>,
    pub ack_timeout: Duration,
    pub readiness: Readiness,
}

/// HTTP server for probes and push ingress.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &OperatorConfig, bus: &MemoryBus, readiness: Readiness) -> Self {
        let ack_timeout = Duration::from_secs(config.health.ack_timeout_secs);
        let state = AppState {
            events: bus.events.clone(),
            changes: bus.changes.clone(),
            topics: Arc::new(config.events.topics.iter().cloned().collect()),
            ack_timeout,
            readiness,
        };

        Self {
            router: Self::build_router(config.health.ingress_enabled, ack_timeout, state),
        }
    }

    #[allow(deprecated)]
    fn build_router(ingress_enabled: bool, ack_timeout: Duration, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/livez", get(livez))
            .route("/readyz", get(readyz));

        if ingress_enabled {
            router = router
                .route("/events/{topic}", post(post_event))
                .route("/changes/{topic}", post(post_change));
        }

        router
            .with_state(state)
            .layer(TimeoutLayer::new(ack_timeout + REQUEST_TIMEOUT_SLACK))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let mut stop = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { stop.recv().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
