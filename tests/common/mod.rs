//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use lb_operator::config::OperatorConfig;
use lb_operator::lifecycle::Shutdown;
use lb_operator::lookup::MemoryLookup;
use lb_operator::model::{ChangeMessage, EventMessage, PrefixedId};
use lb_operator::operator::{Adapters, Operator, RunReport};
use lb_operator::reconcile::MemoryBackend;
use lb_operator::status::MemoryStatusSink;
use lb_operator::transport::{MemoryBus, Subscriptions};

pub const TOPIC: &str = "load-balancer";
pub const METERING_SUBJECT: &str = "metering.loadbalancers";
pub const STATUS_NAMESPACE: &str = "metasns-loadbalancer-status";
pub const CPU_KEY: &str = "resources.limits.cpu";
pub const MEMORY_KEY: &str = "resources.limits.memory";

/// Valid configuration with prefix "lb" and sizing keys.
pub fn test_config() -> OperatorConfig {
    let mut config = OperatorConfig::default();
    config.events.lb_prefix = "lb".to_string();
    config.events.topics = vec![TOPIC.to_string()];
    config.chart.path = "/charts/loadbalancer".to_string();
    config.chart.cpu_keys = vec![CPU_KEY.to_string()];
    config.chart.memory_keys = vec![MEMORY_KEY.to_string()];
    config.metering.subject = METERING_SUBJECT.to_string();
    config.metering.endpoint = "http://127.0.0.1:9".to_string();
    config.metadata.endpoint = "http://127.0.0.1:9".to_string();
    config.metadata.status_namespace_id = STATUS_NAMESPACE.to_string();
    config.observability.metrics_enabled = false;
    config
}

/// Operator wired to in-memory adapters.
pub struct Harness {
    pub config: OperatorConfig,
    pub lookup: Arc<MemoryLookup>,
    pub backend: Arc<MemoryBackend>,
    pub bus: MemoryBus,
    pub status: Arc<MemoryStatusSink>,
    pub operator: Arc<Operator>,
    pub subscriptions: Option<Subscriptions>,
}

impl Harness {
    pub fn new(config: OperatorConfig) -> Self {
        let lookup = Arc::new(MemoryLookup::new());
        let backend = Arc::new(MemoryBackend::new());
        let status = Arc::new(MemoryStatusSink::new());
        let (bus, subscriptions) = MemoryBus::new(16);

        let adapters = Adapters {
            lookup: lookup.clone(),
            backend: backend.clone(),
            publisher: Some(Arc::new(bus.clone())),
            status: Some(status.clone()),
        };
        let operator = Arc::new(Operator::new(&config, adapters));

        Self {
            config,
            lookup,
            backend,
            bus,
            status,
            operator,
            subscriptions: Some(subscriptions),
        }
    }

    /// Start both consumer loops in the background.
    pub fn start(&mut self, shutdown: &Shutdown) -> tokio::task::JoinHandle<RunReport> {
        let operator = self.operator.clone();
        let subscriptions = self.subscriptions.take().expect("harness already started");
        let shutdown = shutdown.clone();
        tokio::spawn(async move { operator.run(subscriptions, &shutdown).await.unwrap() })
    }
}

pub fn ids(raw: &[&str]) -> Vec<PrefixedId> {
    raw.iter().map(|s| PrefixedId::from(*s)).collect()
}

pub fn event(subject: &str, event_type: &str, associated: &[&str]) -> EventMessage {
    EventMessage {
        subject_id: subject.into(),
        event_type: event_type.to_string(),
        additional_subject_ids: ids(associated),
        ..Default::default()
    }
}

pub fn change(subject: &str, event_type: &str, associated: &[&str]) -> ChangeMessage {
    let mut msg = ChangeMessage::new(subject.into(), event_type);
    msg.additional_subject_ids = ids(associated);
    msg
}

/// Bind an ephemeral local port.
pub async fn local_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Start a programmable mock API. `f` receives the request path and returns
/// status and JSON body.
pub async fn start_programmable_api<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let (listener, addr) = local_listener().await;
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]);
                let path = request
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1))
                    .unwrap_or("/")
                    .to_string();

                let (status, body) = f(path).await;
                let status_text = match status {
                    200 => "200 OK",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            });
        }
    });

    addr
}
