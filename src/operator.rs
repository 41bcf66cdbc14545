//! Operator assembly and run loop.
//!
//! Wires the adapters into a [`Dispatcher`] and drives one consumer loop per
//! channel until both stop.

use std::sync::Arc;
use std::time::Duration;

use crate::config::OperatorConfig;
use crate::consumer::{run_loop, LoopReport};
use crate::dispatch::Dispatcher;
use crate::error::{OperatorError, Result};
use crate::lifecycle::Shutdown;
use crate::lookup::{HttpLookup, LoadBalancerLookup, MemoryLookup};
use crate::metering::MeteringSink;
use crate::model::{ChangeMessage, EventMessage};
use crate::reconcile::{DeploymentBackend, HelmBackend, MemoryBackend, OverrideBuilder, Reconciler};
use crate::status::{HttpStatusSink, MemoryStatusSink, StatusReporter, StatusSink};
use crate::transport::{HttpPublisher, MemoryBus, Publisher, Subscriptions};

/// External collaborators the operator depends on.
pub struct Adapters {
    pub lookup: Arc<dyn LoadBalancerLookup>,
    pub backend: Arc<dyn DeploymentBackend>,
    pub publisher: Option<Arc<dyn Publisher>>,
    pub status: Option<Arc<dyn StatusSink>>,
}

impl Adapters {
    /// Helm/kubectl backend, HTTP lookup, plus HTTP metering and status
    /// clients for whichever of the two is configured.
    pub fn production(config: &OperatorConfig) -> Result<Self> {
        let lookup = HttpLookup::new(&config.api)?;

        let publisher: Option<Arc<dyn Publisher>> = if config.metering.enabled() {
            let publisher = HttpPublisher::new(
                &config.metering.endpoint,
                Duration::from_secs(config.api.timeout_secs),
            )?;
            Some(Arc::new(publisher))
        } else {
            None
        };

        let status: Option<Arc<dyn StatusSink>> = if config.metadata.enabled() {
            let sink = HttpStatusSink::new(
                &config.metadata.endpoint,
                Duration::from_secs(config.api.timeout_secs),
            )?;
            Some(Arc::new(sink))
        } else {
            None
        };

        Ok(Self {
            lookup: Arc::new(lookup),
            backend: Arc::new(HelmBackend::new(&config.chart)),
            publisher,
            status,
        })
    }

    /// In-process adapters for dev mode: every id resolves, deployments are
    /// kept in memory, metering records land on `bus` and status updates
    /// are held in memory.
    pub fn in_memory(bus: &MemoryBus) -> Self {
        Self {
            lookup: Arc::new(MemoryLookup::permissive()),
            backend: Arc::new(MemoryBackend::new()),
            publisher: Some(Arc::new(bus.clone())),
            status: Some(Arc::new(MemoryStatusSink::new())),
        }
    }
}

/// Combined report of both consumer loops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub events: LoopReport,
    pub changes: LoopReport,
}

pub struct Operator {
    dispatcher: Arc<Dispatcher>,
}

impl Operator {
    pub fn new(config: &OperatorConfig, adapters: Adapters) -> Self {
        let metering = Arc::new(MeteringSink::from_config(&config.metering, adapters.publisher));
        let status = Arc::new(StatusReporter::from_config(&config.metadata, adapters.status));
        let reconciler = Arc::new(
            Reconciler::new(
                adapters.backend,
                OverrideBuilder::from_config(&config.chart),
                metering,
            )
            .with_status(status),
        );
        let dispatcher = Dispatcher::new(&config.events, adapters.lookup, reconciler);

        tracing::info!(
            lb_prefix = %config.events.lb_prefix,
            locations = ?config.events.locations,
            topics = ?config.events.topics,
            apply_updates = config.events.apply_updates,
            metering = config.metering.enabled(),
            metadata = config.metadata.enabled(),
            "Operator initialized"
        );

        Self { dispatcher: Arc::new(dispatcher) }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Run both consumer loops until their subscriptions end or `shutdown`
    /// fires.
    pub async fn run(&self, subscriptions: Subscriptions, shutdown: &Shutdown) -> Result<RunReport> {
        let events = tokio::spawn(run_loop::<EventMessage, _>(
            subscriptions.events,
            self.dispatcher.clone(),
            shutdown.subscribe(),
        ));
        let changes = tokio::spawn(run_loop::<ChangeMessage, _>(
            subscriptions.changes,
            self.dispatcher.clone(),
            shutdown.subscribe(),
        ));

        let (events, changes) = tokio::join!(events, changes);
        let report = RunReport {
            events: events.map_err(|e| OperatorError::Task("events", e))?,
            changes: changes.map_err(|e| OperatorError::Task("changes", e))?,
        };

        tracing::info!(
            events = report.events.processed,
            changes = report.changes.processed,
            "Operator stopped"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operator").field("dispatcher", &self.dispatcher).finish()
    }
}
