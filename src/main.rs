//! Load balancer operator.
//!
//! Reacts to load balancer events and change notifications and keeps one
//! chart release per load balancer in step with them.
//!
//! # Architecture Overview
//!
//! ```text
//!   POST /events/{topic} ──┐                       ┌──────────────┐
//!                          ▼                       │   lookup     │
//!                    ┌──────────┐   ┌──────────┐   │ (LB API)     │
//!                    │transport │──▶│ consumer │──▶├──────────────┤
//!                    │  queues  │   │  loops   │   │  dispatch    │
//!                    └──────────┘   └────┬─────┘   │ classify +   │
//!                          ▲             │ ack     │ rules        │
//!   POST /changes/{topic} ─┘             ▼         ├──────────────┤
//!                                    producer      │  reconcile   │──▶ helm / kubectl
//!                                                  │  + metering  │──▶ status publisher
//!                                                  └──────────────┘
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;

use lb_operator::config::{read_config, validate_config, ConfigError, OperatorConfig};
use lb_operator::error::OperatorError;
use lb_operator::http::{HttpServer, Readiness};
use lb_operator::lifecycle::{wait_for_signal, Shutdown};
use lb_operator::observability::{logging, metrics};
use lb_operator::operator::{Adapters, Operator};
use lb_operator::transport::MemoryBus;

#[derive(Parser)]
#[command(name = "lb-operator")]
#[command(about = "Deploys and removes load balancers in response to events", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process load balancer events and changes
    Process(ProcessArgs),
}

#[derive(Args)]
struct ProcessArgs {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use in-memory adapters and human readable logs
    #[arg(long)]
    dev: bool,

    /// Log at debug level
    #[arg(long)]
    debug: bool,

    /// Human readable logs
    #[arg(long)]
    pretty: bool,

    /// Location of the load balancer chart
    #[arg(long)]
    chart_path: Option<String>,

    /// Values file passed to every release
    #[arg(long)]
    chart_values_path: Option<String>,

    /// Load balancer API endpoint
    #[arg(long)]
    api_endpoint: Option<String>,

    /// Topics to subscribe to (comma separated)
    #[arg(long, value_delimiter = ',')]
    event_topics: Vec<String>,

    /// Location suffixes to filter on (comma separated)
    #[arg(long, value_delimiter = ',')]
    event_locations: Vec<String>,

    /// Kubeconfig used by helm and kubectl
    #[arg(long)]
    kube_config_path: Option<String>,

    /// Id prefix of load balancers
    #[arg(long)]
    lb_prefix: Option<String>,
}

impl ProcessArgs {
    fn apply(&self, config: &mut OperatorConfig) {
        if let Some(path) = &self.chart_path {
            config.chart.path = path.clone();
        }
        if let Some(path) = &self.chart_values_path {
            config.chart.values_path = Some(path.clone());
        }
        if let Some(endpoint) = &self.api_endpoint {
            config.api.endpoint = endpoint.clone();
        }
        if !self.event_topics.is_empty() {
            config.events.topics = self.event_topics.clone();
        }
        if !self.event_locations.is_empty() {
            config.events.locations = self.event_locations.clone();
        }
        if let Some(path) = &self.kube_config_path {
            config.chart.kube_config_path = Some(path.clone());
        }
        if let Some(prefix) = &self.lb_prefix {
            config.events.lb_prefix = prefix.clone();
        }
        if self.pretty || self.dev {
            config.observability.pretty = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), OperatorError> {
    let cli = Cli::parse();
    let Commands::Process(args) = cli.command;

    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => OperatorConfig::default(),
    };
    args.apply(&mut config);

    logging::init_logging(&config.observability, args.debug);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), dev = args.dev, "lb-operator starting");

    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            tracing::error!(error = %error, "Invalid configuration");
        }
        return Err(ConfigError::Validation(errors).into());
    }

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr)?;
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    run(config, args.dev).await
}

async fn run(config: OperatorConfig, dev: bool) -> Result<(), OperatorError> {
    let (bus, subscriptions) = MemoryBus::new(config.health.queue_depth);
    let adapters = if dev {
        Adapters::in_memory(&bus)
    } else {
        Adapters::production(&config)?
    };
    let operator = Operator::new(&config, adapters);

    let shutdown = Shutdown::new();
    let readiness = Readiness::new();

    let listener = TcpListener::bind(&config.health.bind_address).await?;
    let server = HttpServer::new(&config, &bus, readiness.clone());
    let server = tokio::spawn(server.run(listener, shutdown.clone()));
    tokio::spawn(wait_for_signal(shutdown.clone()));

    readiness.set_ready(true);
    let report = operator.run(subscriptions, &shutdown).await;
    readiness.set_ready(false);

    // Loops may also stop because their queues closed.
    shutdown.trigger();
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
        Err(e) => tracing::error!(error = %e, "HTTP server task failed"),
    }

    report?;
    tracing::info!("Shutdown complete");
    Ok(())
}
