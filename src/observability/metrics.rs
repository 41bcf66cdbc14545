//! Metrics collection and exposition.
//!
//! # Metrics
//! - `load_balancer_operator_load_balancers_count` (gauge): load balancers deployed
//!   or seen deployed by this process
//! - `load_balancer_operator_messages_total` (counter): processed messages by channel, outcome
//! - `load_balancer_operator_lookup_failures_total` (counter)
//! - `load_balancer_operator_reconcile_failures_total` (counter): by action
//! - `load_balancer_operator_ack_failures_total` (counter): by channel

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const DEPLOYED_GAUGE: &str = "load_balancer_operator_load_balancers_count";
pub const MESSAGES_TOTAL: &str = "load_balancer_operator_messages_total";
pub const LOOKUP_FAILURES_TOTAL: &str = "load_balancer_operator_lookup_failures_total";
pub const RECONCILE_FAILURES_TOTAL: &str = "load_balancer_operator_reconcile_failures_total";
pub const ACK_FAILURES_TOTAL: &str = "load_balancer_operator_ack_failures_total";

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe();
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

fn describe() {
    describe_gauge!(DEPLOYED_GAUGE, "Load balancers deployed or seen deployed by this process");
    describe_counter!(MESSAGES_TOTAL, "Inbound messages processed");
    describe_counter!(LOOKUP_FAILURES_TOTAL, "Load balancer lookups that failed");
    describe_counter!(RECONCILE_FAILURES_TOTAL, "Reconcile attempts that failed");
    describe_counter!(ACK_FAILURES_TOTAL, "Acknowledgments that failed");
}

pub fn record_message(channel: &'static str, outcome: &'static str) {
    counter!(MESSAGES_TOTAL, "channel" => channel, "outcome" => outcome).increment(1);
}

pub fn record_lookup_failure() {
    counter!(LOOKUP_FAILURES_TOTAL).increment(1);
}

pub fn record_reconcile_failure(action: &'static str) {
    counter!(RECONCILE_FAILURES_TOTAL, "action" => action).increment(1);
}

pub fn record_ack_failure(channel: &'static str) {
    counter!(ACK_FAILURES_TOTAL, "channel" => channel).increment(1);
}

pub fn set_deployed(count: usize) {
    gauge!(DEPLOYED_GAUGE).set(count as f64);
}
