//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_node_liveness` (gauge): 1=healthy, 0=unhealthy, -1=unknown
//! - `lb_probes_total` (counter): probes by node and outcome
//! - `lb_probe_duration_seconds` (histogram)
//! - `lb_health_cycle_duration_seconds` (histogram)
//! - `lb_stale_probe_results_total` (counter)
//! - `lb_selections_total` (counter): selections by policy and node
//! - `lb_no_healthy_nodes_total` (counter)
//! - `lb_fast_demotions_total` (counter)

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

use crate::registry::node::Liveness;

/// Install the Prometheus recorder with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_node_liveness(node: &str, liveness: Liveness) {
    let value = match liveness {
        Liveness::Healthy => 1.0,
        Liveness::Unhealthy => 0.0,
        Liveness::Unknown => -1.0,
    };
    gauge!("lb_node_liveness", "node" => node.to_string()).set(value);
}

pub fn record_probe(node: &str, outcome: &'static str, elapsed: Duration) {
    counter!("lb_probes_total", "node" => node.to_string(), "outcome" => outcome).increment(1);
    histogram!("lb_probe_duration_seconds", "node" => node.to_string()).record(elapsed.as_secs_f64());
}

pub fn record_health_cycle(elapsed: Duration, probed: usize) {
    histogram!("lb_health_cycle_duration_seconds").record(elapsed.as_secs_f64());
    gauge!("lb_health_cycle_probed_nodes").set(probed as f64);
}

pub fn record_stale_probe_result() {
    counter!("lb_stale_probe_results_total").increment(1);
}

pub fn record_selection(policy: &'static str, node: &str) {
    counter!("lb_selections_total", "policy" => policy, "node" => node.to_string()).increment(1);
}

pub fn record_no_healthy_nodes() {
    counter!("lb_no_healthy_nodes_total").increment(1);
}

pub fn record_fast_demotion(node: &str) {
    counter!("lb_fast_demotions_total", "node" => node.to_string()).increment(1);
}
