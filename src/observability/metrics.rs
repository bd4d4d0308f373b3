//! Metrics collection and exposition.
//!
//! # Metrics
//! - `reconciler_cycles_total` (counter): render/apply cycles by outcome
//! - `reconciler_events_total` (counter): inventory events by kind
//! - `reconciler_registry_services` (gauge): services currently proxied
//! - `reconciler_ambiguous_services_total` (counter): records skipped for multiple ports
//! - `reconciler_rollbacks_total` (counter): rollbacks entered
//! - `reconciler_manual_intervention_total` (counter): terminal failures
//!
//! Recording is a no-op until a recorder is installed by `init_metrics`.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_cycle(outcome: &'static str) {
    metrics::counter!("reconciler_cycles_total", "outcome" => outcome).increment(1);
}

pub fn record_event(kind: &'static str) {
    metrics::counter!("reconciler_events_total", "kind" => kind).increment(1);
}

pub fn record_registry_size(size: usize) {
    metrics::gauge!("reconciler_registry_services").set(size as f64);
}

pub fn record_ambiguous_service() {
    metrics::counter!("reconciler_ambiguous_services_total").increment(1);
}

pub fn record_rollback() {
    metrics::counter!("reconciler_rollbacks_total").increment(1);
}

pub fn record_manual_intervention() {
    metrics::counter!("reconciler_manual_intervention_total").increment(1);
}
