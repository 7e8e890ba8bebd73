//! Metrics collection and exposition.
//!
//! # Metrics
//! - `vcb_cycles_total` (counter): reconcile cycles by outcome (ok, aborted, fatal)
//! - `vcb_cycle_duration_seconds` (histogram): read + build + reconcile time
//! - `vcb_services` (gauge): services seen in the last cycle
//! - `vcb_store_writes_total`, `vcb_store_deletes_total` (counters): applied changes
//! - `vcb_store_write_failures_total` (counter): skipped keys
//! - `vcb_watch_events_total`, `vcb_watch_errors_total` (counters)
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::reconcile::ReconcileReport;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record the end of a cycle.
pub fn record_cycle(outcome: &'static str, started: Instant) {
    counter!("vcb_cycles_total", "outcome" => outcome).increment(1);
    histogram!("vcb_cycle_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_services(count: usize) {
    gauge!("vcb_services").set(count as f64);
}

/// Record what a reconcile pass did to the store.
pub fn record_report(report: &ReconcileReport) {
    counter!("vcb_store_writes_total").increment(report.writes as u64);
    counter!("vcb_store_deletes_total").increment((report.deletes + report.pruned) as u64);
    counter!("vcb_store_write_failures_total").increment(report.failures as u64);
}

pub fn record_watch_event() {
    counter!("vcb_watch_events_total").increment(1);
}

pub fn record_watch_error() {
    counter!("vcb_watch_errors_total").increment(1);
}
