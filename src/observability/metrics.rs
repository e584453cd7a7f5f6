//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): HTTP requests by endpoint, status
//! - `gateway_request_duration_seconds` (histogram): HTTP latency by endpoint
//! - `gateway_round_trips_total` (counter): broker round trips by channel, outcome
//! - `gateway_round_trip_duration_seconds` (histogram): round trip latency by channel
//! - `gateway_pending_replies` (gauge): requests waiting on a reply channel
//! - `gateway_unmatched_replies_total` (counter): replies nobody was waiting for
//! - `gateway_leg_failures_total` (counter): failed legs of composite requests
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(endpoint: &'static str, status: u16, start: Instant) {
    counter!("gateway_requests_total", "endpoint" => endpoint, "status" => status.to_string())
        .increment(1);
    histogram!("gateway_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_round_trip(channel: &str, outcome: &'static str, start: Instant) {
    counter!("gateway_round_trips_total", "channel" => channel.to_string(), "outcome" => outcome)
        .increment(1);
    histogram!("gateway_round_trip_duration_seconds", "channel" => channel.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_pending(channel: &str, pending: usize) {
    gauge!("gateway_pending_replies", "channel" => channel.to_string()).set(pending as f64);
}

pub fn record_unmatched_reply(channel: &str) {
    counter!("gateway_unmatched_replies_total", "channel" => channel.to_string()).increment(1);
}

pub fn record_leg_failure(leg: &'static str, kind: &'static str) {
    counter!("gateway_leg_failures_total", "leg" => leg, "kind" => kind).increment(1);
}
